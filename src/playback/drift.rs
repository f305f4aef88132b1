use crate::{configs::DriftConfig, protocol::SyncPulse};

/// Decides whether a member should move its playback after a sync pulse.
pub trait DriftCorrector: Send + Sync {
    /// Returns the position to seek to, or `None` to leave playback alone.
    fn correct(&self, pulse: &SyncPulse, local_position: f64, now_ms: u64) -> Option<f64>;
}

/// Records pulses and never moves playback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCorrection;

impl DriftCorrector for NoCorrection {
    fn correct(&self, _pulse: &SyncPulse, _local_position: f64, _now_ms: u64) -> Option<f64> {
        None
    }
}

/// Seeks to the host's position, advanced by the pulse's transit time, once
/// the local position is further away from it than `threshold_secs`.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdCorrection {
    pub threshold_secs: f64,
}

impl DriftCorrector for ThresholdCorrection {
    fn correct(&self, pulse: &SyncPulse, local_position: f64, now_ms: u64) -> Option<f64> {
        let transit = now_ms.saturating_sub(pulse.timestamp) as f64 / 1000.0;
        let expected = pulse.position + transit;
        ((local_position - expected).abs() > self.threshold_secs).then_some(expected)
    }
}

pub fn corrector_from_config(config: &DriftConfig) -> Box<dyn DriftCorrector> {
    if config.enabled {
        Box::new(ThresholdCorrection {
            threshold_secs: config.threshold_ms as f64 / 1000.0,
        })
    } else {
        Box::new(NoCorrection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_accounts_for_transit_time() {
        let corrector = ThresholdCorrection { threshold_secs: 0.1 };
        let pulse = SyncPulse {
            position: 30.0,
            timestamp: 1_000,
        };

        // Half a second in flight: the host is at 30.5 by now.
        assert_eq!(corrector.correct(&pulse, 30.55, 1_500), None);
        assert_eq!(corrector.correct(&pulse, 30.0, 1_500), Some(30.5));
    }

    #[test]
    fn test_disabled_config_never_corrects() {
        let corrector = corrector_from_config(&DriftConfig::default());
        let pulse = SyncPulse {
            position: 5.0,
            timestamp: 0,
        };
        assert_eq!(corrector.correct(&pulse, 90.0, 0), None);
    }
}
