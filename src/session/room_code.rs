use rand::Rng;

use super::constants::{ROOM_CODE_ALPHABET, ROOM_CODE_LEN};

/// Short, human-shareable room identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Draws a code uniformly from [`ROOM_CODE_ALPHABET`].
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Accepts user input: surrounding whitespace is dropped and letters are
    /// upper-cased.
    pub fn normalize(input: &str) -> Self {
        Self(input.trim().to_uppercase())
    }

    /// Transport address the host of this room listens on.
    pub fn rendezvous(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for RoomCode {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_avoid_ambiguous_characters() {
        for _ in 0..10_000 {
            let code = RoomCode::generate();
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(
                code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)),
                "unexpected character in {}",
                code
            );
            assert!(!code.contains(['0', 'O', '1', 'I']), "ambiguous code {}", code);
        }
    }

    #[test]
    fn test_normalize_trims_and_uppercases() {
        assert_eq!(RoomCode::normalize("  k7xq2m \n").as_str(), "K7XQ2M");
    }

    #[test]
    fn test_rendezvous_prefixes_code() {
        assert_eq!(RoomCode::normalize("abc234").rendezvous("wwm-"), "wwm-ABC234");
    }
}
