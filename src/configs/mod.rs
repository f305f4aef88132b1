pub mod base;
pub mod logging;
pub mod media;
pub mod session;

pub use base::*;
pub use logging::*;
pub use media::*;
pub use session::*;
