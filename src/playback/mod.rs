pub mod coordinator;
pub mod drift;
pub mod engine;

pub use coordinator::*;
pub use drift::*;
pub use engine::*;
