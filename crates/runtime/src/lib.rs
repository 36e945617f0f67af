pub mod event_bus;
pub mod liveness;
pub mod periodic;

pub use event_bus::*;
pub use liveness::*;
pub use periodic::*;
