pub mod client;
pub mod ticker;

pub use client::*;
pub use ticker::*;
