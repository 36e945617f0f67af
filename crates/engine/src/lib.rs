pub mod feature;
pub mod headless;
pub mod surface;

pub use feature::*;
pub use headless::*;
pub use surface::*;
