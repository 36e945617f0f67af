pub mod controller;
pub mod dispatcher;
pub mod icons;
pub mod popup;
pub mod session;
pub mod style;

pub use controller::*;
pub use dispatcher::*;
pub use icons::*;
pub use popup::*;
pub use session::*;
pub use style::*;
