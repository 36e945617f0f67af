pub mod features;
pub mod layer;
pub mod symbology;
pub mod sync;
pub mod visibility;

pub use features::*;
pub use layer::*;
pub use symbology::*;
pub use sync::*;
pub use visibility::*;
