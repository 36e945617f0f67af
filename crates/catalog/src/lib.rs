pub mod category;
pub mod event;
pub mod fixture;
pub mod record;
pub mod source;

pub use category::*;
pub use event::*;
pub use record::{RawEventRecord, RecordError, normalize_record, normalize_records};
pub use source::*;
