pub mod recorded;
pub mod types;

pub use recorded::RecordedUsageLog;
pub use types::{Clock, SystemClock, UsageLog};
