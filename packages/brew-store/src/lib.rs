pub mod behavior_log;
pub mod cache;

mod error;

pub use behavior_log::{BehaviorEvent, BehaviorLog, EventType};
pub use cache::CacheFile;
pub use error::{Error, Result};
