pub use crate::cache::{InsertOutcome, ResponseCache};
pub use crate::config::{CacheConfig, DEFAULT_MAX_CACHE_SIZE, DEFAULT_MAX_OBJECT_SIZE};
pub use crate::ds::{NodeId, RecencyList, RobinHoodIndex};
pub use crate::entry::{Entry, EntryRef, ReadHandle};
pub use crate::error::{ConfigError, InsertError};
pub use crate::gate::AccessGate;
pub use crate::metrics::MetricsSnapshot;
