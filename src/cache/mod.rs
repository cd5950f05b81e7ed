//! Tiered response cache for sports data payloads

pub mod classifier;
pub mod clock;
pub mod file_store;
pub mod observer;
pub mod store;
mod tiered;
pub mod types;

// Re-export cache types
pub use types::*;
// Re-export the cache and its collaborators
pub use classifier::{Classifier, DefaultClassifier, EspnClassifier, EsportsClassifier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use file_store::FileStore;
pub use observer::{CacheEvent, CacheObserver, NoopObserver, TracingObserver};
pub use store::{DurableStore, InMemoryStore};
pub use tiered::TieredCache;
