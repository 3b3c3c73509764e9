pub mod adapter;
pub mod batch;
pub mod error;
pub mod harvest;
pub mod normalize;
pub mod play_store;
pub mod progress;
pub mod rate_limit;
pub mod retry;
pub mod types;

pub use adapter::{AdapterFactory, HttpAdapterFactory, SourceAdapter, TransportAdapter};
pub use batch::{BatchCoordinator, BatchOptions, BatchResult, PartialPolicy};
pub use error::{JobError, ScraperError};
pub use harvest::{harvest, Harvest, MAX_BATCHES};
pub use normalize::{normalize, normalize_at};
pub use progress::{
    BatchProgress, HarvestPhase, JobProgress, ProgressEvent, ProgressReporter, SilentReporter,
    TracingReporter,
};
pub use rate_limit::{RateController, RatePolicy};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use types::{Batch, Cursor, RawRecord};
