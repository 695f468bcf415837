pub mod api;
pub mod fetcher;
pub mod model;

pub use api::{AdApi, AdRequest, HttpAdApi};
pub use fetcher::{FetchOutcome, RetryPolicy, RetryState, fetch_with_retry};
pub use model::{AdCandidate, AdRecord, AdType, Creative};
