pub mod convert;
pub mod error;
pub mod retriever;
pub mod store;

pub use error::{FacetError, RetrievalError};
pub use retriever::{FacetRetriever, RetryPolicy, DEFAULT_REGION};
pub use store::{BucketStore, S3BucketStore};

#[cfg(test)]
pub use store::MockBucketStore;
