//! HTTP clients for the station's external collaborators
//!
//! One module per remote service, each with its own error enum. Every
//! collaborator sits behind an async trait so the pipeline and the tests
//! can swap in counting fakes.
//!
//! None of the clients sets a request timeout and none retries: a hung
//! call blocks that submission's progress until the user restarts the
//! flow.

pub mod encyclopedia;
pub mod inference;
pub mod location;
pub mod object_store;

pub use encyclopedia::{EncyclopediaApi, LookupError, SpeciesSummary, WikiSummaryClient};
pub use inference::{IdentifyError, InferenceApi, InferenceClient};
pub use location::{HttpLocationProvider, LocationError, LocationProvider};
pub use object_store::{BucketClient, ObjectStore, StoreError, UploadedAsset};

/// User agent sent by every station client
pub(crate) const USER_AGENT: &str = "Wingbeat/0.1.0 (https://github.com/wingbeat/wingbeat)";
