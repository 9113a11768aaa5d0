//! Remote org access: the transport seam, the `sf` CLI transport, and the
//! snapshot fetcher.

mod fetch;
mod sf_cli;
pub mod testing;
mod transport;

pub use fetch::{FetchError, RetryPolicy, fetch_org_snapshot};
pub use sf_cli::{SfCliTransport, classify_failure};
pub use transport::{
  DeploySubmission, ErrorDetail, FailureKind, ManifestQuery, Operation, OrgRequest, OrgResponse, OrgTransport,
  QuickDeploySubmission, StatusQuery, SubmittedJob, TransportError,
};
