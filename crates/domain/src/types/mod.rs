//! Domain types and models

pub mod classification;
pub mod operation;
pub mod quota;
pub mod upstream;

pub use classification::{ErrorClass, FatalKind, RetriableKind};
pub use operation::OperationKey;
pub use quota::{QuotaAccount, UserId};
pub use upstream::{UpstreamCode, UpstreamError};
