//! Shared HTTP building blocks

pub mod error;
pub mod response;
pub mod validated_json;

pub use error::{ApiError, ErrorDetail, ErrorResponse};
pub use response::{EmptyData, ListMetadata, ListResponse, MessageResponse};
pub use validated_json::ValidatedJson;
