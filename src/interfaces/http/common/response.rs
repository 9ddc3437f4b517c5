//! Common response bodies

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::shared::types::pagination::PaginationMetadata;

/// `{message, data?}` envelope for single-record operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> MessageResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

/// Serialized as `{}`
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct EmptyData {}

/// Listing metadata: pagination details, or `{}` when not paginated
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ListMetadata {
    Page(PaginationMetadata),
    Empty(EmptyData),
}

impl From<Option<PaginationMetadata>> for ListMetadata {
    fn from(meta: Option<PaginationMetadata>) -> Self {
        match meta {
            Some(page) => Self::Page(page),
            None => Self::Empty(EmptyData::default()),
        }
    }
}

/// Listing response; documents may be projected, so they are free-form
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Map<String, Value>>,
    pub metadata: ListMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_is_empty_object_without_pagination() {
        let body = ListResponse {
            data: vec![],
            metadata: None.into(),
        };
        assert_eq!(serde_json::to_value(body).unwrap(), json!({"data": [], "metadata": {}}));
    }

    #[test]
    fn message_only_response_omits_data() {
        let body = MessageResponse::<EmptyData>::message("City deleted successfully");
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"message": "City deleted successfully"})
        );
    }
}
