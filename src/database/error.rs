use warp::http::StatusCode;
use warp::reject::Reject;

/// Error surface shared by every database action. Variants map one-to-one
/// onto client-visible response classes, see `status()`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{0}")]
    Duplicate(String),

    /// Removing a relation entry that does not exist.
    #[error("{0}")]
    MissingEntry(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    InvalidSession(String),

    #[error(transparent)]
    Query(#[from] sqlx::Error),
}

impl Error {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Duplicate(_) => StatusCode::BAD_REQUEST,
            Error::MissingEntry(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized(_) => StatusCode::FORBIDDEN,
            Error::InvalidSession(_) => StatusCode::UNAUTHORIZED,
            Error::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body for the client. Validation errors use the original
    /// field-to-reason mapping, everything else the `errors` key.
    pub fn body(&self) -> serde_json::Value {
        match self {
            Error::Validation { field, reason } => {
                let mut map = serde_json::Map::new();
                map.insert((*field).to_string(), serde_json::json!([reason]));
                serde_json::Value::Object(map)
            }
            Error::Query(_) => serde_json::json!({ "errors": "internal server error" }),
            other => serde_json::json!({ "errors": other.to_string() }),
        }
    }
}

impl Reject for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_response_classes() {
        assert_eq!(
            Error::validation("cooking_time", "out of range").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Duplicate("already favorited".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::MissingEntry("no such entry".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::NotFound("no recipe with id 7".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Query(sqlx::Error::PoolClosed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_body_maps_field_to_reasons() {
        let body = Error::validation("tags", "at least one tag is required").body();
        assert_eq!(
            body,
            serde_json::json!({ "tags": ["at least one tag is required"] })
        );
    }
}
