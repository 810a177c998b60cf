use axum::{
    body::Body,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// JSON extractor that turns body rejections into the standard envelope.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let message = match rejection {
                    JsonRejection::JsonDataError(err) => format!("Invalid JSON data: {err}"),
                    JsonRejection::JsonSyntaxError(err) => format!("Invalid JSON syntax: {err}"),
                    JsonRejection::MissingJsonContentType(err) => {
                        format!("Missing JSON content type: {err}")
                    }
                    _ => "Failed to parse JSON body".to_string(),
                };
                Err(AppError::Validation(vec![message]))
            }
        }
    }
}

/// Run declarative validation and flatten field errors into the envelope shape.
pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(|errors| {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{field}: {msg}"),
                    None => format!("{field}: invalid value"),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 2, max = 5, message = "must be 2-5 characters"))]
        name: String,
        #[validate(range(min = 1, message = "must be at least 1"))]
        count: i32,
    }

    #[test]
    fn collects_all_field_errors() {
        let sample = Sample {
            name: "x".into(),
            count: 0,
        };
        let err = validate_payload(&sample).unwrap_err();
        match err {
            AppError::Validation(messages) => {
                assert_eq!(messages.len(), 2);
                assert!(messages.iter().any(|m| m.contains("must be 2-5 characters")));
                assert!(messages.iter().any(|m| m.contains("must be at least 1")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn passes_valid_payload() {
        let sample = Sample {
            name: "abc".into(),
            count: 3,
        };
        assert!(validate_payload(&sample).is_ok());
    }
}
