use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        OriginalUri, Query, Request,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::MethodFilter,
    Json,
};
use demurrage::{error_code, RequestError};
use model::ExampleData;
use schemars::{schema_for, schema_for_value, JsonSchema};
use serde::{Deserialize, Serialize};

pub type RouteResult<O> = Result<O, RouteErrorResponse>;
pub type ApiResult<O> = RouteResult<Json<ApiResponse<O>>>;

/// A `MethodFilter` that matches all http methods.
pub(crate) const METHOD_FILTER_ALL: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::PUT)
    .or(MethodFilter::DELETE);

/// The envelope of every successful response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }

    pub fn json(self) -> Json<Self> {
        Json(self)
    }
}

// - Services returning commonly used responses -

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SchemaParams {
    #[serde(default = "Default::default")]
    example_data: bool,
}

pub(crate) async fn schema<T: ExampleData + JsonSchema + Serialize>(
    Query(params): Query<SchemaParams>,
) -> impl IntoResponse {
    if params.example_data {
        Json(schema_for_value!(T::example_data()))
    } else {
        Json(schema_for!(T))
    }
}

pub(crate) async fn route_not_found(
    OriginalUri(original_uri): OriginalUri,
    req: Request,
) -> impl IntoResponse {
    RouteErrorResponse::not_found(req.method(), original_uri.path())
}

// - Commonly used responeses -

/// The envelope of every failed response: `success` is always `false`,
/// `error` holds a human readable message and `code` a machine readable one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,

    pub success: bool,

    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_uri: Option<String>,
}

impl RouteErrorResponse {
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            success: false,
            message: None,
            code: None,
            http_method: None,
            requested_uri: None,
        }
    }

    pub fn not_found(method: &Method, uri: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND)
            .with_code(error_code::NOT_FOUND)
            .with_method(method)
            .with_uri(uri)
            .with_default_message()
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED)
            .with_code(error_code::UNAUTHORIZED)
            .with_message("A valid bearer token is required.")
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_owned());
        self
    }

    pub fn with_method(mut self, method: &Method) -> Self {
        self.http_method = Some(method.to_string());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.requested_uri = Some(uri.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_default_message(self) -> Self {
        let message = self
            .status_code
            .canonical_reason()
            .unwrap_or("i dunno what happened here :/");
        self.with_message(message)
    }
}

impl From<RequestError> for RouteErrorResponse {
    fn from(value: RequestError) -> Self {
        let code = value.code();
        let response = match value {
            RequestError::NotFound => Self::new(StatusCode::NOT_FOUND)
                .with_message("The requested item does not exist."),
            RequestError::Invalid(message) | RequestError::Conflict(message) => {
                Self::new(StatusCode::BAD_REQUEST).with_message(message)
            }
            RequestError::Unauthorized => Self::unauthorized(),
            RequestError::Forbidden => Self::new(StatusCode::FORBIDDEN)
                .with_message("Only company admins may do this."),
            RequestError::Other(other) => {
                log::error!("request failed: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_default_message()
            }
        };
        response.with_code(code)
    }
}

impl From<JsonRejection> for RouteErrorResponse {
    fn from(value: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST)
            .with_code(error_code::INVALID)
            .with_message(value.body_text())
    }
}

impl From<PathRejection> for RouteErrorResponse {
    fn from(value: PathRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST)
            .with_code(error_code::INVALID)
            .with_message(value.body_text())
    }
}

impl From<QueryRejection> for RouteErrorResponse {
    fn from(value: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST)
            .with_code(error_code::INVALID)
            .with_message(value.body_text())
    }
}

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_wrapped_in_the_envelope() {
        let response = RouteErrorResponse::from(RequestError::invalid("bad week"))
            .with_method(&Method::GET);
        assert_eq!(response.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({
                "success": false,
                "error": "bad week",
                "code": "invalid",
                "httpMethod": "GET",
            })
        );
    }

    #[test]
    fn request_errors_map_to_status_codes() {
        let status = |error| RouteErrorResponse::from(error).status_code;
        assert_eq!(status(RequestError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(RequestError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status(RequestError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status(RequestError::Conflict("busy".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(RequestError::other(std::fmt::Error)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn success_envelope() {
        assert_eq!(
            serde_json::to_value(ApiResponse::ok(Option::<i32>::None)).unwrap(),
            serde_json::json!({ "success": true, "data": null })
        );
    }
}
