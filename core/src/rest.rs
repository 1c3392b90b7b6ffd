// Airbase
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Generic code for REST handlers.
//!
//! All services should implement an `app` function in this module that returns the `Router` for the
//! application.
//!
//! Every API should be put in its own `.rs` file, using a name like `<entity>_<method>.rs`.  This
//! may seem overkill, but putting every API in its own file makes it easy to ensure all the
//! integration tests for the given API truly belong to that API.
//!
//! More specifically, the `tests` module within an API should define a `route` method that
//! returns the HTTP method and the API path under test.  All integration tests within the module
//! then rely on `route` to obtain this information, ensuring that they all test the desired API.
//!
//! It is also useful for the tests in this layer to define a `TestContext` in a `testutils` module
//! that allows interacting with the database layer directly, using simplified types.

use crate::driver::DriverError;
use async_trait::async_trait;
use axum::Json;
use axum::body::HttpBody;
use axum::extract::{FromRequest, Request};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

/// Frontend errors.  These are the errors that are visible to the user on failed requests.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RestError {
    /// Catch-all error type for all unexpected errors.
    #[error("{0}")]
    InternalError(String),

    /// Indicates an error in the contents of the request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Indicates that a requested entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Indicates that a request that should have empty content did not.
    #[error("Content should be empty")]
    PayloadNotEmpty,
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::AlreadyExists(_) => RestError::InvalidRequest(e.to_string()),
            DriverError::BackendError(_) => RestError::InternalError(e.to_string()),
            DriverError::NotFound(_) => RestError::NotFound(e.to_string()),
        }
    }
}

impl RestError {
    /// Returns the HTTP status code that represents this error.
    pub fn status(&self) -> http::StatusCode {
        match self {
            RestError::InternalError(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
            RestError::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            RestError::NotFound(_) => http::StatusCode::NOT_FOUND,
            RestError::PayloadNotEmpty => http::StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(ErrorResponse { message: self.to_string() })).into_response()
    }
}

/// Result type for this module.
pub type RestResult<T> = Result<T, RestError>;

/// Representation of the details of an error response.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ErrorResponse {
    /// Textual representation of the error message.
    pub(crate) message: String,
}

/// A request body extractor that forbids any content.
///
/// Any API that doesn't expect a body should use this to ensure we don't get garbage data that we
/// don't care about.  This future-proofs the service.
pub struct EmptyBody {}

#[async_trait]
impl<S> FromRequest<S> for EmptyBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        if req.into_body().is_end_stream() {
            Ok(EmptyBody {})
        } else {
            Err(RestError::PayloadNotEmpty)
        }
    }
}

/// Helpers to exercise a `Router` in tests without starting a server.
#[cfg(feature = "testutils")]
pub mod testutils {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Method, StatusCode, header};
    use axum::response::Response;
    use regex::Regex;
    use serde::de::DeserializeOwned;
    use tower::util::ServiceExt;

    /// Largest response body the checker is willing to read.
    const MAX_BODY_SIZE: usize = 64 * 1024;

    /// Asserts that `text` matches the `exp_re` regular expression.
    fn assert_matches(what: &str, text: &str, exp_re: &str) {
        let re = Regex::new(exp_re).unwrap_or_else(|e| panic!("Bad regex '{}': {}", exp_re, e));
        assert!(re.is_match(text), "{} '{}' does not match '{}'", what, text, exp_re);
    }

    /// A single request to send to a `Router`.
    #[must_use]
    pub struct OneShotBuilder {
        /// Application that will handle the request.
        app: Router,

        /// Method of the request.
        method: Method,

        /// Path and query of the request.
        uri: String,
    }

    impl OneShotBuilder {
        /// Prepares a request to `app` for the `method` and `uri` of `route`.
        pub fn new<U: AsRef<str>>(app: Router, route: (Method, U)) -> Self {
            let (method, uri) = route;
            Self { app, method, uri: uri.as_ref().to_owned() }
        }

        /// Sends the request with `body`, labeled with `content_type` if given.
        async fn send(self, content_type: Option<&str>, body: Body) -> ResponseChecker {
            let mut builder = http::Request::builder().method(self.method).uri(self.uri);
            if let Some(content_type) = content_type {
                builder = builder.header(header::CONTENT_TYPE, content_type);
            }
            let request = builder.body(body).unwrap();
            let response = self.app.oneshot(request).await.unwrap();
            ResponseChecker { response, exp_status: StatusCode::OK }
        }

        /// Sends the request without a body.
        pub async fn send_empty(self) -> ResponseChecker {
            self.send(None, Body::empty()).await
        }

        /// Sends `body` labeled as `content_type`, whether it actually is or not.
        pub async fn send_bytes<B>(self, content_type: &str, body: B) -> ResponseChecker
        where
            B: Into<Body>,
        {
            self.send(Some(content_type), body.into()).await
        }

        /// Sends `text` as a `text/plain` body.
        pub async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
            self.send_bytes(mime::TEXT_PLAIN.as_ref(), text.into()).await
        }

        /// Sends `value` serialized as a JSON body.
        pub async fn send_json<T: Serialize>(self, value: T) -> ResponseChecker {
            let body = serde_json::to_vec(&value).unwrap();
            self.send_bytes(mime::APPLICATION_JSON.as_ref(), body).await
        }
    }

    /// Assertions over the response to a `OneShotBuilder` request.
    ///
    /// The status is checked when the body is consumed by one of the `expect_*` methods and
    /// defaults to `200 OK`.
    #[must_use]
    pub struct ResponseChecker {
        /// Response returned by the app.
        response: Response,

        /// Status the response must carry.
        exp_status: StatusCode,
    }

    impl ResponseChecker {
        /// Requires the response to carry `status`.
        pub fn expect_status(mut self, status: StatusCode) -> Self {
            self.exp_status = status;
            self
        }

        /// Checks the response metadata without consuming the body.
        pub fn verify(&self) {
            assert_eq!(self.exp_status, self.response.status(), "Unexpected response status");
        }

        /// Verifies the response and returns its body as a string.
        async fn take_text(self) -> String {
            self.verify();
            let bytes = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE)
                .await
                .unwrap();
            String::from_utf8(bytes.to_vec()).unwrap()
        }

        /// Requires the body to be empty.
        pub async fn expect_empty(self) {
            assert_eq!("", self.take_text().await);
        }

        /// Requires the body to be an `ErrorResponse` whose message matches `exp_re`.
        pub async fn expect_error(self, exp_re: &str) {
            let body = self.take_text().await;
            let error: ErrorResponse = serde_json::from_str(&body)
                .unwrap_or_else(|e| panic!("Body '{}' is not an error response: {}", body, e));
            assert_matches("Error message", &error.message, exp_re);
        }

        /// Requires the body to be the JSON representation of a `T` and returns it.
        pub async fn expect_json<T: DeserializeOwned>(self) -> T {
            let body = self.take_text().await;
            serde_json::from_str(&body)
                .unwrap_or_else(|e| panic!("Body '{}' cannot be deserialized: {}", body, e))
        }

        /// Requires the body to be plain text matching `exp_re`.
        ///
        /// Errors produced by `axum`'s own extractors take this form, unlike our `RestError`s.
        pub async fn expect_text(self, exp_re: &str) {
            assert!(!exp_re.is_empty(), "Use expect_empty to check for empty bodies");
            let body = self.take_text().await;
            assert!(
                serde_json::from_str::<ErrorResponse>(&body).is_err(),
                "Use expect_error to check error responses; got {}",
                body
            );
            assert_matches("Body", &body, exp_re);
        }
    }

    /// Defines a test that checks that the API at `$route` rejects bodies that are not JSON.
    #[macro_export]
    macro_rules! test_payload_must_be_json {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_json() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_text("=value")
                    .await
                    .expect_status(axum::http::StatusCode::UNSUPPORTED_MEDIA_TYPE)
                    .expect_text("application/json")
                    .await;

                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_bytes("application/json", "=value")
                    .await
                    .expect_status(axum::http::StatusCode::BAD_REQUEST)
                    .expect_text("expected value")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_json;

    /// Defines a test that checks that the API at `$route` rejects requests with a body.
    #[macro_export]
    macro_rules! test_payload_must_be_empty {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_empty() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_text("unexpected payload")
                    .await
                    .expect_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE)
                    .expect_error("^Content should be empty$")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_empty;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_driver_error() {
        assert_eq!(
            RestError::InvalidRequest("dup".to_owned()),
            RestError::from(DriverError::AlreadyExists("dup".to_owned()))
        );
        assert_eq!(
            RestError::InternalError("oops".to_owned()),
            RestError::from(DriverError::BackendError("oops".to_owned()))
        );
        assert_eq!(
            RestError::NotFound("gone".to_owned()),
            RestError::from(DriverError::NotFound("gone".to_owned()))
        );
    }

    #[test]
    fn test_status() {
        assert_eq!(500, RestError::InternalError("boom".to_owned()).status().as_u16());
        assert_eq!(400, RestError::InvalidRequest("bad".to_owned()).status().as_u16());
        assert_eq!(404, RestError::NotFound("gone".to_owned()).status().as_u16());
        assert_eq!(413, RestError::PayloadNotEmpty.status().as_u16());
    }

    #[tokio::test]
    async fn test_into_response() {
        let response = RestError::NotFound("City not found".to_owned()).into_response();
        assert_eq!(http::StatusCode::NOT_FOUND, response.status());
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!("City not found", response.message);
    }
}
