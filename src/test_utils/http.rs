use crate::http::server::{body_limit_layer, build_app_routes};
use crate::http::state::HttpServerState;
/// HTTP testing utilities
use anyhow::Result;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // for `oneshot` and `ready`

const BOUNDARY: &str = "diypresso-test-boundary";

/// One part of a multipart/form-data body.
pub enum Part<'a> {
    File {
        name: &'a str,
        file_name: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                file_name,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        name, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// HTTP test client for making requests to our app
pub struct TestApp {
    app: axum::Router,
}

impl TestApp {
    /// Upload receiver writing into `upload_dir`, without response delay.
    pub fn new(upload_dir: &Path, firmware_dir: &Path) -> Self {
        Self::with_response_delay(upload_dir, firmware_dir, Duration::ZERO)
    }

    pub fn with_response_delay(upload_dir: &Path, firmware_dir: &Path, delay: Duration) -> Self {
        let state = HttpServerState {
            firmware_dir: Arc::new(firmware_dir.to_path_buf()),
            upload_dir: Arc::new(upload_dir.to_path_buf()),
            report_file: Arc::new("Report".to_string()),
            response_delay: delay,
        };

        // Same routes and default body limit as production
        let app = build_app_routes(state, body_limit_layer(None));

        Self { app }
    }

    /// Send a multipart/form-data POST request
    pub async fn post_multipart(&self, path: &str, parts: &[Part<'_>]) -> Result<TestResponse> {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))?;

        let response = self.app.clone().oneshot(request).await?;
        Ok(TestResponse::new(response).await)
    }

    /// Send a POST request with a raw body
    pub async fn post_binary(
        &self,
        path: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<TestResponse> {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", content_type)
            .body(Body::from(data.to_vec()))?;

        let response = self.app.clone().oneshot(request).await?;
        Ok(TestResponse::new(response).await)
    }

    /// Send a body-less request with any method
    pub async fn request(&self, method: Method, path: &str) -> Result<TestResponse> {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())?;

        let response = self.app.clone().oneshot(request).await?;
        Ok(TestResponse::new(response).await)
    }

    /// Send a GET request
    pub async fn get(&self, path: &str) -> Result<TestResponse> {
        self.request(Method::GET, path).await
    }
}

/// Test response wrapper for easier assertions
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body_bytes: Vec<u8>,
    body: String,
}

impl TestResponse {
    async fn new(response: axum::response::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default()
            .to_vec();
        let body = String::from_utf8_lossy(&body_bytes).to_string();

        Self {
            status,
            headers,
            body_bytes,
            body,
        }
    }

    /// Get response status
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get response body as string
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Get response body as bytes
    pub fn body_bytes(&self) -> &[u8] {
        &self.body_bytes
    }

    /// Parse response body as JSON
    pub fn json<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_str(&self.body).map_err(Into::into)
    }

    /// Assert status code
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {}. Body: {}",
            expected, self.status, self.body
        );
        self
    }

    /// Get response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Assert specific header value
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        let actual = self
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<missing>");
        assert_eq!(
            actual, expected,
            "Expected header '{}' to be '{}', but was '{}'",
            name, expected, actual
        );
        self
    }

    /// Assert content-type header
    pub fn assert_content_type(&self, expected: &str) -> &Self {
        self.assert_header("content-type", expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_helpers() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());

        let response = TestResponse {
            status: StatusCode::OK,
            headers,
            body_bytes: b"{}".to_vec(),
            body: "{}".to_string(),
        };

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "{}");
        assert_eq!(response.body_bytes(), b"{}");
        assert!(response.json::<serde_json::Value>().unwrap().is_object());
        response.assert_content_type("application/json");
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body(&[Part::Text {
            name: "camera",
            value: "front",
        }]);
        let body = String::from_utf8(body).unwrap();
        assert!(body.starts_with("--diypresso-test-boundary\r\n"));
        assert!(body.contains("name=\"camera\"\r\n\r\nfront\r\n"));
        assert!(body.ends_with("--diypresso-test-boundary--\r\n"));
    }
}
