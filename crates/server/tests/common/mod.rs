//! Common test utilities for E2E testing with mocks.
//!
//! The fixture runs the full router in-process with a manual clock and a
//! mock classifier, so uploads, expiry and analysis can be driven from tests
//! without network access.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use printdrop_core::{
    testing::MockClassifier, AnalysisConfig, ApiKeyAuthenticator, AuthConfig, AuthMethod,
    Authenticator, Classifier, Config, IntakeConfig, IntakeQueue, ManualClock,
    NoneAuthenticator, ServerConfig,
};
use printdrop_server::state::AppState;

/// Re-export fixtures for test convenience
pub use printdrop_core::testing::fixtures;

const BOUNDARY: &str = "printdrop-test-boundary";

/// Owner key used when the fixture runs with API key auth.
pub const OWNER_KEY: &str = "owner-secret";

/// Test fixture for E2E testing with mock dependencies.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Queue shared with the router
    pub queue: Arc<IntakeQueue>,
    /// Clock stamped onto every record
    pub clock: Arc<ManualClock>,
    /// Mock classifier - configure results, errors and holds
    pub classifier: Arc<MockClassifier>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Response with headers and undecoded body, for downloads.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// One file part of a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl UploadPart {
    pub fn new(name: &str, mime_type: &str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            data: data.into(),
        }
    }

    pub fn pdf(name: &str) -> Self {
        Self::new(name, "application/pdf", b"%PDF-1.7 test".to_vec())
    }

    pub fn jpeg(name: &str) -> Self {
        Self::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    pub fn sized(name: &str, size_bytes: usize) -> Self {
        Self::new(name, "application/pdf", vec![0u8; size_bytes])
    }
}

/// Encode `parts` as a `multipart/form-data` body under the field `files`.
pub fn multipart_body(parts: &[UploadPart]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n",
                part.name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.mime_type).as_bytes());
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
        ));
        let queue = Arc::new(IntakeQueue::new(clock.clone()));
        let classifier = Arc::new(MockClassifier::new());

        let (auth, authenticator): (AuthConfig, Arc<dyn Authenticator>) =
            if test_config.require_api_key {
                (
                    AuthConfig {
                        method: AuthMethod::ApiKey,
                        api_key: Some(OWNER_KEY.to_string()),
                    },
                    Arc::new(ApiKeyAuthenticator::new(OWNER_KEY)),
                )
            } else {
                (
                    AuthConfig {
                        method: AuthMethod::None,
                        api_key: None,
                    },
                    Arc::new(NoneAuthenticator::new()),
                )
            };

        let config = Config {
            auth,
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            intake: IntakeConfig {
                max_file_size_bytes: test_config.max_file_size_bytes,
                ..Default::default()
            },
            analysis: test_config.enable_analysis.then(|| AnalysisConfig {
                provider: Default::default(),
                api_key: "test-key".to_string(),
                model: "mock-model".to_string(),
                api_base: None,
                timeout_secs: None,
            }),
        };

        let classifier_dyn = test_config
            .enable_analysis
            .then(|| Arc::clone(&classifier) as Arc<dyn Classifier>);

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            Arc::clone(&queue),
            classifier_dyn,
        ));

        let router = printdrop_server::api::create_router(state);

        Self {
            router,
            queue,
            clock,
            classifier,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, Vec::new(), Body::empty()).await
    }

    /// Send a GET request with extra headers.
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.request("GET", path, headers.to_vec(), Body::empty())
            .await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path, Vec::new(), Body::empty()).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, Vec::new(), Body::empty()).await
    }

    /// POST `parts` as a multipart form.
    pub async fn upload(&self, path: &str, parts: &[UploadPart]) -> TestResponse {
        let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
        self.request(
            "POST",
            path,
            vec![("Content-Type", content_type.as_str())],
            Body::from(multipart_body(parts)),
        )
        .await
    }

    /// Create a selection, stage `parts` into it, and return the selection id.
    pub async fn stage(&self, parts: &[UploadPart]) -> String {
        let created = self.post("/api/v1/selections").await;
        assert_eq!(created.status, StatusCode::CREATED);
        let id = created.body["id"].as_str().unwrap().to_string();

        let staged = self
            .upload(&format!("/api/v1/selections/{}/files", id), parts)
            .await;
        assert_eq!(staged.status, StatusCode::CREATED, "{}", staged.body);
        id
    }

    /// Upload `parts` in one request and return the new record ids.
    pub async fn submit(&self, parts: &[UploadPart]) -> Vec<String> {
        let response = self.upload("/api/v1/uploads", parts).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["id"].as_str().unwrap().to_string())
            .collect()
    }

    /// GET without decoding the body.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        RawResponse {
            status,
            headers,
            body,
        }
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        headers: Vec<(&str, &str)>,
        body: Body,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(name, value);
        }

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Wire the mock classifier in as the analysis backend
    pub enable_analysis: bool,
    /// Guard owner routes with `OWNER_KEY`
    pub require_api_key: bool,
    pub max_file_size_bytes: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            enable_analysis: true,
            require_api_key: false,
            max_file_size_bytes: fixtures::MIB,
        }
    }
}

impl TestConfig {
    /// Create config without a classifier.
    pub fn without_analysis() -> Self {
        Self {
            enable_analysis: false,
            ..Default::default()
        }
    }

    /// Create config with API key auth on the owner routes.
    pub fn with_api_key() -> Self {
        Self {
            require_api_key: true,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
