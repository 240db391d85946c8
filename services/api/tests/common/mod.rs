//! Shared fixtures for the HTTP tests: scripted providers and an app builder.

#![allow(dead_code)]

use api_lib::{
    adapters::InMemoryDocumentStore,
    config::Config,
    web::{router, state::AppState},
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    response::Response,
    Router,
};
use math_tutor_core::{
    CompletionProvider, CompletionRequest, DocumentStore, ImageUpload, MathTutor, OcrProvider,
    PortError, PortResult,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BODY_LIMIT: usize = 1_048_576;

//=========================================================================================
// Fake Providers
//=========================================================================================

/// Returns a fixed OCR result and remembers what it was shown.
pub struct FakeOcr {
    result: Result<String, String>,
    pub seen: Mutex<Vec<ImageUpload>>,
}

impl FakeOcr {
    pub fn replying(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl OcrProvider for FakeOcr {
    async fn extract_text(&self, image: &ImageUpload) -> PortResult<String> {
        self.seen.lock().unwrap().push(image.clone());
        self.result.clone().map_err(PortError::Unexpected)
    }
}

type Responder = Box<dyn Fn(&CompletionRequest) -> PortResult<String> + Send + Sync>;

/// Answers every completion with a closure and records each request.
pub struct FakeCompletion {
    respond: Responder,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeCompletion {
    pub fn new(
        respond: impl Fn(&CompletionRequest) -> PortResult<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Tags every problem with `topic` and answers everything else with `reply`.
    pub fn with_topic(topic: &'static str, reply: &'static str) -> Self {
        Self::new(move |request| {
            if is_topic_request(request) {
                Ok(topic.to_string())
            } else {
                Ok(reply.to_string())
            }
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn is_topic_request(request: &CompletionRequest) -> bool {
    request.system.contains("syllabus topic")
}

#[async_trait]
impl CompletionProvider for FakeCompletion {
    async fn complete(&self, request: &CompletionRequest) -> PortResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(request)
    }
}

//=========================================================================================
// App Builder
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryDocumentStore>,
    pub ocr: Arc<FakeOcr>,
    pub completion: Arc<FakeCompletion>,
    pub upload_dir: TempDir,
}

pub fn test_config(upload_dir: &TempDir, keep_uploads: bool) -> Config {
    let upload_dir = upload_dir.path().to_string_lossy().to_string();
    let keep_uploads = keep_uploads.to_string();
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused".to_string()),
        "GEMINI_API_KEY" | "GROQ_API_KEY" => Some("test-key".to_string()),
        "UPLOAD_DIR" => Some(upload_dir.clone()),
        "KEEP_UPLOADS" => Some(keep_uploads.clone()),
        _ => None,
    })
    .expect("test config")
}

pub fn build_app(ocr: FakeOcr, completion: FakeCompletion) -> TestApp {
    build_app_with(ocr, completion, false)
}

pub fn build_app_with(ocr: FakeOcr, completion: FakeCompletion, keep_uploads: bool) -> TestApp {
    let upload_dir = TempDir::new().expect("temp upload dir");
    let store = Arc::new(InMemoryDocumentStore::new());
    let ocr = Arc::new(ocr);
    let completion = Arc::new(completion);
    let state = Arc::new(AppState {
        store: store.clone(),
        ocr: ocr.clone(),
        tutor: MathTutor::new(completion.clone()),
        config: Arc::new(test_config(&upload_dir, keep_uploads)),
    });
    TestApp {
        router: router(state),
        store,
        ocr,
        completion,
        upload_dir,
    }
}

//=========================================================================================
// Request Helpers
//=========================================================================================

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router call")
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        json_response(self.send(request).await).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        json_response(self.send(request).await).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json_request("POST", uri, body).await
    }

    pub async fn put_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json_request("PUT", uri, body).await
    }

    async fn json_request(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        json_response(self.send(request).await).await
    }

    /// Sends `body` verbatim with the given content type.
    pub async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        content_type: &str,
        body: &str,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .expect("request");
        json_response(self.send(request).await).await
    }

    /// Saves a problem and returns its id.
    pub async fn save(&self, user_id: &str, equation: &str, solution: Option<&str>) -> String {
        let (status, body) = self
            .post_json(
                "/api/history",
                serde_json::json!({
                    "user_id": user_id,
                    "equation": equation,
                    "solution": solution,
                    "explanation": solution.map(|_| "**Step 1:** done"),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "save failed: {body}");
        body["id"].as_str().expect("id in save response").to_string()
    }

    /// Waits until background topic tagging has covered `expected` records.
    pub async fn wait_for_topics(&self, user_id: &str, expected: u64) {
        for _ in 0..200 {
            let counts = self.store.topic_counts(user_id).await.expect("topic counts");
            if counts.iter().map(|c| c.count).sum::<u64>() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("topic classification did not finish");
    }
}

pub async fn json_response(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse json")
    };
    (status, json)
}

/// Builds a multipart body holding one file part named `file`.
pub fn multipart_request(file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "math-tutor-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/extract")
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .expect("request")
}

/// Builds a multipart body with only a text field and no file.
pub fn multipart_without_file() -> Request<Body> {
    let boundary = "math-tutor-test-boundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{boundary}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/api/extract")
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .expect("request")
}
