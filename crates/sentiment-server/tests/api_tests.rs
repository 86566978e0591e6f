//! HTTP API tests
//!
//! Drive the router in-process with mock classifier, completion, and store
//! components.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use sentiment_classifiers::{ClassSchema, CompletionBackend, ModelLoaderPlugin, SequenceClassifier};
use sentiment_core::{Error, ExternalServiceError, FeedbackRecord, ProbabilityVector, Result};
use sentiment_server::config::HttpConfig;
use sentiment_server::{build_app, AppState};
use sentiment_store::{FeedbackStore, MemoryStore};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Star-rating classifier keyed on words in the text
struct KeywordClassifier {
    schema: ClassSchema,
}

#[async_trait]
impl SequenceClassifier for KeywordClassifier {
    async fn infer(&self, text: &str) -> Result<ProbabilityVector> {
        let probs = if text.contains("love") {
            vec![0.01, 0.02, 0.07, 0.3, 0.6]
        } else if text.contains("broke") {
            vec![0.5, 0.3, 0.1, 0.05, 0.05]
        } else {
            vec![0.0, 0.0, 1.0, 0.0, 0.0]
        };
        ProbabilityVector::new(probs)
    }

    fn name(&self) -> &str {
        "keyword"
    }

    fn schema(&self) -> &ClassSchema {
        &self.schema
    }
}

struct TestLoader {
    fail: bool,
    loads: AtomicU32,
}

#[async_trait]
impl ModelLoaderPlugin for TestLoader {
    async fn load_classifier(&self, _name: &str) -> Result<Arc<dyn SequenceClassifier>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::model_unavailable("config.json not found"));
        }
        Ok(Arc::new(KeywordClassifier {
            schema: ClassSchema::star_rating(),
        }))
    }

    fn available_models(&self) -> Vec<String> {
        vec!["keyword".to_string()]
    }
}

/// Completion endpoint that needs a key, like the real one
struct TestCompletion {
    has_key: bool,
}

#[async_trait]
impl CompletionBackend for TestCompletion {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
        if !self.has_key {
            return Err(ExternalServiceError::MissingCredential("OPENAI_API_KEY").into());
        }
        Ok(if prompt.contains("love") { " Positive" } else { " Negative" }.to_string())
    }

    fn name(&self) -> &str {
        "test-completion"
    }
}

/// Store whose writes always fail
struct BrokenStore;

#[async_trait]
impl FeedbackStore for BrokenStore {
    async fn insert(&self, _record: &FeedbackRecord) -> Result<()> {
        Err(Error::storage("connection reset"))
    }

    async fn find_all(&self) -> Result<Vec<FeedbackRecord>> {
        Ok(Vec::new())
    }

    fn backend_name(&self) -> &'static str {
        "broken"
    }
}

struct TestApp {
    router: Router,
    loader: Arc<TestLoader>,
}

fn test_app(model_fails: bool, has_key: bool, store: Arc<dyn FeedbackStore>) -> TestApp {
    let loader = Arc::new(TestLoader {
        fail: model_fails,
        loads: AtomicU32::new(0),
    });
    let state = AppState::new(
        loader.clone(),
        "keyword",
        Arc::new(TestCompletion { has_key }),
        store,
    );

    TestApp {
        router: build_app(state, &HttpConfig::default()),
        loader,
    }
}

fn default_app() -> TestApp {
    test_app(false, true, Arc::new(MemoryStore::new()))
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = default_app();
    let (status, body) = send(&app.router, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], false);
}

#[tokio::test]
async fn test_feedback_round_trip() {
    let app = default_app();

    let submission = json!({
        "customer": "alice",
        "product": "trail shoes",
        "feedback": "I love how light these are"
    });
    let (status, created) = send(&app.router, "POST", "/feedback", Some(submission)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        created,
        json!({
            "customer": "alice",
            "product": "trail shoes",
            "feedback": "I love how light these are",
            "method": "bert",
            "sentiment": "positive"
        })
    );

    let second = json!({
        "customer": "bob",
        "product": "rain jacket",
        "feedback": "Zipper broke on day two",
        "method": "openai"
    });
    let (status, _) = send(&app.router, "POST", "/feedback", Some(second)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, listed) = send(&app.router, "GET", "/feedback", None).await;
    assert_eq!(status, StatusCode::OK);

    let records = listed.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], created);
    assert_eq!(records[1]["customer"], "bob");
    assert_eq!(records[1]["method"], "openai");
    assert_eq!(records[1]["sentiment"], "negative");
}

#[tokio::test]
async fn test_analyze_sentiment() {
    let app = default_app();

    let (status, body) = send(
        &app.router,
        "POST",
        "/analyze-sentiment",
        Some(json!({"text": "The sole broke after a week"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"text": "The sole broke after a week", "sentiment": "negative", "method": "bert"})
    );
}

#[tokio::test]
async fn test_analyze_sentiment_detailed_bert() {
    let app = default_app();

    let (status, body) = send(
        &app.router,
        "POST",
        "/analyze-sentiment-detailed",
        Some(json!({"text": "The sole broke after a week", "method": "bert"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sentiment"], "negative");
    assert_eq!(body["method"], "bert");

    let confidence = body["confidence"].as_f64().unwrap();
    assert!((confidence - 0.8).abs() < 1e-5);

    let scores = body["scores"].as_object().unwrap();
    assert_eq!(scores.len(), 3);
    assert!((scores["neutral"].as_f64().unwrap() - 0.1).abs() < 1e-5);
    assert!((scores["positive"].as_f64().unwrap() - 0.1).abs() < 1e-5);
}

#[tokio::test]
async fn test_analyze_sentiment_detailed_openai() {
    let app = default_app();

    let (status, body) = send(
        &app.router,
        "POST",
        "/analyze-sentiment-detailed",
        Some(json!({"text": "I love it", "method": "OpenAI"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "text": "I love it",
            "sentiment": "positive",
            "confidence": 1.0,
            "scores": {"positive": 1.0},
            "method": "openai"
        })
    );
}

#[tokio::test]
async fn test_missing_credential_is_an_error() {
    let app = test_app(false, false, Arc::new(MemoryStore::new()));

    let (status, body) = send(
        &app.router,
        "POST",
        "/analyze-sentiment",
        Some(json!({"text": "I love it", "method": "openai"})),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["type"], "external_service_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("OPENAI_API_KEY"));
    assert!(body.get("sentiment").is_none());
}

#[tokio::test]
async fn test_unknown_method_rejected() {
    let store = Arc::new(MemoryStore::new());
    let app = test_app(false, true, store.clone());

    let (status, body) = send(
        &app.router,
        "POST",
        "/feedback",
        Some(json!({
            "customer": "carol",
            "product": "socks",
            "feedback": "fine",
            "method": "vader"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert!(store.is_empty());

    let (status, _) = send(
        &app.router,
        "POST",
        "/analyze-sentiment",
        Some(json!({"text": "fine", "method": "gpt"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_feedback_is_classified_and_stored() {
    let app = default_app();

    let submission = json!({"customer": "erin", "product": "socks", "feedback": ""});
    let (status, created) = send(&app.router, "POST", "/feedback", Some(submission)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["feedback"], "");
    assert_eq!(created["sentiment"], "neutral");

    let (status, listed) = send(&app.router, "GET", "/feedback", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([created]));

    let (status, body) = send(
        &app.router,
        "POST",
        "/analyze-sentiment",
        Some(json!({"text": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sentiment"], "neutral");
}

#[tokio::test]
async fn test_store_failure_fails_submission() {
    let app = test_app(false, true, Arc::new(BrokenStore));

    let (status, body) = send(
        &app.router,
        "POST",
        "/feedback",
        Some(json!({"customer": "dave", "product": "hat", "feedback": "I love it"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["type"], "storage_error");

    let (status, listed) = send(&app.router, "GET", "/feedback", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_model_failure_cached_as_503() {
    let store = Arc::new(MemoryStore::new());
    let app = test_app(true, true, store.clone());

    for _ in 0..3 {
        let (status, body) = send(
            &app.router,
            "POST",
            "/analyze-sentiment",
            Some(json!({"text": "anything"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["type"], "model_unavailable");
    }
    assert_eq!(app.loader.loads.load(Ordering::SeqCst), 1);

    // Submissions with the broken backend are not stored
    let (status, _) = send(
        &app.router,
        "POST",
        "/feedback",
        Some(json!({"customer": "erin", "product": "bag", "feedback": "ok"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(store.is_empty());

    // The remote backend still works
    let (status, body) = send(
        &app.router,
        "POST",
        "/analyze-sentiment",
        Some(json!({"text": "I love it", "method": "openai"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sentiment"], "positive");
}

#[tokio::test]
async fn test_metrics_without_exporter() {
    let app = default_app();
    let (status, _) = send(&app.router, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = default_app();
    let (status, body) = send(&app.router, "GET", "/reviews", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found");
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let app = default_app();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .header("origin", "https://shop.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
