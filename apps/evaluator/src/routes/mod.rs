pub mod evaluations;
pub mod health;
pub mod postings;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/classifications",
            post(evaluations::handle_classify),
        )
        .route("/api/v1/evaluations", post(evaluations::handle_evaluate))
        .route(
            "/api/v1/evaluations/company",
            post(evaluations::handle_evaluate_company),
        )
        .route(
            "/api/v1/evaluations/batch",
            post(evaluations::handle_evaluate_batch),
        )
        .route(
            "/api/v1/postings/:site/:code",
            get(postings::handle_cached_postings),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ProviderSettings, SiteSettings};
    use crate::judge::tests::GOOD_VERDICT;
    use crate::models::JobCategory;
    use crate::store::tests::MemoryJobStore;
    use crate::workflow::tests::{config, orchestrator_with_store, postings, MockSite, RoutingProvider};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        app_with(None)
    }

    fn app_with(resume_dir: Option<PathBuf>) -> Router {
        app_on(Arc::new(MemoryJobStore::default()), resume_dir)
    }

    fn app_on(store: Arc<MemoryJobStore>, resume_dir: Option<PathBuf>) -> Router {
        let workflow = config();
        let state = AppState {
            orchestrator: Arc::new(orchestrator_with_store(
                MockSite::serving(postings()),
                RoutingProvider::new(GOOD_VERDICT),
                workflow.clone(),
                store,
            )),
            config: Config {
                port: 0,
                rust_log: "debug".into(),
                data_dir: "unused".into(),
                redis_url: None,
                resume_dir,
                providers: ProviderSettings {
                    anthropic_api_key: None,
                    gemini_api_key: None,
                    gemini_model: "m".into(),
                    ollama_base_url: None,
                    ollama_model: "m".into(),
                },
                site: SiteSettings {
                    site_id: "board".into(),
                    base_url: "https://jobs.example.com".into(),
                    list_path: "/list?page={page}".into(),
                    max_pages: 1,
                },
                workflow,
            },
        };
        build_router(state)
    }

    async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health_lists_providers() {
        let (status, body) = call(app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["providers"], json!(["routing"]));
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn test_evaluate_inline_resume() {
        let (status, body) = call(
            app(),
            "POST",
            "/api/v1/evaluations",
            Some(json!({"resume_text": "Backend engineer. Java, Kafka."})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["evaluation"]["total_score"], 88);
        assert_eq!(body["evaluation"]["grade"], "A");
        assert_eq!(body["category"]["code"], "backend");
    }

    #[tokio::test]
    async fn test_missing_resume_is_validation_error() {
        let (status, body) = call(app(), "POST", "/api/v1/classifications", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_stage_failure_reports_stage_and_partial() {
        let (status, body) = call(
            app(),
            "POST",
            "/api/v1/evaluations",
            Some(json!({"resume_text": "Java", "categories": ["Full Stack"]})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NO_POSTINGS");
        assert_eq!(body["error"]["stage"], "scrape_or_cache");
        assert_eq!(body["error"]["partial"]["primary_category"]["code"], "backend");
    }

    #[tokio::test]
    async fn test_postings_summary_after_evaluation() {
        let app = app();
        let (status, _) = call(app.clone(), "GET", "/api/v1/postings/board/backend", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        call(
            app.clone(),
            "POST",
            "/api/v1/evaluations/company",
            Some(json!({"resume_text": "Java", "company": "Acme"})),
        )
        .await;

        let (status, body) = call(app, "GET", "/api/v1/postings/board/Backend?full=true", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["posting_count"], 3);
        assert_eq!(body["postings"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["content_hash"].as_str().map(str::len), Some(16));
    }

    #[tokio::test]
    async fn test_corrupt_postings_cache_is_reported() {
        let store = Arc::new(MemoryJobStore::default());
        store
            .docs
            .lock()
            .await
            .insert(JobCategory::new("board", "backend").cache_key(), b"{ truncated".to_vec());

        let (status, body) = call(app_on(store, None), "GET", "/api/v1/postings/board/backend", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "CACHE_CORRUPTION");
        assert_eq!(body["error"]["stage"], "scrape_or_cache");
    }

    #[tokio::test]
    async fn test_batch_endpoint_counts_outcomes() {
        let (status, body) = call(
            app(),
            "POST",
            "/api/v1/evaluations/batch",
            Some(json!({"resume_text": "Java"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["batch"]["succeeded"], 1);
        assert_eq!(body["batch"]["skipped"], 1);
        assert_eq!(body["batch"]["outcomes"][1]["status"], "skipped");
    }

    #[tokio::test]
    async fn test_resume_path_confined_to_resume_dir() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("resumes");
        std::fs::create_dir(&root).unwrap();
        let mut inside = std::fs::File::create(root.join("kim.txt")).unwrap();
        inside.write_all(b"Backend engineer. Java, Kafka.").unwrap();
        let mut secret = std::fs::File::create(outer.path().join("secret.txt")).unwrap();
        secret.write_all(b"DB_PASSWORD=hunter2").unwrap();

        let app = app_with(Some(root.clone()));
        let (status, body) = call(
            app.clone(),
            "POST",
            "/api/v1/classifications",
            Some(json!({"path": "kim.txt"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["primary_category"]["code"], "backend");

        let escape = outer.path().join("secret.txt");
        for path in ["../secret.txt", "./../secret.txt", escape.to_str().unwrap()] {
            let (status, body) = call(
                app.clone(),
                "POST",
                "/api/v1/evaluations",
                Some(json!({"path": path})),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        }

        let (status, _) = call(
            app,
            "POST",
            "/api/v1/classifications",
            Some(json!({"path": "missing.txt"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resume_symlink_out_of_dir_rejected() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("resumes");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(outer.path().join("secret.txt"), "DB_PASSWORD=hunter2").unwrap();
        std::os::unix::fs::symlink(outer.path().join("secret.txt"), root.join("link.txt")).unwrap();

        let (status, body) = call(
            app_with(Some(root)),
            "POST",
            "/api/v1/classifications",
            Some(json!({"path": "link.txt"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_path_input_refused_without_resume_dir() {
        let (status, body) = call(
            app(),
            "POST",
            "/api/v1/evaluations/batch",
            Some(json!({"path": "kim.txt"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
