use crate::engine::{IndexStatus, SearchEngine, SearchOptions};
use crate::error::SearchError;
use crate::index::IndexStats;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// ========== Request/Response Types ==========

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Parallel arrays, best match first
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub documents: Vec<String>,
    pub similarities: Vec<f64>,
    pub indices: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RebuildRequest {
    #[serde(default)]
    pub rank: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub status: IndexStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexStats>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

// ========== Error Handling ==========

struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<SearchError>() {
            Some(SearchError::EmptyQuery) | Some(SearchError::InvalidK(_)) => {
                StatusCode::BAD_REQUEST
            }
            Some(SearchError::RankTooLarge { .. }) | Some(SearchError::EmptyVocabulary) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Some(SearchError::IndexNotReady) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = format!("{:#}", self.0);
        if status.is_server_error() {
            tracing::error!("API error: {}", message);
        } else {
            tracing::debug!("request rejected: {}", message);
        }

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// ========== Handlers ==========

async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::success("OK"))
}

async fn search_documents(
    State(engine): State<Arc<SearchEngine>>,
    Json(req): Json<SearchRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(query = %req.query, "search request");
    let options = SearchOptions {
        top_k: req.top_k.unwrap_or(SearchOptions::default().top_k),
    };

    let hits = engine.search_documents(&req.query, &options)?;

    let response = SearchResponse {
        query: req.query,
        documents: hits.iter().map(|h| h.text.clone()).collect(),
        similarities: hits.iter().map(|h| h.score).collect(),
        indices: hits.iter().map(|h| h.doc_index).collect(),
    };

    Ok(Json(ApiResponse::success(response)))
}

async fn get_document(
    State(engine): State<Arc<SearchEngine>>,
    Path(index): Path<usize>,
) -> Result<Response, AppError> {
    match engine.get_document(index)? {
        Some(text) => Ok(Json(ApiResponse::success(DocumentResponse { index, text })).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error(format!(
                "Document with index {} not found",
                index
            ))),
        )
            .into_response()),
    }
}

async fn get_stats(State(engine): State<Arc<SearchEngine>>) -> Result<impl IntoResponse, AppError> {
    let response = StatsResponse {
        status: engine.status(),
        index: engine.stats().ok(),
    };

    Ok(Json(ApiResponse::success(response)))
}

async fn rebuild_index(
    State(engine): State<Arc<SearchEngine>>,
    Json(req): Json<RebuildRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut config = engine.config();
    if let Some(rank) = req.rank {
        config = config.with_rank(rank);
    }
    if let Some(seed) = req.seed {
        config = config.with_seed(seed);
    }

    // Building is CPU bound; queries keep hitting the old index meanwhile
    let worker = Arc::clone(&engine);
    let index = tokio::task::spawn_blocking(move || worker.rebuild(config)).await??;

    Ok(Json(ApiResponse::success(index.stats())))
}

// ========== Router ==========

pub fn create_router(engine: Arc<SearchEngine>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/search", post(search_documents))
        .route("/documents/:index", get(get_document))
        .route("/stats", get(get_stats))
        .route("/rebuild", post(rebuild_index))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::index::BuildConfig;
    use crate::tokenizer::Tokenizer;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn engine() -> Arc<SearchEngine> {
        let corpus: Corpus = [
            "Rust is a systems programming language",
            "Go is a simple programming language",
            "Cats sleep most of the day",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let engine =
            SearchEngine::with_corpus(Tokenizer::english(), BuildConfig::default().with_rank(3), corpus)
                .unwrap();
        Arc::new(engine)
    }

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_search_endpoint() {
        let router = create_router(engine());
        let (status, body) = call(
            router,
            post_json("/search", json!({"query": "rust programming", "top_k": 2})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let data = &body["data"];
        assert_eq!(data["indices"].as_array().unwrap().len(), 2);
        assert_eq!(data["indices"][0], 0);
        assert_eq!(data["documents"][0], "Rust is a systems programming language");
        assert_eq!(data["similarities"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_defaults_to_five_results() {
        let router = create_router(engine());
        let (status, body) = call(router, post_json("/search", json!({"query": "xyzzy"}))).await;

        assert_eq!(status, StatusCode::OK);
        // Only three documents exist
        assert_eq!(body["data"]["indices"], json!([0, 1, 2]));
        assert_eq!(body["data"]["similarities"], json!([0.0, 0.0, 0.0]));
    }

    #[tokio::test]
    async fn test_query_errors_map_to_bad_request() {
        let router = create_router(engine());
        let (status, body) = call(router.clone(), post_json("/search", json!({"query": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = call(router, post_json("/search", json!({"query": "rust", "top_k": 0}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_not_ready_is_unavailable() {
        let engine = Arc::new(SearchEngine::new(Tokenizer::english(), BuildConfig::default()));
        let router = create_router(engine);
        let (status, _) = call(router, post_json("/search", json!({"query": "rust"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_get_document() {
        let router = create_router(engine());
        let request = Request::builder().uri("/documents/2").body(Body::empty()).unwrap();
        let (status, body) = call(router.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["text"], "Cats sleep most of the day");

        let request = Request::builder().uri("/documents/42").body(Body::empty()).unwrap();
        let (status, _) = call(router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rebuild_and_stats() {
        let engine = engine();
        let router = create_router(Arc::clone(&engine));

        let (status, body) = call(router.clone(), post_json("/rebuild", json!({"rank": 2}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["rank"], 2);

        let (status, _) = call(router.clone(), post_json("/rebuild", json!({"rank": 99}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let request = Request::builder().uri("/stats").body(Body::empty()).unwrap();
        let (status, body) = call(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ready");
        assert_eq!(body["data"]["index"]["rank"], 2);
        assert_eq!(body["data"]["index"]["total_documents"], 3);
    }
}
