use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::State,
    http::{self, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use directory::{RosterSyncJob, SyncError, SyncReport};
use platform_db::DbPool;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{config::AppConfig, graphql::SchemaType};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub schema: SchemaType,
    pub config: Arc<AppConfig>,
    pub sync: Arc<RosterSyncJob>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "kiosk server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_methods([Method::POST, Method::GET])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/graphql", post(graphql_handler))
        .route("/sync/employees", post(sync_employees_handler))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

async fn graphql_handler(State(state): State<AppState>, request: GraphQLRequest) -> GraphQLResponse {
    state.schema.execute(request.into_inner()).await.into()
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = platform_db::ping(&state.pool).await;
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

/// Body of `POST /sync/employees`, for both outcomes.
#[derive(Debug, Serialize)]
struct SyncResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    employees_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SyncResponse {
    fn synced(report: &SyncReport) -> Self {
        Self {
            success: true,
            message: Some(format!(
                "Synced {} employees from the roster provider",
                report.employees_count
            )),
            employees_count: Some(report.employees_count),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            message: None,
            employees_count: None,
            error: Some(error),
        }
    }
}

async fn sync_employees_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> HttpResult<Json<SyncResponse>> {
    authorize(&state.config, &headers)?;
    let report = state.sync.run().await.map_err(HttpError::from_sync)?;
    Ok(Json(SyncResponse::synced(&report)))
}

fn authorize(config: &AppConfig, headers: &HeaderMap) -> HttpResult<()> {
    let Some(expected) = config.sync_api_token.as_deref() else {
        return Err(HttpError::new(
            StatusCode::UNAUTHORIZED,
            "sync endpoint is disabled",
        ));
    };
    match bearer_token(headers) {
        Some(token) if tokens_match(token, expected) => Ok(()),
        Some(_) => Err(HttpError::new(StatusCode::UNAUTHORIZED, "invalid token")),
        None => Err(HttpError::new(StatusCode::UNAUTHORIZED, "missing bearer token")),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let (scheme, token) = headers
        .get(http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .trim()
        .split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|token| !token.is_empty())
}

/// Compares in time independent of where the first mismatch is.
fn tokens_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
        }
    }

    fn from_sync(err: SyncError) -> Self {
        let status = match &err {
            SyncError::AlreadyRunning => StatusCode::CONFLICT,
            SyncError::Upstream(_) => StatusCode::BAD_GATEWAY,
            SyncError::Configuration(_)
            | SyncError::Persistence(_)
            | SyncError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(kind = err.kind(), error = %err, "roster sync request failed");
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(SyncResponse::failed(self.message))).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use directory::{
        DirectoryEntry, EmployeeRepository, RosterPage, RosterProvider, SyncResult, SyncSettings,
    };
    use http_body_util::BodyExt;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct OnePageRoster {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RosterProvider for OnePageRoster {
        fn name(&self) -> &'static str {
            "one-page"
        }

        async fn fetch_page(&self, _cursor: Option<&str>) -> SyncResult<RosterPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SyncError::Upstream("slack users.list failed: ratelimited".into()));
            }
            Ok(RosterPage {
                entries: vec![
                    DirectoryEntry {
                        id: "U1".into(),
                        display_name: Some("Ann Lee".into()),
                        title: Some("Engineer".into()),
                        ..DirectoryEntry::default()
                    },
                    DirectoryEntry {
                        id: "U2".into(),
                        display_name: Some("Old Timer".into()),
                        deactivated: true,
                        ..DirectoryEntry::default()
                    },
                ],
                next_cursor: None,
            })
        }
    }

    async fn test_state(fail: bool, token: Option<&str>) -> (AppState, Arc<OnePageRoster>) {
        let pool = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&pool, None).await.unwrap();
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        config.sync_api_token = token.map(str::to_string);
        let provider = Arc::new(OnePageRoster {
            fail,
            calls: AtomicUsize::new(0),
        });
        let repo = EmployeeRepository::new(pool.clone());
        let sync = Arc::new(RosterSyncJob::new(
            provider.clone(),
            Arc::new(repo.clone()),
            SyncSettings::default(),
        ));
        let state = AppState {
            pool,
            schema: crate::graphql::build_schema(repo),
            config: Arc::new(config),
            sync,
        };
        (state, provider)
    }

    async fn post_sync(state: AppState, auth: Option<&str>) -> (StatusCode, Value) {
        let mut request = http::Request::builder()
            .method(Method::POST)
            .uri("/sync/employees");
        if let Some(auth) = auth {
            request = request.header(http::header::AUTHORIZATION, auth);
        }
        let response = build_router(state)
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn sync_reports_reconciled_count() {
        let (state, _) = test_state(false, Some("s3cret")).await;
        let (status, body) = post_sync(state, Some("Bearer s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["employees_count"], json!(1));
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn sync_requires_matching_bearer_token() {
        let (state, provider) = test_state(false, Some("s3cret")).await;
        let (status, body) = post_sync(state.clone(), Some("Bearer nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"success": false, "error": "invalid token"}));

        let (status, _) = post_sync(state, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sync_is_disabled_without_configured_token() {
        let (state, _) = test_state(false, None).await;
        let (status, body) = post_sync(state, Some("Bearer anything")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], json!("sync endpoint is disabled"));
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_bad_gateway() {
        let (state, _) = test_state(true, Some("s3cret")).await;
        let (status, body) = post_sync(state, Some("Bearer s3cret")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["success"], json!(false));
        assert!(body["error"].as_str().unwrap().contains("ratelimited"));
    }

    #[tokio::test]
    async fn health_reports_database_status() {
        let (state, _) = test_state(false, None).await;
        let response = build_router(state)
            .oneshot(
                http::Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["db_ok"], json!(true));
    }

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer  abc "),
        );
        assert_eq!(bearer_token(&headers), Some("abc"));
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("bearer xyz"));
        assert_eq!(bearer_token(&headers), Some("xyz"));
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn token_comparison_requires_exact_match() {
        assert!(tokens_match("s3cret", "s3cret"));
        assert!(!tokens_match("s3creT", "s3cret"));
        assert!(!tokens_match("s3cre", "s3cret"));
        assert!(!tokens_match("", "s3cret"));
    }

    #[tokio::test]
    async fn scheme_is_matched_case_insensitively() {
        let (state, _) = test_state(false, Some("s3cret")).await;
        let (status, body) = post_sync(state, Some("BEARER s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
    }
}
