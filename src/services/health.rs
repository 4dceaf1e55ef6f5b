use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

use crate::activity::{ActivityRegistry, RegistryStats};
use crate::board::BoardManager;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: DatabaseHealth,
    pub activities: ActivityHealth,
    pub boards: usize,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub connection_pool_size: u32,
    pub response_time_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityHealth {
    pub live: usize,
    pub started: u64,
    pub finished: u64,
    pub expired_interactions: u64,
}

impl From<RegistryStats> for ActivityHealth {
    fn from(stats: RegistryStats) -> Self {
        Self {
            live: stats.live,
            started: stats.started,
            finished: stats.finished,
            expired_interactions: stats.expired_interactions,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registry: ActivityRegistry,
    pub boards: BoardManager,
    pub start_time: DateTime<Utc>,
}

pub struct HealthService {
    pub router: Router,
}

impl HealthService {
    pub fn new(registry: ActivityRegistry, boards: BoardManager) -> Self {
        let state = AppState {
            registry,
            boards,
            start_time: Utc::now(),
        };

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .route("/health/live", get(liveness_check))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        Self { router }
    }
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let start = std::time::Instant::now();
    let db = &state.registry.env().db;

    let db_status = match db.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!("Health check database ping failed: {}", e);
            "unhealthy"
        }
    };

    let response_time_ms = start.elapsed().as_millis() as u64;
    let uptime = Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;

    let health_response = HealthResponse {
        status: db_status.to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            status: db_status.to_string(),
            connection_pool_size: db.pool.size(),
            response_time_ms,
        },
        activities: state.registry.stats().into(),
        boards: state.boards.board_count(),
        uptime_seconds: uptime,
    };

    let code = if db_status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(health_response))
}

async fn readiness_check(State(state): State<AppState>) -> Result<Json<&'static str>, StatusCode> {
    match state.registry.env().db.ping().await {
        Ok(()) => Ok(Json("ready")),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn liveness_check() -> Json<&'static str> {
    Json("alive")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use tempfile::TempDir;

    use crate::activity::ActivityEnv;
    use crate::board::default_schedule;
    use crate::database::DatabaseManager;
    use crate::gateway::InMemoryGateway;

    async fn create_test_health_service() -> (HealthService, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let db = DatabaseManager::new(&db_url)
            .await
            .expect("Failed to create test database");
        db.run_migrations().await.expect("Failed to run migrations");

        let gateway = Arc::new(InMemoryGateway::new());
        let registry = ActivityRegistry::new(ActivityEnv::new(gateway.clone(), db));
        let boards = BoardManager::new(
            gateway,
            default_schedule(chrono_tz::Europe::Helsinki),
            Duration::from_secs(60),
        );

        (HealthService::new(registry, boards), temp_dir)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (health_service, _temp_dir) = create_test_health_service().await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health").await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let health_response: HealthResponse = response.json();
        assert_eq!(health_response.status, "healthy");
        assert_eq!(health_response.database.status, "healthy");
        assert_eq!(health_response.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(health_response.boards, 0);
        assert_eq!(
            health_response.activities,
            ActivityHealth {
                live: 0,
                started: 0,
                finished: 0,
                expired_interactions: 0
            }
        );
    }

    #[tokio::test]
    async fn test_readiness_endpoint() {
        let (health_service, _temp_dir) = create_test_health_service().await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health/ready").await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let ready_response: String = response.json();
        assert_eq!(ready_response, "ready");
    }

    #[tokio::test]
    async fn test_liveness_endpoint() {
        let (health_service, _temp_dir) = create_test_health_service().await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health/live").await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let alive_response: String = response.json();
        assert_eq!(alive_response, "alive");
    }
}
