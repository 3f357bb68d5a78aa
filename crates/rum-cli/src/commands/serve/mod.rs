use std::any::Any;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use clap::Args;
use rum_core::plugin::PluginManager;
use rum_core::{DatabaseConfig, ServerConfig};
use rum_database::DbConnection;
use rum_telemetry::TelemetryPlugin;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use utoipa_swagger_ui::SwaggerUi;

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1:8080", env = "RUM_ADDRESS")]
    pub address: String,

    /// Database connection URL (postgres:// or sqlite:)
    #[arg(long, env = "RUM_DATABASE_URL")]
    pub database_url: String,

    /// Path prefix every API route is mounted under
    #[arg(long, default_value = "/api/rum", env = "RUM_API_BASE_PATH")]
    pub api_base_path: String,

    /// Batch items processed concurrently during ingestion
    #[arg(long, default_value_t = 1, env = "RUM_INGEST_CONCURRENCY")]
    pub ingest_concurrency: usize,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let config = ServerConfig::new(
            self.address,
            self.api_base_path,
            self.ingest_concurrency,
            DatabaseConfig::from_env(self.database_url)?,
        )?;

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(serve(config))
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    debug!("Initializing database connection...");
    let db = rum_database::establish_connection(&config.database).await?;

    let app = build_application(db, &config).await?;

    let listener = TcpListener::bind(&config.address).await?;
    info!(
        "RUM backend listening on {} (API at {})",
        config.address,
        if config.api_base_path.is_empty() {
            "/"
        } else {
            config.api_base_path.as_str()
        }
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("RUM backend exited");
    Ok(())
}

/// Wire plugins, OpenAPI docs and the HTTP middleware stack around `db`
pub async fn build_application(
    db: Arc<DbConnection>,
    config: &ServerConfig,
) -> anyhow::Result<Router> {
    let mut plugin_manager = PluginManager::new();
    plugin_manager.service_context().register_service(db);
    plugin_manager.register_plugin(Box::new(TelemetryPlugin::with_ingest_concurrency(
        config.ingest_concurrency,
    )));

    plugin_manager
        .initialize_plugins()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize plugins: {}", e))?;

    debug!("Building application with plugin routes");
    let api_doc = plugin_manager.unified_openapi(&config.api_base_path);
    let app = plugin_manager
        .build_application(&config.api_base_path)
        .map_err(|e| anyhow::anyhow!("Failed to build application: {}", e))?
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_doc));

    // Browsers post telemetry from arbitrary origins
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Ok(app
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };

    error!("Request handler panicked: {}", message);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "status": "error",
            "error": message,
        })),
    )
        .into_response()
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down gracefully"),
        Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use rum_database::test_utils::TestDatabase;
    use tower::ServiceExt;

    async fn test_app(api_base_path: &str) -> (TestDatabase, Router) {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let config = ServerConfig::new(
            "127.0.0.1:0".to_string(),
            api_base_path.to_string(),
            2,
            DatabaseConfig::new("sqlite::memory:"),
        )
        .unwrap();
        let app = build_application(test_db.connection_arc(), &config)
            .await
            .unwrap();
        (test_db, app)
    }

    #[tokio::test]
    async fn test_routes_mounted_under_base_path() {
        let (_db, app) = test_app("api/rum/").await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/rum/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let (_db, app) = test_app("/api/rum").await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["info"]["title"], "RUM Backend");
        assert!(doc["paths"]["/ingest"].is_object());
        assert_eq!(doc["servers"][0]["url"], "/api/rum");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let (_db, app) = test_app("/api/rum").await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/rum/health")
                    .header("origin", "https://shop.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }

    #[tokio::test]
    async fn test_panic_rendered_as_error_body() {
        let response = handle_panic(Box::new("store exploded"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "store exploded");
    }
}
