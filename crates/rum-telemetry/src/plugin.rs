use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rum_core::plugin::{
    PluginContext, PluginError, PluginRoutes, RumPlugin, ServiceRegistrationContext,
};
use sea_orm::DatabaseConnection;
use tracing::{debug, warn};
use utoipa::openapi::OpenApi;
use utoipa::OpenApi as OpenApiTrait;

use crate::handlers::{configure_routes, AppState, TelemetryApiDoc};
use crate::services::{AnalyticsService, IngestionService, QueryService};
use crate::store::TelemetryStores;

/// Telemetry plugin: ingestion, record queries and dashboard statistics
pub struct TelemetryPlugin {
    ingest_concurrency: usize,
}

impl TelemetryPlugin {
    pub fn new() -> Self {
        Self::with_ingest_concurrency(1)
    }

    pub fn with_ingest_concurrency(ingest_concurrency: usize) -> Self {
        Self { ingest_concurrency }
    }
}

impl Default for TelemetryPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl RumPlugin for TelemetryPlugin {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn register_services<'a>(
        &'a self,
        context: &'a ServiceRegistrationContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>> {
        Box::pin(async move {
            let db = context.require_service::<DatabaseConnection>()?;
            let stores = TelemetryStores::sea_orm(db);

            context.register_service(Arc::new(IngestionService::with_concurrency(
                stores.clone(),
                self.ingest_concurrency,
            )));
            context.register_service(Arc::new(AnalyticsService::new(stores.clone())));
            context.register_service(Arc::new(QueryService::new(stores)));

            debug!(
                ingest_concurrency = self.ingest_concurrency,
                "Telemetry plugin services registered successfully"
            );
            Ok(())
        })
    }

    fn configure_routes(&self, context: &PluginContext) -> Option<PluginRoutes> {
        let services = (
            context.get_service::<IngestionService>(),
            context.get_service::<AnalyticsService>(),
            context.get_service::<QueryService>(),
        );

        let (Some(ingestion_service), Some(analytics_service), Some(query_service)) = services
        else {
            warn!("Telemetry services are not registered; skipping telemetry routes");
            return None;
        };

        let state = Arc::new(AppState {
            ingestion_service,
            analytics_service,
            query_service,
        });

        Some(PluginRoutes::new(configure_routes().with_state(state)))
    }

    fn openapi_schema(&self) -> Option<OpenApi> {
        Some(<TelemetryApiDoc as OpenApiTrait>::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rum_core::plugin::PluginManager;
    use rum_database::test_utils::TestDatabase;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_telemetry_plugin_name() {
        let plugin = TelemetryPlugin::new();
        assert_eq!(plugin.name(), "telemetry");
    }

    #[tokio::test]
    async fn test_telemetry_plugin_default() {
        let plugin = TelemetryPlugin::default();
        assert_eq!(plugin.name(), "telemetry");
        assert_eq!(plugin.ingest_concurrency, 1);
    }

    #[tokio::test]
    async fn test_registration_requires_database() {
        let mut manager = PluginManager::new();
        manager.register_plugin(Box::new(TelemetryPlugin::new()));

        let result = manager.initialize_plugins().await;
        assert!(matches!(
            result,
            Err(PluginError::PluginRegistrationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_plugin_serves_routes_under_base_path() {
        let test_db = TestDatabase::with_migrations().await.unwrap();

        let mut manager = PluginManager::new();
        manager
            .service_context()
            .register_service(test_db.connection_arc());
        manager.register_plugin(Box::new(TelemetryPlugin::with_ingest_concurrency(2)));
        manager.initialize_plugins().await.unwrap();

        let app = manager.build_application("/api/rum").unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/rum/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let openapi = manager.unified_openapi("/api/rum");
        assert!(openapi.paths.paths.contains_key("/stats"));
    }
}
