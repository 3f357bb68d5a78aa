pub mod analytics_service;
pub mod ingestion_service;
pub mod processor;
pub mod query_service;

pub use analytics_service::AnalyticsService;
pub use ingestion_service::IngestionService;
pub use processor::EventProcessor;
pub use query_service::QueryService;
