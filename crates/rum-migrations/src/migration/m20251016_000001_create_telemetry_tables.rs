use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========================================
        // WEB_VITAL_EVENTS TABLE
        // ========================================
        let mut table = telemetry_table(WebVitalEvents::Table);
        table
            .col(
                ColumnDef::new(WebVitalEvents::MetricName)
                    .string_len(20)
                    .not_null(),
            )
            .col(ColumnDef::new(WebVitalEvents::MetricValue).double().not_null())
            .col(ColumnDef::new(WebVitalEvents::Rating).string_len(20).null())
            .col(
                ColumnDef::new(WebVitalEvents::NavigationType)
                    .string_len(50)
                    .null(),
            );
        manager.create_table(table).await?;
        create_envelope_indexes(manager, WebVitalEvents::Table, "web_vital_events").await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_web_vital_events_metric_name")
                    .table(WebVitalEvents::Table)
                    .col(WebVitalEvents::MetricName)
                    .to_owned(),
            )
            .await?;

        // ========================================
        // ERROR_EVENTS TABLE
        // ========================================
        let mut table = telemetry_table(ErrorEvents::Table);
        table
            .col(ColumnDef::new(ErrorEvents::Message).text().not_null())
            .col(ColumnDef::new(ErrorEvents::ErrorType).string_len(30).not_null())
            .col(ColumnDef::new(ErrorEvents::Source).string_len(300).null())
            .col(ColumnDef::new(ErrorEvents::Lineno).integer().null())
            .col(ColumnDef::new(ErrorEvents::Colno).integer().null())
            .col(ColumnDef::new(ErrorEvents::Stack).text().null())
            .col(ColumnDef::new(ErrorEvents::Severity).string_len(20).null())
            .col(ColumnDef::new(ErrorEvents::Breadcrumbs).json().null())
            .col(ColumnDef::new(ErrorEvents::ComponentStack).text().null());
        manager.create_table(table).await?;
        create_envelope_indexes(manager, ErrorEvents::Table, "error_events").await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_error_events_error_type")
                    .table(ErrorEvents::Table)
                    .col(ErrorEvents::ErrorType)
                    .to_owned(),
            )
            .await?;

        // ========================================
        // PAGE_VIEW_EVENTS TABLE
        // ========================================
        let mut table = telemetry_table(PageViewEvents::Table);
        table
            .col(
                ColumnDef::new(PageViewEvents::PagePath)
                    .string_len(500)
                    .not_null(),
            )
            .col(ColumnDef::new(PageViewEvents::PageTitle).string_len(200).null())
            .col(ColumnDef::new(PageViewEvents::Referrer).string_len(500).null())
            .col(
                ColumnDef::new(PageViewEvents::PreviousPage)
                    .string_len(500)
                    .null(),
            );
        manager.create_table(table).await?;
        create_envelope_indexes(manager, PageViewEvents::Table, "page_view_events").await?;

        // ========================================
        // PAGE_SPEED_EVENTS TABLE
        // ========================================
        let mut table = telemetry_table(PageSpeedEvents::Table);
        table
            .col(ColumnDef::new(PageSpeedEvents::LoadTime).double().not_null())
            .col(
                ColumnDef::new(PageSpeedEvents::DomContentLoaded)
                    .double()
                    .not_null(),
            )
            .col(
                ColumnDef::new(PageSpeedEvents::DomInteractive)
                    .double()
                    .not_null(),
            )
            .col(
                ColumnDef::new(PageSpeedEvents::ResourceLoadTime)
                    .double()
                    .not_null(),
            )
            .col(ColumnDef::new(PageSpeedEvents::FirstPaint).double().null());
        manager.create_table(table).await?;
        create_envelope_indexes(manager, PageSpeedEvents::Table, "page_speed_events").await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_page_speed_events_page_url")
                    .table(PageSpeedEvents::Table)
                    .col(Envelope::PageUrl)
                    .to_owned(),
            )
            .await?;

        // ========================================
        // ENGAGEMENT_EVENTS TABLE
        // ========================================
        let mut table = telemetry_table(EngagementEvents::Table);
        table
            .col(
                ColumnDef::new(EngagementEvents::TimeOnPage)
                    .double()
                    .not_null(),
            )
            .col(
                ColumnDef::new(EngagementEvents::ScrollDepth)
                    .integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(EngagementEvents::InteractionCount)
                    .integer()
                    .not_null(),
            )
            .col(ColumnDef::new(EngagementEvents::ExitType).string_len(20).null());
        manager.create_table(table).await?;
        create_envelope_indexes(manager, EngagementEvents::Table, "engagement_events").await?;

        // ========================================
        // NETWORK_ERROR_EVENTS TABLE
        // ========================================
        let mut table = telemetry_table(NetworkErrorEvents::Table);
        table
            .col(ColumnDef::new(NetworkErrorEvents::Url).text().not_null())
            .col(
                ColumnDef::new(NetworkErrorEvents::Method)
                    .string_len(10)
                    .not_null(),
            )
            .col(ColumnDef::new(NetworkErrorEvents::StatusCode).integer().null())
            .col(ColumnDef::new(NetworkErrorEvents::Message).text().not_null())
            .col(
                ColumnDef::new(NetworkErrorEvents::Duration)
                    .double()
                    .not_null(),
            )
            .col(
                ColumnDef::new(NetworkErrorEvents::ErrorType)
                    .string_len(20)
                    .not_null(),
            );
        manager.create_table(table).await?;
        create_envelope_indexes(manager, NetworkErrorEvents::Table, "network_error_events")
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_network_error_events_error_type")
                    .table(NetworkErrorEvents::Table)
                    .col(NetworkErrorEvents::ErrorType)
                    .to_owned(),
            )
            .await?;

        // ========================================
        // RESOURCE_PERFORMANCE_EVENTS TABLE
        // ========================================
        let mut table = telemetry_table(ResourcePerformanceEvents::Table);
        table
            .col(
                ColumnDef::new(ResourcePerformanceEvents::Url)
                    .text()
                    .not_null(),
            )
            .col(
                ColumnDef::new(ResourcePerformanceEvents::ResourceType)
                    .string_len(30)
                    .not_null(),
            )
            .col(
                ColumnDef::new(ResourcePerformanceEvents::Duration)
                    .double()
                    .not_null(),
            )
            .col(
                ColumnDef::new(ResourcePerformanceEvents::TransferSize)
                    .big_integer()
                    .not_null()
                    .default(0),
            )
            .col(
                ColumnDef::new(ResourcePerformanceEvents::EncodedBodySize)
                    .big_integer()
                    .not_null()
                    .default(0),
            )
            .col(
                ColumnDef::new(ResourcePerformanceEvents::DecodedBodySize)
                    .big_integer()
                    .not_null()
                    .default(0),
            )
            .col(
                ColumnDef::new(ResourcePerformanceEvents::CacheHit)
                    .boolean()
                    .not_null()
                    .default(false),
            );
        manager.create_table(table).await?;
        create_envelope_indexes(
            manager,
            ResourcePerformanceEvents::Table,
            "resource_performance_events",
        )
        .await?;

        // ========================================
        // USER_ACTION_EVENTS TABLE
        // ========================================
        let mut table = telemetry_table(UserActionEvents::Table);
        table
            .col(
                ColumnDef::new(UserActionEvents::ActionType)
                    .string_len(20)
                    .not_null(),
            )
            .col(
                ColumnDef::new(UserActionEvents::TargetElement)
                    .string_len(100)
                    .not_null(),
            )
            .col(ColumnDef::new(UserActionEvents::TargetText).string_len(200).null())
            .col(ColumnDef::new(UserActionEvents::TargetId).string_len(100).null())
            .col(
                ColumnDef::new(UserActionEvents::TargetClass)
                    .string_len(200)
                    .null(),
            )
            .col(ColumnDef::new(UserActionEvents::XPath).text().null())
            .col(ColumnDef::new(UserActionEvents::Value).string_len(500).null());
        manager.create_table(table).await?;
        create_envelope_indexes(manager, UserActionEvents::Table, "user_action_events").await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            "user_action_events",
            "resource_performance_events",
            "network_error_events",
            "engagement_events",
            "page_speed_events",
            "page_view_events",
            "error_events",
            "web_vital_events",
        ] {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).if_exists().to_owned())
                .await?;
        }

        Ok(())
    }
}

/// Table skeleton with the columns every telemetry event carries
fn telemetry_table<T: Iden + 'static>(table: T) -> TableCreateStatement {
    Table::create()
        .table(table)
        .if_not_exists()
        .col(
            ColumnDef::new(Envelope::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(Envelope::SessionId).string_len(100).not_null())
        .col(ColumnDef::new(Envelope::UserId).string_len(100).null())
        .col(ColumnDef::new(Envelope::PageUrl).string_len(500).null())
        .col(ColumnDef::new(Envelope::UserAgent).string_len(300).null())
        .col(
            ColumnDef::new(Envelope::EventTimestamp)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(Envelope::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .to_owned()
}

/// Session lookups and time-window scans are the hot paths on every table
async fn create_envelope_indexes<T: Iden + Copy + 'static>(
    manager: &SchemaManager<'_>,
    table: T,
    table_name: &str,
) -> Result<(), DbErr> {
    manager
        .create_index(
            Index::create()
                .name(format!("idx_{}_session_id", table_name))
                .table(table)
                .col(Envelope::SessionId)
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .name(format!("idx_{}_event_timestamp", table_name))
                .table(table)
                .col(Envelope::EventTimestamp)
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .name(format!("idx_{}_user_id", table_name))
                .table(table)
                .col(Envelope::UserId)
                .to_owned(),
        )
        .await?;

    Ok(())
}

#[derive(DeriveIden)]
enum Envelope {
    Id,
    SessionId,
    UserId,
    PageUrl,
    UserAgent,
    EventTimestamp,
    CreatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum WebVitalEvents {
    Table,
    MetricName,
    MetricValue,
    Rating,
    NavigationType,
}

#[derive(DeriveIden, Clone, Copy)]
enum ErrorEvents {
    Table,
    Message,
    ErrorType,
    Source,
    Lineno,
    Colno,
    Stack,
    Severity,
    Breadcrumbs,
    ComponentStack,
}

#[derive(DeriveIden, Clone, Copy)]
enum PageViewEvents {
    Table,
    PagePath,
    PageTitle,
    Referrer,
    PreviousPage,
}

#[derive(DeriveIden, Clone, Copy)]
enum PageSpeedEvents {
    Table,
    LoadTime,
    DomContentLoaded,
    DomInteractive,
    ResourceLoadTime,
    FirstPaint,
}

#[derive(DeriveIden, Clone, Copy)]
enum EngagementEvents {
    Table,
    TimeOnPage,
    ScrollDepth,
    InteractionCount,
    ExitType,
}

#[derive(DeriveIden, Clone, Copy)]
enum NetworkErrorEvents {
    Table,
    Url,
    Method,
    StatusCode,
    Message,
    Duration,
    ErrorType,
}

#[derive(DeriveIden, Clone, Copy)]
enum ResourcePerformanceEvents {
    Table,
    Url,
    ResourceType,
    Duration,
    TransferSize,
    EncodedBodySize,
    DecodedBodySize,
    CacheHit,
}

#[derive(DeriveIden, Clone, Copy)]
enum UserActionEvents {
    Table,
    ActionType,
    TargetElement,
    TargetText,
    TargetId,
    TargetClass,
    XPath,
    Value,
}
