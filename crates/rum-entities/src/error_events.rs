use async_trait::async_trait;
use rum_core::DBDateTime;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A JavaScript error or unhandled rejection captured in the browser
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "error_events")]
#[serde(rename_all = "camelCase")]
#[schema(as = ErrorEvent)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub session_id: String,
    pub user_id: Option<String>,
    pub page_url: Option<String>,
    pub user_agent: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub error_type: String,
    pub source: Option<String>,
    pub lineno: Option<i32>,
    pub colno: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub stack: Option<String>,
    pub severity: Option<String>,
    /// Breadcrumb trail leading up to the error, stored as a JSON array
    #[schema(value_type = Option<Vec<Object>>)]
    pub breadcrumbs: Option<Json>,
    #[sea_orm(column_type = "Text", nullable)]
    pub component_stack: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    pub event_timestamp: DBDateTime,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert && self.created_at.is_not_set() {
            self.created_at = Set(chrono::Utc::now());
        }
        Ok(self)
    }
}
