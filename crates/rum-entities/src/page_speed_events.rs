use async_trait::async_trait;
use rum_core::DBDateTime;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Navigation timing for one page load. All durations are milliseconds and never negative.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "page_speed_events")]
#[serde(rename_all = "camelCase")]
#[schema(as = PageSpeedEvent)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub session_id: String,
    pub user_id: Option<String>,
    pub page_url: Option<String>,
    pub user_agent: Option<String>,
    pub load_time: f64,
    pub dom_content_loaded: f64,
    pub dom_interactive: f64,
    pub resource_load_time: f64,
    pub first_paint: Option<f64>,
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
