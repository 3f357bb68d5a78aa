//! Database migrations for the RUM telemetry tables

pub use sea_orm_migration::prelude::*;

mod migration;
pub use migration::Migrator;
