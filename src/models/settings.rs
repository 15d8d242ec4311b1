//! Runtime system parameters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Key/value row of `system_parameters`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SystemParameter {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Effective value of one business parameter
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParameterEntry {
    pub value: String,
    /// Value from the configuration file
    pub default: String,
    /// A stored value overrides the default
    pub overridden: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetParameter {
    pub value: String,
}
