use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::cart_item::LineSnapshot;

/// Hosted checkout attempt. At most one row per user may be `initial` or
/// `pending`; a partial unique index enforces it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "payments")]
#[schema(as = Payment)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub order_ref: String,
    pub session_id: Option<String>,
    pub customer_id: Option<String>,
    pub status: PaymentStatus,
    pub checkout_url: Option<String>,
    /// Last raw status reported by the provider
    pub response: Option<String>,
    /// Cart lines the amount was computed from
    #[sea_orm(column_type = "Json")]
    #[schema(value_type = Vec<super::cart_item::LineSnapshot>)]
    pub line_items: Json,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "initial")]
    Initial,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl Model {
    pub fn lines(&self) -> Result<Vec<LineSnapshot>, serde_json::Error> {
        serde_json::from_value(self.line_items.clone())
    }
}

impl PaymentStatus {
    /// Statuses that block a new checkout for the same user.
    pub const ACTIVE: [PaymentStatus; 2] = [PaymentStatus::Initial, PaymentStatus::Pending];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}
