use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One cart line per (user, product). Name, image, seller and price are
/// copied from the product when the line is created.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "cart_items")]
#[schema(as = CartItem)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub seller_id: Uuid,
    pub price: Decimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Frozen copy of a cart line, kept on a payment so the paid order matches
/// what was charged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LineSnapshot {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub seller_id: Uuid,
    pub price: Decimal,
    pub quantity: i32,
}

impl From<Model> for LineSnapshot {
    fn from(line: Model) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name,
            image_url: line.image_url,
            seller_id: line.seller_id,
            price: line.price,
            quantity: line.quantity,
        }
    }
}
