use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection, IntoActiveModel, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::cart_item::{self, LineSnapshot},
    errors::ServiceError,
    money,
    repositories::{CartRepository, CatalogRepository},
};

/// Sets the quantity of `product_id` in the caller's cart. Zero or a
/// negative quantity removes the line.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    #[validate(range(max = 10000))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<cart_item::Model>,
    pub total: Decimal,
}

impl CartView {
    pub fn from_lines(items: Vec<cart_item::Model>) -> Self {
        let total = money::sum_lines(items.iter().map(|line| (line.price, line.quantity)));
        Self { items, total }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Takes purchased quantities out of the live cart. Lines added or raised
/// after checkout keep the difference.
pub(crate) async fn consume_lines<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    purchased: &[LineSnapshot],
) -> Result<(), ServiceError> {
    let now = Utc::now();
    for bought in purchased {
        let Some(line) = CartRepository::find_line(conn, user_id, bought.product_id).await? else {
            continue;
        };
        let remaining = line.quantity - bought.quantity;
        if remaining <= 0 {
            CartRepository::delete_line(conn, line.id).await?;
        } else {
            let mut active = line.into_active_model();
            active.quantity = Set(remaining);
            active.updated_at = Set(now);
            CartRepository::update(conn, active).await?;
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(product_id = %input.product_id, quantity = input.quantity))]
    pub async fn add_to_cart(
        &self,
        user_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartView, ServiceError> {
        input.validate()?;
        let now = Utc::now();

        let txn = self.db.begin().await?;
        match CartRepository::find_line(&txn, user_id, input.product_id).await? {
            Some(line) if input.quantity <= 0 => {
                CartRepository::delete_line(&txn, line.id).await?;
                info!(user_id = %user_id, "cart line removed");
            }
            Some(line) => {
                let mut active = line.into_active_model();
                active.quantity = Set(input.quantity);
                active.updated_at = Set(now);
                CartRepository::update(&txn, active).await?;
            }
            None if input.quantity <= 0 => {}
            None => {
                let product = CatalogRepository::find_product(&txn, input.product_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("product", input.product_id))?;

                CartRepository::insert(
                    &txn,
                    cart_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        user_id: Set(user_id),
                        product_id: Set(product.id),
                        name: Set(product.name),
                        image_url: Set(product.image_url),
                        seller_id: Set(product.seller_id),
                        price: Set(product.price),
                        quantity: Set(input.quantity),
                        created_at: Set(now),
                        updated_at: Set(now),
                    },
                )
                .await?;
                info!(user_id = %user_id, "cart line added");
            }
        }

        let lines = CartRepository::lines(&txn, user_id).await?;
        txn.commit().await?;
        Ok(CartView::from_lines(lines))
    }

    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let lines = CartRepository::lines(&*self.db, user_id).await?;
        Ok(CartView::from_lines(lines))
    }
}
