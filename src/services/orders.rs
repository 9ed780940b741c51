use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        address,
        cart_item::LineSnapshot,
        order::{self, OrderStatus},
        order_item, payment,
    },
    errors::{is_unique_violation, ServiceError},
    money,
    repositories::{
        CartRepository, OrderRepository, OrderWithItems, PaymentRepository, SellerOrderLine,
        UserRepository,
    },
    services::reference,
};

/// A sold line plus the buyer contact the seller needs to fulfil it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SellerOrderDetail {
    #[serde(flatten)]
    pub line: SellerOrderLine,
    pub buyer_email: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_name: Option<String>,
    pub shipping_address: Option<address::Model>,
}

/// Persists `lines` as a new order for `user_id` on `conn`. The caller owns
/// the cart: run it in the transaction that also clears or consumes it.
///
/// With a settled `payment` the order is created `paid` and linked to it;
/// otherwise it starts `pending`.
pub(crate) async fn materialize_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    order_ref: String,
    lines: Vec<LineSnapshot>,
    payment: Option<&payment::Model>,
) -> Result<OrderWithItems, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::InvalidOperation("cart is empty".to_string()));
    }

    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let total = money::sum_lines(lines.iter().map(|line| (line.price, line.quantity)));

    let items = lines
        .into_iter()
        .map(|line| order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            name: Set(line.name),
            image_url: Set(line.image_url),
            seller_id: Set(line.seller_id),
            price: Set(line.price),
            quantity: Set(line.quantity),
            created_at: Set(now),
        })
        .collect();

    let order = order::ActiveModel {
        id: Set(order_id),
        user_id: Set(user_id),
        order_ref: Set(order_ref),
        total_amount: Set(total),
        status: Set(if payment.is_some() {
            OrderStatus::Paid
        } else {
            OrderStatus::Pending
        }),
        payment_id: Set(payment.map(|p| p.id)),
        transaction_id: Set(payment.and_then(|p| p.session_id.clone())),
        created_at: Set(now),
        updated_at: Set(now),
    };

    OrderRepository::insert_with_items(conn, order, items)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServiceError::Conflict("order reference already in use".to_string())
            } else {
                ServiceError::DatabaseError(err)
            }
        })
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Places a `pending` order from the caller's cart. Refused while the
    /// caller has an active payment.
    #[instrument(skip(self))]
    pub async fn create_order(&self, user_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;
        if let Some(active) = PaymentRepository::find_active(&txn, user_id).await? {
            txn.rollback().await?;
            warn!(payment_id = %active.id, "order refused, checkout in progress");
            return Err(ServiceError::Conflict(
                "a checkout is in progress for this cart".to_string(),
            ));
        }

        let lines = CartRepository::lines(&txn, user_id).await?;
        let order_ref = reference::unique_order_ref(&txn).await?;
        let created = materialize_order(
            &txn,
            user_id,
            order_ref,
            lines.into_iter().map(LineSnapshot::from).collect(),
            None,
        )
        .await?;
        CartRepository::clear(&txn, user_id).await?;
        txn.commit().await?;

        info!(
            order_id = %created.order.id,
            order_ref = %created.order.order_ref,
            total = %created.order.total_amount,
            items = created.items.len(),
            "order created"
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_orders(&self, user_id: Uuid) -> Result<Vec<OrderWithItems>, ServiceError> {
        Ok(OrderRepository::list_for_user(&*self.db, user_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        OrderRepository::find_for_user(&*self.db, user_id, order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", order_id))
    }

    #[instrument(skip(self))]
    pub async fn seller_orders(
        &self,
        seller_id: Uuid,
    ) -> Result<Vec<SellerOrderLine>, ServiceError> {
        Ok(OrderRepository::seller_lines(&*self.db, seller_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn seller_order(
        &self,
        seller_id: Uuid,
        item_id: Uuid,
    ) -> Result<SellerOrderDetail, ServiceError> {
        let line = OrderRepository::seller_line(&*self.db, seller_id, item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order item", item_id))?;

        let buyer = UserRepository::find_by_id(&*self.db, line.buyer_id).await?;
        let shipping_address = UserRepository::find_address(&*self.db, line.buyer_id).await?;
        let buyer_name = buyer.as_ref().and_then(|b| match (&b.first_name, &b.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        });

        Ok(SellerOrderDetail {
            buyer_email: buyer.as_ref().map(|b| b.email.clone()),
            buyer_phone: buyer.and_then(|b| b.phone),
            buyer_name,
            shipping_address,
            line,
        })
    }
}
