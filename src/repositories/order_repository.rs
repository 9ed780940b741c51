use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::order::{self, OrderStatus};
use crate::entities::order_item;

/// An order together with its line snapshots
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// One sold line as seen by the seller who owns the product
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SellerOrderLine {
    #[serde(flatten)]
    pub item: order_item::Model,
    pub order_ref: String,
    pub order_status: OrderStatus,
    pub buyer_id: Uuid,
    pub ordered_at: DateTime<Utc>,
}

/// Persistence for orders and their items
pub struct OrderRepository;

impl OrderRepository {
    pub async fn ref_exists<C: ConnectionTrait>(conn: &C, order_ref: &str) -> Result<bool, DbErr> {
        let count = order::Entity::find()
            .filter(order::Column::OrderRef.eq(order_ref))
            .count(conn)
            .await?;
        Ok(count > 0)
    }

    /// Inserts the order row followed by each item.
    pub async fn insert_with_items<C: ConnectionTrait>(
        conn: &C,
        order: order::ActiveModel,
        items: Vec<order_item::ActiveModel>,
    ) -> Result<OrderWithItems, DbErr> {
        let order = order.insert(conn).await?;
        let mut saved = Vec::with_capacity(items.len());
        for item in items {
            saved.push(item.insert(conn).await?);
        }
        Ok(OrderWithItems {
            order,
            items: saved,
        })
    }

    pub async fn list_for_user<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Vec<OrderWithItems>, DbErr> {
        let rows = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(order_item::Entity)
            .all(conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(order, items)| OrderWithItems { order, items })
            .collect())
    }

    pub async fn find_for_user<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<OrderWithItems>, DbErr> {
        let Some(order) = order::Entity::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(conn)
            .await?
        else {
            return Ok(None);
        };

        let items = order.find_related(order_item::Entity).all(conn).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    pub async fn seller_lines<C: ConnectionTrait>(
        conn: &C,
        seller_id: Uuid,
    ) -> Result<Vec<SellerOrderLine>, DbErr> {
        let rows = order_item::Entity::find()
            .filter(order_item::Column::SellerId.eq(seller_id))
            .order_by_desc(order_item::Column::CreatedAt)
            .find_also_related(order::Entity)
            .all(conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(item, order)| order.map(|order| seller_line(item, order)))
            .collect())
    }

    pub async fn seller_line<C: ConnectionTrait>(
        conn: &C,
        seller_id: Uuid,
        item_id: Uuid,
    ) -> Result<Option<SellerOrderLine>, DbErr> {
        let row = order_item::Entity::find_by_id(item_id)
            .filter(order_item::Column::SellerId.eq(seller_id))
            .find_also_related(order::Entity)
            .one(conn)
            .await?;

        Ok(row.and_then(|(item, order)| order.map(|order| seller_line(item, order))))
    }
}

fn seller_line(item: order_item::Model, order: order::Model) -> SellerOrderLine {
    SellerOrderLine {
        item,
        order_ref: order.order_ref,
        order_status: order.status,
        buyer_id: order.user_id,
        ordered_at: order.created_at,
    }
}
