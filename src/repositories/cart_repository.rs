use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entities::cart_item;

/// Persistence for per-user cart lines
pub struct CartRepository;

impl CartRepository {
    pub async fn lines<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Vec<cart_item::Model>, DbErr> {
        cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(conn)
            .await
    }

    pub async fn find_line<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<cart_item::Model>, DbErr> {
        cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(conn)
            .await
    }

    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        model: cart_item::ActiveModel,
    ) -> Result<cart_item::Model, DbErr> {
        model.insert(conn).await
    }

    pub async fn update<C: ConnectionTrait>(
        conn: &C,
        model: cart_item::ActiveModel,
    ) -> Result<cart_item::Model, DbErr> {
        model.update(conn).await
    }

    pub async fn delete_line<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<(), DbErr> {
        cart_item::Entity::delete_by_id(id).exec(conn).await?;
        Ok(())
    }

    /// Removes every line for `user_id`, returning how many were removed.
    pub async fn clear<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<u64, DbErr> {
        Ok(cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(conn)
            .await?
            .rows_affected)
    }
}
