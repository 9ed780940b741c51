use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entities::payment::{self, PaymentStatus};

/// Persistence for checkout payment records
pub struct PaymentRepository;

impl PaymentRepository {
    /// The user's `initial` or `pending` payment, if any.
    pub async fn find_active<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Option<payment::Model>, DbErr> {
        payment::Entity::find()
            .filter(payment::Column::UserId.eq(user_id))
            .filter(payment::Column::Status.is_in(PaymentStatus::ACTIVE))
            .order_by_desc(payment::Column::CreatedAt)
            .one(conn)
            .await
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<Option<payment::Model>, DbErr> {
        payment::Entity::find_by_id(id).one(conn).await
    }

    /// True when a payment already reserved `order_ref`.
    pub async fn ref_exists<C: ConnectionTrait>(conn: &C, order_ref: &str) -> Result<bool, DbErr> {
        let count = payment::Entity::find()
            .filter(payment::Column::OrderRef.eq(order_ref))
            .count(conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn list_for_user<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Vec<payment::Model>, DbErr> {
        payment::Entity::find()
            .filter(payment::Column::UserId.eq(user_id))
            .order_by_desc(payment::Column::CreatedAt)
            .all(conn)
            .await
    }

    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        model: payment::ActiveModel,
    ) -> Result<payment::Model, DbErr> {
        model.insert(conn).await
    }

    pub async fn update<C: ConnectionTrait>(
        conn: &C,
        model: payment::ActiveModel,
    ) -> Result<payment::Model, DbErr> {
        model.update(conn).await
    }
}
