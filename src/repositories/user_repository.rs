use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
};
use uuid::Uuid;

use crate::entities::{address, bank_account, user};

/// Persistence for users, their address and payout accounts
pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find_by_id(id).one(conn).await
    }

    /// Emails are stored lower-cased; callers pass the normalized form.
    pub async fn find_by_email<C: ConnectionTrait>(
        conn: &C,
        email: &str,
    ) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(conn)
            .await
    }

    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        model: user::ActiveModel,
    ) -> Result<user::Model, DbErr> {
        model.insert(conn).await
    }

    pub async fn update<C: ConnectionTrait>(
        conn: &C,
        model: user::ActiveModel,
    ) -> Result<user::Model, DbErr> {
        model.update(conn).await
    }

    pub async fn find_address<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Option<address::Model>, DbErr> {
        address::Entity::find()
            .filter(address::Column::UserId.eq(user_id))
            .one(conn)
            .await
    }

    pub async fn save_address<C: ConnectionTrait>(
        conn: &C,
        model: address::ActiveModel,
    ) -> Result<address::Model, DbErr> {
        match model.id {
            sea_orm::ActiveValue::Unchanged(_) => model.update(conn).await,
            _ => model.insert(conn).await,
        }
    }

    pub async fn insert_bank_account<C: ConnectionTrait>(
        conn: &C,
        model: bank_account::ActiveModel,
    ) -> Result<bank_account::Model, DbErr> {
        model.insert(conn).await
    }

    pub async fn bank_accounts<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Vec<bank_account::Model>, DbErr> {
        bank_account::Entity::find()
            .filter(bank_account::Column::UserId.eq(user_id))
            .all(conn)
            .await
    }
}
