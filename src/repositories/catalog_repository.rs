use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entities::{category, product};

/// Persistence for categories and products
pub struct CatalogRepository;

impl CatalogRepository {
    pub async fn find_category<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<Option<category::Model>, DbErr> {
        category::Entity::find_by_id(id).one(conn).await
    }

    pub async fn list_categories<C: ConnectionTrait>(
        conn: &C,
    ) -> Result<Vec<category::Model>, DbErr> {
        category::Entity::find()
            .order_by_asc(category::Column::DisplayOrder)
            .order_by_asc(category::Column::Name)
            .all(conn)
            .await
    }

    pub async fn insert_category<C: ConnectionTrait>(
        conn: &C,
        model: category::ActiveModel,
    ) -> Result<category::Model, DbErr> {
        model.insert(conn).await
    }

    pub async fn update_category<C: ConnectionTrait>(
        conn: &C,
        model: category::ActiveModel,
    ) -> Result<category::Model, DbErr> {
        model.update(conn).await
    }

    /// Returns the number of rows removed.
    pub async fn delete_category<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<u64, DbErr> {
        Ok(category::Entity::delete_by_id(id)
            .exec(conn)
            .await?
            .rows_affected)
    }

    pub async fn count_child_categories<C: ConnectionTrait>(
        conn: &C,
        parent_id: Uuid,
    ) -> Result<u64, DbErr> {
        category::Entity::find()
            .filter(category::Column::ParentId.eq(parent_id))
            .count(conn)
            .await
    }

    pub async fn count_products_in_category<C: ConnectionTrait>(
        conn: &C,
        category_id: Uuid,
    ) -> Result<u64, DbErr> {
        product::Entity::find()
            .filter(product::Column::CategoryId.eq(category_id))
            .count(conn)
            .await
    }

    pub async fn find_product<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<Option<product::Model>, DbErr> {
        product::Entity::find_by_id(id).one(conn).await
    }

    pub async fn list_products<C: ConnectionTrait>(
        conn: &C,
        category_id: Option<Uuid>,
    ) -> Result<Vec<product::Model>, DbErr> {
        let mut query = product::Entity::find();
        if let Some(category_id) = category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        query
            .order_by_desc(product::Column::CreatedAt)
            .all(conn)
            .await
    }

    pub async fn list_products_by_seller<C: ConnectionTrait>(
        conn: &C,
        seller_id: Uuid,
    ) -> Result<Vec<product::Model>, DbErr> {
        product::Entity::find()
            .filter(product::Column::SellerId.eq(seller_id))
            .order_by_desc(product::Column::CreatedAt)
            .all(conn)
            .await
    }

    pub async fn insert_product<C: ConnectionTrait>(
        conn: &C,
        model: product::ActiveModel,
    ) -> Result<product::Model, DbErr> {
        model.insert(conn).await
    }

    pub async fn update_product<C: ConnectionTrait>(
        conn: &C,
        model: product::ActiveModel,
    ) -> Result<product::Model, DbErr> {
        model.update(conn).await
    }

    pub async fn delete_product<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<u64, DbErr> {
        Ok(product::Entity::delete_by_id(id)
            .exec(conn)
            .await?
            .rows_affected)
    }
}
