use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection, IntoActiveModel, Set, TransactionTrait};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    entities::{category, product},
    errors::ServiceError,
    repositories::CatalogRepository,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub parent_id: Option<Uuid>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub parent_id: Option<Uuid>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    pub category_id: Uuid,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock: i32,
}

/// Partial product edit. `None` leaves a field unchanged; `Some` overwrites
/// it, zero and empty values included.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RestockInput {
    /// New absolute stock level
    #[validate(range(min = 0))]
    pub stock: i32,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::new("price_must_not_be_negative"));
    }
    Ok(())
}

/// Category and product management. Products may only be mutated by the
/// seller that owns them.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;
        if let Some(parent_id) = input.parent_id {
            ensure_category_exists(&*self.db, parent_id).await?;
        }

        let now = Utc::now();
        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            parent_id: Set(input.parent_id),
            image_url: Set(input.image_url),
            display_order: Set(input.display_order.unwrap_or(0)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let category = CatalogRepository::insert_category(&*self.db, model).await?;

        info!(category_id = %category.id, "category created");
        Ok(category)
    }

    #[instrument(skip(self, input))]
    pub async fn update_category(
        &self,
        id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;
        let existing = self.get_category(id).await?;

        if let Some(parent_id) = input.parent_id {
            if parent_id == id {
                return Err(ServiceError::ValidationError(
                    "a category cannot be its own parent".to_string(),
                ));
            }
            ensure_category_exists(&*self.db, parent_id).await?;
            ensure_not_descendant(&*self.db, id, parent_id).await?;
        }

        let mut active = existing.into_active_model();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(parent_id) = input.parent_id {
            active.parent_id = Set(Some(parent_id));
        }
        if let Some(image_url) = input.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(display_order) = input.display_order {
            active.display_order = Set(display_order);
        }
        active.updated_at = Set(Utc::now());

        let category = CatalogRepository::update_category(&*self.db, active).await?;
        info!(category_id = %id, "category updated");
        Ok(category)
    }

    /// Refuses to delete a category that still has products or children.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        if CatalogRepository::find_category(&txn, id).await?.is_none() {
            return Err(ServiceError::not_found("category", id));
        }
        if CatalogRepository::count_products_in_category(&txn, id).await? > 0 {
            return Err(ServiceError::Conflict(
                "category still has products".to_string(),
            ));
        }
        if CatalogRepository::count_child_categories(&txn, id).await? > 0 {
            return Err(ServiceError::Conflict(
                "category still has subcategories".to_string(),
            ));
        }

        CatalogRepository::delete_category(&txn, id).await?;
        txn.commit().await?;

        info!(category_id = %id, "category deleted");
        Ok(())
    }

    pub async fn get_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        CatalogRepository::find_category(&*self.db, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(CatalogRepository::list_categories(&*self.db).await?)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        seller_id: Uuid,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        ensure_category_exists(&*self.db, input.category_id).await?;

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            category_id: Set(input.category_id),
            image_url: Set(input.image_url),
            price: Set(input.price),
            stock: Set(input.stock),
            seller_id: Set(seller_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let product = CatalogRepository::insert_product(&*self.db, model).await?;

        info!(product_id = %product.id, seller_id = %seller_id, "product created");
        Ok(product)
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        seller_id: Uuid,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let existing = self.owned_product(seller_id, id).await?;
        if let Some(category_id) = input.category_id {
            ensure_category_exists(&*self.db, category_id).await?;
        }

        let mut active = existing.into_active_model();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(image_url) = input.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(stock) = input.stock {
            active.stock = Set(stock);
        }
        active.updated_at = Set(Utc::now());

        let product = CatalogRepository::update_product(&*self.db, active).await?;
        info!(product_id = %id, "product updated");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, seller_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        self.owned_product(seller_id, id).await?;
        CatalogRepository::delete_product(&*self.db, id).await?;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn restock_product(
        &self,
        seller_id: Uuid,
        id: Uuid,
        input: RestockInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let existing = self.owned_product(seller_id, id).await?;
        let previous = existing.stock;

        let mut active = existing.into_active_model();
        active.stock = Set(input.stock);
        active.updated_at = Set(Utc::now());
        let product = CatalogRepository::update_product(&*self.db, active).await?;

        info!(product_id = %id, previous, stock = input.stock, "product restocked");
        Ok(product)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        CatalogRepository::find_product(&*self.db, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("product", id))
    }

    pub async fn list_products(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<product::Model>, ServiceError> {
        Ok(CatalogRepository::list_products(&*self.db, category_id).await?)
    }

    pub async fn list_seller_products(
        &self,
        seller_id: Uuid,
    ) -> Result<Vec<product::Model>, ServiceError> {
        Ok(CatalogRepository::list_products_by_seller(&*self.db, seller_id).await?)
    }

    /// A seller's view of one of their own products.
    pub async fn get_seller_product(
        &self,
        seller_id: Uuid,
        id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        self.owned_product(seller_id, id).await
    }

    async fn owned_product(
        &self,
        seller_id: Uuid,
        id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        let product = self.get_product(id).await?;
        if product.seller_id != seller_id {
            warn!(product_id = %id, seller_id = %seller_id, "product belongs to another seller");
            return Err(ServiceError::Forbidden(
                "product belongs to another seller".to_string(),
            ));
        }
        Ok(product)
    }
}

/// Walks up from `parent_id` and rejects the move if it passes through `id`.
async fn ensure_not_descendant<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    parent_id: Uuid,
) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    let mut cursor = Some(parent_id);
    while let Some(current) = cursor {
        if current == id {
            return Err(ServiceError::ValidationError(
                "a category cannot be moved under its own subcategory".to_string(),
            ));
        }
        if !seen.insert(current) {
            break;
        }
        cursor = CatalogRepository::find_category(conn, current)
            .await?
            .and_then(|category| category.parent_id);
    }
    Ok(())
}

async fn ensure_category_exists<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<(), ServiceError> {
    match CatalogRepository::find_category(conn, id).await? {
        Some(_) => Ok(()),
        None => Err(ServiceError::ValidationError(format!(
            "category {} does not exist",
            id
        ))),
    }
}
