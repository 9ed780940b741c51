use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shopfront API",
        version = "0.1.0",
        description = r#"
# Shopfront Marketplace API

Buyers browse the catalog, fill a cart, and pay through a hosted checkout.
Buyers can upgrade to sellers and then manage categories, their own products
and the order lines they sold.

## Authentication

Signed-in endpoints expect a bearer token from `/users/register`,
`/users/login` or `/users/become-seller`:

```
Authorization: Bearer <jwt>
```

## Responses

Success bodies use the envelope `{"message": ..., "data": ...}`. Errors use
`{"error": ..., "message": ..., "request_id": ..., "timestamp": ...}`.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    tags(
        (name = "Users", description = "Accounts, verification, profile and seller upgrade"),
        (name = "Catalog", description = "Public product and category listing"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Orders", description = "Buyer orders"),
        (name = "Payments", description = "Hosted checkout"),
        (name = "Seller", description = "Seller catalog management and sales"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::health::health_check,

        crate::handlers::users::register,
        crate::handlers::users::login,
        crate::handlers::users::request_verification_code,
        crate::handlers::users::verify_code,
        crate::handlers::users::create_profile,
        crate::handlers::users::get_profile,
        crate::handlers::users::update_profile,
        crate::handlers::users::become_seller,

        crate::handlers::catalog::list_products,
        crate::handlers::catalog::get_product,
        crate::handlers::catalog::list_categories,
        crate::handlers::catalog::get_category,

        crate::handlers::cart::add_to_cart,
        crate::handlers::cart::get_cart,

        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,

        crate::handlers::payments::initiate_checkout,
        crate::handlers::payments::confirm_payment,

        crate::handlers::seller::create_category,
        crate::handlers::seller::update_category,
        crate::handlers::seller::delete_category,
        crate::handlers::seller::create_product,
        crate::handlers::seller::list_products,
        crate::handlers::seller::get_product,
        crate::handlers::seller::update_product,
        crate::handlers::seller::restock_product,
        crate::handlers::seller::delete_product,
        crate::handlers::seller::list_orders,
        crate::handlers::seller::get_order,
    ),
    components(
        schemas(
            crate::ResponseMeta,
            crate::errors::ErrorResponse,
            crate::entities::user::UserRole,
            crate::entities::order::OrderStatus,
            crate::entities::payment::PaymentStatus,
            crate::entities::address::Model,
            crate::entities::category::Model,
            crate::entities::product::Model,
            crate::entities::cart_item::Model,
            crate::entities::cart_item::LineSnapshot,
            crate::entities::order::Model,
            crate::entities::order_item::Model,
            crate::entities::payment::Model,
            crate::services::users::SignupInput,
            crate::services::users::LoginInput,
            crate::services::users::VerifyCodeInput,
            crate::services::users::AddressInput,
            crate::services::users::CreateProfileInput,
            crate::services::users::UpdateProfileInput,
            crate::services::users::BecomeSellerInput,
            crate::services::users::UserProfile,
            crate::services::users::AuthToken,
            crate::services::catalog::CreateCategoryInput,
            crate::services::catalog::UpdateCategoryInput,
            crate::services::catalog::CreateProductInput,
            crate::services::catalog::UpdateProductInput,
            crate::services::catalog::RestockInput,
            crate::services::cart::AddToCartInput,
            crate::services::cart::CartView,
            crate::services::checkout::CheckoutLink,
            crate::services::checkout::PaymentConfirmation,
            crate::services::orders::SellerOrderDetail,
            crate::repositories::OrderWithItems,
            crate::repositories::SellerOrderLine,
            crate::handlers::users::VerificationRequested,
            crate::handlers::common::Deleted,
            crate::handlers::health::HealthResponse,
            crate::handlers::health::ComponentStatus,
        )
    ),
    modifiers(&BearerSecurity)
)]
pub struct ApiDocV1;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_marketplace_paths() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Shopfront API"));
        assert!(json.contains("/users/register"));
        assert!(json.contains("/seller/products/{id}"));
        assert!(json.contains("/payment/verify"));
        assert!(json.contains("Bearer"));
    }
}
