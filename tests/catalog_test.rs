mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use shopfront_api::{
    errors::ServiceError,
    services::catalog::{CreateCategoryInput, RestockInput, UpdateCategoryInput, UpdateProductInput},
};
use uuid::Uuid;

#[tokio::test]
async fn seller_creates_and_lists_products_over_http() {
    let app = TestApp::new().await;
    let (_, token) = app.seller("shop@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/seller/categories",
            Some(json!({ "name": "Lighting" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/seller/products",
            Some(json!({
                "name": "Desk lamp",
                "description": "Warm light",
                "category_id": category_id,
                "price": "12.50",
                "stock": 4
            })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(decimal(&body["data"]["price"]), dec!(12.50));
    let product_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.call(Method::GET, "/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/products?category_id={}", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = app
        .call(Method::GET, &format!("/products/{}", product_id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Desk lamp");
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let (status, _) = app
        .call(
            Method::GET,
            &format!("/products/{}", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn negative_price_is_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.seller("neg@example.com").await;
    let category = app.category("Misc").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/seller/products",
            Some(json!({
                "name": "Broken",
                "category_id": category.id,
                "price": "-1.00",
                "stock": 1
            })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn product_in_missing_category_is_rejected() {
    let app = TestApp::new().await;
    let (seller_id, _) = app.seller("nocat@example.com").await;

    let result = app
        .state
        .services
        .catalog
        .create_product(
            seller_id,
            shopfront_api::services::catalog::CreateProductInput {
                name: "Orphan".into(),
                description: String::new(),
                category_id: Uuid::new_v4(),
                image_url: None,
                price: dec!(1.00),
                stock: 1,
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn sellers_cannot_touch_each_others_products() {
    let app = TestApp::new().await;
    let (owner_id, _) = app.seller("owner@example.com").await;
    let (rival_id, rival_token) = app.seller("rival@example.com").await;
    let category = app.category("Tools").await;
    let product = app.product(owner_id, category.id, "Hammer", dec!(10.00)).await;

    let catalog = &app.state.services.catalog;
    assert_matches!(
        catalog
            .update_product(
                rival_id,
                product.id,
                UpdateProductInput {
                    price: Some(dec!(1.00)),
                    ..Default::default()
                },
            )
            .await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        catalog.delete_product(rival_id, product.id).await,
        Err(ServiceError::Forbidden(_))
    );

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/seller/products/{}", product.id),
            None,
            Some(&rival_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::GET, "/seller/products", None, Some(&rival_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    assert_eq!(catalog.get_product(product.id).await.unwrap().price, dec!(10.00));
}

#[tokio::test]
async fn partial_update_only_changes_supplied_fields() {
    let app = TestApp::new().await;
    let (seller_id, _) = app.seller("edit@example.com").await;
    let category = app.category("Garden").await;
    let product = app.product(seller_id, category.id, "Spade", dec!(12.50)).await;
    let catalog = &app.state.services.catalog;

    let updated = catalog
        .update_product(
            seller_id,
            product.id,
            UpdateProductInput {
                stock: Some(0),
                description: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.stock, 0);
    assert_eq!(updated.description, "");
    assert_eq!(updated.name, "Spade");
    assert_eq!(updated.price, dec!(12.50));
    assert_eq!(updated.image_url, product.image_url);

    let restocked = catalog
        .restock_product(seller_id, product.id, RestockInput { stock: 7 })
        .await
        .unwrap();
    assert_eq!(restocked.stock, 7);
}

#[tokio::test]
async fn category_rules() {
    let app = TestApp::new().await;
    let (seller_id, _) = app.seller("cats@example.com").await;
    let catalog = &app.state.services.catalog;

    assert_matches!(
        catalog
            .create_category(CreateCategoryInput {
                name: "Dangling".into(),
                parent_id: Some(Uuid::new_v4()),
                image_url: None,
                display_order: None,
            })
            .await,
        Err(ServiceError::ValidationError(_))
    );

    let parent = app.category("Home").await;
    let child = catalog
        .create_category(CreateCategoryInput {
            name: "Kitchen".into(),
            parent_id: Some(parent.id),
            image_url: None,
            display_order: Some(1),
        })
        .await
        .unwrap();
    assert_eq!(child.parent_id, Some(parent.id));

    assert_matches!(
        catalog
            .update_category(
                child.id,
                UpdateCategoryInput {
                    parent_id: Some(child.id),
                    ..Default::default()
                },
            )
            .await,
        Err(ServiceError::ValidationError(_))
    );

    assert_matches!(
        catalog.delete_category(parent.id).await,
        Err(ServiceError::Conflict(msg)) if msg == "category still has subcategories"
    );

    let product = app.product(seller_id, child.id, "Whisk", dec!(2.50)).await;
    assert_matches!(
        catalog.delete_category(child.id).await,
        Err(ServiceError::Conflict(msg)) if msg == "category still has products"
    );

    catalog.delete_product(seller_id, product.id).await.unwrap();
    catalog.delete_category(child.id).await.unwrap();
    catalog.delete_category(parent.id).await.unwrap();
    assert_matches!(
        catalog.get_category(parent.id).await,
        Err(ServiceError::NotFound(_))
    );
    assert!(catalog.list_categories().await.unwrap().is_empty());
}

#[tokio::test]
async fn category_cannot_move_under_its_own_descendant() {
    let app = TestApp::new().await;
    let catalog = &app.state.services.catalog;

    let subcategory = |name: &str, parent_id: Uuid| CreateCategoryInput {
        name: name.into(),
        parent_id: Some(parent_id),
        image_url: None,
        display_order: None,
    };
    let root = app.category("Garden").await;
    let tools = catalog
        .create_category(subcategory("Tools", root.id))
        .await
        .unwrap();
    let shears = catalog
        .create_category(subcategory("Shears", tools.id))
        .await
        .unwrap();

    assert_matches!(
        catalog
            .update_category(
                root.id,
                UpdateCategoryInput {
                    parent_id: Some(shears.id),
                    ..Default::default()
                },
            )
            .await,
        Err(ServiceError::ValidationError(msg))
            if msg == "a category cannot be moved under its own subcategory"
    );
    assert_eq!(catalog.get_category(root.id).await.unwrap().parent_id, None);

    // Moving a leaf under a sibling branch is still fine.
    let pots = catalog
        .create_category(subcategory("Pots", root.id))
        .await
        .unwrap();
    let moved = catalog
        .update_category(
            shears.id,
            UpdateCategoryInput {
                parent_id: Some(pots.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.parent_id, Some(pots.id));
}
