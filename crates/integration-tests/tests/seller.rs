//! Seller upgrade and catalog ownership over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use bazaar_core::Role;
use bazaar_integration_tests::{TestApp, seller_application};
use bazaar_server::db::UserStore;

// =============================================================================
// Become seller
// =============================================================================

#[tokio::test]
async fn test_become_seller_returns_seller_token() {
    let app = TestApp::new();
    let buyer = app.verified_buyer("ada@example.com").await;

    let response = app
        .post(
            "/users/become-seller",
            Some(&buyer),
            seller_application("GB29 NWBK 6016 1331 9268 19"),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    let token = response.body["data"]["token"].as_str().unwrap();
    let claims = app.credentials.decode_token(token).unwrap();
    assert_eq!(claims.role, Role::Seller);
    assert_eq!(claims.sub, app.user_id(&buyer));

    let profile = app.get("/users/profile", Some(token)).await;
    assert_eq!(profile.body["data"]["role"], "seller");
    assert_eq!(profile.body["data"]["firstName"], "Ada");
}

#[tokio::test]
async fn test_second_upgrade_is_rejected_without_new_bank_account() {
    let app = TestApp::new();
    let seller = app.seller("ada@example.com", "12345678").await;

    let response = app
        .post(
            "/users/become-seller",
            Some(&seller),
            seller_application("87654321"),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "user is already a seller");
    let account = app
        .store
        .find_bank_account(app.user_id(&seller))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.account_number, "12345678");
}

#[tokio::test]
async fn test_unverified_buyer_cannot_become_seller() {
    let app = TestApp::new();
    let buyer = app.sign_up("ada@example.com").await;

    let response = app
        .post(
            "/users/become-seller",
            Some(&buyer),
            seller_application("12345678"),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"], "forbidden");
    let user = app
        .store
        .find_user_by_id(app.user_id(&buyer))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role, Role::Buyer);
}

#[tokio::test]
async fn test_bank_account_number_is_unique() {
    let app = TestApp::new();
    app.seller("first@example.com", "12345678").await;
    let second = app.verified_buyer("second@example.com").await;

    let response = app
        .post(
            "/users/become-seller",
            Some(&second),
            seller_application("1234 5678"),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "bank account is already registered");
}

// =============================================================================
// Seller routes
// =============================================================================

#[tokio::test]
async fn test_buyers_cannot_use_seller_routes() {
    let app = TestApp::new();
    let buyer = app.verified_buyer("buyer@example.com").await;

    let response = app
        .post("/seller/categories", Some(&buyer), json!({ "name": "Lamps" }))
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/categories", None).await.body["data"], json!([]));
}

#[tokio::test]
async fn test_stock_update_by_non_owner_is_forbidden() {
    let app = TestApp::new();
    let owner = app.seller("owner@example.com", "12345678").await;
    let rival = app.seller("rival@example.com", "87654321").await;
    let lamp = app.product(&owner, "Lamp", "10.00", 5).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/seller/products/{lamp}"),
            Some(&rival),
            Some(json!({ "stock": 50 })),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["message"], "product belongs to another seller");
    let product = app.get(&format!("/products/{lamp}"), None).await;
    assert_eq!(product.body["data"]["stock"], 5);
}

#[tokio::test]
async fn test_stock_update_to_same_value_is_a_conflict() {
    let app = TestApp::new();
    let owner = app.seller("owner@example.com", "12345678").await;
    let lamp = app.product(&owner, "Lamp", "10.00", 5).await;
    let uri = format!("/seller/products/{lamp}");

    let unchanged = app
        .request(Method::PUT, &uri, Some(&owner), Some(json!({ "stock": 5 })))
        .await;
    assert_eq!(unchanged.status, StatusCode::CONFLICT);
    assert_eq!(unchanged.body["message"], "stock is already at that level");

    let changed = app
        .request(Method::PUT, &uri, Some(&owner), Some(json!({ "stock": 8 })))
        .await;
    assert_eq!(changed.status, StatusCode::OK);
    assert_eq!(changed.body["data"]["stock"], 8);
}

#[tokio::test]
async fn test_product_edit_and_delete_are_owner_only() {
    let app = TestApp::new();
    let owner = app.seller("owner@example.com", "12345678").await;
    let rival = app.seller("rival@example.com", "87654321").await;
    let lamp = app.product(&owner, "Lamp", "10.00", 5).await;
    let uri = format!("/seller/products/{lamp}");

    let edit = app
        .request(Method::PATCH, &uri, Some(&rival), Some(json!({ "name": "Mine" })))
        .await;
    assert_eq!(edit.status, StatusCode::FORBIDDEN);
    let delete = app.request(Method::DELETE, &uri, Some(&rival), None).await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);

    let edit = app
        .request(
            Method::PATCH,
            &uri,
            Some(&owner),
            Some(json!({ "name": "Desk lamp", "price": "12.50" })),
        )
        .await;
    assert_eq!(edit.status, StatusCode::OK, "{}", edit.body);
    assert_eq!(edit.body["data"]["name"], "Desk lamp");

    let delete = app.request(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(delete.status, StatusCode::OK);
    assert_eq!(
        app.get(&uri.replace("/seller", ""), None).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_seller_lists_only_own_products() {
    let app = TestApp::new();
    let owner = app.seller("owner@example.com", "12345678").await;
    let rival = app.seller("rival@example.com", "87654321").await;
    let lamp = app.product(&owner, "Lamp", "10.00", 5).await;
    app.product(&rival, "Rug", "5.00", 5).await;

    let own = app.get("/seller/products", Some(&owner)).await;
    let products = own.body["data"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["id"], lamp);

    let public = app.get("/products", None).await;
    assert_eq!(public.body["data"].as_array().unwrap().len(), 2);

    let foreign = app
        .get(&format!("/seller/products/{lamp}"), Some(&rival))
        .await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_product_requires_positive_price_and_known_category() {
    let app = TestApp::new();
    let owner = app.seller("owner@example.com", "12345678").await;

    let unknown_category = app
        .post(
            "/seller/products",
            Some(&owner),
            json!({ "name": "Lamp", "categoryId": 404, "price": "10.00", "stock": 1 }),
        )
        .await;
    assert_eq!(unknown_category.status, StatusCode::NOT_FOUND);

    let category = app
        .post("/seller/categories", Some(&owner), json!({ "name": "Lighting" }))
        .await;
    let free = app
        .post(
            "/seller/products",
            Some(&owner),
            json!({
                "name": "Lamp",
                "categoryId": category.body["data"]["id"],
                "price": "0",
                "stock": 1,
            }),
        )
        .await;
    assert_eq!(free.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Categories
// =============================================================================

#[tokio::test]
async fn test_category_tree_management() {
    let app = TestApp::new();
    let seller = app.seller("owner@example.com", "12345678").await;

    let root = app
        .post(
            "/seller/categories",
            Some(&seller),
            json!({ "name": "Home", "displayOrder": 1 }),
        )
        .await;
    let root_id = root.body["data"]["id"].as_i64().unwrap();
    let child = app
        .post(
            "/seller/categories",
            Some(&seller),
            json!({ "name": "Lighting", "parentId": root_id }),
        )
        .await;
    assert_eq!(child.status, StatusCode::OK);
    let child_id = child.body["data"]["id"].as_i64().unwrap();
    assert_eq!(child.body["data"]["parentId"], root_id);

    let renamed = app
        .request(
            Method::PATCH,
            &format!("/seller/categories/{child_id}"),
            Some(&seller),
            Some(json!({ "name": "Lamps", "imageUrl": " " })),
        )
        .await;
    assert_eq!(renamed.body["data"]["name"], "Lamps");
    assert_eq!(renamed.body["data"]["imageUrl"], serde_json::Value::Null);

    let in_use = app
        .request(
            Method::DELETE,
            &format!("/seller/categories/{root_id}"),
            Some(&seller),
            None,
        )
        .await;
    assert_eq!(in_use.status, StatusCode::CONFLICT);

    let leaf = app
        .request(
            Method::DELETE,
            &format!("/seller/categories/{child_id}"),
            Some(&seller),
            None,
        )
        .await;
    assert_eq!(leaf.status, StatusCode::OK);

    let public = app.get(&format!("/categories/{root_id}"), None).await;
    assert_eq!(public.body["data"]["name"], "Home");
    assert_eq!(
        app.get(&format!("/categories/{child_id}"), None).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_unknown_parent_category() {
    let app = TestApp::new();
    let seller = app.seller("owner@example.com", "12345678").await;

    let response = app
        .post(
            "/seller/categories",
            Some(&seller),
            json!({ "name": "Orphan", "parentId": 77 }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "category not found");
}
