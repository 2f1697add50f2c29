//! Sign-up, login, phone verification and profile flows over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use bazaar_core::Email;
use bazaar_integration_tests::TestApp;
use bazaar_server::db::UserStore;

// =============================================================================
// Sign-up and login
// =============================================================================

#[tokio::test]
async fn test_sign_up_then_login_yields_same_user() {
    let app = TestApp::new();
    let signup_token = app.sign_up("ada@example.com").await;

    let response = app
        .post(
            "/users/login",
            None,
            json!({ "email": "Ada@Example.com", "password": "correct horse" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "login successful");
    let login_token = response.body["data"]["token"].as_str().unwrap();
    assert_eq!(app.user_id(login_token), app.user_id(&signup_token));
}

#[tokio::test]
async fn test_duplicate_email_is_a_conflict() {
    let app = TestApp::new();
    let token = app.sign_up("ada@example.com").await;

    let response = app
        .post(
            "/users/register",
            None,
            json!({ "email": "ada@example.com", "password": "another password", "phone": "+15550199" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "conflict");
    assert_eq!(response.body["message"], "email is already registered");

    // The original account is untouched.
    let email = Email::parse("ada@example.com").unwrap();
    let (user, _) = app.store.find_user_by_email(&email).await.unwrap().unwrap();
    assert_eq!(user.id, app.user_id(&token));
    let login = app
        .post(
            "/users/login",
            None,
            json!({ "email": "ada@example.com", "password": "correct horse" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_sign_up_validation() {
    let app = TestApp::new();

    let cases = [
        json!({ "email": "not-an-email", "password": "correct horse", "phone": "+15550100" }),
        json!({ "email": "ada@example.com", "password": "short", "phone": "+15550100" }),
        json!({ "email": "ada@example.com", "password": "correct horse", "phone": "12" }),
    ];
    for body in cases {
        let response = app.post("/users/register", None, body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);
        assert_eq!(response.body["error"], "validation");
    }
}

#[tokio::test]
async fn test_malformed_json_is_rejected_with_envelope() {
    let app = TestApp::new();

    let response = app
        .post("/users/register", None, json!({ "email": "ada@example.com" }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation");
    assert!(response.body["message"].is_string());
}

#[tokio::test]
async fn test_login_failures() {
    let app = TestApp::new();
    app.sign_up("ada@example.com").await;

    let wrong_password = app
        .post(
            "/users/login",
            None,
            json!({ "email": "ada@example.com", "password": "wrong password" }),
        )
        .await;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body["error"], "unauthorized");

    let unknown = app
        .post(
            "/users/login",
            None,
            json!({ "email": "nobody@example.com", "password": "correct horse" }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_private_routes_require_a_valid_token() {
    let app = TestApp::new();

    let missing = app.get("/users/profile", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["error"], "unauthorized");

    let forged = app.get("/users/profile", Some("not.a.token")).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Phone verification
// =============================================================================

#[tokio::test]
async fn test_verification_with_exact_code() {
    let app = TestApp::new();
    let token = app.sign_up("ada@example.com").await;

    let response = app.get("/users/verifycode", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    let code = response.body["data"]["code"].as_u64().unwrap();

    let sent = app.notifier.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(u64::from(sent[0].1.get()), code);

    let response = app
        .post("/users/verify", Some(&token), json!({ "code": code }))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let profile = app.get("/users/profile", Some(&token)).await;
    assert_eq!(profile.body["data"]["verified"], true);
}

#[tokio::test]
async fn test_wrong_code_leaves_user_unverified() {
    let app = TestApp::new();
    let token = app.sign_up("ada@example.com").await;
    let code = app.get("/users/verifycode", Some(&token)).await.body["data"]["code"]
        .as_u64()
        .unwrap();
    let wrong = if code == 999_999 { 100_000 } else { code + 1 };

    let response = app
        .post("/users/verify", Some(&token), json!({ "code": wrong }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "verification code does not match");
    let profile = app.get("/users/profile", Some(&token)).await;
    assert_eq!(profile.body["data"]["verified"], false);
}

#[tokio::test]
async fn test_verify_without_requesting_a_code() {
    let app = TestApp::new();
    let token = app.sign_up("ada@example.com").await;

    let response = app
        .post("/users/verify", Some(&token), json!({ "code": 123_456 }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["message"],
        "no verification code has been requested"
    );
}

#[tokio::test]
async fn test_verified_user_cannot_request_another_code() {
    let app = TestApp::new();
    let token = app.verified_buyer("ada@example.com").await;
    let user_id = app.user_id(&token);
    let before = app.store.find_user_by_id(user_id).await.unwrap().unwrap();

    let response = app.get("/users/verifycode", Some(&token)).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "phone number is already verified");
    let after = app.store.find_user_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(before.pending_code, after.pending_code);
    assert_eq!(app.notifier.sent.lock().len(), 1);
}

#[tokio::test]
async fn test_code_is_hidden_unless_exposed() {
    let mut config = bazaar_integration_tests::test_config();
    config.expose_verification_code = false;
    let app = TestApp::with_config(config);
    let token = app.sign_up("ada@example.com").await;

    let response = app.get("/users/verifycode", Some(&token)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["data"].get("code").is_none());
    assert_eq!(app.notifier.sent.lock().len(), 1);
}

// =============================================================================
// Profile
// =============================================================================

fn profile_body() -> serde_json::Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "address": {
            "line1": "12 St James's Square",
            "city": "London",
            "postCode": "SW1Y 4JH",
            "country": "GB",
        },
    })
}

#[tokio::test]
async fn test_create_and_get_profile() {
    let app = TestApp::new();
    let token = app.sign_up("ada@example.com").await;

    let created = app.post("/users/profile", Some(&token), profile_body()).await;
    assert_eq!(created.status, StatusCode::OK, "{}", created.body);

    let profile = app.get("/users/profile", Some(&token)).await;
    let data = &profile.body["data"];
    assert_eq!(data["firstName"], "Ada");
    assert_eq!(data["email"], "ada@example.com");
    assert_eq!(data["role"], "buyer");
    assert_eq!(data["address"]["city"], "London");
    assert_eq!(data["address"]["line2"], serde_json::Value::Null);
    assert_eq!(data["cart"], json!([]));
    assert_eq!(data["orders"], json!([]));
}

#[tokio::test]
async fn test_second_profile_is_a_conflict() {
    let app = TestApp::new();
    let token = app.sign_up("ada@example.com").await;
    app.post("/users/profile", Some(&token), profile_body()).await;

    let response = app.post("/users/profile", Some(&token), profile_body()).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "profile already exists");
}

#[tokio::test]
async fn test_profile_requires_address_fields() {
    let app = TestApp::new();
    let token = app.sign_up("ada@example.com").await;
    let mut body = profile_body();
    body["address"]["city"] = json!("   ");

    let response = app.post("/users/profile", Some(&token), body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let profile = app.get("/users/profile", Some(&token)).await;
    assert_eq!(profile.body["data"]["address"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_patch_overwrites_only_non_blank_fields() {
    let app = TestApp::new();
    let token = app.sign_up("ada@example.com").await;
    app.post("/users/profile", Some(&token), profile_body()).await;

    let response = app
        .request(
            Method::PATCH,
            "/users/profile",
            Some(&token),
            Some(json!({
                "firstName": "Augusta",
                "lastName": "  ",
                "address": { "city": "Paris", "country": "" },
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    let data = &response.body["data"];
    assert_eq!(data["firstName"], "Augusta");
    assert_eq!(data["lastName"], "Lovelace");
    assert_eq!(data["address"]["city"], "Paris");
    assert_eq!(data["address"]["country"], "GB");
    assert_eq!(data["address"]["line1"], "12 St James's Square");
}

#[tokio::test]
async fn test_patch_address_before_profile_exists() {
    let app = TestApp::new();
    let token = app.sign_up("ada@example.com").await;

    let response = app
        .request(
            Method::PATCH,
            "/users/profile",
            Some(&token),
            Some(json!({ "address": { "city": "Paris" } })),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "profile has not been created yet");
}
