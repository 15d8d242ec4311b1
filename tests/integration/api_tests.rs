//! API integration tests
//!
//! They need a running server with a fresh database and the bootstrap
//! administrator password set (`LIBRARY_AUTH__BOOTSTRAP_ADMIN_PASSWORD`).
//! Run with: cargo test -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn admin_password() -> String {
    std::env::var("LIBRARY_TEST_ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string())
}

fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}{}", prefix, nanos % 1_000_000_000)
}

/// Helper to get an administrator token
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": "admin",
            "password": admin_password()
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn post_json(client: &Client, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let response = client
        .post(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn get_json(client: &Client, token: &str, path: &str) -> (StatusCode, Value) {
    let response = client
        .get(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// Book with one lendable copy; returns (book id, copy id)
async fn lendable_book(client: &Client, token: &str) -> (i64, i64) {
    let (_, location) = post_json(
        client,
        token,
        "/locations",
        json!({ "name": unique("Shelf "), "is_borrow_location": true }),
    )
    .await;
    let (_, quant_type) = post_json(
        client,
        token,
        "/quant-types",
        json!({ "name": unique("Lending "), "code": unique("L"), "can_borrow": true }),
    )
    .await;
    let (status, book) = post_json(
        client,
        token,
        "/books",
        json!({ "title": "Rộng mở cửa trái tim", "language": "vi" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let book_id = book["id"].as_i64().unwrap();

    let (status, quant) = post_json(
        client,
        token,
        &format!("/books/{}/quants", book_id),
        json!({
            "registration_number": unique("REG"),
            "location_id": location["id"],
            "quant_type_id": quant_type["id"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (book_id, quant["id"].as_i64().unwrap())
}

async fn delete_json(client: &Client, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let response = client
        .delete(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// Borrower of a fresh type allowing one renewal; returns the borrower id
async fn new_borrower(client: &Client, token: &str, extra: Value) -> i64 {
    let (status, borrower_type) = post_json(
        client,
        token,
        "/borrower-types",
        json!({ "name": unique("Reader "), "code": unique("T"), "max_extensions": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let mut body = json!({ "name": unique("Borrower "), "borrower_type_id": borrower_type["id"] });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        body.extend(extra.clone());
    }
    let (status, borrower) = post_json(client, token, "/borrowers", body).await;
    assert_eq!(status, StatusCode::CREATED);
    borrower["id"].as_i64().unwrap()
}

/// Draft borrowing with one line per book, then confirm; returns (status, body)
async fn lend(client: &Client, token: &str, borrower_id: i64, book_ids: &[i64]) -> (StatusCode, Value) {
    let (status, borrowing) = post_json(
        client,
        token,
        "/borrowings",
        json!({ "borrower_id": borrower_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let borrowing_id = borrowing["id"].as_i64().unwrap();

    for book_id in book_ids {
        let (status, _) = post_json(
            client,
            token,
            &format!("/borrowings/{}/lines", borrowing_id),
            json!({ "book_id": book_id }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    post_json(
        client,
        token,
        &format!("/borrowings/{}/confirm", borrowing_id),
        json!({}),
    )
    .await
}

/// Confirmed reservation; returns its id
async fn reserve(client: &Client, token: &str, borrower_id: i64, book_id: i64, extra: Value) -> i64 {
    let mut body = json!({ "borrower_id": borrower_id, "book_id": book_id });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        body.extend(extra.clone());
    }
    let (status, reservation) = post_json(client, token, "/reservations", body).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = reservation["id"].as_i64().unwrap();

    let (status, confirmed) = post_json(
        client,
        token,
        &format!("/reservations/{}/confirm", id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["state"], "active");
    id
}

async fn reservation_state(client: &Client, token: &str, id: i64) -> Value {
    let (status, reservation) = get_json(client, token, &format!("/reservations/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    reservation
}

async fn copy_state(client: &Client, token: &str, quant_id: i64) -> String {
    let (status, quant) = get_json(client, token, &format!("/quants/{}", quant_id)).await;
    assert_eq!(status, StatusCode::OK);
    quant["state"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": "admin",
            "password": admin_password()
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], 2);
}

#[tokio::test]
#[ignore]
async fn test_staff_endpoints_require_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrowings", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_portal_rejects_staff_account() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let (status, _) = get_json(&client, &token, "/my/borrowings").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_cutter_preview() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let (status, body) = post_json(
        &client,
        &token,
        "/cutter/preview",
        json!({ "text": "The Great Gatsby", "scheme": "sanborn" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["code"].as_str().unwrap().starts_with('G'));
}

#[tokio::test]
#[ignore]
async fn test_duplicate_registration_number_rejected() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (_, book) = post_json(&client, &token, "/books", json!({ "title": "Duplicate test" })).await;
    let book_id = book["id"].as_i64().unwrap();
    let number = unique("DUP");

    let (status, _) = post_json(
        &client,
        &token,
        &format!("/books/{}/quants", book_id),
        json!({ "registration_number": number }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = post_json(
        &client,
        &token,
        &format!("/books/{}/quants", book_id),
        json!({ "registration_number": number }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_flow() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (book_id, _) = lendable_book(&client, &token).await;

    let (status, borrower) = post_json(
        &client,
        &token,
        "/borrowers",
        json!({ "name": "Nguyen Van An", "email": "an@example.org" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(borrower["borrower_code"].as_str().unwrap().starts_with("DG"));

    let (status, borrowing) = post_json(
        &client,
        &token,
        "/borrowings",
        json!({ "borrower_id": borrower["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(borrowing["state"], "draft");
    let borrowing_id = borrowing["id"].as_i64().unwrap();

    let (status, _) = post_json(
        &client,
        &token,
        &format!("/borrowings/{}/lines", borrowing_id),
        json!({ "book_id": book_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, confirmed) = post_json(
        &client,
        &token,
        &format!("/borrowings/{}/confirm", borrowing_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["state"], "borrowed");
    assert!(confirmed["name"].as_str().unwrap().starts_with("PM/"));
    assert_eq!(confirmed["book_count"], 1);

    let (status, outcome) = post_json(
        &client,
        &token,
        &format!("/borrowings/{}/return", borrowing_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["returned"], 1);
    assert_eq!(outcome["state"], "returned");

    // Returning twice is a business rule violation
    let (status, _) = post_json(
        &client,
        &token,
        &format!("/borrowings/{}/return", borrowing_id),
        json!({}),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
#[ignore]
async fn test_signup_is_public_and_listed_for_staff() {
    let client = Client::new();
    let email = format!("{}@example.org", unique("reader"));

    let response = client
        .post(format!("{}/signups", BASE_URL))
        .json(&json!({ "name": "Tran Thi Binh", "email": email }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let signup: Value = response.json().await.unwrap();
    assert_eq!(signup["state"], "pending");

    let token = get_auth_token(&client).await;
    let (status, approval) = post_json(
        &client,
        &token,
        &format!("/signups/{}/approve", signup["id"]),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approval["signup"]["state"], "approved");
    assert!(approval["login"].as_str().unwrap().starts_with("reader"));
}

#[tokio::test]
#[ignore]
async fn test_public_catalog() {
    let client = Client::new();

    let response = client
        .get(format!("{}/catalog/books?sort=name_asc&per_page=5", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    assert!(body["items"].is_array());
    assert_eq!(body["per_page"], 5);
}

#[tokio::test]
#[ignore]
async fn test_dashboard_rejects_inverted_period() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let (status, _) = get_json(
        &client,
        &token,
        "/stats/dashboard?from_date=2024-06-10&to_date=2024-06-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_settings_override_and_reset() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .put(format!("{}/settings/library.grace_period_days", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "value": "2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (_, settings) = get_json(&client, &token, "/settings").await;
    assert_eq!(settings["library.grace_period_days"]["value"], "2");
    assert_eq!(settings["library.grace_period_days"]["overridden"], true);

    let response = client
        .delete(format!("{}/settings/library.grace_period_days", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .put(format!("{}/settings/library.unknown", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "value": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_borrower_limit_checked_at_confirm() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (first, _) = lendable_book(&client, &token).await;
    let (second, _) = lendable_book(&client, &token).await;
    let borrower = new_borrower(&client, &token, json!({ "max_books_override": 1 })).await;

    let (status, body) = lend(&client, &token, borrower, &[first, second]).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("limit"));

    let (status, _) = lend(&client, &token, borrower, &[first]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_returned_copy_goes_to_reservation_queue_in_order() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (book_id, quant_id) = lendable_book(&client, &token).await;
    let holder = new_borrower(&client, &token, json!({})).await;

    let (status, loan) = lend(&client, &token, holder, &[book_id]).await;
    assert_eq!(status, StatusCode::OK);

    let late = new_borrower(&client, &token, json!({})).await;
    let early = new_borrower(&client, &token, json!({})).await;
    let urgent = new_borrower(&client, &token, json!({})).await;
    let late_id = reserve(&client, &token, late, book_id, json!({ "reservation_date": "2024-03-02" })).await;
    let early_id = reserve(&client, &token, early, book_id, json!({ "reservation_date": "2024-03-01" })).await;
    let urgent_id = reserve(
        &client,
        &token,
        urgent,
        book_id,
        json!({ "reservation_date": "2024-03-05", "priority": 1 }),
    )
    .await;

    let (status, _) = post_json(
        &client,
        &token,
        &format!("/borrowings/{}/return", loan["id"]),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Priority first
    let held = reservation_state(&client, &token, urgent_id).await;
    assert_eq!(held["state"], "available");
    assert_eq!(held["quant_id"].as_i64(), Some(quant_id));
    assert_eq!(copy_state(&client, &token, quant_id).await, "reserved");
    assert_eq!(reservation_state(&client, &token, early_id).await["state"], "active");

    // Then the oldest reservation date
    let (status, _) = post_json(
        &client,
        &token,
        &format!("/reservations/{}/cancel", urgent_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reservation_state(&client, &token, early_id).await["state"], "available");
    assert_eq!(reservation_state(&client, &token, late_id).await["state"], "active");
}

#[tokio::test]
#[ignore]
async fn test_borrower_takes_copy_held_for_them() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (book_id, quant_id) = lendable_book(&client, &token).await;
    let reader = new_borrower(&client, &token, json!({})).await;
    let other = new_borrower(&client, &token, json!({})).await;

    let reservation_id = reserve(&client, &token, reader, book_id, json!({})).await;
    let (status, held) = post_json(
        &client,
        &token,
        &format!("/reservations/{}/notify", reservation_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(held["state"], "available");
    assert_eq!(copy_state(&client, &token, quant_id).await, "reserved");

    // Nobody else gets the held copy
    let (status, _) = lend(&client, &token, other, &[book_id]).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, loan) = lend(&client, &token, reader, &[book_id]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loan["state"], "borrowed");
    assert_eq!(copy_state(&client, &token, quant_id).await, "borrowed");

    let fulfilled = reservation_state(&client, &token, reservation_id).await;
    assert_eq!(fulfilled["state"], "fulfilled");
    assert_eq!(fulfilled["borrowing_id"], loan["id"]);
}

#[tokio::test]
#[ignore]
async fn test_renewal_guards() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (book_id, _) = lendable_book(&client, &token).await;
    let (waited_book, _) = lendable_book(&client, &token).await;
    let reader = new_borrower(&client, &token, json!({})).await;
    let waiting = new_borrower(&client, &token, json!({})).await;

    let (status, loan) = lend(&client, &token, reader, &[book_id, waited_book]).await;
    assert_eq!(status, StatusCode::OK);
    let copies: Vec<(i64, i64)> = loan["lines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| {
            (
                line["book_id"].as_i64().unwrap(),
                line["quant_lines"][0]["id"].as_i64().unwrap(),
            )
        })
        .collect();
    let copy_of = |book: i64| copies.iter().find(|(b, _)| *b == book).unwrap().1;
    let renew_path = |copy: i64| format!("/borrowings/{}/copies/{}/renew", loan["id"], copy);

    // The borrower type allows a single extension
    let (status, renewed) = post_json(&client, &token, &renew_path(copy_of(book_id)), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renewed["extension_count"], 1);
    let (status, body) = post_json(&client, &token, &renew_path(copy_of(book_id)), json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("Maximum number of extensions"));

    reserve(&client, &token, waiting, waited_book, json!({})).await;
    let (status, body) = post_json(&client, &token, &renew_path(copy_of(waited_book)), json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("waiting"));
}

#[tokio::test]
#[ignore]
async fn test_cancel_releases_copies() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (book_id, quant_id) = lendable_book(&client, &token).await;
    let reader = new_borrower(&client, &token, json!({})).await;

    // A held copy goes back to the shelf when nobody else waits
    let reservation_id = reserve(&client, &token, reader, book_id, json!({})).await;
    let (status, _) = post_json(
        &client,
        &token,
        &format!("/reservations/{}/notify", reservation_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, cancelled) = post_json(
        &client,
        &token,
        &format!("/reservations/{}/cancel", reservation_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["state"], "cancelled");
    assert_eq!(copy_state(&client, &token, quant_id).await, "available");

    // So does a lent copy when its borrowing is cancelled
    let (status, loan) = lend(&client, &token, reader, &[book_id]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(copy_state(&client, &token, quant_id).await, "borrowed");
    let (status, cancelled) = post_json(
        &client,
        &token,
        &format!("/borrowings/{}/cancel", loan["id"]),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["state"], "cancelled");
    assert_eq!(copy_state(&client, &token, quant_id).await, "available");
}

#[tokio::test]
#[ignore]
async fn test_reserved_copy_cannot_be_archived() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (book_id, quant_id) = lendable_book(&client, &token).await;
    let reader = new_borrower(&client, &token, json!({})).await;

    let reservation_id = reserve(&client, &token, reader, book_id, json!({})).await;
    let (status, _) = post_json(
        &client,
        &token,
        &format!("/reservations/{}/notify", reservation_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = client
        .delete(format!("{}/quants/{}", BASE_URL, quant_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(copy_state(&client, &token, quant_id).await, "reserved");
}

#[tokio::test]
#[ignore]
async fn test_resource_limit_and_counts() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (first, _) = lendable_book(&client, &token).await;
    let (second, _) = lendable_book(&client, &token).await;
    let reader = new_borrower(&client, &token, json!({})).await;

    let code = unique("RB");
    let (status, resource) = post_json(
        &client,
        &token,
        "/resources",
        json!({ "name": "Rare books", "code": code, "max_books_per_borrower": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resource["book_count"], 0);
    let resource_id = resource["id"].as_i64().unwrap();

    let (status, _) = post_json(&client, &token, "/resources", json!({ "name": "Copy", "code": code })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let books_path = format!("/resources/{}/books", resource_id);
    let (status, resource) = post_json(&client, &token, &books_path, json!({ "book_ids": [first, second] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resource["book_count"], 2);
    assert_eq!(resource["available_copies"], 2);

    let (status, _) = lend(&client, &token, reader, &[first]).await;
    assert_eq!(status, StatusCode::OK);
    let (_, resource) = get_json(&client, &token, &format!("/resources/{}", resource_id)).await;
    assert_eq!(resource["borrowed_copies"], 1);

    let (status, stats) = get_json(
        &client,
        &token,
        &format!("/resources/{}/borrowers/{}", resource_id, reader),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["current_books"], 1);
    assert_eq!(stats["remaining_slots"], 0);
    assert_eq!(stats["can_borrow"], false);

    let (status, body) = lend(&client, &token, reader, &[second]).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("Rare books"));

    // Outside the resource the book follows the borrower limits only
    let (status, resource) = delete_json(&client, &token, &books_path, json!({ "book_ids": [second] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resource["book_count"], 1);
    let (status, _) = lend(&client, &token, reader, &[second]).await;
    assert_eq!(status, StatusCode::OK);

    let response = client
        .delete(format!("{}/resources/{}", BASE_URL, resource_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let (_, resource) = get_json(&client, &token, &format!("/resources/{}", resource_id)).await;
    assert_eq!(resource["active"], false);
}
