//! API integration tests, run in process against the memory store

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bookies_server::{api, config::AppConfig, repository::memory::MemoryStore, AppState};

struct TestApp {
    router: Router,
    _uploads: tempfile::TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let uploads = tempfile::tempdir().expect("Failed to create uploads dir");
        let mut config = AppConfig::default();
        config.storage.uploads_dir = uploads.path().to_path_buf();

        let state = AppState::build(config, Arc::new(MemoryStore::new()))
            .await
            .expect("Failed to build state");
        Self {
            router: api::create_router(state),
            _uploads: uploads,
        }
    }

    async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        (status, bytes.to_vec())
    }

    async fn upload(&self, token: &str, content_type: &str, data: &[u8]) -> (StatusCode, Value) {
        let mut body = Vec::new();
        body.extend_from_slice(b"--BOOKIESBOUNDARY\r\n");
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"file\"; filename=\"cover\"\r\n");
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n--BOOKIESBOUNDARY--\r\n");

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/upload/image")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=BOOKIESBOUNDARY")
            .body(Body::from(body))
            .expect("Failed to build request");

        let (status, bytes) = self.send_raw(request).await;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Failed to parse response")
        };
        (status, body)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().expect("No token in response").to_string()
    }

    async fn admin_token(&self) -> String {
        self.login("admin@bookies.com", "admin123").await
    }

    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": "Reader", "email": email, "password": "secret1" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["token"].as_str().expect("No token in response").to_string()
    }

    async fn add_book(&self, admin: &str, title: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/books",
                Some(admin),
                Some(json!({ "title": title, "author": "Frank Herbert", "category": "Fiction" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create book failed: {}", body);
        body["id"].as_str().expect("No id in response").to_string()
    }

    async fn file_request(&self, token: &str, book_id: &str, request_type: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/book-requests",
            Some(token),
            Some(json!({ "bookId": book_id, "requestType": request_type })),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/api/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "admin@bookies.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = TestApp::new().await;

    let (status, _) = app.send(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.admin_token().await;
    let (status, body) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "admin@bookies.com");
    assert_eq!(body["role"], "ADMIN");
}

#[tokio::test]
async fn test_register_duplicate_and_invalid() {
    let app = TestApp::new().await;
    app.register("a@x.com").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Again", "email": "a@x.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Short", "email": "b@x.com", "password": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new().await;
    let token = app.register("a@x.com").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/change-password",
            Some(&token),
            Some(json!({ "currentPassword": "secret1", "newPassword": "secret2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.login("a@x.com", "secret2").await;
}

#[tokio::test]
async fn test_only_admin_manages_books() {
    let app = TestApp::new().await;
    let reader = app.register("a@x.com").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/books",
            Some(&reader),
            Some(json!({ "title": "Dune", "author": "Frank Herbert", "category": "Fiction" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 3);

    let admin = app.admin_token().await;
    let (status, _) = app
        .send(
            Method::POST,
            "/api/books",
            Some(&admin),
            Some(json!({ "title": "", "author": "Frank Herbert", "category": "Fiction" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_book_listing_and_filters() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let dune = app.add_book(&admin, "Dune").await;
    app.add_book(&admin, "Children of Dune").await;
    app.add_book(&admin, "Neuromancer").await;

    let (status, body) = app.send(Method::GET, "/api/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert_eq!(body[0]["id"], dune.as_str());
    assert_eq!(body[0]["status"], "available");
    assert!(body[0].get("borrowedBy").is_none());

    let (_, body) = app.send(Method::GET, "/api/books?search=dune", None, None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = app
        .send(Method::GET, "/api/books?category=Fict", None, None)
        .await;
    assert!(body.as_array().unwrap().is_empty());

    let (_, body) = app.send(Method::GET, "/api/books/categories", None, None).await;
    assert_eq!(body, json!(["Fiction"]));

    let (status, body) = app
        .send(Method::GET, &format!("/api/books/{}", uuid::Uuid::new_v4()), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 5);
}

#[tokio::test]
async fn test_borrow_approve_scenario() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let reader = app.register("a@x.com").await;
    let book_id = app.add_book(&admin, "Dune").await;

    let (status, body) = app.file_request(&reader, &book_id, "BORROW").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["book"]["status"], "pending_request");
    assert_eq!(body["book"]["requestedBy"], "a@x.com");
    let request_id = body["request"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(Method::GET, "/api/book-requests/pending", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], request_id.as_str());
    assert_eq!(body[0]["bookTitle"], "Dune");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/book-requests/{}/approve", request_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["status"], "APPROVED");
    assert_eq!(body["request"]["processedBy"], "admin@bookies.com");
    assert_eq!(body["book"]["status"], "borrowed");
    assert_eq!(body["book"]["borrowedBy"], "a@x.com");
    assert!(body["book"]["borrowedDate"].is_string());
    assert!(body["book"].get("requestedBy").is_none());
    assert!(body["message"].is_string());

    let (_, body) = app.send(Method::GET, "/api/books/mine", Some(&reader), None).await;
    assert_eq!(body[0]["id"], book_id.as_str());

    // approving twice
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/book-requests/{}/approve", request_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 7);

    // another user cannot return it
    let stranger = app.register("b@x.com").await;
    let (status, _) = app.file_request(&stranger, &book_id, "RETURN").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // nor borrow it
    let (status, body) = app.file_request(&stranger, &book_id, "BORROW").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 8);
}

#[tokio::test]
async fn test_return_round_trip() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let reader = app.register("a@x.com").await;
    let book_id = app.add_book(&admin, "Dune").await;

    let (_, before) = app
        .send(Method::GET, &format!("/api/books/{}", book_id), None, None)
        .await;

    let (_, body) = app.file_request(&reader, &book_id, "BORROW").await;
    let borrow_id = body["request"]["id"].as_str().unwrap().to_string();
    app.send(
        Method::POST,
        &format!("/api/book-requests/{}/approve", borrow_id),
        Some(&admin),
        None,
    )
    .await;

    let (status, body) = app.file_request(&reader, &book_id, "RETURN").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["book"]["status"], "pending_return");
    assert!(body["book"]["returnRequestDate"].is_string());
    let return_id = body["request"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/book-requests/{}/approve", return_id),
            Some(&admin),
            Some(json!({ "notes": "good condition" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["notes"], "good condition");
    assert_eq!(body["book"], before);

    let (_, history) = app
        .send(Method::GET, "/api/book-requests/mine", Some(&reader), None)
        .await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r["status"] == "APPROVED"));
}

#[tokio::test]
async fn test_reject_and_duplicate_requests() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let first = app.register("a@x.com").await;
    let second = app.register("b@x.com").await;
    let book_id = app.add_book(&admin, "Dune").await;

    let (_, body) = app.file_request(&first, &book_id, "BORROW").await;
    let request_id = body["request"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.file_request(&second, &book_id, "BORROW").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 6);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/book-requests/{}/reject", request_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["status"], "REJECTED");
    assert_eq!(body["book"]["status"], "available");
    assert!(body["book"].get("requestedBy").is_none());

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/book-requests/{}/approve", request_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // the second reader can now borrow it
    let (status, _) = app.file_request(&second, &book_id, "BORROW").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_request_access_control() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let reader = app.register("a@x.com").await;
    let stranger = app.register("b@x.com").await;
    let book_id = app.add_book(&admin, "Dune").await;

    let (_, body) = app.file_request(&reader, &book_id, "BORROW").await;
    let request_id = body["request"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::GET, "/api/book-requests/pending", Some(&reader), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/book-requests/{}/approve", request_id),
            Some(&reader),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/book-requests/{}", request_id);
    let (status, _) = app.send(Method::GET, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.send(Method::GET, &uri, Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requestType"], "BORROW");

    let (status, _) = app
        .send(Method::GET, "/api/book-requests/user/a@x.com", Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .send(Method::GET, "/api/book-requests/user/a@x.com", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/book-requests/{}/approve", uuid::Uuid::new_v4()),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_edit_cannot_change_status_and_delete_closes_request() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let reader = app.register("a@x.com").await;
    let book_id = app.add_book(&admin, "Dune").await;

    let (_, body) = app.file_request(&reader, &book_id, "BORROW").await;
    let request_id = body["request"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/books/{}", book_id),
            Some(&admin),
            Some(json!({ "title": "Dune (2nd ed.)", "status": "available" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Dune (2nd ed.)");
    assert_eq!(body["status"], "pending_request");

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/books/{}", book_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/book-requests/{}", request_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "REJECTED");
    assert_eq!(body["notes"], "book deleted");

    let (_, pending) = app
        .send(Method::GET, "/api/book-requests/pending", Some(&admin), None)
        .await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_text_fields_are_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/books",
            Some(&admin),
            Some(json!({ "title": "   ", "author": "Frank Herbert", "category": "Fiction" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Title is required");

    let book_id = app.add_book(&admin, "Dune").await;
    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/books/{}", book_id),
            Some(&admin),
            Some(json!({ "author": " \t " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, book) = app
        .send(Method::GET, &format!("/api/books/{}", book_id), None, None)
        .await;
    assert_eq!(book["author"], "Frank Herbert");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "  ", "email": "a@x.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_edit_can_clear_optional_metadata() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (_, created) = app
        .send(
            Method::POST,
            "/api/books",
            Some(&admin),
            Some(json!({
                "title": "Dune",
                "author": "Frank Herbert",
                "category": "Fiction",
                "isbn": "9780441013593",
                "publisher": "Chilton Books"
            })),
        )
        .await;
    let book_id = created["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/books/{}", book_id),
            Some(&admin),
            Some(json!({ "isbn": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("isbn").is_none());
    assert_eq!(body["publisher"], "Chilton Books");
}

#[tokio::test]
async fn test_cover_image_upload() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let reader = app.register("a@x.com").await;
    let image = b"\x89PNG\r\n\x1a\nfake-cover";

    let (status, _) = app.upload(&reader, "image/png", image).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.upload(&admin, "text/plain", b"not an image").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.upload(&admin, "image/png", image).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {}", body);
    let url = body["url"].as_str().expect("No url in response").to_string();
    let path = url
        .strip_prefix("http://localhost:8090")
        .expect("URL is not under the public base URL");
    assert!(path.starts_with("/uploads/"));

    let request = Request::builder()
        .uri(path)
        .body(Body::empty())
        .expect("Failed to build request");
    let (status, served) = app.send_raw(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, image.to_vec());

    let (status, book) = app
        .send(
            Method::POST,
            "/api/books",
            Some(&admin),
            Some(json!({
                "title": "Dune",
                "author": "Frank Herbert",
                "category": "Fiction",
                "coverImage": url
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book["coverImage"], url.as_str());
}
