//! Integration tests for the club backend.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use image::{DynamicImage, ImageFormat, RgbImage};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::client::{ApiClient, AuthContext, ClientError, FileUpload};
use crate::config::{Config, LogFormat, MediaConfig};
use crate::crop::{CropRect, CropSpec};
use crate::db::{init_database, Repository};
use crate::mailer::LogMailer;
use crate::media::HostedMediaStore;
use crate::models::{CreateMemberRequest, SystemRole};
use crate::team::{OrderBoard, TeamYearsEditor};
use crate::{create_router, AppState};

const SERVICE_TOKEN: &str = "test-service-token";
const MEDIA_SECRET: &str = "test-media-secret";
const MAX_UPLOAD_BYTES: usize = 512 * 1024;

/// An upload as seen by the mock media host.
#[derive(Debug, Default, Clone)]
struct ReceivedUpload {
    folder: String,
    public_id: String,
    timestamp: String,
    signature: String,
    bytes: Vec<u8>,
}

#[derive(Clone, Default)]
struct MockMediaHost {
    received: Arc<Mutex<Vec<ReceivedUpload>>>,
}

async fn mock_upload(State(host): State<MockMediaHost>, mut multipart: Multipart) -> Json<Value> {
    let mut upload = ReceivedUpload::default();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => upload.bytes = field.bytes().await.unwrap().to_vec(),
            "folder" => upload.folder = field.text().await.unwrap(),
            "public_id" => upload.public_id = field.text().await.unwrap(),
            "timestamp" => upload.timestamp = field.text().await.unwrap(),
            "signature" => upload.signature = field.text().await.unwrap(),
            _ => {}
        }
    }

    let response = json!({
        "secure_url": format!("https://media.test/{}/{}.jpg", upload.folder, upload.public_id),
        "public_id": format!("{}/{}", upload.folder, upload.public_id),
        "format": "jpg",
        "bytes": upload.bytes.len(),
    });
    host.received.lock().unwrap().push(upload);
    Json(response)
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    media: MockMediaHost,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Mock media host
        let media = MockMediaHost::default();
        let media_app = Router::new()
            .route("/test-cloud/image/upload", post(mock_upload))
            .with_state(media.clone());
        let media_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let media_addr = media_listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(media_listener, media_app).await.unwrap();
        });

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let media_config = MediaConfig {
            base_url: format!("http://{}", media_addr),
            cloud_name: "test-cloud".to_string(),
            api_key: "test-key".to_string(),
            api_secret: MEDIA_SECRET.to_string(),
            folder: "club".to_string(),
            timeout_secs: 5,
        };

        let config = Config {
            service_token: Some(SERVICE_TOKEN.to_string()),
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_format: LogFormat::Pretty,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            media: Some(media_config.clone()),
            bootstrap_admin: None,
        };

        let state = AppState {
            repo,
            media: Arc::new(HostedMediaStore::new(media_config).unwrap()),
            mailer: Arc::new(LogMailer),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            media,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn api_client(&self) -> ApiClient {
        ApiClient::new(self.base_url.clone())
    }

    /// Request authenticated with the service token.
    fn admin(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(SERVICE_TOKEN)
    }

    /// Invite a member without email and return the response data
    /// (`member`, `temporaryPassword`).
    async fn invite(&self, body: Value) -> Value {
        let resp = self
            .admin(self.client.post(self.url("/api/members")))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "invite failed");
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn invite_simple(&self, name: &str, email: &str, year: i32) -> String {
        let data = self
            .invite(json!({ "name": name, "email": email, "teamYears": [year] }))
            .await;
        data["member"]["id"].as_str().unwrap().to_string()
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }

    /// Log in and return the bearer token.
    async fn login_token(&self, email: &str, password: &str) -> String {
        let resp = self.login(email, password).await;
        assert_eq!(resp.status(), 200, "login failed");
        let body: Value = resp.json().await.unwrap();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn member_ids(&self) -> Vec<String> {
        let body: Value = self
            .admin(self.client.get(self.url("/api/members")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap().to_string())
            .collect()
    }

    async fn revision(&self) -> i64 {
        let body: Value = self
            .admin(self.client.get(self.url("/api/revision")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["data"]["revisionId"].as_i64().unwrap()
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

// ==================== HEALTH & AUTH ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_router_rejects_missing_token_without_network() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.sqlite");
    let pool = init_database(&db_path).await.unwrap();

    let config = Config {
        service_token: None,
        db_path,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        log_format: LogFormat::Pretty,
        max_upload_bytes: MAX_UPLOAD_BYTES,
        media: None,
        bootstrap_admin: None,
    };
    let state = AppState {
        repo: Arc::new(Repository::new(pool)),
        media: Arc::new(crate::media::UnconfiguredMediaStore),
        mailer: Arc::new(LogMailer),
        config: Arc::new(config),
    };

    let response = create_router(state)
        .oneshot(
            axum::http::Request::builder()
                .uri("/api/members")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_auth_missing_and_invalid_token() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/members"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = fixture
        .client
        .get(fixture.url("/api/members"))
        .bearer_auth("wrong-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_member_cannot_use_admin_routes() {
    let fixture = TestFixture::new().await;

    let data = fixture
        .invite(json!({ "name": "Ravi", "email": "ravi@example.edu", "teamYears": [2024] }))
        .await;
    let password = data["temporaryPassword"].as_str().unwrap();
    let token = fixture.login_token("ravi@example.edu", password).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/members"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // Member routes are fine
    let resp = fixture
        .client
        .get(fixture.url("/api/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["email"], "ravi@example.edu");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials_and_logout_revokes() {
    let fixture = TestFixture::new().await;

    let data = fixture
        .invite(json!({ "name": "Meera", "email": "meera@example.edu", "teamYears": [2024] }))
        .await;
    let password = data["temporaryPassword"].as_str().unwrap().to_string();

    let resp = fixture.login("meera@example.edu", "not-the-password").await;
    assert_eq!(resp.status(), 401);
    let resp = fixture.login("nobody@example.edu", &password).await;
    assert_eq!(resp.status(), 401);

    // Email lookup ignores case
    let token = fixture.login_token("Meera@Example.edu", &password).await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url("/api/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_service_token_has_no_profile() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .admin(fixture.client.get(fixture.url("/api/me")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

// ==================== MEMBERS & TEAM ====================

#[tokio::test]
async fn test_invite_and_team_listing() {
    let fixture = TestFixture::new().await;

    fixture
        .invite(json!({
            "name": "Asha",
            "email": "asha@example.edu",
            "teamYears": [2024],
            "yearlyRoles": [{ "year": 2024, "role": "lead", "teamRole": "Web Lead" }]
        }))
        .await;
    fixture
        .invite(json!({ "name": "Bala", "email": "bala@example.edu", "teamYears": [2024] }))
        .await;
    fixture
        .invite(json!({
            "name": "Dr. Iyer",
            "email": "iyer@example.edu",
            "teamYears": [2023, 2024],
            "yearlyRoles": [
                { "year": 2023, "role": "nodal_officer" },
                { "year": 2024, "role": "member", "teamRole": "Faculty Advisor" },
                { "year": 2022, "role": "ceo" }
            ]
        }))
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/team?year=2024"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let members = body["data"]["members"].as_array().unwrap();
    assert_eq!(members.len(), 3);

    let category = |name: &str| {
        members
            .iter()
            .find(|m| m["name"] == name)
            .map(|m| m["category"].as_str().unwrap().to_string())
            .unwrap()
    };
    assert_eq!(category("Asha"), "Core Team");
    assert_eq!(category("Bala"), "Team Member");
    assert_eq!(category("Dr. Iyer"), "Faculty");

    // Roles for unselected years are dropped
    let body: Value = fixture
        .client
        .get(fixture.url("/api/team/years"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"], json!([2024, 2023]));

    // Without a year the latest one is shown
    let body: Value = fixture
        .client
        .get(fixture.url("/api/team"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["year"], 2024);

    let body: Value = fixture
        .client
        .get(fixture.url("/api/team?year=2023"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let members = body["data"]["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["category"], "Faculty");
    assert_eq!(members[0]["role"], "nodal_officer");
}

#[tokio::test]
async fn test_invite_validation() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .admin(fixture.client.post(fixture.url("/api/members")))
        .json(&json!({ "name": "Nobody", "email": "nobody@example.edu", "teamYears": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Select at least one team year");

    let resp = fixture
        .admin(fixture.client.post(fixture.url("/api/members")))
        .json(&json!({ "name": "", "email": "blank@example.edu", "teamYears": [2024] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .admin(fixture.client.post(fixture.url("/api/members")))
        .json(&json!({ "name": "Bad", "email": "not-an-email", "teamYears": [2024] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    fixture.invite_simple("Dup", "dup@example.edu", 2024).await;
    let resp = fixture
        .admin(fixture.client.post(fixture.url("/api/members")))
        .json(&json!({ "name": "Dup Again", "email": "DUP@example.edu", "teamYears": [2024] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_invite_with_email_hides_temporary_password() {
    let fixture = TestFixture::new().await;

    let data = fixture
        .invite(json!({
            "name": "Kiran",
            "email": "kiran@example.edu",
            "teamYears": [2024],
            "sendEmail": true
        }))
        .await;

    assert_eq!(data["emailSent"], true);
    assert!(data.get("temporaryPassword").is_none());
}

#[tokio::test]
async fn test_toggle_active_hides_member_from_team() {
    let fixture = TestFixture::new().await;
    let id = fixture.invite_simple("Tara", "tara@example.edu", 2024).await;

    let resp = fixture
        .admin(
            fixture
                .client
                .patch(fixture.url(&format!("/api/members/{}/active", id))),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["active"], false);

    let body: Value = fixture
        .client
        .get(fixture.url("/api/team?year=2024"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["members"], json!([]));

    // Still listed for admins
    assert_eq!(fixture.member_ids().await, vec![id]);
}

#[tokio::test]
async fn test_display_order_batch() {
    let fixture = TestFixture::new().await;
    let a = fixture.invite_simple("A", "a@example.edu", 2024).await;
    let b = fixture.invite_simple("B", "b@example.edu", 2024).await;
    let c = fixture.invite_simple("C", "c@example.edu", 2024).await;
    assert_eq!(fixture.member_ids().await, vec![a.clone(), b.clone(), c.clone()]);

    let batch = json!({ "updates": [
        { "userId": c, "displayOrder": 0 },
        { "userId": a, "displayOrder": 1 },
        { "userId": b, "displayOrder": 2 }
    ]});

    let before = fixture.revision().await;
    let resp = fixture
        .admin(fixture.client.put(fixture.url("/api/members/display-order")))
        .json(&batch)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["revisionId"].as_i64().unwrap() > before);
    assert_eq!(fixture.member_ids().await, vec![c.clone(), a.clone(), b.clone()]);

    // Replaying the batch changes nothing
    let resp = fixture
        .admin(fixture.client.put(fixture.url("/api/members/display-order")))
        .json(&batch)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(fixture.member_ids().await, vec![c.clone(), a.clone(), b.clone()]);

    let body: Value = fixture
        .client
        .get(fixture.url("/api/team?year=2024"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let orders: Vec<i64> = body["data"]["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["displayOrder"].as_i64().unwrap())
        .collect();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_display_order_rejects_bad_batches() {
    let fixture = TestFixture::new().await;
    let a = fixture.invite_simple("A", "a@example.edu", 2024).await;

    let resp = fixture
        .admin(fixture.client.put(fixture.url("/api/members/display-order")))
        .json(&json!({ "updates": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Unknown ids abort the whole batch
    let resp = fixture
        .admin(fixture.client.put(fixture.url("/api/members/display-order")))
        .json(&json!({ "updates": [
            { "userId": a, "displayOrder": 5 },
            { "userId": "missing", "displayOrder": 6 }
        ]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: Value = fixture
        .admin(fixture.client.get(fixture.url(&format!("/api/members/{}", a))))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["displayOrder"], Value::Null);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let fixture = TestFixture::new().await;

    let data = fixture
        .invite(json!({
            "name": "Admin",
            "email": "admin@example.edu",
            "teamYears": [2024],
            "role": "admin"
        }))
        .await;
    let admin_id = data["member"]["id"].as_str().unwrap().to_string();
    let password = data["temporaryPassword"].as_str().unwrap();
    let token = fixture.login_token("admin@example.edu", password).await;
    let other = fixture.invite_simple("Other", "other@example.edu", 2024).await;

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/members/{}", admin_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CANNOT_DELETE_SELF");

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/members/{}", other)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(fixture.member_ids().await, vec![admin_id.clone()]);

    let resp = fixture
        .admin(
            fixture
                .client
                .delete(fixture.url(&format!("/api/members/{}", other))),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_password_reset() {
    let fixture = TestFixture::new().await;
    let data = fixture
        .invite(json!({ "name": "Nila", "email": "nila@example.edu", "teamYears": [2024] }))
        .await;
    let id = data["member"]["id"].as_str().unwrap().to_string();
    let old_password = data["temporaryPassword"].as_str().unwrap().to_string();
    let old_token = fixture.login_token("nila@example.edu", &old_password).await;

    let resp = fixture
        .admin(
            fixture
                .client
                .post(fixture.url(&format!("/api/members/{}/password", id))),
        )
        .json(&json!({ "newPassword": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .admin(
            fixture
                .client
                .post(fixture.url(&format!("/api/members/{}/password", id))),
        )
        .json(&json!({ "newPassword": "a-longer-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    assert_eq!(fixture.login("nila@example.edu", &old_password).await.status(), 401);
    fixture.login_token("nila@example.edu", "a-longer-password").await;

    // Sessions opened with the old password are gone
    let resp = fixture
        .client
        .get(fixture.url("/api/me"))
        .bearer_auth(&old_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_self_service_edit_keeps_admin_fields() {
    let fixture = TestFixture::new().await;
    let data = fixture
        .invite(json!({ "name": "Dev", "email": "dev@example.edu", "teamYears": [2024] }))
        .await;
    let password = data["temporaryPassword"].as_str().unwrap();
    let token = fixture.login_token("dev@example.edu", password).await;

    let form = Form::new().text(
        "data",
        json!({
            "name": "Dev Kumar",
            "github": "devk",
            "role": "admin",
            "active": false,
            "teamYears": [2020]
        })
        .to_string(),
    );
    let resp = fixture
        .client
        .put(fixture.url("/api/me"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Dev Kumar");
    assert_eq!(body["data"]["github"], "devk");
    assert_eq!(body["data"]["role"], "member");
    assert_eq!(body["data"]["active"], true);
    assert_eq!(body["data"]["teamYears"], json!([2024]));
}

#[tokio::test]
async fn test_admin_edit_replaces_yearly_roles() {
    let fixture = TestFixture::new().await;
    let id = fixture.invite_simple("Sam", "sam@example.edu", 2023).await;

    let form = Form::new().text(
        "data",
        json!({
            "teamYears": [2023, 2024],
            "yearlyRoles": [{ "year": 2024, "role": "co_lead", "academicYear": 3 }]
        })
        .to_string(),
    );
    let resp = fixture
        .admin(fixture.client.put(fixture.url(&format!("/api/members/{}", id))))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["teamYears"], json!([2023, 2024]));
    let roles = body["data"]["yearlyRoles"].as_array().unwrap();
    assert_eq!(roles[0]["role"], "member");
    assert_eq!(roles[1]["role"], "co_lead");
    assert_eq!(roles[1]["academicYear"], 3);

    let form = Form::new().text("data", json!({ "teamYears": [] }).to_string());
    let resp = fixture
        .admin(fixture.client.put(fixture.url(&format!("/api/members/{}", id))))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

// ==================== REGISTRATIONS ====================

#[tokio::test]
async fn test_registration_lifecycle() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/registrations"))
        .json(&json!({
            "name": "Priya",
            "email": "priya@example.edu",
            "academicYear": 2,
            "interest": "Robotics"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .post(fixture.url("/api/registrations"))
        .json(&json!({ "name": "Bad", "email": "bad@example.edu", "academicYear": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Listing needs an admin
    let resp = fixture
        .client
        .get(fixture.url("/api/registrations"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let body: Value = fixture
        .admin(fixture.client.get(fixture.url("/api/registrations")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let registrations = body["data"].as_array().unwrap();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0]["interest"], "Robotics");

    let resp = fixture
        .admin(
            fixture
                .client
                .delete(fixture.url(&format!("/api/registrations/{}", id))),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .admin(
            fixture
                .client
                .delete(fixture.url(&format!("/api/registrations/{}", id))),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// ==================== UPLOADS ====================

#[tokio::test]
async fn test_upload_images() {
    let fixture = TestFixture::new().await;

    let form = Form::new()
        .part("images", Part::bytes(png(20, 20)).file_name("Team Photo.png"))
        .part("images", Part::bytes(png(30, 10)).file_name("banner.png"))
        .text("folder", "Events");
    let resp = fixture
        .admin(fixture.client.post(fixture.url("/api/uploads")))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let images = body["data"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert!(images[0]["url"]
        .as_str()
        .unwrap()
        .starts_with("https://media.test/club/events/team-photo-"));

    let received = fixture.media.received.lock().unwrap().clone();
    assert_eq!(received.len(), 2);
    for upload in &received {
        assert_eq!(upload.folder, "club/events");

        let mut hasher = Sha256::new();
        hasher.update(
            format!(
                "folder={}&public_id={}&timestamp={}",
                upload.folder, upload.public_id, upload.timestamp
            )
            .as_bytes(),
        );
        hasher.update(MEDIA_SECRET.as_bytes());
        assert_eq!(upload.signature, format!("{:x}", hasher.finalize()));
    }
}

#[tokio::test]
async fn test_upload_rejects_bad_files() {
    let fixture = TestFixture::new().await;

    let form = Form::new().part(
        "images",
        Part::bytes(b"plain text".to_vec()).file_name("notes.txt"),
    );
    let resp = fixture
        .admin(fixture.client.post(fixture.url("/api/uploads")))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 415);

    let form = Form::new().text("folder", "events");
    let resp = fixture
        .admin(fixture.client.post(fixture.url("/api/uploads")))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let mut oversized = png(8, 8);
    oversized.resize(MAX_UPLOAD_BYTES + 1, 0);
    let form = Form::new().part("images", Part::bytes(oversized).file_name("big.png"));
    let resp = fixture
        .admin(fixture.client.post(fixture.url("/api/uploads")))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);

    assert!(fixture.media.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_profile_picture_is_cropped() {
    let fixture = TestFixture::new().await;
    let id = fixture.invite_simple("Lena", "lena@example.edu", 2024).await;

    let crop = CropSpec {
        display_width: 400.0,
        display_height: 300.0,
        selection: CropRect {
            x: 100.0,
            y: 50.0,
            width: 100.0,
            height: 100.0,
        },
    };
    let form = Form::new()
        .text("data", json!({ "department": "ECE" }).to_string())
        .text("crop", serde_json::to_string(&crop).unwrap())
        .part("profilePicture", Part::bytes(png(1600, 1200)).file_name("me.png"));

    let resp = fixture
        .admin(fixture.client.put(fixture.url(&format!("/api/members/{}", id))))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["department"], "ECE");
    assert_eq!(
        body["data"]["profileImage"],
        format!("https://media.test/club/profiles/member-{}.jpg", id)
    );

    let received = fixture.media.received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    let stored = image::load_from_memory(&received[0].bytes).unwrap();
    assert_eq!(image::guess_format(&received[0].bytes).unwrap(), ImageFormat::Jpeg);
    assert_eq!((stored.width(), stored.height()), (300, 300));
}

#[tokio::test]
async fn test_crop_without_picture_is_rejected() {
    let fixture = TestFixture::new().await;
    let id = fixture.invite_simple("Omar", "omar@example.edu", 2024).await;

    let form = Form::new().text(
        "crop",
        json!({
            "displayWidth": 400.0,
            "displayHeight": 300.0,
            "selection": { "x": 0.0, "y": 0.0, "width": 100.0, "height": 100.0 }
        })
        .to_string(),
    );
    let resp = fixture
        .admin(fixture.client.put(fixture.url(&format!("/api/members/{}", id))))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

// ==================== API CLIENT ====================

#[tokio::test]
async fn test_client_reorder_flow() {
    let fixture = TestFixture::new().await;
    let api = fixture.api_client();
    let service = AuthContext::new(SERVICE_TOKEN);

    let mut editor = TeamYearsEditor::new();
    assert!(api
        .invite_member(
            &service,
            CreateMemberRequest {
                name: "Nobody".to_string(),
                email: "nobody@example.edu".to_string(),
                team_years: vec![],
                yearly_roles: vec![],
                role: None,
                department: None,
                phone_number: None,
                linkedin: None,
                github: None,
                send_email: false,
            },
            &editor,
        )
        .await
        .is_err());
    assert!(fixture.member_ids().await.is_empty());

    editor.toggle_year(2024);
    let mut temporary_password = None;
    for (name, email, role) in [
        ("A", "a@example.edu", SystemRole::Admin),
        ("B", "b@example.edu", SystemRole::Member),
        ("C", "c@example.edu", SystemRole::Member),
    ] {
        let invited = api
            .invite_member(
                &service,
                CreateMemberRequest {
                    name: name.to_string(),
                    email: email.to_string(),
                    team_years: vec![],
                    yearly_roles: vec![],
                    role: Some(role),
                    department: None,
                    phone_number: None,
                    linkedin: None,
                    github: None,
                    send_email: false,
                },
                &editor,
            )
            .await
            .unwrap();
        assert_eq!(invited.member.team_years, vec![2024]);
        if role == SystemRole::Admin {
            temporary_password = invited.temporary_password;
        }
    }

    let (auth, me) = api
        .login("a@example.edu", &temporary_password.unwrap())
        .await
        .unwrap();
    assert_eq!(me.role, SystemRole::Admin);

    let mut board = OrderBoard::new(api.list_members(&auth).await.unwrap());
    let c = board.members()[2].id.clone();
    assert!(board.move_to_index(&c, 0));
    assert!(board.is_dirty());
    assert_eq!(api.save_display_order(&auth, &mut board).await.unwrap(), 3);
    assert!(!board.is_dirty());

    let roster = api.list_team(Some(2024)).await.unwrap();
    let names: Vec<&str> = roster.members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["C", "A", "B"]);

    // Deleting yourself is reported distinctly
    let err = api.delete_member(&auth, &me.id).await.unwrap_err();
    assert!(matches!(err, ClientError::CannotDeleteSelf));

    // A failed save leaves the board dirty
    let b = board.members()[2].id.clone();
    api.delete_member(&auth, &b).await.unwrap();
    assert!(board.move_to_index(&b, 0));
    let err = api.save_display_order(&auth, &mut board).await.unwrap_err();
    assert_eq!(err.code(), Some("NOT_FOUND"));
    assert!(board.is_dirty());
}

#[tokio::test]
async fn test_reorder_under_year_filter_persists_as_shown() {
    let fixture = TestFixture::new().await;
    let api = fixture.api_client();
    let service = AuthContext::new(SERVICE_TOKEN);

    let h = fixture.invite_simple("H", "h@example.edu", 2023).await;
    let v1 = fixture.invite_simple("V1", "v1@example.edu", 2024).await;
    let v2 = fixture.invite_simple("V2", "v2@example.edu", 2024).await;

    let resp = fixture
        .admin(fixture.client.put(fixture.url("/api/members/display-order")))
        .json(&json!({ "updates": [
            { "userId": h, "displayOrder": 1 },
            { "userId": v1, "displayOrder": 0 },
            { "userId": v2, "displayOrder": 5 },
        ] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let mut board = OrderBoard::new(api.list_members(&service).await.unwrap());
    board.set_year_filter(Some(2024));
    assert!(board.move_member(&v2, &v1));
    board.set_year_filter(None);
    api.save_display_order(&service, &mut board).await.unwrap();

    let shown: Vec<String> = board.visible().iter().map(|m| m.id.clone()).collect();
    assert_eq!(shown, vec![v2.clone(), h.clone(), v1.clone()]);
    assert_eq!(fixture.member_ids().await, shown);

    // A fresh board built from the server agrees
    let reloaded = OrderBoard::new(api.list_members(&service).await.unwrap());
    let reloaded: Vec<String> = reloaded.members().iter().map(|m| m.id.clone()).collect();
    assert_eq!(reloaded, shown);
}

#[tokio::test]
async fn test_client_uploads_and_registrations() {
    let fixture = TestFixture::new().await;
    let api = fixture.api_client();
    let service = AuthContext::new(SERVICE_TOKEN);

    let uploaded = api
        .upload_images(
            &service,
            vec![FileUpload {
                file_name: "poster.png".to_string(),
                bytes: png(16, 16),
            }],
            None,
        )
        .await
        .unwrap();
    assert_eq!(uploaded.images.len(), 1);
    assert!(uploaded.images[0].public_id.starts_with("club/uploads/poster-"));

    let registration = api
        .submit_registration(&crate::models::CreateRegistrationRequest {
            name: "Zoya".to_string(),
            email: "zoya@example.edu".to_string(),
            phone_number: None,
            department: Some("CSE".to_string()),
            academic_year: Some(1),
            interest: None,
            message: Some("Keen to join".to_string()),
        })
        .await
        .unwrap();

    let listed = api.list_registrations(&service).await.unwrap();
    assert_eq!(listed.len(), 1);
    api.delete_registration(&service, &registration.id)
        .await
        .unwrap();
    assert!(api.list_registrations(&service).await.unwrap().is_empty());

    let err = api
        .list_registrations(&AuthContext::new("bogus"))
        .await
        .unwrap_err();
    match err {
        ClientError::Api { status, code, .. } => {
            assert_eq!(status, 401);
            assert_eq!(code, "UNAUTHORIZED");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
