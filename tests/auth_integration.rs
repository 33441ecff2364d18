use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use workout_tracker::auth::hash_password;
use workout_tracker::configuration::{JwtSettings, PasswordSettings};
use workout_tracker::domain::{NewUser, Role};
use workout_tracker::startup::run;
use workout_tracker::store::{InMemoryStore, UserStore};

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn get_with_token(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}{}", &self.address, path))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn register(&self, username: &str, password: &str) -> reqwest::Response {
        self.post_json(
            "/auth/register",
            &json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Log in and return the parsed body, asserting success
    async fn login(&self, username: &str, password: &str) -> Value {
        let response = self
            .post_json(
                "/auth/login",
                &json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post_json("/auth/refresh", &json!({ "refresh_token": refresh_token }))
            .await
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(InMemoryStore::new());
    let jwt_config = JwtSettings {
        secret: "integration-test-secret-value".to_string(),
        access_token_expiry: 1800,
        refresh_token_expiry: 2_592_000,
        issuer: "workout-tracker-test".to_string(),
    };
    // Lowest bcrypt cost keeps the suite fast
    let password_config = PasswordSettings { hash_cost: 4 };

    let server = run(
        listener,
        store.clone(),
        store.clone(),
        jwt_config,
        password_config,
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        client: reqwest::Client::new(),
    }
}

async fn create_admin(app: &TestApp, username: &str, password: &str) -> i64 {
    let password_hash = hash_password(password, 4).expect("Failed to hash password");
    app.store
        .create_user(NewUser {
            username: username.to_string(),
            password_hash,
            role: Role::Admin,
        })
        .await
        .expect("Failed to create admin")
        .id
}

// --- Registration Tests ---

#[tokio::test]
async fn register_returns_201_for_valid_credentials() {
    let app = spawn_app().await;

    let response = app.register("alice", "pw1").await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["id"], 1);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn register_returns_409_for_duplicate_username() {
    let app = spawn_app().await;
    assert_eq!(201, app.register("alice", "pw1").await.status().as_u16());

    let response = app.register("alice", "another").await;

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "DUPLICATE_ENTRY");
}

#[tokio::test]
async fn register_returns_400_for_invalid_input() {
    let app = spawn_app().await;

    let test_cases = vec![
        (json!({ "username": "ab", "password": "pw1" }), "username too short"),
        (json!({ "username": "has space", "password": "pw1" }), "bad characters"),
        (json!({ "username": "alice", "password": "" }), "empty password"),
        (json!({ "username": "alice" }), "missing password"),
        (json!({}), "empty body"),
    ];

    for (body, description) in test_cases {
        let response = app.post_json("/auth/register", &body).await;
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 when the payload had {}.",
            description
        );
    }
}

#[tokio::test]
async fn malformed_json_returns_400_in_error_shape() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(&format!("{}/auth/login", &app.address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body.get("error_id").is_some());
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_200_with_token_pair() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;

    let body = app.login("alice", "pw1").await;

    assert!(body["access_token"].as_str().is_some());
    assert_eq!(body["refresh_token"].as_str().map(str::len), Some(64));
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 1800);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");
    assert_eq!(body["user_id"], 1);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;

    let wrong_password = app
        .post_json("/auth/login", &json!({ "username": "alice", "password": "wrongpw" }))
        .await;
    let unknown_user = app
        .post_json("/auth/login", &json!({ "username": "mallory", "password": "pw1" }))
        .await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_user.status().as_u16());

    let wrong_password: Value = wrong_password.json().await.unwrap();
    let unknown_user: Value = unknown_user.json().await.unwrap();
    assert_eq!(wrong_password["message"], "invalid credentials");
    assert_eq!(wrong_password["message"], unknown_user["message"]);
    assert_eq!(wrong_password["code"], unknown_user["code"]);
}

// --- Protected Route Tests ---

#[tokio::test]
async fn get_current_user_returns_200_with_valid_token() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;
    let login = app.login("alice", "pw1").await;

    let response = app
        .get_with_token("/api/me", login["access_token"].as_str().unwrap())
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["id"], 1);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");
    assert!(body["created_at"].as_str().is_some());
}

#[tokio::test]
async fn protected_route_returns_401_without_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/api/me", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "missing or invalid token");
}

#[tokio::test]
async fn protected_route_rejects_malformed_authorization_header() {
    let app = spawn_app().await;

    for header in ["abc.def.ghi", "Basic dXNlcjpwYXNz", "bearer abc.def.ghi"] {
        let response = app
            .client
            .get(&format!("{}/api/me", &app.address))
            .header("Authorization", header)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(401, response.status().as_u16(), "header {:?}", header);
    }
}

#[tokio::test]
async fn protected_route_returns_401_with_invalid_token() {
    let app = spawn_app().await;

    let response = app.get_with_token("/api/me", "invalid.token.value").await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "invalid token");
}

// --- Refresh Rotation Tests ---

#[tokio::test]
async fn refresh_rotates_tokens() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;
    let login = app.login("alice", "pw1").await;
    let old_refresh = login["refresh_token"].as_str().unwrap();

    let response = app.refresh(old_refresh).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_ne!(body["access_token"], login["access_token"]);
    assert_ne!(body["refresh_token"].as_str().unwrap(), old_refresh);
    assert_eq!(body["token_type"], "Bearer");

    let me = app
        .get_with_token("/api/me", body["access_token"].as_str().unwrap())
        .await;
    assert_eq!(200, me.status().as_u16());
}

#[tokio::test]
async fn refresh_token_cannot_be_reused() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;
    let login = app.login("alice", "pw1").await;
    let old_refresh = login["refresh_token"].as_str().unwrap();

    assert_eq!(200, app.refresh(old_refresh).await.status().as_u16());

    let response = app.refresh(old_refresh).await;
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "invalid refresh token");
}

#[tokio::test]
async fn refresh_revokes_previous_access_tokens() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;
    let login = app.login("alice", "pw1").await;
    let old_access = login["access_token"].as_str().unwrap();

    assert_eq!(
        200,
        app.refresh(login["refresh_token"].as_str().unwrap())
            .await
            .status()
            .as_u16()
    );

    let response = app.get_with_token("/api/me", old_access).await;
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "token has been invalidated");
}

#[tokio::test]
async fn refresh_returns_401_for_unknown_token() {
    let app = spawn_app().await;

    let response = app.refresh("not-a-real-token").await;

    assert_eq!(401, response.status().as_u16());
}

// --- Admin Gate Tests ---

#[tokio::test]
async fn admin_route_rejects_non_admin_with_401() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;
    let login = app.login("alice", "pw1").await;

    let response = app
        .get_with_token("/admin/users/1", login["access_token"].as_str().unwrap())
        .await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "access denied");
    assert_eq!(body["code"], "ACCESS_DENIED");
}

#[tokio::test]
async fn admin_route_requires_authentication() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/admin/users/1", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "missing or invalid token");
}

#[tokio::test]
async fn admin_can_fetch_any_user() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;
    create_admin(&app, "root", "rootpw").await;
    let login = app.login("root", "rootpw").await;
    assert_eq!(login["role"], "admin");
    let token = login["access_token"].as_str().unwrap();

    let response = app.get_with_token("/admin/users/1", token).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], "alice");

    let missing = app.get_with_token("/admin/users/999", token).await;
    assert_eq!(404, missing.status().as_u16());
}

#[tokio::test]
async fn admin_route_returns_400_for_non_numeric_id() {
    let app = spawn_app().await;
    create_admin(&app, "root", "rootpw").await;
    let login = app.login("root", "rootpw").await;

    let response = app
        .get_with_token("/admin/users/abc", login["access_token"].as_str().unwrap())
        .await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "id has invalid format");
}
