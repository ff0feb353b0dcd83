use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use common::catalog::QuizQuestion;
use reqwest::Client;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::Value;

use server::bank::FileQuestionBank;
use server::config::{
    AppConfig, AuthConfig, BankConfig, CompetitionConfig, CorsConfig, DatabaseConfig, ServerConfig,
};
use server::entity::user;
use server::gate::AccessGate;
use server::session::store::SessionStore;
use server::state::AppState;

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const ME: &str = "/api/v1/auth/me";
    pub const BULK_PROVISION: &str = "/api/v1/auth/participants/bulk";
    pub const ACCESS: &str = "/api/v1/rounds/access";
    pub const SESSIONS: &str = "/api/v1/sessions";
    pub const TRACK: &str = "/api/v1/round3/track";
    pub const CHALLENGES: &str = "/api/v1/round3/challenges";
    pub const ROUND3_SUBMISSIONS: &str = "/api/v1/round3/submissions";
    pub const REVIEW: &str = "/api/v1/review/round3";
    pub const LEADERBOARD: &str = "/api/v1/leaderboard";

    pub fn set_access(round: i32) -> String {
        format!("/api/v1/rounds/{round}/access")
    }

    pub fn current_session(round: i32) -> String {
        format!("/api/v1/sessions/current?round={round}")
    }

    pub fn session_answers(id: &str) -> String {
        format!("/api/v1/sessions/{id}/answers")
    }

    pub fn session_advance(id: &str) -> String {
        format!("/api/v1/sessions/{id}/advance")
    }

    pub fn session_finalize(id: &str) -> String {
        format!("/api/v1/sessions/{id}/finalize")
    }

    pub fn review_score(id: i64) -> String {
        format!("/api/v1/review/round3/{id}/score")
    }
}

/// Path to the test fixtures directory.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Load a question catalog so tests can answer correctly.
pub fn catalog_questions(round: i32, language: &str) -> Vec<QuizQuestion> {
    let path = fixtures_dir().join(format!("catalog/round{round}-{language}.json"));
    let raw = std::fs::read_to_string(&path).expect("fixture catalog should exist");
    serde_json::from_str(&raw).expect("fixture catalog should parse")
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub state: AppState,
    _data_dir: tempfile::TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!(
            "sqlite://{}/arena.db?mode=rwc",
            data_dir.path().display()
        );

        let mut app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: db_url.clone(),
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
                token_ttl_days: 7,
            },
            bank: BankConfig {
                catalog_dir: fixtures_dir().join("catalog"),
            },
            competition: CompetitionConfig::default(),
        };
        tweak(&mut app_config);

        let db = server::database::init_db(&db_url)
            .await
            .expect("Failed to initialize test database");
        server::seed::seed_role_permissions(&db)
            .await
            .expect("Failed to seed roles");
        server::seed::seed_round_access(&db)
            .await
            .expect("Failed to seed round access");
        server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let bank = Arc::new(
            FileQuestionBank::load(&app_config.bank.catalog_dir)
                .expect("Failed to load fixture catalogs"),
        );
        let gate = AccessGate::load(&db)
            .await
            .expect("Failed to load access gate");

        let state = AppState {
            db: db.clone(),
            config: app_config,
            bank,
            gate,
            sessions: Arc::new(SessionStore::new()),
        };

        let app = server::build_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            state,
            _data_dir: data_dir,
        }
    }

    /// Start the background sweeper, as main() does.
    pub fn start_sweeper(&self) {
        tokio::spawn(server::session::sweeper::run(self.state.clone()));
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn put_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// Register a user and log in, returning the auth token.
    pub async fn create_authenticated_user(&self, username: &str, password: &str) -> String {
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        let res = self.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Register a user with a specific role, then log in and return the auth token.
    pub async fn create_user_with_role(
        &self,
        username: &str,
        password: &str,
        role: &str,
    ) -> String {
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        let db_user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .expect("DB query failed")
            .expect("User not found after registration");

        let mut active: user::ActiveModel = db_user.into();
        active.role = Set(role.to_string());
        user::Entity::update(active)
            .exec(&self.db)
            .await
            .expect("Failed to update user role");

        let res = self.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Toggle a round's gate as admin.
    pub async fn set_round_access(&self, admin_token: &str, round: i32, enabled: bool) {
        let res = self
            .put_with_token(
                &routes::set_access(round),
                &serde_json::json!({ "enabled": enabled }),
                admin_token,
            )
            .await;
        assert_eq!(res.status, 200, "set_round_access failed: {}", res.text);
    }

    /// Look up a user's row directly.
    pub async fn find_user(&self, username: &str) -> user::Model {
        user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .expect("DB query failed")
            .expect("User not found")
    }

    /// Mutate a user's competition progress directly, as the progression
    /// engine or ranker would have.
    pub async fn promote_user(&self, username: &str, current_round: i32, qualified: bool) {
        let db_user = self.find_user(username).await;
        let mut active: user::ActiveModel = db_user.into();
        active.current_round = Set(current_round);
        active.qualified_for_round3 = Set(qualified);
        user::Entity::update(active)
            .exec(&self.db)
            .await
            .expect("Failed to promote user");
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> i64 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'")
    }
}
