#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use stocktrace_api::{
    auth::AuthService,
    config::AppConfig,
    db::{self, DbConfig},
    entities::{company, location::LocationKind, user, user::Role},
    events::{self, EventSender},
    notifications::NoopNotifier,
    services::locations::CreateLocationInput,
    services::AppServices,
    AppState,
};

const TEST_JWT_SECRET: &str =
    "integration_test_secret_key_that_is_definitely_longer_than_sixty_four_characters";
const TEST_PASSWORD: &str = "correct-horse-battery";

/// Harness for spinning up the full application over an in-memory SQLite
/// database: two seeded tenants, one user per role, and the real router.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub company_id: Uuid,
    pub other_company_id: Uuid,
    pub default_location_id: Uuid,
    pub second_location_id: Uuid,
    pub other_location_id: Uuid,
    pub admin_token: String,
    pub ops_token: String,
    pub viewer_token: String,
    pub other_admin_token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "test".to_string(),
        );
        // A single connection keeps every query on the same in-memory DB.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let db_cfg: DbConfig = (&cfg).into();
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(
            db_arc.clone(),
            event_sender.clone(),
            Arc::new(NoopNotifier),
        );
        let auth = Arc::new(AuthService::new(
            &cfg.jwt_secret,
            cfg.jwt_expiration_secs,
            db_arc.clone(),
        ));

        let company_id = seed_company(&db_arc, "Alpine Goods").await;
        let other_company_id = seed_company(&db_arc, "Borealis Supply").await;

        let admin_token =
            seed_user(&db_arc, &auth, company_id, "admin@alpine.test", Role::Admin).await;
        let ops_token = seed_user(&db_arc, &auth, company_id, "ops@alpine.test", Role::Ops).await;
        let viewer_token =
            seed_user(&db_arc, &auth, company_id, "viewer@alpine.test", Role::Viewer).await;
        let other_admin_token = seed_user(
            &db_arc,
            &auth,
            other_company_id,
            "admin@borealis.test",
            Role::Admin,
        )
        .await;

        let default_location_id = services
            .locations
            .create(
                company_id,
                CreateLocationInput {
                    name: "Main Warehouse".to_string(),
                    kind: LocationKind::Warehouse,
                    is_default: true,
                },
            )
            .await
            .expect("seed default location")
            .id;
        let second_location_id = services
            .locations
            .create(
                company_id,
                CreateLocationInput {
                    name: "Finished Goods".to_string(),
                    kind: LocationKind::FinishedGoods,
                    is_default: false,
                },
            )
            .await
            .expect("seed second location")
            .id;
        let other_location_id = services
            .locations
            .create(
                other_company_id,
                CreateLocationInput {
                    name: "Borealis Warehouse".to_string(),
                    kind: LocationKind::Warehouse,
                    is_default: true,
                },
            )
            .await
            .expect("seed other tenant location")
            .id;

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
            auth,
        };
        let router = stocktrace_api::build_router(state.clone());

        Self {
            router,
            state,
            company_id,
            other_company_id,
            default_location_id,
            second_location_id,
            other_location_id,
            admin_token,
            ops_token,
            viewer_token,
            other_admin_token,
            _event_task: event_task,
        }
    }

    pub fn test_password() -> &'static str {
        TEST_PASSWORD
    }

    /// Issue a JSON request against the router and decode the response.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.dispatch(request).await
    }

    /// Issue a request with a raw text body (CSV imports).
    pub async fn request_text(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: String,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "text/csv");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        self.dispatch(builder.body(Body::from(body)).unwrap()).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read failed");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        };
        (status, value)
    }

    // Seed helpers built on the API itself, so tests exercise the same code
    // paths as real clients.

    pub async fn create_component(&self, body: Value) -> Value {
        let (status, json) = self
            .request(
                Method::POST,
                "/api/v1/components",
                Some(&self.admin_token),
                Some(body),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "component create: {json}");
        json
    }

    pub async fn create_sku(&self, body: Value) -> Value {
        let (status, json) = self
            .request(
                Method::POST,
                "/api/v1/skus",
                Some(&self.admin_token),
                Some(body),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "sku create: {json}");
        json
    }

    pub async fn post_transaction(&self, kind: &str, body: Value) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            &format!("/api/v1/transactions/{kind}"),
            Some(&self.ops_token),
            Some(body),
        )
        .await
    }

    pub async fn receipt(&self, component_id: &str, location_id: &str, quantity: i64) -> Value {
        let (status, json) = self
            .post_transaction(
                "receipt",
                serde_json::json!({
                    "component_id": component_id,
                    "location_id": location_id,
                    "quantity": quantity,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "receipt: {json}");
        json
    }

    pub async fn on_hand(&self, component_id: &str) -> i64 {
        let (status, json) = self
            .request(
                Method::GET,
                &format!("/api/v1/components/{component_id}"),
                Some(&self.viewer_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "component get: {json}");
        json["quantity_on_hand"].as_i64().expect("quantity_on_hand")
    }
}

async fn seed_company(db: &Arc<sea_orm::DatabaseConnection>, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    company::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db.as_ref())
    .await
    .expect("seed company");
    id
}

async fn seed_user(
    db: &Arc<sea_orm::DatabaseConnection>,
    auth: &Arc<AuthService>,
    company_id: Uuid,
    email: &str,
    role: Role,
) -> String {
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_id: Set(company_id),
        email: Set(email.to_string()),
        password_hash: Set(AuthService::hash_password(TEST_PASSWORD).expect("hash")),
        role: Set(role.as_str().to_string()),
        active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(db.as_ref())
    .await
    .expect("seed user");

    auth.issue_token(&model).expect("issue token")
}
