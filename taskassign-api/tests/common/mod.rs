//! Common test utilities for API integration tests
//!
//! Builds the full router over the in-memory store, a notifier that records
//! invites, and a clock the test controls. No database is needed.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use taskassign_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskassign_shared::{
    notify::{InviteEmail, InviteNotifier, NotifyError},
    store::InMemoryStore,
};
use tower::Service as _;

pub const SECRET: &str = "api-test-secret-key-at-least-32-bytes";
pub const BASE_URL: &str = "http://tasks.test";

#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<InviteEmail>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<InviteEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl InviteNotifier for RecordingNotifier {
    async fn send(&self, email: &InviteEmail) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Test context containing the router and its collaborators
pub struct TestContext {
    pub app: Router,
    pub store: InMemoryStore,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestContext {
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgresql://unused/test".to_string()),
            "JWT_SECRET" => Some(SECRET.to_string()),
            "PUBLIC_BASE_URL" => Some(BASE_URL.to_string()),
            _ => None,
        })
        .unwrap();

        let store = InMemoryStore::new();
        let clock = Arc::new(ManualClock {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()),
        });
        let notifier = Arc::new(RecordingNotifier::default());

        let state = AppState::new(
            Arc::new(store.clone()),
            notifier.clone(),
            clock.clone(),
            config,
        )
        .unwrap();

        Self {
            app: build_router(state),
            store,
            clock,
            notifier,
        }
    }

    /// Sends a request and returns status plus parsed JSON body (`Null` when empty)
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .call(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(serde_json::json!({ "name": name, "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Registers and logs in, returning the access token
    pub async fn signed_in(&self, name: &str, email: &str) -> String {
        self.register(name, email, "password123").await;
        self.login(email, "password123").await
    }
}
