//! Shared fixtures for the service integration tests
//!
//! Everything runs against the in-memory store, a recording notifier and a
//! clock the test moves by hand.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use std::sync::{Arc, Mutex};

use taskassign_shared::auth::jwt::TokenIssuer;
use taskassign_shared::models::user::{NewUser, User};
use taskassign_shared::notify::{InviteEmail, InviteNotifier, NotifyError};
use taskassign_shared::services::{AssignmentCoordinator, IdentityManager};
use taskassign_shared::store::InMemoryStore;

pub const SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const BASE_URL: &str = "http://tasks.test";

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::at(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Current reading, without going through the trait
    pub fn utc_now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
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

/// Notifier that records every invite and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<InviteEmail>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<InviteEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl InviteNotifier for RecordingNotifier {
    async fn send(&self, email: &InviteEmail) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(email.clone());
        if self.fail {
            return Err(NotifyError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Fully wired services over fresh in-memory state
pub struct Harness {
    pub store: InMemoryStore,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub identity: Arc<IdentityManager>,
    pub assignments: AssignmentCoordinator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        let store = InMemoryStore::new();
        let clock = Arc::new(ManualClock::new());
        let notifier = Arc::new(notifier);

        let issuer = TokenIssuer::new(SECRET, clock.clone()).unwrap();
        let identity = Arc::new(IdentityManager::new(
            Arc::new(store.clone()),
            issuer,
            clock.clone(),
        ));
        let assignments = AssignmentCoordinator::new(
            Arc::new(store.clone()),
            identity.clone(),
            notifier.clone(),
            clock.clone(),
            BASE_URL,
        );

        Self {
            store,
            clock,
            notifier,
            identity,
            assignments,
        }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> User {
        self.identity
            .register(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .await
            .unwrap()
    }
}
