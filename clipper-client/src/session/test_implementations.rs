//! Scripted collaborators for session manager tests.
//!
//! Every double appends to one shared [`EventLog`] so tests can assert both
//! how often and in which order side effects happened.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::{
    config::TestLoginConfig,
    models::{AccountType, TestLoginRequest, Timestamp, User, UserRole},
};
use url::Url;
use uuid::Uuid;

use super::SessionManager;
use crate::{
    errors::{ClientError, ClientResult},
    services::{
        Analytics, Collaborators, ErrorTelemetry, IdentifyProperties, SessionService,
        StorageClearer,
    },
};

pub fn user_with_role(username: &str, role: UserRole) -> User {
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        display_name: username.to_uppercase(),
        avatar_url: None,
        role,
        account_type: AccountType::Member,
        is_premium: false,
        premium_tier: None,
        is_verified: true,
        is_banned: false,
        created_at: Timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
    }
}

#[derive(Debug, Default)]
pub struct EventLog(Mutex<Vec<String>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == event)
    }
}

/// Session service whose answers are queued up front.
///
/// `fetch_current_user` pops from `fetch_results`; an empty queue behaves
/// like "no session".
#[derive(Debug)]
pub struct ScriptedSessionService {
    log: Arc<EventLog>,
    fetch_results: Mutex<VecDeque<Option<User>>>,
    test_login_result: Mutex<Option<User>>,
    logout_fails: AtomicBool,
    pub test_login_requests: Mutex<Vec<TestLoginRequest>>,
}

impl ScriptedSessionService {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self {
            log,
            fetch_results: Mutex::new(VecDeque::new()),
            test_login_result: Mutex::new(None),
            logout_fails: AtomicBool::new(false),
            test_login_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_fetch(&self, result: Option<User>) {
        self.fetch_results.lock().unwrap().push_back(result);
    }

    pub fn set_test_login(&self, result: Option<User>) {
        *self.test_login_result.lock().unwrap() = result;
    }

    pub fn fail_logout(&self) {
        self.logout_fails.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionService for ScriptedSessionService {
    async fn fetch_current_user(&self) -> ClientResult<User> {
        self.log.push("session.fetch");
        let next = self.fetch_results.lock().unwrap().pop_front().flatten();
        next.ok_or(ClientError::Unauthorized)
    }

    async fn initiate_oauth(&self) -> ClientResult<Url> {
        self.log.push("session.oauth");
        Ok(Url::parse("http://localhost:8080/api/v1/auth/twitch")?)
    }

    async fn logout(&self) -> ClientResult<()> {
        self.log.push("session.logout");
        if self.logout_fails.load(Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: http::StatusCode::SERVICE_UNAVAILABLE,
                message: "network error".to_string(),
            });
        }
        Ok(())
    }

    async fn test_login(&self, request: &TestLoginRequest) -> ClientResult<User> {
        self.log.push("session.test_login");
        self.test_login_requests
            .lock()
            .unwrap()
            .push(request.clone());
        let result = self.test_login_result.lock().unwrap().clone();
        result.ok_or(ClientError::Status {
            status: http::StatusCode::NOT_FOUND,
            message: "test login unavailable".to_string(),
        })
    }
}

/// Storage clearer that yields before finishing, so concurrent callers
/// interleave, and can be told to fail.
#[derive(Debug)]
pub struct RecordingStorage {
    log: Arc<EventLog>,
    fails: AtomicBool,
    pub clears: AtomicUsize,
}

impl RecordingStorage {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self {
            log,
            fails: AtomicBool::new(false),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn fail(&self) {
        self.fails.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageClearer for RecordingStorage {
    async fn clear_auth_storage(&self) -> ClientResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.log.push("storage.clear");
        if self.fails.load(Ordering::SeqCst) {
            return Err(ClientError::storage(
                "/tmp/session.cookies",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ));
        }
        Ok(())
    }
}

/// Records both telemetry sinks.
#[derive(Debug)]
pub struct RecordingTelemetry {
    log: Arc<EventLog>,
    pub identified: Mutex<Vec<IdentifyProperties>>,
    pub tracked: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingTelemetry {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self {
            log,
            identified: Mutex::new(Vec::new()),
            tracked: Mutex::new(Vec::new()),
        }
    }
}

impl ErrorTelemetry for RecordingTelemetry {
    fn set_user(&self, _id: &str, username: &str) {
        self.log.push(format!("errors.set_user:{username}"));
    }

    fn clear_user(&self) {
        self.log.push("errors.clear_user");
    }
}

impl Analytics for RecordingTelemetry {
    fn identify_user(&self, _id: &str, properties: &IdentifyProperties) {
        self.log
            .push(format!("analytics.identify:{}", properties.username));
        self.identified.lock().unwrap().push(properties.clone());
    }

    fn reset_user(&self) {
        self.log.push("analytics.reset");
    }

    fn track_event(&self, event_name: &str, properties: serde_json::Value) {
        self.log.push(format!("analytics.track:{event_name}"));
        self.tracked
            .lock()
            .unwrap()
            .push((event_name.to_string(), properties));
    }
}

/// A manager wired to scripted collaborators.
pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub service: Arc<ScriptedSessionService>,
    pub storage: Arc<RecordingStorage>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub log: Arc<EventLog>,
}

pub fn harness(test_login_enabled: bool) -> Harness {
    let log = Arc::new(EventLog::default());
    let service = Arc::new(ScriptedSessionService::new(log.clone()));
    let storage = Arc::new(RecordingStorage::new(log.clone()));
    let telemetry = Arc::new(RecordingTelemetry::new(log.clone()));

    let collaborators = Collaborators {
        session: service.clone(),
        storage: storage.clone(),
        error_telemetry: telemetry.clone(),
        analytics: telemetry.clone(),
    };
    let test_login = TestLoginConfig {
        enabled: test_login_enabled,
        username: "e2e_test_user".to_string(),
        user_id: Some("user-42".to_string()),
    };

    Harness {
        manager: SessionManager::new(collaborators, test_login),
        service,
        storage,
        telemetry,
        log,
    }
}
