//! Shared test helpers: a scripted transport and a wired-up data layer.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use guidesync_core::{
    ApiError, AuthProvider, CacheStore, ConnectivityMonitor, DataAccess, GuideService,
    ManualClock, MemoryStore, PendingActionQueue, RuntimeContext, SyncCoordinator, SyncSettings,
    Transport,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Notify;

pub const PRINCIPAL: &str = "alice@example.com";
pub const TTL_MINUTES: i64 = 720;

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub endpoint: String,
    pub payload: Option<Value>,
}

/// Transport whose answers are scripted per endpoint.
#[derive(Default)]
pub struct FakeTransport {
    calls: Mutex<Vec<Call>>,
    gets: Mutex<HashMap<String, Result<Value, ApiError>>>,
    write_error: Mutex<Option<ApiError>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, endpoint: &str, body: Value) {
        self.gets.lock().insert(endpoint.to_string(), Ok(body));
    }

    pub fn fail(&self, endpoint: &str, err: ApiError) {
        self.gets.lock().insert(endpoint.to_string(), Err(err));
    }

    /// Make every create/update/delete fail with `err`, or succeed with `None`.
    pub fn fail_writes(&self, err: Option<ApiError>) {
        *self.write_error.lock() = err;
    }

    /// Hold every write until the returned notify is signalled once per write.
    pub fn hold_writes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn write_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.method != "GET").collect()
    }

    async fn write(
        &self,
        method: &'static str,
        endpoint: &str,
        payload: Option<&Value>,
    ) -> Result<(), ApiError> {
        self.calls.lock().push(Call {
            method,
            endpoint: endpoint.to_string(),
            payload: payload.cloned(),
        });
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.write_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.calls.lock().push(Call {
            method: "GET",
            endpoint: endpoint.to_string(),
            payload: None,
        });
        self.gets
            .lock()
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| Err(ApiError::NotFound(endpoint.to_string())))
    }

    async fn create(&self, endpoint: &str, payload: Option<&Value>) -> Result<(), ApiError> {
        self.write("POST", endpoint, payload).await
    }

    async fn update(&self, endpoint: &str, payload: Option<&Value>) -> Result<(), ApiError> {
        self.write("PUT", endpoint, payload).await
    }

    async fn delete(&self, endpoint: &str) -> Result<(), ApiError> {
        self.write("DELETE", endpoint, None).await
    }
}

pub struct FakeAuth {
    principal: Mutex<Option<String>>,
}

impl FakeAuth {
    pub fn signed_in(principal: &str) -> Arc<Self> {
        Arc::new(Self {
            principal: Mutex::new(Some(principal.to_string())),
        })
    }

    pub fn switch_to(&self, principal: Option<&str>) {
        *self.principal.lock() = principal.map(str::to_string);
    }
}

impl AuthProvider for FakeAuth {
    fn current_principal_id(&self) -> Option<String> {
        self.principal.lock().clone()
    }

    fn auth_token(&self) -> Option<String> {
        self.principal.lock().as_ref().map(|p| format!("token-for-{}", p))
    }
}

/// Every component of the data layer over shared in-memory storage.
pub struct Harness {
    pub kv: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub transport: Arc<FakeTransport>,
    pub auth: Arc<FakeAuth>,
    pub monitor: ConnectivityMonitor,
    pub queue: Arc<PendingActionQueue>,
    pub sync: Arc<SyncCoordinator>,
}

impl Harness {
    pub fn new(context: RuntimeContext, online: bool) -> Self {
        Self::with_settings(context, online, SyncSettings::default())
    }

    pub fn with_settings(context: RuntimeContext, online: bool, settings: SyncSettings) -> Self {
        let kv = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let transport = FakeTransport::new();
        let auth = FakeAuth::signed_in(PRINCIPAL);
        let monitor = ConnectivityMonitor::new(context, online);
        let queue = Arc::new(PendingActionQueue::new(kv.clone(), clock.clone()));
        let sync = Arc::new(SyncCoordinator::new(
            queue.clone(),
            transport.clone(),
            monitor.clone(),
            clock.clone(),
            settings,
        ));
        Self {
            kv,
            clock,
            transport,
            auth,
            monitor,
            queue,
            sync,
        }
    }

    pub fn online() -> Self {
        Self::new(RuntimeContext::Interactive, true)
    }

    pub fn offline() -> Self {
        Self::new(RuntimeContext::Interactive, false)
    }

    pub fn cache(&self) -> CacheStore {
        CacheStore::new(self.kv.clone(), "travel_app", self.clock.clone())
    }

    pub fn data(&self) -> DataAccess {
        DataAccess::new(
            self.transport.clone(),
            self.cache(),
            self.sync.clone(),
            self.monitor.clone(),
            self.auth.clone(),
            TTL_MINUTES,
        )
        .unwrap()
    }

    pub fn guides(&self) -> GuideService {
        GuideService::new(self.data())
    }
}

pub fn guide_json(id: i64, title: &str, favorite: bool) -> Value {
    json!({
        "id": id,
        "titre": title,
        "description": "",
        "nombreJours": 2,
        "mobilites": [],
        "saisons": [],
        "pourQui": [],
        "guideActivites": [],
        "invitedUserIds": [],
        "favori": favorite
    })
}
