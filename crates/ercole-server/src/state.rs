use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use ercole_engine::ports::HostStore;
use ercole_engine::HostDataService;
use tokio::sync::OwnedMutexGuard;

use crate::config::ServerConfig;

/// Admits one writer per hostname at a time.
///
/// Ingestion dismisses the current snapshot and then inserts the new one;
/// two concurrent ingestions for the same host would otherwise both see
/// the same predecessor.
#[derive(Default)]
pub struct HostGate {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

pub struct HostPermit {
    _guard: OwnedMutexGuard<()>,
}

impl HostGate {
    pub async fn acquire(&self, hostname: &str) -> HostPermit {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Drop entries nobody is holding or waiting on.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(hostname.to_string()).or_default().clone()
        };
        HostPermit {
            _guard: lock.lock_owned().await,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<HostDataService>,
    pub store: Arc<dyn HostStore>,
    pub host_gate: Arc<HostGate>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(service: Arc<HostDataService>, config: ServerConfig) -> Self {
        Self {
            store: service.store().clone(),
            service,
            host_gate: Arc::new(HostGate::default()),
            start_time: Utc::now(),
            config: Arc::new(config),
        }
    }
}
