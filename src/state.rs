// CV CRM bridge - application state
// Explicit composition root: the store, the auth manager and the request
// pipeline are built once here and shared by every transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::cache::{CacheKeys, KeyValueStore};
use crate::config::CrmConfig;
use crate::crm::{AuthManager, CrmClient};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub auth: Arc<AuthManager>,
    pub client: Arc<CrmClient>,
    pub start_time: Instant,
    /// Optional inbound bearer secret for the HTTP surface.
    pub auth_secret: Option<String>,
    /// `true` once startup checks have finished.
    pub ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        keys: CacheKeys,
        crm: CrmConfig,
        http: reqwest::Client,
        auth_secret: Option<String>,
    ) -> Self {
        let auth = Arc::new(AuthManager::new(store.clone(), &keys, crm, http.clone()));
        let client = Arc::new(CrmClient::new(auth.clone(), store.clone(), keys, http));
        Self {
            store,
            auth,
            client,
            start_time: Instant::now(),
            auth_secret,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Relaxed);
        tracing::info!("Backend marked as READY");
    }

    /// CRM tenant sub-domain, as shown by `cvcrm://config`.
    pub fn domain(&self) -> &str {
        &self.auth.config().domain
    }
}
