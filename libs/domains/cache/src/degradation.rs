//! Never-raise wrapper around every backend call.

use observability::CacheMetrics;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::backend::CacheBackend;
use crate::connection::{Admission, ConnectionMonitor, ConnectionState};
use crate::error::{CacheError, CacheResult};

pub struct DegradationController {
    backend: Arc<dyn CacheBackend>,
    monitor: ConnectionMonitor,
    op_timeout: Duration,
}

impl DegradationController {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        op_timeout: Duration,
        revalidate_interval: Duration,
    ) -> Self {
        Self {
            backend,
            monitor: ConnectionMonitor::new(revalidate_interval),
            op_timeout,
        }
    }

    pub fn backend(&self) -> &dyn CacheBackend {
        self.backend.as_ref()
    }

    pub fn state(&self) -> ConnectionState {
        self.monitor.state()
    }

    /// Whether the backend may be called now, probing it if the last verdict is stale
    pub async fn ensure_available(&self) -> bool {
        match self.monitor.admit() {
            Admission::Proceed => true,
            Admission::ShortCircuit => false,
            Admission::Probe => self.probe().await,
        }
    }

    /// Ping the backend unconditionally and record the verdict
    pub async fn probe(&self) -> bool {
        self.call("ping", self.backend.ping()).await.is_ok()
    }

    /// Run `fut` under the degradation policy: any failure becomes `None`
    pub async fn guard<T, F>(&self, operation: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = CacheResult<T>>,
    {
        if !self.ensure_available().await {
            debug!(operation, "Cache backend unavailable, skipping");
            return None;
        }
        self.call(operation, fut).await.ok()
    }

    /// Like [`guard`](Self::guard) but surfaces the failure, for admin operations
    pub async fn execute<T, F>(&self, operation: &'static str, fut: F) -> CacheResult<T>
    where
        F: Future<Output = CacheResult<T>>,
    {
        if !self.ensure_available().await {
            return Err(CacheError::Unavailable);
        }
        self.call(operation, fut).await
    }

    async fn call<T, F>(&self, operation: &'static str, fut: F) -> CacheResult<T>
    where
        F: Future<Output = CacheResult<T>>,
    {
        let result = match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(operation)),
        };

        match &result {
            Ok(_) => self.monitor.record_success(),
            Err(e) => {
                CacheMetrics::record_backend_error(operation);
                self.monitor.record_failure(operation, e);
            }
        }
        result
    }

    /// Release the backend connection
    pub async fn close(&self) {
        self.backend.close().await;
    }
}
