//! Common test utilities and mock infrastructure
//! Shared across the integration test suites

#![allow(dead_code)]

use async_trait::async_trait;
use deadlatch::{
    ConstraintHandler, ConstraintPoint, DynamicResourceHandler, EventNotifier, Permission,
    PermissionProvider, RequestContext, Result, Subject, SubjectProvider,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

/// Install the test tracing subscriber once per test binary
///
/// Honors `RUST_LOG`; output goes through the libtest capture writer.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Configurable mock constraint handler
///
/// Counts upstream subject lookups so tests can assert the at-most-once
/// memoization contract.
pub struct MockHandler {
    subject: Option<Subject>,
    subject_lookups: AtomicUsize,
    role_permissions: HashMap<String, Vec<Permission>>,
    dynamic: Option<Arc<dyn DynamicResourceHandler>>,
}

impl MockHandler {
    pub fn new() -> Self {
        Self {
            subject: None,
            subject_lookups: AtomicUsize::new(0),
            role_permissions: HashMap::new(),
            dynamic: None,
        }
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_role_permissions(
        mut self,
        role: impl Into<String>,
        permissions: Vec<Permission>,
    ) -> Self {
        self.role_permissions.insert(role.into(), permissions);
        self
    }

    pub fn with_dynamic_handler(mut self, handler: Arc<dyn DynamicResourceHandler>) -> Self {
        self.dynamic = Some(handler);
        self
    }

    pub fn subject_lookups(&self) -> usize {
        self.subject_lookups.load(Ordering::SeqCst)
    }
}

impl Default for MockHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubjectProvider for MockHandler {
    async fn get_subject(&self, _ctx: &RequestContext) -> Result<Option<Subject>> {
        self.subject_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.subject.clone())
    }
}

#[async_trait]
impl PermissionProvider for MockHandler {
    async fn permissions_for_role(&self, role: &str) -> Result<Vec<Permission>> {
        Ok(self.role_permissions.get(role).cloned().unwrap_or_default())
    }
}

impl ConstraintHandler for MockHandler {
    fn dynamic_handler(&self) -> Option<Arc<dyn DynamicResourceHandler>> {
        self.dynamic.clone()
    }
}

/// Notifier that records every callback for assertions
pub struct RecordingNotifier {
    pub successes: Mutex<Vec<(String, ConstraintPoint)>>,
    pub timeouts: Mutex<Vec<(String, u64)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            successes: Mutex::new(Vec::new()),
            timeouts: Mutex::new(Vec::new()),
        }
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EventNotifier for RecordingNotifier {
    fn on_success(&self, _ctx: &RequestContext, operation: &str, point: ConstraintPoint) {
        self.successes
            .lock()
            .unwrap()
            .push((operation.to_string(), point));
    }

    fn on_timeout(&self, description: &str, timeout_ms: u64) {
        self.timeouts
            .lock()
            .unwrap()
            .push((description.to_string(), timeout_ms));
    }
}
