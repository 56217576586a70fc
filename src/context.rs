//! Per-request evaluation context
//!
//! The context is an explicit, immutable value threaded through every
//! constraint check on a request. Attributes are fixed at construction;
//! the only interior state is the write-once subject slot, which exists so
//! that every constraint on the request observes the same resolved subject.

use crate::error::Result;
use crate::handler::ConstraintHandler;
use crate::subject::SubjectCache;
use crate::types::Subject;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Immutable per-request context
///
/// Cheap to clone (`Arc`-backed) and safe to move into continuation
/// futures. A context must never be shared across requests: the subject
/// slot inside it is scoped to exactly one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    /// Unique request identifier
    id: String,

    /// Free-form request attributes (route parameters, headers, etc.)
    attributes: HashMap<String, Value>,

    /// Write-once memoized subject resolution
    subject: SubjectCache,
}

impl RequestContext {
    /// Create a new context with no attributes
    pub fn new() -> Self {
        Self::with_attributes(HashMap::new())
    }

    /// Create a new context with the given request attributes
    pub fn with_attributes(attributes: HashMap<String, Value>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id: Uuid::new_v4().to_string(),
                attributes,
                subject: SubjectCache::new(),
            }),
        }
    }

    /// The unique request identifier
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Look up a request attribute
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.inner.attributes.get(key)
    }

    /// Resolve the current subject, memoized for the request
    ///
    /// The first call invokes the handler's subject lookup; every later
    /// call (including concurrent ones) returns the cached result, so the
    /// upstream provider is consulted at most once per request. A lookup
    /// failure is not cached and a later call will retry.
    pub async fn current_subject(
        &self,
        handler: &dyn ConstraintHandler,
    ) -> Result<Option<Subject>> {
        self.inner.subject.resolve(handler, self).await
    }

    /// Drop the memoized subject and resolve it again
    pub async fn fresh_subject(
        &self,
        handler: &dyn ConstraintHandler,
    ) -> Result<Option<Subject>> {
        self.inner.subject.resolve_fresh(handler, self).await
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
