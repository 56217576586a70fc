//! Request-scoped subject resolution cache

use crate::context::RequestContext;
use crate::error::Result;
use crate::handler::ConstraintHandler;
use crate::types::Subject;
use tokio::sync::Mutex;
use tracing::debug;

/// Write-once memoization of a request's subject resolution
///
/// One cache lives inside each [`RequestContext`]. The slot distinguishes
/// "not yet resolved" from "resolved to no subject", so an anonymous
/// request is also looked up only once. The lock is held across the
/// upstream await, which serializes concurrent resolution attempts on the
/// same request: whichever check arrives first performs the single
/// upstream call and the rest read the cached value.
#[derive(Debug)]
pub struct SubjectCache {
    slot: Mutex<Option<Option<Subject>>>,
}

impl SubjectCache {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Resolve the subject, consulting the upstream provider at most once
    ///
    /// An upstream failure propagates without poisoning the slot, so a
    /// later call for the same request can retry.
    pub(crate) async fn resolve(
        &self,
        handler: &dyn ConstraintHandler,
        ctx: &RequestContext,
    ) -> Result<Option<Subject>> {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            return Ok(cached.clone());
        }

        let subject = handler.get_subject(ctx).await?;
        debug!(
            request = ctx.id(),
            present = subject.is_some(),
            "subject resolved"
        );
        *slot = Some(subject.clone());

        Ok(subject)
    }

    /// Discard any memoized value and resolve the subject again
    pub(crate) async fn resolve_fresh(
        &self,
        handler: &dyn ConstraintHandler,
        ctx: &RequestContext,
    ) -> Result<Option<Subject>> {
        let mut slot = self.slot.lock().await;

        let subject = handler.get_subject(ctx).await?;
        debug!(
            request = ctx.id(),
            present = subject.is_some(),
            "subject re-resolved"
        );
        *slot = Some(subject.clone());

        Ok(subject)
    }
}
