//! External collaborator interfaces
//!
//! The engine consumes these capabilities; it implements none of them
//! except the failing default dynamic handler and the tracing notifier.
//! Adapters (HTTP filters, template glue) supply real implementations.

use crate::context::RequestContext;
use crate::error::{ConstraintError, Result};
use crate::types::{ConstraintPoint, Permission, Subject};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves the subject of a request
#[async_trait]
pub trait SubjectProvider: Send + Sync {
    /// Look up the current subject, or `None` for an anonymous request
    ///
    /// Invoked at most once per request by the engine; results are
    /// memoized in the [`RequestContext`](crate::RequestContext).
    async fn get_subject(&self, ctx: &RequestContext) -> Result<Option<Subject>>;
}

/// Maps role names to the permissions they grant
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// The permissions associated with a role name
    ///
    /// The returned values are treated as patterns and matched against the
    /// subject's held permissions.
    async fn permissions_for_role(&self, role: &str) -> Result<Vec<Permission>>;
}

/// The resolved handler a constraint evaluation runs against
///
/// Bundles subject and permission lookup with an optional dynamic
/// resource handler. When no dynamic handler is supplied, dynamic and
/// custom-pattern constraints fail loudly through
/// [`FailingDynamicHandler`] rather than silently denying or allowing.
pub trait ConstraintHandler: SubjectProvider + PermissionProvider {
    /// The dynamic resource handler for custom checks, if any
    fn dynamic_handler(&self) -> Option<Arc<dyn DynamicResourceHandler>> {
        None
    }
}

/// Caller-supplied dynamic checks for named constraints and custom patterns
#[async_trait]
pub trait DynamicResourceHandler: Send + Sync {
    /// Decide a named dynamic constraint
    async fn is_allowed(
        &self,
        name: &str,
        meta: Option<&str>,
        handler: &dyn ConstraintHandler,
        ctx: &RequestContext,
    ) -> Result<bool>;

    /// Decide a custom pattern constraint for a permission value
    async fn check_permission(
        &self,
        value: &str,
        meta: Option<&str>,
        handler: &dyn ConstraintHandler,
        ctx: &RequestContext,
    ) -> Result<bool>;
}

/// Default dynamic handler substituted when none is registered
///
/// Both operations fail with
/// [`ConstraintError::MissingDynamicHandler`] naming the constraint, so a
/// misconfigured deployment surfaces at evaluation time.
pub struct FailingDynamicHandler;

#[async_trait]
impl DynamicResourceHandler for FailingDynamicHandler {
    async fn is_allowed(
        &self,
        name: &str,
        _meta: Option<&str>,
        _handler: &dyn ConstraintHandler,
        _ctx: &RequestContext,
    ) -> Result<bool> {
        Err(ConstraintError::MissingDynamicHandler(name.to_string()))
    }

    async fn check_permission(
        &self,
        value: &str,
        _meta: Option<&str>,
        _handler: &dyn ConstraintHandler,
        _ctx: &RequestContext,
    ) -> Result<bool> {
        Err(ConstraintError::MissingDynamicHandler(value.to_string()))
    }
}

/// Optional "before evaluation" short-circuit gate
///
/// If `before_check` yields a result, it is used verbatim and constraint
/// evaluation is skipped for that constraint application. Models global
/// early exits such as an authentication redirect. Re-checked for each
/// constraint application, not once per request.
#[async_trait]
pub trait PreCheckGate<R>: Send + Sync {
    /// Return `Some` to bypass constraint evaluation entirely
    async fn before_check(
        &self,
        handler: &dyn ConstraintHandler,
        ctx: &RequestContext,
    ) -> Result<Option<R>>;
}

/// Observability callbacks fired by the engine
///
/// Purely informational; nothing returned here affects any boolean
/// outcome.
pub trait EventNotifier: Send + Sync {
    /// A constraint passed; `operation` names the check that fired
    fn on_success(&self, _ctx: &RequestContext, _operation: &str, _point: ConstraintPoint) {}

    /// A bounded synchronous evaluation timed out and was denied
    fn on_timeout(&self, _description: &str, _timeout_ms: u64) {}
}

/// Default notifier that reports through `tracing`
pub struct TracingNotifier;

impl EventNotifier for TracingNotifier {
    fn on_success(&self, ctx: &RequestContext, operation: &str, point: ConstraintPoint) {
        debug!(request = ctx.id(), operation, %point, "constraint passed");
    }

    fn on_timeout(&self, description: &str, timeout_ms: u64) {
        warn!(description, timeout_ms, "synchronous evaluation timed out");
    }
}
