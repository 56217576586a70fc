//! The constraint evaluation core
//!
//! [`ConstraintLogic`] exposes two layers over the same policy algebra:
//!
//! - a boolean layer (`test_*`) that resolves the subject through the
//!   request-scoped cache and answers plain `Result<bool>` — this is what
//!   the composite tree and the dispatcher consume;
//! - a routing layer (the operation methods) that takes on-pass/on-fail
//!   continuations and funnels every outcome through one dispatcher,
//!   firing the success notification before the on-pass continuation.
//!
//! Every operation composes onto the subject-resolution future and never
//! blocks the calling thread. Upstream failures propagate untouched; the
//! evaluator performs no retries.

use crate::analyzer;
use crate::context::RequestContext;
use crate::error::Result;
use crate::handler::{
    ConstraintHandler, DynamicResourceHandler, EventNotifier, FailingDynamicHandler,
    TracingNotifier,
};
use crate::pattern::PatternCache;
use crate::types::{ConstraintPoint, PatternKind};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// The asynchronous result type produced by continuations
pub type OutcomeFuture<R> = BoxFuture<'static, Result<R>>;

/// Operation names carried on success notifications
pub mod op {
    pub const SUBJECT_PRESENT: &str = "subject_present";
    pub const SUBJECT_NOT_PRESENT: &str = "subject_not_present";
    pub const RESTRICT: &str = "restrict";
    pub const PATTERN: &str = "pattern";
    pub const DYNAMIC: &str = "dynamic";
    pub const ROLE_BASED_PERMISSIONS: &str = "role_based_permissions";
    pub const CONSTRAINT_CHAIN: &str = "constraint_chain";
}

/// The policy algebra evaluator
pub struct ConstraintLogic {
    pattern_cache: Arc<PatternCache>,
    notifier: Arc<dyn EventNotifier>,
}

impl ConstraintLogic {
    /// Create an evaluator with a fresh pattern cache and tracing notifier
    pub fn new() -> Self {
        Self::with_notifier(Arc::new(TracingNotifier))
    }

    /// Create an evaluator with a custom notifier
    pub fn with_notifier(notifier: Arc<dyn EventNotifier>) -> Self {
        Self {
            pattern_cache: Arc::new(PatternCache::new()),
            notifier,
        }
    }

    /// The shared pattern cache
    pub fn pattern_cache(&self) -> &Arc<PatternCache> {
        &self.pattern_cache
    }

    /// The notifier receiving success/timeout events
    pub fn notifier(&self) -> &Arc<dyn EventNotifier> {
        &self.notifier
    }

    // ------------------------------------------------------------------
    // Boolean layer
    // ------------------------------------------------------------------

    /// Whether a subject is present on the request
    pub async fn test_subject_present(
        &self,
        ctx: &RequestContext,
        handler: &dyn ConstraintHandler,
    ) -> Result<bool> {
        Ok(ctx.current_subject(handler).await?.is_some())
    }

    /// The role-group restriction: OR across groups, AND (with `!`
    /// negation) within a group; no subject fails unconditionally
    pub async fn test_restrict(
        &self,
        ctx: &RequestContext,
        handler: &dyn ConstraintHandler,
        role_groups: &[Vec<String>],
    ) -> Result<bool> {
        let subject = ctx.current_subject(handler).await?;
        Ok(analyzer::check_role_groups(subject.as_ref(), role_groups))
    }

    /// The pattern constraint, dispatching on [`PatternKind`]
    ///
    /// For `Equality` and `Regex`, an absent subject denies regardless of
    /// `invert`: the bare result before inversion is `false`, and the
    /// inversion is only applied when a subject was resolved. `Custom`
    /// delegates entirely to the dynamic handler, which decides the
    /// no-subject case itself; its answer is then inverted as requested.
    pub async fn test_pattern(
        &self,
        ctx: &RequestContext,
        handler: &dyn ConstraintHandler,
        value: &str,
        kind: PatternKind,
        meta: Option<&str>,
        invert: bool,
    ) -> Result<bool> {
        let allowed = match kind {
            PatternKind::Equality => {
                let subject = ctx.current_subject(handler).await?;
                match subject {
                    None => false,
                    Some(subject) => {
                        invert ^ analyzer::check_pattern_equality(Some(&subject), value)
                    }
                }
            }
            PatternKind::Regex => {
                let pattern = self.pattern_cache.compile(value)?;
                let subject = ctx.current_subject(handler).await?;
                match subject {
                    None => false,
                    Some(subject) => {
                        invert ^ analyzer::check_regex_pattern(Some(&subject), &pattern)
                    }
                }
            }
            PatternKind::Custom => {
                let matched = self
                    .dynamic_handler_for(handler)
                    .check_permission(value, meta, handler, ctx)
                    .await?;
                invert ^ matched
            }
        };

        debug!(request = ctx.id(), value, ?kind, invert, allowed, "pattern tested");
        Ok(allowed)
    }

    /// A named dynamic constraint, delegated to the registered handler
    ///
    /// No subject lookup happens here; the handler owns the decision. A
    /// handler that was never registered fails with
    /// [`MissingDynamicHandler`](crate::ConstraintError::MissingDynamicHandler).
    pub async fn test_dynamic(
        &self,
        ctx: &RequestContext,
        handler: &dyn ConstraintHandler,
        name: &str,
        meta: Option<&str>,
    ) -> Result<bool> {
        self.dynamic_handler_for(handler)
            .is_allowed(name, meta, handler, ctx)
            .await
    }

    /// Whether the subject holds a permission matching any permission
    /// granted by the named role
    ///
    /// The role's permission values are treated as patterns and compiled
    /// through the shared cache. No subject fails.
    pub async fn test_role_permissions(
        &self,
        ctx: &RequestContext,
        handler: &dyn ConstraintHandler,
        role: &str,
    ) -> Result<bool> {
        let Some(subject) = ctx.current_subject(handler).await? else {
            return Ok(false);
        };

        let granted = handler.permissions_for_role(role).await?;
        for permission in &granted {
            let pattern = self.pattern_cache.compile(&permission.value)?;
            if analyzer::check_regex_pattern(Some(&subject), &pattern) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn dynamic_handler_for(
        &self,
        handler: &dyn ConstraintHandler,
    ) -> Arc<dyn DynamicResourceHandler> {
        handler
            .dynamic_handler()
            .unwrap_or_else(|| Arc::new(FailingDynamicHandler))
    }

    // ------------------------------------------------------------------
    // Routing layer
    // ------------------------------------------------------------------

    /// Route to on-pass iff a subject is present
    pub async fn subject_present<R, P, F>(
        &self,
        ctx: &RequestContext,
        handler: &Arc<dyn ConstraintHandler>,
        content: Option<&str>,
        point: ConstraintPoint,
        on_pass: P,
        on_fail: F,
    ) -> Result<R>
    where
        R: Send + 'static,
        P: FnOnce(RequestContext) -> OutcomeFuture<R> + Send,
        F: FnOnce(RequestContext, Arc<dyn ConstraintHandler>, Option<String>) -> OutcomeFuture<R>
            + Send,
    {
        let allowed = self.test_subject_present(ctx, handler.as_ref()).await?;
        self.route(allowed, op::SUBJECT_PRESENT, ctx, handler, content, point, on_pass, on_fail)
            .await
    }

    /// Route to on-pass iff no subject is present
    pub async fn subject_not_present<R, P, F>(
        &self,
        ctx: &RequestContext,
        handler: &Arc<dyn ConstraintHandler>,
        content: Option<&str>,
        point: ConstraintPoint,
        on_pass: P,
        on_fail: F,
    ) -> Result<R>
    where
        R: Send + 'static,
        P: FnOnce(RequestContext) -> OutcomeFuture<R> + Send,
        F: FnOnce(RequestContext, Arc<dyn ConstraintHandler>, Option<String>) -> OutcomeFuture<R>
            + Send,
    {
        let allowed = !self.test_subject_present(ctx, handler.as_ref()).await?;
        self.route(
            allowed,
            op::SUBJECT_NOT_PRESENT,
            ctx,
            handler,
            content,
            point,
            on_pass,
            on_fail,
        )
        .await
    }

    /// The role-group restriction with continuation routing
    pub async fn restrict<R, P, F>(
        &self,
        ctx: &RequestContext,
        handler: &Arc<dyn ConstraintHandler>,
        role_groups: &[Vec<String>],
        content: Option<&str>,
        point: ConstraintPoint,
        on_pass: P,
        on_fail: F,
    ) -> Result<R>
    where
        R: Send + 'static,
        P: FnOnce(RequestContext) -> OutcomeFuture<R> + Send,
        F: FnOnce(RequestContext, Arc<dyn ConstraintHandler>, Option<String>) -> OutcomeFuture<R>
            + Send,
    {
        let allowed = self
            .test_restrict(ctx, handler.as_ref(), role_groups)
            .await?;
        self.route(allowed, op::RESTRICT, ctx, handler, content, point, on_pass, on_fail)
            .await
    }

    /// The pattern constraint with continuation routing
    #[allow(clippy::too_many_arguments)]
    pub async fn pattern<R, P, F>(
        &self,
        ctx: &RequestContext,
        handler: &Arc<dyn ConstraintHandler>,
        value: &str,
        kind: PatternKind,
        meta: Option<&str>,
        invert: bool,
        content: Option<&str>,
        point: ConstraintPoint,
        on_pass: P,
        on_fail: F,
    ) -> Result<R>
    where
        R: Send + 'static,
        P: FnOnce(RequestContext) -> OutcomeFuture<R> + Send,
        F: FnOnce(RequestContext, Arc<dyn ConstraintHandler>, Option<String>) -> OutcomeFuture<R>
            + Send,
    {
        let allowed = self
            .test_pattern(ctx, handler.as_ref(), value, kind, meta, invert)
            .await?;
        self.route(allowed, op::PATTERN, ctx, handler, content, point, on_pass, on_fail)
            .await
    }

    /// A named dynamic constraint with continuation routing
    pub async fn dynamic<R, P, F>(
        &self,
        ctx: &RequestContext,
        handler: &Arc<dyn ConstraintHandler>,
        name: &str,
        meta: Option<&str>,
        content: Option<&str>,
        point: ConstraintPoint,
        on_pass: P,
        on_fail: F,
    ) -> Result<R>
    where
        R: Send + 'static,
        P: FnOnce(RequestContext) -> OutcomeFuture<R> + Send,
        F: FnOnce(RequestContext, Arc<dyn ConstraintHandler>, Option<String>) -> OutcomeFuture<R>
            + Send,
    {
        let allowed = self
            .test_dynamic(ctx, handler.as_ref(), name, meta)
            .await?;
        self.route(allowed, op::DYNAMIC, ctx, handler, content, point, on_pass, on_fail)
            .await
    }

    /// The role-derived-permission constraint with continuation routing
    pub async fn role_based_permissions<R, P, F>(
        &self,
        ctx: &RequestContext,
        handler: &Arc<dyn ConstraintHandler>,
        role: &str,
        content: Option<&str>,
        point: ConstraintPoint,
        on_pass: P,
        on_fail: F,
    ) -> Result<R>
    where
        R: Send + 'static,
        P: FnOnce(RequestContext) -> OutcomeFuture<R> + Send,
        F: FnOnce(RequestContext, Arc<dyn ConstraintHandler>, Option<String>) -> OutcomeFuture<R>
            + Send,
    {
        let allowed = self
            .test_role_permissions(ctx, handler.as_ref(), role)
            .await?;
        self.route(
            allowed,
            op::ROLE_BASED_PERMISSIONS,
            ctx,
            handler,
            content,
            point,
            on_pass,
            on_fail,
        )
        .await
    }

    /// The single pass/fail dispatcher every operation funnels through
    ///
    /// Pass fires the success notification before the on-pass
    /// continuation; fail hands the handler and content hint to the
    /// on-fail continuation.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn route<R, P, F>(
        &self,
        allowed: bool,
        operation: &'static str,
        ctx: &RequestContext,
        handler: &Arc<dyn ConstraintHandler>,
        content: Option<&str>,
        point: ConstraintPoint,
        on_pass: P,
        on_fail: F,
    ) -> Result<R>
    where
        R: Send + 'static,
        P: FnOnce(RequestContext) -> OutcomeFuture<R> + Send,
        F: FnOnce(RequestContext, Arc<dyn ConstraintHandler>, Option<String>) -> OutcomeFuture<R>
            + Send,
    {
        if allowed {
            self.notifier.on_success(ctx, operation, point);
            on_pass(ctx.clone()).await
        } else {
            debug!(request = ctx.id(), operation, %point, "constraint denied");
            on_fail(
                ctx.clone(),
                Arc::clone(handler),
                content.map(str::to_string),
            )
            .await
        }
    }
}

impl Default for ConstraintLogic {
    fn default() -> Self {
        Self::new()
    }
}
