//! The constraint chain dispatcher
//!
//! Constraints attach to a route or handler as an explicit ordered list
//! of descriptors; a single loop interprets the list under a
//! [`ConstraintMode`] and performs one pass/fail routing for the whole
//! chain. The pre-check gate runs once per constraint application and a
//! `Some` result from it is returned verbatim, skipping evaluation.

use crate::composite::{CompositeCache, ConstraintNode};
use crate::context::RequestContext;
use crate::error::Result;
use crate::handler::{ConstraintHandler, PreCheckGate};
use crate::logic::{op, ConstraintLogic, OutcomeFuture};
use crate::types::{ConstraintMode, ConstraintPoint};
use std::sync::Arc;
use tracing::debug;

/// A constraint attached to a chain: inline tree or registry reference
#[derive(Debug, Clone)]
pub enum ConstraintRef {
    /// An inline constraint tree
    Inline(ConstraintNode),
    /// A named tree resolved through the composite registry
    Named(String),
}

/// One entry in a constraint chain
#[derive(Debug, Clone)]
pub struct ConstraintSpec {
    /// The constraint to evaluate
    pub constraint: ConstraintRef,

    /// Where this check fires, for observability
    pub point: ConstraintPoint,

    /// Free-form hint passed to failure handling
    pub content: Option<String>,
}

impl ConstraintSpec {
    /// Create a spec with no content hint
    pub fn new(constraint: ConstraintRef, point: ConstraintPoint) -> Self {
        Self {
            constraint,
            point,
            content: None,
        }
    }

    /// Attach a content hint for failure handling
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

enum Decided<R> {
    /// The pre-check gate produced a result; use it verbatim
    Gate(R),
    /// Route through the pass/fail dispatcher
    Routed {
        allowed: bool,
        point: ConstraintPoint,
        content: Option<String>,
    },
}

/// Interprets ordered constraint chains against a handler
pub struct ConstraintChain {
    logic: Arc<ConstraintLogic>,
    registry: Arc<CompositeCache>,
}

impl ConstraintChain {
    /// Create a dispatcher over the given evaluator and registry
    pub fn new(logic: Arc<ConstraintLogic>, registry: Arc<CompositeCache>) -> Self {
        Self { logic, registry }
    }

    /// The underlying evaluator
    pub fn logic(&self) -> &Arc<ConstraintLogic> {
        &self.logic
    }

    /// The composite constraint registry
    pub fn registry(&self) -> &Arc<CompositeCache> {
        &self.registry
    }

    /// Apply a constraint chain and route the combined outcome
    ///
    /// `AndAll` requires every spec to pass (an empty chain passes);
    /// `OrFirst` passes on the first passing spec (an empty chain fails);
    /// `ProcessFirstOnly` evaluates only the first spec. Evaluation is
    /// left to right with short-circuiting; a resolution or evaluation
    /// error anywhere aborts the chain and propagates.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply<R, P, F>(
        &self,
        ctx: &RequestContext,
        handler: &Arc<dyn ConstraintHandler>,
        gate: Option<&dyn PreCheckGate<R>>,
        specs: &[ConstraintSpec],
        mode: ConstraintMode,
        on_pass: P,
        on_fail: F,
    ) -> Result<R>
    where
        R: Send + 'static,
        P: FnOnce(RequestContext) -> OutcomeFuture<R> + Send,
        F: FnOnce(RequestContext, Arc<dyn ConstraintHandler>, Option<String>) -> OutcomeFuture<R>
            + Send,
    {
        match self.decide(ctx, handler, gate, specs, mode).await? {
            Decided::Gate(result) => {
                debug!(request = ctx.id(), "pre-check gate short-circuited the chain");
                Ok(result)
            }
            Decided::Routed {
                allowed,
                point,
                content,
            } => {
                self.logic
                    .route(
                        allowed,
                        op::CONSTRAINT_CHAIN,
                        ctx,
                        handler,
                        content.as_deref(),
                        point,
                        on_pass,
                        on_fail,
                    )
                    .await
            }
        }
    }

    async fn decide<R>(
        &self,
        ctx: &RequestContext,
        handler: &Arc<dyn ConstraintHandler>,
        gate: Option<&dyn PreCheckGate<R>>,
        specs: &[ConstraintSpec],
        mode: ConstraintMode,
    ) -> Result<Decided<R>>
    where
        R: Send + 'static,
    {
        if specs.is_empty() {
            if let Some(result) = self.gate_check(gate, handler, ctx).await? {
                return Ok(Decided::Gate(result));
            }
            // Nothing declared: AndAll and ProcessFirstOnly are vacuously
            // satisfied, OrFirst has no disjunct to match.
            return Ok(Decided::Routed {
                allowed: mode != ConstraintMode::OrFirst,
                point: ConstraintPoint::Controller,
                content: None,
            });
        }

        match mode {
            ConstraintMode::ProcessFirstOnly => {
                let spec = &specs[0];
                if let Some(result) = self.gate_check(gate, handler, ctx).await? {
                    return Ok(Decided::Gate(result));
                }
                let allowed = self.test_spec(ctx, handler.as_ref(), spec).await?;
                Ok(Decided::Routed {
                    allowed,
                    point: spec.point,
                    content: spec.content.clone(),
                })
            }
            ConstraintMode::AndAll => {
                let mut point = specs[0].point;
                for spec in specs {
                    if let Some(result) = self.gate_check(gate, handler, ctx).await? {
                        return Ok(Decided::Gate(result));
                    }
                    if !self.test_spec(ctx, handler.as_ref(), spec).await? {
                        return Ok(Decided::Routed {
                            allowed: false,
                            point: spec.point,
                            content: spec.content.clone(),
                        });
                    }
                    point = spec.point;
                }
                Ok(Decided::Routed {
                    allowed: true,
                    point,
                    content: None,
                })
            }
            ConstraintMode::OrFirst => {
                let mut point = specs[0].point;
                let mut content = specs[0].content.clone();
                for spec in specs {
                    if let Some(result) = self.gate_check(gate, handler, ctx).await? {
                        return Ok(Decided::Gate(result));
                    }
                    if self.test_spec(ctx, handler.as_ref(), spec).await? {
                        return Ok(Decided::Routed {
                            allowed: true,
                            point: spec.point,
                            content: None,
                        });
                    }
                    point = spec.point;
                    content = spec.content.clone();
                }
                Ok(Decided::Routed {
                    allowed: false,
                    point,
                    content,
                })
            }
        }
    }

    async fn gate_check<R>(
        &self,
        gate: Option<&dyn PreCheckGate<R>>,
        handler: &Arc<dyn ConstraintHandler>,
        ctx: &RequestContext,
    ) -> Result<Option<R>>
    where
        R: Send + 'static,
    {
        match gate {
            Some(gate) => gate.before_check(handler.as_ref(), ctx).await,
            None => Ok(None),
        }
    }

    async fn test_spec(
        &self,
        ctx: &RequestContext,
        handler: &dyn ConstraintHandler,
        spec: &ConstraintSpec,
    ) -> Result<bool> {
        match &spec.constraint {
            ConstraintRef::Inline(node) => node.evaluate(&self.logic, ctx, handler).await,
            ConstraintRef::Named(name) => {
                let node = self.registry.resolve_required(name)?;
                node.evaluate(&self.logic, ctx, handler).await
            }
        }
    }
}
