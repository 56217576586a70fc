//! Composite constraint trees and their named registry
//!
//! A tree combines evaluator operations with AND/OR/NOT into one named,
//! cacheable constraint. Trees evaluate to a plain boolean; the caller of
//! `resolve` + `evaluate` performs the final pass/fail routing once for
//! the whole tree.

use crate::context::RequestContext;
use crate::error::{ConstraintError, Result};
use crate::handler::ConstraintHandler;
use crate::logic::ConstraintLogic;
use crate::types::PatternKind;
use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A single evaluator operation at a tree leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintLeaf {
    /// Passes iff a subject is present
    SubjectPresent,
    /// Passes iff no subject is present
    SubjectNotPresent,
    /// The role-group restriction
    Restrict {
        /// OR across groups, AND within a group, `!` negates
        role_groups: Vec<Vec<String>>,
    },
    /// A permission pattern test
    Pattern {
        value: String,
        kind: PatternKind,
        #[serde(default)]
        meta: Option<String>,
        #[serde(default)]
        invert: bool,
    },
    /// A named dynamic constraint
    Dynamic {
        name: String,
        #[serde(default)]
        meta: Option<String>,
    },
    /// Passes iff the subject holds a permission granted by the role
    RolePermissions { role: String },
}

/// An immutable boolean tree of constraints
///
/// Children evaluate left to right; `And` short-circuits on the first
/// `false`, `Or` on the first `true`. An empty `And` is `true` and an
/// empty `Or` is `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintNode {
    /// A single evaluator operation
    Leaf(ConstraintLeaf),
    /// All children must pass
    And(Vec<ConstraintNode>),
    /// At least one child must pass
    Or(Vec<ConstraintNode>),
    /// Logical negation of the child
    Not(Box<ConstraintNode>),
}

impl ConstraintNode {
    /// Leaf: subject must be present
    pub fn subject_present() -> Self {
        ConstraintNode::Leaf(ConstraintLeaf::SubjectPresent)
    }

    /// Leaf: subject must be absent
    pub fn subject_not_present() -> Self {
        ConstraintNode::Leaf(ConstraintLeaf::SubjectNotPresent)
    }

    /// Leaf: role-group restriction
    pub fn restrict(role_groups: Vec<Vec<String>>) -> Self {
        ConstraintNode::Leaf(ConstraintLeaf::Restrict { role_groups })
    }

    /// Leaf: restriction on a single role
    pub fn has_role(name: impl Into<String>) -> Self {
        Self::restrict(vec![vec![name.into()]])
    }

    /// Leaf: permission pattern test
    pub fn pattern(value: impl Into<String>, kind: PatternKind, invert: bool) -> Self {
        ConstraintNode::Leaf(ConstraintLeaf::Pattern {
            value: value.into(),
            kind,
            meta: None,
            invert,
        })
    }

    /// Leaf: named dynamic constraint
    pub fn dynamic(name: impl Into<String>) -> Self {
        ConstraintNode::Leaf(ConstraintLeaf::Dynamic {
            name: name.into(),
            meta: None,
        })
    }

    /// Leaf: role-derived permission test
    pub fn role_permissions(role: impl Into<String>) -> Self {
        ConstraintNode::Leaf(ConstraintLeaf::RolePermissions { role: role.into() })
    }

    /// Negate a node
    pub fn negate(self) -> Self {
        ConstraintNode::Not(Box::new(self))
    }

    /// Evaluate the tree to a boolean, short-circuiting left to right
    pub fn evaluate<'a>(
        &'a self,
        logic: &'a ConstraintLogic,
        ctx: &'a RequestContext,
        handler: &'a dyn ConstraintHandler,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            match self {
                ConstraintNode::Leaf(leaf) => leaf.test(logic, ctx, handler).await,
                ConstraintNode::And(children) => {
                    for child in children {
                        if !child.evaluate(logic, ctx, handler).await? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                ConstraintNode::Or(children) => {
                    for child in children {
                        if child.evaluate(logic, ctx, handler).await? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                ConstraintNode::Not(child) => {
                    Ok(!child.evaluate(logic, ctx, handler).await?)
                }
            }
        })
    }
}

impl ConstraintLeaf {
    async fn test(
        &self,
        logic: &ConstraintLogic,
        ctx: &RequestContext,
        handler: &dyn ConstraintHandler,
    ) -> Result<bool> {
        match self {
            ConstraintLeaf::SubjectPresent => logic.test_subject_present(ctx, handler).await,
            ConstraintLeaf::SubjectNotPresent => {
                Ok(!logic.test_subject_present(ctx, handler).await?)
            }
            ConstraintLeaf::Restrict { role_groups } => {
                logic.test_restrict(ctx, handler, role_groups).await
            }
            ConstraintLeaf::Pattern {
                value,
                kind,
                meta,
                invert,
            } => {
                logic
                    .test_pattern(ctx, handler, value, *kind, meta.as_deref(), *invert)
                    .await
            }
            ConstraintLeaf::Dynamic { name, meta } => {
                logic.test_dynamic(ctx, handler, name, meta.as_deref()).await
            }
            ConstraintLeaf::RolePermissions { role } => {
                logic.test_role_permissions(ctx, handler, role).await
            }
        }
    }
}

/// Process-wide registry of named composite constraints
///
/// Populated at startup; concurrent reads are always safe and
/// registration overwrites any previous tree under the same name.
#[derive(Debug, Default)]
pub struct CompositeCache {
    nodes: DashMap<String, Arc<ConstraintNode>>,
}

impl CompositeCache {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
        }
    }

    /// Register a tree under a name, overwriting any previous registration
    pub fn register(&self, name: impl Into<String>, node: ConstraintNode) {
        let name = name.into();
        debug!(constraint = name.as_str(), "registered composite constraint");
        self.nodes.insert(name, Arc::new(node));
    }

    /// Look up a registered tree
    pub fn resolve(&self, name: &str) -> Option<Arc<ConstraintNode>> {
        self.nodes.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a registered tree, failing with
    /// [`ConstraintError::UnknownConstraint`] when absent
    pub fn resolve_required(&self, name: &str) -> Result<Arc<ConstraintNode>> {
        self.resolve(name)
            .ok_or_else(|| ConstraintError::UnknownConstraint(name.to_string()))
    }

    /// Names of all registered constraints
    pub fn names(&self) -> Vec<String> {
        self.nodes.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered constraints
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
