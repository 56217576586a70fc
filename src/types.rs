//! Core policy model types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named role held by a subject
///
/// Roles compare by name only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    /// Role name (e.g., "admin", "editor")
    pub name: String,
}

impl Role {
    /// Create a new role
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A permission value held by a subject
///
/// Permissions are compared by exact match or by regular-expression match
/// against a declared pattern string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Permission value (e.g., "printers.edit")
    pub value: String,
}

impl Permission {
    /// Create a new permission
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// The subject of an inbound request (user, service account, agent)
///
/// Supplied by an external identity provider per request and never mutated
/// by the engine. Role and permission order is irrelevant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject identifier (e.g., "user:alice@example.com")
    pub identifier: String,

    /// Roles held by the subject
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Permissions held by the subject
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Subject {
    /// Create a new subject with no roles or permissions
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    /// Add a role to the subject
    pub fn with_role(mut self, name: impl Into<String>) -> Self {
        self.roles.push(Role::new(name));
        self
    }

    /// Add a permission to the subject
    pub fn with_permission(mut self, value: impl Into<String>) -> Self {
        self.permissions.push(Permission::new(value));
        self
    }
}

/// Where a constraint check fired
///
/// Carried through purely for observability; it has no effect on the
/// boolean outcome of any constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintPoint {
    /// A controller/action-level check
    Controller,
    /// A request-filter check
    Filter,
    /// A template-rendering check
    Template,
    /// A model-layer check
    Model,
}

impl fmt::Display for ConstraintPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintPoint::Controller => "controller",
            ConstraintPoint::Filter => "filter",
            ConstraintPoint::Template => "template",
            ConstraintPoint::Model => "model",
        };
        write!(f, "{}", name)
    }
}

/// How multiple constraints attached to one call chain combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintMode {
    /// Every constraint in the chain must pass
    AndAll,
    /// The first passing constraint wins; all must fail for denial
    OrFirst,
    /// Only the first constraint in the chain is evaluated
    ProcessFirstOnly,
}

/// How a pattern constraint tests a subject's permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternKind {
    /// Exact string equality against a held permission value
    Equality,
    /// Full-string regular-expression match against held permission values
    Regex,
    /// Delegated to the registered dynamic resource handler
    Custom,
}
