//! # Deadlatch
//!
//! Asynchronous authorization constraint engine: given a request context
//! and a set of declared constraints, decide whether processing may
//! continue, otherwise delegate to a failure continuation.
//!
//! ## Features
//!
//! - **Async-first design** using the Tokio runtime; every operation
//!   composes onto the subject-resolution future without blocking
//! - **Policy algebra** over subject presence, role groups (AND within,
//!   OR across, `!` negation), permission patterns (equality, regex,
//!   custom), dynamic checks, and role-derived permissions
//! - **Composite trees**: named, cacheable AND/OR/NOT compositions with
//!   left-to-right short-circuit evaluation
//! - **At-most-once subject resolution** per request, memoized in the
//!   request context, shared by every constraint on the request
//! - **Process-wide pattern cache** so equal pattern strings share one
//!   compiled regex
//! - **Bounded synchronous adapter** for call sites that need a plain
//!   boolean, denying by default on timeout
//!
//! ## Example
//!
//! ```rust
//! use deadlatch::{
//!     ConstraintHandler, ConstraintLogic, ConstraintPoint, Permission, PermissionProvider,
//!     RequestContext, Subject, SubjectProvider,
//! };
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct AppHandler;
//!
//! #[async_trait]
//! impl SubjectProvider for AppHandler {
//!     async fn get_subject(&self, _ctx: &RequestContext) -> deadlatch::Result<Option<Subject>> {
//!         Ok(Some(Subject::new("user:alice").with_role("admin")))
//!     }
//! }
//!
//! #[async_trait]
//! impl PermissionProvider for AppHandler {
//!     async fn permissions_for_role(&self, _role: &str) -> deadlatch::Result<Vec<Permission>> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! impl ConstraintHandler for AppHandler {}
//!
//! #[tokio::main]
//! async fn main() -> deadlatch::Result<()> {
//!     let logic = ConstraintLogic::new();
//!     let ctx = RequestContext::new();
//!     let handler: Arc<dyn ConstraintHandler> = Arc::new(AppHandler);
//!
//!     let response = logic
//!         .restrict(
//!             &ctx,
//!             &handler,
//!             &[vec!["admin".to_string()]],
//!             None,
//!             ConstraintPoint::Controller,
//!             |_ctx| Box::pin(async { Ok("200 OK") }),
//!             |_ctx, _handler, _content| Box::pin(async { Ok("403 Forbidden") }),
//!         )
//!         .await?;
//!
//!     assert_eq!(response, "200 OK");
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod blocking;
pub mod composite;
pub mod context;
pub mod error;
pub mod executor;
pub mod handler;
pub mod logic;
pub mod pattern;
pub mod subject;
pub mod types;

// Re-export commonly used types
pub use blocking::BlockingEvaluator;
pub use composite::{CompositeCache, ConstraintLeaf, ConstraintNode};
pub use context::RequestContext;
pub use error::{ConstraintError, Result};
pub use executor::{ConstraintChain, ConstraintRef, ConstraintSpec};
pub use handler::{
    ConstraintHandler, DynamicResourceHandler, EventNotifier, FailingDynamicHandler,
    PermissionProvider, PreCheckGate, SubjectProvider, TracingNotifier,
};
pub use logic::{ConstraintLogic, OutcomeFuture};
pub use pattern::PatternCache;
pub use subject::SubjectCache;
pub use types::{ConstraintMode, ConstraintPoint, PatternKind, Permission, Role, Subject};
