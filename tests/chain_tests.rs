//! Constraint chain dispatcher integration tests
//!
//! Exercises the ordered-descriptor loop: combination modes, the
//! pre-check gate, and final routing for the whole chain.

mod common;

use common::{MockHandler, RecordingNotifier};
use deadlatch::{
    logic::op, CompositeCache, ConstraintChain, ConstraintHandler, ConstraintLogic,
    ConstraintMode, ConstraintNode, ConstraintPoint, ConstraintRef, ConstraintSpec,
    OutcomeFuture, PreCheckGate, RequestContext, Result, Subject,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct RedirectGate {
    redirect: Option<&'static str>,
    calls: AtomicUsize,
}

impl RedirectGate {
    fn inactive() -> Self {
        Self {
            redirect: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn redirecting(target: &'static str) -> Self {
        Self {
            redirect: Some(target),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PreCheckGate<&'static str> for RedirectGate {
    async fn before_check(
        &self,
        _handler: &dyn ConstraintHandler,
        _ctx: &RequestContext,
    ) -> Result<Option<&'static str>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.redirect)
    }
}

fn chain_with_logic(logic: Arc<ConstraintLogic>) -> ConstraintChain {
    ConstraintChain::new(logic, Arc::new(CompositeCache::new()))
}

fn chain() -> ConstraintChain {
    chain_with_logic(Arc::new(ConstraintLogic::new()))
}

fn editor_handler() -> Arc<dyn ConstraintHandler> {
    Arc::new(MockHandler::new().with_subject(Subject::new("user:bob").with_role("editor")))
}

fn spec(node: ConstraintNode) -> ConstraintSpec {
    ConstraintSpec::new(ConstraintRef::Inline(node), ConstraintPoint::Controller)
}

fn pass() -> impl FnOnce(RequestContext) -> OutcomeFuture<&'static str> + Send {
    |_ctx| Box::pin(async { Ok("granted") })
}

fn fail(
) -> impl FnOnce(RequestContext, Arc<dyn ConstraintHandler>, Option<String>) -> OutcomeFuture<&'static str>
       + Send {
    |_ctx, _handler, _content| Box::pin(async { Ok("denied") })
}

#[tokio::test]
async fn test_gate_result_is_used_verbatim() {
    common::init_tracing();
    let chain = chain();
    let ctx = RequestContext::new();
    let handler = editor_handler();
    let gate = RedirectGate::redirecting("302 /login");

    // The constraint would deny, but the gate takes priority.
    let specs = vec![spec(ConstraintNode::has_role("admin"))];

    let outcome = chain
        .apply(&ctx, &handler, Some(&gate), &specs, ConstraintMode::AndAll, pass(), fail())
        .await
        .unwrap();
    assert_eq!(outcome, "302 /login");
    assert_eq!(gate.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_gate_rechecked_per_constraint_application() {
    let chain = chain();
    let ctx = RequestContext::new();
    let handler = editor_handler();
    let gate = RedirectGate::inactive();

    let specs = vec![
        spec(ConstraintNode::subject_present()),
        spec(ConstraintNode::has_role("editor")),
        spec(ConstraintNode::subject_present()),
    ];

    let outcome = chain
        .apply(&ctx, &handler, Some(&gate), &specs, ConstraintMode::AndAll, pass(), fail())
        .await
        .unwrap();
    assert_eq!(outcome, "granted");
    // One gate check per constraint application, not one per request.
    assert_eq!(gate.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_or_first_failure_carries_last_content() {
    let chain = chain();
    let ctx = RequestContext::new();
    let handler = editor_handler();

    let specs = vec![
        spec(ConstraintNode::has_role("admin")).with_content("admins only"),
        spec(ConstraintNode::has_role("auditor")).with_content("auditors only"),
    ];

    let seen = Arc::new(Mutex::new(None));
    let seen_in_fail = seen.clone();

    let outcome = chain
        .apply(
            &ctx,
            &handler,
            None,
            &specs,
            ConstraintMode::OrFirst,
            pass(),
            move |_ctx, _handler, content| {
                Box::pin(async move {
                    *seen_in_fail.lock().unwrap() = content;
                    Ok("denied")
                })
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome, "denied");
    assert_eq!(seen.lock().unwrap().as_deref(), Some("auditors only"));
}

#[tokio::test]
async fn test_chain_pass_notifies_once_for_whole_chain() {
    let notifier = Arc::new(RecordingNotifier::new());
    let logic = Arc::new(ConstraintLogic::with_notifier(notifier.clone()));
    let chain = chain_with_logic(logic);
    let ctx = RequestContext::new();
    let handler = editor_handler();

    let specs = vec![
        ConstraintSpec::new(
            ConstraintRef::Inline(ConstraintNode::subject_present()),
            ConstraintPoint::Filter,
        ),
        ConstraintSpec::new(
            ConstraintRef::Inline(ConstraintNode::has_role("editor")),
            ConstraintPoint::Controller,
        ),
    ];

    let outcome = chain
        .apply::<&'static str, _, _>(
            &ctx,
            &handler,
            None,
            &specs,
            ConstraintMode::AndAll,
            pass(),
            fail(),
        )
        .await
        .unwrap();
    assert_eq!(outcome, "granted");

    let successes = notifier.successes.lock().unwrap();
    assert_eq!(
        *successes,
        vec![(op::CONSTRAINT_CHAIN.to_string(), ConstraintPoint::Controller)]
    );
}

#[tokio::test]
async fn test_chain_shares_one_subject_lookup() {
    let chain = chain();
    let ctx = RequestContext::new();
    let mock = Arc::new(MockHandler::new().with_subject(Subject::new("user:bob").with_role("editor")));
    let handler: Arc<dyn ConstraintHandler> = mock.clone();

    let specs = vec![
        spec(ConstraintNode::subject_present()),
        spec(ConstraintNode::has_role("editor")),
        spec(ConstraintNode::subject_present()),
    ];

    chain
        .apply::<&'static str, _, _>(
            &ctx,
            &handler,
            None,
            &specs,
            ConstraintMode::AndAll,
            pass(),
            fail(),
        )
        .await
        .unwrap();

    assert_eq!(mock.subject_lookups(), 1);
}

#[tokio::test]
async fn test_named_and_inline_specs_mix() {
    let chain = chain();
    chain.registry().register(
        "present",
        ConstraintNode::subject_present(),
    );

    let ctx = RequestContext::new();
    let handler = editor_handler();

    let specs = vec![
        ConstraintSpec::new(
            ConstraintRef::Named("present".to_string()),
            ConstraintPoint::Filter,
        ),
        spec(ConstraintNode::has_role("editor")),
    ];

    let outcome = chain
        .apply::<&'static str, _, _>(
            &ctx,
            &handler,
            None,
            &specs,
            ConstraintMode::AndAll,
            pass(),
            fail(),
        )
        .await
        .unwrap();
    assert_eq!(outcome, "granted");
}
