//! Lifecycle driving for the two evaluation shapes.
//!
//! There are two supported lifecycles:
//!
//! * **Fast path.** The caller constructs an [`EvaluationContext`] on the
//!   stack, calls [`check_fast`], reads the decision, and lets the context
//!   go out of scope.
//! * **Non-blocking path.** The caller boxes the context and hands it to
//!   [`NonBlockingCheck::begin`] together with a completion callback. The
//!   host event loop calls [`NonBlockingCheck::resume`] once per tick until
//!   the engine completes; the machinery then runs the callback and
//!   destroys the context itself, strictly after the callback returns. The
//!   callback receives `&mut EvaluationContext` and cannot destroy it.

use tracing::debug;

use crate::api::{Decision, EvaluationContext};
use crate::core::{Progress, RuleEvaluator};

/// Run one evaluation synchronously on a caller-owned context.
///
/// The fast path has no loop to deliver external events, so an engine that
/// reports a pending sub-decision completes as
/// [`Decision::Undetermined`].
pub fn check_fast<E: RuleEvaluator>(ctx: &mut EvaluationContext, engine: &mut E) -> Decision {
    ctx.begin_evaluation();
    let decision = match engine.resume(ctx) {
        Progress::Done(decision) => decision,
        Progress::Pending => Decision::Undetermined,
    };
    ctx.on_evaluation_complete(decision);
    decision
}

type Callback = Box<dyn FnOnce(Decision, &mut EvaluationContext)>;

/// A non-blocking evaluation in flight.
///
/// Owns the heap-resident context for the whole evaluation, across every
/// suspension. Dropping the check while a step is outstanding trips the
/// context's destruction guard.
pub struct NonBlockingCheck<E> {
    ctx: Option<Box<EvaluationContext>>,
    engine: E,
    callback: Option<Callback>,
}

impl<E: RuleEvaluator> NonBlockingCheck<E> {
    /// Take ownership of a boxed context and start evaluating.
    pub fn begin(
        mut ctx: Box<EvaluationContext>,
        engine: E,
        callback: impl FnOnce(Decision, &mut EvaluationContext) + 'static,
    ) -> Self {
        ctx.begin_evaluation();
        Self {
            ctx: Some(ctx),
            engine,
            callback: Some(Box::new(callback)),
        }
    }

    /// Advance the evaluation by one tick.
    ///
    /// Returns `false` while a sub-decision is outstanding. Returns `true`
    /// once the check has completed, at which point the callback has run
    /// and the context has been destroyed. Resuming again after that is a
    /// contract violation.
    pub fn resume(&mut self) -> bool {
        let Some(ctx) = self.ctx.as_deref_mut() else {
            crate::error::contract_violation("non-blocking check resumed after completion");
        };

        match self.engine.resume(ctx) {
            Progress::Pending => {
                ctx.set_async_in_progress(true);
                false
            }
            Progress::Done(decision) => {
                ctx.set_async_in_progress(false);
                ctx.on_evaluation_complete(decision);

                if let Some(mut ctx) = self.ctx.take() {
                    if let Some(callback) = self.callback.take() {
                        callback(decision, &mut ctx);
                    }
                    // The machinery, not the callback, destroys the context.
                    drop(ctx);
                }
                debug!(%decision, "non-blocking check complete");
                true
            }
        }
    }

    /// Whether the check has completed and its context been destroyed.
    pub fn is_done(&self) -> bool {
        self.ctx.is_none()
    }

    /// The in-flight context, for hosts that deliver external results
    /// (reverse-DNS names, helper entries) between ticks.
    pub fn context_mut(&mut self) -> Option<&mut EvaluationContext> {
        self.ctx.as_deref_mut()
    }
}

impl<E> std::fmt::Debug for NonBlockingCheck<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonBlockingCheck")
            .field("done", &self.ctx.is_none())
            .finish()
    }
}
