//! Rule evaluator: the engine boundary and its default implementation.

use tracing::{debug, trace};

use crate::api::{Decision, EvaluationContext};
use crate::policy::{Condition, RuleAction};

/// Progress of one engine tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Evaluation reached a verdict.
    Done(Decision),
    /// A sub-decision is outstanding; the host will resume later.
    Pending,
}

/// The rule-evaluation engine boundary.
///
/// The lifecycle drivers call [`resume`](Self::resume) once per tick. An
/// implementation walks its rules against the context and either reaches a
/// verdict or reports that it is waiting on an external collaborator. It
/// must tolerate the context's weak references dying between ticks.
pub trait RuleEvaluator {
    /// Advance evaluation by one tick.
    fn resume(&mut self, ctx: &mut EvaluationContext) -> Progress;
}

/// First-match-wins evaluator over the context's rule set.
///
/// The rule set is re-resolved through its handle on every tick; if its
/// owner destroyed it mid-evaluation, the check completes as undetermined.
/// A cursor survives suspensions so evaluation restarts at the pending
/// condition, not from the top.
#[derive(Debug, Default)]
pub struct Evaluator {
    rule_idx: usize,
    cond_idx: usize,
}

/// Outcome of consulting one condition.
enum CondOutcome {
    Matched,
    NotMatched,
    Pending,
}

impl Evaluator {
    /// Create an evaluator positioned at the first rule.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleEvaluator for Evaluator {
    fn resume(&mut self, ctx: &mut EvaluationContext) -> Progress {
        let rule_set = ctx.rule_set().clone();
        let Some(rules) = rule_set.get() else {
            debug!("rule set destroyed mid-evaluation");
            return Progress::Done(Decision::Undetermined);
        };

        while let Some(rule) = rules.rules.get(self.rule_idx) {
            let mut matched = true;
            while let Some(condition) = rule.conditions.get(self.cond_idx) {
                match eval_condition(condition, ctx) {
                    CondOutcome::Pending => {
                        trace!(rule = %rule.name, "condition pending, suspending");
                        return Progress::Pending;
                    }
                    CondOutcome::NotMatched => {
                        matched = false;
                        break;
                    }
                    CondOutcome::Matched => self.cond_idx += 1,
                }
            }

            if matched {
                trace!(rule = %rule.name, action = ?rule.action, "rule matched");
                return Progress::Done(rule.action.into());
            }

            self.rule_idx += 1;
            self.cond_idx = 0;
        }

        // Nothing matched: the verdict is the opposite of the last rule's
        // action, or undetermined for an empty set.
        let decision = match rules.rules.last().map(|r| r.action) {
            Some(RuleAction::Allow) => Decision::Deny,
            Some(RuleAction::Deny) => Decision::Allow,
            None => Decision::Undetermined,
        };
        Progress::Done(decision)
    }
}

fn eval_condition(condition: &Condition, ctx: &mut EvaluationContext) -> CondOutcome {
    match condition {
        Condition::SrcIp(addr) => match ctx.src_addr() {
            Some(src) if src == *addr => CondOutcome::Matched,
            _ => CondOutcome::NotMatched,
        },
        Condition::DstDomain(pattern) => {
            let Some(host) = ctx.request().map(|r| r.host.clone()) else {
                return CondOutcome::NotMatched;
            };
            if !ctx.is_destination_domain_checked() {
                ctx.mark_destination_domain_checked();
            }
            bool_outcome(domain_matches(&host, pattern))
        }
        Condition::DstDomainRegex(pattern) => {
            let Some(host) = ctx.request().map(|r| r.host.clone()) else {
                return CondOutcome::NotMatched;
            };
            if !ctx.is_destination_domain_checked() {
                ctx.mark_destination_domain_checked();
            }
            match regex::Regex::new(pattern) {
                Ok(re) => bool_outcome(re.is_match(&host)),
                Err(e) => {
                    // Validation rejects these at load time; a stray bad
                    // pattern is not applicable rather than fatal.
                    debug!(%pattern, error = %e, "unparseable domain regex");
                    CondOutcome::NotMatched
                }
            }
        }
        Condition::SrcDomain(pattern) => match ctx.reverse_dns().map(str::to_owned) {
            // The host performs the reverse lookup and resumes us.
            None => CondOutcome::Pending,
            Some(name) => {
                if !ctx.is_source_domain_checked() {
                    ctx.mark_source_domain_checked();
                }
                bool_outcome(domain_matches(&name, pattern))
            }
        },
        Condition::Ident(user) => bool_outcome(ctx.identity().as_str() == user),
        Condition::ExternalHelper => match ctx.helper_entry() {
            // The host runs the helper lookup and attaches the entry.
            None => CondOutcome::Pending,
            Some(handle) => match handle.get() {
                Some(entry) => bool_outcome(entry.matched),
                // Entry evicted mid-suspension: not applicable.
                None => CondOutcome::NotMatched,
            },
        },
    }
}

fn bool_outcome(matched: bool) -> CondOutcome {
    if matched {
        CondOutcome::Matched
    } else {
        CondOutcome::NotMatched
    }
}

/// Domain matching: a leading dot matches the domain and its subdomains,
/// anything else matches exactly. Case-insensitive.
fn domain_matches(host: &str, pattern: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();
    if let Some(bare) = pattern.strip_prefix('.') {
        host == bare || host.ends_with(&pattern)
    } else {
        host == pattern
    }
}
