//! # Proxy Policy Engine
//!
//! Lifetime-safe access-control evaluation core for a forwarding proxy.
//! The centerpiece is the per-request [`EvaluationContext`]: it carries
//! everything rule evaluation needs to decide allow/deny for one request,
//! and stays safe across the suspension points of a non-blocking check even
//! while the objects it refers to (the client connection, an
//! authentication request, the rule set itself, an external-helper entry)
//! are destroyed out from under it.
//!
//! ## Features
//!
//! - **Invalidate-on-destroy handles**: references to externally owned
//!   objects resolve to `None` after their owner dies, never to freed
//!   memory
//! - **Two lifecycle shapes**: a synchronous stack-owned fast path, and a
//!   non-blocking path where the machinery owns the heap context and
//!   destroys it exactly once, after the completion callback returns
//! - **Contract enforcement**: one-shot guards (connection attachment,
//!   domain-check marking, completion) terminate the request path on
//!   caller bugs instead of corrupting state
//! - **Rule sets as data**: YAML/JSON documents with validation, walked
//!   first-match-wins by a resumable evaluator
//!
//! ## Quick Start
//!
//! ```rust
//! use proxy_policy_engine::{
//!     check_fast, Config, Decision, EvaluationContext, Evaluator, Owned, Rule, RuleAction,
//!     RuleSet,
//! };
//!
//! let rules = Owned::new(
//!     RuleSet::new("http_access").with_rule(Rule::new("deny-all", RuleAction::Deny)),
//! );
//!
//! let config = Config::default();
//! let mut ctx = EvaluationContext::new(rules.handle(), None, None, &config);
//! let decision = check_fast(&mut ctx, &mut Evaluator::new());
//! assert_eq!(decision, Decision::Deny);
//! ```
//!
//! ## Concurrency model
//!
//! Execution is single-threaded cooperative: "asynchronous" means an
//! evaluation suspends across iterations of the host's event loop while an
//! external collaborator works, never that a thread blocks or that data is
//! shared between threads. The crate uses no locks and no atomics.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod handle;
pub mod integration;
pub mod msg;
pub mod policy;

// Re-export main types for convenience
pub use api::{CheckState, Decision, EvaluationContext, Ident, IDENT_MAX_LEN};
pub use config::Config;
pub use core::{check_fast, Evaluator, NonBlockingCheck, Progress, RuleEvaluator};
pub use error::{Error, Result};
pub use handle::{Handle, Owned};
pub use msg::{HttpReply, HttpRequest, MsgLock};
pub use policy::{Condition, Rule, RuleAction, RuleSet, RuleSetDocument};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
