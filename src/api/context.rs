//! The per-request evaluation context.
//!
//! One [`EvaluationContext`] carries everything rule evaluation needs to
//! decide allow/deny for a single request, and stays valid across the
//! suspension points of a non-blocking check. The objects it refers to
//! (connection, authentication request, rule set, helper entry) are owned
//! elsewhere and may die while the evaluation is suspended; the context
//! reaches all of them through [`Handle`]s and re-resolves on every use, so
//! a death is observed as `None` rather than a dangling reference. The two
//! HTTP messages are held through reference-count locks released exactly
//! once, at destruction.

use std::fmt;
use std::net::IpAddr;
use std::rc::Rc;

use tracing::debug;

use crate::api::Decision;
use crate::config::Config;
use crate::error::contract;
use crate::handle::Handle;
use crate::integration::{AuthRequest, Connection, HelperEntry, Peer};
use crate::msg::{HttpReply, HttpRequest, MsgLock};
use crate::policy::RuleSet;

/// Maximum stored identity length in bytes. Longer identities are silently
/// truncated on a character boundary.
pub const IDENT_MAX_LEN: usize = 64;

/// Bounded identity string, as carried by short identity-protocol fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ident(String);

impl Ident {
    /// Store an identity, truncating silently at [`IDENT_MAX_LEN`] bytes.
    pub fn new(raw: &str) -> Self {
        let mut end = raw.len().min(IDENT_MAX_LEN);
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        Ident(raw[..end].to_string())
    }

    /// The stored identity.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether no identity was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// Constructed, evaluation not yet started.
    Fresh,
    /// The engine is walking the rule set, possibly across suspensions.
    Evaluating,
    /// Completed; terminal. No evaluation-relevant mutation is permitted.
    Finished,
}

/// Everything rule evaluation needs to decide one request.
///
/// Two lifecycle shapes exist, distinguished by ownership:
///
/// * stack-owned, for [`check_fast`](crate::core::check_fast): the caller
///   constructs the context with [`EvaluationContext::new`], evaluates, and
///   lets it go out of scope;
/// * engine-owned, for [`NonBlockingCheck`](crate::core::NonBlockingCheck):
///   the caller boxes the context with [`EvaluationContext::new_boxed`] and
///   hands it over together with a completion callback. The machinery alone
///   destroys the context, strictly after the callback returns; the
///   callback receives `&mut` and cannot.
#[derive(Debug)]
pub struct EvaluationContext {
    src_addr: Option<IpAddr>,
    dst_addr: Option<IpAddr>,
    local_addr: Option<IpAddr>,
    identity: Ident,
    request: Option<MsgLock<HttpRequest>>,
    reply: Option<MsgLock<HttpReply>>,
    auth_request: Option<Handle<AuthRequest>>,
    connection: Option<Handle<Connection>>,
    fd_override: i32,
    rule_set: Handle<RuleSet>,
    helper_entry: Option<Handle<HelperEntry>>,
    dst_domain_checked: bool,
    src_domain_checked: bool,
    reverse_dns: Option<String>,
    dst_peer: Option<Rc<Peer>>,
    state: CheckState,
    async_in_progress: bool,
    result: Option<Decision>,
}

impl EvaluationContext {
    /// Construct a context for the synchronous, stack-owned shape.
    ///
    /// Acquires the rule-set handle; locks the request when one is given and
    /// copies its addresses, preferring the indirect client address when the
    /// configuration says so; stores the identity truncated to
    /// [`IDENT_MAX_LEN`].
    pub fn new(
        rule_set: Handle<RuleSet>,
        request: Option<&Rc<HttpRequest>>,
        ident: Option<&str>,
        config: &Config,
    ) -> Self {
        let request = request.map(MsgLock::acquire);

        let mut src_addr = None;
        let mut local_addr = None;
        if let Some(req) = &request {
            src_addr = if config.use_indirect_client {
                req.indirect_client_addr.or(Some(req.client_addr))
            } else {
                Some(req.client_addr)
            };
            local_addr = req.local_addr;
        }

        Self {
            src_addr,
            dst_addr: None,
            local_addr,
            identity: ident.map(Ident::new).unwrap_or_default(),
            request,
            reply: None,
            auth_request: None,
            connection: None,
            fd_override: -1,
            rule_set,
            helper_entry: None,
            dst_domain_checked: false,
            src_domain_checked: false,
            reverse_dns: None,
            dst_peer: None,
            state: CheckState::Fresh,
            async_in_progress: false,
            result: None,
        }
    }

    /// Construct a context for the asynchronous, engine-owned shape.
    ///
    /// Field population is identical to [`EvaluationContext::new`]; the
    /// caller hands the box to
    /// [`NonBlockingCheck::begin`](crate::core::NonBlockingCheck::begin) and
    /// must not touch it afterwards except through the completion callback's
    /// arguments.
    pub fn new_boxed(
        rule_set: Handle<RuleSet>,
        request: Option<&Rc<HttpRequest>>,
        ident: Option<&str>,
        config: &Config,
    ) -> Box<Self> {
        Box::new(Self::new(rule_set, request, ident, config))
    }

    /// Source address of the request, per the indirect-client policy.
    pub fn src_addr(&self) -> Option<IpAddr> {
        self.src_addr
    }

    /// Resolved destination address, once the engine has one.
    pub fn dst_addr(&self) -> Option<IpAddr> {
        self.dst_addr
    }

    /// Record the resolved destination address.
    pub fn set_dst_addr(&mut self, addr: IpAddr) {
        self.dst_addr = Some(addr);
    }

    /// Local address the request arrived on.
    pub fn local_addr(&self) -> Option<IpAddr> {
        self.local_addr
    }

    /// Identity supplied at construction, possibly truncated.
    pub fn identity(&self) -> &Ident {
        &self.identity
    }

    /// The locked request message, when one was supplied.
    pub fn request(&self) -> Option<&MsgLock<HttpRequest>> {
        self.request.as_ref()
    }

    /// The locked reply message, when the engine has attached one.
    pub fn reply(&self) -> Option<&MsgLock<HttpReply>> {
        self.reply.as_ref()
    }

    /// Lock a reply for this evaluation. A previously attached reply lock
    /// is released immediately, keeping at most one lock held.
    pub fn set_reply(&mut self, reply: &Rc<HttpReply>) {
        self.reply = Some(MsgLock::acquire(reply));
    }

    /// The pending authentication request, if one is attached.
    pub fn auth_request(&self) -> Option<&Handle<AuthRequest>> {
        self.auth_request.as_ref()
    }

    /// Attach the pending authentication request.
    pub fn set_auth_request(&mut self, auth: Handle<AuthRequest>) {
        self.auth_request = Some(auth);
    }

    /// The owning connection, when one was attached and is still alive.
    pub fn connection(&self) -> Option<&Handle<Connection>> {
        self.connection.as_ref().filter(|h| h.is_live())
    }

    /// Attach the owning connection. Settable at most once; a second call
    /// is a contract violation.
    pub fn set_connection(&mut self, conn: Handle<Connection>) {
        contract!(
            self.connection.is_none(),
            "connection may be attached at most once"
        );
        self.connection = Some(conn);
    }

    /// Socket descriptor for this evaluation: the connection's live
    /// descriptor when the connection resolves and exposes one, otherwise
    /// the explicit override (`-1` when neither exists).
    pub fn descriptor(&self) -> i32 {
        self.connection
            .as_ref()
            .and_then(|h| h.get())
            .and_then(|c| c.descriptor)
            .unwrap_or(self.fd_override)
    }

    /// Set the descriptor override, used when no connection is attached.
    /// Disagreeing with a resolvable connection descriptor is a contract
    /// violation.
    pub fn set_descriptor(&mut self, fd: i32) {
        if let Some(live) = self
            .connection
            .as_ref()
            .and_then(|h| h.get())
            .and_then(|c| c.descriptor)
        {
            contract!(
                live == fd,
                "descriptor {fd} disagrees with connection descriptor {live}"
            );
        }
        self.fd_override = fd;
    }

    /// Handle on the rule set under evaluation. May be dead if the owner
    /// reconfigured it away; callers re-resolve on every use.
    pub fn rule_set(&self) -> &Handle<RuleSet> {
        &self.rule_set
    }

    /// The external-helper entry, once a lookup has completed.
    pub fn helper_entry(&self) -> Option<&Handle<HelperEntry>> {
        self.helper_entry.as_ref()
    }

    /// Attach a completed external-helper lookup entry.
    pub fn set_helper_entry(&mut self, entry: Handle<HelperEntry>) {
        self.helper_entry = Some(entry);
    }

    /// Whether the destination domain has been checked.
    pub fn is_destination_domain_checked(&self) -> bool {
        self.dst_domain_checked
    }

    /// Record that the destination domain has been checked. One-shot:
    /// calling after evaluation finished, or a second time, is a contract
    /// violation.
    pub fn mark_destination_domain_checked(&mut self) {
        contract!(
            !self.finished(),
            "destination domain marked after evaluation finished"
        );
        contract!(!self.dst_domain_checked, "destination domain marked twice");
        self.dst_domain_checked = true;
    }

    /// Whether the source domain has been checked.
    pub fn is_source_domain_checked(&self) -> bool {
        self.src_domain_checked
    }

    /// Record that the source domain has been checked. One-shot, like
    /// [`mark_destination_domain_checked`](Self::mark_destination_domain_checked).
    pub fn mark_source_domain_checked(&mut self) {
        contract!(
            !self.finished(),
            "source domain marked after evaluation finished"
        );
        contract!(!self.src_domain_checked, "source domain marked twice");
        self.src_domain_checked = true;
    }

    /// Reverse-DNS name of the client, once the host has supplied it.
    pub fn reverse_dns(&self) -> Option<&str> {
        self.reverse_dns.as_deref()
    }

    /// Supply the client's reverse-DNS name.
    pub fn set_reverse_dns(&mut self, name: impl Into<String>) {
        self.reverse_dns = Some(name.into());
    }

    /// Upstream peer selected by evaluation, if any.
    pub fn destination_peer(&self) -> Option<&Rc<Peer>> {
        self.dst_peer.as_ref()
    }

    /// Record the upstream peer selected by evaluation.
    pub fn set_destination_peer(&mut self, peer: Rc<Peer>) {
        self.dst_peer = Some(peer);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CheckState {
        self.state
    }

    /// Whether evaluation has completed.
    pub fn finished(&self) -> bool {
        self.state == CheckState::Finished
    }

    /// Whether an asynchronous step is outstanding. While this holds, the
    /// context must stay alive and heap-resident.
    pub fn async_in_progress(&self) -> bool {
        self.async_in_progress
    }

    /// The recorded decision, present once evaluation has completed.
    pub fn result(&self) -> Option<Decision> {
        self.result
    }

    pub(crate) fn begin_evaluation(&mut self) {
        contract!(
            self.state == CheckState::Fresh,
            "evaluation started on a used context"
        );
        self.state = CheckState::Evaluating;
    }

    pub(crate) fn set_async_in_progress(&mut self, outstanding: bool) {
        self.async_in_progress = outstanding;
    }

    /// Complete the evaluation with the engine's decision. Invoked exactly
    /// once; a second call is a contract violation.
    ///
    /// A reconfiguration can leave authentication call sequences unfinished
    /// while this evaluation is suspended, so the authentication reference
    /// is dropped here, on this context and, when the connection still
    /// resolves, on its mirrored field too.
    pub fn on_evaluation_complete(&mut self, decision: Decision) {
        contract!(
            self.state != CheckState::Finished,
            "evaluation completed twice"
        );
        debug!(%decision, "evaluation complete");

        if self.auth_request.take().is_some() {
            if let Some(mut conn) = self.connection.as_ref().and_then(|h| h.get_mut()) {
                conn.auth = None;
            }
        }

        self.state = CheckState::Finished;
        self.result = Some(decision);
    }
}

impl Drop for EvaluationContext {
    fn drop(&mut self) {
        contract!(
            !self.async_in_progress,
            "context destroyed while an asynchronous step is outstanding"
        );
        // Message locks, weak handles, and the reverse-DNS name all release
        // here through their own drops.
        debug!("evaluation context destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Owned;
    use crate::policy::RuleSet;

    fn rule_set() -> Owned<RuleSet> {
        Owned::new(RuleSet::new("http_access"))
    }

    fn request() -> Rc<HttpRequest> {
        Rc::new(
            HttpRequest::new("GET", "example.com", "10.0.0.5".parse().unwrap())
                .with_indirect_client("203.0.113.9".parse().unwrap())
                .with_local_addr("192.0.2.1".parse().unwrap()),
        )
    }

    #[test]
    fn test_addresses_from_request_direct() {
        let rules = rule_set();
        let req = request();
        let ctx = EvaluationContext::new(rules.handle(), Some(&req), None, &Config::default());
        assert_eq!(ctx.src_addr(), Some("10.0.0.5".parse().unwrap()));
        assert_eq!(ctx.local_addr(), Some("192.0.2.1".parse().unwrap()));
        assert_eq!(ctx.dst_addr(), None);
    }

    #[test]
    fn test_addresses_prefer_indirect_client_when_configured() {
        let rules = rule_set();
        let req = request();
        let config = Config {
            use_indirect_client: true,
        };
        let ctx = EvaluationContext::new(rules.handle(), Some(&req), None, &config);
        assert_eq!(ctx.src_addr(), Some("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn test_indirect_policy_falls_back_to_direct() {
        let rules = rule_set();
        let req = Rc::new(HttpRequest::new(
            "GET",
            "example.com",
            "10.0.0.5".parse().unwrap(),
        ));
        let config = Config {
            use_indirect_client: true,
        };
        let ctx = EvaluationContext::new(rules.handle(), Some(&req), None, &config);
        assert_eq!(ctx.src_addr(), Some("10.0.0.5".parse().unwrap()));
    }

    #[test]
    fn test_construction_without_request() {
        let rules = rule_set();
        let ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());
        assert_eq!(ctx.src_addr(), None);
        assert!(ctx.request().is_none());
        assert!(ctx.identity().is_empty());
        assert_eq!(ctx.state(), CheckState::Fresh);
    }

    #[test]
    fn test_ident_truncation_silent() {
        let rules = rule_set();
        let long = "x".repeat(IDENT_MAX_LEN + 30);
        let ctx =
            EvaluationContext::new(rules.handle(), None, Some(&long), &Config::default());
        assert_eq!(ctx.identity().as_str().len(), IDENT_MAX_LEN);
    }

    #[test]
    fn test_ident_truncation_respects_char_boundary() {
        // 63 ASCII bytes followed by a multi-byte char straddling the limit.
        let raw = format!("{}é", "x".repeat(IDENT_MAX_LEN - 1));
        let ident = Ident::new(&raw);
        assert_eq!(ident.as_str().len(), IDENT_MAX_LEN - 1);
    }

    #[test]
    fn test_connection_null_until_set() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());
        assert!(ctx.connection().is_none());

        let conn = Owned::new(Connection::new(9));
        ctx.set_connection(conn.handle());
        assert!(ctx.connection().is_some());
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn test_second_set_connection_fails() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());
        let conn = Owned::new(Connection::new(9));
        ctx.set_connection(conn.handle());
        ctx.set_connection(conn.handle());
    }

    #[test]
    fn test_connection_null_after_invalidation() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());
        let conn = Owned::new(Connection::new(9));
        ctx.set_connection(conn.handle());
        conn.invalidate();
        assert!(ctx.connection().is_none());
    }

    #[test]
    fn test_descriptor_prefers_live_connection() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());
        assert_eq!(ctx.descriptor(), -1);

        ctx.set_descriptor(7);
        assert_eq!(ctx.descriptor(), 7);

        let conn = Owned::new(Connection::new(12));
        ctx.set_connection(conn.handle());
        assert_eq!(ctx.descriptor(), 12);

        // Connection gone: back to the override.
        conn.invalidate();
        assert_eq!(ctx.descriptor(), 7);
    }

    #[test]
    fn test_descriptor_override_agreeing_with_connection() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());
        let conn = Owned::new(Connection::new(12));
        ctx.set_connection(conn.handle());
        ctx.set_descriptor(12);
        assert_eq!(ctx.descriptor(), 12);
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn test_descriptor_mismatch_fails() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());
        let conn = Owned::new(Connection::new(12));
        ctx.set_connection(conn.handle());
        ctx.set_descriptor(13);
    }

    #[test]
    fn test_domain_check_flags_one_shot() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());
        assert!(!ctx.is_destination_domain_checked());
        assert!(!ctx.is_source_domain_checked());

        ctx.mark_destination_domain_checked();
        ctx.mark_source_domain_checked();
        assert!(ctx.is_destination_domain_checked());
        assert!(ctx.is_source_domain_checked());
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn test_double_destination_mark_fails() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());
        ctx.mark_destination_domain_checked();
        ctx.mark_destination_domain_checked();
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn test_source_mark_after_finish_fails() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());
        ctx.on_evaluation_complete(Decision::Deny);
        ctx.mark_source_domain_checked();
    }

    #[test]
    fn test_completion_clears_auth_on_context_and_connection() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());

        let auth = Owned::new(AuthRequest::with_username("alice"));
        let conn = Owned::new(Connection::new(4));
        conn.handle().get_mut().unwrap().auth = Some(auth.handle());

        ctx.set_connection(conn.handle());
        ctx.set_auth_request(auth.handle());

        ctx.on_evaluation_complete(Decision::Allow);

        assert!(ctx.auth_request().is_none());
        assert!(conn.handle().get().unwrap().auth.is_none());
        assert_eq!(ctx.result(), Some(Decision::Allow));
        assert!(ctx.finished());
    }

    #[test]
    fn test_completion_with_dead_connection_is_safe() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());

        let auth = Owned::new(AuthRequest::default());
        let conn = Owned::new(Connection::new(4));
        ctx.set_connection(conn.handle());
        ctx.set_auth_request(auth.handle());

        conn.invalidate();
        ctx.on_evaluation_complete(Decision::Deny);
        assert!(ctx.auth_request().is_none());
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn test_double_completion_fails() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());
        ctx.on_evaluation_complete(Decision::Allow);
        ctx.on_evaluation_complete(Decision::Allow);
    }

    #[test]
    fn test_message_locks_released_at_destruction() {
        let rules = rule_set();
        let req = request();
        let reply = Rc::new(HttpReply::new(403));
        {
            let mut ctx =
                EvaluationContext::new(rules.handle(), Some(&req), None, &Config::default());
            ctx.set_reply(&reply);
            assert_eq!(Rc::strong_count(&req), 2);
            assert_eq!(Rc::strong_count(&reply), 2);
        }
        assert_eq!(Rc::strong_count(&req), 1);
        assert_eq!(Rc::strong_count(&reply), 1);
    }

    #[test]
    fn test_repeated_lifecycles_never_double_release() {
        let rules = rule_set();
        let req = request();
        for _ in 0..3 {
            let ctx =
                EvaluationContext::new(rules.handle(), Some(&req), None, &Config::default());
            assert_eq!(Rc::strong_count(&req), 2);
            drop(ctx);
            assert_eq!(Rc::strong_count(&req), 1);
        }
    }

    #[test]
    fn test_evaluation_result_fields() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());

        ctx.set_dst_addr("198.51.100.80".parse().unwrap());
        assert_eq!(ctx.dst_addr(), Some("198.51.100.80".parse().unwrap()));

        let peer = Rc::new(Peer::new("cache-1"));
        ctx.set_destination_peer(Rc::clone(&peer));
        assert_eq!(ctx.destination_peer(), Some(&peer));

        ctx.set_reverse_dns("client.campus.example");
        assert_eq!(ctx.reverse_dns(), Some("client.campus.example"));
    }

    #[test]
    fn test_reply_replacement_keeps_one_lock() {
        let rules = rule_set();
        let mut ctx = EvaluationContext::new(rules.handle(), None, None, &Config::default());
        let first = Rc::new(HttpReply::new(200));
        let second = Rc::new(HttpReply::new(502));
        ctx.set_reply(&first);
        ctx.set_reply(&second);
        assert_eq!(Rc::strong_count(&first), 1);
        assert_eq!(Rc::strong_count(&second), 2);
        assert_eq!(ctx.reply().unwrap().status, 502);
    }
}
