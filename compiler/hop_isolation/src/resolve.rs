//! Static isolation resolution.
//!
//! One tagging pass per function: the function and every closure literal
//! nested in its body get exactly one [`IsolationDomain`] (a
//! [`ResolvedScope`]), and every call gets a [`CallSite`] with both
//! domains expressed in the caller's frame plus its [`HopPlan`].
//!
//! # Frame mapping
//!
//! A callee's domain is declared in the callee's own frame. At a call:
//!
//! - `ActorInstance(self)` of a method becomes the receiver's identity
//! - `IsolatedParameter(i)` becomes the identity of argument `i`
//! - a closure's `ActorInstance(capture k)` becomes the identity of
//!   whatever the closure captured as `k`
//!
//! Identity is syntactic: a parameter, `self`, a capture, a local, or the
//! expression producing a temporary. Locally constructed actors are not
//! special-cased; their identity differs from any caller domain.
//!
//! # Errors
//!
//! Problems are collected per function. Any error aborts lowering of that
//! function; nothing is partially lowered.

use hop_diagnostic::{Diagnostic, ErrorCode};
use hop_ir::{Span, StringInterner};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::body::{Body, Call, Callee, ClosureDef, ClosureId, ExprId, ExprKind, Stmt};
use crate::decl::{DeclTable, FuncDecl, IsolationAttr};
use crate::domain::{ActorValue, IsolationDomain, TypeRef};
use crate::ir::CallSiteId;
use crate::plan::{plan_call, plan_entry, CallSite, HopPlan};

// ── Output ──────────────────────────────────────────────────────────

/// Scope index within a [`ScopeTable`]; the function itself is scope 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a closure capture's value comes from when the closure is formed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CaptureSource {
    /// An explicit capture: an expression of the enclosing body.
    Expr(ExprId),
    /// The enclosing actor value, captured so the closure can
    /// re-establish isolation.
    Actor(ActorValue),
    /// The executor current at formation (`getCurrentExecutor`).
    CurrentExecutor,
}

/// What a scope hops to on entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntryTarget {
    Domain(IsolationDomain),
    /// The executor captured at formation, held in capture `k`.
    CapturedExecutor(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCall {
    pub site: CallSite,
    pub plan: HopPlan,
    /// `None` for `()`.
    pub result: Option<TypeRef>,
}

/// A function or closure tagged with its isolation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedScope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub domain: IsolationDomain,
    pub is_async: bool,
    pub throws: bool,
    /// Whole-scope entry hop, if any.
    pub entry: Option<EntryTarget>,
    /// Final capture list, explicit captures first (closures only).
    pub captures: Vec<CaptureSource>,
    pub closures: FxHashMap<ClosureId, ScopeId>,
    pub calls: FxHashMap<ExprId, ResolvedCall>,
}

/// Resolution result for one function and its closures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeTable {
    scopes: Vec<ResolvedScope>,
}

impl ScopeTable {
    #[inline]
    pub fn scope(&self, id: ScopeId) -> &ResolvedScope {
        &self.scopes[id.index()]
    }

    pub fn root(&self) -> &ResolvedScope {
        self.scope(ScopeId::ROOT)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedScope> {
        self.scopes.iter()
    }
}

// ── Declared isolation ──────────────────────────────────────────────

/// A function's domain by precedence, without validation: isolated
/// parameter, global actor, `nonisolated`, actor method, unspecified.
///
/// An isolated parameter overrides `nonisolated`, which only removes
/// `self` isolation.
pub fn declared_domain(func: &FuncDecl) -> IsolationDomain {
    if let Some(index) = func.params.iter().position(|p| p.isolated) {
        return IsolationDomain::IsolatedParameter(param_index(index));
    }
    let mut nonisolated = false;
    for (attr, _) in &func.attrs {
        match attr {
            IsolationAttr::GlobalActor(ty) => return IsolationDomain::GlobalActor(ty.clone()),
            IsolationAttr::Nonisolated => nonisolated = true,
        }
    }
    if nonisolated {
        IsolationDomain::Nonisolated
    } else if func.receiver.is_some() {
        IsolationDomain::ActorInstance(ActorValue::SelfValue)
    } else {
        IsolationDomain::Unspecified
    }
}

/// A function's own domain, validating its attributes.
pub fn function_domain(
    decls: &DeclTable,
    interner: &StringInterner,
    func: &FuncDecl,
) -> Result<IsolationDomain, Vec<Diagnostic>> {
    let mut errors = Vec::new();
    let fn_name = interner.lookup(func.name);

    let isolated: Vec<_> = func.params.iter().filter(|p| p.isolated).collect();
    if isolated.len() > 1 {
        errors.push(
            Diagnostic::error(ErrorCode::E4002)
                .with_message(format!(
                    "`{fn_name}` has {} isolated parameters",
                    isolated.len()
                ))
                .with_label(func.span, "declared here")
                .with_suggestion("keep `isolated` on a single parameter"),
        );
    }
    for param in &isolated {
        if !decls.is_actor(&param.ty) {
            errors.push(
                Diagnostic::error(ErrorCode::E4003)
                    .with_message(format!(
                        "isolated parameter `{}` has non-actor type `{}`",
                        interner.lookup(param.name),
                        param.ty.display(interner)
                    ))
                    .with_label(func.span, "in this declaration"),
            );
        }
    }

    let mut global: Option<(&TypeRef, Span)> = None;
    let mut nonisolated: Option<Span> = None;
    for (attr, span) in &func.attrs {
        match attr {
            IsolationAttr::GlobalActor(ty) => {
                if decls.global_actor(ty.name).is_none() {
                    errors.push(unknown_global_actor(interner, ty, *span));
                }
                if let Some((first, first_span)) = global {
                    errors.push(
                        Diagnostic::error(ErrorCode::E4001)
                            .with_message(format!(
                                "`{fn_name}` is isolated to both `{}` and `{}`",
                                first.display(interner),
                                ty.display(interner)
                            ))
                            .with_label(*span, "second global actor")
                            .with_secondary_label(first_span, "first global actor"),
                    );
                } else {
                    global = Some((ty, *span));
                }
            }
            IsolationAttr::Nonisolated => nonisolated = Some(*span),
        }
    }

    if let Some((ty, span)) = global {
        if !isolated.is_empty() {
            errors.push(
                Diagnostic::error(ErrorCode::E4001)
                    .with_message(format!(
                        "`{fn_name}` has an isolated parameter and a global actor `{}`",
                        ty.display(interner)
                    ))
                    .with_label(span, "global actor attribute"),
            );
        }
        if let Some(non_span) = nonisolated {
            errors.push(
                Diagnostic::error(ErrorCode::E4001)
                    .with_message(format!("`{fn_name}` is both nonisolated and global-actor isolated"))
                    .with_label(span, "global actor attribute")
                    .with_secondary_label(non_span, "`nonisolated` here"),
            );
        }
    }

    if errors.is_empty() {
        Ok(declared_domain(func))
    } else {
        Err(errors)
    }
}

fn unknown_global_actor(interner: &StringInterner, ty: &TypeRef, span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E4004)
        .with_message(format!("unknown global actor `{}`", ty.display(interner)))
        .with_label(span, "not a declared global actor")
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "parameter and scope counts never exceed u32"
)]
fn param_index(index: usize) -> u32 {
    index as u32
}

// ── Identities ──────────────────────────────────────────────────────

/// Runtime identity of the value produced by `expr`.
pub fn value_identity(body: &Body, expr: ExprId) -> ActorValue {
    match body.expr(expr).kind {
        ExprKind::SelfRef => ActorValue::SelfValue,
        ExprKind::Param(i) => ActorValue::Param(i),
        ExprKind::Capture(k) => ActorValue::Capture(k),
        ExprKind::Local(local) => ActorValue::Local(local),
        _ => ActorValue::Temp(expr),
    }
}

/// Express a callee's declared domain in the caller's frame.
///
/// Returns `None` when the identity the domain refers to is not available
/// at the call (missing receiver or argument).
pub fn map_into_caller(
    domain: &IsolationDomain,
    receiver: Option<ActorValue>,
    args: &[ActorValue],
) -> Option<IsolationDomain> {
    let mapped = match domain {
        IsolationDomain::ActorInstance(ActorValue::SelfValue) => receiver,
        IsolationDomain::ActorInstance(ActorValue::Param(i))
        | IsolationDomain::IsolatedParameter(i) => args.get(*i as usize).copied(),
        IsolationDomain::ActorInstance(_) => None,
        other => return Some(other.clone()),
    };
    mapped.map(IsolationDomain::ActorInstance)
}

/// Whether an expression is known to produce an actor value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ValueKind {
    Actor,
    NotActor,
    Unknown,
}

// ── Resolver ────────────────────────────────────────────────────────

/// Per-body walk state.
struct BodyWalk<'b> {
    body: &'b Body,
    scope: ScopeId,
    has_self: bool,
    /// Closure literals passed to inherit-actor-context parameters.
    inheriting: FxHashSet<ExprId>,
    params: Vec<ValueKind>,
    captures: Vec<ValueKind>,
    locals: FxHashMap<u32, ValueKind>,
    /// Locals bound to owned values (constructions, call results).
    owned_locals: FxHashSet<u32>,
}

struct Resolver<'a> {
    decls: &'a DeclTable,
    interner: &'a StringInterner,
    scopes: Vec<ResolvedScope>,
    errors: Vec<Diagnostic>,
    next_site: u32,
}

/// Resolve `func` and every closure in `body`.
pub fn resolve_function(
    decls: &DeclTable,
    interner: &StringInterner,
    func: &FuncDecl,
    body: &Body,
) -> Result<ScopeTable, Vec<Diagnostic>> {
    let domain = function_domain(decls, interner, func)?;
    let entry = plan_entry(&domain, func.is_async).map(EntryTarget::Domain);

    let mut resolver = Resolver {
        decls,
        interner,
        scopes: Vec::new(),
        errors: Vec::new(),
        next_site: 0,
    };
    resolver.scopes.push(ResolvedScope {
        id: ScopeId::ROOT,
        parent: None,
        domain,
        is_async: func.is_async,
        throws: func.throws,
        entry,
        captures: Vec::new(),
        closures: FxHashMap::default(),
        calls: FxHashMap::default(),
    });
    let params = func
        .params
        .iter()
        .map(|p| resolver.kind_of_type(Some(&p.ty)))
        .collect();
    resolver.walk_body(body, ScopeId::ROOT, func.receiver.is_some(), params, Vec::new());

    tracing::debug!(
        function = interner.lookup(func.name),
        scopes = resolver.scopes.len(),
        sites = resolver.next_site,
        errors = resolver.errors.len(),
        "resolved isolation"
    );

    if resolver.errors.is_empty() {
        Ok(ScopeTable {
            scopes: resolver.scopes,
        })
    } else {
        Err(resolver.errors)
    }
}

impl Resolver<'_> {
    fn walk_body(
        &mut self,
        body: &Body,
        scope: ScopeId,
        has_self: bool,
        params: Vec<ValueKind>,
        captures: Vec<ValueKind>,
    ) {
        let mut walk = BodyWalk {
            body,
            scope,
            has_self,
            inheriting: FxHashSet::default(),
            params,
            captures,
            locals: FxHashMap::default(),
            owned_locals: FxHashSet::default(),
        };
        for stmt in body.stmts() {
            match *stmt {
                Stmt::Let { local, value } => {
                    self.visit_expr(&mut walk, value);
                    let kind = self.value_kind(&walk, value);
                    walk.locals.insert(local.raw(), kind);
                    if matches!(
                        body.expr(value).kind,
                        ExprKind::Construct { .. } | ExprKind::Call(_) | ExprKind::Closure(_)
                    ) {
                        walk.owned_locals.insert(local.raw());
                    }
                }
                Stmt::Expr(expr) | Stmt::Return(Some(expr)) => self.visit_expr(&mut walk, expr),
                Stmt::Return(None) => {}
            }
        }
    }

    fn visit_expr(&mut self, walk: &mut BodyWalk<'_>, expr: ExprId) {
        let body = walk.body;
        let node = body.expr(expr);
        match &node.kind {
            ExprKind::Int(_) | ExprKind::Param(_) | ExprKind::Local(_) | ExprKind::Capture(_) => {}
            ExprKind::SelfRef => {
                if !walk.has_self {
                    self.errors.push(
                        Diagnostic::error(ErrorCode::E4007)
                            .with_message("`self` used outside an actor method")
                            .with_label(node.span, "no actor receiver in scope"),
                    );
                }
            }
            ExprKind::Construct { args, .. } => {
                for &arg in args {
                    self.visit_expr(walk, arg);
                }
            }
            ExprKind::ToAsync {
                value,
                global_actor,
                ..
            } => {
                self.visit_expr(walk, *value);
                if self.decls.global_actor(global_actor.name).is_none() {
                    self.errors
                        .push(unknown_global_actor(self.interner, global_actor, node.span));
                }
            }
            ExprKind::Closure(id) => {
                let inherits_context = walk.inheriting.contains(&expr);
                self.resolve_closure(walk, *id, inherits_context);
            }
            ExprKind::Call(call) => {
                if let Some(receiver) = call.receiver {
                    self.visit_expr(walk, receiver);
                }
                if let Callee::Direct(name) = call.callee {
                    if let Some(decl) = self.decls.function(name) {
                        for (arg, param) in call.args.iter().zip(&decl.params) {
                            if param.inherits_actor_context
                                && matches!(body.expr(*arg).kind, ExprKind::Closure(_))
                            {
                                walk.inheriting.insert(*arg);
                            }
                        }
                    }
                }
                for &arg in &call.args {
                    self.visit_expr(walk, arg);
                }
                if let Callee::Value { func, .. } = &call.callee {
                    self.visit_expr(walk, *func);
                }
                self.resolve_call(walk, expr, call, node.span);
            }
        }
    }

    // ── Calls ───────────────────────────────────────────────────

    fn resolve_call(&mut self, walk: &BodyWalk<'_>, expr: ExprId, call: &Call, span: Span) {
        let receiver = call.receiver.map(|r| value_identity(walk.body, r));
        let args: Vec<ActorValue> = call
            .args
            .iter()
            .map(|&a| value_identity(walk.body, a))
            .collect();

        let (callee, is_async, throws, result) = match &call.callee {
            Callee::Direct(name) => {
                let Some(decl) = self.decls.function(*name) else {
                    self.errors.push(
                        Diagnostic::error(ErrorCode::E4006)
                            .with_message(format!(
                                "call to undeclared function `{}`",
                                self.interner.lookup(*name)
                            ))
                            .with_label(span, "not declared"),
                    );
                    return;
                };
                match (&decl.receiver, call.receiver) {
                    (Some(actor), None) => {
                        self.errors.push(
                            Diagnostic::error(ErrorCode::E4007)
                                .with_message(format!(
                                    "actor method `{}` called without a receiver",
                                    self.interner.lookup(*name)
                                ))
                                .with_label(span, "no receiver")
                                .with_suggestion(format!(
                                    "call it on a `{}` value",
                                    actor.actor.display(self.interner)
                                )),
                        );
                        return;
                    }
                    (None, Some(_)) => {
                        self.errors.push(
                            Diagnostic::error(ErrorCode::E4007)
                                .with_message(format!(
                                    "`{}` is not an actor method but was called on a receiver",
                                    self.interner.lookup(*name)
                                ))
                                .with_label(span, "unexpected receiver"),
                        );
                        return;
                    }
                    _ => {}
                }
                let fn_name = self.interner.lookup(*name);
                let arity = (decl.params.len(), call.args.len());
                if !self.check_arity(&format!("`{fn_name}`"), arity, span) {
                    return;
                }
                if let Some(r) = call.receiver {
                    if self.value_kind(walk, r) == ValueKind::NotActor {
                        self.errors.push(
                            Diagnostic::error(ErrorCode::E4007)
                                .with_message(format!(
                                    "receiver of actor method `{fn_name}` is not an actor value"
                                ))
                                .with_label(walk.body.expr(r).span, "not an actor"),
                        );
                        return;
                    }
                }
                let declared = declared_domain(decl);
                match &declared {
                    IsolationDomain::GlobalActor(ty) => {
                        if self.decls.global_actor(ty.name).is_none() {
                            self.errors.push(unknown_global_actor(self.interner, ty, span));
                            return;
                        }
                    }
                    IsolationDomain::IsolatedParameter(i) => {
                        let arg = call.args[*i as usize];
                        if self.value_kind(walk, arg) == ValueKind::NotActor {
                            self.errors.push(
                                Diagnostic::error(ErrorCode::E4003)
                                    .with_message(format!(
                                        "isolated argument {i} of `{fn_name}` is not an actor value"
                                    ))
                                    .with_label(walk.body.expr(arg).span, "not an actor")
                                    .with_note("the callee runs on this argument's executor"),
                            );
                            return;
                        }
                    }
                    _ => {}
                }
                let Some(callee) = map_into_caller(&declared, receiver, &args) else {
                    self.errors.push(
                        Diagnostic::error(ErrorCode::E4010)
                            .with_message(format!(
                                "the isolation of `{fn_name}` refers to a value missing at this call"
                            ))
                            .with_label(span, "cannot determine the callee's executor"),
                    );
                    return;
                };
                (callee, decl.is_async, decl.throws, decl.result.clone())
            }
            Callee::Value { func, ty } => {
                if let ExprKind::Closure(id) = walk.body.expr(*func).kind {
                    let closure = walk.body.closure(id);
                    let arity = (closure.params.len(), call.args.len());
                    if !self.check_arity("the closure", arity, span) {
                        return;
                    }
                    let domain = self.closure_domain_in_parent(walk, id);
                    (domain, closure.is_async, closure.throws, closure.result.clone())
                } else {
                    let arity = (ty.params.len(), call.args.len());
                    if !self.check_arity("the function value", arity, span) {
                        return;
                    }
                    let domain = match &ty.global_actor {
                        Some(actor) => {
                            if self.decls.global_actor(actor.name).is_none() {
                                self.errors
                                    .push(unknown_global_actor(self.interner, actor, span));
                                return;
                            }
                            IsolationDomain::GlobalActor(actor.clone())
                        }
                        None => IsolationDomain::Unspecified,
                    };
                    (domain, ty.is_async, ty.throws, ty.result.clone())
                }
            }
        };

        let scope = &self.scopes[walk.scope.index()];
        let owned_receiver = call.receiver.is_some_and(|r| {
            match value_identity(walk.body, r) {
                ActorValue::Temp(_) => true,
                ActorValue::Local(local) => walk.owned_locals.contains(&local.raw()),
                _ => false,
            }
        });
        let site = CallSite {
            id: CallSiteId::new(self.next_site),
            caller: scope.domain.clone(),
            callee,
            is_async,
            throws,
            owned_receiver,
            span,
        };
        self.next_site += 1;
        let plan = plan_call(&site);

        if plan.needs_entry_hop && !scope.is_async {
            self.errors.push(
                Diagnostic::error(ErrorCode::E4008)
                    .with_message(format!(
                        "call into {} from a synchronous {} context",
                        site.callee.describe(self.interner),
                        site.caller.describe(self.interner)
                    ))
                    .with_label(span, "needs an executor switch")
                    .with_note("switching executors suspends, which a synchronous function cannot do")
                    .with_suggestion("make the caller `async`"),
            );
        }
        if throws && !scope.throws {
            self.errors.push(
                Diagnostic::error(ErrorCode::E4009)
                    .with_message("throwing call in a scope that does not throw")
                    .with_label(span, "this call can throw")
                    .with_suggestion("mark the enclosing function as throwing"),
            );
        }

        let scope = &mut self.scopes[walk.scope.index()];
        scope.calls.insert(
            expr,
            ResolvedCall {
                site,
                plan,
                result,
            },
        );
    }

    /// Report a call whose argument count differs from its callee's.
    /// `arity` is `(expected, found)`.
    fn check_arity(&mut self, callee: &str, arity: (usize, usize), span: Span) -> bool {
        let (expected, found) = arity;
        if expected == found {
            return true;
        }
        let plural = if expected == 1 { "" } else { "s" };
        self.errors.push(
            Diagnostic::error(ErrorCode::E4010)
                .with_message(format!(
                    "{callee} takes {expected} argument{plural} but the call passes {found}"
                ))
                .with_label(span, format!("expected {expected} argument{plural}"))
                .with_note("an argument left out may be the one that decides the executor"),
        );
        false
    }

    // ── Value kinds ─────────────────────────────────────────────

    fn kind_of_type(&self, ty: Option<&TypeRef>) -> ValueKind {
        match ty {
            Some(ty) if self.decls.is_actor(ty) => ValueKind::Actor,
            _ => ValueKind::NotActor,
        }
    }

    fn value_kind(&self, walk: &BodyWalk<'_>, expr: ExprId) -> ValueKind {
        match &walk.body.expr(expr).kind {
            ExprKind::SelfRef => {
                if walk.has_self {
                    ValueKind::Actor
                } else {
                    ValueKind::Unknown
                }
            }
            ExprKind::Param(i) => walk
                .params
                .get(*i as usize)
                .copied()
                .unwrap_or(ValueKind::Unknown),
            ExprKind::Capture(k) => walk
                .captures
                .get(*k as usize)
                .copied()
                .unwrap_or(ValueKind::Unknown),
            ExprKind::Local(local) => walk
                .locals
                .get(&local.raw())
                .copied()
                .unwrap_or(ValueKind::Unknown),
            ExprKind::Int(_) | ExprKind::Closure(_) | ExprKind::ToAsync { .. } => {
                ValueKind::NotActor
            }
            ExprKind::Construct { actor, .. } => self.kind_of_type(Some(actor)),
            ExprKind::Call(call) => match &call.callee {
                Callee::Direct(name) => self
                    .decls
                    .function(*name)
                    .map_or(ValueKind::Unknown, |decl| self.kind_of_type(decl.result.as_ref())),
                Callee::Value { func, ty } => match walk.body.expr(*func).kind {
                    ExprKind::Closure(id) => {
                        self.kind_of_type(walk.body.closure(id).result.as_ref())
                    }
                    _ => self.kind_of_type(ty.result.as_ref()),
                },
            },
        }
    }

    /// The domain of closure `id` seen from the scope that formed it.
    fn closure_domain_in_parent(&self, walk: &BodyWalk<'_>, id: ClosureId) -> IsolationDomain {
        let parent = &self.scopes[walk.scope.index()];
        let Some(&child_id) = parent.closures.get(&id) else {
            return IsolationDomain::Unspecified;
        };
        let child = &self.scopes[child_id.index()];
        match &child.domain {
            IsolationDomain::ActorInstance(ActorValue::Capture(k)) => {
                match child.captures.get(*k as usize) {
                    Some(CaptureSource::Actor(value)) => IsolationDomain::ActorInstance(*value),
                    Some(CaptureSource::Expr(e)) => {
                        IsolationDomain::ActorInstance(value_identity(walk.body, *e))
                    }
                    Some(CaptureSource::CurrentExecutor) | None => IsolationDomain::Unspecified,
                }
            }
            other => other.clone(),
        }
    }

    // ── Closures ────────────────────────────────────────────────

    fn resolve_closure(&mut self, walk: &mut BodyWalk<'_>, id: ClosureId, inherits_context: bool) {
        let body = walk.body;
        let closure: &ClosureDef = body.closure(id);
        for &capture in &closure.captures {
            self.visit_expr(walk, capture);
        }

        let enclosing = self.scopes[walk.scope.index()].domain.clone();
        let mut captures: Vec<CaptureSource> = closure
            .captures
            .iter()
            .map(|&e| CaptureSource::Expr(e))
            .collect();

        let (domain, entry) = match (&closure.global_actor, inherits_context) {
            (Some((actor, span)), true) => {
                self.errors.push(
                    Diagnostic::error(ErrorCode::E4005)
                        .with_message(format!(
                            "closure is isolated to `{}` but passed to a parameter that inherits the caller's actor context",
                            actor.display(self.interner)
                        ))
                        .with_label(*span, "global actor attribute"),
                );
                return;
            }
            (Some((actor, span)), false) => {
                if self.decls.global_actor(actor.name).is_none() {
                    self.errors
                        .push(unknown_global_actor(self.interner, actor, *span));
                    return;
                }
                let domain = IsolationDomain::GlobalActor(actor.clone());
                let entry = plan_entry(&domain, closure.is_async).map(EntryTarget::Domain);
                (domain, entry)
            }
            (None, false) => {
                let domain = match enclosing.actor_value() {
                    Some(value) => {
                        let k = capture_for(body, &mut captures, value);
                        IsolationDomain::ActorInstance(ActorValue::Capture(k))
                    }
                    None => enclosing.clone(),
                };
                let entry = plan_entry(&domain, closure.is_async).map(EntryTarget::Domain);
                (domain, entry)
            }
            (None, true) => {
                let entry = if closure.is_async {
                    Some(match &enclosing {
                        IsolationDomain::GlobalActor(_) => EntryTarget::Domain(enclosing.clone()),
                        _ => match enclosing.actor_value() {
                            Some(value) => {
                                let k = capture_for(body, &mut captures, value);
                                EntryTarget::Domain(IsolationDomain::ActorInstance(
                                    ActorValue::Capture(k),
                                ))
                            }
                            None => {
                                captures.push(CaptureSource::CurrentExecutor);
                                EntryTarget::CapturedExecutor(param_index(captures.len() - 1))
                            }
                        },
                    })
                } else {
                    None
                };
                (IsolationDomain::Unspecified, entry)
            }
        };

        let child = ScopeId(param_index(self.scopes.len()));
        tracing::trace!(
            scope = child.raw(),
            parent = walk.scope.raw(),
            ?domain,
            inherits_context,
            "closure scope"
        );
        self.scopes.push(ResolvedScope {
            id: child,
            parent: Some(walk.scope),
            domain,
            is_async: closure.is_async,
            throws: closure.throws,
            entry,
            captures,
            closures: FxHashMap::default(),
            calls: FxHashMap::default(),
        });
        self.scopes[walk.scope.index()].closures.insert(id, child);

        let params = closure
            .params
            .iter()
            .map(|ty| self.kind_of_type(Some(ty)))
            .collect();
        let capture_kinds = self.scopes[child.index()]
            .captures
            .iter()
            .map(|source| match source {
                CaptureSource::Expr(e) => self.value_kind(walk, *e),
                CaptureSource::Actor(_) => ValueKind::Actor,
                CaptureSource::CurrentExecutor => ValueKind::NotActor,
            })
            .collect();
        self.walk_body(&closure.body, child, false, params, capture_kinds);
    }
}

/// Index of the capture holding `value`, adding an implicit capture when
/// no explicit one refers to it.
fn capture_for(body: &Body, captures: &mut Vec<CaptureSource>, value: ActorValue) -> u32 {
    let existing = captures.iter().position(|c| match c {
        CaptureSource::Expr(e) => value_identity(body, *e) == value,
        CaptureSource::Actor(v) => *v == value,
        CaptureSource::CurrentExecutor => false,
    });
    let index = existing.unwrap_or_else(|| {
        captures.push(CaptureSource::Actor(value));
        captures.len() - 1
    });
    param_index(index)
}
