//! Bound function bodies.
//!
//! Bodies arrive already bound: names are resolved to parameters, locals,
//! captures, and declarations. Each body is an expression arena
//! ([`Expr`] indexed by [`ExprId`]) plus a statement list. Closure
//! literals own a nested [`Body`] whose `Param`/`Capture` expressions
//! refer to the closure's own parameters and captures.
//!
//! [`BodyBuilder`] is the public way to construct bodies; drivers and
//! tests use it in place of a parser.

use hop_ir::{Name, Span};

use crate::domain::TypeRef;

// ── ID newtypes ─────────────────────────────────────────────────────

/// Expression index within one [`Body`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// `let`-bound local within one [`Body`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct LocalId(u32);

impl LocalId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Closure literal index within one [`Body`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ClosureId(u32);

impl ClosureId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ── Expressions ─────────────────────────────────────────────────────

/// A function type as seen through a value of that type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct FnType {
    /// Global actor from the function type (`@RedActor () -> ()`).
    pub global_actor: Option<TypeRef>,
    pub is_async: bool,
    pub throws: bool,
    pub params: Vec<TypeRef>,
    /// `None` for `()`.
    pub result: Option<TypeRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Callee {
    /// A declared function or method.
    Direct(Name),
    /// A function value (parameter, local, or closure literal).
    Value { func: ExprId, ty: FnType },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Call {
    pub callee: Callee,
    /// Actor receiver for method calls.
    pub receiver: Option<ExprId>,
    pub args: Vec<ExprId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Int(i64),
    Param(u32),
    SelfRef,
    Local(LocalId),
    Capture(u32),
    /// Local construction of an actor instance; the result is owned.
    Construct {
        actor: TypeRef,
        args: Vec<ExprId>,
    },
    Call(Call),
    Closure(ClosureId),
    /// Conversion of a synchronous global-actor function value to an
    /// async function type.
    ToAsync {
        value: ExprId,
        global_actor: TypeRef,
        params: Vec<TypeRef>,
        result: Option<TypeRef>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stmt {
    Let { local: LocalId, value: ExprId },
    Expr(ExprId),
    Return(Option<ExprId>),
}

// ── Closures ────────────────────────────────────────────────────────

/// A closure literal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClosureDef {
    /// Explicit global actor attribute (`{ @MainActor in ... }`).
    pub global_actor: Option<(TypeRef, Span)>,
    pub is_async: bool,
    pub throws: bool,
    pub params: Vec<TypeRef>,
    pub result: Option<TypeRef>,
    /// Expressions of the enclosing body captured by value, in capture
    /// index order.
    pub captures: Vec<ExprId>,
    pub body: Body,
    pub span: Span,
}

impl ClosureDef {
    pub fn new(body: Body) -> Self {
        ClosureDef {
            global_actor: None,
            is_async: false,
            throws: false,
            params: Vec::new(),
            result: None,
            captures: Vec::new(),
            body,
            span: Span::DUMMY,
        }
    }

    #[must_use]
    pub fn with_global_actor(mut self, actor: TypeRef, span: Span) -> Self {
        self.global_actor = Some((actor, span));
        self
    }

    #[must_use]
    pub fn with_async(mut self) -> Self {
        self.is_async = true;
        self
    }

    #[must_use]
    pub fn with_throws(mut self) -> Self {
        self.throws = true;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: Vec<TypeRef>) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_result(mut self, result: TypeRef) -> Self {
        self.result = Some(result);
        self
    }

    #[must_use]
    pub fn with_captures(mut self, captures: Vec<ExprId>) -> Self {
        self.captures = captures;
        self
    }
}

// ── Bodies ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Body {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    closures: Vec<ClosureDef>,
    num_locals: u32,
}

impl Body {
    /// A body with no statements.
    pub fn empty() -> Self {
        Body::default()
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        debug_assert!(
            id.index() < self.exprs.len(),
            "ExprId {} out of bounds (have {} exprs)",
            id.raw(),
            self.exprs.len(),
        );
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn closure(&self, id: ClosureId) -> &ClosureDef {
        &self.closures[id.index()]
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    pub fn num_locals(&self) -> u32 {
        self.num_locals
    }

    pub fn num_exprs(&self) -> usize {
        self.exprs.len()
    }
}

// ── Builder ─────────────────────────────────────────────────────────

/// Incremental constructor for a [`Body`].
///
/// Every expression gets a one-byte synthetic span at a running offset,
/// so diagnostics from builder-made bodies still sort in source order.
pub struct BodyBuilder {
    body: Body,
    offset: u32,
}

impl Default for BodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Builder whose synthetic spans start at `offset`.
    pub fn starting_at(offset: u32) -> Self {
        BodyBuilder {
            body: Body::default(),
            offset,
        }
    }

    fn next_span(&mut self) -> Span {
        let span = Span::new(self.offset, self.offset + 1);
        self.offset += 1;
        span
    }

    fn push(&mut self, kind: ExprKind) -> ExprId {
        let span = self.next_span();
        let id = ExprId::new(index_u32(self.body.exprs.len()));
        self.body.exprs.push(Expr { kind, span });
        id
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.push(ExprKind::Int(value))
    }

    pub fn param(&mut self, index: u32) -> ExprId {
        self.push(ExprKind::Param(index))
    }

    pub fn self_ref(&mut self) -> ExprId {
        self.push(ExprKind::SelfRef)
    }

    pub fn local(&mut self, local: LocalId) -> ExprId {
        self.push(ExprKind::Local(local))
    }

    pub fn capture(&mut self, index: u32) -> ExprId {
        self.push(ExprKind::Capture(index))
    }

    pub fn construct(&mut self, actor: TypeRef, args: Vec<ExprId>) -> ExprId {
        self.push(ExprKind::Construct { actor, args })
    }

    /// Call a free function.
    pub fn call(&mut self, callee: Name, args: Vec<ExprId>) -> ExprId {
        self.push(ExprKind::Call(Call {
            callee: Callee::Direct(callee),
            receiver: None,
            args,
        }))
    }

    /// Call an actor method on `receiver`.
    pub fn method_call(&mut self, receiver: ExprId, callee: Name, args: Vec<ExprId>) -> ExprId {
        self.push(ExprKind::Call(Call {
            callee: Callee::Direct(callee),
            receiver: Some(receiver),
            args,
        }))
    }

    /// Call a function value.
    pub fn call_value(&mut self, func: ExprId, ty: FnType, args: Vec<ExprId>) -> ExprId {
        self.push(ExprKind::Call(Call {
            callee: Callee::Value { func, ty },
            receiver: None,
            args,
        }))
    }

    pub fn closure(&mut self, mut closure: ClosureDef) -> ExprId {
        let id = ClosureId::new(index_u32(self.body.closures.len()));
        let expr = self.push(ExprKind::Closure(id));
        closure.span = self.body.exprs[expr.index()].span;
        self.body.closures.push(closure);
        expr
    }

    pub fn to_async(
        &mut self,
        value: ExprId,
        global_actor: TypeRef,
        params: Vec<TypeRef>,
        result: Option<TypeRef>,
    ) -> ExprId {
        self.push(ExprKind::ToAsync {
            value,
            global_actor,
            params,
            result,
        })
    }

    /// `let local = value`.
    pub fn bind(&mut self, value: ExprId) -> LocalId {
        let local = LocalId::new(self.body.num_locals);
        self.body.num_locals += 1;
        self.body.stmts.push(Stmt::Let { local, value });
        local
    }

    pub fn expr_stmt(&mut self, expr: ExprId) {
        self.body.stmts.push(Stmt::Expr(expr));
    }

    pub fn ret(&mut self, value: Option<ExprId>) {
        self.body.stmts.push(Stmt::Return(value));
    }

    pub fn finish(self) -> Body {
        self.body
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "expression and closure counts never exceed u32"
)]
fn index_u32(index: usize) -> u32 {
    index as u32
}

#[cfg(test)]
mod tests;
