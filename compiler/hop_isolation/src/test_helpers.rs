//! Shared test utilities: ID shorthands and a declaration fixture with
//! the actors and global actors most tests need.

use hop_diagnostic::Diagnostic;
use hop_ir::{Name, Span, StringInterner};

use crate::body::Body;
use crate::decl::{
    ActorDecl, Convention, DeclTable, FuncDecl, GlobalActorDecl, IsolationAttr, ParamDecl,
    SharedAccessor,
};
use crate::domain::{IsolationDomain, TypeRef};
use crate::ir::{
    CallSiteId, FunctionKind, HopBlockId, HopFunction, HopInstr, HopRole, HopVarId, IrType,
};
use crate::lower::{lower_function, HopSignature, LowerOutput};
use crate::resolve::{resolve_function, ScopeTable};

/// Shorthand for `HopVarId::new(n)`.
pub(crate) fn v(n: u32) -> HopVarId {
    HopVarId::new(n)
}

/// Shorthand for `HopBlockId::new(n)`.
pub(crate) fn b(n: u32) -> HopBlockId {
    HopBlockId::new(n)
}

pub(crate) fn site(n: u32) -> CallSiteId {
    CallSiteId::new(n)
}

pub(crate) fn sp(start: u32, end: u32) -> Span {
    Span::new(start, end)
}

/// Hop roles of `func` in block order.
pub(crate) fn hop_roles(func: &HopFunction) -> Vec<HopRole> {
    func.hops().map(|(_, _, _, role)| role).collect()
}

/// Instructions of one block, for shape assertions.
pub(crate) fn block_body(func: &HopFunction, block: u32) -> &[HopInstr] {
    &func.block(b(block)).body
}

/// Signature for hand-built functions: no params, returns `()`,
/// nonisolated.
pub(crate) fn signature(name: Name, is_async: bool) -> HopSignature {
    HopSignature {
        name,
        kind: FunctionKind::Function,
        params: Vec::new(),
        return_type: IrType::Unit,
        is_async,
        throws: false,
        domain: IsolationDomain::Nonisolated,
    }
}

/// Declarations shared by most tests:
///
/// - actors `MyActor`, `RedActorImpl`, `BlueActorImpl`, `MyGenericActor<T>`
/// - `GlobalActor` (stored `shared: MyActor`)
/// - `RedActor` / `BlueActor` (computed `shared`)
/// - `GenericGlobalActorWithGetter<T>` (computed `shared:
///   MyGenericActor<T>`)
pub(crate) struct Fixture {
    pub interner: StringInterner,
    pub decls: DeclTable,
}

impl Fixture {
    pub fn new() -> Self {
        let interner = StringInterner::new();
        let mut decls = DeclTable::new();
        let n = |s: &str| interner.intern(s);

        for actor in ["MyActor", "RedActorImpl", "BlueActorImpl"] {
            decls.add_actor(ActorDecl {
                name: n(actor),
                generic_params: Vec::new(),
                span: Span::DUMMY,
            });
        }
        decls.add_actor(ActorDecl {
            name: n("MyGenericActor"),
            generic_params: vec![n("T")],
            span: Span::DUMMY,
        });

        decls.add_global_actor(GlobalActorDecl {
            name: n("GlobalActor"),
            generic_params: Vec::new(),
            instance: TypeRef::named(n("MyActor")),
            shared: SharedAccessor::Stored {
                addressor: n("GlobalActor.shared.unsafeMutableAddressor"),
            },
            span: Span::DUMMY,
        });
        for (actor, instance) in [("RedActor", "RedActorImpl"), ("BlueActor", "BlueActorImpl")] {
            decls.add_global_actor(GlobalActorDecl {
                name: n(actor),
                generic_params: Vec::new(),
                instance: TypeRef::named(n(instance)),
                shared: SharedAccessor::Computed {
                    getter: n(&format!("{actor}.shared.getter")),
                },
                span: Span::DUMMY,
            });
        }
        decls.add_global_actor(GlobalActorDecl {
            name: n("GenericGlobalActorWithGetter"),
            generic_params: vec![n("T")],
            instance: TypeRef::generic(n("MyGenericActor"), vec![TypeRef::named(n("T"))]),
            shared: SharedAccessor::Computed {
                getter: n("GenericGlobalActorWithGetter.shared.getter"),
            },
            span: Span::DUMMY,
        });

        Fixture { interner, decls }
    }

    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn ty(&self, s: &str) -> TypeRef {
        TypeRef::named(self.name(s))
    }

    pub fn param(&self, name: &str, ty: &str) -> ParamDecl {
        ParamDecl::new(self.name(name), self.ty(ty))
    }

    /// A free function with no attributes.
    pub fn func(&self, name: &str) -> FuncDecl {
        FuncDecl::new(self.name(name), Span::DUMMY)
    }

    /// A method on `actor` with a guaranteed receiver.
    pub fn method(&self, actor: &str, name: &str) -> FuncDecl {
        self.func(&format!("{actor}.{name}"))
            .with_receiver(self.ty(actor), Convention::Guaranteed)
    }

    pub fn on_global(&self, func: FuncDecl, actor: &str) -> FuncDecl {
        func.with_attr(IsolationAttr::GlobalActor(self.ty(actor)), Span::DUMMY)
    }

    pub fn declare(&mut self, func: FuncDecl) -> Name {
        let name = func.name;
        self.decls.add_function(func);
        name
    }

    pub fn resolve(&self, func: Name, body: &Body) -> Result<ScopeTable, Vec<Diagnostic>> {
        let decl = self.decls.function(func).expect("function declared");
        resolve_function(&self.decls, &self.interner, decl, body)
    }

    /// Resolve and lower, panicking on any error. Returns the function
    /// followed by its closures and any thunks it requested.
    pub fn lower(&self, func: Name, body: &Body) -> Vec<HopFunction> {
        let decl = self.decls.function(func).expect("function declared");
        let scopes = self.resolve(func, body).expect("resolves cleanly");
        let mut out = LowerOutput::new();
        lower_function(&self.decls, &self.interner, decl, body, &scopes, &mut out)
            .expect("lowers cleanly");
        out.functions
    }

    /// The lowered function named `func` (not its closures).
    pub fn lower_one(&self, func: Name, body: &Body) -> HopFunction {
        self.lower(func, body)
            .into_iter()
            .find(|f| f.name == func)
            .expect("function present in output")
    }
}
