//! Declaration table: actors, global actors, and function signatures.

use hop_ir::{Name, Span};
use rustc_hash::FxHashMap;

use crate::domain::TypeRef;

/// An actor type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ActorDecl {
    pub name: Name,
    pub generic_params: Vec<Name>,
    pub span: Span,
}

/// How a global actor exposes its `shared` instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SharedAccessor {
    /// `static var shared = ...`: an addressor returning a raw
    /// pointer, read under a dynamic access guard.
    Stored { addressor: Name },
    /// `static var shared: T { ... }`: a getter taking the metatype,
    /// returning an owned instance.
    Computed { getter: Name },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GlobalActorDecl {
    pub name: Name,
    pub generic_params: Vec<Name>,
    /// Type of `shared`, possibly mentioning `generic_params`.
    pub instance: TypeRef,
    pub shared: SharedAccessor,
    pub span: Span,
}

impl GlobalActorDecl {
    /// Type of `shared` for a particular use, e.g. `MyGenericActor<Int>`
    /// for `G<Int>`.
    pub fn instance_type(&self, actor: &TypeRef) -> TypeRef {
        self.instance.substitute(&self.generic_params, &actor.args)
    }
}

/// Ownership convention of an actor receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Convention {
    /// Borrowed for the duration of the call.
    Guaranteed,
    /// Consumed by the callee (`__consuming`).
    Owned,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Receiver {
    pub actor: TypeRef,
    pub convention: Convention,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamDecl {
    pub name: Name,
    pub ty: TypeRef,
    /// `isolated` parameter.
    pub isolated: bool,
    /// Closures passed here inherit the caller's actor context.
    pub inherits_actor_context: bool,
}

impl ParamDecl {
    pub fn new(name: Name, ty: TypeRef) -> Self {
        ParamDecl {
            name,
            ty,
            isolated: false,
            inherits_actor_context: false,
        }
    }

    #[must_use]
    pub fn isolated(mut self) -> Self {
        self.isolated = true;
        self
    }

    #[must_use]
    pub fn inheriting_actor_context(mut self) -> Self {
        self.inherits_actor_context = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IsolationAttr {
    GlobalActor(TypeRef),
    Nonisolated,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FuncDecl {
    /// Unique name; methods are qualified (`RedActorImpl.hello`).
    pub name: Name,
    pub receiver: Option<Receiver>,
    pub params: Vec<ParamDecl>,
    pub attrs: Vec<(IsolationAttr, Span)>,
    pub is_async: bool,
    pub throws: bool,
    /// `None` for `()`.
    pub result: Option<TypeRef>,
    pub span: Span,
}

impl FuncDecl {
    pub fn new(name: Name, span: Span) -> Self {
        FuncDecl {
            name,
            receiver: None,
            params: Vec::new(),
            attrs: Vec::new(),
            is_async: false,
            throws: false,
            result: None,
            span,
        }
    }

    #[must_use]
    pub fn with_receiver(mut self, actor: TypeRef, convention: Convention) -> Self {
        self.receiver = Some(Receiver { actor, convention });
        self
    }

    #[must_use]
    pub fn with_param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn with_attr(mut self, attr: IsolationAttr, span: Span) -> Self {
        self.attrs.push((attr, span));
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
    pub fn with_result(mut self, result: TypeRef) -> Self {
        self.result = Some(result);
        self
    }
}

/// All declarations visible to lowering.
///
/// Functions are kept in declaration order so lowering output and
/// diagnostics are deterministic.
#[derive(Clone, Debug, Default)]
pub struct DeclTable {
    actors: FxHashMap<Name, ActorDecl>,
    global_actors: FxHashMap<Name, GlobalActorDecl>,
    functions: FxHashMap<Name, FuncDecl>,
    order: Vec<Name>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_actor(&mut self, actor: ActorDecl) {
        self.actors.insert(actor.name, actor);
    }

    pub fn add_global_actor(&mut self, global: GlobalActorDecl) {
        self.global_actors.insert(global.name, global);
    }

    /// Add a function. A redeclaration replaces the earlier signature but
    /// keeps its position.
    pub fn add_function(&mut self, func: FuncDecl) {
        if self.functions.insert(func.name, func.clone()).is_none() {
            self.order.push(func.name);
        }
    }

    pub fn actor(&self, name: Name) -> Option<&ActorDecl> {
        self.actors.get(&name)
    }

    pub fn global_actor(&self, name: Name) -> Option<&GlobalActorDecl> {
        self.global_actors.get(&name)
    }

    pub fn function(&self, name: Name) -> Option<&FuncDecl> {
        self.functions.get(&name)
    }

    /// Whether `ty` names a declared actor type.
    pub fn is_actor(&self, ty: &TypeRef) -> bool {
        self.actors.contains_key(&ty.name)
    }

    /// Global actors, sorted by name.
    pub fn global_actors(&self) -> impl Iterator<Item = &GlobalActorDecl> {
        let mut decls: Vec<_> = self.global_actors.values().collect();
        decls.sort_by_key(|d| d.name);
        decls.into_iter()
    }

    /// Functions in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &FuncDecl> {
        self.order.iter().filter_map(|name| self.functions.get(name))
    }
}
