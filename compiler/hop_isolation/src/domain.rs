//! Isolation domains: the executor a scope or call must run on.
//!
//! Every function, closure, and thunk is tagged with exactly one
//! [`IsolationDomain`] before planning. Call sites compare the caller's
//! domain with the callee's domain *expressed in the caller's frame*, so
//! two domains denoting the same runtime actor value compare equal even
//! when one was written as an isolated parameter and the other as a plain
//! actor instance.

use std::fmt;

use hop_ir::{Name, StringInterner};

use crate::body::{ExprId, LocalId};

// ── Types ───────────────────────────────────────────────────────────

/// A nominal type as written in a declaration, with generic arguments.
///
/// Global actors are identified by their `TypeRef`, so `G<Int>` and
/// `G<String>` are distinct domains.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef {
    pub name: Name,
    pub args: Vec<TypeRef>,
}

impl TypeRef {
    /// A non-generic type.
    pub fn named(name: Name) -> Self {
        TypeRef {
            name,
            args: Vec::new(),
        }
    }

    pub fn generic(name: Name, args: Vec<TypeRef>) -> Self {
        TypeRef { name, args }
    }

    /// Replace occurrences of the generic parameters `params` by `args`.
    ///
    /// Parameters without a matching argument are left as written.
    pub fn substitute(&self, params: &[Name], args: &[TypeRef]) -> TypeRef {
        if self.args.is_empty() {
            if let Some(pos) = params.iter().position(|p| *p == self.name) {
                if let Some(arg) = args.get(pos) {
                    return arg.clone();
                }
            }
        }
        TypeRef {
            name: self.name,
            args: self
                .args
                .iter()
                .map(|a| a.substitute(params, args))
                .collect(),
        }
    }

    /// Render with the interner, e.g. `MyGenericActor<Int>`.
    pub fn display<'a>(&'a self, interner: &'a StringInterner) -> DisplayType<'a> {
        DisplayType { ty: self, interner }
    }
}

/// [`TypeRef`] paired with the interner that can spell its names.
pub struct DisplayType<'a> {
    ty: &'a TypeRef,
    interner: &'a StringInterner,
}

impl fmt::Display for DisplayType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.interner.lookup(self.ty.name))?;
        if let Some((first, rest)) = self.ty.args.split_first() {
            write!(f, "<{}", first.display(self.interner))?;
            for arg in rest {
                write!(f, ", {}", arg.display(self.interner))?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

// ── Actor values ────────────────────────────────────────────────────

/// Identity of a runtime actor value within one frame.
///
/// Identity is by *value*, never by type: two parameters of the same
/// actor type are different identities, as are two constructions of the
/// same actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActorValue {
    /// The method receiver.
    SelfValue,
    /// Declared parameter `i` (receiver excluded).
    Param(u32),
    /// Closure capture `k`.
    Capture(u32),
    /// A `let`-bound local.
    Local(LocalId),
    /// An anonymous temporary produced by an expression.
    Temp(ExprId),
}

// ── Domains ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IsolationDomain {
    /// Runs wherever it is called from.
    Nonisolated,
    /// Tied to a specific runtime actor value.
    ActorInstance(ActorValue),
    /// Tied to a global actor type; resolved to `Type.shared` at codegen.
    GlobalActor(TypeRef),
    /// Tied to the designated parameter of the enclosing function.
    IsolatedParameter(u32),
    /// No static isolation known; decided by a runtime capture.
    Unspecified,
}

impl IsolationDomain {
    /// The actor value this domain is tied to, if any.
    ///
    /// `IsolatedParameter(i)` denotes the same value as
    /// `ActorInstance(Param(i))`.
    pub fn actor_value(&self) -> Option<ActorValue> {
        match self {
            IsolationDomain::ActorInstance(value) => Some(*value),
            IsolationDomain::IsolatedParameter(index) => Some(ActorValue::Param(*index)),
            IsolationDomain::Nonisolated
            | IsolationDomain::GlobalActor(_)
            | IsolationDomain::Unspecified => None,
        }
    }

    /// Whether code in `self` and code in `other` is statically known to
    /// run on the same executor.
    ///
    /// `Unspecified` is never statically equal to anything, itself
    /// included.
    pub fn same_executor(&self, other: &IsolationDomain) -> bool {
        match (self, other) {
            (IsolationDomain::Unspecified, _) | (_, IsolationDomain::Unspecified) => false,
            (IsolationDomain::Nonisolated, IsolationDomain::Nonisolated) => true,
            (IsolationDomain::GlobalActor(a), IsolationDomain::GlobalActor(b)) => a == b,
            _ => matches!(
                (self.actor_value(), other.actor_value()),
                (Some(a), Some(b)) if a == b
            ),
        }
    }

    /// Whether the domain names a concrete executor at compile time.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            IsolationDomain::ActorInstance(_)
                | IsolationDomain::GlobalActor(_)
                | IsolationDomain::IsolatedParameter(_)
        )
    }

    /// Human-readable description for diagnostics and the driver.
    pub fn describe(&self, interner: &StringInterner) -> String {
        match self {
            IsolationDomain::Nonisolated => "nonisolated".to_owned(),
            IsolationDomain::ActorInstance(ActorValue::SelfValue) => "actor self".to_owned(),
            IsolationDomain::ActorInstance(ActorValue::Param(i)) => format!("actor parameter {i}"),
            IsolationDomain::ActorInstance(ActorValue::Capture(k)) => {
                format!("captured actor {k}")
            }
            IsolationDomain::ActorInstance(ActorValue::Local(local)) => {
                format!("local actor {}", local.raw())
            }
            IsolationDomain::ActorInstance(ActorValue::Temp(expr)) => {
                format!("temporary actor e{}", expr.raw())
            }
            IsolationDomain::GlobalActor(ty) => format!("global actor {}", ty.display(interner)),
            IsolationDomain::IsolatedParameter(i) => format!("isolated parameter {i}"),
            IsolationDomain::Unspecified => "unspecified".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests;
