//! Actor isolation analysis and executor hop insertion.
//!
//! This crate provides:
//!
//! - **Isolation domains** ([`IsolationDomain`], [`ActorValue`]): the
//!   executor a scope or call must run on, and frame-relative equality
//!   between domains.
//!
//! - **Resolution** ([`resolve_function`]): tags every function and
//!   closure scope with one domain, rejects ill-formed isolation
//!   (`E4001`..`E4010`), and plans every call site.
//!
//! - **Planning** ([`plan_call`], [`plan_entry`], [`SiteProgress`]): the
//!   hops a call needs, on which exit edges, and what they restore to.
//!
//! - **Hop IR** ([`HopFunction`], [`HopInstr`], [`HopTerminator`]): a
//!   basic-block representation carrying `hop_to_executor` and
//!   `getCurrentExecutor`, produced by [`lower_function`].
//!
//! - **Passes**: [`verify_hop_placement`] (before coalescing; violations
//!   are internal errors) and [`coalesce_hops`].
//!
//! - **Runtime model** ([`ExecutorRuntime`], [`simulate`]): executes Hop
//!   IR against a recording runtime for tests and the driver.
//!
//! # Pipeline
//!
//! ```text
//! Module ─ resolve ─► ScopeTable ─ lower ─► HopFunction ─ verify ─ coalesce ─►
//! ```
//!
//! [`lower_module`] runs the whole pipeline. A function with planning
//! errors produces no IR at all; other functions continue.

pub mod body;
pub mod coalesce;
pub mod decl;
pub mod domain;
pub mod graph;
pub mod ir;
pub mod lower;
pub mod plan;
pub mod print;
pub mod resolve;
pub mod runtime;
pub mod thunk;
pub mod verify;

#[cfg(test)]
mod test_helpers;

pub use body::{Body, BodyBuilder, Call, Callee, ClosureDef, ExprId, ExprKind, FnType, LocalId};
pub use coalesce::coalesce_hops;
pub use decl::{
    ActorDecl, Convention, DeclTable, FuncDecl, GlobalActorDecl, IsolationAttr, ParamDecl,
    SharedAccessor,
};
pub use domain::{ActorValue, IsolationDomain, TypeRef};
pub use ir::{
    CallSiteId, FunctionKind, HopBlock, HopBlockId, HopFunction, HopInstr, HopRole,
    HopTerminator, HopVarId, IrType,
};
pub use lower::{lower_function, HopProblem, LowerOutput};
pub use plan::{plan_call, plan_entry, CallSite, ExitKinds, HopPlan, RestoreTarget, SiteProgress};
pub use print::{print_function, FunctionPrinter};
pub use resolve::{resolve_function, ScopeTable};
pub use runtime::{simulate, ExecutionTrace, ExecutorId, ExecutorRuntime, RecordingRuntime, SimEnv};
pub use verify::{verify_hop_placement, HopViolation};

use hop_diagnostic::{DiagnosticQueue, ErrorGuaranteed};
use hop_ir::{Name, StringInterner};
use rustc_hash::FxHashMap;

/// Pipeline switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HopOptions {
    /// Check hop placement before coalescing.
    pub verify: bool,
    /// Remove hops to the executor already current.
    pub coalesce: bool,
}

impl Default for HopOptions {
    fn default() -> Self {
        HopOptions {
            verify: true,
            coalesce: true,
        }
    }
}

/// Declarations plus the bodies of the functions defined in this module.
/// Declarations without a body are external.
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub decls: DeclTable,
    pub bodies: FxHashMap<Name, Body>,
}

impl Module {
    pub fn new(decls: DeclTable) -> Self {
        Module {
            decls,
            bodies: FxHashMap::default(),
        }
    }

    pub fn with_body(mut self, func: Name, body: Body) -> Self {
        self.bodies.insert(func, body);
        self
    }
}

/// Result of [`lower_module`].
#[derive(Debug)]
pub struct LoweredModule {
    /// Functions, closures, and thunks that lowered cleanly.
    pub functions: Vec<HopFunction>,
    /// Hops removed by coalescing.
    pub coalesced: usize,
    /// Set when this run emitted at least one error.
    pub error: Option<ErrorGuaranteed>,
}

impl LoweredModule {
    pub fn function(&self, name: Name) -> Option<&HopFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Resolve, lower, verify, and coalesce every function of `module`.
///
/// Diagnostics go to `queue`. Each function is handled independently: one
/// with errors contributes nothing to the output.
pub fn lower_module(
    module: &Module,
    interner: &StringInterner,
    options: HopOptions,
    queue: &mut DiagnosticQueue,
) -> LoweredModule {
    let errors_before = queue.error_count();
    let mut out = LowerOutput::new();

    for func in module.decls.functions() {
        let Some(body) = module.bodies.get(&func.name) else {
            // External: only its declared isolation can be wrong.
            if let Err(errors) = resolve::function_domain(&module.decls, interner, func) {
                for diag in errors {
                    queue.add(diag);
                }
            }
            continue;
        };

        let scopes = match resolve_function(&module.decls, interner, func, body) {
            Ok(scopes) => scopes,
            Err(errors) => {
                for diag in errors {
                    queue.add(diag);
                }
                continue;
            }
        };

        if let Err(problems) = lower_function(&module.decls, interner, func, body, &scopes, &mut out) {
            for problem in problems {
                queue.add(problem.to_diagnostic(interner));
            }
        }
    }

    let mut functions = out.functions;
    if options.verify {
        functions.retain(|func| {
            let violations = verify_hop_placement(func);
            for violation in &violations {
                queue.add(violation.to_diagnostic(interner));
            }
            violations.is_empty()
        });
    }

    let mut coalesced = 0;
    if options.coalesce {
        for func in &mut functions {
            coalesced += coalesce_hops(func);
        }
    }

    let errors = queue.error_count().saturating_sub(errors_before);
    tracing::debug!(
        functions = functions.len(),
        coalesced,
        errors,
        "lowered module"
    );

    LoweredModule {
        functions,
        coalesced,
        error: ErrorGuaranteed::from_error_count(errors),
    }
}
