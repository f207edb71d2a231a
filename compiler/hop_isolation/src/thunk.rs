//! Isolation thunks: async wrappers around synchronous global-actor
//! function values.
//!
//! Converting a sync `@G (T) -> U` value to an async function yields a
//! thunk that hops to `G.shared` around the call and back to whatever
//! executor the caller was on:
//!
//! ```text
//! isolation_thunk<G>(T) -> U (%x: T, %f: fn):
//!   %prev = get_current_executor
//!   <materialize G.shared>
//!   hop_to_executor %g        ; CallEntry(0)
//!   %r = apply %f(%x)
//!   hop_to_executor %prev     ; CallExit(0)
//!   <end G.shared>
//!   return %r
//! ```
//!
//! Thunks are keyed by global actor and signature and shared across the
//! module.

use hop_ir::{Name, StringInterner};

use crate::decl::DeclTable;
use crate::domain::{IsolationDomain, TypeRef};
use crate::ir::{CallSiteId, FunctionKind, HopFunction, HopParam, HopRole, IrType, ParamConvention};
use crate::lower::{ir_type, materialize_global_actor, CleanupStack, HopIrBuilder, HopSignature};

/// Name of the thunk for `actor` and a signature.
pub fn thunk_name(
    interner: &StringInterner,
    actor: &TypeRef,
    params: &[TypeRef],
    result: Option<&TypeRef>,
) -> Name {
    let params: Vec<String> = params
        .iter()
        .map(|param| param.display(interner).to_string())
        .collect();
    let mut name = format!(
        "isolation_thunk<{}>({})",
        actor.display(interner),
        params.join(", ")
    );
    if let Some(result) = result {
        name.push_str(" -> ");
        name.push_str(&result.display(interner).to_string());
    }
    interner.intern(&name)
}

/// Build the thunk hopping to `actor` around a call of the wrapped
/// function. `None` when `actor` is not a declared global actor.
pub fn build_isolation_thunk(
    decls: &DeclTable,
    interner: &StringInterner,
    actor: &TypeRef,
    params: &[TypeRef],
    result: Option<&TypeRef>,
) -> Option<HopFunction> {
    let mut builder = HopIrBuilder::new();
    let entry = builder.entry_block();

    let mut sig_params = Vec::with_capacity(params.len() + 1);
    let mut args = Vec::with_capacity(params.len());
    for ty in params {
        let ty = ir_type(interner, Some(ty));
        let var = builder.add_block_param(entry, ty.clone());
        let convention = if matches!(ty, IrType::Int) {
            ParamConvention::Trivial
        } else {
            ParamConvention::Guaranteed
        };
        args.push(var);
        sig_params.push(HopParam {
            var,
            ty,
            convention,
        });
    }
    let wrapped = builder.add_block_param(entry, IrType::Function);
    sig_params.push(HopParam {
        var: wrapped,
        ty: IrType::Function,
        convention: ParamConvention::Guaranteed,
    });

    let site = CallSiteId::new(0);
    let prev = builder.emit_get_current_executor();
    let target = materialize_global_actor(&mut builder, decls, actor)?;
    let mut cleanups = CleanupStack::default();
    cleanups.push_group(&target.cleanups);

    builder.emit_hop(target.executor, HopRole::CallEntry(site));
    let return_type = ir_type(interner, result);
    let value = builder.emit_apply(return_type.clone(), wrapped, args, Some(site), None);
    builder.emit_hop(prev, HopRole::CallExit(site));
    cleanups.emit(&mut builder, None);

    let returned = (!matches!(return_type, IrType::Unit)).then_some(value);
    builder.terminate_return(returned);

    let name = thunk_name(interner, actor, params, result);
    tracing::trace!(thunk = interner.lookup(name), "built isolation thunk");

    Some(builder.finish(HopSignature {
        name,
        kind: FunctionKind::Thunk,
        params: sig_params,
        return_type,
        is_async: true,
        throws: false,
        domain: IsolationDomain::Unspecified,
    }))
}
