//! Textual Hop IR, in a SIL-like syntax.
//!
//! ```text
//! // isolation: global actor GlobalActor
//! sil @testGlobalActor : $@async () -> () {
//! bb0:
//!   %0 = function_ref @GlobalActor.shared.unsafeMutableAddressor
//!   ...
//!   hop_to_executor %5 : $MyActor  // function entry
//!   return
//! }
//! ```
//!
//! Used by the driver and by tests that compare whole functions.

use std::fmt;

use hop_ir::StringInterner;

use crate::ir::{
    FunctionKind, HopBlock, HopFunction, HopInstr, HopRole, HopTerminator, HopVarId, IrType,
    ParamConvention,
};

/// Render `func` to a string.
pub fn print_function(func: &HopFunction, interner: &StringInterner) -> String {
    FunctionPrinter { func, interner }.to_string()
}

/// [`HopFunction`] paired with the interner that can spell its names.
pub struct FunctionPrinter<'a> {
    pub func: &'a HopFunction,
    pub interner: &'a StringInterner,
}

struct DisplayIrType<'a> {
    ty: &'a IrType,
    interner: &'a StringInterner,
}

impl fmt::Display for DisplayIrType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            IrType::Int => f.write_str("Int"),
            IrType::Unit => f.write_str("()"),
            IrType::Value(t) => write!(f, "{}", t.display(self.interner)),
            IrType::Executor => f.write_str("Optional<Builtin.Executor>"),
            IrType::RawPointer => f.write_str("Builtin.RawPointer"),
            IrType::Address(t) => write!(f, "*{}", t.display(self.interner)),
            IrType::Metatype(t) => write!(f, "@thin {}.Type", t.display(self.interner)),
            IrType::Function => f.write_str("@callee_guaranteed fn"),
            IrType::Error => f.write_str("any Error"),
        }
    }
}

struct Vars<'a>(&'a [HopVarId]);

impl fmt::Display for Vars<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "%{}", v.raw())?;
        }
        Ok(())
    }
}

impl FunctionPrinter<'_> {
    fn ty(&self, var: HopVarId) -> DisplayIrType<'_> {
        DisplayIrType {
            ty: self.func.var_type(var),
            interner: self.interner,
        }
    }

    fn header(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = self.func;
        let kind = match func.kind {
            FunctionKind::Function => "",
            FunctionKind::Closure => "[closure] ",
            FunctionKind::Thunk => "[thunk] ",
        };
        writeln!(f, "// isolation: {}", func.domain.describe(self.interner))?;
        write!(f, "sil {kind}@{} : $", self.interner.lookup(func.name))?;
        if func.is_async {
            f.write_str("@async ")?;
        }
        f.write_str("(")?;
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let convention = match param.convention {
                ParamConvention::Trivial => "",
                ParamConvention::Guaranteed => "@guaranteed ",
                ParamConvention::Owned => "@owned ",
            };
            write!(
                f,
                "{convention}{}",
                DisplayIrType {
                    ty: &param.ty,
                    interner: self.interner
                }
            )?;
        }
        write!(
            f,
            ") -> {}",
            DisplayIrType {
                ty: &func.return_type,
                interner: self.interner
            }
        )?;
        if func.throws {
            f.write_str(" throws")?;
        }
        writeln!(f, " {{")
    }

    fn block(&self, f: &mut fmt::Formatter<'_>, block: &HopBlock) -> fmt::Result {
        write!(f, "bb{}", block.id.raw())?;
        if !block.params.is_empty() {
            f.write_str("(")?;
            for (i, (var, ty)) in block.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(
                    f,
                    "%{} : ${}",
                    var.raw(),
                    DisplayIrType {
                        ty,
                        interner: self.interner
                    }
                )?;
            }
            f.write_str(")")?;
        }
        writeln!(f, ":")?;
        for instr in &block.body {
            f.write_str("  ")?;
            self.instr(f, instr)?;
            writeln!(f)?;
        }
        f.write_str("  ")?;
        self.terminator(f, &block.terminator)?;
        writeln!(f)
    }

    fn instr(&self, f: &mut fmt::Formatter<'_>, instr: &HopInstr) -> fmt::Result {
        match instr {
            HopInstr::Literal { dst, value } => {
                write!(f, "%{} = integer_literal $Int, {value}", dst.raw())
            }
            HopInstr::FunctionRef { dst, func } => {
                write!(f, "%{} = function_ref @{}", dst.raw(), self.interner.lookup(*func))
            }
            HopInstr::Metatype { dst, .. } => {
                write!(f, "%{} = metatype ${}", dst.raw(), self.ty(*dst))
            }
            HopInstr::Apply {
                dst,
                func,
                args,
                site,
            } => {
                write!(f, "%{} = apply %{}({})", dst.raw(), func.raw(), Vars(args))?;
                if let Some(site) = site {
                    write!(f, "  // site #{}", site.raw())?;
                }
                Ok(())
            }
            HopInstr::PartialApply {
                dst,
                func,
                captures,
            } => write!(
                f,
                "%{} = partial_apply [callee_guaranteed] %{}({})",
                dst.raw(),
                func.raw(),
                Vars(captures)
            ),
            HopInstr::Construct { dst, args, .. } => write!(
                f,
                "%{} = alloc_ref ${}({})",
                dst.raw(),
                self.ty(*dst),
                Vars(args)
            ),
            HopInstr::PointerToAddress { dst, pointer } => write!(
                f,
                "%{} = pointer_to_address %{} to [strict] ${}",
                dst.raw(),
                pointer.raw(),
                self.ty(*dst)
            ),
            HopInstr::BeginAccess { dst, address } => write!(
                f,
                "%{} = begin_access [read] [dynamic] %{} : ${}",
                dst.raw(),
                address.raw(),
                self.ty(*address)
            ),
            HopInstr::EndAccess { access } => write!(f, "end_access %{}", access.raw()),
            HopInstr::Load { dst, address } => write!(
                f,
                "%{} = load [copy] %{} : ${}",
                dst.raw(),
                address.raw(),
                self.ty(*address)
            ),
            HopInstr::CopyValue { dst, value } => {
                write!(f, "%{} = copy_value %{}", dst.raw(), value.raw())
            }
            HopInstr::BeginBorrow { dst, value } => {
                write!(f, "%{} = begin_borrow %{}", dst.raw(), value.raw())
            }
            HopInstr::EndBorrow { borrow } => write!(f, "end_borrow %{}", borrow.raw()),
            HopInstr::DestroyValue { value } => write!(f, "destroy_value %{}", value.raw()),
            HopInstr::GetCurrentExecutor { dst } => write!(
                f,
                "%{} = builtin \"getCurrentExecutor\"() : ${}",
                dst.raw(),
                self.ty(*dst)
            ),
            HopInstr::HopToExecutor { executor, role } => {
                let role = match role {
                    HopRole::FunctionEntry => "function entry".to_owned(),
                    HopRole::ClosureEntry => "closure entry".to_owned(),
                    HopRole::CallEntry(site) => format!("enter site #{}", site.raw()),
                    HopRole::CallExit(site) => format!("exit site #{}", site.raw()),
                };
                write!(
                    f,
                    "hop_to_executor %{} : ${}  // {role}",
                    executor.raw(),
                    self.ty(*executor)
                )
            }
        }
    }

    fn terminator(&self, f: &mut fmt::Formatter<'_>, terminator: &HopTerminator) -> fmt::Result {
        match terminator {
            HopTerminator::Return { value: None } => f.write_str("return"),
            HopTerminator::Return { value: Some(v) } => write!(f, "return %{}", v.raw()),
            HopTerminator::Jump { target, args } if args.is_empty() => {
                write!(f, "br bb{}", target.raw())
            }
            HopTerminator::Jump { target, args } => {
                write!(f, "br bb{}({})", target.raw(), Vars(args))
            }
            HopTerminator::TryApply {
                func,
                args,
                site,
                normal,
                error,
            } => {
                write!(
                    f,
                    "try_apply %{}({}), normal bb{}, error bb{}",
                    func.raw(),
                    Vars(args),
                    normal.raw(),
                    error.raw()
                )?;
                if let Some(site) = site {
                    write!(f, "  // site #{}", site.raw())?;
                }
                Ok(())
            }
            HopTerminator::Throw { value } => write!(f, "throw %{}", value.raw()),
            HopTerminator::Unreachable => f.write_str("unreachable"),
        }
    }
}

impl fmt::Display for FunctionPrinter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.header(f)?;
        for block in &self.func.blocks {
            self.block(f, block)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests;
