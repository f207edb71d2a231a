//! Executor runtime model and a Hop IR simulator.
//!
//! The simulator walks one [`HopFunction`] on an [`ExecutorRuntime`],
//! resolving actor values to executors and call outcomes from a
//! [`SimEnv`]. Callees are not entered: each call is recorded with the
//! executor it ran on, which is what hop placement is about.

use std::fmt;

use hop_ir::Name;
use rustc_hash::FxHashMap;

use crate::decl::{DeclTable, SharedAccessor};
use crate::ir::{
    CallSiteId, HopBlockId, HopFunction, HopInstr, HopRole, HopTerminator, HopVarId, IrType,
};

/// A serial executor. `ExecutorId::GENERIC` is the default concurrent
/// executor nonisolated code runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutorId(pub u32);

impl ExecutorId {
    pub const GENERIC: ExecutorId = ExecutorId(0);
}

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == ExecutorId::GENERIC {
            f.write_str("generic")
        } else {
            write!(f, "exec#{}", self.0)
        }
    }
}

/// The two runtime primitives hop insertion relies on.
pub trait ExecutorRuntime {
    /// The executor the current task is running on.
    fn current_executor(&self) -> ExecutorId;

    /// Suspend and resume on `executor`.
    fn switch_to(&mut self, executor: ExecutorId);
}

/// Runtime that records every switch.
#[derive(Clone, Debug)]
pub struct RecordingRuntime {
    current: ExecutorId,
    pub switches: Vec<ExecutorId>,
}

impl RecordingRuntime {
    pub fn starting_on(executor: ExecutorId) -> Self {
        RecordingRuntime {
            current: executor,
            switches: Vec::new(),
        }
    }
}

impl ExecutorRuntime for RecordingRuntime {
    fn current_executor(&self) -> ExecutorId {
        self.current
    }

    fn switch_to(&mut self, executor: ExecutorId) {
        self.switches.push(executor);
        self.current = executor;
    }
}

// ── Environment ─────────────────────────────────────────────────────

/// How a simulated call ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CallOutcome {
    #[default]
    Return,
    Throw,
}

/// A simulated value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SimValue {
    Unit,
    Int(i64),
    /// An actor reference; its executor.
    Actor(ExecutorId),
    /// Result of `getCurrentExecutor`.
    Executor(ExecutorId),
    /// A function reference or closure.
    Function(Option<Name>),
    /// Address of a global actor's storage.
    Pointer(ExecutorId),
    Metatype,
    Error,
}

/// Inputs of one simulation.
#[derive(Clone, Debug, Default)]
pub struct SimEnv {
    /// Entry block parameters, in order.
    pub params: Vec<SimValue>,
    /// Shared-instance accessors, by function name.
    accessors: FxHashMap<Name, ExecutorId>,
    global_actors: FxHashMap<Name, ExecutorId>,
    outcomes: FxHashMap<CallSiteId, CallOutcome>,
    next_executor: u32,
}

impl SimEnv {
    pub fn new() -> Self {
        SimEnv {
            next_executor: 1,
            ..SimEnv::default()
        }
    }

    /// A fresh executor, distinct from every other one handed out.
    pub fn fresh_executor(&mut self) -> ExecutorId {
        let id = ExecutorId(self.next_executor.max(1));
        self.next_executor = id.0 + 1;
        id
    }

    /// Give every global actor its own executor.
    pub fn register_global_actors(&mut self, decls: &DeclTable) {
        for decl in decls.global_actors() {
            let exec = self.fresh_executor();
            let accessor = match decl.shared {
                SharedAccessor::Stored { addressor } => addressor,
                SharedAccessor::Computed { getter } => getter,
            };
            self.accessors.insert(accessor, exec);
            self.global_actors.insert(decl.name, exec);
        }
    }

    pub fn global_executor(&self, actor: Name) -> Option<ExecutorId> {
        self.global_actors.get(&actor).copied()
    }

    pub fn with_param(mut self, value: SimValue) -> Self {
        self.params.push(value);
        self
    }

    pub fn with_outcome(mut self, site: CallSiteId, outcome: CallOutcome) -> Self {
        self.outcomes.insert(site, outcome);
        self
    }
}

// ── Trace ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    Hop { role: HopRole, to: ExecutorId },
    Call { site: CallSiteId, on: ExecutorId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionTrace {
    pub events: Vec<TraceEvent>,
    pub exit_executor: ExecutorId,
    pub threw: bool,
}

impl ExecutionTrace {
    /// Every source call with the executor it ran on.
    pub fn calls(&self) -> impl Iterator<Item = (CallSiteId, ExecutorId)> + '_ {
        self.events.iter().filter_map(|e| match *e {
            TraceEvent::Call { site, on } => Some((site, on)),
            TraceEvent::Hop { .. } => None,
        })
    }

    pub fn hop_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, TraceEvent::Hop { .. }))
            .count()
    }
}

impl fmt::Display for ExecutionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            match event {
                TraceEvent::Hop { role, to } => writeln!(f, "  hop -> {to} ({role:?})")?,
                TraceEvent::Call { site, on } => writeln!(f, "  call #{} on {on}", site.raw())?,
            }
        }
        let how = if self.threw { "throw" } else { "return" };
        write!(f, "  {how} on {}", self.exit_executor)
    }
}

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimError {
    UndefinedVar(HopVarId),
    /// A hop operand that does not denote an executor.
    NotAnExecutor(HopVarId),
    UnknownAccessor(Name),
    MissingParam(usize),
    Unreachable(HopBlockId),
    StepLimit,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::UndefinedVar(v) => write!(f, "%{} used before definition", v.raw()),
            SimError::NotAnExecutor(v) => write!(f, "hop operand %{} is not an executor", v.raw()),
            SimError::UnknownAccessor(_) => write!(f, "call to an unknown shared-instance accessor"),
            SimError::MissingParam(i) => write!(f, "no value for parameter {i}"),
            SimError::Unreachable(b) => write!(f, "reached `unreachable` in bb{}", b.raw()),
            SimError::StepLimit => write!(f, "step limit exceeded"),
        }
    }
}

impl std::error::Error for SimError {}

// ── Simulator ───────────────────────────────────────────────────────

const STEP_LIMIT: usize = 100_000;

struct Simulator<'a, R> {
    func: &'a HopFunction,
    env: &'a SimEnv,
    runtime: &'a mut R,
    values: Vec<Option<SimValue>>,
    events: Vec<TraceEvent>,
    next_actor: u32,
}

/// Run `func` from its entry block on `runtime`.
pub fn simulate<R: ExecutorRuntime>(
    func: &HopFunction,
    env: &SimEnv,
    runtime: &mut R,
) -> Result<ExecutionTrace, SimError> {
    let mut sim = Simulator {
        func,
        env,
        runtime,
        values: vec![None; func.var_types.len()],
        events: Vec::new(),
        next_actor: env.next_executor.max(1),
    };
    sim.run()
}

impl<R: ExecutorRuntime> Simulator<'_, R> {
    fn run(&mut self) -> Result<ExecutionTrace, SimError> {
        let func = self.func;
        let entry = func.block(func.entry);
        for (i, (var, _)) in entry.params.iter().enumerate() {
            let value = *self.env.params.get(i).ok_or(SimError::MissingParam(i))?;
            self.set(*var, value);
        }

        let mut block_id = func.entry;
        for _ in 0..STEP_LIMIT {
            let block = func.block(block_id);
            for instr in &block.body {
                self.step(instr)?;
            }
            match &block.terminator {
                HopTerminator::Return { .. } => return Ok(self.finish(false)),
                HopTerminator::Throw { .. } => return Ok(self.finish(true)),
                HopTerminator::Unreachable => return Err(SimError::Unreachable(block_id)),
                HopTerminator::Jump { target, args } => {
                    let values = args
                        .iter()
                        .map(|&a| self.get(a))
                        .collect::<Result<Vec<_>, _>>()?;
                    self.bind_params(*target, &values);
                    block_id = *target;
                }
                HopTerminator::TryApply {
                    site,
                    normal,
                    error,
                    ..
                } => {
                    if let Some(site) = site {
                        self.record_call(*site);
                    }
                    let outcome = site
                        .and_then(|s| self.env.outcomes.get(&s).copied())
                        .unwrap_or_default();
                    block_id = match outcome {
                        CallOutcome::Return => {
                            let result = self.result_value(*normal);
                            self.bind_params(*normal, &[result]);
                            *normal
                        }
                        CallOutcome::Throw => {
                            self.bind_params(*error, &[SimValue::Error]);
                            *error
                        }
                    };
                }
            }
        }
        Err(SimError::StepLimit)
    }

    fn finish(&mut self, threw: bool) -> ExecutionTrace {
        ExecutionTrace {
            events: std::mem::take(&mut self.events),
            exit_executor: self.runtime.current_executor(),
            threw,
        }
    }

    fn step(&mut self, instr: &HopInstr) -> Result<(), SimError> {
        match instr {
            HopInstr::Literal { dst, value } => self.set(*dst, SimValue::Int(*value)),
            HopInstr::FunctionRef { dst, func } => self.set(*dst, SimValue::Function(Some(*func))),
            HopInstr::Metatype { dst, .. } => self.set(*dst, SimValue::Metatype),
            HopInstr::PartialApply { dst, .. } => self.set(*dst, SimValue::Function(None)),
            HopInstr::Construct { dst, .. } => {
                let exec = self.fresh_actor();
                self.set(*dst, SimValue::Actor(exec));
            }
            HopInstr::Apply { dst, func, site, .. } => {
                if let Some(site) = site {
                    self.record_call(*site);
                    let value = self.fresh_value(*dst);
                    self.set(*dst, value);
                } else {
                    // Shared-instance accessor.
                    let SimValue::Function(Some(name)) = self.get(*func)? else {
                        return Err(SimError::UndefinedVar(*func));
                    };
                    let exec = *self
                        .env
                        .accessors
                        .get(&name)
                        .ok_or(SimError::UnknownAccessor(name))?;
                    let value = match self.func.var_type(*dst) {
                        IrType::RawPointer => SimValue::Pointer(exec),
                        _ => SimValue::Actor(exec),
                    };
                    self.set(*dst, value);
                }
            }
            HopInstr::PointerToAddress { dst, pointer: src }
            | HopInstr::BeginAccess { dst, address: src }
            | HopInstr::CopyValue { dst, value: src }
            | HopInstr::BeginBorrow { dst, value: src } => {
                let value = self.get(*src)?;
                self.set(*dst, value);
            }
            HopInstr::Load { dst, address } => {
                let value = match self.get(*address)? {
                    SimValue::Pointer(exec) => SimValue::Actor(exec),
                    other => other,
                };
                self.set(*dst, value);
            }
            HopInstr::EndAccess { .. } | HopInstr::EndBorrow { .. } | HopInstr::DestroyValue { .. } => {}
            HopInstr::GetCurrentExecutor { dst } => {
                let exec = self.runtime.current_executor();
                self.set(*dst, SimValue::Executor(exec));
            }
            HopInstr::HopToExecutor { executor, role } => {
                let to = match self.get(*executor)? {
                    SimValue::Actor(e) | SimValue::Executor(e) => e,
                    _ => return Err(SimError::NotAnExecutor(*executor)),
                };
                self.runtime.switch_to(to);
                self.events.push(TraceEvent::Hop { role: *role, to });
            }
        }
        Ok(())
    }

    fn record_call(&mut self, site: CallSiteId) {
        let on = self.runtime.current_executor();
        tracing::trace!(site = site.raw(), %on, "simulated call");
        self.events.push(TraceEvent::Call { site, on });
    }

    /// Result of a call landing in `var`'s type.
    fn fresh_value(&mut self, var: HopVarId) -> SimValue {
        match self.func.var_type(var) {
            IrType::Int => SimValue::Int(0),
            IrType::Value(_) => SimValue::Actor(self.fresh_actor()),
            IrType::Function => SimValue::Function(None),
            _ => SimValue::Unit,
        }
    }

    fn result_value(&mut self, normal: HopBlockId) -> SimValue {
        match self.func.block(normal).params.first() {
            Some(&(var, _)) => self.fresh_value(var),
            None => SimValue::Unit,
        }
    }

    fn fresh_actor(&mut self) -> ExecutorId {
        let id = ExecutorId(self.next_actor);
        self.next_actor += 1;
        id
    }

    fn bind_params(&mut self, block: HopBlockId, values: &[SimValue]) {
        let func = self.func;
        let params = &func.block(block).params;
        for (&(var, _), &value) in params.iter().zip(values) {
            self.values[var.index()] = Some(value);
        }
    }

    fn set(&mut self, var: HopVarId, value: SimValue) {
        self.values[var.index()] = Some(value);
    }

    fn get(&self, var: HopVarId) -> Result<SimValue, SimError> {
        self.values
            .get(var.index())
            .copied()
            .flatten()
            .ok_or(SimError::UndefinedVar(var))
    }
}

#[cfg(test)]
mod tests;
