//! The simulation context
//!
//! `Simulation` owns everything the C++-style singletons would have
//! owned: the event queue and current time, the initializer set, the
//! process registry, and the dependency graph. Passing it explicitly
//! keeps the kernel strictly single-threaded and lets one OS process
//! host several isolated simulations.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{SimError, SimResult};
use crate::event::EventQueue;
use crate::graph::DependencyGraph;
use crate::module::{Module, ModuleId};
use crate::port::PortLike;
use crate::process::{OwnerRef, ProcessInfo, ProcessKey, ProcessRegistry};
use crate::timing::Time;

/// Counters kept while the scheduler runs.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimStats {
    /// Activations executed.
    pub events_processed: u64,
    /// Batches executed (one per delta cycle).
    pub delta_cycles: u64,
    /// Peak event queue depth.
    pub peak_queue_depth: usize,
}

/// Discrete-event scheduler and registry context.
pub struct Simulation {
    now: Time,
    initialized: bool,
    queue: EventQueue,
    initializers: IndexMap<ProcessKey, ProcessInfo>,
    processes: ProcessRegistry,
    graph: DependencyGraph,
    stats: SimStats,
    next_module: u64,
    cycle_dump: Option<PathBuf>,
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            now: 0,
            initialized: false,
            queue: EventQueue::new(),
            initializers: IndexMap::new(),
            processes: ProcessRegistry::new(),
            graph: DependencyGraph::new(),
            stats: SimStats::default(),
            next_module: 0,
            cycle_dump: Some(PathBuf::from("bad_cycle_graph.dot")),
        }
    }

    /// Current simulation time.
    pub fn time(&self) -> Time {
        self.now
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Where to dump the dependency graph when a bad cycle aborts
    /// initialization; `None` disables the dump.
    pub fn set_cycle_dump(&mut self, path: Option<PathBuf>) {
        self.cycle_dump = path;
    }

    /// Create a top-level module handle.
    pub fn module(&mut self, name: &str) -> Module {
        let id = ModuleId(self.next_module);
        self.next_module += 1;
        let module = Module::root(id, name);
        self.graph.register_module(module.clone());
        module
    }

    /// Create a module handle below `parent`.
    pub fn submodule(&mut self, name: &str, parent: &Module) -> Module {
        let id = ModuleId(self.next_module);
        self.next_module += 1;
        let module = Module::child(id, name, parent);
        self.graph.register_module(module.clone());
        module
    }

    /// Memoise a process for `method` on `owner`: repeated registration
    /// of the same (owner, method) returns the same `ProcessInfo`.
    pub fn process<M: 'static>(
        &mut self,
        owner: &Rc<RefCell<M>>,
        module: &Module,
        method: &'static str,
        body: impl Fn(&mut M, &mut Simulation) -> SimResult<()> + 'static,
    ) -> ProcessInfo {
        let key = ProcessKey::new(Rc::as_ptr(owner) as usize, method);
        let owner_ref = OwnerRef::for_module(module.id(), module.path_rc());
        let target = Rc::clone(owner);
        self.processes.intern(key, owner_ref, method, move || {
            Rc::new(move |sim: &mut Simulation| body(&mut target.borrow_mut(), sim))
        })
    }

    pub(crate) fn registry_mut(&mut self) -> &mut ProcessRegistry {
        &mut self.processes
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.processes
    }

    /// Push an activation at the current time (delta cycle).
    pub fn schedule_now(&mut self, proc: &ProcessInfo) {
        tracing::trace!("[#queue = {:2}] now: {}", self.queue.len(), proc.label());
        self.queue.push(self.now, proc.clone());
    }

    /// Push an activation `delay` time units from now; a zero delay
    /// means a delta cycle at the current time.
    pub fn schedule_after(&mut self, proc: &ProcessInfo, delay: Time) {
        tracing::trace!(
            "[#queue = {:2}] schedule: {} (+{}t)",
            self.queue.len(),
            proc.label(),
            delay
        );
        self.queue.push(self.now + delay, proc.clone());
    }

    /// Run `proc` once during `initialize`; duplicates collapse by key.
    pub fn register_initializer(&mut self, proc: &ProcessInfo) {
        self.initializers
            .entry(proc.key())
            .or_insert_with(|| proc.clone());
    }

    /// Subscribe the process to each port, register it as an
    /// initializer, and record it as a consumer in the dependency graph.
    pub fn add_sensitivity(&mut self, proc: &ProcessInfo, ports: &[&dyn PortLike]) -> SimResult<()> {
        for port in ports {
            port.subscribe(proc)?;
            self.register_initializer(proc);
            self.graph.register_consumer(port.erased(), proc);
        }
        Ok(())
    }

    /// Record the process as a consumer of each port in the dependency
    /// graph only; no subscription, no activation on change. This keeps
    /// reads visible to the cycle detector for processes that are woken
    /// by something else (typically a clock).
    pub fn add_consumer(&mut self, proc: &ProcessInfo, ports: &[&dyn PortLike]) -> SimResult<()> {
        proc.validate()?;
        for port in ports {
            self.graph.register_consumer(port.erased(), proc);
        }
        Ok(())
    }

    /// Record the process as the producer of each port.
    pub fn add_producer(&mut self, proc: &ProcessInfo, ports: &[&dyn PortLike]) -> SimResult<()> {
        proc.validate()?;
        for port in ports {
            self.graph.register_producer(port.erased(), proc);
        }
        Ok(())
    }

    /// Export the dependency graph in DOT form.
    pub fn export_dot(&self, path: impl Into<PathBuf>) -> SimResult<()> {
        self.graph.export_dot_file(path.into())?;
        Ok(())
    }

    /// Check the dependency graph for zero-delay loops, then run every
    /// registered initializer exactly once. Subsequent calls are no-ops.
    ///
    /// The initializer pass seeds the queue: a clock schedules its first
    /// toggle, combinational gates run once to settle their outputs.
    pub fn initialize(&mut self) -> SimResult<()> {
        if self.initialized {
            tracing::trace!("scheduler already initialized, skipping");
            return Ok(());
        }
        self.graph.compute_cycles()?;
        if let Some(cycle) = self.graph.first_bad_cycle().map(|c| c.to_vec()) {
            let report = self.graph.describe_cycle(&cycle);
            tracing::error!("bad cycle detected:\n{}", report);
            if let Some(path) = self.cycle_dump.clone() {
                match self.graph.export_dot_file(&path) {
                    Ok(()) => tracing::error!("dependency graph dumped to {}", path.display()),
                    Err(err) => tracing::warn!("failed to dump dependency graph: {}", err),
                }
            }
            return Err(SimError::CombinationalCycle(report));
        }
        self.initialized = true;
        let initializers: Vec<ProcessInfo> = self.initializers.values().cloned().collect();
        self.initializers.clear();
        if !initializers.is_empty() {
            tracing::debug!("running {} initializer(s)", initializers.len());
            for proc in &initializers {
                proc.call(self)?;
            }
        }
        Ok(())
    }

    /// Run the event loop. `duration == 0` runs until the queue drains;
    /// otherwise events up to and including `now + duration` execute and
    /// anything later stays queued for the next call.
    pub fn run(&mut self, duration: Time) -> SimResult<()> {
        if !self.initialized {
            self.initialize()?;
        }
        let end = if duration == 0 {
            Time::MAX
        } else {
            self.now + duration
        };
        while let Some(time) = self.queue.peek_time() {
            if time > end {
                break;
            }
            debug_assert!(time >= self.now, "scheduler time went backwards");
            self.now = time;
            let batch = self.queue.pop_batch(time);
            self.stats.delta_cycles += 1;
            tracing::trace!(
                "[#queue = {:2}] t={}: batch of {} activation(s)",
                self.queue.len(),
                time,
                batch.len()
            );
            for proc in &batch {
                self.stats.events_processed += 1;
                proc.call(self)?;
            }
        }
        self.stats.peak_queue_depth = self.queue.peak_depth();
        Ok(())
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports;
    use crate::signal::Signal;

    // Minimal inverter used to exercise the scheduler end to end.
    struct Inverter {
        module: Module,
        input: crate::port::Input<bool>,
        output: crate::port::Output<bool>,
        runs: u64,
    }

    impl Inverter {
        fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
            let module = sim.module(name);
            let gate = Rc::new(RefCell::new(Self {
                input: crate::port::Input::new("in", &module),
                output: crate::port::Output::new("out", &module),
                module,
                runs: 0,
            }));
            let proc = sim.process(&gate, &gate.borrow().module, "evaluate", Self::evaluate);
            {
                let g = gate.borrow();
                sim.add_sensitivity(&proc, ports![g.input])?;
                sim.add_producer(&proc, ports![g.output])?;
            }
            Ok(gate)
        }

        fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
            self.runs += 1;
            let value = !self.input.get()?;
            self.output.set(sim, value)
        }
    }

    #[test]
    fn test_initialize_settles_combinational_logic() {
        let mut sim = Simulation::new();
        sim.set_cycle_dump(None);

        let a = Signal::new("a", false);
        let out = Signal::new("out", false);
        let inv = Inverter::new(&mut sim, "inv").unwrap();
        inv.borrow().input.bind(&a).unwrap();
        inv.borrow().output.bind(&out).unwrap();

        sim.initialize().unwrap();
        sim.run(0).unwrap();
        assert_eq!(out.get(), true);
        assert_eq!(inv.borrow().runs, 1);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut sim = Simulation::new();
        sim.set_cycle_dump(None);

        let a = Signal::new("a", false);
        let out = Signal::new("out", false);
        let inv = Inverter::new(&mut sim, "inv").unwrap();
        inv.borrow().input.bind(&a).unwrap();
        inv.borrow().output.bind(&out).unwrap();

        sim.initialize().unwrap();
        sim.initialize().unwrap();
        sim.run(0).unwrap();
        assert_eq!(inv.borrow().runs, 1);
    }

    #[test]
    fn test_run_bounded_leaves_future_events() {
        let mut sim = Simulation::new();
        sim.set_cycle_dump(None);

        let x = Signal::with_delay("x", false, 4);
        let out = Signal::new("out", false);
        let inv = Inverter::new(&mut sim, "inv").unwrap();
        inv.borrow().input.bind(&x).unwrap();
        inv.borrow().output.bind(&out).unwrap();

        sim.initialize().unwrap();
        x.set(&mut sim, true); // commits at t = 4
        sim.run(2).unwrap();
        assert_eq!(x.get(), false);
        assert_eq!(sim.pending_events(), 1);

        sim.run(4).unwrap();
        assert_eq!(x.get(), true);
        assert_eq!(sim.time(), 4);
    }

    #[test]
    fn test_delta_cascade_does_not_advance_time() {
        let mut sim = Simulation::new();
        sim.set_cycle_dump(None);

        let x = Signal::new("x", false);
        let s1 = Signal::new("s1", false);
        let s2 = Signal::new("s2", false);
        let s3 = Signal::new("s3", false);

        let inv1 = Inverter::new(&mut sim, "inv1").unwrap();
        let inv2 = Inverter::new(&mut sim, "inv2").unwrap();
        let inv3 = Inverter::new(&mut sim, "inv3").unwrap();
        inv1.borrow().input.bind(&x).unwrap();
        inv1.borrow().output.bind(&s1).unwrap();
        inv2.borrow().input.bind(&s1).unwrap();
        inv2.borrow().output.bind(&s2).unwrap();
        inv3.borrow().input.bind(&s2).unwrap();
        inv3.borrow().output.bind(&s3).unwrap();

        sim.initialize().unwrap();
        sim.run(0).unwrap();
        // Settled: x=0, s1=1, s2=0, s3=1.
        assert_eq!(s3.get(), true);

        let runs_before = inv3.borrow().runs;
        x.set(&mut sim, true);
        sim.run(0).unwrap();
        assert_eq!(s3.get(), false);
        assert_eq!(sim.time(), 0);
        assert_eq!(inv3.borrow().runs, runs_before + 1);
        assert!(sim.is_idle());
    }

    #[test]
    fn test_same_time_writes_collapse_to_one_activation() {
        // A process sensitive to two signals runs once when both change
        // in the same delta cycle.
        struct TwoInput {
            module: Module,
            a: crate::port::Input<bool>,
            b: crate::port::Input<bool>,
            runs: u64,
        }

        impl TwoInput {
            fn evaluate(&mut self, _sim: &mut Simulation) -> SimResult<()> {
                self.runs += 1;
                Ok(())
            }
        }

        let mut sim = Simulation::new();
        sim.set_cycle_dump(None);
        let sa = Signal::new("sa", false);
        let sb = Signal::new("sb", false);

        let module = sim.module("sink");
        let sink = Rc::new(RefCell::new(TwoInput {
            a: crate::port::Input::new("a", &module),
            b: crate::port::Input::new("b", &module),
            module,
            runs: 0,
        }));
        let proc = sim.process(&sink, &sink.borrow().module, "evaluate", TwoInput::evaluate);
        {
            let s = sink.borrow();
            sim.add_sensitivity(&proc, ports![s.a, s.b]).unwrap();
        }
        sink.borrow().a.bind(&sa).unwrap();
        sink.borrow().b.bind(&sb).unwrap();

        sim.initialize().unwrap();
        sim.run(0).unwrap();
        let runs_before = sink.borrow().runs;

        sa.set(&mut sim, true);
        sb.set(&mut sim, true);
        sim.run(0).unwrap();
        assert_eq!(sink.borrow().runs, runs_before + 1);
    }

    #[test]
    fn test_bad_cycle_aborts_initialize() {
        let mut sim = Simulation::new();
        sim.set_cycle_dump(None);

        let a = Signal::new("a", false);
        let b = Signal::new("b", false);
        let inv1 = Inverter::new(&mut sim, "inv1").unwrap();
        let inv2 = Inverter::new(&mut sim, "inv2").unwrap();
        inv1.borrow().input.bind(&a).unwrap();
        inv1.borrow().output.bind(&b).unwrap();
        inv2.borrow().input.bind(&b).unwrap();
        inv2.borrow().output.bind(&a).unwrap();

        let err = sim.initialize().unwrap_err();
        match err {
            SimError::CombinationalCycle(report) => {
                let names: Vec<&str> = report.signal_names().collect();
                assert!(names.contains(&"a"));
                assert!(names.contains(&"b"));
            }
            other => panic!("expected CombinationalCycle, got {other:?}"),
        }
    }

    #[test]
    fn test_delayed_loop_is_benign() {
        let mut sim = Simulation::new();
        sim.set_cycle_dump(None);

        let x = Signal::with_delay("x", false, 1);
        let inv = Inverter::new(&mut sim, "inv").unwrap();
        inv.borrow().input.bind(&x).unwrap();
        inv.borrow().output.bind(&x).unwrap();

        sim.initialize().unwrap();
        assert!(sim.graph().has_cycle());
    }

    #[test]
    fn test_multiple_producers_rejected() {
        let mut sim = Simulation::new();
        sim.set_cycle_dump(None);

        let a = Signal::new("a", false);
        let b = Signal::new("b", false);
        let shared = Signal::new("shared", false);

        let inv1 = Inverter::new(&mut sim, "inv1").unwrap();
        let inv2 = Inverter::new(&mut sim, "inv2").unwrap();
        inv1.borrow().input.bind(&a).unwrap();
        inv1.borrow().output.bind(&shared).unwrap();
        inv2.borrow().input.bind(&b).unwrap();
        inv2.borrow().output.bind(&shared).unwrap();

        assert!(matches!(
            sim.initialize(),
            Err(SimError::MultipleProducers { .. })
        ));
    }

    #[test]
    fn test_stats_track_activity() {
        let mut sim = Simulation::new();
        sim.set_cycle_dump(None);

        let x = Signal::new("x", false);
        let out = Signal::new("out", false);
        let inv = Inverter::new(&mut sim, "inv").unwrap();
        inv.borrow().input.bind(&x).unwrap();
        inv.borrow().output.bind(&out).unwrap();

        sim.run(0).unwrap();
        x.set(&mut sim, true);
        sim.run(0).unwrap();

        let stats = sim.stats();
        assert!(stats.events_processed >= 1);
        assert!(stats.delta_cycles >= 1);
        assert!(stats.peak_queue_depth >= 1);
    }
}
