//! Input and output ports
//!
//! Ports are typed handles on a module boundary. A port carries no value:
//! reads and writes delegate to the signal it resolves to. Ports chain
//! through the module hierarchy (inner port bound to an outer port of the
//! same polarity); binding the outer end to a signal resolves the whole
//! chain, and pending subscribers of inputs transfer to the signal.
//!
//! Polarity and value-type mismatches are unrepresentable: `bind` only
//! accepts a same-typed signal or a port of the same polarity.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{SimError, SimResult};
use crate::module::Module;
use crate::process::{ProcessInfo, ProcessKey};
use crate::signal::{Signal, SignalRef, SignalValue};
use crate::sim::Simulation;
use crate::timing::Time;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum PortKind {
    Input,
    Output,
}

impl PortKind {
    fn label(self) -> &'static str {
        match self {
            PortKind::Input => "input",
            PortKind::Output => "output",
        }
    }
}

struct PortCell<T: SignalValue> {
    kind: PortKind,
    name: Rc<str>,
    owner: Rc<str>,
    bound: RefCell<Option<Signal<T>>>,
    children: RefCell<Vec<Rc<PortCell<T>>>>,
    // Subscribers registered before the chain resolves (inputs only).
    pending: RefCell<IndexMap<ProcessKey, ProcessInfo>>,
}

impl<T: SignalValue> PortCell<T> {
    fn new(kind: PortKind, name: &str, owner: &Module) -> Rc<Self> {
        Rc::new(Self {
            kind,
            name: Rc::from(name),
            owner: owner.path_rc(),
            bound: RefCell::new(None),
            children: RefCell::new(Vec::new()),
            pending: RefCell::new(IndexMap::new()),
        })
    }

    fn location(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }

    fn resolved(&self) -> Option<Signal<T>> {
        self.bound.borrow().clone()
    }

    /// Bind this port (and recursively every chained child) to `signal`.
    fn attach(&self, signal: &Signal<T>) -> SimResult<()> {
        tracing::trace!(
            "binding {} `{}` to signal `{}`",
            self.kind.label(),
            self.location(),
            signal.name()
        );
        *self.bound.borrow_mut() = Some(signal.clone());
        if self.kind == PortKind::Input {
            let pending: Vec<ProcessInfo> = self.pending.borrow_mut().drain(..).map(|(_, p)| p).collect();
            for proc in &pending {
                signal.subscribe(proc)?;
            }
        }
        let children: Vec<Rc<PortCell<T>>> = self.children.borrow().clone();
        for child in &children {
            child.attach(signal)?;
        }
        Ok(())
    }

    /// Record `child` as chained onto this port; propagate an existing
    /// binding immediately.
    fn chain(&self, child: &Rc<PortCell<T>>) -> SimResult<()> {
        tracing::trace!(
            "binding {} `{}` to {} `{}`",
            child.kind.label(),
            child.location(),
            self.kind.label(),
            self.location()
        );
        self.children.borrow_mut().push(Rc::clone(child));
        let bound = self.resolved();
        if let Some(signal) = bound {
            child.attach(&signal)?;
        }
        Ok(())
    }

    fn subscribe(&self, proc: &ProcessInfo) -> SimResult<()> {
        if self.kind == PortKind::Output {
            return Err(SimError::SubscribeThroughOutput(self.location()));
        }
        proc.validate()?;
        if let Some(signal) = self.resolved() {
            return signal.subscribe(proc);
        }
        let mut pending = self.pending.borrow_mut();
        if pending.contains_key(&proc.key()) {
            tracing::trace!(
                "process `{}` already subscribed to `{}`",
                proc.label(),
                self.location()
            );
            return Ok(());
        }
        pending.insert(proc.key(), proc.clone());
        Ok(())
    }

    fn unbound_error(&self) -> SimError {
        SimError::UnboundPort {
            kind: self.kind.label(),
            port: self.location(),
        }
    }
}

/// Type-erased port cell, stored by the dependency graph.
trait ErasedPort {
    fn addr(&self) -> usize;
    fn location(&self) -> String;
    fn resolve_erased(&self) -> Option<SignalRef>;
    fn type_label(&self) -> &'static str;
}

impl<T: SignalValue> ErasedPort for PortCell<T> {
    fn addr(&self) -> usize {
        self as *const Self as *const () as usize
    }

    fn location(&self) -> String {
        PortCell::location(self)
    }

    fn resolve_erased(&self) -> Option<SignalRef> {
        self.bound.borrow().as_ref().map(|s| s.as_signal_ref())
    }

    fn type_label(&self) -> &'static str {
        T::type_label()
    }
}

/// Identity of a registered endpoint (port or free-standing signal).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EndpointKey(usize);

#[derive(Clone)]
enum EndpointInner {
    Port(Rc<dyn ErasedPort>),
    Signal(SignalRef),
}

/// Type-erased endpoint handle: what the dependency graph stores. The
/// concrete signal behind a port is resolved lazily, at analysis time,
/// because ports may be registered before they are bound.
#[derive(Clone)]
pub struct EndpointRef(EndpointInner);

impl EndpointRef {
    pub fn key(&self) -> EndpointKey {
        match &self.0 {
            EndpointInner::Port(port) => EndpointKey(port.addr()),
            EndpointInner::Signal(signal) => EndpointKey(signal.key().0),
        }
    }

    /// Diagnostic location: `module.port` or the signal name.
    pub fn location(&self) -> String {
        match &self.0 {
            EndpointInner::Port(port) => port.location(),
            EndpointInner::Signal(signal) => signal.name().to_string(),
        }
    }

    /// The concrete signal this endpoint reaches, if bound.
    pub fn resolve(&self) -> Option<SignalRef> {
        match &self.0 {
            EndpointInner::Port(port) => port.resolve_erased(),
            EndpointInner::Signal(signal) => Some(signal.clone()),
        }
    }

    pub fn type_label(&self) -> &'static str {
        match &self.0 {
            EndpointInner::Port(port) => port.type_label(),
            EndpointInner::Signal(signal) => signal.type_label(),
        }
    }
}

impl fmt::Debug for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EndpointRef({})", self.location())
    }
}

/// Handle-level type erasure over inputs, outputs, and signals; the
/// registration primitives accept anything implementing this.
pub trait PortLike {
    fn erased(&self) -> EndpointRef;
    fn subscribe(&self, proc: &ProcessInfo) -> SimResult<()>;
    fn location(&self) -> String;
}

/// Targets an `Input<T>` may bind to.
pub trait BindInput<T: SignalValue> {
    fn bind_input(&self, port: &Input<T>) -> SimResult<()>;
}

/// Targets an `Output<T>` may bind to.
pub trait BindOutput<T: SignalValue> {
    fn bind_output(&self, port: &Output<T>) -> SimResult<()>;
}

/// An input port: reads from its resolved signal.
pub struct Input<T: SignalValue> {
    cell: Rc<PortCell<T>>,
}

impl<T: SignalValue> Clone for Input<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: SignalValue> Input<T> {
    pub fn new(name: &str, owner: &Module) -> Self {
        Self {
            cell: PortCell::new(PortKind::Input, name, owner),
        }
    }

    /// Bind to a signal or to an outer input port.
    pub fn bind(&self, target: &impl BindInput<T>) -> SimResult<()> {
        target.bind_input(self)
    }

    pub fn bound(&self) -> bool {
        self.cell.bound.borrow().is_some()
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn get(&self) -> SimResult<T> {
        Ok(self.resolved()?.get())
    }

    pub fn delay(&self) -> SimResult<Time> {
        Ok(self.resolved()?.delay())
    }

    fn resolved(&self) -> SimResult<Signal<T>> {
        self.cell.resolved().ok_or_else(|| self.cell.unbound_error())
    }
}

impl Input<bool> {
    pub fn posedge(&self) -> SimResult<bool> {
        Ok(self.resolved()?.posedge())
    }

    pub fn negedge(&self) -> SimResult<bool> {
        Ok(self.resolved()?.negedge())
    }
}

impl<T: SignalValue> PortLike for Input<T> {
    fn erased(&self) -> EndpointRef {
        EndpointRef(EndpointInner::Port(
            Rc::clone(&self.cell) as Rc<dyn ErasedPort>
        ))
    }

    fn subscribe(&self, proc: &ProcessInfo) -> SimResult<()> {
        self.cell.subscribe(proc)
    }

    fn location(&self) -> String {
        self.cell.location()
    }
}

impl<T: SignalValue> BindInput<T> for Signal<T> {
    fn bind_input(&self, port: &Input<T>) -> SimResult<()> {
        port.cell.attach(self)
    }
}

impl<T: SignalValue> BindInput<T> for Input<T> {
    fn bind_input(&self, port: &Input<T>) -> SimResult<()> {
        self.cell.chain(&port.cell)
    }
}

/// An output port: writes forward to its resolved signal.
pub struct Output<T: SignalValue> {
    cell: Rc<PortCell<T>>,
}

impl<T: SignalValue> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: SignalValue> Output<T> {
    pub fn new(name: &str, owner: &Module) -> Self {
        Self {
            cell: PortCell::new(PortKind::Output, name, owner),
        }
    }

    /// Bind to a signal or to an outer output port.
    pub fn bind(&self, target: &impl BindOutput<T>) -> SimResult<()> {
        target.bind_output(self)
    }

    pub fn bound(&self) -> bool {
        self.cell.bound.borrow().is_some()
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn set(&self, sim: &mut Simulation, value: T) -> SimResult<()> {
        self.resolved()?.set(sim, value);
        Ok(())
    }

    pub fn get(&self) -> SimResult<T> {
        Ok(self.resolved()?.get())
    }

    pub fn delay(&self) -> SimResult<Time> {
        Ok(self.resolved()?.delay())
    }

    fn resolved(&self) -> SimResult<Signal<T>> {
        self.cell.resolved().ok_or_else(|| self.cell.unbound_error())
    }
}

impl<T: SignalValue> PortLike for Output<T> {
    fn erased(&self) -> EndpointRef {
        EndpointRef(EndpointInner::Port(
            Rc::clone(&self.cell) as Rc<dyn ErasedPort>
        ))
    }

    fn subscribe(&self, _proc: &ProcessInfo) -> SimResult<()> {
        Err(SimError::SubscribeThroughOutput(self.cell.location()))
    }

    fn location(&self) -> String {
        self.cell.location()
    }
}

impl<T: SignalValue> BindOutput<T> for Signal<T> {
    fn bind_output(&self, port: &Output<T>) -> SimResult<()> {
        port.cell.attach(self)
    }
}

impl<T: SignalValue> BindOutput<T> for Output<T> {
    fn bind_output(&self, port: &Output<T>) -> SimResult<()> {
        self.cell.chain(&port.cell)
    }
}

impl<T: SignalValue> PortLike for Signal<T> {
    fn erased(&self) -> EndpointRef {
        EndpointRef(EndpointInner::Signal(self.as_signal_ref()))
    }

    fn subscribe(&self, proc: &ProcessInfo) -> SimResult<()> {
        Signal::subscribe(self, proc)
    }

    fn location(&self) -> String {
        self.name().to_string()
    }
}
