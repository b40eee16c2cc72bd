//! Typed signals with delayed-write semantics
//!
//! A `Signal<T>` is a cheaply-cloneable handle on a shared value cell.
//! Signals are free-standing: harness code owns them and ports bind to
//! them. Writing through `set` either commits immediately (delay 0) and
//! wakes every subscriber in the current delta cycle, or stores the value
//! and commits it after the signal's propagation delay.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{SimError, SimResult};
use crate::port::PortLike;
use crate::process::{OwnerRef, ProcessInfo, ProcessKey};
use crate::sim::Simulation;
use crate::timing::Time;

/// Values a signal can carry.
///
/// `differs` is the change-detection hook; the default is plain
/// inequality. Floating-point implementations use a relative-epsilon
/// comparison so rounding noise never wakes a process.
pub trait SignalValue: Clone + PartialEq + fmt::Debug + 'static {
    fn differs(&self, other: &Self) -> bool {
        self != other
    }

    /// Short label used in diagnostics and DOT output.
    fn type_label() -> &'static str {
        std::any::type_name::<Self>()
    }
}

macro_rules! impl_signal_value {
    ($($ty:ty),* $(,)?) => {
        $(impl SignalValue for $ty {})*
    };
}

impl_signal_value!(bool, char, u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

macro_rules! impl_float_signal_value {
    ($($ty:ty),*) => {
        $(impl SignalValue for $ty {
            fn differs(&self, other: &Self) -> bool {
                let diff = (self - other).abs();
                let scale = self.abs().max(other.abs()).max(1.0);
                diff > <$ty>::EPSILON * scale
            }
        })*
    };
}

impl_float_signal_value!(f32, f64);

pub(crate) struct SignalCell<T: SignalValue> {
    name: Rc<str>,
    value: RefCell<T>,
    last_value: RefCell<T>,
    stored_value: RefCell<T>,
    delay: Cell<Time>,
    subscribers: RefCell<IndexMap<ProcessKey, ProcessInfo>>,
}

impl<T: SignalValue> SignalCell<T> {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn subscribe(&self, proc: &ProcessInfo) -> SimResult<()> {
        proc.validate()?;
        let mut subscribers = self.subscribers.borrow_mut();
        if subscribers.contains_key(&proc.key()) {
            tracing::trace!("process `{}` already subscribed to `{}`", proc.label(), self.name);
            return Ok(());
        }
        tracing::trace!("subscribing `{}` to `{}`", proc.label(), self.name);
        subscribers.insert(proc.key(), proc.clone());
        Ok(())
    }

    /// Immediate commit: update value/last_value and wake subscribers at
    /// the current time. No-op when the value does not differ.
    pub(crate) fn commit(&self, sim: &mut Simulation, new_value: T) {
        if !new_value.differs(&self.value.borrow()) {
            return;
        }
        let previous = self.value.replace(new_value);
        *self.last_value.borrow_mut() = previous;
        tracing::trace!(
            "{}: {:?} -> {:?} (now)",
            self.name,
            self.last_value.borrow(),
            self.value.borrow()
        );
        for proc in self.subscribers.borrow().values() {
            sim.schedule_now(proc);
        }
    }
}

/// Type-erased view of a concrete signal.
pub(crate) trait AnySignal {
    fn addr(&self) -> usize;
    fn signal_name(&self) -> &str;
    fn delay(&self) -> Time;
    fn type_label(&self) -> &'static str;
    fn subscribe_erased(&self, proc: &ProcessInfo) -> SimResult<()>;
}

impl<T: SignalValue> AnySignal for SignalCell<T> {
    fn addr(&self) -> usize {
        self as *const Self as *const () as usize
    }

    fn signal_name(&self) -> &str {
        &self.name
    }

    fn delay(&self) -> Time {
        self.delay.get()
    }

    fn type_label(&self) -> &'static str {
        T::type_label()
    }

    fn subscribe_erased(&self, proc: &ProcessInfo) -> SimResult<()> {
        self.subscribe(proc)
    }
}

/// Identity of a concrete signal, used as a key in the dependency graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SignalKey(pub(crate) usize);

/// Type-erased handle to a concrete signal.
#[derive(Clone)]
pub struct SignalRef(pub(crate) Rc<dyn AnySignal>);

impl SignalRef {
    pub fn key(&self) -> SignalKey {
        SignalKey(self.0.addr())
    }

    pub fn name(&self) -> &str {
        self.0.signal_name()
    }

    pub fn delay(&self) -> Time {
        self.0.delay()
    }

    pub fn type_label(&self) -> &'static str {
        self.0.type_label()
    }

    pub(crate) fn subscribe(&self, proc: &ProcessInfo) -> SimResult<()> {
        self.0.subscribe_erased(proc)
    }
}

impl fmt::Debug for SignalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignalRef({}: {}, delay {})",
            self.name(),
            self.type_label(),
            self.delay()
        )
    }
}

/// A typed value cell with change detection and a subscriber set.
pub struct Signal<T: SignalValue> {
    cell: Rc<SignalCell<T>>,
}

impl<T: SignalValue> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: SignalValue> Signal<T> {
    /// A signal with zero write delay.
    pub fn new(name: &str, initial: T) -> Self {
        Self::with_delay(name, initial, 0)
    }

    /// A signal whose writes commit `delay` time units after `set`.
    pub fn with_delay(name: &str, initial: T, delay: Time) -> Self {
        Self {
            cell: Rc::new(SignalCell {
                name: Rc::from(name),
                value: RefCell::new(initial.clone()),
                last_value: RefCell::new(initial.clone()),
                stored_value: RefCell::new(initial),
                delay: Cell::new(delay),
                subscribers: RefCell::new(IndexMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.cell.name()
    }

    /// Reset value and last_value without waking any process.
    pub fn initialize(&self, value: T) {
        *self.cell.value.borrow_mut() = value.clone();
        *self.cell.last_value.borrow_mut() = value.clone();
        *self.cell.stored_value.borrow_mut() = value;
    }

    pub fn get(&self) -> T {
        self.cell.value.borrow().clone()
    }

    /// The value held immediately before the most recent change.
    pub fn last_value(&self) -> T {
        self.cell.last_value.borrow().clone()
    }

    pub fn delay(&self) -> Time {
        self.cell.delay.get()
    }

    pub fn set_delay(&self, delay: Time) {
        self.cell.delay.set(delay);
    }

    /// True iff the value differs from the one before the last change.
    pub fn has_changed(&self) -> bool {
        self.cell
            .value
            .borrow()
            .differs(&self.cell.last_value.borrow())
    }

    /// Write a value: immediate commit when the signal's delay is zero,
    /// otherwise a delayed commit at `now + delay`.
    pub fn set(&self, sim: &mut Simulation, value: T) {
        let delay = self.cell.delay.get();
        if delay > 0 {
            self.set_delayed(sim, value, delay);
        } else {
            self.cell.commit(sim, value);
        }
    }

    fn set_delayed(&self, sim: &mut Simulation, value: T, delay: Time) {
        tracing::trace!(
            "{}: {:?} -> {:?} (+{}t)",
            self.cell.name,
            self.cell.value.borrow(),
            value,
            delay
        );
        *self.cell.stored_value.borrow_mut() = value;
        let key = ProcessKey::new(Rc::as_ptr(&self.cell) as usize, "apply_stored");
        let cell = Rc::clone(&self.cell);
        let owner = OwnerRef::anonymous(Rc::clone(&self.cell.name));
        let proc = sim.registry_mut().intern(key, owner, "apply_stored", move || {
            Rc::new(move |sim: &mut Simulation| {
                let value = cell.stored_value.borrow().clone();
                cell.commit(sim, value);
                Ok(())
            })
        });
        sim.schedule_after(&proc, delay);
    }

    /// Idempotent by process key; rejects a process with an invalid key.
    pub fn subscribe(&self, proc: &ProcessInfo) -> SimResult<()> {
        self.cell.subscribe(proc)
    }

    /// Signals are bound *to* by ports; asking a signal to bind is a
    /// usage error.
    pub fn bind(&self, _target: &dyn PortLike) -> SimResult<()> {
        Err(SimError::SignalBind(self.cell.name.to_string()))
    }

    pub fn subscriber_count(&self) -> usize {
        self.cell.subscribers.borrow().len()
    }

    pub(crate) fn as_signal_ref(&self) -> SignalRef {
        SignalRef(Rc::clone(&self.cell) as Rc<dyn AnySignal>)
    }
}

impl Signal<bool> {
    /// True for exactly the activations following a low-to-high change.
    pub fn posedge(&self) -> bool {
        *self.cell.value.borrow() && !*self.cell.last_value.borrow()
    }

    /// True for exactly the activations following a high-to-low change.
    pub fn negedge(&self) -> bool {
        !*self.cell.value.borrow() && *self.cell.last_value.borrow()
    }
}

impl<T: SignalValue> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name())
            .field("value", &self.get())
            .field("delay", &self.delay())
            .finish()
    }
}
