//! DeltaSim Core: Discrete-Event Simulation Kernel
//!
//! This crate provides the engine for hardware-like discrete-event
//! models: typed signals with delayed-write semantics, input/output
//! ports that chain through a module hierarchy, a delta-cycle scheduler,
//! and a dependency graph that rejects zero-delay combinational loops
//! before the first event runs.
//!
//! The kernel is strictly single-threaded and cooperative: processes are
//! ordinary procedures that run to completion and communicate only
//! through signals. All mutating entry points go through a `Simulation`
//! context, so one OS process can host several isolated simulations.

pub mod error;
pub mod event;
pub mod graph;
pub mod module;
pub mod port;
pub mod process;
pub mod signal;
pub mod sim;
pub mod timing;

pub use error::{SimError, SimResult};
pub use event::{Event, EventQueue};
pub use graph::{CycleEntry, CycleReport, DependencyGraph};
pub use module::{Module, ModuleId};
pub use port::{BindInput, BindOutput, EndpointKey, EndpointRef, Input, Output, PortLike};
pub use process::{ProcessFn, ProcessInfo, ProcessKey, ProcessRegistry};
pub use signal::{Signal, SignalKey, SignalRef, SignalValue};
pub use sim::{SimStats, Simulation};
pub use timing::{
    format_time, microseconds, milliseconds, nanoseconds, seconds, Time, MICROSECOND, MILLISECOND,
    NANOSECOND, SECOND,
};

/// Variadic helper for the registration primitives: coerces a list of
/// ports and signals into the `&[&dyn PortLike]` slice they accept.
///
/// ```ignore
/// sim.add_sensitivity(&proc, ports![gate.a, gate.b, gate.cin])?;
/// ```
#[macro_export]
macro_rules! ports {
    ($($port:expr),+ $(,)?) => {
        &[$(&$port as &dyn $crate::port::PortLike),+]
    };
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{SimError, SimResult};
    pub use crate::module::Module;
    pub use crate::port::{Input, Output, PortLike};
    pub use crate::ports;
    pub use crate::process::ProcessInfo;
    pub use crate::signal::{Signal, SignalValue};
    pub use crate::sim::{SimStats, Simulation};
    pub use crate::timing::{
        format_time, microseconds, milliseconds, nanoseconds, seconds, Time,
    };
}
