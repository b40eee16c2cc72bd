//! Error taxonomy of the simulation kernel
//!
//! Configuration and usage errors are fatal: they propagate out of
//! `initialize`/`run` and abort the simulation. Nothing is caught and
//! silently suppressed; the kernel is deterministic and has no retries.

use crate::graph::CycleReport;

/// Result alias used across the kernel.
pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A loop in the signal graph in which every signal has zero delay.
    #[error("combinational loop with no delay:\n{0}")]
    CombinationalCycle(CycleReport),

    /// A port was read or written before being bound to a signal.
    #[error("{kind} port `{port}` is not bound to a signal")]
    UnboundPort { kind: &'static str, port: String },

    /// Signals are bound *to* by ports; they cannot themselves be bound.
    #[error("cannot bind signal `{0}`: use an input or output port to bind signals")]
    SignalBind(String),

    /// Sensitivities go through inputs or signals, never outputs.
    #[error("cannot subscribe a process through output port `{0}`")]
    SubscribeThroughOutput(String),

    /// A process whose key does not identify an owner and method.
    #[error("invalid process `{0}`: missing owner key or method tag")]
    InvalidProcess(String),

    /// Two distinct producer-registered ports resolved to one signal.
    #[error("signal `{signal}` has more than one producer: `{first}` and `{second}`")]
    MultipleProducers {
        signal: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SimError::UnboundPort {
            kind: "input",
            port: "fa.a".into(),
        };
        assert_eq!(err.to_string(), "input port `fa.a` is not bound to a signal");

        let err = SimError::SignalBind("clk".into());
        assert!(err.to_string().contains("`clk`"));
    }
}
