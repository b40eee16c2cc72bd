//! DeltaSim model library
//!
//! Ready-made modules built on the `deltasim-core` kernel: combinational
//! gates, a full adder, a generic multiplexer, a D flip-flop, clock and
//! timer generators, a probe, and the blocks of a four-phase processor
//! datapath (ALU, ROM, RAM, register file, phase FSM, decoder, control
//! unit, program counter).
//!
//! Every model follows the same shape: a struct holding its `Module`
//! handle and ports, a `new(sim, name)` constructor that registers its
//! process with the scheduler and dependency graph, and a private
//! `evaluate` body. Ports are public; harness code binds them to
//! signals after construction.

pub mod adder;
pub mod alu;
pub mod clock;
pub mod cpu;
pub mod dff;
pub mod gates;
pub mod memory;
pub mod mux;
pub mod probe;
pub mod regfile;
pub mod timer;

pub use adder::FullAdder;
pub use alu::{Alu, AluOp};
pub use clock::{Clock, ClockConfig};
pub use cpu::{ControlUnit, Decoder, Opcode, Phase, PhaseFsm, ProgramCounter};
pub use dff::DFlipFlop;
pub use gates::{AndGate, NandGate, NotGate, OrGate, XorGate};
pub use memory::{Ram, Rom};
pub use mux::Mux2to1;
pub use probe::Probe;
pub use regfile::RegisterFile;
pub use timer::Timer;

/// Prelude for common imports
pub mod prelude {
    pub use crate::adder::*;
    pub use crate::alu::*;
    pub use crate::clock::*;
    pub use crate::cpu::*;
    pub use crate::dff::*;
    pub use crate::gates::*;
    pub use crate::memory::*;
    pub use crate::mux::*;
    pub use crate::probe::*;
    pub use crate::regfile::*;
    pub use crate::timer::*;
}
