//! CPU datapath blocks
//!
//! The building blocks of a four-phase (fetch, decode, execute,
//! writeback) datapath: the phase state machine, instruction decoder,
//! control unit, and program counter, plus the shared instruction
//! layout. Together with `RegisterFile`, `Alu`, `Rom`, `Ram`, and
//! `Mux2to1` they assemble into a complete processor; the wiring lives
//! in harness code, which owns the signals.

pub mod control_unit;
pub mod decoder;
pub mod defines;
pub mod phase_fsm;
pub mod program_counter;

pub use control_unit::ControlUnit;
pub use decoder::Decoder;
pub use defines::{decode_instruction, encode_instruction, Opcode, Phase, NUM_PHASES};
pub use phase_fsm::PhaseFsm;
pub use program_counter::ProgramCounter;
