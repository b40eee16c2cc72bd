//! Instruction decoder

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

use crate::cpu::defines::{decode_instruction, Phase};

/// Splits the raw instruction word into opcode, register addresses, and
/// flag. Only active during the decode phase; in every other phase the
/// outputs hold their values.
pub struct Decoder {
    pub module: Module,
    pub instruction: Input<u16>,
    pub phase: Input<u8>,
    pub opcode: Output<u8>,
    pub rs: Output<u8>,
    pub rt: Output<u8>,
    pub flag: Output<bool>,
}

impl Decoder {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let decoder = Rc::new(RefCell::new(Self {
            instruction: Input::new("instruction", &module),
            phase: Input::new("phase", &module),
            opcode: Output::new("opcode", &module),
            rs: Output::new("rs", &module),
            rt: Output::new("rt", &module),
            flag: Output::new("flag", &module),
            module,
        }));
        let proc = sim.process(&decoder, &decoder.borrow().module, "evaluate", Self::evaluate);
        {
            let d = decoder.borrow();
            sim.add_sensitivity(&proc, ports![d.instruction, d.phase])?;
            sim.add_producer(&proc, ports![d.opcode, d.rs, d.rt, d.flag])?;
        }
        Ok(decoder)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        if Phase::from_code(self.phase.get()?) != Phase::Decode {
            return Ok(());
        }
        let raw = self.instruction.get()?;
        let (opcode, rs, rt, flag) = decode_instruction(raw);

        tracing::debug!(
            "{}: {:#06x} -> opcode:{:#04x} rs:{:#03x} rt:{:#03x} flag:{}",
            self.module.path(),
            raw,
            opcode,
            rs,
            rt,
            flag
        );

        self.opcode.set(sim, opcode)?;
        self.rs.set(sim, rs)?;
        self.rt.set(sim, rt)?;
        self.flag.set(sim, flag != 0)
    }
}
