//! Control unit

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

use crate::cpu::defines::{Opcode, Phase};

/// Derives the write-back control lines from the decoded opcode.
///
/// Only phase changes wake the process; the opcode is a consumer so the
/// cycle detector sees the read. Enables assert during writeback only:
/// ALU-class results go to the register file, loads route memory to the
/// register file with `rt` as destination, stores raise `mem_write`, and
/// everything else performs no write-back.
pub struct ControlUnit {
    pub module: Module,
    pub opcode: Input<u8>,
    pub phase: Input<u8>,
    pub alu_op: Output<u8>,
    pub reg_write: Output<bool>,
    pub mem_write: Output<bool>,
    pub mem_to_reg: Output<bool>,
    pub rt_as_dest: Output<bool>,
}

impl ControlUnit {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let control = Rc::new(RefCell::new(Self {
            opcode: Input::new("opcode", &module),
            phase: Input::new("phase", &module),
            alu_op: Output::new("alu_op", &module),
            reg_write: Output::new("reg_write", &module),
            mem_write: Output::new("mem_write", &module),
            mem_to_reg: Output::new("mem_to_reg", &module),
            rt_as_dest: Output::new("rt_as_dest", &module),
            module,
        }));
        let proc = sim.process(&control, &control.borrow().module, "evaluate", Self::evaluate);
        {
            let c = control.borrow();
            sim.add_sensitivity(&proc, ports![c.phase])?;
            sim.add_consumer(&proc, ports![c.opcode])?;
            sim.add_producer(
                &proc,
                ports![c.alu_op, c.reg_write, c.mem_write, c.mem_to_reg, c.rt_as_dest],
            )?;
        }
        Ok(control)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let code = self.opcode.get()?;
        let phase = Phase::from_code(self.phase.get()?);

        self.alu_op.set(sim, code)?;

        let (reg_write, mem_write, mem_to_reg, rt_as_dest) = if phase == Phase::Writeback {
            match Opcode::from_code(code) {
                Some(Opcode::Alu(_)) => (true, false, false, false),
                Some(Opcode::MemLoad) => (true, false, true, true),
                Some(Opcode::MemStore) => (false, true, false, false),
                _ => (false, false, false, false),
            }
        } else {
            (false, false, false, false)
        };

        tracing::debug!(
            "{}: {:?} opcode:{:#04x} -> reg_write:{} mem_write:{} mem_to_reg:{} rt_as_dest:{}",
            self.module.path(),
            phase,
            code,
            reg_write,
            mem_write,
            mem_to_reg,
            rt_as_dest
        );

        self.reg_write.set(sim, reg_write)?;
        self.mem_write.set(sim, mem_write)?;
        self.mem_to_reg.set(sim, mem_to_reg)?;
        self.rt_as_dest.set(sim, rt_as_dest)
    }
}
