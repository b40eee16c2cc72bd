//! Program counter

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

use crate::alu::Alu;
use crate::cpu::defines::Phase;

/// Clocked program counter.
///
/// The address only moves on a rising edge during the writeback phase:
/// `load` and `jump_enable` take `next_addr`, `branch_enable` takes it
/// when the ALU comparison flag is set, otherwise the counter
/// increments. Reset forces zero regardless of phase.
pub struct ProgramCounter {
    pub module: Module,
    pub clk: Input<bool>,
    pub reset: Input<bool>,
    pub load: Input<bool>,
    pub jump_enable: Input<bool>,
    pub branch_enable: Input<bool>,
    pub next_addr: Input<u16>,
    pub alu_status: Input<u8>,
    pub phase: Input<u8>,
    pub addr: Output<u16>,
    pc: u16,
}

impl ProgramCounter {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let counter = Rc::new(RefCell::new(Self {
            clk: Input::new("clk", &module),
            reset: Input::new("reset", &module),
            load: Input::new("load", &module),
            jump_enable: Input::new("jump_enable", &module),
            branch_enable: Input::new("branch_enable", &module),
            next_addr: Input::new("next_addr", &module),
            alu_status: Input::new("alu_status", &module),
            phase: Input::new("phase", &module),
            addr: Output::new("addr", &module),
            module,
            pc: 0,
        }));
        let proc = sim.process(&counter, &counter.borrow().module, "evaluate", Self::evaluate);
        {
            let p = counter.borrow();
            sim.add_sensitivity(&proc, ports![p.clk, p.reset])?;
            sim.add_consumer(
                &proc,
                ports![p.load, p.jump_enable, p.branch_enable, p.next_addr, p.alu_status, p.phase],
            )?;
            sim.add_producer(&proc, ports![p.addr])?;
        }
        Ok(counter)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        if !self.clk.posedge()? {
            return Ok(());
        }

        if self.reset.get()? {
            self.pc = 0;
            tracing::debug!("{}: reset -> addr:{:#06x}", self.module.path(), 0);
            return self.addr.set(sim, 0);
        }

        if Phase::from_code(self.phase.get()?) == Phase::Writeback {
            if self.load.get()? || self.jump_enable.get()? {
                self.pc = self.next_addr.get()?;
                tracing::debug!("{}: load -> addr:{:#06x}", self.module.path(), self.pc);
            } else if self.branch_enable.get()?
                && self.alu_status.get()? & Alu::FLAG_CMP_TRUE != 0
            {
                self.pc = self.next_addr.get()?;
                tracing::debug!("{}: branch -> addr:{:#06x}", self.module.path(), self.pc);
            } else {
                self.pc = self.pc.wrapping_add(1);
                tracing::debug!("{}: increment -> addr:{:#06x}", self.module.path(), self.pc);
            }
        }
        self.addr.set(sim, self.pc)
    }
}
