//! Pipeline phase state machine

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

use crate::cpu::defines::Phase;

/// Four-stage phase counter: fetch, decode, execute, writeback. Advances
/// one phase per rising clock edge; reset returns to fetch.
pub struct PhaseFsm {
    pub module: Module,
    pub clk: Input<bool>,
    pub reset: Input<bool>,
    pub phase: Output<u8>,
    state: Phase,
}

impl PhaseFsm {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let fsm = Rc::new(RefCell::new(Self {
            clk: Input::new("clk", &module),
            reset: Input::new("reset", &module),
            phase: Output::new("phase", &module),
            module,
            state: Phase::Fetch,
        }));
        let proc = sim.process(&fsm, &fsm.borrow().module, "evaluate", Self::evaluate);
        {
            let f = fsm.borrow();
            sim.add_sensitivity(&proc, ports![f.clk, f.reset])?;
            sim.add_producer(&proc, ports![f.phase])?;
        }
        Ok(fsm)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        if !self.clk.posedge()? {
            return Ok(());
        }
        if self.reset.get()? {
            self.state = Phase::Fetch;
        } else {
            self.state = self.state.next();
        }
        tracing::debug!("{}: phase -> {:?}", self.module.path(), self.state);
        self.phase.set(sim, self.state.code())
    }
}
