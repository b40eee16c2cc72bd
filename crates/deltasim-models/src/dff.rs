//! D flip-flop

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

/// Edge-triggered D flip-flop with synchronous enable and reset.
///
/// Only the clock wakes the process; `d`, `enable`, and `reset` are
/// registered as consumers so the cycle detector sees the reads without
/// them triggering activations. Reset dominates enable.
pub struct DFlipFlop {
    pub module: Module,
    pub clk: Input<bool>,
    pub d: Input<bool>,
    pub enable: Input<bool>,
    pub reset: Input<bool>,
    pub q: Output<bool>,
    pub q_not: Output<bool>,
}

impl DFlipFlop {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let dff = Rc::new(RefCell::new(Self {
            clk: Input::new("clk", &module),
            d: Input::new("d", &module),
            enable: Input::new("enable", &module),
            reset: Input::new("reset", &module),
            q: Output::new("q", &module),
            q_not: Output::new("q_not", &module),
            module,
        }));
        let proc = sim.process(&dff, &dff.borrow().module, "evaluate", Self::evaluate);
        {
            let f = dff.borrow();
            sim.add_sensitivity(&proc, ports![f.clk])?;
            sim.add_consumer(&proc, ports![f.d, f.enable, f.reset])?;
            sim.add_producer(&proc, ports![f.q, f.q_not])?;
        }
        Ok(dff)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        if !self.clk.posedge()? {
            return Ok(());
        }

        let mut next_q = self.q.get()?;
        if self.reset.get()? {
            next_q = false;
        } else if self.enable.get()? {
            next_q = self.d.get()?;
        }

        tracing::debug!(
            "{}: clk rising, enable:{} reset:{} d:{} -> q:{}",
            self.module.path(),
            self.enable.get()?,
            self.reset.get()?,
            self.d.get()?,
            next_q
        );

        self.q.set(sim, next_q)?;
        self.q_not.set(sim, !next_q)
    }
}
