//! Periodic timer

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

/// Toggles its trigger output at a fixed interval. A lighter alternative
/// to `Clock` when only a periodic wakeup is needed.
pub struct Timer {
    pub module: Module,
    pub trigger: Output<bool>,
    period: Time,
    proc: Option<ProcessInfo>,
}

impl Timer {
    pub fn new(sim: &mut Simulation, name: &str, period: Time) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let timer = Rc::new(RefCell::new(Self {
            trigger: Output::new("trigger", &module),
            module,
            period,
            proc: None,
        }));
        let proc = sim.process(&timer, &timer.borrow().module, "evaluate", Self::evaluate);
        sim.schedule_after(&proc, period);
        {
            let t = timer.borrow();
            sim.add_producer(&proc, ports![t.trigger])?;
        }
        timer.borrow_mut().proc = Some(proc);
        Ok(timer)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let next = !self.trigger.get()?;
        self.trigger.set(sim, next)?;
        if let Some(proc) = self.proc.clone() {
            sim.schedule_after(&proc, self.period);
        }
        Ok(())
    }
}
