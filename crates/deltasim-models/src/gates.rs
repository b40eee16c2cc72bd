//! Combinational logic gates

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

/// Inverter: `out = !in`.
pub struct NotGate {
    pub module: Module,
    pub input: Input<bool>,
    pub output: Output<bool>,
}

impl NotGate {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let gate = Rc::new(RefCell::new(Self {
            input: Input::new("in", &module),
            output: Output::new("out", &module),
            module,
        }));
        let proc = sim.process(&gate, &gate.borrow().module, "evaluate", Self::evaluate);
        {
            let g = gate.borrow();
            sim.add_sensitivity(&proc, ports![g.input])?;
            sim.add_producer(&proc, ports![g.output])?;
        }
        Ok(gate)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let result = !self.input.get()?;
        tracing::debug!(
            "{}: in:{} -> out:{}",
            self.module.path(),
            self.input.get()?,
            result
        );
        self.output.set(sim, result)
    }
}

/// `out = a && b`
pub struct AndGate {
    pub module: Module,
    pub a: Input<bool>,
    pub b: Input<bool>,
    pub out: Output<bool>,
}

impl AndGate {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let gate = Rc::new(RefCell::new(Self {
            a: Input::new("a", &module),
            b: Input::new("b", &module),
            out: Output::new("out", &module),
            module,
        }));
        let proc = sim.process(&gate, &gate.borrow().module, "evaluate", Self::evaluate);
        {
            let g = gate.borrow();
            sim.add_sensitivity(&proc, ports![g.a, g.b])?;
            sim.add_producer(&proc, ports![g.out])?;
        }
        Ok(gate)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let result = self.a.get()? && self.b.get()?;
        self.out.set(sim, result)
    }
}

/// `out = a || b`
pub struct OrGate {
    pub module: Module,
    pub a: Input<bool>,
    pub b: Input<bool>,
    pub out: Output<bool>,
}

impl OrGate {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let gate = Rc::new(RefCell::new(Self {
            a: Input::new("a", &module),
            b: Input::new("b", &module),
            out: Output::new("out", &module),
            module,
        }));
        let proc = sim.process(&gate, &gate.borrow().module, "evaluate", Self::evaluate);
        {
            let g = gate.borrow();
            sim.add_sensitivity(&proc, ports![g.a, g.b])?;
            sim.add_producer(&proc, ports![g.out])?;
        }
        Ok(gate)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let result = self.a.get()? || self.b.get()?;
        self.out.set(sim, result)
    }
}

/// `out = a ^ b`
pub struct XorGate {
    pub module: Module,
    pub a: Input<bool>,
    pub b: Input<bool>,
    pub out: Output<bool>,
}

impl XorGate {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let gate = Rc::new(RefCell::new(Self {
            a: Input::new("a", &module),
            b: Input::new("b", &module),
            out: Output::new("out", &module),
            module,
        }));
        let proc = sim.process(&gate, &gate.borrow().module, "evaluate", Self::evaluate);
        {
            let g = gate.borrow();
            sim.add_sensitivity(&proc, ports![g.a, g.b])?;
            sim.add_producer(&proc, ports![g.out])?;
        }
        Ok(gate)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let result = self.a.get()? ^ self.b.get()?;
        self.out.set(sim, result)
    }
}

/// `out = !(a && b)`
pub struct NandGate {
    pub module: Module,
    pub a: Input<bool>,
    pub b: Input<bool>,
    pub out: Output<bool>,
}

impl NandGate {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let gate = Rc::new(RefCell::new(Self {
            a: Input::new("a", &module),
            b: Input::new("b", &module),
            out: Output::new("out", &module),
            module,
        }));
        let proc = sim.process(&gate, &gate.borrow().module, "evaluate", Self::evaluate);
        {
            let g = gate.borrow();
            sim.add_sensitivity(&proc, ports![g.a, g.b])?;
            sim.add_producer(&proc, ports![g.out])?;
        }
        Ok(gate)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let result = !(self.a.get()? && self.b.get()?);
        self.out.set(sim, result)
    }
}
