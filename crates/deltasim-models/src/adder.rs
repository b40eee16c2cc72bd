//! Full adder

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

/// One-bit full adder: `sum = a ^ b ^ cin`, `cout = majority(a, b, cin)`.
pub struct FullAdder {
    pub module: Module,
    pub a: Input<bool>,
    pub b: Input<bool>,
    pub cin: Input<bool>,
    pub sum: Output<bool>,
    pub cout: Output<bool>,
}

impl FullAdder {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let adder = Rc::new(RefCell::new(Self {
            a: Input::new("a", &module),
            b: Input::new("b", &module),
            cin: Input::new("cin", &module),
            sum: Output::new("sum", &module),
            cout: Output::new("cout", &module),
            module,
        }));
        let proc = sim.process(&adder, &adder.borrow().module, "evaluate", Self::evaluate);
        {
            let fa = adder.borrow();
            sim.add_sensitivity(&proc, ports![fa.a, fa.b, fa.cin])?;
            sim.add_producer(&proc, ports![fa.sum, fa.cout])?;
        }
        Ok(adder)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let a = self.a.get()?;
        let b = self.b.get()?;
        let cin = self.cin.get()?;

        let sum = a ^ b ^ cin;
        let cout = (a & b) | (b & cin) | (a & cin);

        tracing::debug!(
            "{}: a:{} b:{} cin:{} -> sum:{} cout:{}",
            self.module.path(),
            a,
            b,
            cin,
            sum,
            cout
        );

        self.sum.set(sim, sum)?;
        self.cout.set(sim, cout)
    }
}
