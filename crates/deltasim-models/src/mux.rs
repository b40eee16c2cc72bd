//! 2-to-1 multiplexer

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

/// `out = if sel { b } else { a }`, generic over the carried value.
pub struct Mux2to1<T: SignalValue> {
    pub module: Module,
    pub a: Input<T>,
    pub b: Input<T>,
    pub sel: Input<bool>,
    pub out: Output<T>,
}

impl<T: SignalValue> Mux2to1<T> {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let mux = Rc::new(RefCell::new(Self {
            a: Input::new("a", &module),
            b: Input::new("b", &module),
            sel: Input::new("sel", &module),
            out: Output::new("out", &module),
            module,
        }));
        let proc = sim.process(&mux, &mux.borrow().module, "evaluate", Self::evaluate);
        {
            let m = mux.borrow();
            sim.add_sensitivity(&proc, ports![m.a, m.b, m.sel])?;
            sim.add_producer(&proc, ports![m.out])?;
        }
        Ok(mux)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let result = if self.sel.get()? {
            self.b.get()?
        } else {
            self.a.get()?
        };
        tracing::debug!(
            "{}: sel:{} -> out:{:?}",
            self.module.path(),
            self.sel.get()?,
            result
        );
        self.out.set(sim, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltasim_core::Signal;

    #[test]
    fn test_selects_between_inputs() {
        let mut sim = Simulation::new();
        let a = Signal::new("a", 10u16);
        let b = Signal::new("b", 20u16);
        let sel = Signal::new("sel", false);
        let out = Signal::new("out", 0u16);

        let mux = Mux2to1::new(&mut sim, "mux").unwrap();
        {
            let m = mux.borrow();
            m.a.bind(&a).unwrap();
            m.b.bind(&b).unwrap();
            m.sel.bind(&sel).unwrap();
            m.out.bind(&out).unwrap();
        }

        sim.run(0).unwrap();
        assert_eq!(out.get(), 10);

        sel.set(&mut sim, true);
        sim.run(0).unwrap();
        assert_eq!(out.get(), 20);

        b.set(&mut sim, 42);
        sim.run(0).unwrap();
        assert_eq!(out.get(), 42);
    }
}
