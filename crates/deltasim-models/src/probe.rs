//! Signal probe

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

type Callback<T> = Box<dyn Fn(&Simulation, &Input<T>) -> SimResult<()>>;

/// Observer module: runs a callback whenever the probed signal changes.
/// The default callback logs the value at info level.
pub struct Probe<T: SignalValue> {
    pub module: Module,
    pub input: Input<T>,
    callback: Callback<T>,
}

impl<T: SignalValue> Probe<T> {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let path: Rc<str> = Rc::from(name);
        Self::with_callback(sim, name, move |sim, input: &Input<T>| {
            tracing::info!("[t={}] {}: {:?}", sim.time(), path, input.get()?);
            Ok(())
        })
    }

    pub fn with_callback(
        sim: &mut Simulation,
        name: &str,
        callback: impl Fn(&Simulation, &Input<T>) -> SimResult<()> + 'static,
    ) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let probe = Rc::new(RefCell::new(Self {
            input: Input::new("in", &module),
            module,
            callback: Box::new(callback),
        }));
        let proc = sim.process(&probe, &probe.borrow().module, "evaluate", Self::evaluate);
        {
            let p = probe.borrow();
            sim.add_sensitivity(&proc, ports![p.input])?;
        }
        Ok(probe)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        (self.callback)(sim, &self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltasim_core::Signal;

    #[test]
    fn test_callback_sees_changes() {
        let mut sim = Simulation::new();
        let sig = Signal::new("s", 0u8);

        let values: Rc<RefCell<Vec<(Time, u8)>>> = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&values);
        let probe = Probe::with_callback(&mut sim, "probe", move |sim, input| {
            seen.borrow_mut().push((sim.time(), input.get()?));
            Ok(())
        })
        .unwrap();
        probe.borrow().input.bind(&sig).unwrap();

        sim.initialize().unwrap();
        sig.set(&mut sim, 3);
        sim.run(0).unwrap();
        sig.set(&mut sim, 7);
        sim.run(0).unwrap();

        // One observation from the initializer pass, then one per change.
        let observed = values.borrow();
        assert_eq!(observed.as_slice(), &[(0, 0), (0, 3), (0, 7)]);
    }
}
