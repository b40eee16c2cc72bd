//! Clock generator

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

/// Clock configuration parameters
#[derive(Clone, Debug)]
pub struct ClockConfig {
    /// Full period of the clock signal.
    pub period: Time,
    /// Fraction of the period spent high.
    pub duty_cycle: f64,
    /// Time before the first toggle is scheduled.
    pub start_time: Time,
    /// Start with the rising edge instead of the falling one.
    pub posedge_first: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            period: 2,
            duty_cycle: 0.5,
            start_time: 0,
            posedge_first: false,
        }
    }
}

/// A self-scheduling periodic process driving a boolean output.
///
/// The clock seeds itself at construction time: its first toggle is
/// scheduled directly, not through an initializer, and every activation
/// re-arms the next one. It registers only as a producer.
pub struct Clock {
    pub module: Module,
    pub out: Output<bool>,
    period: Time,
    duty_cycle: f64,
    proc: Option<ProcessInfo>,
}

impl Clock {
    /// A clock with the given period and default 50% duty cycle.
    pub fn new(sim: &mut Simulation, name: &str, period: Time) -> SimResult<Rc<RefCell<Self>>> {
        Self::with_config(
            sim,
            name,
            ClockConfig {
                period,
                ..ClockConfig::default()
            },
        )
    }

    pub fn with_config(
        sim: &mut Simulation,
        name: &str,
        config: ClockConfig,
    ) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let clock = Rc::new(RefCell::new(Self {
            out: Output::new("out", &module),
            module,
            period: config.period,
            duty_cycle: config.duty_cycle,
            proc: None,
        }));
        let proc = sim.process(&clock, &clock.borrow().module, "evaluate", Self::evaluate);

        let mut delay = config.start_time;
        if config.posedge_first {
            delay += (config.period as f64 * config.duty_cycle) as Time;
        } else {
            delay += (config.period as f64 * (1.0 - config.duty_cycle)) as Time;
        }
        sim.schedule_after(&proc, delay);

        {
            let c = clock.borrow();
            sim.add_producer(&proc, ports![c.out])?;
        }
        clock.borrow_mut().proc = Some(proc);
        Ok(clock)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let next = !self.out.get()?;
        self.out.set(sim, next)?;

        let delay = if next {
            (self.period as f64 * self.duty_cycle) as Time
        } else {
            (self.period as f64 * (1.0 - self.duty_cycle)) as Time
        };
        if let Some(proc) = self.proc.clone() {
            sim.schedule_after(&proc, delay);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Probe;
    use deltasim_core::Signal;

    #[test]
    fn test_toggles_with_default_config() {
        let mut sim = Simulation::new();
        let out = Signal::new("clk_out", false);
        let clock = Clock::new(&mut sim, "clk", 2).unwrap();
        clock.borrow().out.bind(&out).unwrap();

        // Period 2, falling-edge first: rising edges at t = 1, 3, 5, ...
        sim.run(1).unwrap();
        assert_eq!(out.get(), true);
        sim.run(1).unwrap();
        assert_eq!(out.get(), false);
        sim.run(1).unwrap();
        assert_eq!(out.get(), true);
    }

    #[test]
    fn test_posedge_times() {
        let mut sim = Simulation::new();
        let out = Signal::new("clk_out", false);
        let clock = Clock::new(&mut sim, "clk", 2).unwrap();
        clock.borrow().out.bind(&out).unwrap();

        let edges: Rc<RefCell<Vec<Time>>> = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&edges);
        let probe = Probe::with_callback(&mut sim, "probe", move |sim, input| {
            if input.posedge()? {
                seen.borrow_mut().push(sim.time());
            }
            Ok(())
        })
        .unwrap();
        probe.borrow().input.bind(&out).unwrap();

        sim.run(6).unwrap();
        assert_eq!(*edges.borrow(), vec![1, 3, 5]);
    }

    #[test]
    fn test_asymmetric_duty_cycle() {
        let mut sim = Simulation::new();
        let out = Signal::new("clk_out", false);
        let clock = Clock::with_config(
            &mut sim,
            "clk",
            ClockConfig {
                period: 10,
                duty_cycle: 0.2,
                start_time: 0,
                posedge_first: false,
            },
        )
        .unwrap();
        clock.borrow().out.bind(&out).unwrap();

        // Low for 8, high for 2.
        sim.run(8).unwrap();
        assert_eq!(out.get(), true);
        sim.run(2).unwrap();
        assert_eq!(out.get(), false);
    }
}
