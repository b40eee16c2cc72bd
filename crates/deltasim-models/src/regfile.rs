//! Register file

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

use crate::cpu::Phase;

/// Number of registers.
pub const NUM_REGS: usize = 16;

/// Clocked two-read, one-write register file with phase awareness.
///
/// On each rising clock edge the addressed registers are exposed on
/// `data_a`/`data_b`; the word on `data_in` lands in `addr_w` only when
/// `write_enable` is high during the writeback phase. An out-of-range
/// address is a diagnostic event: reported through the logger, outputs
/// left unchanged.
pub struct RegisterFile {
    pub module: Module,
    pub clk: Input<bool>,
    pub reset: Input<bool>,
    pub phase: Input<u8>,
    pub addr_a: Input<u8>,
    pub addr_b: Input<u8>,
    pub addr_w: Input<u8>,
    pub data_in: Input<u16>,
    pub write_enable: Input<bool>,
    pub data_a: Output<u16>,
    pub data_b: Output<u16>,
    regs: [u16; NUM_REGS],
}

impl RegisterFile {
    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let rf = Rc::new(RefCell::new(Self {
            clk: Input::new("clk", &module),
            reset: Input::new("reset", &module),
            phase: Input::new("phase", &module),
            addr_a: Input::new("addr_a", &module),
            addr_b: Input::new("addr_b", &module),
            addr_w: Input::new("addr_w", &module),
            data_in: Input::new("data_in", &module),
            write_enable: Input::new("write_enable", &module),
            data_a: Output::new("data_a", &module),
            data_b: Output::new("data_b", &module),
            module,
            regs: [0; NUM_REGS],
        }));
        let proc = sim.process(&rf, &rf.borrow().module, "evaluate", Self::evaluate);
        {
            let r = rf.borrow();
            sim.add_sensitivity(&proc, ports![r.clk, r.reset])?;
            sim.add_consumer(
                &proc,
                ports![r.phase, r.addr_a, r.addr_b, r.addr_w, r.data_in, r.write_enable],
            )?;
            sim.add_producer(&proc, ports![r.data_a, r.data_b])?;
        }
        Ok(rf)
    }

    /// Register value by index, for tests and debugging.
    pub fn debug_read(&self, index: usize) -> u16 {
        if index >= NUM_REGS {
            tracing::error!(
                "{}: debug_read out of bounds: {:#04x}",
                self.module.path(),
                index
            );
            return 0;
        }
        self.regs[index]
    }

    /// Set a register by index, for tests and debugging.
    pub fn debug_write(&mut self, index: usize, value: u16) {
        if index >= NUM_REGS {
            tracing::error!(
                "{}: debug_write out of bounds: {:#04x}",
                self.module.path(),
                index
            );
            return;
        }
        self.regs[index] = value;
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        if !self.clk.posedge()? {
            return Ok(());
        }

        if self.reset.get()? {
            tracing::debug!("{}: resetting registers", self.module.path());
            self.regs = [0; NUM_REGS];
            self.data_a.set(sim, 0)?;
            self.data_b.set(sim, 0)?;
            return Ok(());
        }

        let addr_a = usize::from(self.addr_a.get()?);
        let addr_b = usize::from(self.addr_b.get()?);
        let addr_w = usize::from(self.addr_w.get()?);

        if addr_a >= NUM_REGS || addr_b >= NUM_REGS || addr_w >= NUM_REGS {
            tracing::error!(
                "{}: register address out of bounds (a:{:#04x} b:{:#04x} w:{:#04x})",
                self.module.path(),
                addr_a,
                addr_b,
                addr_w
            );
            return Ok(());
        }

        self.data_a.set(sim, self.regs[addr_a])?;
        self.data_b.set(sim, self.regs[addr_b])?;

        // Writes land only during writeback.
        let phase = Phase::from_code(self.phase.get()?);
        if phase == Phase::Writeback && self.write_enable.get()? {
            self.regs[addr_w] = self.data_in.get()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltasim_core::Signal;

    struct Harness {
        sim: Simulation,
        clk: Signal<bool>,
        reset: Signal<bool>,
        phase: Signal<u8>,
        addr_a: Signal<u8>,
        addr_w: Signal<u8>,
        data_in: Signal<u16>,
        we: Signal<bool>,
        data_a: Signal<u16>,
    }

    fn harness() -> (Harness, Rc<RefCell<RegisterFile>>) {
        let mut sim = Simulation::new();
        let clk = Signal::new("clk", false);
        let reset = Signal::new("reset", false);
        let phase = Signal::new("phase", Phase::Writeback.code());
        let addr_a = Signal::new("addr_a", 0u8);
        let addr_b = Signal::new("addr_b", 0u8);
        let addr_w = Signal::new("addr_w", 0u8);
        let data_in = Signal::new("data_in", 0u16);
        let we = Signal::new("we", false);
        let data_a = Signal::new("data_a", 0u16);
        let data_b = Signal::new("data_b", 0u16);

        let rf = RegisterFile::new(&mut sim, "rf").unwrap();
        {
            let r = rf.borrow();
            r.clk.bind(&clk).unwrap();
            r.reset.bind(&reset).unwrap();
            r.phase.bind(&phase).unwrap();
            r.addr_a.bind(&addr_a).unwrap();
            r.addr_b.bind(&addr_b).unwrap();
            r.addr_w.bind(&addr_w).unwrap();
            r.data_in.bind(&data_in).unwrap();
            r.write_enable.bind(&we).unwrap();
            r.data_a.bind(&data_a).unwrap();
            r.data_b.bind(&data_b).unwrap();
        }
        (
            Harness {
                sim,
                clk,
                reset,
                phase,
                addr_a,
                addr_w,
                data_in,
                we,
                data_a,
            },
            rf,
        )
    }

    fn pulse(h: &mut Harness) {
        h.clk.set(&mut h.sim, true);
        h.sim.run(0).unwrap();
        h.clk.set(&mut h.sim, false);
        h.sim.run(0).unwrap();
    }

    #[test]
    fn test_write_then_read_back() {
        let (mut h, rf) = harness();
        h.sim.initialize().unwrap();

        h.addr_w.set(&mut h.sim, 5);
        h.data_in.set(&mut h.sim, 0xcafe);
        h.we.set(&mut h.sim, true);
        pulse(&mut h);
        assert_eq!(rf.borrow().debug_read(5), 0xcafe);

        h.we.set(&mut h.sim, false);
        h.addr_a.set(&mut h.sim, 5);
        pulse(&mut h);
        assert_eq!(h.data_a.get(), 0xcafe);
    }

    #[test]
    fn test_reset_clears() {
        let (mut h, rf) = harness();
        h.sim.initialize().unwrap();

        rf.borrow_mut().debug_write(2, 99);
        h.reset.set(&mut h.sim, true);
        pulse(&mut h);
        assert_eq!(rf.borrow().debug_read(2), 0);
        assert_eq!(h.data_a.get(), 0);
    }

    #[test]
    fn test_write_ignored_outside_writeback() {
        let (mut h, rf) = harness();
        h.sim.initialize().unwrap();

        h.phase.set(&mut h.sim, Phase::Execute.code());
        h.addr_w.set(&mut h.sim, 4);
        h.data_in.set(&mut h.sim, 0xbeef);
        h.we.set(&mut h.sim, true);
        pulse(&mut h);
        assert_eq!(rf.borrow().debug_read(4), 0);

        // Same edge inputs, writeback phase: the write lands.
        h.phase.set(&mut h.sim, Phase::Writeback.code());
        pulse(&mut h);
        assert_eq!(rf.borrow().debug_read(4), 0xbeef);
    }

    #[test]
    fn test_out_of_range_address_is_nonfatal() {
        let (mut h, rf) = harness();
        h.sim.initialize().unwrap();

        rf.borrow_mut().debug_write(1, 7);
        h.addr_a.set(&mut h.sim, 1);
        pulse(&mut h);
        assert_eq!(h.data_a.get(), 7);

        h.addr_w.set(&mut h.sim, 200);
        pulse(&mut h);
        // Outputs untouched by the rejected access.
        assert_eq!(h.data_a.get(), 7);
    }

    #[test]
    fn test_debug_accessors_check_bounds() {
        let (_h, rf) = harness();
        assert_eq!(rf.borrow().debug_read(NUM_REGS), 0);
        rf.borrow_mut().debug_write(NUM_REGS, 1); // dropped
        assert_eq!(rf.borrow().debug_read(0), 0);
    }
}
