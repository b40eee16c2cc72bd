//! ROM and RAM

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

/// Read-only word memory: combinational address -> data lookup.
/// Out-of-range addresses read as zero.
pub struct Rom {
    pub module: Module,
    pub addr: Input<u16>,
    pub data: Output<u16>,
    contents: Vec<u16>,
}

impl Rom {
    pub fn new(
        sim: &mut Simulation,
        name: &str,
        contents: Vec<u16>,
    ) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let rom = Rc::new(RefCell::new(Self {
            addr: Input::new("addr", &module),
            data: Output::new("data", &module),
            module,
            contents,
        }));
        let proc = sim.process(&rom, &rom.borrow().module, "evaluate", Self::evaluate);
        {
            let r = rom.borrow();
            sim.add_sensitivity(&proc, ports![r.addr])?;
            sim.add_producer(&proc, ports![r.data])?;
        }
        Ok(rom)
    }

    /// Word at `addr`, for tests and debugging.
    pub fn debug_read(&self, addr: usize) -> u16 {
        self.contents.get(addr).copied().unwrap_or(0)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let addr = usize::from(self.addr.get()?);
        let word = match self.contents.get(addr) {
            Some(&word) => word,
            None => {
                tracing::debug!(
                    "{}: address {:#06x} out of range, reading 0",
                    self.module.path(),
                    addr
                );
                0
            }
        };
        self.data.set(sim, word)
    }
}

/// Word-addressed RAM with a write-enable line. The read port always
/// reflects the addressed cell; writes land on the same activation.
pub struct Ram {
    pub module: Module,
    pub addr: Input<u16>,
    pub data_in: Input<u16>,
    pub write_enable: Input<bool>,
    pub data_out: Output<u16>,
    mem: Vec<u16>,
}

impl Ram {
    pub fn new(sim: &mut Simulation, name: &str, size: usize) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let ram = Rc::new(RefCell::new(Self {
            addr: Input::new("addr", &module),
            data_in: Input::new("data_in", &module),
            write_enable: Input::new("write_enable", &module),
            data_out: Output::new("data_out", &module),
            module,
            mem: vec![0; size],
        }));
        let proc = sim.process(&ram, &ram.borrow().module, "evaluate", Self::evaluate);
        {
            let r = ram.borrow();
            sim.add_sensitivity(&proc, ports![r.addr, r.data_in, r.write_enable])?;
            sim.add_producer(&proc, ports![r.data_out])?;
        }
        Ok(ram)
    }

    pub fn debug_read(&self, addr: usize) -> u16 {
        self.mem.get(addr).copied().unwrap_or(0)
    }

    pub fn debug_write(&mut self, addr: usize, value: u16) {
        if let Some(cell) = self.mem.get_mut(addr) {
            *cell = value;
        }
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        let addr = usize::from(self.addr.get()?);
        if addr >= self.mem.len() {
            tracing::error!(
                "{}: address {:#06x} out of range (size {})",
                self.module.path(),
                addr,
                self.mem.len()
            );
            return Ok(());
        }
        if self.write_enable.get()? {
            self.mem[addr] = self.data_in.get()?;
        }
        let word = self.mem[addr];
        self.data_out.set(sim, word)
    }
}
