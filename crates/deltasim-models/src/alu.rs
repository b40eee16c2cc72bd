//! Arithmetic logic unit

use std::cell::RefCell;
use std::rc::Rc;

use deltasim_core::ports;
use deltasim_core::prelude::*;

/// Operation selector carried on the `op` input.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum AluOp {
    And = 0,
    Or = 1,
    Xor = 2,
    Not = 3,
    Add = 4,
    Sub = 5,
    Mul = 6,
    Div = 7,
    Mod = 8,
    Shl = 9,
    Shr = 10,
    Equal = 11,
    LessThan = 12,
}

impl AluOp {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AluOp::And),
            1 => Some(AluOp::Or),
            2 => Some(AluOp::Xor),
            3 => Some(AluOp::Not),
            4 => Some(AluOp::Add),
            5 => Some(AluOp::Sub),
            6 => Some(AluOp::Mul),
            7 => Some(AluOp::Div),
            8 => Some(AluOp::Mod),
            9 => Some(AluOp::Shl),
            10 => Some(AluOp::Shr),
            11 => Some(AluOp::Equal),
            12 => Some(AluOp::LessThan),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Clocked 16-bit ALU.
///
/// Operands and the opcode are read on the rising clock edge; they are
/// registered as consumers, not sensitivities, so changing them between
/// edges wakes nothing. An unknown opcode is a diagnostic event: it is
/// reported through the logger and the outputs keep their values.
pub struct Alu {
    pub module: Module,
    pub a: Input<u16>,
    pub b: Input<u16>,
    pub op: Input<u8>,
    pub clk: Input<bool>,
    pub out: Output<u16>,
    pub remainder: Output<u16>,
    pub status: Output<u8>,
}

impl Alu {
    pub const FLAG_CARRY: u8 = 1 << 0;
    pub const FLAG_BORROW: u8 = 1 << 1;
    pub const FLAG_DIV_ZERO: u8 = 1 << 2;
    pub const FLAG_OVERFLOW: u8 = 1 << 3;
    /// Set by the comparison ops when the comparison holds; the program
    /// counter tests this flag for conditional branches.
    pub const FLAG_CMP_TRUE: u8 = 1 << 4;

    pub fn new(sim: &mut Simulation, name: &str) -> SimResult<Rc<RefCell<Self>>> {
        let module = sim.module(name);
        let alu = Rc::new(RefCell::new(Self {
            a: Input::new("a", &module),
            b: Input::new("b", &module),
            op: Input::new("op", &module),
            clk: Input::new("clk", &module),
            out: Output::new("out", &module),
            remainder: Output::new("remainder", &module),
            status: Output::new("status", &module),
            module,
        }));
        let proc = sim.process(&alu, &alu.borrow().module, "evaluate", Self::evaluate);
        {
            let a = alu.borrow();
            sim.add_sensitivity(&proc, ports![a.clk])?;
            sim.add_consumer(&proc, ports![a.a, a.b, a.op])?;
            sim.add_producer(&proc, ports![a.out, a.remainder, a.status])?;
        }
        Ok(alu)
    }

    fn evaluate(&mut self, sim: &mut Simulation) -> SimResult<()> {
        if !self.clk.posedge()? {
            return Ok(());
        }

        let a = self.a.get()?;
        let b = self.b.get()?;
        let code = self.op.get()?;
        let Some(op) = AluOp::from_code(code) else {
            tracing::error!("{}: unknown opcode {:#04x}", self.module.path(), code);
            return Ok(());
        };

        let mut remainder = 0u16;
        let mut flags = 0u8;
        let result = match op {
            AluOp::And => a & b,
            AluOp::Or => a | b,
            AluOp::Xor => a ^ b,
            AluOp::Not => !a,
            AluOp::Add => {
                let wide = u32::from(a) + u32::from(b);
                if wide > u32::from(u16::MAX) {
                    flags |= Self::FLAG_CARRY;
                }
                wide as u16
            }
            AluOp::Sub => {
                if b > a {
                    flags |= Self::FLAG_BORROW;
                }
                a.wrapping_sub(b)
            }
            AluOp::Mul => {
                let wide = u32::from(a) * u32::from(b);
                if wide > u32::from(u16::MAX) {
                    flags |= Self::FLAG_OVERFLOW;
                }
                wide as u16
            }
            AluOp::Div => {
                if b == 0 {
                    flags |= Self::FLAG_DIV_ZERO;
                    0
                } else {
                    remainder = a % b;
                    a / b
                }
            }
            AluOp::Mod => {
                if b == 0 {
                    flags |= Self::FLAG_DIV_ZERO;
                    0
                } else {
                    a % b
                }
            }
            AluOp::Shl => a.wrapping_shl(u32::from(b)),
            AluOp::Shr => a.wrapping_shr(u32::from(b)),
            AluOp::Equal => {
                if a == b {
                    flags |= Self::FLAG_CMP_TRUE;
                }
                u16::from(a == b)
            }
            AluOp::LessThan => {
                if a < b {
                    flags |= Self::FLAG_CMP_TRUE;
                }
                u16::from(a < b)
            }
        };

        tracing::debug!(
            "{}: {:?} a:{:#06x} b:{:#06x} -> out:{:#06x} flags:{:#04x}",
            self.module.path(),
            op,
            a,
            b,
            result,
            flags
        );

        self.out.set(sim, result)?;
        self.remainder.set(sim, remainder)?;
        self.status.set(sim, flags)
    }
}
