//! DeltaSim demo harness
//!
//! Wires up small example circuits, runs them through the scheduler, and
//! optionally exports the dependency graph in DOT form.

use clap::{Parser, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use deltasim_core::prelude::*;
use deltasim_models::prelude::*;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    None,
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::None => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Demo {
    /// Full adder driven with a=1, b=1, cin=0.
    Adder,
    /// 2:1 mux switching its select line between runs.
    Mux,
    /// D flip-flop with enable and reset on a period-2 clock.
    Dff,
    /// Self-feeding inverter through a delayed signal.
    Oscillator,
    /// Three zero-delay inverters settling in one delta cascade.
    Cascade,
    /// Clock output observed by a probe.
    Clock,
    /// Zero-delay inverter ring: demonstrates the bad-cycle abort.
    BadCycle,
}

#[derive(Parser)]
#[command(name = "deltasim")]
#[command(about = "Discrete-event simulation demos")]
struct Args {
    /// Demo circuit to run
    #[arg(value_enum)]
    demo: Demo,

    /// Log verbosity
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Export the dependency graph to this DOT file before running
    #[arg(short, long)]
    dot: Option<String>,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(args.log_level))
        .init();

    let result = match args.demo {
        Demo::Adder => run_adder(&args),
        Demo::Mux => run_mux(&args),
        Demo::Dff => run_dff(&args),
        Demo::Oscillator => run_oscillator(&args),
        Demo::Cascade => run_cascade(&args),
        Demo::Clock => run_clock(&args),
        Demo::BadCycle => run_bad_cycle(&args),
    };

    if let Err(err) = result {
        tracing::error!("simulation aborted: {err}");
        std::process::exit(1);
    }
}

fn export_if_requested(sim: &Simulation, args: &Args) -> SimResult<()> {
    if let Some(path) = &args.dot {
        sim.export_dot(path.as_str())?;
        tracing::info!("dependency graph written to {path}");
    }
    Ok(())
}

fn run_adder(args: &Args) -> SimResult<()> {
    let mut sim = Simulation::new();
    let a = Signal::new("a", false);
    let b = Signal::new("b", false);
    let cin = Signal::new("cin", false);
    let sum = Signal::new("sum", false);
    let cout = Signal::new("cout", false);

    let fa = FullAdder::new(&mut sim, "fa")?;
    {
        let f = fa.borrow();
        f.a.bind(&a)?;
        f.b.bind(&b)?;
        f.cin.bind(&cin)?;
        f.sum.bind(&sum)?;
        f.cout.bind(&cout)?;
    }
    let p_sum = Probe::new(&mut sim, "p_sum")?;
    p_sum.borrow().input.bind(&sum)?;
    let p_cout = Probe::new(&mut sim, "p_cout")?;
    p_cout.borrow().input.bind(&cout)?;

    export_if_requested(&sim, args)?;
    sim.initialize()?;

    a.set(&mut sim, true);
    b.set(&mut sim, true);
    cin.set(&mut sim, false);
    sim.run(0)?;

    tracing::info!("sum={} cout={}", sum.get(), cout.get());
    Ok(())
}

fn run_mux(args: &Args) -> SimResult<()> {
    let mut sim = Simulation::new();
    let a = Signal::new("a", false);
    let b = Signal::new("b", true);
    let sel = Signal::new("sel", false);
    let out = Signal::new("out", false);

    let mux = Mux2to1::new(&mut sim, "mux")?;
    {
        let m = mux.borrow();
        m.a.bind(&a)?;
        m.b.bind(&b)?;
        m.sel.bind(&sel)?;
        m.out.bind(&out)?;
    }
    let probe = Probe::new(&mut sim, "p_out")?;
    probe.borrow().input.bind(&out)?;

    export_if_requested(&sim, args)?;
    sim.initialize()?;

    sim.run(0)?;
    tracing::info!("sel=0 -> out={}", out.get());

    sel.set(&mut sim, true);
    sim.run(0)?;
    tracing::info!("sel=1 -> out={}", out.get());
    Ok(())
}

fn run_dff(args: &Args) -> SimResult<()> {
    let mut sim = Simulation::new();
    let clk_out = Signal::new("clk_out", false);
    let d = Signal::new("d", false);
    let enable = Signal::new("enable", false);
    let reset = Signal::new("reset", false);
    let q = Signal::new("q", false);
    let q_not = Signal::new("q_not", true);

    let clock = Clock::new(&mut sim, "clk", 2)?;
    clock.borrow().out.bind(&clk_out)?;

    let dff = DFlipFlop::new(&mut sim, "dff")?;
    {
        let f = dff.borrow();
        f.clk.bind(&clk_out)?;
        f.d.bind(&d)?;
        f.enable.bind(&enable)?;
        f.reset.bind(&reset)?;
        f.q.bind(&q)?;
        f.q_not.bind(&q_not)?;
    }
    let probe = Probe::new(&mut sim, "p_q")?;
    probe.borrow().input.bind(&q)?;

    export_if_requested(&sim, args)?;
    sim.initialize()?;
    d.initialize(true);

    sim.run(2)?;
    tracing::info!("enable=0 -> q={}", q.get());

    enable.set(&mut sim, true);
    sim.run(2)?;
    tracing::info!("enable=1 -> q={}", q.get());

    reset.set(&mut sim, true);
    sim.run(2)?;
    tracing::info!("reset=1 -> q={}", q.get());
    Ok(())
}

fn run_oscillator(args: &Args) -> SimResult<()> {
    let mut sim = Simulation::new();
    let x = Signal::with_delay("x", false, 1);

    let inverter = NotGate::new(&mut sim, "inv")?;
    inverter.borrow().input.bind(&x)?;
    inverter.borrow().output.bind(&x)?;

    let probe = Probe::new(&mut sim, "p_x")?;
    probe.borrow().input.bind(&x)?;

    export_if_requested(&sim, args)?;
    sim.initialize()?;
    sim.run(10)?;

    let stats = sim.stats();
    tracing::info!(
        "ran {} activations over {} delta cycles",
        stats.events_processed,
        stats.delta_cycles
    );
    Ok(())
}

fn run_cascade(args: &Args) -> SimResult<()> {
    let mut sim = Simulation::new();
    let x = Signal::new("x", false);
    let s1 = Signal::new("s1", false);
    let s2 = Signal::new("s2", false);
    let s3 = Signal::new("s3", false);

    let inv1 = NotGate::new(&mut sim, "inv1")?;
    let inv2 = NotGate::new(&mut sim, "inv2")?;
    let inv3 = NotGate::new(&mut sim, "inv3")?;
    inv1.borrow().input.bind(&x)?;
    inv1.borrow().output.bind(&s1)?;
    inv2.borrow().input.bind(&s1)?;
    inv2.borrow().output.bind(&s2)?;
    inv3.borrow().input.bind(&s2)?;
    inv3.borrow().output.bind(&s3)?;

    export_if_requested(&sim, args)?;
    sim.initialize()?;
    sim.run(0)?;

    x.set(&mut sim, true);
    sim.run(0)?;
    tracing::info!("settled at t={} with s3={}", sim.time(), s3.get());
    Ok(())
}

fn run_clock(args: &Args) -> SimResult<()> {
    let mut sim = Simulation::new();
    let clk_out = Signal::new("clk_out", false);

    let clock = Clock::new(&mut sim, "clk", 2)?;
    clock.borrow().out.bind(&clk_out)?;

    let probe = Probe::new(&mut sim, "p_clk")?;
    probe.borrow().input.bind(&clk_out)?;

    export_if_requested(&sim, args)?;
    sim.initialize()?;
    sim.run(10)?;
    Ok(())
}

fn run_bad_cycle(args: &Args) -> SimResult<()> {
    let mut sim = Simulation::new();
    let a = Signal::new("a", false);
    let b = Signal::new("b", false);

    let inv1 = NotGate::new(&mut sim, "inv1")?;
    let inv2 = NotGate::new(&mut sim, "inv2")?;
    inv1.borrow().input.bind(&a)?;
    inv1.borrow().output.bind(&b)?;
    inv2.borrow().input.bind(&b)?;
    inv2.borrow().output.bind(&a)?;

    export_if_requested(&sim, args)?;
    // Both signals commit with zero delay: initialize refuses to start.
    sim.initialize()?;
    sim.run(0)
}
