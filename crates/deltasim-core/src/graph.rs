//! Dependency graph: producer/consumer registry and cycle analysis
//!
//! Models register which process produces and which processes consume
//! each port. Before the first event runs, the registry is resolved to
//! concrete signals and searched for loops. A loop in which every signal
//! commits with zero delay is a combinational race with no stable fixed
//! point and aborts initialization; a loop with at least one delayed
//! signal models sequential logic and is allowed.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use rand::Rng;
use smallvec::SmallVec;

use crate::error::{SimError, SimResult};
use crate::module::{Module, ModuleId};
use crate::port::{EndpointKey, EndpointRef};
use crate::process::ProcessInfo;
use crate::signal::{SignalKey, SignalRef};
use crate::timing::Time;

type Edges = SmallVec<[SignalKey; 4]>;

/// One signal on a reported cycle.
#[derive(Clone, Debug)]
pub struct CycleEntry {
    pub signal: String,
    pub delay: Time,
    /// `module.port` of the registered producer, when one exists.
    pub producer: Option<String>,
}

/// Human-readable description of one elementary cycle.
#[derive(Clone, Debug)]
pub struct CycleReport {
    entries: Vec<CycleEntry>,
}

impl CycleReport {
    pub fn entries(&self) -> &[CycleEntry] {
        &self.entries
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.signal.as_str())
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match &entry.producer {
                Some(producer) => writeln!(
                    f,
                    "  - {} [{}, delay: {}]",
                    entry.signal, producer, entry.delay
                )?,
                None => writeln!(f, "  - {} [delay: {}]", entry.signal, entry.delay)?,
            }
        }
        if let Some(first) = self.entries.first() {
            writeln!(f, "  - back to {}", first.signal)?;
        }
        Ok(())
    }
}

/// Registry of producers and consumers plus the derived signal graph.
#[derive(Default)]
pub struct DependencyGraph {
    modules: IndexMap<ModuleId, Module>,
    producers: IndexMap<EndpointKey, (EndpointRef, ProcessInfo)>,
    consumers: IndexMap<EndpointKey, (EndpointRef, SmallVec<[ProcessInfo; 2]>)>,
    module_inputs: IndexMap<ModuleId, IndexSet<EndpointKey>>,
    module_outputs: IndexMap<ModuleId, IndexSet<EndpointKey>>,
    // Populated by compute_cycles.
    signals: IndexMap<SignalKey, SignalRef>,
    signal_graph: IndexMap<SignalKey, Edges>,
    cycles: Vec<Vec<SignalKey>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register_module(&mut self, module: Module) {
        self.modules.insert(module.id(), module);
    }

    /// At most one producer per endpoint; re-registration is a no-op.
    pub(crate) fn register_producer(&mut self, endpoint: EndpointRef, proc: &ProcessInfo) {
        let key = endpoint.key();
        if self.producers.contains_key(&key) {
            return;
        }
        if let Some(module) = proc.owner_module() {
            tracing::trace!(
                "module `{}` produces `{}`",
                proc.owner().name(),
                endpoint.location()
            );
            self.module_outputs.entry(module).or_default().insert(key);
        }
        self.producers.insert(key, (endpoint, proc.clone()));
    }

    pub(crate) fn register_consumer(&mut self, endpoint: EndpointRef, proc: &ProcessInfo) {
        let key = endpoint.key();
        if let Some(module) = proc.owner_module() {
            tracing::trace!(
                "module `{}` consumes `{}`",
                proc.owner().name(),
                endpoint.location()
            );
            self.module_inputs.entry(module).or_default().insert(key);
        }
        let entry = self
            .consumers
            .entry(key)
            .or_insert_with(|| (endpoint, SmallVec::new()));
        if !entry.1.iter().any(|p| p.key() == proc.key()) {
            entry.1.push(proc.clone());
        }
    }

    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Resolve every registered endpoint and rebuild the signal graph and
    /// its cycles. Fails when two distinct producer ports resolve to the
    /// same concrete signal.
    pub(crate) fn compute_cycles(&mut self) -> SimResult<()> {
        let mut signals: IndexMap<SignalKey, SignalRef> = IndexMap::new();
        let mut produced_by: IndexMap<SignalKey, EndpointKey> = IndexMap::new();

        for (key, (endpoint, _)) in &self.producers {
            let Some(signal) = endpoint.resolve() else {
                continue;
            };
            if let Some(previous) = produced_by.insert(signal.key(), *key) {
                if previous != *key {
                    let first = self.producers[&previous].0.location();
                    return Err(SimError::MultipleProducers {
                        signal: signal.name().to_string(),
                        first,
                        second: endpoint.location(),
                    });
                }
            }
            signals.insert(signal.key(), signal);
        }
        for (_, (endpoint, _)) in &self.consumers {
            if let Some(signal) = endpoint.resolve() {
                signals.insert(signal.key(), signal);
            }
        }

        // For each produced signal s, link s to every signal produced by
        // a module that consumes s.
        let mut graph: IndexMap<SignalKey, Edges> = IndexMap::new();
        for (_, (producer_endpoint, _)) in &self.producers {
            let Some(signal) = producer_endpoint.resolve() else {
                continue;
            };
            let source = signal.key();
            for (_, (consumer_endpoint, consumer_procs)) in &self.consumers {
                let Some(consumed) = consumer_endpoint.resolve() else {
                    continue;
                };
                if consumed.key() != source {
                    continue;
                }
                for proc in consumer_procs {
                    let Some(module) = proc.owner_module() else {
                        continue;
                    };
                    let Some(outputs) = self.module_outputs.get(&module) else {
                        continue;
                    };
                    for output_key in outputs {
                        let Some((output_endpoint, _)) = self.producers.get(output_key) else {
                            continue;
                        };
                        let Some(output_signal) = output_endpoint.resolve() else {
                            continue;
                        };
                        let target = output_signal.key();
                        signals.insert(target, output_signal);
                        let edges = graph.entry(source).or_default();
                        if !edges.contains(&target) {
                            edges.push(target);
                        }
                    }
                }
            }
        }

        let mut cycles = Vec::new();
        let mut visited: IndexSet<SignalKey> = IndexSet::new();
        let mut stack: IndexSet<SignalKey> = IndexSet::new();
        let mut path: Vec<SignalKey> = Vec::new();
        let roots: Vec<SignalKey> = graph.keys().copied().collect();
        for root in roots {
            if !visited.contains(&root) {
                dfs_cycle(root, &graph, &mut visited, &mut stack, &mut path, &mut cycles);
            }
        }

        self.signals = signals;
        self.signal_graph = graph;
        self.cycles = cycles;
        Ok(())
    }

    /// Outgoing edges of the derived signal graph; valid after the last
    /// `compute_cycles` pass.
    pub fn signal_edges(&self, key: SignalKey) -> &[SignalKey] {
        self.signal_graph
            .get(&key)
            .map_or(&[], |edges| edges.as_slice())
    }

    pub fn has_cycle(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn cycles(&self) -> &[Vec<SignalKey>] {
        &self.cycles
    }

    /// A cycle is bad iff every signal along it commits with zero delay.
    pub fn is_bad_cycle(&self, cycle: &[SignalKey]) -> bool {
        cycle
            .iter()
            .all(|key| self.signals.get(key).map_or(true, |s| s.delay() == 0))
    }

    pub(crate) fn first_bad_cycle(&self) -> Option<&[SignalKey]> {
        self.cycles
            .iter()
            .find(|cycle| self.is_bad_cycle(cycle))
            .map(|cycle| cycle.as_slice())
    }

    pub fn describe_cycle(&self, cycle: &[SignalKey]) -> CycleReport {
        let entries = cycle
            .iter()
            .map(|key| {
                let (signal, delay) = match self.signals.get(key) {
                    Some(s) => (s.name().to_string(), s.delay()),
                    None => ("<unresolved>".to_string(), 0),
                };
                let producer = self.producers.values().find_map(|(endpoint, _)| {
                    let resolved = endpoint.resolve()?;
                    if resolved.key() == *key {
                        Some(endpoint.location())
                    } else {
                        None
                    }
                });
                CycleEntry {
                    signal,
                    delay,
                    producer,
                }
            })
            .collect();
        CycleReport { entries }
    }

    /// Emit the graph in DOT form: ellipse nodes for signals (type and
    /// delay in the label), box nodes for modules scaled to their port
    /// count, producer edges module -> signal, consumer edges
    /// signal -> module. Node identifiers are randomized so repeated
    /// exports never collide.
    pub fn export_dot<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut rng = rand::thread_rng();

        // Resolve fresh: export may run before or after compute_cycles.
        let mut signals: IndexMap<SignalKey, SignalRef> = IndexMap::new();
        for (endpoint, _) in self.producers.values() {
            if let Some(signal) = endpoint.resolve() {
                signals.insert(signal.key(), signal);
            }
        }
        for (endpoint, _) in self.consumers.values() {
            if let Some(signal) = endpoint.resolve() {
                signals.insert(signal.key(), signal);
            }
        }

        let mut signal_ids: IndexMap<SignalKey, String> = IndexMap::new();
        for key in signals.keys() {
            signal_ids.insert(*key, format!("sig_{}", random_id(&mut rng)));
        }

        let mut module_ids: IndexMap<ModuleId, String> = IndexMap::new();
        for id in self.module_inputs.keys().chain(self.module_outputs.keys()) {
            module_ids
                .entry(*id)
                .or_insert_with(|| format!("mod_{}", random_id(&mut rng)));
        }

        writeln!(out, "digraph DependencyGraph {{")?;
        writeln!(out, "    rankdir=LR;")?;
        writeln!(out, "    nodesep=0.50;")?;
        writeln!(out, "    ranksep=0.75;")?;
        writeln!(out, "    splines=ortho;")?;
        writeln!(out, "    node [fontname=\"Courier New\"];")?;

        writeln!(
            out,
            "    node [shape=ellipse, fontsize=10, fillcolor=white, style=filled, width=1.0, height=1.0];"
        )?;
        for (key, signal) in &signals {
            if signal.delay() > 0 {
                writeln!(
                    out,
                    "    \"{}\" [label=\"{}\\n({}, {})\"];",
                    signal_ids[key],
                    signal.name(),
                    signal.type_label(),
                    signal.delay()
                )?;
            } else {
                writeln!(
                    out,
                    "    \"{}\" [label=\"{}\\n({})\"];",
                    signal_ids[key],
                    signal.name(),
                    signal.type_label()
                )?;
            }
        }

        writeln!(
            out,
            "    node [shape=box, fontsize=10, fillcolor=\"#D0E7FF\", style=\"filled,rounded\", width=1.0, height=0.5];"
        )?;
        for (id, dot_id) in &module_ids {
            let inputs = self.module_inputs.get(id).map_or(0, IndexSet::len);
            let outputs = self.module_outputs.get(id).map_or(0, IndexSet::len);
            let height = inputs.max(outputs).max(1) as f32;
            let name = self
                .modules
                .get(id)
                .map_or("<module>", |module| module.path());
            writeln!(
                out,
                "    \"{}\" [label=\"{}\", height={:.2}];",
                dot_id, name, height
            )?;
        }

        for (endpoint, proc) in self.producers.values() {
            let (Some(signal), Some(module)) = (endpoint.resolve(), proc.owner_module()) else {
                continue;
            };
            if let (Some(module_id), Some(signal_id)) =
                (module_ids.get(&module), signal_ids.get(&signal.key()))
            {
                writeln!(out, "    \"{}\" -> \"{}\";", module_id, signal_id)?;
            }
        }

        for (endpoint, procs) in self.consumers.values() {
            let Some(signal) = endpoint.resolve() else {
                continue;
            };
            for proc in procs {
                let Some(module) = proc.owner_module() else {
                    continue;
                };
                if let (Some(signal_id), Some(module_id)) =
                    (signal_ids.get(&signal.key()), module_ids.get(&module))
                {
                    writeln!(out, "    \"{}\" -> \"{}\";", signal_id, module_id)?;
                }
            }
        }

        writeln!(out, "}}")
    }

    pub fn export_dot_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut file = File::create(path)?;
        self.export_dot(&mut file)
    }
}

fn dfs_cycle(
    current: SignalKey,
    graph: &IndexMap<SignalKey, Edges>,
    visited: &mut IndexSet<SignalKey>,
    stack: &mut IndexSet<SignalKey>,
    path: &mut Vec<SignalKey>,
    cycles: &mut Vec<Vec<SignalKey>>,
) {
    visited.insert(current);
    stack.insert(current);
    path.push(current);
    if let Some(neighbors) = graph.get(&current) {
        for &neighbor in neighbors {
            if stack.contains(&neighbor) {
                if let Some(pos) = path.iter().position(|&key| key == neighbor) {
                    cycles.push(path[pos..].to_vec());
                }
            } else if !visited.contains(&neighbor) {
                dfs_cycle(neighbor, graph, visited, stack, path, cycles);
            }
        }
    }
    stack.swap_remove(&current);
    path.pop();
}

fn random_id(rng: &mut impl Rng) -> String {
    const CHARSET: &[u8] = b"0123456789abcdef";
    (0..6)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
