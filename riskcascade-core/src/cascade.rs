//! Cascade graph of hazards
//!
//! Directed graph keyed by hazard id. Each edge carries a 3×3 conditional matrix
//! indexed by (cause scenario, effect scenario). Adjacency lists are built once
//! per recomputation pass and give direct lookups of incoming and outgoing edges.
//!
//! ## Limitations
//!
//! Propagation is **one hop only**. Aggregators read exactly the conditional value
//! stored on the adjacent edge; nothing is propagated along chains of edges, even
//! though the graph may contain cycles. There is no damping or convergence rule
//! that would make multi-hop propagation well defined on cyclic graphs.
//! [`CascadeGraph::cycle_members`] reports which hazards this limitation touches.

use crate::hazard::{CascadeEdgeRecord, Hazard};
use crate::scenario::{Scenario, ScenarioMatrix};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Directed cause → effect relation between two hazards
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeEdge {
    pub cause: String,
    pub effect: String,
    pub matrix: ScenarioMatrix,
    pub justification: String,
}

/// Far end of an edge resolved for one scenario of the near end
///
/// For an incoming link, `hazard` is the cause and `scenario` the cause scenario.
/// For an outgoing link, `hazard` is the effect and `scenario` the effect scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLink<'a> {
    pub hazard: &'a str,
    pub scenario: Scenario,
    pub conditional: f64,
}

/// Cascade graph for one recomputation pass
#[derive(Debug, Clone, Default)]
pub struct CascadeGraph {
    /// All hazards in the graph, ordered by id
    nodes: BTreeSet<String>,
    /// Edges in insertion order
    edges: Vec<CascadeEdge>,
    /// Hazard id → indices of edges where it is the effect
    incoming: HashMap<String, Vec<usize>>,
    /// Hazard id → indices of edges where it is the cause
    outgoing: HashMap<String, Vec<usize>>,
    /// Edge records that were not added, with the reason
    rejected: Vec<String>,
}

impl CascadeGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a pass from input records
    ///
    /// Edge records referencing unknown hazards, self-loops and repeated
    /// (cause, effect) pairs are skipped and reported in [`CascadeGraph::rejected`].
    pub fn build(hazards: &[Hazard], records: &[CascadeEdgeRecord]) -> Self {
        let mut graph = CascadeGraph::new();
        for hazard in hazards {
            graph.add_node(hazard.id.clone());
        }

        for record in records {
            let edge = CascadeEdge {
                cause: record.cause.clone(),
                effect: record.effect.clone(),
                matrix: record.matrix(),
                justification: record.justification.clone(),
            };
            if let Err(reason) = graph.add_edge(edge) {
                warn!(cause = %record.cause, effect = %record.effect, "{}", reason);
                graph.rejected.push(reason);
            }
        }

        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            rejected = graph.rejected.len(),
            "built cascade graph"
        );
        graph
    }

    /// Add a hazard to the graph
    pub fn add_node(&mut self, hazard_id: String) {
        self.nodes.insert(hazard_id);
    }

    /// Add a cause → effect edge between known hazards
    pub fn add_edge(&mut self, edge: CascadeEdge) -> Result<(), String> {
        if !self.nodes.contains(&edge.cause) {
            return Err(format!(
                "skipping cascade {} -> {}: unknown cause hazard",
                edge.cause, edge.effect
            ));
        }
        if !self.nodes.contains(&edge.effect) {
            return Err(format!(
                "skipping cascade {} -> {}: unknown effect hazard",
                edge.cause, edge.effect
            ));
        }
        if edge.cause == edge.effect {
            return Err(format!(
                "skipping cascade {} -> {}: self-loop",
                edge.cause, edge.effect
            ));
        }
        if self.edge_between(&edge.cause, &edge.effect).is_some() {
            return Err(format!(
                "skipping cascade {} -> {}: duplicate of an earlier record",
                edge.cause, edge.effect
            ));
        }

        let index = self.edges.len();
        self.outgoing
            .entry(edge.cause.clone())
            .or_default()
            .push(index);
        self.incoming
            .entry(edge.effect.clone())
            .or_default()
            .push(index);
        self.edges.push(edge);
        Ok(())
    }

    pub fn contains(&self, hazard_id: &str) -> bool {
        self.nodes.contains(hazard_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Reasons for edge records that were not added
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    /// The edge from `cause` to `effect`, if present
    pub fn edge_between(&self, cause: &str, effect: &str) -> Option<&CascadeEdge> {
        self.outgoing_edges(cause).find(|e| e.effect == effect)
    }

    /// Edges where `hazard_id` is the effect, in insertion order
    pub fn incoming_edges(&self, hazard_id: &str) -> impl Iterator<Item = &CascadeEdge> {
        self.incoming
            .get(hazard_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    /// Edges where `hazard_id` is the cause, in insertion order
    pub fn outgoing_edges(&self, hazard_id: &str) -> impl Iterator<Item = &CascadeEdge> {
        self.outgoing
            .get(hazard_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    /// Number of hazards that can trigger this hazard
    pub fn fan_in(&self, hazard_id: &str) -> usize {
        self.incoming.get(hazard_id).map_or(0, Vec::len)
    }

    /// Number of hazards this hazard can trigger
    pub fn fan_out(&self, hazard_id: &str) -> usize {
        self.outgoing.get(hazard_id).map_or(0, Vec::len)
    }

    /// Populated (cause, cause scenario → conditional) links into `scenario` of `hazard_id`
    pub fn incoming(&self, hazard_id: &str, scenario: Scenario) -> Vec<ResolvedLink<'_>> {
        let mut links = Vec::new();
        for edge in self.incoming_edges(hazard_id) {
            for cause_scenario in Scenario::ALL {
                if let Some(conditional) = edge.matrix.get(cause_scenario, scenario) {
                    links.push(ResolvedLink {
                        hazard: &edge.cause,
                        scenario: cause_scenario,
                        conditional,
                    });
                }
            }
        }
        links
    }

    /// Populated (effect, effect scenario → conditional) links out of `scenario` of `hazard_id`
    pub fn outgoing(&self, hazard_id: &str, scenario: Scenario) -> Vec<ResolvedLink<'_>> {
        let mut links = Vec::new();
        for edge in self.outgoing_edges(hazard_id) {
            for effect_scenario in Scenario::ALL {
                if let Some(conditional) = edge.matrix.get(scenario, effect_scenario) {
                    links.push(ResolvedLink {
                        hazard: &edge.effect,
                        scenario: effect_scenario,
                        conditional,
                    });
                }
            }
        }
        links
    }

    /// Hazards whose snapshot depends on `hazard_id`'s inputs
    ///
    /// Effects inherit its probability; causes carry its damage as cascade damage.
    pub fn affected_by_hazard(&self, hazard_id: &str) -> BTreeSet<String> {
        let mut affected = BTreeSet::new();
        affected.insert(hazard_id.to_string());
        for edge in self.incoming_edges(hazard_id) {
            affected.insert(edge.cause.clone());
        }
        for edge in self.outgoing_edges(hazard_id) {
            affected.insert(edge.effect.clone());
        }
        affected
    }

    /// Hazards whose snapshot depends on the (cause, effect) edge
    pub fn affected_by_edge(&self, cause: &str, effect: &str) -> BTreeSet<String> {
        [cause, effect].iter().map(|s| s.to_string()).collect()
    }

    /// Hazards that lie on at least one cascade cycle
    ///
    /// Uses Tarjan's strongly connected components; a component of size > 1 is a cycle.
    pub fn cycle_members(&self) -> BTreeSet<String> {
        let mut state = TarjanState::default();
        for node in &self.nodes {
            if !state.indices.contains_key(node.as_str()) {
                self.tarjan_strongconnect(node, &mut state);
            }
        }

        state
            .components
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .flatten()
            .map(str::to_string)
            .collect()
    }

    fn tarjan_strongconnect<'a>(&'a self, v: &'a str, state: &mut TarjanState<'a>) {
        state.indices.insert(v, state.index);
        state.lowlinks.insert(v, state.index);
        state.index += 1;
        state.stack.push(v);
        state.on_stack.insert(v);

        // Consider successors of v
        for edge in self.outgoing_edges(v) {
            let w = edge.effect.as_str();
            if !state.indices.contains_key(w) {
                self.tarjan_strongconnect(w, state);
                let w_lowlink = state.lowlinks[w];
                let v_lowlink = state.lowlinks[v];
                state.lowlinks.insert(v, v_lowlink.min(w_lowlink));
            } else if state.on_stack.contains(w) {
                let w_index = state.indices[w];
                let v_lowlink = state.lowlinks[v];
                state.lowlinks.insert(v, v_lowlink.min(w_index));
            }
        }

        // If v is a root node, pop the stack and emit a component
        if state.lowlinks[v] == state.indices[v] {
            let mut component = Vec::new();
            while let Some(w) = state.stack.pop() {
                state.on_stack.remove(w);
                component.push(w);
                if w == v {
                    break;
                }
            }
            state.components.push(component);
        }
    }
}

#[derive(Default)]
struct TarjanState<'a> {
    index: usize,
    stack: Vec<&'a str>,
    indices: HashMap<&'a str, usize>,
    lowlinks: HashMap<&'a str, usize>,
    on_stack: HashSet<&'a str>,
    components: Vec<Vec<&'a str>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hazard(id: &str) -> Hazard {
        serde_json::from_value(serde_json::json!({ "id": id })).unwrap()
    }

    fn record(cause: &str, effect: &str, cells: &[(Scenario, Scenario, f64)]) -> CascadeEdgeRecord {
        let mut record = CascadeEdgeRecord {
            cause: cause.to_string(),
            effect: effect.to_string(),
            conditional: Default::default(),
            justification: String::new(),
        };
        for &(c, e, v) in cells {
            record.conditional.entry(c).or_default().insert(e, Some(v));
        }
        record
    }

    fn graph(ids: &[&str], records: Vec<CascadeEdgeRecord>) -> CascadeGraph {
        let hazards: Vec<_> = ids.iter().map(|id| hazard(id)).collect();
        CascadeGraph::build(&hazards, &records)
    }

    #[test]
    fn test_empty_graph() {
        let graph = CascadeGraph::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.incoming("A", Scenario::Major).is_empty());
    }

    #[test]
    fn test_fan_in_fan_out() {
        // A -> B, A -> C, B -> C
        let graph = graph(
            &["A", "B", "C"],
            vec![record("A", "B", &[]), record("A", "C", &[]), record("B", "C", &[])],
        );

        assert_eq!(graph.fan_in("A"), 0);
        assert_eq!(graph.fan_out("A"), 2);
        assert_eq!(graph.fan_in("B"), 1);
        assert_eq!(graph.fan_out("B"), 1);
        assert_eq!(graph.fan_in("C"), 2);
        assert_eq!(graph.fan_out("C"), 0);
    }

    #[test]
    fn test_incoming_resolves_cause_scenarios() {
        use Scenario::*;
        let graph = graph(
            &["C", "E"],
            vec![record(
                "C",
                "E",
                &[(Major, Major, 0.2), (Extreme, Major, 0.5), (Major, Extreme, 0.9)],
            )],
        );

        let links = graph.incoming("E", Major);
        assert_eq!(
            links,
            vec![
                ResolvedLink { hazard: "C", scenario: Major, conditional: 0.2 },
                ResolvedLink { hazard: "C", scenario: Extreme, conditional: 0.5 },
            ]
        );
        assert!(graph.incoming("E", Considerable).is_empty());
        assert!(graph.incoming("C", Major).is_empty());
    }

    #[test]
    fn test_outgoing_resolves_effect_scenarios() {
        use Scenario::*;
        let graph = graph(
            &["C", "E"],
            vec![record("C", "E", &[(Major, Major, 0.2), (Major, Extreme, 0.1)])],
        );

        let links = graph.outgoing("C", Major);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].hazard, "E");
        assert_eq!(links[0].scenario, Major);
        assert_eq!(links[1].scenario, Extreme);
        assert!(graph.outgoing("C", Extreme).is_empty());
    }

    #[test]
    fn test_rejected_edges() {
        let graph = graph(
            &["A", "B"],
            vec![
                record("A", "B", &[]),
                record("A", "B", &[]),
                record("A", "A", &[]),
                record("A", "Z", &[]),
                record("Y", "B", &[]),
            ],
        );

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.rejected().len(), 4);
        assert!(graph.rejected()[0].contains("duplicate"));
        assert!(graph.rejected()[1].contains("self-loop"));
        assert!(graph.rejected()[2].contains("unknown effect"));
        assert!(graph.rejected()[3].contains("unknown cause"));
    }

    #[test]
    fn test_cycle_members() {
        // A -> B -> C -> A is a cycle; D hangs off it
        let graph = graph(
            &["A", "B", "C", "D"],
            vec![
                record("A", "B", &[]),
                record("B", "C", &[]),
                record("C", "A", &[]),
                record("C", "D", &[]),
            ],
        );

        let members: Vec<_> = graph.cycle_members().into_iter().collect();
        assert_eq!(members, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_affected_sets() {
        let graph = graph(
            &["A", "B", "C", "D"],
            vec![record("A", "B", &[]), record("B", "C", &[])],
        );

        let affected: Vec<_> = graph.affected_by_hazard("B").into_iter().collect();
        assert_eq!(affected, vec!["A", "B", "C"]);
        let affected: Vec<_> = graph.affected_by_edge("C", "D").into_iter().collect();
        assert_eq!(affected, vec!["C", "D"]);
    }
}
