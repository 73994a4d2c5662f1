//! Neighbour graphs over agents.
//!
//! Clone graphs are built over lineage slots: a single site is one node, a
//! double site is two nodes (`a` and `b`) standing for the two cells it holds.
//! A double connects to both slots of a neighbouring double and to the only
//! slot of a neighbouring single. The two slots of one double are not joined
//! to each other directly.

use crate::clones::CloneGroup;
use clonal_common::{Agent, CellState, Snapshot};
use petgraph::graphmap::{NodeTrait, UnGraphMap};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

/// Node of a clone graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LineageSlot {
    /// The cell of a single site.
    Whole(u32),
    /// First cell of a double site.
    First(u32),
    /// Second cell of a double site.
    Second(u32),
}

impl fmt::Display for LineageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineageSlot::Whole(who) => write!(f, "{}", who),
            LineageSlot::First(who) => write!(f, "{}a", who),
            LineageSlot::Second(who) => write!(f, "{}b", who),
        }
    }
}

/// Slots contributed by one site; empty sites contribute none.
fn slots(agent: &Agent) -> Vec<LineageSlot> {
    match agent.state {
        CellState::Single => vec![LineageSlot::Whole(agent.who)],
        CellState::Double => vec![LineageSlot::First(agent.who), LineageSlot::Second(agent.who)],
        CellState::Empty => Vec::new(),
    }
}

/// Slot adjacency lists for one clone. Only neighbours inside `members` count.
pub fn clone_adjacencies(members: &[&Agent]) -> BTreeMap<LineageSlot, Vec<LineageSlot>> {
    let index: HashMap<u32, &Agent> = members.iter().map(|&a| (a.who, a)).collect();
    let mut adjacencies: BTreeMap<LineageSlot, Vec<LineageSlot>> = BTreeMap::new();

    for agent in members {
        let own = slots(agent);
        for slot in &own {
            adjacencies.entry(*slot).or_default();
        }
        if own.is_empty() {
            continue;
        }

        for &who in &agent.neighbors {
            if who == agent.who {
                continue;
            }
            let Some(neighbor) = index.get(&who) else { continue };
            let theirs = slots(neighbor);
            for slot in &own {
                if let Some(list) = adjacencies.get_mut(slot) {
                    list.extend(theirs.iter().copied());
                }
            }
        }
    }
    adjacencies
}

/// Site adjacency lists over a whole group, one node per agent whatever its state.
pub fn grid_adjacencies(agents: &[Agent]) -> BTreeMap<u32, Vec<u32>> {
    let present: HashSet<u32> = agents.iter().map(|a| a.who).collect();
    agents
        .iter()
        .map(|agent| {
            let neighbors = agent
                .neighbors
                .iter()
                .copied()
                .filter(|who| *who != agent.who && present.contains(who))
                .collect();
            (agent.who, neighbors)
        })
        .collect()
}

/// Undirected simple graph from adjacency lists. Symmetric listings collapse to
/// one edge, self-loops are dropped, isolated nodes are kept.
pub fn build_graph<N: NodeTrait>(adjacencies: &BTreeMap<N, Vec<N>>) -> UnGraphMap<N, ()> {
    let edge_hint = adjacencies.values().map(Vec::len).sum::<usize>() / 2;
    let mut graph = UnGraphMap::with_capacity(adjacencies.len(), edge_hint);
    for (&node, neighbors) in adjacencies {
        graph.add_node(node);
        for &neighbor in neighbors {
            if neighbor != node {
                graph.add_edge(node, neighbor, ());
            }
        }
    }
    graph
}

pub fn clone_graph(clone: &CloneGroup<'_>) -> UnGraphMap<LineageSlot, ()> {
    build_graph(&clone_adjacencies(&clone.members))
}

pub fn grid_graph(snapshot: &Snapshot) -> UnGraphMap<u32, ()> {
    build_graph(&grid_adjacencies(snapshot.agents()))
}

/// Number of connected components (breadth-first sweep).
pub fn component_count<N: NodeTrait>(graph: &UnGraphMap<N, ()>) -> usize {
    let mut visited: HashSet<N> = HashSet::with_capacity(graph.node_count());
    let mut components = 0;

    for start in graph.nodes() {
        if !visited.insert(start) {
            continue;
        }
        components += 1;
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for next in graph.neighbors(current) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }
    components
}

/// Connected regions of the whole grid, empty sites included.
pub fn grid_component_count(snapshot: &Snapshot) -> usize {
    component_count(&grid_graph(snapshot))
}

/// A clone is fragmented when its graph splits into more than one component.
pub fn is_fragmented<N: NodeTrait>(graph: &UnGraphMap<N, ()>) -> bool {
    component_count(graph) > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clones::group_clones;
    use crate::metrics::{cell_count, tests::agent};
    use clonal_common::CellType;

    fn names(graph: &UnGraphMap<LineageSlot, ()>) -> (Vec<String>, Vec<String>) {
        let mut nodes: Vec<String> = graph.nodes().map(|n| n.to_string()).collect();
        nodes.sort();
        let mut edges: Vec<String> = graph
            .all_edges()
            .map(|(a, b, _)| {
                let (a, b) = (a.to_string(), b.to_string());
                if a <= b {
                    format!("{}-{}", a, b)
                } else {
                    format!("{}-{}", b, a)
                }
            })
            .collect();
        edges.sort();
        (nodes, edges)
    }

    #[test]
    fn single_next_to_double() {
        let snapshot = Snapshot::from_agents(vec![
            agent(1, CellState::Single, CellType::A, 5, &[2]),
            agent(2, CellState::Double, CellType::BB, 5, &[1]),
        ]);
        assert_eq!(cell_count(snapshot.agents()), 3);

        let clones = group_clones(&snapshot);
        let graph = clone_graph(&clones[&5]);
        let (nodes, edges) = names(&graph);
        assert_eq!(nodes, vec!["1", "2a", "2b"]);
        assert_eq!(edges, vec!["1-2a", "1-2b"]);
        assert!(!is_fragmented(&graph));
    }

    #[test]
    fn double_pairs_connect_all_four_slots() {
        let a = agent(1, CellState::Double, CellType::AA, 3, &[2]);
        let b = agent(2, CellState::Double, CellType::AB, 3, &[1]);
        let graph = build_graph(&clone_adjacencies(&[&a, &b]));
        let (_, edges) = names(&graph);
        assert_eq!(edges, vec!["1a-2a", "1a-2b", "1b-2a", "1b-2b"]);
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn mutual_neighbors_are_listed_both_ways() {
        let members = vec![
            agent(1, CellState::Single, CellType::A, 3, &[2, 3]),
            agent(2, CellState::Double, CellType::AB, 3, &[1, 3]),
            agent(3, CellState::Single, CellType::B, 3, &[1, 2]),
        ];
        let refs: Vec<&Agent> = members.iter().collect();
        let adjacencies = clone_adjacencies(&refs);
        for (slot, neighbors) in &adjacencies {
            for other in neighbors {
                assert!(
                    adjacencies[other].contains(slot),
                    "{} lists {} but not the reverse",
                    slot,
                    other
                );
            }
        }
        // Symmetric listings collapse to a single undirected edge
        let graph = build_graph(&adjacencies);
        assert_eq!(graph.edge_count(), 5);
    }

    #[test]
    fn contiguous_clone_is_not_fragmented() {
        let members = vec![
            agent(1, CellState::Single, CellType::A, 8, &[2]),
            agent(2, CellState::Single, CellType::A, 8, &[1, 3]),
            agent(3, CellState::Double, CellType::AA, 8, &[2, 4]),
            agent(4, CellState::Single, CellType::A, 8, &[3]),
        ];
        let refs: Vec<&Agent> = members.iter().collect();
        let graph = build_graph(&clone_adjacencies(&refs));
        assert_eq!(component_count(&graph), 1);
        assert!(!is_fragmented(&graph));
    }

    #[test]
    fn split_clone_is_fragmented() {
        // Sites 2 and 3 touch through site 9, which belongs to another clone
        let snapshot = Snapshot::from_agents(vec![
            agent(1, CellState::Single, CellType::A, 8, &[2]),
            agent(2, CellState::Single, CellType::A, 8, &[1, 9]),
            agent(9, CellState::Single, CellType::B, 4, &[2, 3]),
            agent(3, CellState::Single, CellType::A, 8, &[9, 4]),
            agent(4, CellState::Single, CellType::A, 8, &[3]),
        ]);
        let clones = group_clones(&snapshot);
        let graph = clone_graph(&clones[&8]);
        assert_eq!(component_count(&graph), 2);
        assert!(is_fragmented(&graph));
        assert!(!graph.contains_node(LineageSlot::Whole(9)));
    }

    #[test]
    fn isolated_and_empty_sites() {
        let members = vec![
            agent(1, CellState::Single, CellType::A, 2, &[1, 3]),
            agent(3, CellState::Empty, CellType::Unset, 2, &[1]),
        ];
        let refs: Vec<&Agent> = members.iter().collect();
        let graph = build_graph(&clone_adjacencies(&refs));
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(!is_fragmented(&graph));

        let lone_double = agent(7, CellState::Double, CellType::AB, 2, &[]);
        let graph = build_graph(&clone_adjacencies(&[&lone_double]));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(component_count(&graph), 2);
    }

    #[test]
    fn empty_graph_has_no_components() {
        let graph = build_graph::<LineageSlot>(&BTreeMap::new());
        assert_eq!(component_count(&graph), 0);
        assert!(!is_fragmented(&graph));
    }

    #[test]
    fn grid_graph_keeps_every_site() {
        let snapshot = Snapshot::from_agents(vec![
            agent(1, CellState::Double, CellType::AA, 1, &[2, 3, 42]),
            agent(2, CellState::Empty, CellType::Unset, 0, &[1]),
            agent(3, CellState::Single, CellType::B, 2, &[1]),
            agent(4, CellState::Empty, CellType::Unset, 0, &[]),
        ]);
        let graph = grid_graph(&snapshot);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.contains_edge(2, 1));
        assert_eq!(component_count(&graph), 2);
        assert_eq!(grid_component_count(&snapshot), 2);
    }
}
