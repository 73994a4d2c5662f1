//! Per-group formulas. Every function accepts any iterator of agents so the
//! same rule serves a whole snapshot, a clone, or a grid chunk.

use clonal_common::{Agent, CellState};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Biological cells in a group: doubles count twice, empties not at all.
pub fn cell_count<I>(agents: I) -> u32
where
    I: IntoIterator,
    I::Item: Borrow<Agent>,
{
    agents.into_iter().map(|a| a.borrow().cell_count()).sum()
}

/// Counts of the four tracked populations in a group.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPopulations {
    /// Proliferating (type A) cells.
    pub alpha: u32,
    /// Differentiating (type B) cells.
    pub beta: u32,
    pub doubles: u32,
    pub empties: u32,
}

impl CellPopulations {
    pub fn of<I>(agents: I) -> Self
    where
        I: IntoIterator,
        I::Item: Borrow<Agent>,
    {
        let mut populations = CellPopulations::default();
        for agent in agents {
            let agent = agent.borrow();
            populations.alpha += agent.cell_type.alpha_count();
            populations.beta += agent.cell_type.beta_count();
            match agent.state {
                CellState::Double => populations.doubles += 1,
                CellState::Empty => populations.empties += 1,
                CellState::Single => {}
            }
        }
        populations
    }

    /// Proportion of proliferating cells; `None` when the group has neither type.
    pub fn rho(&self) -> Option<f64> {
        let total = self.alpha + self.beta;
        if total == 0 {
            None
        } else {
            Some(self.alpha as f64 / total as f64)
        }
    }
}

/// `alpha / (alpha + beta)` over a group.
pub fn rho<I>(agents: I) -> Option<f64>
where
    I: IntoIterator,
    I::Item: Borrow<Agent>,
{
    CellPopulations::of(agents).rho()
}

/// Cells per site as a percentage; `None` for an empty group.
pub fn density(agents: &[&Agent]) -> Option<f64> {
    if agents.is_empty() {
        return None;
    }
    Some(cell_count(agents.iter().copied()) as f64 / agents.len() as f64 * 100.0)
}

/// Share of cells carrying `label`, as a percentage of all cells in the group.
pub fn mutant_percentage(agents: &[Agent], label: &str) -> Option<f64> {
    let total = cell_count(agents);
    if total == 0 {
        return None;
    }
    let mutants = cell_count(agents.iter().filter(|a| a.has_status(label)));
    Some(mutants as f64 / total as f64 * 100.0)
}

/// Distinct, set mutation labels in first-seen order.
pub fn mutation_labels(agents: &[Agent]) -> Vec<&str> {
    let mut labels: Vec<&str> = Vec::new();
    for status in agents.iter().filter_map(|a| a.mutation_status.as_deref()) {
        if !labels.contains(&status) {
            labels.push(status);
        }
    }
    labels
}
