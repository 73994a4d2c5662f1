use clonal_common::{Agent, LineageConfig, Snapshot};
use log::warn;
use std::collections::BTreeMap;

/// The agents of one snapshot sharing a nonzero clone id.
#[derive(Debug, Clone)]
pub struct CloneGroup<'a> {
    pub id: u32,
    /// Members in snapshot order; never empty.
    pub members: Vec<&'a Agent>,
}

impl<'a> CloneGroup<'a> {
    /// Status of the first member, taken as the status of the whole clone.
    pub fn mutation_status(&self) -> Option<&'a str> {
        self.members.first().and_then(|&a| a.mutation_status.as_deref())
    }

    /// Clone size in biological cells.
    pub fn cell_count(&self) -> u32 {
        crate::metrics::cell_count(self.members.iter().copied())
    }
}

/// Groups a snapshot's agents by clone id, leaving out unassigned (id 0) sites.
pub fn group_clones(snapshot: &Snapshot) -> BTreeMap<u32, CloneGroup<'_>> {
    let mut clones: BTreeMap<u32, CloneGroup<'_>> = BTreeMap::new();
    for agent in snapshot.agents().iter().filter(|a| a.clone_id != 0) {
        clones
            .entry(agent.clone_id)
            .or_insert_with(|| CloneGroup { id: agent.clone_id, members: Vec::new() })
            .members
            .push(agent);
    }
    clones
}

/// Clones split by lineage.
#[derive(Debug, Default)]
pub struct ClonePartition<'a> {
    pub wild_type: BTreeMap<u32, CloneGroup<'a>>,
    /// Mutant clones keyed by mutation label.
    pub mutants: BTreeMap<String, BTreeMap<u32, CloneGroup<'a>>>,
    /// Clones whose status matched no recognized label.
    pub unrecognized: usize,
}

impl<'a> ClonePartition<'a> {
    /// Total clones routed into a bucket.
    pub fn classified(&self) -> usize {
        self.wild_type.len() + self.mutants.values().map(BTreeMap::len).sum::<usize>()
    }
}

/// Routes every clone into the wild-type bucket or its mutant bucket.
///
/// Clones with a status outside the lineage vocabulary are excluded from both
/// buckets; they are counted and reported once per label.
pub fn classify_clones<'a>(clones: BTreeMap<u32, CloneGroup<'a>>, lineages: &LineageConfig) -> ClonePartition<'a> {
    let mut partition = ClonePartition::default();
    let mut dropped: BTreeMap<String, usize> = BTreeMap::new();

    for (id, clone) in clones {
        match clone.mutation_status() {
            Some(status) if status == lineages.wild_type => {
                partition.wild_type.insert(id, clone);
            }
            Some(status) if lineages.mutants.iter().any(|m| m == status) => {
                partition
                    .mutants
                    .entry(status.to_string())
                    .or_default()
                    .insert(id, clone);
            }
            other => {
                *dropped.entry(other.unwrap_or("<unset>").to_string()).or_default() += 1;
                partition.unrecognized += 1;
            }
        }
    }

    for (label, count) in &dropped {
        warn!(
            "Excluded {} clone(s) with unrecognized mutation status '{}' from lineage buckets.",
            count, label
        );
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::agent;
    use clonal_common::{CellState, CellType};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn with_status(mut a: Agent, status: &str) -> Agent {
        a.mutation_status = Some(status.to_string());
        a
    }

    #[test]
    fn groups_skip_unassigned_sites() {
        let snapshot = Snapshot::from_agents(vec![
            agent(1, CellState::Single, CellType::A, 5, &[]),
            agent(2, CellState::Empty, CellType::Unset, 0, &[]),
            agent(3, CellState::Double, CellType::AB, 7, &[]),
            agent(4, CellState::Single, CellType::B, 5, &[]),
        ]);
        let clones = group_clones(&snapshot);
        assert_eq!(clones.len(), 2);
        let whos: Vec<u32> = clones[&5].members.iter().map(|a| a.who).collect();
        assert_eq!(whos, vec![1, 4]);
        assert_eq!(clones[&7].cell_count(), 2);
    }

    #[test]
    fn grouping_is_a_partition_of_the_snapshot() {
        let mut rng = StdRng::seed_from_u64(17);
        let agents: Vec<Agent> = (0..500)
            .map(|who| {
                let clone_id = rng.random_range(0..12u32);
                let state = if clone_id == 0 { CellState::Empty } else { CellState::Single };
                agent(who, state, CellType::A, clone_id, &[])
            })
            .collect();
        let snapshot = Snapshot::from_agents(agents);
        let clones = group_clones(&snapshot);

        let unassigned = snapshot.agents().iter().filter(|a| a.clone_id == 0).count();
        let mut seen: Vec<u32> = clones.values().flat_map(|c| c.members.iter().map(|a| a.who)).collect();
        assert!(clones.values().all(|c| !c.members.is_empty()));
        assert!(clones.values().all(|c| c.members.iter().all(|a| a.clone_id == c.id)));
        assert_eq!(seen.len() + unassigned, snapshot.len());
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len() + unassigned, snapshot.len());
    }

    #[test]
    fn recognized_clones_land_in_exactly_one_bucket() {
        let snapshot = Snapshot::from_agents(vec![
            with_status(agent(1, CellState::Single, CellType::A, 1, &[]), "WT"),
            with_status(agent(2, CellState::Single, CellType::A, 2, &[]), "p53"),
            with_status(agent(3, CellState::Single, CellType::A, 3, &[]), "N"),
            with_status(agent(4, CellState::Single, CellType::A, 4, &[]), "p53"),
            with_status(agent(5, CellState::Single, CellType::A, 1, &[]), "WT"),
        ]);
        let partition = classify_clones(group_clones(&snapshot), &LineageConfig::default());

        assert_eq!(partition.wild_type.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(partition.mutants["p53"].keys().copied().collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(partition.mutants["N"].keys().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(partition.classified(), 4);
        assert_eq!(partition.unrecognized, 0);
    }

    #[test]
    fn unrecognized_status_is_excluded_and_counted() {
        let snapshot = Snapshot::from_agents(vec![
            with_status(agent(1, CellState::Single, CellType::A, 1, &[]), "WT"),
            with_status(agent(2, CellState::Single, CellType::A, 2, &[]), "KRAS"),
            agent(3, CellState::Single, CellType::A, 3, &[]),
        ]);
        let partition = classify_clones(group_clones(&snapshot), &LineageConfig::default());

        assert_eq!(partition.wild_type.len(), 1);
        assert!(partition.mutants.is_empty());
        assert_eq!(partition.unrecognized, 2);
        assert_eq!(partition.classified() + partition.unrecognized, 3);
    }

    #[test]
    fn first_member_decides_the_lineage() {
        let snapshot = Snapshot::from_agents(vec![
            with_status(agent(1, CellState::Single, CellType::A, 9, &[]), "p53"),
            with_status(agent(2, CellState::Single, CellType::A, 9, &[]), "WT"),
        ]);
        let partition = classify_clones(group_clones(&snapshot), &LineageConfig::default());
        assert!(partition.wild_type.is_empty());
        assert_eq!(partition.mutants["p53"][&9].members.len(), 2);
    }
}
