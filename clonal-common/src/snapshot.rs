use crate::agent::{normalize_field, parse_mutation_status, parse_neighbor_list, Agent};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Header line opening the agent section of a NetLogo world export.
pub const TURTLES_SENTINEL: &str = "\"TURTLES\"";
/// Header line of the section following the agent table.
pub const PATCHES_SENTINEL: &str = "\"PATCHES\"";

/// Agent row as it appears in the export, before normalization.
#[derive(Debug, Deserialize)]
struct RawAgentRow {
    who: u32,
    xcor: f64,
    ycor: f64,
    #[serde(rename = "six-neighbors")]
    six_neighbors: String,
    #[serde(rename = "cell-type")]
    cell_type: String,
    state: String,
    time: f64,
    cloneid: u32,
    #[serde(rename = "creation-time")]
    creation_time: f64,
    #[serde(rename = "mutation-status")]
    mutation_status: String,
}

impl RawAgentRow {
    fn into_agent(self) -> Result<Agent> {
        let who = self.who;
        let neighbors = parse_neighbor_list(&self.six_neighbors)
            .with_context(|| format!("agent {}: malformed six-neighbors", who))?;
        let cell_type = normalize_field(&self.cell_type)
            .parse()
            .with_context(|| format!("agent {}: malformed cell-type", who))?;
        let state = normalize_field(&self.state)
            .parse()
            .with_context(|| format!("agent {}: malformed state", who))?;

        Ok(Agent {
            who,
            x: self.xcor,
            y: self.ycor,
            neighbors,
            cell_type,
            state,
            time: self.time,
            creation_time: self.creation_time,
            clone_id: self.cloneid,
            mutation_status: parse_mutation_status(&self.mutation_status),
        })
    }
}

/// The agent table of one (week, seed) world export. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct Snapshot {
    agents: Vec<Agent>,
    index: HashMap<u32, usize>,
}

impl Snapshot {
    /// Builds a snapshot from already-parsed agents.
    pub fn from_agents(agents: Vec<Agent>) -> Self {
        let index = agents.iter().enumerate().map(|(i, a)| (a.who, i)).collect();
        Snapshot { agents, index }
    }

    /// Loads and parses a NetLogo world export file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read snapshot file '{}'", path_ref.display()))?;
        Self::parse(&text).with_context(|| format!("Failed to parse snapshot '{}'", path_ref.display()))
    }

    /// Parses the agent section out of a full world export.
    pub fn parse(text: &str) -> Result<Self> {
        let block = turtle_block(text)?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(block.as_bytes());

        let mut agents = Vec::new();
        for (row, record) in reader.deserialize::<RawAgentRow>().enumerate() {
            let raw = record.with_context(|| format!("agent row {} is not a valid record", row + 1))?;
            agents.push(raw.into_agent()?);
        }

        let snapshot = Self::from_agents(agents);
        if snapshot.index.len() != snapshot.agents.len() {
            anyhow::bail!("agent table contains duplicate who numbers");
        }
        Ok(snapshot)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Looks up an agent by `who` number.
    pub fn get(&self, who: u32) -> Option<&Agent> {
        self.index.get(&who).map(|&i| &self.agents[i])
    }
}

/// Returns the header line and rows of the agent section.
fn turtle_block(text: &str) -> Result<String> {
    let lines: Vec<&str> = text.lines().collect();

    let turtles = lines
        .iter()
        .position(|l| l.starts_with(TURTLES_SENTINEL))
        .ok_or_else(|| anyhow::anyhow!("missing {} section header", TURTLES_SENTINEL))?;
    let patches = lines
        .iter()
        .position(|l| l.starts_with(PATCHES_SENTINEL))
        .ok_or_else(|| anyhow::anyhow!("missing {} section header", PATCHES_SENTINEL))?;
    if patches <= turtles + 1 {
        anyhow::bail!(
            "{} section (line {}) does not follow {} section (line {})",
            PATCHES_SENTINEL,
            patches + 1,
            TURTLES_SENTINEL,
            turtles + 1
        );
    }

    let block: Vec<&str> = lines[turtles + 1..patches]
        .iter()
        .copied()
        .take_while(|l| !l.trim().is_empty())
        .collect();
    if block.is_empty() {
        anyhow::bail!("{} section has no header row", TURTLES_SENTINEL);
    }
    Ok(block.join("\n"))
}
