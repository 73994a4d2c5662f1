use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Occupancy of a grid site. A `Double` site holds two biological cells.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    Single,
    Double,
    Empty,
}

impl FromStr for CellState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single" => Ok(CellState::Single),
            "double" => Ok(CellState::Double),
            "empty" => Ok(CellState::Empty),
            other => anyhow::bail!("unknown cell state '{}'", other),
        }
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellState::Single => "single",
            CellState::Double => "double",
            CellState::Empty => "empty",
        };
        f.write_str(name)
    }
}

/// Cell-type tag of a site. Two-letter tags describe the pair held by a double site.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    A,
    B,
    AA,
    BB,
    AB,
    BA,
    /// No cell on the site.
    Unset,
}

impl CellType {
    /// Number of proliferating (type A) cells this tag stands for.
    pub fn alpha_count(self) -> u32 {
        match self {
            CellType::A | CellType::AB | CellType::BA => 1,
            CellType::AA => 2,
            CellType::B | CellType::BB | CellType::Unset => 0,
        }
    }

    /// Number of differentiating (type B) cells this tag stands for.
    pub fn beta_count(self) -> u32 {
        match self {
            CellType::B | CellType::AB | CellType::BA => 1,
            CellType::BB => 2,
            CellType::A | CellType::AA | CellType::Unset => 0,
        }
    }
}

impl FromStr for CellType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(CellType::A),
            "B" => Ok(CellType::B),
            "AA" => Ok(CellType::AA),
            "BB" => Ok(CellType::BB),
            "AB" => Ok(CellType::AB),
            "BA" => Ok(CellType::BA),
            "" | "0" => Ok(CellType::Unset),
            other => anyhow::bail!("unknown cell type '{}'", other),
        }
    }
}

/// One grid site occupant at the snapshot instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// NetLogo `who` number, unique within a snapshot.
    pub who: u32,
    pub x: f64,
    pub y: f64,
    /// Up to six neighbouring `who` numbers, in file order.
    pub neighbors: Vec<u32>,
    pub cell_type: CellType,
    pub state: CellState,
    pub time: f64,
    pub creation_time: f64,
    /// 0 means the site belongs to no clone.
    pub clone_id: u32,
    /// `None` when the simulator left the status unset.
    pub mutation_status: Option<String>,
}

impl Agent {
    /// Number of biological cells on this site.
    pub fn cell_count(&self) -> u32 {
        match self.state {
            CellState::Single => 1,
            CellState::Double => 2,
            CellState::Empty => 0,
        }
    }

    pub fn is_neighbor(&self, who: u32) -> bool {
        self.neighbors.contains(&who)
    }

    pub fn has_status(&self, label: &str) -> bool {
        self.mutation_status.as_deref() == Some(label)
    }
}

/// Strips the extra quoting NetLogo puts around string columns (`"""single"""`).
pub fn normalize_field(raw: &str) -> String {
    raw.replace('"', "").trim().to_string()
}

/// Parses an agentset literal such as `{turtles 26 48 43}` into its `who` numbers.
pub fn parse_neighbor_list(raw: &str) -> Result<Vec<u32>> {
    let text = raw.trim();
    let inner = text
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| anyhow::anyhow!("neighbor list '{}' is not wrapped in braces", raw))?;

    let mut tokens = inner.split_whitespace();
    match tokens.next() {
        Some(tag) if tag.parse::<u32>().is_err() => {}
        _ => anyhow::bail!("neighbor list '{}' has no agent type tag", raw),
    }

    tokens
        .map(|token| {
            token
                .parse::<u32>()
                .map_err(|e| anyhow::anyhow!("bad neighbor id '{}' in '{}': {}", token, raw, e))
        })
        .collect()
}

/// Mutation status as written by the simulator; `0` and the empty string mean unset.
pub fn parse_mutation_status(raw: &str) -> Option<String> {
    let status = normalize_field(raw);
    if status.is_empty() || status == "0" {
        None
    } else {
        Some(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_turtle_agentset() {
        let ids = parse_neighbor_list("{turtles 26 48 43 39 33 91}").unwrap();
        assert_eq!(ids, vec![26, 48, 43, 39, 33, 91]);
    }

    #[test]
    fn empty_agentset_has_no_neighbors() {
        assert!(parse_neighbor_list("{turtles}").unwrap().is_empty());
        assert!(parse_neighbor_list(" {turtles } ").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_agentsets() {
        assert!(parse_neighbor_list("turtles 1 2").is_err());
        assert!(parse_neighbor_list("{turtles 1 x}").is_err());
        assert!(parse_neighbor_list("{1 2 3}").is_err());
        assert!(parse_neighbor_list("{}").is_err());
    }

    #[test]
    fn strips_netlogo_quoting() {
        assert_eq!(normalize_field("\"single\""), "single");
        assert_eq!(normalize_field("\"\"p53\"\""), "p53");
        assert_eq!(parse_mutation_status("\"WT\""), Some("WT".to_string()));
        assert_eq!(parse_mutation_status("0"), None);
        assert_eq!(parse_mutation_status("\"\""), None);
    }

    #[test]
    fn cell_type_weights() {
        assert_eq!(CellType::AA.alpha_count(), 2);
        assert_eq!(CellType::AB.alpha_count(), 1);
        assert_eq!(CellType::AB.beta_count(), 1);
        assert_eq!(CellType::BB.beta_count(), 2);
        assert_eq!(CellType::Unset.alpha_count() + CellType::Unset.beta_count(), 0);
        assert!("XY".parse::<CellType>().is_err());
        assert_eq!("".parse::<CellType>().unwrap(), CellType::Unset);
    }
}
