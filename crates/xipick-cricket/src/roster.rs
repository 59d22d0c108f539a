// Fixture rosters: one side's players and the team they face.

use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Roster {
    pub name: String,
    /// Opposing team name, as it appears in the `against_team` column.
    pub opponent: String,
    pub players: Vec<String>,
}

impl Roster {
    pub fn new(name: &str, opponent: &str, players: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            opponent: opponent.to_string(),
            players: players.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players listed more than once, in first-repeat order.
    pub fn duplicates(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut repeated = Vec::new();
        for p in &self.players {
            if !seen.insert(p.as_str()) && !repeated.contains(&p.as_str()) {
                repeated.push(p.as_str());
            }
        }
        repeated
    }
}
