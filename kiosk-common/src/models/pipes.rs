//! Pipe assignment manager
//!
//! A pipe is a physical dispenser channel, numbered from 1. Each pipe holds
//! at most one ingredient and each ingredient sits in at most one pipe.
//! Assignments are kept sparse; empty pipes have no entry.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest number of pipes a machine may declare
pub const MAX_PIPES: u32 = 100;

const PIPE_LABEL_PREFIX: &str = "Pipe";

/// 1-based pipe identifier, rendered as `"Pipe <n>"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PipeId(u32);

impl PipeId {
    /// Returns None for 0
    pub fn new(number: u32) -> Option<Self> {
        (number >= 1).then_some(PipeId(number))
    }

    pub fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", PIPE_LABEL_PREFIX, self.0)
    }
}

impl FromStr for PipeId {
    type Err = PipeError;

    /// Accepts `"Pipe 3"` and a bare `"3"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix(PIPE_LABEL_PREFIX)
            .map(str::trim_start)
            .unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .ok()
            .and_then(PipeId::new)
            .ok_or_else(|| PipeError::InvalidLabel(s.to_string()))
    }
}

impl Serialize for PipeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PipeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Pipe assignment errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipeError {
    /// The ingredient already occupies another pipe
    #[error("{ingredient} is already assigned to {pipe}")]
    AlreadyAssignedElsewhere { ingredient: String, pipe: PipeId },

    /// Pipe number beyond the configured pipe count
    #[error("{pipe} is out of range (machine has {count} pipes)")]
    OutOfRange { pipe: PipeId, count: u32 },

    #[error("Pipe count {0} exceeds the maximum of {MAX_PIPES}")]
    TooManyPipes(u32),

    #[error("Invalid pipe label: {0}")]
    InvalidLabel(String),
}

/// Pipe → ingredient mapping for a machine with `count` pipes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipeAssignment {
    count: u32,
    slots: BTreeMap<PipeId, String>,
}

impl PipeAssignment {
    /// Empty assignment for `count` pipes
    pub fn new(count: u32) -> Result<Self, PipeError> {
        if count > MAX_PIPES {
            return Err(PipeError::TooManyPipes(count));
        }
        Ok(Self {
            count,
            slots: BTreeMap::new(),
        })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// All pipe ids `1..=count`
    pub fn pipes(&self) -> impl Iterator<Item = PipeId> {
        (1..=self.count).map(PipeId)
    }

    /// Assigned pipes in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (PipeId, &str)> {
        self.slots.iter().map(|(pipe, name)| (*pipe, name.as_str()))
    }

    pub fn get(&self, pipe: PipeId) -> Option<&str> {
        self.slots.get(&pipe).map(String::as_str)
    }

    /// Put `ingredient` into `pipe`, replacing whatever the pipe held
    ///
    /// An empty name clears the pipe.
    pub fn assign(&mut self, pipe: PipeId, ingredient: &str) -> Result<(), PipeError> {
        self.check_range(pipe)?;

        let ingredient = ingredient.trim();
        if ingredient.is_empty() {
            self.slots.remove(&pipe);
            return Ok(());
        }

        if let Some(holder) = self.pipe_of(ingredient) {
            if holder != pipe {
                return Err(PipeError::AlreadyAssignedElsewhere {
                    ingredient: ingredient.to_string(),
                    pipe: holder,
                });
            }
        }

        self.slots.insert(pipe, ingredient.to_string());
        Ok(())
    }

    /// Empty a pipe, returning what it held
    pub fn clear(&mut self, pipe: PipeId) -> Result<Option<String>, PipeError> {
        self.check_range(pipe)?;
        Ok(self.slots.remove(&pipe))
    }

    /// Change the pipe count
    ///
    /// Assignments of pipes beyond `new_count` are dropped and returned; all
    /// other assignments are kept unchanged.
    pub fn resize(&mut self, new_count: u32) -> Result<Vec<(PipeId, String)>, PipeError> {
        if new_count > MAX_PIPES {
            return Err(PipeError::TooManyPipes(new_count));
        }
        let dropped = match PipeId::new(new_count + 1) {
            Some(first_dropped) => self.slots.split_off(&first_dropped).into_iter().collect(),
            None => Vec::new(),
        };
        self.count = new_count;
        Ok(dropped)
    }

    /// Linear scan: whether any pipe holds `ingredient`
    pub fn is_assigned(&self, ingredient: &str) -> bool {
        self.pipe_of(ingredient).is_some()
    }

    pub fn pipe_of(&self, ingredient: &str) -> Option<PipeId> {
        self.slots
            .iter()
            .find(|(_, name)| name.as_str() == ingredient)
            .map(|(pipe, _)| *pipe)
    }

    /// Unassigned pipe numbers in ascending order
    pub fn missing(&self) -> Vec<u32> {
        self.pipes()
            .filter(|pipe| !self.slots.contains_key(pipe))
            .map(PipeId::number)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.len() == self.count as usize
    }

    /// Restrict to the pipes whose ingredient satisfies `keep`
    pub fn subset(&self, mut keep: impl FnMut(&str) -> bool) -> Vec<(PipeId, String)> {
        self.iter()
            .filter(|(_, name)| keep(name))
            .map(|(pipe, name)| (pipe, name.to_string()))
            .collect()
    }

    fn check_range(&self, pipe: PipeId) -> Result<(), PipeError> {
        if pipe.number() > self.count {
            return Err(PipeError::OutOfRange {
                pipe,
                count: self.count,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe(n: u32) -> PipeId {
        PipeId::new(n).unwrap()
    }

    #[test]
    fn test_pipe_label_round_trip() {
        assert_eq!(pipe(3).to_string(), "Pipe 3");
        assert_eq!("Pipe 3".parse::<PipeId>().unwrap(), pipe(3));
        assert_eq!("Pipe12".parse::<PipeId>().unwrap(), pipe(12));
        assert_eq!("7".parse::<PipeId>().unwrap(), pipe(7));
        assert!("Pipe 0".parse::<PipeId>().is_err());
        assert!("Tube 1".parse::<PipeId>().is_err());
        assert!(PipeId::new(0).is_none());
    }

    #[test]
    fn test_assign_rejects_ingredient_held_elsewhere() {
        let mut pipes = PipeAssignment::new(3).unwrap();
        pipes.assign(pipe(1), "Vodka").unwrap();

        let err = pipes.assign(pipe(2), "Vodka").unwrap_err();
        assert_eq!(
            err,
            PipeError::AlreadyAssignedElsewhere {
                ingredient: "Vodka".to_string(),
                pipe: pipe(1),
            }
        );
        assert_eq!(pipes.get(pipe(2)), None);

        // Same pipe again is fine
        pipes.assign(pipe(1), "Vodka").unwrap();
        assert_eq!(pipes.get(pipe(1)), Some("Vodka"));
    }

    #[test]
    fn test_assign_replaces_pipe_value_and_frees_old_ingredient() {
        let mut pipes = PipeAssignment::new(2).unwrap();
        pipes.assign(pipe(1), "Vodka").unwrap();
        pipes.assign(pipe(1), "Gin").unwrap();

        assert!(!pipes.is_assigned("Vodka"));
        pipes.assign(pipe(2), "Vodka").unwrap();
        assert_eq!(pipes.pipe_of("Vodka"), Some(pipe(2)));
    }

    #[test]
    fn test_assign_out_of_range() {
        let mut pipes = PipeAssignment::new(2).unwrap();
        let err = pipes.assign(pipe(3), "Rum").unwrap_err();
        assert!(matches!(err, PipeError::OutOfRange { count: 2, .. }));
    }

    #[test]
    fn test_empty_name_clears() {
        let mut pipes = PipeAssignment::new(2).unwrap();
        pipes.assign(pipe(2), "Rum").unwrap();
        pipes.assign(pipe(2), "  ").unwrap();
        assert_eq!(pipes.get(pipe(2)), None);
    }

    #[test]
    fn test_clear_then_reassign_elsewhere() {
        let mut pipes = PipeAssignment::new(2).unwrap();
        pipes.assign(pipe(1), "Rum").unwrap();
        assert_eq!(pipes.clear(pipe(1)).unwrap(), Some("Rum".to_string()));
        pipes.assign(pipe(2), "Rum").unwrap();
        assert_eq!(pipes.pipe_of("Rum"), Some(pipe(2)));
    }

    #[test]
    fn test_at_most_one_pipe_per_ingredient_after_mixed_operations() {
        let names = ["Vodka", "Gin", "Rum"];
        let mut pipes = PipeAssignment::new(4).unwrap();

        for step in 0..40u32 {
            let target = pipe(step % 4 + 1);
            let name = names[(step as usize * 7) % names.len()];
            if step % 5 == 0 {
                pipes.clear(target).unwrap();
            } else {
                let _ = pipes.assign(target, name);
            }

            for name in names {
                let holders = pipes.iter().filter(|(_, held)| *held == name).count();
                assert!(holders <= 1, "{} held by {} pipes", name, holders);
            }
        }
    }

    #[test]
    fn test_resize_down_drops_only_higher_pipes() {
        let mut pipes = PipeAssignment::new(4).unwrap();
        pipes.assign(pipe(1), "Vodka").unwrap();
        pipes.assign(pipe(2), "Gin").unwrap();
        pipes.assign(pipe(3), "Rum").unwrap();
        pipes.assign(pipe(4), "Tequila").unwrap();

        let dropped = pipes.resize(2).unwrap();

        assert_eq!(
            dropped,
            vec![(pipe(3), "Rum".to_string()), (pipe(4), "Tequila".to_string())]
        );
        assert_eq!(pipes.count(), 2);
        assert_eq!(pipes.get(pipe(1)), Some("Vodka"));
        assert_eq!(pipes.get(pipe(2)), Some("Gin"));
        assert!(!pipes.is_assigned("Rum"));
    }

    #[test]
    fn test_resize_up_keeps_assignments_and_adds_empty_pipes() {
        let mut pipes = PipeAssignment::new(1).unwrap();
        pipes.assign(pipe(1), "Vodka").unwrap();

        assert!(pipes.resize(3).unwrap().is_empty());
        assert_eq!(pipes.get(pipe(1)), Some("Vodka"));
        assert_eq!(pipes.missing(), vec![2, 3]);
    }

    #[test]
    fn test_resize_limits() {
        let mut pipes = PipeAssignment::new(2).unwrap();
        pipes.assign(pipe(1), "Vodka").unwrap();
        assert_eq!(pipes.resize(0).unwrap().len(), 1);
        assert_eq!(pipes.resize(MAX_PIPES + 1), Err(PipeError::TooManyPipes(MAX_PIPES + 1)));
        assert_eq!(PipeAssignment::new(MAX_PIPES + 1), Err(PipeError::TooManyPipes(MAX_PIPES + 1)));
    }

    #[test]
    fn test_missing_is_ascending() {
        let mut pipes = PipeAssignment::new(5).unwrap();
        pipes.assign(pipe(4), "Gin").unwrap();
        pipes.assign(pipe(2), "Rum").unwrap();
        assert_eq!(pipes.missing(), vec![1, 3, 5]);
        assert!(!pipes.is_complete());
    }
}
