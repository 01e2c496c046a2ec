//! Machine configuration document (`config.json`)
//!
//! Singleton document holding the pipe count, the pipe assignment, the set of
//! ingredients currently loaded into the machine and operator notes. It is
//! always written back wholesale.

use super::pipes::{PipeAssignment, PipeId};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Ordered set of ingredient names (insertion order, no duplicates)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectedIngredients(Vec<String>);

impl SelectedIngredients {
    /// Add a name; returns false when it was already present
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.0.push(name.to_string());
        true
    }

    /// Remove a name; returns false when it was absent
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|n| n != name);
        self.0.len() != before
    }

    pub fn set(&mut self, name: &str, selected: bool) -> bool {
        if selected {
            self.insert(name)
        } else {
            self.remove(name)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for SelectedIngredients {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SelectedIngredients::default();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

impl<'de> Deserialize<'de> for SelectedIngredients {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(names.into_iter().collect())
    }
}

/// In-memory configuration
///
/// Serializes to the store's JSON layout:
/// `{ numberOfPipes, pipeConfig, selectedIngredients, pipeNotes, ingredientRemarks }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ConfigurationDocument", into = "ConfigurationDocument")]
pub struct Configuration {
    pub pipes: PipeAssignment,
    pub selected_ingredients: SelectedIngredients,
    /// Operator note per pipe; pipes without a note have no entry
    pub pipe_notes: BTreeMap<PipeId, String>,
    pub ingredient_remarks: BTreeMap<String, String>,
}

impl Configuration {
    /// Unassigned pipe numbers in ascending order
    pub fn missing_pipes(&self) -> Vec<u32> {
        self.pipes.missing()
    }

    /// Set or clear (blank text) the note of one pipe
    ///
    /// Returns false when nothing changed.
    pub fn set_pipe_note(&mut self, pipe: PipeId, note: &str) -> bool {
        let note = note.trim();
        if note.is_empty() {
            return self.pipe_notes.remove(&pipe).is_some();
        }
        self.pipe_notes.insert(pipe, note.to_string()).as_deref() != Some(note)
    }

    /// Drop notes of pipes beyond the current pipe count
    pub fn prune_pipe_notes(&mut self) {
        let count = self.pipes.count();
        self.pipe_notes.retain(|pipe, _| pipe.number() <= count);
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigurationDocument {
    #[serde(default, deserialize_with = "count_from_number_or_text")]
    number_of_pipes: u32,

    #[serde(default)]
    pipe_config: BTreeMap<String, Option<String>>,

    #[serde(default)]
    selected_ingredients: SelectedIngredients,

    #[serde(default, deserialize_with = "notes_from_map_or_text")]
    pipe_notes: BTreeMap<String, String>,

    #[serde(default)]
    ingredient_remarks: BTreeMap<String, String>,
}

fn count_from_number_or_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u32),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) if s.trim().is_empty() => Ok(0),
        Count::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Notes written by older front ends are a single string; those are dropped
fn notes_from_map_or_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Notes {
        Map(BTreeMap<String, Option<String>>),
        Text(String),
    }

    match Option::<Notes>::deserialize(deserializer)? {
        Some(Notes::Map(map)) => Ok(map
            .into_iter()
            .filter_map(|(label, note)| note.map(|note| (label, note)))
            .collect()),
        Some(Notes::Text(text)) => {
            if !text.trim().is_empty() {
                warn!("Stored configuration: ignoring free-text pipe notes");
            }
            Ok(BTreeMap::new())
        }
        None => Ok(BTreeMap::new()),
    }
}

impl From<ConfigurationDocument> for Configuration {
    fn from(doc: ConfigurationDocument) -> Self {
        let pipes = build_assignment(doc.number_of_pipes, doc.pipe_config);
        let mut config = Configuration {
            pipes,
            selected_ingredients: doc.selected_ingredients,
            pipe_notes: build_notes(doc.pipe_notes),
            ingredient_remarks: doc.ingredient_remarks,
        };
        config.prune_pipe_notes();
        config
    }
}

impl From<Configuration> for ConfigurationDocument {
    fn from(config: Configuration) -> Self {
        let pipe_config = config
            .pipes
            .pipes()
            .map(|pipe| {
                let value = config.pipes.get(pipe).unwrap_or_default().to_string();
                (pipe.to_string(), Some(value))
            })
            .collect();
        ConfigurationDocument {
            number_of_pipes: config.pipes.count(),
            pipe_config,
            selected_ingredients: config.selected_ingredients,
            pipe_notes: config
                .pipe_notes
                .into_iter()
                .map(|(pipe, note)| (pipe.to_string(), note))
                .collect(),
            ingredient_remarks: config.ingredient_remarks,
        }
    }
}

fn build_notes(labels: BTreeMap<String, String>) -> BTreeMap<PipeId, String> {
    labels
        .into_iter()
        .filter(|(_, note)| !note.trim().is_empty())
        .filter_map(|(label, note)| match label.parse::<PipeId>() {
            Ok(pipe) => Some((pipe, note)),
            Err(e) => {
                warn!("Stored configuration: note dropped: {}", e);
                None
            }
        })
        .collect()
}

/// Rebuild the assignment from stored labels
///
/// The store does not enforce the assignment rules, so anything it holds that
/// violates them (bad labels, pipes beyond the count, an ingredient in two
/// pipes) is dropped with a warning. Lower pipe numbers win duplicates.
fn build_assignment(count: u32, labels: BTreeMap<String, Option<String>>) -> PipeAssignment {
    let mut pipes = PipeAssignment::new(count).unwrap_or_else(|e| {
        warn!("Stored configuration: {}, ignoring pipe assignment", e);
        PipeAssignment::default()
    });

    let mut entries: Vec<(PipeId, String)> = labels
        .into_iter()
        .filter_map(|(label, value)| match label.parse::<PipeId>() {
            Ok(pipe) => Some((pipe, value.unwrap_or_default())),
            Err(e) => {
                warn!("Stored configuration: {}", e);
                None
            }
        })
        .collect();
    entries.sort_by_key(|(pipe, _)| *pipe);

    for (pipe, name) in entries {
        if let Err(e) = pipes.assign(pipe, &name) {
            warn!(pipe = %pipe, "Stored configuration: dropping assignment: {}", e);
        }
    }
    pipes
}
