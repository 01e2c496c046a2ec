//! Dispense wire types exchanged with the hardware process

use super::catalog::CatalogId;
use super::pipes::PipeId;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Amount sent for a pipe-assigned ingredient the recipe gives no number for
pub const DEFAULT_INGREDIENT_ML: &str = "50";

/// Status value meaning the drink finished synchronously
const STATUS_COMPLETED: &str = "completed";

/// One pipe to open while preparing a drink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseIngredient {
    pub name: String,

    /// Sent as the bare pipe number ("3"), not the "Pipe 3" label
    #[serde(serialize_with = "pipe_number", deserialize_with = "parse_pipe_number")]
    pub pipe: PipeId,

    /// Firmware ingredient key (`ING_NID`), empty when the catalog has none
    pub ing_nid: String,

    /// Recipe amount text, or [`DEFAULT_INGREDIENT_ML`] when blank
    pub ing_ml: String,
}

fn pipe_number<S: Serializer>(pipe: &PipeId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&pipe.number().to_string())
}

fn parse_pipe_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PipeId, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(de::Error::custom)
}

/// Request body of the "send pipes" call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseRequest {
    pub product_id: CatalogId,

    /// Firmware product key (`PNID`), empty when the record has none
    pub product_nid: String,

    pub ingredients: Vec<DispenseIngredient>,
    pub drink_type: String,
    pub is_alcoholic: bool,
}

/// `{status}` body returned by dispatch and completion polling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
}

impl StatusResponse {
    /// `COMPLETED` from dispatch, `completed` from polling
    pub fn is_completed(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case(STATUS_COMPLETED)
    }
}
