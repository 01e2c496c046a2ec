//! Ingredient and cocktail catalog records

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Category tag of ingredients that never block availability
pub const GARNISH_TYPE: &str = "Garnish";

/// Firmware ingredient key written into catalog records by the store tooling
const NID_KEY: &str = "ING_NID";

/// Catalog record identifier
///
/// The store server writes numeric ids for older records and text ids for
/// newer ones. Both forms are kept as received so bulk writes do not rewrite
/// existing records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogId {
    Number(u64),
    Text(String),
}

impl CatalogId {
    /// Next numeric id after the largest numeric id in use (1 when none)
    ///
    /// Text ids do not take part in the numbering.
    pub fn next_after<'a>(existing: impl IntoIterator<Item = &'a CatalogId>) -> Self {
        let max = existing
            .into_iter()
            .filter_map(|id| match id {
                CatalogId::Number(n) => Some(*n),
                CatalogId::Text(_) => None,
            })
            .max()
            .unwrap_or(0);
        CatalogId::Number(max + 1)
    }

    /// Compare against an id received as a path parameter or form value
    pub fn matches(&self, raw: &str) -> bool {
        match self {
            CatalogId::Number(n) => raw.trim().parse::<u64>().map(|r| r == *n).unwrap_or(false),
            CatalogId::Text(s) => s == raw,
        }
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogId::Number(n) => write!(f, "{}", n),
            CatalogId::Text(s) => f.write_str(s),
        }
    }
}

/// Ingredient record (`db.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(rename = "ING_ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CatalogId>,

    /// Unique key; cocktails reference ingredients by this name
    #[serde(rename = "ING_Name")]
    pub name: String,

    /// Category tag (e.g. "Spirit", "Juice", "Garnish")
    #[serde(rename = "ING_Type", default, deserialize_with = "null_as_empty")]
    pub kind: String,

    /// Opaque image reference
    #[serde(rename = "ING_IMG", default, deserialize_with = "null_as_empty")]
    pub image: String,

    /// Written as "" when absent
    #[serde(
        rename = "ING_Remark",
        default,
        deserialize_with = "empty_as_none",
        serialize_with = "none_as_empty"
    )]
    pub remark: Option<String>,

    /// Stored keys the kiosk does not model (ING_NID and the like)
    ///
    /// Bulk writes replace `db.json` as sent, so these travel back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Ingredient {
    pub fn is_garnish(&self) -> bool {
        self.kind == GARNISH_TYPE
    }

    /// Firmware ingredient key (`ING_NID`), if the record has one
    pub fn nid(&self) -> Option<String> {
        nid_of(&self.extra)
    }
}

/// One ingredient of a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLine {
    /// Foreign key into the ingredient catalog (by name)
    #[serde(rename = "ING_Name")]
    pub ingredient_name: String,

    /// Free text amount, e.g. "50ml", "1 leaf", "top up"; null in older records
    #[serde(rename = "ING_ML", default, deserialize_with = "null_as_empty")]
    pub volume_spec: String,

    /// Copied catalog fields (ING_ID, ING_NID, ING_Type, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IngredientLine {
    pub fn new(ingredient_name: impl Into<String>, volume_spec: impl Into<String>) -> Self {
        Self {
            ingredient_name: ingredient_name.into(),
            volume_spec: volume_spec.into(),
            extra: Map::new(),
        }
    }

    /// Firmware ingredient key copied into the line, if any
    pub fn nid(&self) -> Option<String> {
        nid_of(&self.extra)
    }

    /// Whether the amount is measured in millilitres (case-insensitive "ml")
    pub fn is_volumetric(&self) -> bool {
        self.volume_spec.to_ascii_lowercase().contains("ml")
    }

    /// Amount text as sent to the machine, None when blank
    pub fn amount(&self) -> Option<&str> {
        Some(self.volume_spec.trim()).filter(|spec| !spec.is_empty())
    }
}

/// Cocktail record (`products.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cocktail {
    #[serde(rename = "PID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CatalogId>,

    /// Firmware product key, sent with every dispense as `productNid`
    #[serde(rename = "PNID", default, skip_serializing_if = "Option::is_none")]
    pub nid: Option<String>,

    #[serde(rename = "PName")]
    pub name: String,

    #[serde(rename = "PCat", default, deserialize_with = "null_as_empty")]
    pub category: String,

    #[serde(rename = "PDesc", default, deserialize_with = "null_as_empty")]
    pub description: String,

    #[serde(rename = "PImage", default, deserialize_with = "null_as_empty")]
    pub image: String,

    /// "How to make" text
    #[serde(rename = "PHtm", default, deserialize_with = "null_as_empty")]
    pub preparation_notes: String,

    #[serde(rename = "PIng", default)]
    pub ingredient_lines: Vec<IngredientLine>,
}

impl Cocktail {
    /// Stored line for an ingredient, if the recipe uses it
    pub fn line_for(&self, ingredient_name: &str) -> Option<&IngredientLine> {
        self.ingredient_lines
            .iter()
            .find(|line| line.ingredient_name == ingredient_name)
    }

    pub fn has_id(&self, raw: &str) -> bool {
        self.id.as_ref().is_some_and(|id| id.matches(raw))
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn none_as_empty<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

/// Non-blank `ING_NID`; older tooling wrote some keys as numbers
fn nid_of(extra: &Map<String, Value>) -> Option<String> {
    match extra.get(NID_KEY)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}
