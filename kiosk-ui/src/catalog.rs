//! Catalog write validation
//!
//! Cocktails reference ingredients by name and the store does not check
//! those references. New records are validated here before they are sent.

use kiosk_common::config::IntegrityPolicy;
use kiosk_common::models::{CatalogId, Cocktail, Ingredient};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Catalog validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("An ingredient named {0} already exists")]
    DuplicateIngredient(String),

    #[error("A cocktail needs at least one ingredient")]
    NoIngredientLines,

    #[error("Unknown ingredients: {}", .0.join(", "))]
    UnknownIngredients(Vec<String>),

    #[error("Ingredient not found: {0}")]
    IngredientNotFound(String),
}

/// Normalise and validate a new ingredient
///
/// Names and types are trimmed; the next numeric id is allocated when the form
/// sent none.
pub fn prepare_ingredient(mut ingredient: Ingredient, existing: &[Ingredient]) -> Result<Ingredient, CatalogError> {
    ingredient.name = ingredient.name.trim().to_string();
    ingredient.kind = ingredient.kind.trim().to_string();

    if ingredient.name.is_empty() {
        return Err(CatalogError::MissingField("Ingredient name"));
    }
    if ingredient.kind.is_empty() {
        return Err(CatalogError::MissingField("Ingredient type"));
    }
    if existing.iter().any(|other| other.name == ingredient.name) {
        return Err(CatalogError::DuplicateIngredient(ingredient.name));
    }
    if ingredient.remark.as_deref().is_some_and(|r| r.trim().is_empty()) {
        ingredient.remark = None;
    }
    if ingredient.id.is_none() {
        ingredient.id = Some(CatalogId::next_after(existing.iter().filter_map(|i| i.id.as_ref())));
    }
    Ok(ingredient)
}

/// Normalise and validate a new cocktail
///
/// Every line must name an ingredient. Names missing from the catalog are
/// rejected or only logged depending on `policy`. Every dispense carries the
/// PNID as `productNid`, so one is stamped (epoch millis) when missing.
pub fn prepare_cocktail(
    mut cocktail: Cocktail,
    ingredients: &[Ingredient],
    cocktails: &[Cocktail],
    policy: IntegrityPolicy,
) -> Result<Cocktail, CatalogError> {
    cocktail.name = cocktail.name.trim().to_string();
    if cocktail.name.is_empty() {
        return Err(CatalogError::MissingField("Cocktail name"));
    }
    if cocktail.ingredient_lines.is_empty() {
        return Err(CatalogError::NoIngredientLines);
    }
    for line in &mut cocktail.ingredient_lines {
        line.ingredient_name = line.ingredient_name.trim().to_string();
        line.volume_spec = line.volume_spec.trim().to_string();
        if line.ingredient_name.is_empty() {
            return Err(CatalogError::MissingField("Ingredient of every recipe line"));
        }
    }

    let unknown = unknown_references(&cocktail, ingredients);
    if !unknown.is_empty() {
        match policy {
            IntegrityPolicy::Reject => return Err(CatalogError::UnknownIngredients(unknown)),
            IntegrityPolicy::Warn => warn!(
                cocktail = %cocktail.name,
                "Cocktail references unknown ingredients: {}",
                unknown.join(", ")
            ),
        }
    }

    if cocktail.id.is_none() {
        cocktail.id = Some(CatalogId::next_after(cocktails.iter().filter_map(|c| c.id.as_ref())));
    }
    if cocktail.nid.as_deref().map_or(true, |nid| nid.trim().is_empty()) {
        cocktail.nid = Some(chrono::Utc::now().timestamp_millis().to_string());
    }
    Ok(cocktail)
}

/// Ingredient names a cocktail uses that are not in the catalog
pub fn unknown_references(cocktail: &Cocktail, ingredients: &[Ingredient]) -> Vec<String> {
    let mut unknown: Vec<String> = Vec::new();
    for line in &cocktail.ingredient_lines {
        let known = ingredients.iter().any(|i| i.name == line.ingredient_name);
        if !known && !unknown.contains(&line.ingredient_name) {
            unknown.push(line.ingredient_name.clone());
        }
    }
    unknown
}

/// Copy of the catalog with one ingredient's remark replaced
///
/// An empty remark removes it. Other records and unmodelled keys are copied
/// as they are, since the result replaces the whole catalog.
pub fn with_remark(ingredients: &[Ingredient], name: &str, remark: &str) -> Result<Vec<Ingredient>, CatalogError> {
    let mut updated = ingredients.to_vec();
    let target = updated
        .iter_mut()
        .find(|i| i.name == name)
        .ok_or_else(|| CatalogError::IngredientNotFound(name.to_string()))?;

    let remark = remark.trim();
    target.remark = (!remark.is_empty()).then(|| remark.to_string());
    Ok(updated)
}

/// Copy of the catalog with every remark taken from `remarks`
///
/// Ingredients missing from the map get an empty remark.
pub fn with_remarks(ingredients: &[Ingredient], remarks: &BTreeMap<String, String>) -> Vec<Ingredient> {
    ingredients
        .iter()
        .cloned()
        .map(|mut ingredient| {
            ingredient.remark = remarks
                .get(&ingredient.name)
                .map(|r| r.trim())
                .filter(|r| !r.is_empty())
                .map(str::to_string);
            ingredient
        })
        .collect()
}
