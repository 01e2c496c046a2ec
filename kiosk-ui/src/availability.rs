//! Availability filter
//!
//! Derives the cocktails the machine can prepare from the ingredients the
//! operator declared as loaded. Garnishes are assumed always stocked. In
//! permissive mode an amount without "ml" marks the line as optional.

use kiosk_common::config::AvailabilityMode;
use kiosk_common::models::{Cocktail, Ingredient, IngredientLine, SelectedIngredients, GARNISH_TYPE};
use std::collections::HashMap;

/// Ingredient name → category tag
pub type IngredientTypes<'a> = HashMap<&'a str, &'a str>;

/// Index the catalog by name
pub fn ingredient_types(ingredients: &[Ingredient]) -> IngredientTypes<'_> {
    ingredients
        .iter()
        .map(|ingredient| (ingredient.name.as_str(), ingredient.kind.as_str()))
        .collect()
}

/// Whether one recipe line is satisfiable
pub fn line_passes(
    line: &IngredientLine,
    types: &IngredientTypes<'_>,
    selected: &SelectedIngredients,
    mode: AvailabilityMode,
) -> bool {
    if types.get(line.ingredient_name.as_str()) == Some(&GARNISH_TYPE) {
        return true;
    }
    if mode == AvailabilityMode::Permissive && !line.is_volumetric() {
        return true;
    }
    selected.contains(&line.ingredient_name)
}

/// A cocktail is available iff all its lines pass (vacuously true for none)
pub fn is_available(
    cocktail: &Cocktail,
    types: &IngredientTypes<'_>,
    selected: &SelectedIngredients,
    mode: AvailabilityMode,
) -> bool {
    cocktail
        .ingredient_lines
        .iter()
        .all(|line| line_passes(line, types, selected, mode))
}

/// Subset of `cocktails` preparable with `selected`, in catalog order
pub fn compute_available<'c>(
    cocktails: &'c [Cocktail],
    types: &IngredientTypes<'_>,
    selected: &SelectedIngredients,
    mode: AvailabilityMode,
) -> Vec<&'c Cocktail> {
    cocktails
        .iter()
        .filter(|cocktail| is_available(cocktail, types, selected, mode))
        .collect()
}
