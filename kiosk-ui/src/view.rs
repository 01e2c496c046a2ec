//! Derived view
//!
//! Everything the front end renders, recomputed from controller state after
//! each change. Pipe option lists are built here: an ingredient held by
//! another pipe is shown but disabled, and a pipe's own value is always part
//! of its list.

use crate::controller::{DispenseState, KioskState};
use kiosk_common::models::{CatalogId, Cocktail, PipeId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Full view model
#[derive(Debug, Clone, Serialize)]
pub struct KioskView {
    /// Cocktails preparable with the saved configuration
    pub available_cocktails: Vec<CocktailCard>,
    pub number_of_pipes: u32,
    pub pipes: Vec<PipeView>,
    /// Pipes without an ingredient in the edited configuration
    pub unassigned_pipes: Vec<u32>,
    pub ingredients: Vec<IngredientView>,
    /// Remarks of the edited configuration, shown in the remark editor
    ///
    /// Catalog remark edits update this map; `POST /api/catalog/remarks`
    /// copies it onto the catalog.
    pub ingredient_remarks: BTreeMap<String, String>,
    /// Edited configuration differs from the saved one
    pub unsaved_changes: bool,
    pub dispense: DispenseState,
}

/// Home-screen tile
#[derive(Debug, Clone, Serialize)]
pub struct CocktailCard {
    pub id: Option<CatalogId>,
    pub name: String,
    pub category: String,
    pub image: String,
}

impl From<&Cocktail> for CocktailCard {
    fn from(cocktail: &Cocktail) -> Self {
        Self {
            id: cocktail.id.clone(),
            name: cocktail.name.clone(),
            category: cocktail.category.clone(),
            image: cocktail.image.clone(),
        }
    }
}

/// One pipe row of the configuration screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipeView {
    pub pipe: PipeId,
    pub number: u32,
    pub ingredient: Option<String>,
    pub note: Option<String>,
    pub options: Vec<PipeOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipeOption {
    pub name: String,
    /// Held by another pipe
    pub disabled: bool,
}

/// One ingredient of the selection screen
#[derive(Debug, Clone, Serialize)]
pub struct IngredientView {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub image: String,
    /// Catalog remark (`ING_Remark`), shown next to the ingredient
    pub remark: Option<String>,
    pub selected: bool,
    pub pipe: Option<PipeId>,
}

/// Build the view from the current state
pub fn build(state: &KioskState, dispense: &DispenseState) -> KioskView {
    let editing = &state.editing;

    let pipes = editing
        .pipes
        .pipes()
        .map(|pipe| pipe_view(state, pipe))
        .collect();

    let ingredients = state
        .ingredients
        .iter()
        .map(|ingredient| IngredientView {
            name: ingredient.name.clone(),
            kind: ingredient.kind.clone(),
            image: ingredient.image.clone(),
            remark: ingredient.remark.clone(),
            selected: editing.selected_ingredients.contains(&ingredient.name),
            pipe: editing.pipes.pipe_of(&ingredient.name),
        })
        .collect();

    KioskView {
        available_cocktails: state.available.iter().map(CocktailCard::from).collect(),
        number_of_pipes: editing.pipes.count(),
        pipes,
        unassigned_pipes: editing.missing_pipes(),
        ingredients,
        ingredient_remarks: editing.ingredient_remarks.clone(),
        unsaved_changes: state.editing != state.saved,
        dispense: dispense.clone(),
    }
}

/// Options are the loaded ingredients, in selection order
fn pipe_view(state: &KioskState, pipe: PipeId) -> PipeView {
    let assignment = &state.editing.pipes;
    let current = assignment.get(pipe).map(str::to_string);

    let mut options: Vec<PipeOption> = state
        .editing
        .selected_ingredients
        .iter()
        .map(|name| PipeOption {
            name: name.to_string(),
            disabled: assignment.pipe_of(name).is_some_and(|holder| holder != pipe),
        })
        .collect();

    if let Some(name) = &current {
        if !options.iter().any(|o| &o.name == name) {
            options.push(PipeOption {
                name: name.clone(),
                disabled: false,
            });
        }
    }

    PipeView {
        pipe,
        number: pipe.number(),
        ingredient: current,
        note: state.editing.pipe_notes.get(&pipe).cloned(),
        options,
    }
}
