//! Wire and domain models shared by kiosk crates
//!
//! All types serialize to the JSON shapes used by the store server.

pub mod catalog;
pub mod configuration;
pub mod dispense;
pub mod pipes;

pub use catalog::{CatalogId, Cocktail, Ingredient, IngredientLine, GARNISH_TYPE};
pub use configuration::{Configuration, SelectedIngredients};
pub use dispense::{DispenseIngredient, DispenseRequest, StatusResponse, DEFAULT_INGREDIENT_ML};
pub use pipes::{PipeAssignment, PipeError, PipeId, MAX_PIPES};
