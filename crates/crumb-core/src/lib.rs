#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod events;
pub mod ports;
pub mod recipe;

// Re-export key types for convenience
pub use events::AppEvent;
pub use ports::{AppEventEmitter, NoopEmitter};
pub use recipe::{Ingredient, Recipe, RecipeStep};
