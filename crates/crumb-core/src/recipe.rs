//! Recipe domain models.
//!
//! These mirror the backend wire format (camelCase JSON). The kitchen-mode
//! voice core only consumes [`Recipe::steps`]; everything else exists for the
//! excluded UI and data layers that share this crate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single ingredient line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    /// Ingredient name (e.g. "bread flour").
    pub name: String,
    /// Quantity in `unit` units.
    pub amount: f64,
    /// Measurement unit (e.g. "g", "cups").
    pub unit: String,
}

/// One raw instruction step as stored by the recipe backend.
///
/// `instruction` is free text and may contain several sentences; kitchen mode
/// splits it into display-sized steps before navigation (see
/// `crumb-voice::kitchen`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStep {
    /// Position of this step in the recipe, starting at 0.
    pub order_index: i64,
    /// Free-text instruction for this step.
    pub instruction: String,
}

impl RecipeStep {
    /// Convenience constructor used heavily in tests.
    pub fn new(order_index: i64, instruction: impl Into<String>) -> Self {
        Self {
            order_index,
            instruction: instruction.into(),
        }
    }
}

/// The master recipe model shared by the database and import layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    /// Stable recipe identifier.
    pub id: Uuid,
    /// Display title.
    pub title: String,
    /// Optional short description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Preparation time in minutes, when the source provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<u32>,
    /// Cooking time in minutes, when the source provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<u32>,
    /// Serving count used for ingredient scaling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    /// Ingredient list.
    pub ingredients: Vec<Ingredient>,
    /// Ordered instruction steps. Kitchen mode needs this specifically.
    pub steps: Vec<RecipeStep>,
}

impl Recipe {
    /// Flatten the ordered steps into plain instruction strings.
    pub fn instructions(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.instruction.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_serializes_camel_case() {
        let step = RecipeStep::new(2, "Mix flour and water.");
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("\"orderIndex\":2"));
        assert!(json.contains("\"instruction\":\"Mix flour and water.\""));
    }

    #[test]
    fn instructions_preserve_step_order() {
        let recipe = Recipe {
            id: Uuid::new_v4(),
            title: "Sourdough".to_owned(),
            description: None,
            prep_time: Some(30),
            cook_time: Some(45),
            servings: Some(8),
            ingredients: vec![],
            steps: vec![
                RecipeStep::new(0, "Autolyse."),
                RecipeStep::new(1, "Bulk ferment."),
            ],
        };
        assert_eq!(recipe.instructions(), vec!["Autolyse.", "Bulk ferment."]);
    }
}
