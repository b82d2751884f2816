//! Core data models.
//!
//! [`Recipe`] is the persisted record; [`ExtractedRecipe`] is the subset the
//! extraction service fills in before the store stamps the derived fields.
//! Every field defaults when absent so partially filled responses and older
//! store files still decode.

use serde::{Deserialize, Serialize};

/// Nutrition panel values, kept as free text ("520 kcal", "31g", ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nutrition {
    pub calories: String,
    pub protein: String,
    pub carbs: String,
    pub fat: String,
}

impl Nutrition {
    pub fn is_empty(&self) -> bool {
        self.calories.is_empty()
            && self.protein.is_empty()
            && self.carbs.is_empty()
            && self.fat.is_empty()
    }
}

/// A recipe card as stored in the JSON store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub ingredients: Vec<String>,
    pub nutrition: Nutrition,
    pub tags: Vec<String>,
    pub image_front: String,
    pub image_back: String,
}

/// The fields the extraction service is asked to produce.
///
/// Any `id` or image paths the service invents are ignored; those are
/// derived locally when the record is appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractedRecipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub nutrition: Nutrition,
    pub tags: Vec<String>,
}

impl ExtractedRecipe {
    /// Completes the record with the locally derived fields.
    pub fn into_recipe(self, id: String, image_front: String, image_back: String) -> Recipe {
        Recipe {
            id,
            title: self.title,
            ingredients: self.ingredients,
            nutrition: self.nutrition,
            tags: self.tags,
            image_front,
            image_back,
        }
    }
}
