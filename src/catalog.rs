//! Read-only views of the store: `cards list` and `cards show`.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::models::Recipe;
use crate::prompt::Vendor;
use crate::store::{JsonFileStore, StorePort};

/// Recipes in store order, optionally restricted to one vendor.
pub fn list_recipes(recipes: &[Recipe], vendor: Option<Vendor>) -> Vec<&Recipe> {
    recipes
        .iter()
        .filter(|r| vendor.map_or(true, |v| Vendor::classify_path(&r.image_front) == v))
        .collect()
}

pub fn run_list(config: &Config, vendor: Option<&str>) -> Result<()> {
    let vendor = match vendor {
        Some(key) => match Vendor::from_key(key) {
            Some(v) => Some(v),
            None => bail!("Unknown vendor: '{}'. Available: hf, gousto", key),
        },
        None => None,
    };

    let store = JsonFileStore::new(&config.store.path).load()?;
    let recipes = list_recipes(&store.recipes, vendor);

    if recipes.is_empty() {
        println!("No recipes.");
        return Ok(());
    }
    for r in &recipes {
        println!("{}  {}  ({})", r.id, r.title, r.image_front);
    }
    println!("{} recipe(s)", recipes.len());
    Ok(())
}

pub fn run_show(config: &Config, id: &str) -> Result<()> {
    let store = JsonFileStore::new(&config.store.path).load()?;
    match store.get(id) {
        Some(recipe) => {
            println!("{}", serde_json::to_string_pretty(recipe)?);
            Ok(())
        }
        None => bail!("recipe not found: {}", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: &str, front: &str) -> Recipe {
        Recipe {
            id: id.to_string(),
            title: format!("Recipe {}", id),
            image_front: front.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_list_filters_by_vendor() {
        let recipes = vec![
            recipe("001", "images/hf_a_front.webp"),
            recipe("002", "images/g_b_front.webp"),
            recipe("003", "images/hf_c_front.webp"),
        ];
        let ids = |v| {
            list_recipes(&recipes, v)
                .iter()
                .map(|r| r.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(None), vec!["001", "002", "003"]);
        assert_eq!(ids(Some(Vendor::HelloFresh)), vec!["001", "003"]);
        assert_eq!(ids(Some(Vendor::Gousto)), vec!["002"]);
    }
}
