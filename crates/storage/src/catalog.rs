use std::{collections::HashSet, fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use shared::{
    domain::{Item, ItemRef},
    error::{OrderingError, OrderingResult},
    protocol::{CallbackAction, MAX_CALLBACK_DATA_BYTES},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Read-only menu, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Catalog {
    #[serde(rename = "category")]
    categories: Vec<Category>,
}

impl Catalog {
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        let catalog = Self { categories };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parses a catalog from TOML using `[[category]]` tables, each with
    /// `[[category.items]]` entries.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(raw).context("failed to parse catalog toml")?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog '{}'", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("invalid catalog '{}'", path.display()))
    }

    pub fn default_menu() -> Self {
        fn item(name: &str, price: u64, description: &str) -> Item {
            Item {
                name: name.into(),
                price,
                description: description.into(),
                image: None,
            }
        }

        Self {
            categories: vec![
                Category {
                    name: "Drinks".into(),
                    items: vec![
                        item("Sprite", 10, "A refreshing minty cocktail."),
                        item("Beer (Draft)", 6, "Chilled and crisp."),
                        item("Cola", 3, "Classic soda."),
                    ],
                },
                Category {
                    name: "Foods".into(),
                    items: vec![
                        item("Nachos", 8, "With cheese and salsa."),
                        item("Chicken Wings", 12, "Spicy or BBQ glazed wings."),
                        item("Cheeseburger", 15, "Juicy beef patty with cheese."),
                        item("Pizza", 14, "Classic with fresh basil."),
                        item("Fries", 5, "Crispy golden fries."),
                    ],
                },
            ],
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Case-insensitive lookup; returns the category under its canonical name.
    pub fn category(&self, name: &str) -> OrderingResult<&Category> {
        self.categories
            .iter()
            .find(|category| same_name(&category.name, name))
            .ok_or_else(|| OrderingError::UnknownCategory(name.to_string()))
    }

    pub fn list_category(&self, name: &str) -> OrderingResult<&[Item]> {
        self.category(name).map(|category| category.items.as_slice())
    }

    pub fn get_item(&self, category: &str, index: usize) -> OrderingResult<&Item> {
        self.list_category(category)?
            .get(index)
            .ok_or_else(|| OrderingError::IndexOutOfRange {
                category: category.to_string(),
                index,
            })
    }

    /// Resolves a possibly differently-cased reference to the canonical one.
    pub fn resolve(&self, item_ref: &ItemRef) -> OrderingResult<(ItemRef, &Item)> {
        let category = self.category(&item_ref.category)?;
        let item = category
            .items
            .get(item_ref.index)
            .ok_or_else(|| OrderingError::IndexOutOfRange {
                category: category.name.clone(),
                index: item_ref.index,
            })?;
        Ok((ItemRef::new(category.name.clone(), item_ref.index), item))
    }

    fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            bail!("catalog has no categories");
        }

        let mut seen = HashSet::new();
        for category in &self.categories {
            let name = category.name.trim();
            if name.is_empty() {
                bail!("category name must not be empty");
            }
            if !seen.insert(name.to_lowercase()) {
                bail!("duplicate category '{name}'");
            }
            for action in [
                CallbackAction::OpenCategory(category.name.clone()),
                CallbackAction::CategoryDone(category.name.clone()),
                CallbackAction::ToggleItem(ItemRef::new(
                    category.name.clone(),
                    category.items.len().saturating_sub(1),
                )),
            ] {
                let data = action.to_data();
                if data.len() > MAX_CALLBACK_DATA_BYTES {
                    bail!(
                        "category '{name}' is too long for button data ({} of {MAX_CALLBACK_DATA_BYTES} bytes)",
                        data.len()
                    );
                }
            }
            for (index, item) in category.items.iter().enumerate() {
                if item.name.trim().is_empty() {
                    bail!("item {index} in '{name}' has no name");
                }
                if item.price == 0 {
                    bail!("item '{}' in '{name}' must have a positive price", item.name);
                }
            }
        }

        Ok(())
    }
}

/// Category names match regardless of case, folded the same way button data
/// and duplicate detection fold them.
fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
