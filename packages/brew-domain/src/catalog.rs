use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
	Coffee,
	Tea,
	Frappuccino,
	Refreshers,
	Food,
}

impl Category {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Coffee => "coffee",
			Self::Tea => "tea",
			Self::Frappuccino => "frappuccino",
			Self::Refreshers => "refreshers",
			Self::Food => "food",
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Temperature {
	Hot,
	Iced,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CatalogItem {
	pub sku: String,
	pub name: String,
	pub description: String,
	pub category: Category,
	pub base_price: f32,
	pub calories: u32,
	pub caffeinated: bool,
	pub contains_dairy: bool,
	#[serde(default)]
	pub customizable: bool,
	#[serde(default)]
	pub is_new: bool,
	#[serde(default)]
	pub is_seasonal: bool,
	#[serde(default)]
	pub tags: Vec<String>,
	pub available_temperatures: Vec<Temperature>,
}

impl CatalogItem {
	/// The text that gets embedded for this item.
	pub fn embedding_text(&self) -> String {
		format!("{} {} {}", self.name, self.description, self.tags.join(" "))
	}
}

/// Immutable catalog loaded once at startup. Item order is the file order and
/// is the tie-break order everywhere ranking needs one.
#[derive(Clone, Debug)]
pub struct Catalog {
	items: Vec<CatalogItem>,
	positions: HashMap<String, usize>,
}

impl Catalog {
	pub fn new(items: Vec<CatalogItem>) -> Result<Self> {
		let mut positions = HashMap::with_capacity(items.len());

		for (position, item) in items.iter().enumerate() {
			if item.sku.trim().is_empty() {
				return Err(Error::Validation {
					message: format!("Item at position {position} has an empty sku."),
				});
			}
			if positions.insert(item.sku.clone(), position).is_some() {
				return Err(Error::Validation {
					message: format!("Duplicate sku {}.", item.sku),
				});
			}
		}

		Ok(Self { items, positions })
	}

	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| Error::ReadCatalog { path: path.to_path_buf(), source: err })?;
		let items: Vec<CatalogItem> = serde_json::from_str(&raw)
			.map_err(|err| Error::ParseCatalog { path: path.to_path_buf(), source: err })?;

		Self::new(items)
	}

	pub fn items(&self) -> &[CatalogItem] {
		&self.items
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn get(&self, sku: &str) -> Option<&CatalogItem> {
		self.positions.get(sku).map(|&position| &self.items[position])
	}

	/// Insertion position of a sku, for stable tie-breaking.
	pub fn position(&self, sku: &str) -> Option<usize> {
		self.positions.get(sku).copied()
	}

	pub fn skus(&self) -> impl Iterator<Item = &str> {
		self.items.iter().map(|item| item.sku.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(sku: &str) -> CatalogItem {
		CatalogItem {
			sku: sku.to_string(),
			name: sku.to_string(),
			description: String::new(),
			category: Category::Coffee,
			base_price: 30.0,
			calories: 150,
			caffeinated: true,
			contains_dairy: true,
			customizable: false,
			is_new: false,
			is_seasonal: false,
			tags: Vec::new(),
			available_temperatures: vec![Temperature::Hot],
		}
	}

	#[test]
	fn position_follows_file_order() {
		let catalog = Catalog::new(vec![item("latte"), item("mocha"), item("tea")]).unwrap();

		assert_eq!(catalog.position("latte"), Some(0));
		assert_eq!(catalog.position("tea"), Some(2));
		assert_eq!(catalog.position("missing"), None);
	}

	#[test]
	fn duplicate_sku_is_rejected() {
		assert!(matches!(
			Catalog::new(vec![item("latte"), item("latte")]),
			Err(Error::Validation { .. })
		));
	}
}
