use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogItem, Category, Temperature};

/// Hard request constraints. Applied to the catalog before ranking, never to
/// an already-ranked list, so top-k always returns k eligible items when k
/// eligible items exist.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Constraints {
	pub caffeine_free: bool,
	pub low_calorie: bool,
	pub dairy_free: bool,
	pub max_price: Option<f32>,
	pub categories: Option<Vec<Category>>,
	pub exclude_categories: Option<Vec<Category>>,
	pub temperature_only: Option<Temperature>,
}

/// Calorie ceiling for the `low_calorie` constraint (exclusive).
pub const LOW_CALORIE_LIMIT: u32 = 100;

impl Constraints {
	pub fn is_empty(&self) -> bool {
		!self.caffeine_free
			&& !self.low_calorie
			&& !self.dairy_free
			&& self.max_price.is_none()
			&& self.categories.is_none()
			&& self.exclude_categories.is_none()
			&& self.temperature_only.is_none()
	}

	pub fn admits(&self, item: &CatalogItem) -> bool {
		if self.caffeine_free && item.caffeinated {
			return false;
		}
		if self.low_calorie && item.calories >= LOW_CALORIE_LIMIT {
			return false;
		}
		if self.dairy_free && item.contains_dairy {
			return false;
		}
		if let Some(max_price) = self.max_price
			&& item.base_price > max_price
		{
			return false;
		}
		if let Some(allowed) = self.categories.as_deref()
			&& !allowed.contains(&item.category)
		{
			return false;
		}
		if let Some(excluded) = self.exclude_categories.as_deref()
			&& excluded.contains(&item.category)
		{
			return false;
		}
		if let Some(temperature) = self.temperature_only
			&& !item.available_temperatures.contains(&temperature)
		{
			return false;
		}

		true
	}

	/// Catalog positions of items passing every constraint, in catalog order.
	pub fn filter<'a>(&self, items: &'a [CatalogItem]) -> Vec<&'a CatalogItem> {
		items.iter().filter(|item| self.admits(item)).collect()
	}
}
