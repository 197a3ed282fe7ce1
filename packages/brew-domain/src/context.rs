use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogItem, Category, Temperature};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
	Morning,
	Afternoon,
	Evening,
	Night,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
	Hot,
	Cold,
	Mild,
}

/// Request context resolved from the caller's override. Absent fields simply
/// fire no rules.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestContext {
	pub time_of_day: Option<TimeOfDay>,
	pub weather: Option<Weather>,
}

impl RequestContext {
	pub fn is_empty(&self) -> bool {
		self.time_of_day.is_none() && self.weather.is_none()
	}
}

/// Neutral score when no context is supplied or no rule fires. Absent context
/// neither rewards nor punishes a candidate.
pub const NEUTRAL_CONTEXT_MATCH: f32 = 0.5;

/// Context fit of an item, in [0, 1]. Starts neutral and moves by fixed
/// increments per fired rule.
pub fn context_match(item: &CatalogItem, context: &RequestContext) -> f32 {
	if context.is_empty() {
		return NEUTRAL_CONTEXT_MATCH;
	}

	let mut score = NEUTRAL_CONTEXT_MATCH;

	match context.time_of_day {
		Some(TimeOfDay::Morning) => {
			if item.category == Category::Coffee {
				score += 0.2;
			}
			if item.category == Category::Food {
				score += 0.1;
			}
		},
		Some(TimeOfDay::Afternoon) => {
			if matches!(item.category, Category::Tea | Category::Frappuccino) {
				score += 0.15;
			}
		},
		Some(TimeOfDay::Evening) => {
			if item.caffeinated {
				score -= 0.25;
			} else {
				score += 0.15;
			}
		},
		Some(TimeOfDay::Night) => {
			if item.caffeinated {
				score -= 0.35;
			}
		},
		None => {},
	}

	match context.weather {
		Some(Weather::Hot) => {
			if item.available_temperatures.contains(&Temperature::Iced) {
				score += 0.15;
			}
		},
		Some(Weather::Cold) => {
			if item.available_temperatures.contains(&Temperature::Hot) {
				score += 0.15;
			}
		},
		Some(Weather::Mild) | None => {},
	}

	score.clamp(0.0, 1.0)
}
