use std::collections::HashMap;

use serde::Serialize;

use brew_config::FactorWeights;
use brew_domain::{CatalogItem, RequestContext, context_match};

pub const HIGH_CONFIDENCE_FLOOR: f32 = 0.7;
pub const MEDIUM_CONFIDENCE_FLOOR: f32 = 0.5;

#[derive(Clone, Debug, Serialize)]
pub struct Factor {
	pub name: &'static str,
	pub value: f32,
	pub weight: f32,
	pub weighted: f32,
}

#[derive(Clone, Debug)]
pub struct Composed<'a> {
	pub item: &'a CatalogItem,
	pub position: usize,
	pub similarity: f32,
	pub composite: f32,
	pub confidence: &'static str,
	pub factors: Vec<Factor>,
}

pub struct ComposeInputs<'a> {
	pub weights: FactorWeights,
	pub affinities: &'a HashMap<String, f32>,
	pub session_preferences: &'a HashMap<String, f32>,
	pub persona_keywords: &'a [String],
	pub context: &'a RequestContext,
}

pub fn confidence_label(score: f32) -> &'static str {
	if score >= HIGH_CONFIDENCE_FLOOR {
		"high"
	} else if score >= MEDIUM_CONFIDENCE_FLOOR {
		"medium"
	} else {
		"low"
	}
}

/// Combines base similarity with behavior, context, and customization factors
/// into a composite score per candidate, ordered descending with catalog
/// position as the tie-break.
///
/// `scored` carries each candidate's catalog position so the ordering stays
/// stable even after the similarity ranker reordered items.
pub fn compose<'a>(
	scored: &[(&'a CatalogItem, usize, f32)],
	inputs: &ComposeInputs<'_>,
) -> Vec<Composed<'a>> {
	// Normalizing by the per-user max keeps affinity comparable with the
	// other [0, 1] factors; a user with no events contributes 0 everywhere.
	let max_affinity = scored
		.iter()
		.filter_map(|(item, _, _)| inputs.affinities.get(&item.sku).copied())
		.fold(0.0f32, f32::max);
	let mut composed: Vec<Composed<'a>> = scored
		.iter()
		.map(|&(item, position, similarity)| {
			let affinity = inputs.affinities.get(&item.sku).copied().unwrap_or(0.0);
			let affinity_norm = if max_affinity > 0.0 { affinity / max_affinity } else { 0.0 };
			let context = context_match(item, inputs.context);
			let customization = customization_match(
				item,
				inputs.session_preferences,
				inputs.persona_keywords,
			);
			let factors = vec![
				factor("semantic", similarity, inputs.weights.semantic),
				factor("behavior", affinity_norm, inputs.weights.behavior),
				factor("context", context, inputs.weights.context),
				factor("customization", customization, inputs.weights.customization),
			];
			let composite = factors.iter().map(|f| f.weighted).sum::<f32>().clamp(0.0, 1.0);

			Composed {
				item,
				position,
				similarity,
				composite,
				confidence: confidence_label(composite),
				factors,
			}
		})
		.collect();

	composed.sort_by(|a, b| {
		b.composite
			.partial_cmp(&a.composite)
			.unwrap_or(std::cmp::Ordering::Equal)
			.then(a.position.cmp(&b.position))
	});

	composed
}

fn factor(name: &'static str, value: f32, weight: f32) -> Factor {
	Factor { name, value, weight, weighted: value * weight }
}

/// 1.0 for a customizable item whose tags overlap the session or persona
/// preference keys, 0.5 for a customizable item without overlap, 0.0 for a
/// fixed item.
fn customization_match(
	item: &CatalogItem,
	session_preferences: &HashMap<String, f32>,
	persona_keywords: &[String],
) -> f32 {
	if !item.customizable {
		return 0.0;
	}

	let overlaps = item.tags.iter().any(|tag| {
		session_preferences.get(tag).is_some_and(|weight| *weight > 0.0)
			|| persona_keywords.iter().any(|keyword| keyword == tag)
	});

	if overlaps { 1.0 } else { 0.5 }
}

#[cfg(test)]
mod tests {
	use super::*;
	use brew_domain::{Category, Temperature};

	fn item(sku: &str, customizable: bool, tags: &[&str]) -> CatalogItem {
		CatalogItem {
			sku: sku.to_string(),
			name: sku.to_string(),
			description: String::new(),
			category: Category::Coffee,
			base_price: 30.0,
			calories: 150,
			caffeinated: true,
			contains_dairy: false,
			customizable,
			is_new: false,
			is_seasonal: false,
			tags: tags.iter().map(|tag| tag.to_string()).collect(),
			available_temperatures: vec![Temperature::Hot],
		}
	}

	fn inputs<'a>(
		affinities: &'a HashMap<String, f32>,
		session: &'a HashMap<String, f32>,
		context: &'a RequestContext,
	) -> ComposeInputs<'a> {
		ComposeInputs {
			weights: FactorWeights::default(),
			affinities,
			session_preferences: session,
			persona_keywords: &[],
			context,
		}
	}

	#[test]
	fn perfect_similarity_without_signals_scores_half() {
		let latte = item("latte", false, &[]);
		let affinities = HashMap::new();
		let session = HashMap::new();
		let context = RequestContext::default();
		let composed =
			compose(&[(&latte, 0, 1.0)], &inputs(&affinities, &session, &context));

		// 0.40 * 1.0 semantic + 0.20 * 0.5 neutral context.
		assert!((composed[0].composite - 0.5).abs() < 1e-6);
		assert_eq!(composed[0].confidence, "medium");
	}

	#[test]
	fn behavior_affinity_is_normalized_by_the_candidate_max() {
		let latte = item("latte", false, &[]);
		let mocha = item("mocha", false, &[]);
		let affinities =
			HashMap::from([("latte".to_string(), 2.0), ("mocha".to_string(), 1.0)]);
		let session = HashMap::new();
		let context = RequestContext::default();
		let composed = compose(
			&[(&latte, 0, 0.5), (&mocha, 1, 0.5)],
			&inputs(&affinities, &session, &context),
		);
		let latte_factor = composed
			.iter()
			.find(|c| c.item.sku == "latte")
			.unwrap()
			.factors
			.iter()
			.find(|f| f.name == "behavior")
			.unwrap()
			.value;
		let mocha_factor = composed
			.iter()
			.find(|c| c.item.sku == "mocha")
			.unwrap()
			.factors
			.iter()
			.find(|f| f.name == "behavior")
			.unwrap()
			.value;

		assert_eq!(latte_factor, 1.0);
		assert_eq!(mocha_factor, 0.5);
	}

	#[test]
	fn customization_rule_distinguishes_overlap() {
		let fixed = item("drip", false, &["classic"]);
		let plain = item("latte", true, &["classic"]);
		let matching = item("oat-latte", true, &["oat"]);
		let session = HashMap::from([("oat".to_string(), 0.6)]);

		assert_eq!(customization_match(&fixed, &session, &[]), 0.0);
		assert_eq!(customization_match(&plain, &session, &[]), 0.5);
		assert_eq!(customization_match(&matching, &session, &[]), 1.0);

		let persona = ["classic".to_string()];

		assert_eq!(customization_match(&plain, &HashMap::new(), &persona), 1.0);
	}

	#[test]
	fn ties_fall_back_to_catalog_position() {
		let first = item("first", false, &[]);
		let second = item("second", false, &[]);
		let affinities = HashMap::new();
		let session = HashMap::new();
		let context = RequestContext::default();
		// Same similarity, listed out of catalog order.
		let composed = compose(
			&[(&second, 1, 0.8), (&first, 0, 0.8)],
			&inputs(&affinities, &session, &context),
		);

		assert_eq!(composed[0].item.sku, "first");
		assert_eq!(composed[1].item.sku, "second");
	}

	#[test]
	fn confidence_bands() {
		assert_eq!(confidence_label(0.71), "high");
		assert_eq!(confidence_label(0.7), "high");
		assert_eq!(confidence_label(0.69), "medium");
		assert_eq!(confidence_label(0.5), "medium");
		assert_eq!(confidence_label(0.49), "low");
	}
}
