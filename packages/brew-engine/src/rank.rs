//! Cosine scoring over cached vectors. All vectors compared here share one
//! model and one dimensionality; the index guarantees that before any request
//! reaches this module.

use brew_domain::CatalogItem;

/// Cosine similarity remapped from [-1, 1] into [0, 1] via `(cos + 1) / 2`.
/// A zero-magnitude vector on either side scores exactly 0.0; a direction-free
/// vector is minimally similar to everything, not an error.
pub fn score(query: &[f32], item: &[f32]) -> f32 {
	let mut dot = 0.0f32;
	let mut query_sq = 0.0f32;
	let mut item_sq = 0.0f32;

	for (q, i) in query.iter().zip(item) {
		dot += q * i;
		query_sq += q * q;
		item_sq += i * i;
	}

	let magnitude = query_sq.sqrt() * item_sq.sqrt();

	if magnitude == 0.0 {
		return 0.0;
	}

	let cos = (dot / magnitude).clamp(-1.0, 1.0);

	(cos + 1.0) / 2.0
}

/// Scores every candidate and returns the top `k` in descending score order.
/// The sort is stable, so ties keep catalog insertion order. Empty candidates
/// yield an empty result.
pub fn rank<'a>(
	query: &[f32],
	candidates: &[(&'a CatalogItem, &'a [f32])],
	k: usize,
) -> Vec<(&'a CatalogItem, f32)> {
	let mut scored: Vec<(&CatalogItem, f32)> =
		candidates.iter().map(|(item, vector)| (*item, score(query, vector))).collect();

	scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
	scored.truncate(k);

	scored
}
