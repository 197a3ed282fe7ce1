//! Deterministic offline embedding, selected when no api key is configured.
//! The embedding is a token-bag hash so texts sharing words land near each
//! other, which keeps ranking meaningful without a network dependency.

/// Embeds each text as the normalized sum of per-token hash directions.
/// Identical input always yields identical output.
pub fn embed(texts: &[String], dimensions: u32) -> Vec<Vec<f32>> {
	texts.iter().map(|text| embed_one(text, dimensions as usize)).collect()
}

fn embed_one(text: &str, dimensions: usize) -> Vec<f32> {
	let mut vector = vec![0.0f32; dimensions];

	for token in text.to_lowercase().split_whitespace() {
		let hash = blake3::hash(token.as_bytes());
		let bytes = hash.as_bytes();

		for (i, slot) in vector.iter_mut().enumerate() {
			let byte = bytes[i % bytes.len()].wrapping_add((i / bytes.len()) as u8);

			*slot += f32::from(byte) / 127.5 - 1.0;
		}
	}

	let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();

	if magnitude > 0.0 {
		for slot in &mut vector {
			*slot /= magnitude;
		}
	}

	vector
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn embedding_is_deterministic() {
		let texts = vec!["iced oat latte".to_string()];

		assert_eq!(embed(&texts, 16), embed(&texts, 16));
	}

	#[test]
	fn shared_tokens_pull_vectors_together() {
		let texts = vec![
			"iced latte".to_string(),
			"iced tea".to_string(),
			"warm croissant".to_string(),
		];
		let vectors = embed(&texts, 32);
		let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };

		assert!(dot(&vectors[0], &vectors[1]) > dot(&vectors[0], &vectors[2]));
	}

	#[test]
	fn empty_text_is_a_zero_vector() {
		let vectors = embed(&["".to_string()], 8);

		assert!(vectors[0].iter().all(|v| *v == 0.0));
	}
}
