use brew_config::Persona;
use brew_domain::CatalogItem;

use crate::error::{Error, Result};

/// Builds the text that gets embedded as the query. A persona template and a
/// free-text query can combine; at least one must be present.
pub fn query_text(query: Option<&str>, persona: Option<&Persona>) -> Result<String> {
	let query = query.map(str::trim).filter(|q| !q.is_empty());
	let mut parts = Vec::new();

	if let Some(persona) = persona {
		parts.push(persona.description.clone());

		if !persona.keywords.is_empty() {
			parts.push(format!("Prefers {}.", persona.keywords.join(", ")));
		}
		if !persona.avoid.is_empty() {
			parts.push(format!("Avoids {}.", persona.avoid.join(", ")));
		}
	}
	if let Some(query) = query {
		parts.push(query.to_string());
	}

	if parts.is_empty() {
		return Err(Error::InvalidRequest {
			message: "Either query or persona_type is required.".to_string(),
		});
	}

	Ok(parts.join(" "))
}

/// Item tags that echo the query or persona vocabulary, for explainability
/// and for the templated reason fallback.
pub fn matched_keywords(
	item: &CatalogItem,
	query_text: &str,
	persona_keywords: &[String],
) -> Vec<String> {
	let lowered_query = query_text.to_lowercase();
	let mut matched = Vec::new();

	for tag in &item.tags {
		let lowered_tag = tag.to_lowercase();
		let in_query = lowered_query.contains(&lowered_tag);
		let in_persona =
			persona_keywords.iter().any(|keyword| keyword.eq_ignore_ascii_case(tag));

		if (in_query || in_persona) && !matched.contains(tag) {
			matched.push(tag.clone());
		}
	}

	matched
}

#[cfg(test)]
mod tests {
	use super::*;
	use brew_domain::{Category, Temperature};

	fn persona() -> Persona {
		Persona {
			description: "Early riser who wants a dependable morning coffee.".to_string(),
			keywords: vec!["classic".to_string(), "strong".to_string()],
			avoid: vec!["sweet".to_string()],
		}
	}

	#[test]
	fn persona_and_query_combine() {
		let text = query_text(Some("something iced"), Some(&persona())).unwrap();

		assert!(text.contains("morning coffee"));
		assert!(text.contains("Prefers classic, strong."));
		assert!(text.contains("Avoids sweet."));
		assert!(text.ends_with("something iced"));
	}

	#[test]
	fn missing_both_is_invalid() {
		assert!(matches!(query_text(None, None), Err(Error::InvalidRequest { .. })));
		assert!(matches!(query_text(Some("   "), None), Err(Error::InvalidRequest { .. })));
	}

	#[test]
	fn matched_keywords_come_from_tags() {
		let item = CatalogItem {
			sku: "latte".to_string(),
			name: "Latte".to_string(),
			description: String::new(),
			category: Category::Coffee,
			base_price: 32.0,
			calories: 250,
			caffeinated: true,
			contains_dairy: true,
			customizable: true,
			is_new: false,
			is_seasonal: false,
			tags: vec!["creamy".to_string(), "classic".to_string(), "hot".to_string()],
			available_temperatures: vec![Temperature::Hot],
		};
		let matched = matched_keywords(&item, "a creamy drink please", &persona().keywords);

		assert_eq!(matched, vec!["creamy".to_string(), "classic".to_string()]);
	}
}
