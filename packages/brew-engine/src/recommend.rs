use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use brew_domain::{CatalogItem, Constraints, RequestContext, Temperature};

use crate::{
	Engine,
	compose::{self, ComposeInputs, Factor},
	error::{Error, Result},
	experiments::CONTROL_VARIANT,
	profile, rank,
};

/// Composite floor below which the orchestrator asks for clarification
/// instead of confidently recommending.
const CLARIFICATION_FLOOR: f32 = 0.5;

const RANKING_PROFILE_EXPERIMENT: &str = "ranking_profile";
const REASON_STYLE_EXPERIMENT: &str = "reason_style";

#[derive(Clone, Debug, Deserialize)]
pub struct RecommendRequest {
	pub user_id: String,
	#[serde(default)]
	pub query: Option<String>,
	#[serde(default)]
	pub persona_type: Option<String>,
	#[serde(default)]
	pub session_id: Option<String>,
	#[serde(default)]
	pub constraints: Constraints,
	#[serde(default)]
	pub top_k: Option<u32>,
	#[serde(default)]
	pub context_override: Option<RequestContext>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CustomizationDefaults {
	pub size: String,
	pub temperature: Temperature,
	pub sugar: String,
	pub milk: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Pricing {
	pub base_price: f32,
	pub customization_adjustment: f32,
	pub total: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct Recommendation {
	pub item: CatalogItem,
	pub customization_defaults: CustomizationDefaults,
	pub pricing: Pricing,
	pub confidence: f32,
	pub confidence_label: String,
	pub reason: String,
	pub matched_keywords: Vec<String>,
	pub factors: Vec<Factor>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Meta {
	/// The caller's free-text query, echoed verbatim.
	pub query: Option<String>,
	/// The persona-expanded text that was actually embedded.
	pub resolved_query: String,
	pub total_count: usize,
	pub filtered_count: usize,
	pub constraints: Constraints,
	pub context: RequestContext,
	pub experiments: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RecommendResponse {
	pub recommendations: Vec<Recommendation>,
	pub meta: Meta,
	pub reasoning: Vec<String>,
	pub need_clarification: bool,
	pub clarification_options: Vec<String>,
	pub suggested_response: String,
}

impl Engine {
	pub async fn recommend(&self, req: RecommendRequest) -> Result<RecommendResponse> {
		if req.user_id.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "user_id is required.".to_string() });
		}
		if req.top_k == Some(0) {
			return Err(Error::InvalidRequest {
				message: "top_k must be at least 1.".to_string(),
			});
		}

		let top_k = req.top_k.unwrap_or(self.cfg.ranking.top_k) as usize;
		let persona = match req.persona_type.as_deref() {
			Some(persona_type) => Some(self.cfg.personas.get(persona_type).ok_or_else(|| {
				Error::NotFound(format!("Unknown persona {persona_type}."))
			})?),
			None => None,
		};
		let persona_keywords: Vec<String> =
			persona.map(|persona| persona.keywords.clone()).unwrap_or_default();
		let mut reasoning = Vec::new();

		// 1. Experiments.
		let experiments = self.experiments.assign_all(&req.user_id);
		let ranking_variant = experiments
			.get(RANKING_PROFILE_EXPERIMENT)
			.map(String::as_str)
			.unwrap_or(CONTROL_VARIANT);
		let reason_variant = experiments
			.get(REASON_STYLE_EXPERIMENT)
			.map(String::as_str)
			.unwrap_or(CONTROL_VARIANT)
			.to_string();
		let weights = match self.cfg.ranking.profiles.get(ranking_variant) {
			Some(weights) => *weights,
			// The control variant always has the base weights to fall back on;
			// any other assigned variant must name a declared profile.
			None if ranking_variant == CONTROL_VARIANT => self.cfg.ranking.weights,
			None =>
				return Err(Error::Configuration {
					message: format!(
						"No ranking profile for experiment variant {ranking_variant}."
					),
				}),
		};

		reasoning.push(format!("Resolved ranking profile {ranking_variant}."));

		// 2. Query embedding. The only network suspension besides reasons.
		let query_text = profile::query_text(req.query.as_deref(), persona)?;
		let query_vector = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, std::slice::from_ref(&query_text))
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| Error::GenerationFailed {
				message: "Embedding provider returned no vectors for the query.".to_string(),
			})?;

		reasoning.push(format!("Embedded query text ({} chars).", query_text.len()));

		// 3. Hard constraints filter the catalog before ranking.
		let total_count = self.catalog.len();
		let survivors = req.constraints.filter(self.catalog.items());
		let filtered_count = survivors.len();

		reasoning
			.push(format!("Applied constraints: {total_count} -> {filtered_count} candidates."));

		let context = req.context_override.unwrap_or_default();
		let meta = Meta {
			query: req.query.clone(),
			resolved_query: query_text.clone(),
			total_count,
			filtered_count,
			constraints: req.constraints.clone(),
			context,
			experiments: experiments.clone(),
		};

		if survivors.is_empty() {
			reasoning.push("No candidates survived filtering.".to_string());

			return Ok(RecommendResponse {
				recommendations: Vec::new(),
				meta,
				reasoning,
				need_clarification: true,
				clarification_options: clarification_options(&req.constraints),
				suggested_response: "I couldn't find anything matching all of those \
					requirements. Could we relax one of them?"
					.to_string(),
			});
		}

		// 4. Base similarity over every survivor; composing decides the final
		// order, so truncation waits until after step 5.
		let skus: Vec<&str> = survivors.iter().map(|item| item.sku.as_str()).collect();
		let vectors = self.index.vectors_for(&skus).await?;
		let candidates: Vec<(&CatalogItem, &[f32])> = survivors
			.iter()
			.zip(vectors.iter())
			.map(|(item, vector)| (*item, vector.as_slice()))
			.collect();
		let ranked = rank::rank(&query_vector, &candidates, candidates.len());

		reasoning.push(format!("Ranked {} candidates by similarity.", ranked.len()));

		// 5. Compose with behavior, context, and customization signals.
		let now = OffsetDateTime::now_utc();
		let affinities = self.behavior.affinities(&req.user_id, &skus, now)?;
		let session_preferences = req
			.session_id
			.as_deref()
			.map(|session_id| self.session.preference(session_id))
			.unwrap_or_default();
		let scored: Vec<(&CatalogItem, usize, f32)> = ranked
			.iter()
			.map(|&(item, score)| {
				let position = self.catalog.position(&item.sku).unwrap_or(usize::MAX);

				(item, position, score)
			})
			.collect();
		let composed = compose::compose(&scored, &ComposeInputs {
			weights,
			affinities: &affinities,
			session_preferences: &session_preferences,
			persona_keywords: &persona_keywords,
			context: &context,
		});
		let top_score = composed.first().map(|c| c.composite).unwrap_or(0.0);
		let need_clarification = top_score < CLARIFICATION_FLOOR;
		let top: Vec<_> = composed.into_iter().take(top_k).collect();

		reasoning.push(format!(
			"Composed final scores; top candidate at {top_score:.2}."
		));

		// 6. Reason text, degrading to a template on any generation failure.
		let llm_reason_top_n = self.cfg.ranking.llm_reason_top_n as usize;
		let mut recommendations = Vec::with_capacity(top.len());

		for (rank_index, composed) in top.iter().enumerate() {
			let item = composed.item;
			let matched_keywords =
				profile::matched_keywords(item, &query_text, &persona_keywords);
			let reason = if rank_index < llm_reason_top_n {
				self.reason_for(item, &query_text, &matched_keywords, &reason_variant).await
			} else {
				templated_reason(item, &matched_keywords, &reason_variant, composed.confidence)
			};

			recommendations.push(Recommendation {
				item: item.clone(),
				customization_defaults: customization_defaults(item),
				pricing: Pricing {
					base_price: item.base_price,
					customization_adjustment: 0.0,
					total: item.base_price,
				},
				confidence: composed.composite,
				confidence_label: composed.confidence.to_string(),
				reason,
				matched_keywords,
				factors: composed.factors.clone(),
			});
		}

		debug!(
			user_id = %req.user_id,
			returned = recommendations.len(),
			top_score,
			need_clarification,
			"recommendation served"
		);

		let suggested_response = if need_clarification {
			"I found a few options but nothing I'm confident about. Could you tell me more \
				about what you're in the mood for?"
				.to_string()
		} else {
			let names: Vec<&str> =
				recommendations.iter().map(|rec| rec.item.name.as_str()).collect();

			format!("I'd suggest {}.", names.join(" or "))
		};
		let clarification_options =
			if need_clarification { clarification_options(&req.constraints) } else { Vec::new() };

		Ok(RecommendResponse {
			recommendations,
			meta,
			reasoning,
			need_clarification,
			clarification_options,
			suggested_response,
		})
	}

	async fn reason_for(
		&self,
		item: &CatalogItem,
		query_text: &str,
		matched_keywords: &[String],
		reason_variant: &str,
	) -> String {
		let style_instruction = match reason_variant {
			"detailed" => "Write two sentences covering taste and why it fits the request.",
			_ => "Write one short sentence.",
		};
		let prompt = format!(
			"The customer asked: {query_text}\nRecommended drink: {} ({}). Tags: {}.\n\
				{style_instruction}",
			item.name,
			item.description,
			item.tags.join(", "),
		);

		match self
			.providers
			.generation
			.generate(
				&self.cfg.providers.generation,
				&prompt,
				"You are a barista explaining a drink recommendation in a warm, brief tone.",
			)
			.await
		{
			Ok(reason) if !reason.trim().is_empty() => reason,
			Ok(_) => templated_reason(item, matched_keywords, reason_variant, "medium"),
			Err(err) => {
				warn!(sku = %item.sku, error = %err, "reason generation failed, using template");

				templated_reason(item, matched_keywords, reason_variant, "medium")
			},
		}
	}
}

fn templated_reason(
	item: &CatalogItem,
	matched_keywords: &[String],
	reason_variant: &str,
	confidence: &str,
) -> String {
	let keyword_clause = if matched_keywords.is_empty() {
		String::new()
	} else {
		format!(" It matches what you asked for: {}.", matched_keywords.join(", "))
	};

	match reason_variant {
		"detailed" => format!(
			"{} is a {} pick from our {} range.{keyword_clause} Confidence in this match \
				is {confidence}.",
			item.name,
			if item.is_seasonal { "seasonal" } else { "reliable" },
			item.category.as_str(),
		),
		_ => format!("{} fits your request.{keyword_clause}", item.name),
	}
}

fn customization_defaults(item: &CatalogItem) -> CustomizationDefaults {
	CustomizationDefaults {
		size: "grande".to_string(),
		temperature: item
			.available_temperatures
			.first()
			.copied()
			.unwrap_or(Temperature::Iced),
		sugar: "standard".to_string(),
		milk: "whole".to_string(),
	}
}

fn clarification_options(constraints: &Constraints) -> Vec<String> {
	let mut options = vec![
		"Would you like something hot or iced?".to_string(),
		"Are you in the mood for coffee, tea, or something else?".to_string(),
	];

	if !constraints.is_empty() {
		options.push("Would you relax one of your requirements?".to_string());
	}
	if constraints.max_price.is_some() {
		options.push("Is a slightly higher price acceptable?".to_string());
	}

	options
}
