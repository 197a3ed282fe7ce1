use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use brew_config::{Config, Experiment, ExperimentVariant};
use brew_domain::{Catalog, CatalogItem, Category, Constraints, Temperature};
use brew_engine::{
	BoxFuture, CacheState, EmbeddingProvider, Engine, Error, Providers, RecommendRequest,
	TextGenerationProvider,
};
use brew_store::EventType;

/// Keyword-routed embeddings make similarity fully predictable: decaf-ish
/// texts share one axis, "mystery" gets its own, everything else shares a
/// third.
struct KeywordEmbedder;

impl EmbeddingProvider for KeywordEmbedder {
	fn embed<'a>(
		&'a self,
		_: &'a brew_config::EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async {
			Ok(texts
				.iter()
				.map(|text| {
					let lowered = text.to_lowercase();

					if lowered.contains("decaf") || lowered.contains("herbal") {
						vec![0.0, 1.0, 0.0]
					} else if lowered.contains("mystery") {
						vec![0.0, 0.0, 1.0]
					} else {
						vec![1.0, 0.0, 0.0]
					}
				})
				.collect())
		})
	}
}

struct FailingGenerator;

impl TextGenerationProvider for FailingGenerator {
	fn generate<'a>(
		&'a self,
		_: &'a brew_config::GenerationProviderConfig,
		_: &'a str,
		_: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async { Err(color_eyre::eyre::eyre!("generation backend down")) })
	}
}

fn config(dir: &std::path::Path) -> Config {
	let raw = format!(
		r#"
			[service]
			http_bind = "127.0.0.1:0"
			log_level = "info"

			[catalog]
			path = "unused.json"

			[storage]
			embedding_cache_path = {:?}
			behavior_dir = {:?}

			[providers.embedding]
			provider_id = "test"
			api_base = "http://localhost"
			path = "/v1/embeddings"
			model = "test-model"
			dimensions = 3

			[providers.generation]
			provider_id = "test"
			api_base = "http://localhost"
			path = "/v1/chat/completions"
			model = "test-model"

			[ranking]

			[personas.calm]
			description = "Prefers calming caffeine-free drinks."
			keywords = ["calming"]
			avoid = ["bold"]
		"#,
		dir.join("embeddings.json").to_string_lossy(),
		dir.join("behavior").to_string_lossy(),
	);

	toml::from_str(&raw).unwrap()
}

fn item(
	sku: &str,
	name: &str,
	category: Category,
	price: f32,
	caffeinated: bool,
	customizable: bool,
) -> CatalogItem {
	CatalogItem {
		sku: sku.to_string(),
		name: name.to_string(),
		description: format!("{name} description"),
		category,
		base_price: price,
		calories: 150,
		caffeinated,
		contains_dairy: false,
		customizable,
		is_new: false,
		is_seasonal: false,
		tags: vec!["classic".to_string()],
		available_temperatures: vec![Temperature::Hot, Temperature::Iced],
	}
}

/// The three-item catalog from the decaf scenario: two caffeinated coffees
/// around one caffeine-free tea.
fn catalog() -> Catalog {
	Catalog::new(vec![
		item("latte", "Latte", Category::Coffee, 32.0, true, true),
		item("herbal", "Herbal Tea", Category::Tea, 22.0, false, true),
		item("americano", "Americano", Category::Coffee, 45.0, true, false),
	])
	.unwrap()
}

async fn engine(dir: &std::path::Path) -> Engine {
	let providers =
		Providers::new(Arc::new(KeywordEmbedder), Arc::new(FailingGenerator));
	let engine = Engine::with_providers(config(dir), catalog(), providers);
	let state = engine.ensure_ready().await.unwrap();

	assert!(matches!(state, CacheState::Regenerated { .. }));

	engine
}

fn request(query: &str) -> RecommendRequest {
	RecommendRequest {
		user_id: "user-1".to_string(),
		query: Some(query.to_string()),
		persona_type: None,
		session_id: None,
		constraints: Constraints::default(),
		top_k: None,
		context_override: None,
	}
}

#[tokio::test]
async fn decaf_scenario_returns_only_the_caffeine_free_item() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path()).await;
	let mut req = request("decaf please");

	req.constraints.caffeine_free = true;
	req.top_k = Some(2);

	let res = engine.recommend(req).await.unwrap();

	assert_eq!(res.recommendations.len(), 1);
	assert_eq!(res.recommendations[0].item.sku, "herbal");
	assert_eq!(res.meta.total_count, 3);
	assert_eq!(res.meta.filtered_count, 1);
	assert!(!res.need_clarification);
	assert!(!res.recommendations[0].reason.is_empty());
	assert!(!res.suggested_response.is_empty());
}

#[tokio::test]
async fn max_price_filters_before_ranking() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path()).await;
	let mut req = request("bold coffee");

	// The 45-yuan americano matches the query best by raw similarity; the
	// price ceiling must still keep it out entirely.
	req.constraints.max_price = Some(40.0);
	req.top_k = Some(3);

	let res = engine.recommend(req).await.unwrap();

	assert!(!res.recommendations.is_empty());
	assert!(res.recommendations.iter().all(|rec| rec.item.base_price <= 40.0));
	assert!(res.recommendations.iter().all(|rec| rec.item.sku != "americano"));
	assert_eq!(res.meta.filtered_count, 2);
}

#[tokio::test]
async fn eliminating_every_candidate_asks_for_clarification() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path()).await;
	let mut req = request("anything");

	req.constraints.caffeine_free = true;
	req.constraints.max_price = Some(10.0);

	let res = engine.recommend(req).await.unwrap();

	assert!(res.recommendations.is_empty());
	assert!(res.need_clarification);
	assert!(!res.clarification_options.is_empty());
	assert_eq!(res.meta.filtered_count, 0);
}

#[tokio::test]
async fn weak_matches_ask_for_clarification_but_still_recommend() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path()).await;
	let res = engine.recommend(request("mystery")).await.unwrap();

	assert!(res.need_clarification);
	assert!(!res.recommendations.is_empty());
	assert_eq!(res.recommendations[0].confidence_label, "low");
}

#[tokio::test]
async fn order_history_lifts_a_tied_candidate() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path()).await;
	let now = OffsetDateTime::now_utc();

	engine.record_event("user-1", "latte", EventType::Order, now - Duration::days(1)).unwrap();
	engine.record_event("user-1", "latte", EventType::Order, now - Duration::days(2)).unwrap();

	let res = engine.recommend(request("mystery")).await.unwrap();

	assert_eq!(res.recommendations[0].item.sku, "latte");
	assert!(!res.need_clarification);

	let behavior_factor = res.recommendations[0]
		.factors
		.iter()
		.find(|factor| factor.name == "behavior")
		.unwrap();

	assert_eq!(behavior_factor.value, 1.0);
}

#[tokio::test]
async fn session_feedback_shows_up_in_customization_factor() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path()).await;

	engine.session_feedback("s1", "latte", brew_engine::FeedbackAction::Like).unwrap();

	let mut req = request("bold coffee");

	req.session_id = Some("s1".to_string());

	let res = engine.recommend(req).await.unwrap();
	let latte = res.recommendations.iter().find(|rec| rec.item.sku == "latte").unwrap();
	let customization =
		latte.factors.iter().find(|factor| factor.name == "customization").unwrap();

	// The liked item's tags now overlap the session preferences.
	assert_eq!(customization.value, 1.0);
}

#[tokio::test]
async fn meta_echoes_the_raw_query_alongside_the_resolved_text() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path()).await;
	let mut req = request("decaf please");

	req.persona_type = Some("calm".to_string());

	let res = engine.recommend(req).await.unwrap();

	assert_eq!(res.meta.query.as_deref(), Some("decaf please"));
	assert!(res.meta.resolved_query.contains("calming caffeine-free"));
	assert!(res.meta.resolved_query.ends_with("decaf please"));
}

#[tokio::test]
async fn ranking_variant_without_a_profile_is_a_configuration_error() {
	let dir = tempfile::tempdir().unwrap();
	let mut cfg = config(dir.path());

	cfg.experiments = vec![Experiment {
		name: "ranking_profile".to_string(),
		active: true,
		variants: vec![ExperimentVariant { id: "turbo".to_string(), weight: 100 }],
	}];

	let providers = Providers::new(Arc::new(KeywordEmbedder), Arc::new(FailingGenerator));
	let engine = Engine::with_providers(cfg, catalog(), providers);

	assert!(matches!(
		engine.recommend(request("coffee")).await,
		Err(Error::Configuration { .. })
	));
}

#[tokio::test]
async fn unknown_persona_is_not_found() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path()).await;
	let mut req = request("coffee");

	req.persona_type = Some("astronaut".to_string());

	assert!(matches!(engine.recommend(req).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn zero_top_k_is_rejected() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path()).await;
	let mut req = request("coffee");

	req.top_k = Some(0);

	assert!(matches!(engine.recommend(req).await, Err(Error::InvalidRequest { .. })));
}

#[tokio::test]
async fn missing_query_and_persona_is_invalid() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path()).await;
	let mut req = request("");

	req.query = None;

	assert!(matches!(engine.recommend(req).await, Err(Error::InvalidRequest { .. })));
}
