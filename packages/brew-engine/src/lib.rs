pub mod behavior;
pub mod compose;
pub mod experiments;
pub mod index;
pub mod profile;
pub mod rank;
pub mod recommend;
pub mod session;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

pub use behavior::{BehaviorProfile, BehaviorService};
pub use compose::{Composed, ComposeInputs, Factor, compose, confidence_label};
pub use error::{Error, Result};
pub use experiments::{CONTROL_VARIANT, ExperimentDescriptor, ExperimentService, VariantShare};
pub use index::{CacheState, EmbeddingIndex};
pub use recommend::{
	CustomizationDefaults, Meta, Pricing, Recommendation, RecommendRequest, RecommendResponse,
};
pub use session::{FeedbackAction, SessionService};

use brew_config::{Config, EmbeddingProviderConfig, GenerationProviderConfig};
use brew_domain::Catalog;
use brew_providers::{embedding, generation, offline};
use brew_store::BehaviorLog;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait TextGenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		prompt: &'a str,
		system_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub generation: Arc<dyn TextGenerationProvider>,
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		generation: Arc<dyn TextGenerationProvider>,
	) -> Self {
		Self { embedding, generation }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), generation: provider }
	}
}

/// HTTP providers when an api key is configured; deterministic offline
/// fallbacks otherwise, so the engine stays usable without credentials.
struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		if cfg.api_key.is_empty() {
			return Box::pin(async { Ok(offline::embed(texts, cfg.dimensions)) });
		}

		Box::pin(embedding::embed(cfg, texts))
	}
}

impl TextGenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		prompt: &'a str,
		system_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		if cfg.api_key.is_empty() {
			// The recommend pipeline treats a generation failure as a cue to
			// use its own templated reason, which is the better offline text.
			return Box::pin(async { Err(color_eyre::eyre::eyre!("No generation api key.")) });
		}

		Box::pin(generation::generate(cfg, prompt, system_prompt))
	}
}

pub struct Engine {
	pub cfg: Config,
	pub catalog: Catalog,
	pub index: EmbeddingIndex,
	pub experiments: ExperimentService,
	pub behavior: BehaviorService,
	pub session: SessionService,
	pub providers: Providers,
}

impl Engine {
	pub fn new(cfg: Config, catalog: Catalog) -> Self {
		Self::with_providers(cfg, catalog, Providers::default())
	}

	pub fn with_providers(cfg: Config, catalog: Catalog, providers: Providers) -> Self {
		let index = EmbeddingIndex::new(&cfg.storage.embedding_cache_path);
		let experiments = ExperimentService::new(cfg.experiments.clone());
		let behavior = BehaviorService::new(
			BehaviorLog::new(&cfg.storage.behavior_dir),
			cfg.behavior.clone(),
		);
		let session = SessionService::new(cfg.session.clamp);

		Self { cfg, catalog, index, experiments, behavior, session, providers }
	}

	/// Warms the embedding index. Must succeed before recommendation requests
	/// are served; a failure here is retryable, never silently swallowed.
	pub async fn ensure_ready(&self) -> Result<CacheState> {
		self.index.ensure_ready(&self.cfg, &self.catalog, &self.providers).await
	}

	pub fn record_event(
		&self,
		user_id: &str,
		sku: &str,
		event: brew_store::EventType,
		at: time::OffsetDateTime,
	) -> Result<()> {
		if self.catalog.get(sku).is_none() {
			return Err(Error::InvalidEvent { message: format!("Unknown sku {sku}.") });
		}

		self.behavior.record(user_id, sku, event, at)
	}

	pub fn behavior_profile(&self, user_id: &str) -> Result<BehaviorProfile> {
		self.behavior.profile(user_id, &self.catalog, time::OffsetDateTime::now_utc())
	}

	pub fn session_feedback(
		&self,
		session_id: &str,
		sku: &str,
		action: FeedbackAction,
	) -> Result<()> {
		let item = self
			.catalog
			.get(sku)
			.ok_or_else(|| Error::NotFound(format!("Unknown sku {sku}.")))?;

		self.session.apply_feedback(session_id, action, item);

		Ok(())
	}
}
