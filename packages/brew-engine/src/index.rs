use std::{
	collections::{BTreeMap, HashMap},
	path::PathBuf,
};

use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{info, warn};

use brew_config::Config;
use brew_domain::Catalog;
use brew_store::{CacheFile, cache};

use crate::{
	Providers,
	error::{Error, Result},
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CacheState {
	Loaded,
	Regenerated { reason: String },
}

/// In-memory embedding index over the persisted cache file. Staleness is an
/// internal signal that triggers wholesale regeneration; callers only ever
/// see `Loaded` or `Regenerated`.
pub struct EmbeddingIndex {
	path: PathBuf,
	entries: RwLock<Option<HashMap<String, Vec<f32>>>>,
}

impl EmbeddingIndex {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into(), entries: RwLock::new(None) }
	}

	/// Guarantees a valid, non-stale vector for every catalog item. Holds the
	/// write lock for the whole validate-or-regenerate sequence, so no reader
	/// observes a half-built index.
	pub async fn ensure_ready(
		&self,
		cfg: &Config,
		catalog: &Catalog,
		providers: &Providers,
	) -> Result<CacheState> {
		// Request-path callers re-check readiness on every call; once loaded
		// they must not queue behind the write lock.
		if self.entries.read().await.is_some() {
			return Ok(CacheState::Loaded);
		}

		let mut entries = self.entries.write().await;

		// Lost the race to another regenerator.
		if entries.is_some() {
			return Ok(CacheState::Loaded);
		}

		let reason = match cache::load(&self.path) {
			Ok(Some(file)) => match validate(&file, cfg, catalog) {
				Ok(()) => {
					*entries = Some(file.entries.into_iter().collect());

					info!(items = catalog.len(), "embedding cache loaded");

					return Ok(CacheState::Loaded);
				},
				Err(reason) => reason,
			},
			Ok(None) => "cache file missing".to_string(),
			Err(err) => {
				warn!(error = %err, "embedding cache unreadable, discarding");

				"cache file unreadable".to_string()
			},
		};

		info!(%reason, items = catalog.len(), "regenerating embedding cache");

		// No partial reuse: every item is re-embedded in one batched pass.
		let texts: Vec<String> =
			catalog.items().iter().map(|item| item.embedding_text()).collect();
		let vectors = providers.embedding.embed(&cfg.providers.embedding, &texts).await?;

		if vectors.len() != catalog.len() {
			return Err(Error::GenerationFailed {
				message: format!(
					"Embedding provider returned {} vectors for {} items.",
					vectors.len(),
					catalog.len()
				),
			});
		}

		let dimensions = cfg.providers.embedding.dimensions as usize;

		if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimensions) {
			return Err(Error::GenerationFailed {
				message: format!(
					"Embedding provider returned dimension {} where {dimensions} was configured.",
					vector.len()
				),
			});
		}

		let map: BTreeMap<String, Vec<f32>> =
			catalog.skus().map(str::to_string).zip(vectors).collect();
		let file = CacheFile {
			model: cfg.providers.embedding.model.clone(),
			generated_at: OffsetDateTime::now_utc(),
			entries: map,
		};

		cache::persist(&self.path, &file)?;

		*entries = Some(file.entries.into_iter().collect());

		Ok(CacheState::Regenerated { reason })
	}

	/// Vector for one sku. `NotFound` before `ensure_ready` succeeds or for
	/// skus outside the current catalog.
	pub async fn vector(&self, sku: &str) -> Result<Vec<f32>> {
		let entries = self.entries.read().await;
		let Some(entries) = entries.as_ref() else {
			return Err(Error::NotFound("Embedding index is not ready.".to_string()));
		};

		entries.get(sku).cloned().ok_or_else(|| Error::NotFound(format!("Unknown sku {sku}.")))
	}

	/// Vectors for a candidate set under a single read lock.
	pub async fn vectors_for(&self, skus: &[&str]) -> Result<Vec<Vec<f32>>> {
		let entries = self.entries.read().await;
		let Some(entries) = entries.as_ref() else {
			return Err(Error::NotFound("Embedding index is not ready.".to_string()));
		};

		skus.iter()
			.map(|sku| {
				entries
					.get(*sku)
					.cloned()
					.ok_or_else(|| Error::NotFound(format!("Unknown sku {sku}.")))
			})
			.collect()
	}

	pub async fn is_ready(&self) -> bool {
		self.entries.read().await.is_some()
	}
}

/// Whole-file validity. Any mismatch discards the entire cache; mixing
/// embedding spaces across model versions is never worth a partial reuse.
fn validate(file: &CacheFile, cfg: &Config, catalog: &Catalog) -> std::result::Result<(), String> {
	if file.model != cfg.providers.embedding.model {
		return Err(format!(
			"model changed from {} to {}",
			file.model, cfg.providers.embedding.model
		));
	}

	let cached: std::collections::BTreeSet<&str> =
		file.entries.keys().map(String::as_str).collect();
	let current: std::collections::BTreeSet<&str> = catalog.skus().collect();

	if cached != current {
		return Err("catalog composition changed".to_string());
	}

	let dimensions = cfg.providers.embedding.dimensions as usize;

	if file.entries.values().any(|vector| vector.len() != dimensions) {
		return Err("vector dimension mismatch".to_string());
	}

	Ok(())
}
