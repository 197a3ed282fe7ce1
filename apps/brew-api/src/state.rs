use std::{path::Path, sync::Arc};

use brew_domain::Catalog;
use brew_engine::Engine;

#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<Engine>,
}
impl AppState {
	pub async fn new(config: brew_config::Config) -> color_eyre::Result<Self> {
		let catalog = Catalog::load(Path::new(&config.catalog.path))?;
		let engine = Engine::new(config, catalog);

		// Warm-up failure is retryable; recommendation requests retry it and
		// answer 502 until the embedding provider recovers.
		match engine.ensure_ready().await {
			Ok(state) => tracing::info!(?state, "embedding index ready."),
			Err(err) => tracing::warn!(error = %err, "embedding warm-up failed, will retry."),
		}

		Ok(Self { engine: Arc::new(engine) })
	}
}
