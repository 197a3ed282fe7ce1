use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub catalog: Catalog,
	pub storage: Storage,
	pub providers: Providers,
	pub ranking: Ranking,
	#[serde(default)]
	pub behavior: Behavior,
	#[serde(default)]
	pub session: Session,
	#[serde(default)]
	pub experiments: Vec<Experiment>,
	#[serde(default)]
	pub personas: HashMap<String, Persona>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Catalog {
	pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub embedding_cache_path: String,
	pub behavior_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub generation: GenerationProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// Empty key selects the deterministic offline provider.
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	#[serde(default = "default_batch_size")]
	pub batch_size: u32,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	#[serde(default = "default_temperature")]
	pub temperature: f32,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Ranking {
	#[serde(default = "default_top_k")]
	pub top_k: u32,
	/// How many of the top results get an LLM-written reason; the rest use the
	/// templated fallback directly.
	#[serde(default = "default_llm_reason_top_n")]
	pub llm_reason_top_n: u32,
	#[serde(default)]
	pub weights: FactorWeights,
	/// Per-variant overrides keyed by `ranking_profile` variant id.
	#[serde(default)]
	pub profiles: HashMap<String, FactorWeights>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct FactorWeights {
	pub semantic: f32,
	pub behavior: f32,
	pub context: f32,
	pub customization: f32,
}
impl Default for FactorWeights {
	fn default() -> Self {
		Self { semantic: 0.40, behavior: 0.25, context: 0.20, customization: 0.15 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Behavior {
	pub half_life_days: f32,
	pub event_weights: EventWeights,
}
impl Default for Behavior {
	fn default() -> Self {
		Self { half_life_days: 30.0, event_weights: EventWeights::default() }
	}
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct EventWeights {
	pub order: f32,
	pub like: f32,
	pub click: f32,
	pub dislike: f32,
}
impl Default for EventWeights {
	fn default() -> Self {
		Self { order: 1.0, like: 0.6, click: 0.3, dislike: -0.8 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Session {
	/// Session weights are clamped to [-clamp, clamp].
	pub clamp: f32,
}
impl Default for Session {
	fn default() -> Self {
		Self { clamp: 1.0 }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Experiment {
	pub name: String,
	#[serde(default = "default_experiment_active")]
	pub active: bool,
	pub variants: Vec<ExperimentVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentVariant {
	pub id: String,
	pub weight: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Persona {
	pub description: String,
	#[serde(default)]
	pub keywords: Vec<String>,
	#[serde(default)]
	pub avoid: Vec<String>,
}

fn default_batch_size() -> u32 {
	64
}

fn default_timeout_ms() -> u64 {
	60_000
}

fn default_temperature() -> f32 {
	0.7
}

fn default_top_k() -> u32 {
	2
}

fn default_llm_reason_top_n() -> u32 {
	3
}

fn default_experiment_active() -> bool {
	true
}
