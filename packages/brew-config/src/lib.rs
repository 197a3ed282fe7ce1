mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Behavior, Catalog, Config, EmbeddingProviderConfig, EventWeights, Experiment, ExperimentVariant,
	FactorWeights, GenerationProviderConfig, Persona, Providers, Ranking, Service, Session, Storage,
};

use std::{collections::HashMap, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.catalog.path.trim().is_empty() {
		return Err(Error::Validation { message: "catalog.path must be non-empty.".to_string() });
	}
	if cfg.storage.embedding_cache_path.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.embedding_cache_path must be non-empty.".to_string(),
		});
	}
	if cfg.storage.behavior_dir.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.behavior_dir must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.batch_size == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.model.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.model must be non-empty.".to_string(),
		});
	}
	if cfg.providers.generation.model.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.generation.model must be non-empty.".to_string(),
		});
	}
	if cfg.ranking.top_k == 0 {
		return Err(Error::Validation {
			message: "ranking.top_k must be greater than zero.".to_string(),
		});
	}

	validate_weights("ranking.weights", &cfg.ranking.weights)?;

	for (id, weights) in &cfg.ranking.profiles {
		validate_weights(&format!("ranking.profiles.{id}"), weights)?;
	}

	if cfg.behavior.half_life_days <= 0.0 || !cfg.behavior.half_life_days.is_finite() {
		return Err(Error::Validation {
			message: "behavior.half_life_days must be a finite number greater than zero."
				.to_string(),
		});
	}

	let ew = cfg.behavior.event_weights;

	if !(ew.order > ew.like && ew.like > ew.click && ew.click > 0.0) {
		return Err(Error::Validation {
			message: "behavior.event_weights must satisfy order > like > click > 0.".to_string(),
		});
	}
	if ew.dislike >= 0.0 {
		return Err(Error::Validation {
			message: "behavior.event_weights.dislike must be negative.".to_string(),
		});
	}
	if cfg.session.clamp <= 0.0 || !cfg.session.clamp.is_finite() {
		return Err(Error::Validation {
			message: "session.clamp must be a finite number greater than zero.".to_string(),
		});
	}

	for experiment in &cfg.experiments {
		if experiment.name.trim().is_empty() {
			return Err(Error::Validation {
				message: "experiments.name must be non-empty.".to_string(),
			});
		}
		if experiment.variants.is_empty() {
			return Err(Error::Validation {
				message: format!("Experiment {} must have at least one variant.", experiment.name),
			});
		}

		let total: u32 = experiment.variants.iter().map(|variant| variant.weight).sum();

		if total != 100 {
			return Err(Error::Validation {
				message: format!(
					"Experiment {} variant weights must sum to 100, got {total}.",
					experiment.name
				),
			});
		}
	}

	Ok(())
}

fn validate_weights(label: &str, weights: &FactorWeights) -> Result<()> {
	for (name, value) in [
		("semantic", weights.semantic),
		("behavior", weights.behavior),
		("context", weights.context),
		("customization", weights.customization),
	] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::Validation {
				message: format!("{label}.{name} must be a finite number zero or greater."),
			});
		}
	}

	let sum = weights.semantic + weights.behavior + weights.context + weights.customization;

	if (sum - 1.0).abs() > 1e-3 {
		return Err(Error::Validation {
			message: format!("{label} must sum to 1.0, got {sum}."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.providers.embedding.api_key = cfg.providers.embedding.api_key.trim().to_string();
	cfg.providers.generation.api_key = cfg.providers.generation.api_key.trim().to_string();

	for persona in cfg.personas.values_mut() {
		persona.keywords.retain(|keyword| !keyword.trim().is_empty());
		persona.avoid.retain(|keyword| !keyword.trim().is_empty());
	}

	if cfg.experiments.is_empty() {
		cfg.experiments = default_experiments();
	}
	if cfg.ranking.profiles.is_empty() {
		cfg.ranking.profiles = default_ranking_profiles();
	}
}

fn default_experiments() -> Vec<Experiment> {
	let variant = |id: &str, weight| ExperimentVariant { id: id.to_string(), weight };

	vec![
		Experiment {
			name: "ranking_profile".to_string(),
			active: true,
			variants: vec![
				variant("semantic", 34),
				variant("behavior_heavy", 33),
				variant("hybrid", 33),
			],
		},
		Experiment {
			name: "reason_style".to_string(),
			active: true,
			variants: vec![variant("concise", 50), variant("detailed", 50)],
		},
	]
}

fn default_ranking_profiles() -> HashMap<String, FactorWeights> {
	HashMap::from([
		(
			"semantic".to_string(),
			FactorWeights { semantic: 0.60, behavior: 0.15, context: 0.15, customization: 0.10 },
		),
		(
			"behavior_heavy".to_string(),
			FactorWeights { semantic: 0.30, behavior: 0.40, context: 0.15, customization: 0.15 },
		),
		("hybrid".to_string(), FactorWeights::default()),
	])
}
