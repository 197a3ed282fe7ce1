use std::{
	collections::{BTreeMap, HashMap},
	sync::Mutex,
};

use serde::{Deserialize, Serialize};

use brew_config::Experiment;

/// Variant returned for unknown or paused experiments.
pub const CONTROL_VARIANT: &str = "control";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ExperimentDescriptor {
	pub name: String,
	pub variants: Vec<VariantShare>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VariantShare {
	pub id: String,
	pub weight: u32,
}

/// Deterministic experiment bucketing. Assignment is a pure function of
/// `(experiment, user_id, variant set)`; the memo only saves rehashing.
pub struct ExperimentService {
	experiments: Vec<Experiment>,
	assignments: Mutex<HashMap<(String, String), String>>,
}

impl ExperimentService {
	pub fn new(experiments: Vec<Experiment>) -> Self {
		Self { experiments, assignments: Mutex::new(HashMap::new()) }
	}

	/// Assigns `user_id` to a variant of `experiment`. Stable forever for a
	/// fixed variant set. Unknown or paused experiments land on `control`.
	pub fn assign(&self, experiment: &str, user_id: &str) -> String {
		let key = (experiment.to_string(), user_id.to_string());

		if let Some(variant) = self.assignments.lock().expect("assignment lock poisoned").get(&key)
		{
			return variant.clone();
		}

		let variant = self.derive(experiment, user_id);

		self.assignments
			.lock()
			.expect("assignment lock poisoned")
			.insert(key, variant.clone());

		variant
	}

	/// Assignments for every active experiment, keyed by experiment name.
	pub fn assign_all(&self, user_id: &str) -> BTreeMap<String, String> {
		self.experiments
			.iter()
			.filter(|experiment| experiment.active)
			.map(|experiment| {
				(experiment.name.clone(), self.assign(&experiment.name, user_id))
			})
			.collect()
	}

	pub fn list_active(&self) -> Vec<ExperimentDescriptor> {
		self.experiments
			.iter()
			.filter(|experiment| experiment.active)
			.map(|experiment| ExperimentDescriptor {
				name: experiment.name.clone(),
				variants: experiment
					.variants
					.iter()
					.map(|variant| VariantShare { id: variant.id.clone(), weight: variant.weight })
					.collect(),
			})
			.collect()
	}

	fn derive(&self, experiment: &str, user_id: &str) -> String {
		let Some(found) =
			self.experiments.iter().find(|candidate| candidate.name == experiment)
		else {
			return CONTROL_VARIANT.to_string();
		};

		if !found.active {
			return CONTROL_VARIANT.to_string();
		}

		let bucket = bucket_of(experiment, user_id);
		let mut cumulative = 0u32;

		for variant in &found.variants {
			cumulative += variant.weight;

			if u32::from(bucket) < cumulative {
				return variant.id.clone();
			}
		}

		// Weights sum to 100 by config validation; unreachable in practice.
		CONTROL_VARIANT.to_string()
	}
}

/// Bucket in [0, 100) from the first 8 bytes of `blake3("{experiment}:{user}")`.
fn bucket_of(experiment: &str, user_id: &str) -> u8 {
	let hash = blake3::hash(format!("{experiment}:{user_id}").as_bytes());
	let head: [u8; 8] = hash.as_bytes()[..8].try_into().expect("hash is 32 bytes");

	(u64::from_le_bytes(head) % 100) as u8
}
