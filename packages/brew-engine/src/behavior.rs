use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use brew_config::Behavior;
use brew_domain::Catalog;
use brew_store::{BehaviorEvent, BehaviorLog, EventType};

use crate::error::{Error, Result};

const SECONDS_PER_DAY: f32 = 86_400.0;

/// Replayed per-user summary. Decayed scores use the same half-life as
/// affinity, so the profile and the ranking agree on what "recent" means.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BehaviorProfile {
	pub user_id: String,
	pub event_count: usize,
	pub order_count: usize,
	pub category_scores: BTreeMap<String, f32>,
	pub tag_scores: BTreeMap<String, f32>,
	pub new_user: bool,
}

/// Time-decayed order-affinity over append-only per-user logs.
pub struct BehaviorService {
	log: BehaviorLog,
	cfg: Behavior,
}

impl BehaviorService {
	pub fn new(log: BehaviorLog, cfg: Behavior) -> Self {
		Self { log, cfg }
	}

	pub fn record(
		&self,
		user_id: &str,
		sku: &str,
		event: EventType,
		at: OffsetDateTime,
	) -> Result<()> {
		if sku.trim().is_empty() {
			return Err(Error::InvalidEvent { message: "Event sku must be non-empty.".to_string() });
		}

		self.log
			.append(user_id, &BehaviorEvent { sku: sku.to_string(), event, at })
			.map_err(|err| match err {
				brew_store::Error::InvalidArgument(message) => Error::InvalidEvent { message },
				other => Error::Storage(other),
			})?;

		Ok(())
	}

	/// Decayed affinity of a user for one sku: sum of
	/// `event_weight * 2^(-age_days / half_life_days)` over matching events,
	/// clamped at zero. No events means affinity 0.
	pub fn affinity(&self, user_id: &str, sku: &str, as_of: OffsetDateTime) -> Result<f32> {
		let events = self.log.replay(user_id)?;

		Ok(self.decayed_sum(events.iter().filter(|event| event.sku == sku), as_of))
	}

	/// Affinity per sku across a candidate set, from a single replay.
	pub fn affinities(
		&self,
		user_id: &str,
		skus: &[&str],
		as_of: OffsetDateTime,
	) -> Result<HashMap<String, f32>> {
		let events = self.log.replay(user_id)?;
		let mut affinities = HashMap::with_capacity(skus.len());

		for &sku in skus {
			let sum = self.decayed_sum(events.iter().filter(|event| event.sku == sku), as_of);

			affinities.insert(sku.to_string(), sum);
		}

		Ok(affinities)
	}

	pub fn profile(
		&self,
		user_id: &str,
		catalog: &Catalog,
		as_of: OffsetDateTime,
	) -> Result<BehaviorProfile> {
		let events = self.log.replay(user_id)?;
		let mut category_scores: BTreeMap<String, f32> = BTreeMap::new();
		let mut tag_scores: BTreeMap<String, f32> = BTreeMap::new();
		let mut order_count = 0;

		for event in &events {
			if event.event == EventType::Order {
				order_count += 1;
			}

			let Some(item) = catalog.get(&event.sku) else {
				// Items can leave the catalog after events referenced them.
				continue;
			};
			let contribution = self.event_weight(event.event) * self.decay(event.at, as_of);

			*category_scores.entry(item.category.as_str().to_string()).or_insert(0.0) +=
				contribution;

			for tag in &item.tags {
				*tag_scores.entry(tag.clone()).or_insert(0.0) += contribution;
			}
		}

		Ok(BehaviorProfile {
			user_id: user_id.to_string(),
			event_count: events.len(),
			order_count,
			category_scores,
			tag_scores,
			new_user: events.is_empty(),
		})
	}

	fn decayed_sum<'a>(
		&self,
		events: impl Iterator<Item = &'a BehaviorEvent>,
		as_of: OffsetDateTime,
	) -> f32 {
		let sum: f32 =
			events.map(|event| self.event_weight(event.event) * self.decay(event.at, as_of)).sum();

		sum.max(0.0)
	}

	fn decay(&self, at: OffsetDateTime, as_of: OffsetDateTime) -> f32 {
		let age_days = ((as_of - at).whole_seconds() as f32 / SECONDS_PER_DAY).max(0.0);

		2.0f32.powf(-age_days / self.cfg.half_life_days)
	}

	fn event_weight(&self, event: EventType) -> f32 {
		let weights = self.cfg.event_weights;

		match event {
			EventType::Order => weights.order,
			EventType::Like => weights.like,
			EventType::Click => weights.click,
			EventType::Dislike => weights.dislike,
		}
	}
}
