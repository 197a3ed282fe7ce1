use std::{
	collections::HashMap,
	sync::Mutex,
};

use serde::{Deserialize, Serialize};

use brew_domain::CatalogItem;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
	Like,
	Dislike,
	View,
}

const LIKE_DELTA: f32 = 0.3;
const DISLIKE_DELTA: f32 = -0.3;
const VIEW_DELTA: f32 = 0.1;

/// Per-session tag/category preference weights. In-memory only, created on
/// first touch, never expired in-process.
pub struct SessionService {
	sessions: Mutex<HashMap<String, HashMap<String, f32>>>,
	clamp: f32,
}

impl SessionService {
	pub fn new(clamp: f32) -> Self {
		Self { sessions: Mutex::new(HashMap::new()), clamp }
	}

	/// Adds `delta` to the session's weight for a tag or category, clamped so
	/// one noisy session cannot run away.
	pub fn update(&self, session_id: &str, key: &str, delta: f32) {
		let mut sessions = self.sessions.lock().expect("session lock poisoned");
		let weights = sessions.entry(session_id.to_string()).or_default();
		let weight = weights.entry(key.to_string()).or_insert(0.0);

		*weight = (*weight + delta).clamp(-self.clamp, self.clamp);
	}

	/// Weight map snapshot. A never-seen session has no bias, so it yields an
	/// empty map rather than an error.
	pub fn preference(&self, session_id: &str) -> HashMap<String, f32> {
		self.sessions
			.lock()
			.expect("session lock poisoned")
			.get(session_id)
			.cloned()
			.unwrap_or_default()
	}

	/// Maps an in-session feedback event onto weight updates. Likes and
	/// dislikes touch every tag of the item; views nudge its category only.
	pub fn apply_feedback(&self, session_id: &str, action: FeedbackAction, item: &CatalogItem) {
		match action {
			FeedbackAction::Like =>
				for tag in &item.tags {
					self.update(session_id, tag, LIKE_DELTA);
				},
			FeedbackAction::Dislike =>
				for tag in &item.tags {
					self.update(session_id, tag, DISLIKE_DELTA);
				},
			FeedbackAction::View => {
				self.update(session_id, item.category.as_str(), VIEW_DELTA);
			},
		}
	}
}
