use std::{
	fs::{self, OpenOptions},
	io::{BufRead, BufReader, Write},
	path::PathBuf,
	sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
	Order,
	Click,
	Like,
	Dislike,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BehaviorEvent {
	pub sku: String,
	pub event: EventType,
	#[serde(with = "time::serde::timestamp")]
	pub at: OffsetDateTime,
}

/// Append-only per-user behavior logs, one JSONL file per user id. Events are
/// appended and replayed, never rewritten. Appends are serialized through one
/// lock and written as a single buffer, so concurrent requests never
/// interleave a partial line.
#[derive(Clone, Debug)]
pub struct BehaviorLog {
	dir: PathBuf,
	append_lock: Arc<Mutex<()>>,
}

impl BehaviorLog {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into(), append_lock: Arc::new(Mutex::new(())) }
	}

	pub fn append(&self, user_id: &str, event: &BehaviorEvent) -> Result<()> {
		let path = self.user_path(user_id)?;

		fs::create_dir_all(&self.dir)
			.map_err(|err| Error::Io { path: self.dir.clone(), source: err })?;

		let mut line = serde_json::to_string(event)
			.map_err(|err| Error::Malformed { path: path.clone(), source: err })?;

		line.push('\n');

		// One write_all per event, under the lock. Line and newline must land
		// as a unit or a concurrent append can split them mid-line.
		let _guard = self.append_lock.lock().expect("append lock poisoned");
		let mut file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&path)
			.map_err(|err| Error::Io { path: path.clone(), source: err })?;

		file.write_all(line.as_bytes()).map_err(|err| Error::Io { path, source: err })?;

		Ok(())
	}

	/// Replays a user's full event history in append order. A user with no
	/// log file has an empty history.
	pub fn replay(&self, user_id: &str) -> Result<Vec<BehaviorEvent>> {
		let path = self.user_path(user_id)?;
		let file = match fs::File::open(&path) {
			Ok(file) => file,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(Error::Io { path, source: err }),
		};
		let mut events = Vec::new();

		for line in BufReader::new(file).lines() {
			let line = line.map_err(|err| Error::Io { path: path.clone(), source: err })?;

			if line.trim().is_empty() {
				continue;
			}

			events.push(
				serde_json::from_str(&line)
					.map_err(|err| Error::Malformed { path: path.clone(), source: err })?,
			);
		}

		Ok(events)
	}

	fn user_path(&self, user_id: &str) -> Result<PathBuf> {
		// User ids become file names, so anything path-like is rejected.
		if user_id.is_empty()
			|| !user_id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
			|| user_id.starts_with('.')
		{
			return Err(Error::InvalidArgument(format!("Invalid user id {user_id:?}.")));
		}

		Ok(self.dir.join(format!("{user_id}.jsonl")))
	}
}
