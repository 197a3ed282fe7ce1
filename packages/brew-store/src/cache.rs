use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Error, Result};

/// On-disk embedding cache. The whole file is the unit of validity; a single
/// stale entry discards everything.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CacheFile {
	pub model: String,
	#[serde(with = "time::serde::timestamp")]
	pub generated_at: OffsetDateTime,
	pub entries: BTreeMap<String, Vec<f32>>,
}

/// Loads the persisted cache. A missing file is `None`, not an error; a
/// present but unreadable file is surfaced so the caller can decide to
/// regenerate.
pub fn load(path: &Path) -> Result<Option<CacheFile>> {
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(err) => return Err(Error::Io { path: path.to_path_buf(), source: err }),
	};
	let cache = serde_json::from_str(&raw)
		.map_err(|err| Error::Malformed { path: path.to_path_buf(), source: err })?;

	Ok(Some(cache))
}

/// Persists atomically: write `<path>.tmp`, then rename over `<path>`. A
/// crash mid-write never corrupts the previous snapshot.
pub fn persist(path: &Path, cache: &CacheFile) -> Result<()> {
	if let Some(parent) = path.parent()
		&& !parent.as_os_str().is_empty()
	{
		fs::create_dir_all(parent)
			.map_err(|err| Error::Io { path: parent.to_path_buf(), source: err })?;
	}

	let tmp = path.with_extension("tmp");
	let raw = serde_json::to_string(cache)
		.map_err(|err| Error::Malformed { path: path.to_path_buf(), source: err })?;

	fs::write(&tmp, raw).map_err(|err| Error::Io { path: tmp.clone(), source: err })?;
	fs::rename(&tmp, path).map_err(|err| Error::Io { path: path.to_path_buf(), source: err })?;

	Ok(())
}
