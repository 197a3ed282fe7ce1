pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Storage io failure at {path:?}.")]
	Io { path: std::path::PathBuf, source: std::io::Error },
	#[error("Malformed stored data at {path:?}.")]
	Malformed { path: std::path::PathBuf, source: serde_json::Error },
	#[error("{0}")]
	InvalidArgument(String),
}
