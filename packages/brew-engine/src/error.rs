pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Generation failed: {message}")]
	GenerationFailed { message: String },
	#[error("Invalid event: {message}")]
	InvalidEvent { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error(transparent)]
	Storage(#[from] brew_store::Error),
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::GenerationFailed { message: err.to_string() }
	}
}
