use qp_recovery::DraftError;

/// Errors raised by the recovery client.
///
/// Chain read failures inside the aggregators never reach callers: they are
/// logged and degraded. These variants surface from explicit operations such as
/// connecting, dispatching an action or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Chain query `{0}` failed: {1}")]
	Query(&'static str, String),
	#[error("Chain view `{0}` is not available on this runtime")]
	Unsupported(&'static str),
	#[error(transparent)]
	Rpc(#[from] jsonrpsee::core::ClientError),
	#[error(transparent)]
	Codec(#[from] codec::Error),
	#[error("Malformed hex in chain response: {0}")]
	Hex(#[from] hex::FromHexError),
	#[error("Invalid account address {0}")]
	InvalidAddress(String),
	#[error("Connecting to {url} failed: {reason}")]
	Connection { url: String, reason: String },
	#[error("Not connected to a chain endpoint")]
	NotConnected,
	#[error("`{action}` is not allowed: {reason}")]
	Precondition { action: &'static str, reason: &'static str },
	#[error("`{0}` cannot be undone and needs an explicit confirmation")]
	ConfirmationRequired(&'static str),
	#[error("Another transaction is still in flight")]
	SubmissionInFlight,
	#[error("{0}")]
	Submission(String),
	#[error("Invalid configuration: {0}")]
	Config(String),
	#[error(transparent)]
	Draft(#[from] DraftError),
}

impl Error {
	pub(crate) fn precondition(action: &'static str, reason: &'static str) -> Self {
		Self::Precondition { action, reason }
	}
}

impl From<Error> for String {
	fn from(error: Error) -> String {
		error.to_string()
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
