//! Error types for the Signet vault toolkit

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SignetError>;

/// All errors the vault core can produce
#[derive(Error, Debug)]
pub enum SignetError {
	/// Malformed or wrong-length address input
	#[error("Invalid address: {0}")]
	InvalidAddress(String),

	/// Bytes that do not decode against the chain's call table.
	/// The raw hex is kept so the user can retry or share it.
	#[error("Could not decode calldata {hex}: {reason}")]
	InvalidCalldata { hex: String, reason: String },

	/// A decodable proxy call that targets another proxied account
	#[error("Call does not belong to this vault: {0}")]
	NotOurs(String),

	/// More than one classifier claimed the same call
	#[error("Ambiguous classification of {call}: matched {matches:?}")]
	AmbiguousClassification { call: String, matches: Vec<&'static str> },

	/// The wallet or chain rejected a submission
	#[error("Submission failed: {0}")]
	SubmissionFailure(String),

	/// The user dismissed the signing prompt
	#[error("Signing cancelled by user")]
	SigningCancelled,

	/// The cached multisig/proxy relationship no longer matches the chain
	#[error("Configuration drift detected: {0}")]
	ConfigDriftDetected(String),

	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),

	#[error("Network error: {0}")]
	NetworkError(String),

	#[error("Backend error: {0}")]
	Backend(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	Serialization(String),

	#[error("{0}")]
	Generic(String),
}

impl SignetError {
	/// Build an `InvalidCalldata` error for the given input bytes
	pub fn invalid_calldata(bytes: &[u8], reason: impl Into<String>) -> Self {
		SignetError::InvalidCalldata {
			hex: format!("0x{}", hex::encode(bytes)),
			reason: reason.into(),
		}
	}

	/// True for the "user cancelled the signing prompt" sentinel
	pub fn is_user_cancellation(&self) -> bool {
		matches!(self, SignetError::SigningCancelled)
	}

	/// Message to show the user, or `None` when nothing should be shown
	pub fn user_message(&self) -> Option<String> {
		match self {
			SignetError::SigningCancelled => None,
			SignetError::InvalidCalldata { hex, .. } =>
				Some(format!("Could not decode calldata: {hex}")),
			other => Some(other.to_string()),
		}
	}
}

impl From<serde_json::Error> for SignetError {
	fn from(e: serde_json::Error) -> Self {
		SignetError::Serialization(e.to_string())
	}
}

impl From<toml::de::Error> for SignetError {
	fn from(e: toml::de::Error) -> Self {
		SignetError::InvalidConfig(e.to_string())
	}
}
