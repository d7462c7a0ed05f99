use serde_json::{Map, Value};
use thiserror::Error;

/// Structured context attached to an error: field name to expected/actual value.
pub type Metadata = Map<String, Value>;

/// Builds a [`Metadata`] bag from `key => value` pairs.
macro_rules! metadata {
    () => { $crate::error::Metadata::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::error::Metadata::new();
        $( map.insert(($key).to_string(), ::serde_json::json!($value)); )+
        map
    }};
}
pub(crate) use metadata;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The caller supplied structurally invalid input.
    #[error("{message} with information: {}", Value::Object(.metadata.clone()))]
    InvalidParam { message: String, metadata: Metadata },

    /// The network tag of a token is not one the address encoder knows.
    #[error("Unsupported network: {network_type}")]
    UnsupportedNetwork { network_type: String },

    /// A required on-chain account could not be read or decoded.
    #[error("Cannot fetch account: {address} with information {}", Value::Object(.metadata.clone()))]
    FetchAccount { address: String, metadata: Metadata },

    #[error(transparent)]
    InvalidPresignString(#[from] InvalidPresignString),

    #[error("rpc request failed: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    #[error("signing failed: {0}")]
    Signer(#[from] solana_sdk::signer::SignerError),
}

impl ClientError {
    pub fn invalid_param(message: impl Into<String>, metadata: Metadata) -> Self {
        ClientError::InvalidParam {
            message: message.into(),
            metadata,
        }
    }

    pub fn fetch_account(address: impl ToString, metadata: Metadata) -> Self {
        ClientError::FetchAccount {
            address: address.to_string(),
            metadata,
        }
    }

    /// `UnsupportedNetwork` is a configuration-level `InvalidParam`.
    pub fn is_invalid_param(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidParam { .. } | ClientError::UnsupportedNetwork { .. }
        )
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Why a presigned settlement transaction was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignRejection {
    InvalidFormat,
    InvalidSignatures,
    InvalidSignatureCount,
    InvalidMpcPubkey,
    MpcAlreadySigned,
    InvalidEphemeralSignature,
}

impl PresignRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            PresignRejection::InvalidFormat => "Invalid presign string format",
            PresignRejection::InvalidSignatures => "Invalid verify signatures",
            PresignRejection::InvalidSignatureCount => "Invalid number of signatures",
            PresignRejection::InvalidMpcPubkey => "Invalid MPC pubkey",
            PresignRejection::MpcAlreadySigned => "MPC's presign signature is not null",
            PresignRejection::InvalidEphemeralSignature => "Invalid ephemeral settlement signatures",
        }
    }
}

/// A failed presign verification with the expected/actual values that caused it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} with information: {}", .kind.reason(), Value::Object(.metadata.clone()))]
pub struct InvalidPresignString {
    pub kind: PresignRejection,
    pub metadata: Metadata,
}

impl InvalidPresignString {
    pub fn new(kind: PresignRejection, metadata: Metadata) -> Self {
        Self { kind, metadata }
    }

    pub fn reason(&self) -> &'static str {
        self.kind.reason()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_metadata() {
        let err = ClientError::fetch_account("Trade111", metadata! { "type" => "TradeDetail" });
        assert_eq!(
            err.to_string(),
            r#"Cannot fetch account: Trade111 with information {"type":"TradeDetail"}"#
        );

        let rejection = InvalidPresignString::new(
            PresignRejection::InvalidSignatureCount,
            metadata! { "expected" => 2, "actual" => 1 },
        );
        assert_eq!(
            rejection.to_string(),
            r#"Invalid number of signatures with information: {"actual":1,"expected":2}"#
        );
    }

    #[test]
    fn test_unsupported_network_is_invalid_param() {
        let err = ClientError::UnsupportedNetwork {
            network_type: "COSMOS".to_string(),
        };
        assert!(err.is_invalid_param());
        assert_eq!(err.to_string(), "Unsupported network: COSMOS");
    }
}
