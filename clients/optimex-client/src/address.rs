use serde::{Deserialize, Serialize};

use crate::error::{metadata, ClientError, Result};

/// Token address used by every chain for its base asset.
pub const NATIVE_TOKEN: &str = "native";

/// Token descriptor as served by the coordinator's token registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainToken {
    pub token_id: String,
    /// e.g. `solana-devnet`, `ethereum-sepolia`, `bitcoin-testnet`.
    pub network_id: String,
    #[serde(default)]
    pub network_type: Option<String>,
    /// Mint / contract address, or [`NATIVE_TOKEN`].
    pub token_address: String,
}

impl ChainToken {
    pub fn is_native(&self) -> bool {
        self.token_address == NATIVE_TOKEN
    }

    fn network_label(&self) -> String {
        self.network_type
            .clone()
            .unwrap_or_else(|| self.network_id.clone())
    }
}

/// Encodes a user address into the bytes the remote chain's verifier hashes.
///
/// Solana and Bitcoin addresses are text (base58 / bech32) and are taken as
/// UTF-8. Ethereum addresses are hex and are decoded to their raw bytes.
pub fn encode_address(address: &str, token: &ChainToken) -> Result<Vec<u8>> {
    let network_id = token.network_id.to_uppercase();
    if network_id.contains("SOLANA") || network_id.contains("BITCOIN") {
        Ok(address.as_bytes().to_vec())
    } else if network_id.contains("ETHEREUM") {
        let digits = address.strip_prefix("0x").unwrap_or(address);
        hex::decode(digits).map_err(|_| {
            ClientError::invalid_param(
                "Invalid hex address",
                metadata! { "address" => address, "networkId" => token.network_id },
            )
        })
    } else {
        Err(ClientError::UnsupportedNetwork {
            network_type: token.network_label(),
        })
    }
}
