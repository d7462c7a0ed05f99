use std::env;
use std::str::FromStr;

use anchor_client::Cluster;
use anchor_lang::prelude::Pubkey;
use solana_client::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;

use crate::error::{metadata, ClientError, Result};

pub const CLUSTER_ENV: &str = "SOLANA_CLUSTER";
pub const COMMITMENT_ENV: &str = "SOLANA_COMMITMENT";
pub const PROGRAM_ID_ENV: &str = "OPTIMEX_PROGRAM_ID";

/// Where the settlement program lives and how its state is read.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub cluster: Cluster,
    pub commitment: CommitmentConfig,
    pub program_id: Pubkey,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            cluster: Cluster::Localnet,
            commitment: CommitmentConfig::confirmed(),
            program_id: crate::ID,
        }
    }
}

impl ClientConfig {
    /// Reads `SOLANA_CLUSTER`, `SOLANA_COMMITMENT` and `OPTIMEX_PROGRAM_ID`,
    /// after loading `.env` if there is one. Unset variables keep their default.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = ClientConfig::default();

        if let Some(cluster) = lookup(CLUSTER_ENV) {
            config.cluster = Cluster::from_str(&cluster).map_err(|err| {
                ClientError::invalid_param(
                    "Invalid cluster",
                    metadata! { CLUSTER_ENV => cluster, "reason" => err.to_string() },
                )
            })?;
        }
        if let Some(commitment) = lookup(COMMITMENT_ENV) {
            config.commitment = CommitmentConfig::from_str(&commitment).map_err(|_| {
                ClientError::invalid_param(
                    "Invalid commitment",
                    metadata! {
                        COMMITMENT_ENV => commitment,
                        "expected" => ["processed", "confirmed", "finalized"],
                    },
                )
            })?;
        }
        if let Some(program_id) = lookup(PROGRAM_ID_ENV) {
            config.program_id = Pubkey::from_str(&program_id).map_err(|_| {
                ClientError::invalid_param("Invalid program id", metadata! { PROGRAM_ID_ENV => program_id })
            })?;
        }

        tracing::debug!(
            cluster = config.cluster.url(),
            commitment = ?config.commitment.commitment,
            program_id = %config.program_id,
            "loaded client config"
        );
        Ok(config)
    }

    /// Blocking RPC client; usable directly as a [`crate::ledger::LedgerReader`].
    pub fn rpc_client(&self) -> RpcClient {
        RpcClient::new_with_commitment(self.cluster.url().to_string(), self.commitment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ClientConfig> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ClientConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.program_id, crate::ID);
        assert_eq!(config.commitment, CommitmentConfig::confirmed());
        assert_eq!(config.rpc_client().commitment(), CommitmentConfig::confirmed());
    }

    #[test]
    fn test_overrides() {
        let program_id = Pubkey::new_unique();
        let config = config(&[
            (CLUSTER_ENV, "devnet"),
            (COMMITMENT_ENV, "finalized"),
            (PROGRAM_ID_ENV, &program_id.to_string()),
        ])
        .unwrap();
        assert_eq!(config.cluster, Cluster::Devnet);
        assert_eq!(config.commitment, CommitmentConfig::finalized());
        assert_eq!(config.program_id, program_id);
    }

    #[test]
    fn test_invalid_values() {
        assert!(config(&[(COMMITMENT_ENV, "eventually")]).unwrap_err().is_invalid_param());
        assert!(config(&[(PROGRAM_ID_ENV, "not-a-key")]).unwrap_err().is_invalid_param());
        assert!(config(&[(CLUSTER_ENV, "moonnet")]).is_err());
    }
}
