//! Trade identity: the chain triples, the ABI preimage and the SHA-256 id the
//! program recomputes at deposit time.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol_data, SolType};
use anchor_lang::prelude::*;
use sha2::{Digest, Sha256};

use crate::address::{encode_address, ChainToken};
use crate::codec::{encode_decimal_uint256, encode_uint256, TradeId};
use crate::error::{metadata, ClientError, Result};

/// `(uint256 sessionId, address solver, (uint256 amountIn, bytes[3] fromChain, bytes[3] toChain))`
type TradeIdPreimage = (
    sol_data::Uint<256>,
    sol_data::Address,
    (
        sol_data::Uint<256>,
        sol_data::FixedArray<sol_data::Bytes, 3>,
        sol_data::FixedArray<sol_data::Bytes, 3>,
    ),
);

/// Origin and destination of a trade.
#[derive(Debug, Clone, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct TradeInfo {
    /// uint256, big-endian.
    pub amount_in: [u8; 32],
    /// `[user address, network id, token address]` on the origin chain.
    pub from_chain: [Vec<u8>; 3],
    /// `[user address, network id, token address]` on the destination chain.
    pub to_chain: [Vec<u8>; 3],
}

/// Deposit argument of the program. Its fields are the trade id preimage.
#[derive(Debug, Clone, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct TradeInput {
    pub session_id: [u8; 32],
    pub solver: [u8; 20],
    pub trade_info: TradeInfo,
}

impl TradeInput {
    pub fn trade_id(&self) -> TradeId {
        derive_trade_id(
            U256::from_be_bytes(self.session_id),
            self.solver,
            &self.trade_info,
        )
    }
}

/// Amount scaled by the asset decimals, as `bytes32`.
pub fn derive_amount_bytes(amount: U256) -> [u8; 32] {
    encode_uint256(amount)
}

/// ABI-encodes `(session_id, solver, trade_info)` exactly as the EVM-side
/// contracts and the Solana program do.
pub fn encode_trade_id_preimage(session_id: U256, solver: [u8; 20], trade_info: &TradeInfo) -> Vec<u8> {
    let chain = |triple: &[Vec<u8>; 3]| -> [Bytes; 3] {
        [
            Bytes::copy_from_slice(&triple[0]),
            Bytes::copy_from_slice(&triple[1]),
            Bytes::copy_from_slice(&triple[2]),
        ]
    };
    TradeIdPreimage::abi_encode_params(&(
        session_id,
        Address::from(solver),
        (
            U256::from_be_bytes(trade_info.amount_in),
            chain(&trade_info.from_chain),
            chain(&trade_info.to_chain),
        ),
    ))
}

pub fn derive_trade_id(session_id: U256, solver: [u8; 20], trade_info: &TradeInfo) -> TradeId {
    let encoded = encode_trade_id_preimage(session_id, solver, trade_info);
    let digest: [u8; 32] = Sha256::digest(&encoded).into();
    TradeId::new(digest)
}

/// Parses a 20-byte solver address, with or without `0x`.
pub fn parse_solver_address(solver: &str) -> Result<[u8; 20]> {
    let digits = solver.strip_prefix("0x").unwrap_or(solver);
    let mut out = [0u8; 20];
    hex::decode_to_slice(digits, &mut out).map_err(|_| {
        ClientError::invalid_param(
            "Invalid solver address",
            metadata! { "solver" => solver, "length" => 20 },
        )
    })?;
    Ok(out)
}

/// Everything needed to describe a deposit before it is sent.
#[derive(Debug, Clone)]
pub struct TradeInputParams<'a> {
    pub from_token: &'a ChainToken,
    pub to_token: &'a ChainToken,
    pub user_pubkey: &'a Pubkey,
    /// Recipient on the destination chain, in that chain's notation.
    pub to_user_address: &'a str,
    pub solver: &'a str,
    /// Base-10 amount, already scaled by the token decimals.
    pub amount: &'a str,
    pub session_id: U256,
}

#[derive(Debug, Clone)]
pub struct TradeInputBundle {
    pub trade_input: TradeInput,
    pub trade_id: TradeId,
    pub is_native_token: bool,
}

/// Builds the chain triples, the deposit [`TradeInput`] and its id.
pub fn get_trade_input(params: &TradeInputParams<'_>) -> Result<TradeInputBundle> {
    let from_chain = [
        encode_address(&params.user_pubkey.to_string(), params.from_token)?,
        params.from_token.network_id.as_bytes().to_vec(),
        params.from_token.token_address.as_bytes().to_vec(),
    ];
    let to_chain = [
        encode_address(params.to_user_address, params.to_token)?,
        params.to_token.network_id.as_bytes().to_vec(),
        params.to_token.token_address.as_bytes().to_vec(),
    ];

    let trade_input = TradeInput {
        session_id: encode_uint256(params.session_id),
        solver: parse_solver_address(params.solver)?,
        trade_info: TradeInfo {
            amount_in: encode_decimal_uint256(params.amount)?,
            from_chain,
            to_chain,
        },
    };
    let trade_id = trade_input.trade_id();
    tracing::debug!(%trade_id, session_id = %params.session_id, "derived trade id");

    Ok(TradeInputBundle {
        trade_input,
        trade_id,
        is_native_token: params.from_token.is_native(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::str::FromStr;

    pub(crate) fn conformance_info(amount: u64) -> TradeInfo {
        TradeInfo {
            amount_in: derive_amount_bytes(U256::from(amount)),
            from_chain: [
                b"3DYbLvuRV6tZN7iEBxAgHbpgv3AvWmAJGtWmrkp24Vew".to_vec(),
                b"solana-devnet".to_vec(),
                b"native".to_vec(),
            ],
            to_chain: [
                hex::decode("5B38Da6a701c568545dCfcB03FcB875f56beddC4").unwrap(),
                b"ethereum-sepolia".to_vec(),
                b"0x7b79995e5f793a07bc00c21412e50ecae098e7f9".to_vec(),
            ],
        }
    }

    #[test]
    fn test_conformance_vector() {
        let info = conformance_info(100_000);
        assert_eq!(&info.amount_in[29..], &[1, 134, 160]);

        let preimage = encode_trade_id_preimage(U256::from(1u8), [0u8; 20], &info);
        assert_eq!(preimage.len(), 832);
        // head: session, solver, offset of the trade info tuple
        assert_eq!(preimage[31], 1);
        assert_eq!(&preimage[32..64], &[0u8; 32]);
        assert_eq!(preimage[95], 96);

        let trade_id = derive_trade_id(U256::from(1u8), [0u8; 20], &info);
        assert_eq!(
            trade_id.to_string(),
            "0xa865fbb8eab3fa51fb9f25c1ba735c3156f4f827e651bd562fc2ef42dd718be5"
        );
    }

    #[test]
    fn test_trade_id_is_deterministic_and_input_sensitive() {
        let info = conformance_info(100_000);
        let base = derive_trade_id(U256::from(1u8), [0u8; 20], &info);
        assert_eq!(base, derive_trade_id(U256::from(1u8), [0u8; 20], &info));

        let adjacent = conformance_info(100_001);
        assert_eq!(
            derive_trade_id(U256::from(1u8), [0u8; 20], &adjacent).to_string(),
            "0xc8a867c4a7a41eae71a5f887f403c5271c0a436d11c362ac1a30a748fa885609"
        );

        let swapped = TradeInfo {
            amount_in: info.amount_in,
            from_chain: info.to_chain.clone(),
            to_chain: info.from_chain.clone(),
        };
        let mut solver = [0u8; 20];
        solver[19] = 1;

        let variants = [
            derive_trade_id(U256::from(0u8), [0u8; 20], &info),
            derive_trade_id(U256::from(2u8), [0u8; 20], &info),
            derive_trade_id(U256::from(1u8), solver, &info),
            derive_trade_id(U256::from(1u8), [0u8; 20], &adjacent),
            derive_trade_id(U256::from(1u8), [0u8; 20], &swapped),
        ];
        for (i, variant) in variants.iter().enumerate() {
            assert_ne!(*variant, base, "variant {i} collided with the base id");
            for other in &variants[i + 1..] {
                assert_ne!(variant, other);
            }
        }
    }

    #[test]
    fn test_get_trade_input() {
        let from_token = ChainToken {
            token_id: "SOL".to_string(),
            network_id: "solana-devnet".to_string(),
            network_type: Some("SOLANA".to_string()),
            token_address: "native".to_string(),
        };
        let to_token = ChainToken {
            token_id: "WETH".to_string(),
            network_id: "ethereum-sepolia".to_string(),
            network_type: Some("EVM".to_string()),
            token_address: "0x7b79995e5f793a07bc00c21412e50ecae098e7f9".to_string(),
        };
        let user = Pubkey::from_str("3DYbLvuRV6tZN7iEBxAgHbpgv3AvWmAJGtWmrkp24Vew").unwrap();

        let bundle = get_trade_input(&TradeInputParams {
            from_token: &from_token,
            to_token: &to_token,
            user_pubkey: &user,
            to_user_address: "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4",
            solver: "0x0000000000000000000000000000000000000000",
            amount: "100000",
            session_id: U256::from(1u8),
        })
        .unwrap();

        assert!(bundle.is_native_token);
        assert_eq!(bundle.trade_input.trade_info, conformance_info(100_000));
        assert_eq!(
            bundle.trade_id.to_string(),
            "0xa865fbb8eab3fa51fb9f25c1ba735c3156f4f827e651bd562fc2ef42dd718be5"
        );
        assert_eq!(bundle.trade_input.session_id[31], 1);
    }

    #[test]
    fn test_solver_address_validation() {
        assert_eq!(parse_solver_address("0x0000000000000000000000000000000000000001").unwrap()[19], 1);
        assert!(parse_solver_address("0x01").is_err());
        assert!(parse_solver_address("0xzz00000000000000000000000000000000000000").is_err());
    }
}
