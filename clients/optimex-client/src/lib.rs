#![doc = include_str!("../README.md")]
#![allow(unexpected_cfgs)]

pub mod error;

pub mod address;
pub mod codec;
pub mod config;
pub mod ephemeral;
pub mod ledger;
pub mod message;
pub mod pda;
pub mod settlement;
pub mod state;
pub mod trade;
pub mod verify;

use anchor_lang::prelude::*;

declare_id!("E2pt2s1vZjgf1eBzWhe69qDWawdFKD2u4FbLEFijSMJP");

pub use alloy_primitives::U256;

pub use address::{encode_address, ChainToken, NATIVE_TOKEN};
pub use codec::{decode_uint256_bytes, encode_decimal_uint256, encode_uint256, TradeId};
pub use config::ClientConfig;
pub use ephemeral::{create_ephemeral_nonce_account_instructions, derive_ephemeral_keypair};
pub use error::{ClientError, InvalidPresignString, PresignRejection};
pub use ledger::{
    fetch_config, fetch_fee_receiver, fetch_payment_receipt, fetch_trade_detail, fetch_whitelist_token,
    LedgerReader,
};
pub use settlement::{
    create_settlement_instructions, create_settlement_transaction,
    create_settlement_transaction_and_serialize_to_string,
    create_user_presign_settlement_transaction,
    create_user_presign_settlement_transaction_and_serialize_to_string, serialize_presign,
    SettlementParams, UserPresignParams,
};
pub use state::{Config, FeeReceiver, PaymentReceipt, TradeAsset, TradeDetail, TradeStatus, WhitelistToken};
pub use trade::{derive_trade_id, get_trade_input, TradeInfo, TradeInput, TradeInputParams};
pub use verify::{verify_presign_settlement, verify_transaction_signatures, PresignVerdict};
