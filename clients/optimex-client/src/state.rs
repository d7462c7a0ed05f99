//! Client-side mirrors of the program's accounts.
//!
//! Layouts must match the program exactly: the 8-byte Anchor discriminator
//! followed by the Borsh encoding of the fields below.

use anchor_lang::prelude::*;

/// Per-trade record written by `deposit`.
///
/// Seeds: `[trade_id]`
#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TradeDetail {
    pub trade_id: [u8; 32],
    /// Depositor; receives the nonce guard rent on settlement.
    pub user_pubkey: Pubkey,
    /// `None` when the trade is denominated in SOL.
    pub token: Option<Pubkey>,
    pub amount: u64,
    /// Unix timestamp after which the trade can only be claimed back.
    pub timeout: i64,
    /// Coordinator authorized to settle the trade.
    pub mpc_pubkey: Pubkey,
    /// Ephemeral key of the trade; also the address of its durable nonce account.
    pub user_ephemeral_pubkey: Pubkey,
    pub refund_pubkey: Pubkey,
    pub total_fee: Option<u64>,
    pub status: TradeStatus,
    pub settled_pmm: Pubkey,
    pub _reserve: [u128; 8],
}

impl TradeDetail {
    /// Which settlement layout this trade needs.
    pub fn asset(&self) -> TradeAsset {
        match self.token {
            Some(mint) => TradeAsset::Token { mint },
            None => TradeAsset::Native,
        }
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TradeStatus {
    #[default]
    Deposited,
    Settled,
    Claimed,
}

/// Denomination of a trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TradeAsset {
    Native,
    Token { mint: Pubkey },
}

/// Receipt of a PMM payment made through the program.
///
/// Seeds: see [`crate::pda::payment_receipt_pda`]
#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub trade_id: [u8; 32],
    pub from_pubkey: Pubkey,
    pub to_pubkey: Pubkey,
    /// `None` when the payment was made in SOL.
    pub token: Option<Pubkey>,
    /// Fee included.
    pub payment_amount: u64,
    pub total_fee: u64,
    pub payment_time: u64,
    pub _reserve: [u128; 8],
}

/// Program-wide settings.
///
/// Seeds: `["config"]`
#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub _reserve: [u128; 7],
    pub admin: Pubkey,
    /// Seconds a trade stays open before it can be claimed back.
    pub close_trade_duration: u64,
    pub close_payment_duration: u64,
    /// At most [`Config::MAX_OPERATORS`].
    pub operators: Vec<Pubkey>,
}

impl Config {
    pub const MAX_OPERATORS: usize = 3;

    pub fn is_operator(&self, key: &Pubkey) -> bool {
        self.operators.contains(key)
    }
}

/// A token the program accepts, with its minimum trade amount.
///
/// Seeds: `["whitelist", token]`
#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WhitelistToken {
    pub token: Pubkey,
    pub amount: u64,
    pub _reserve: [u128; 4],
}

/// Seeds: `["fee_receiver", receiver]`
#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FeeReceiver {
    pub receiver: Pubkey,
    pub _reserve: [u128; 4],
}
