//! Program-derived addresses of the settlement program.
//!
//! Seeds mirror the program's account constraints byte for byte. Every
//! function takes the program id explicitly; pass [`crate::ID`] for the
//! deployed program.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::bpf_loader_upgradeable;

use crate::codec::TradeId;

pub const VAULT_SEED: &[u8] = b"vault";
pub const PROTOCOL_SEED: &[u8] = b"protocol";
pub const CONFIG_SEED: &[u8] = b"config";
pub const WHITELIST_SEED: &[u8] = b"whitelist";
pub const NONCE_CHECK_SEED: &[u8] = b"nonce";
pub const FEE_RECEIVER_SEED: &[u8] = b"fee_receiver";
pub const PAYMENT_RECEIPT_SEED: &[u8] = b"payment_receipt";

/// Global vault.
pub fn vault_pda(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[VAULT_SEED], program_id).0
}

/// Vault holding the deposit of one trade.
pub fn trade_vault_pda(program_id: &Pubkey, trade_id: &TradeId) -> Pubkey {
    Pubkey::find_program_address(&[VAULT_SEED, trade_id.as_ref()], program_id).0
}

/// The canonical on-chain record of a trade. Seeded by the trade id alone.
pub fn user_trade_detail_pda(program_id: &Pubkey, trade_id: &TradeId) -> Pubkey {
    Pubkey::find_program_address(&[trade_id.as_ref()], program_id).0
}

/// Protocol treasury, receives the total fee on settlement.
pub fn protocol_pda(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[PROTOCOL_SEED], program_id).0
}

pub fn config_pda(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id).0
}

pub fn whitelist_pda(program_id: &Pubkey, token: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[WHITELIST_SEED, token.as_ref()], program_id).0
}

/// Guard that exists while a nonce account is bound to an open trade.
pub fn nonce_check_pda(program_id: &Pubkey, nonce_account: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[NONCE_CHECK_SEED, nonce_account.as_ref()], program_id).0
}

pub fn fee_receiver_pda(program_id: &Pubkey, fee_receiver: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[FEE_RECEIVER_SEED, fee_receiver.as_ref()], program_id).0
}

/// Program data account of an upgradeable program.
pub fn program_data_address(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[program_id.as_ref()], &bpf_loader_upgradeable::id()).0
}

/// Inputs of a payment receipt address.
///
/// All of them are folded in so that several payments for the same trade
/// land on distinct receipts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceiptSeeds {
    pub trade_id: TradeId,
    /// Payer; signs the payment instruction.
    pub from_user: Pubkey,
    pub to_user: Pubkey,
    /// Payment amount with decimals, fee included.
    pub amount: u64,
    pub protocol_fee: u64,
    /// `None` for SOL payments.
    pub token: Option<Pubkey>,
}

pub fn payment_receipt_pda(program_id: &Pubkey, seeds: &PaymentReceiptSeeds) -> Pubkey {
    let amount = seeds.amount.to_le_bytes();
    let protocol_fee = seeds.protocol_fee.to_le_bytes();
    let token = seeds.token.unwrap_or_default();
    Pubkey::find_program_address(
        &[
            PAYMENT_RECEIPT_SEED,
            seeds.trade_id.as_ref(),
            seeds.from_user.as_ref(),
            seeds.to_user.as_ref(),
            &amount,
            &protocol_fee,
            token.as_ref(),
        ],
        program_id,
    )
    .0
}
