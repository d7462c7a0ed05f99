//! Read-only access to the ledger.
//!
//! Everything that needs on-chain state takes a `&impl LedgerReader` instead of
//! holding a connection, so callers own the connection, its commitment and any
//! retry policy.

use anchor_lang::prelude::*;
use solana_client::nonce_utils;
use solana_client::rpc_client::RpcClient;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;

use crate::codec::TradeId;
use crate::error::{metadata, ClientError, Result};
use crate::pda::{config_pda, fee_receiver_pda, user_trade_detail_pda, whitelist_pda};
use crate::state::{Config, FeeReceiver, PaymentReceipt, TradeDetail, WhitelistToken};

pub trait LedgerReader {
    /// `Ok(None)` when the account does not exist.
    fn get_account(&self, address: &Pubkey) -> Result<Option<Account>>;

    /// Current value of a durable nonce account, used as `recent_blockhash`.
    fn fetch_nonce_value(&self, nonce_pubkey: &Pubkey) -> Result<Hash> {
        let account = self.get_account(nonce_pubkey)?.ok_or_else(|| {
            ClientError::fetch_account(nonce_pubkey, metadata! { "type" => "NonceAccount" })
        })?;
        let data = nonce_utils::data_from_account(&account).map_err(|err| {
            ClientError::fetch_account(
                nonce_pubkey,
                metadata! { "type" => "NonceAccount", "reason" => err.to_string() },
            )
        })?;
        Ok(data.blockhash())
    }
}

impl<T: LedgerReader + ?Sized> LedgerReader for &T {
    fn get_account(&self, address: &Pubkey) -> Result<Option<Account>> {
        (**self).get_account(address)
    }
}

impl LedgerReader for RpcClient {
    fn get_account(&self, address: &Pubkey) -> Result<Option<Account>> {
        Ok(self
            .get_account_with_commitment(address, self.commitment())?
            .value)
    }
}

/// Reads an Anchor account owned by `program_id`, checking owner and discriminator.
pub fn fetch_program_account<T: AccountDeserialize>(
    ledger: &impl LedgerReader,
    program_id: &Pubkey,
    address: &Pubkey,
    metadata: crate::error::Metadata,
) -> Result<T> {
    let account = ledger
        .get_account(address)?
        .ok_or_else(|| ClientError::fetch_account(address, metadata.clone()))?;
    if account.owner != *program_id {
        let mut metadata = metadata;
        metadata.insert("owner".to_string(), account.owner.to_string().into());
        return Err(ClientError::fetch_account(address, metadata));
    }
    T::try_deserialize(&mut account.data.as_slice())
        .map_err(|_| ClientError::fetch_account(address, metadata))
}

pub fn fetch_trade_detail(
    ledger: &impl LedgerReader,
    program_id: &Pubkey,
    trade_id: &TradeId,
) -> Result<TradeDetail> {
    let address = user_trade_detail_pda(program_id, trade_id);
    fetch_program_account(
        ledger,
        program_id,
        &address,
        metadata! { "type" => "TradeDetail", "tradeId" => trade_id.to_string() },
    )
}

pub fn fetch_payment_receipt(
    ledger: &impl LedgerReader,
    program_id: &Pubkey,
    payment_receipt: &Pubkey,
) -> Result<PaymentReceipt> {
    fetch_program_account(
        ledger,
        program_id,
        payment_receipt,
        metadata! { "type" => "PaymentReceipt" },
    )
}

pub fn fetch_config(ledger: &impl LedgerReader, program_id: &Pubkey) -> Result<Config> {
    fetch_program_account(
        ledger,
        program_id,
        &config_pda(program_id),
        metadata! { "type" => "Config" },
    )
}

/// Whitelist entry of `token`; missing means the token is not accepted.
pub fn fetch_whitelist_token(
    ledger: &impl LedgerReader,
    program_id: &Pubkey,
    token: &Pubkey,
) -> Result<WhitelistToken> {
    fetch_program_account(
        ledger,
        program_id,
        &whitelist_pda(program_id, token),
        metadata! { "type" => "WhitelistToken", "token" => token.to_string() },
    )
}

pub fn fetch_fee_receiver(
    ledger: &impl LedgerReader,
    program_id: &Pubkey,
    fee_receiver: &Pubkey,
) -> Result<FeeReceiver> {
    fetch_program_account(
        ledger,
        program_id,
        &fee_receiver_pda(program_id, fee_receiver),
        metadata! { "type" => "FeeReceiver", "feeReceiver" => fee_receiver.to_string() },
    )
}
