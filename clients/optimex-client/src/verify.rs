//! Verification of a presigned settlement before the MPC co-signs it.
//!
//! The presign is never trusted as given: the expected transaction is rebuilt
//! from the trade record and the ephemeral signature must verify over it.

use anchor_lang::prelude::Pubkey;
use bincode::Options;
use serde_json::Value;
use solana_sdk::sanitize::Sanitize;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::codec::TradeId;
use crate::error::{metadata, InvalidPresignString, PresignRejection, Result};
use crate::ledger::{fetch_trade_detail, LedgerReader};
use crate::settlement::{settlement_transaction, SettlementParams};

/// Outcome of [`verify_presign_settlement`].
#[derive(Debug, Clone, PartialEq)]
pub enum PresignVerdict {
    Verified,
    Rejected(InvalidPresignString),
}

impl PresignVerdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, PresignVerdict::Verified)
    }

    pub fn error(&self) -> Option<&InvalidPresignString> {
        match self {
            PresignVerdict::Verified => None,
            PresignVerdict::Rejected(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            PresignVerdict::Verified => Ok(()),
            PresignVerdict::Rejected(err) => Err(err.into()),
        }
    }
}

fn reject(kind: PresignRejection, metadata: crate::error::Metadata) -> Result<PresignVerdict> {
    let err = InvalidPresignString::new(kind, metadata);
    tracing::warn!(reason = err.reason(), "presign rejected: {err}");
    Ok(PresignVerdict::Rejected(err))
}

/// True when every present signature verifies over the message. Empty slots
/// are skipped.
pub fn verify_transaction_signatures(transaction: &Transaction) -> bool {
    let message = transaction.message_data();
    transaction
        .signatures
        .iter()
        .zip(transaction.message.account_keys.iter())
        .filter(|(signature, _)| **signature != Signature::default())
        .all(|(signature, pubkey)| signature.verify(pubkey.as_ref(), &message))
}

fn decode_presign(presign: &str) -> Option<Transaction> {
    let bytes = hex::decode(presign).ok()?;
    // Same wire format as `bincode::serialize`, minus the tolerance for padding.
    let transaction: Transaction = bincode::options()
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .deserialize(&bytes)
        .ok()?;
    transaction.sanitize().ok()?;
    Some(transaction)
}

fn signature_value(signature: &Signature) -> Value {
    if *signature == Signature::default() {
        Value::Null
    } else {
        Value::String(hex::encode(signature.as_ref()))
    }
}

/// Checks a presign against the on-chain record of `trade_id`.
///
/// `Err` means the ledger could not be read; every verification failure is a
/// [`PresignVerdict::Rejected`].
pub fn verify_presign_settlement(
    ledger: &impl LedgerReader,
    program_id: &Pubkey,
    trade_id: &TradeId,
    pmm_pubkey: &Pubkey,
    presign: &str,
) -> Result<PresignVerdict> {
    let trade_detail = fetch_trade_detail(ledger, program_id, trade_id)?;

    let Some(transaction) = decode_presign(presign) else {
        return reject(PresignRejection::InvalidFormat, metadata! { "presign" => presign });
    };

    if !verify_transaction_signatures(&transaction) {
        return reject(PresignRejection::InvalidSignatures, metadata! {});
    }

    let signatures = &transaction.signatures;
    let keys = &transaction.message.account_keys;
    if signatures.len() != 2 {
        return reject(
            PresignRejection::InvalidSignatureCount,
            metadata! { "expected" => 2, "actual" => signatures.len() },
        );
    }

    // fee payer first
    if keys[0] != trade_detail.mpc_pubkey {
        return reject(
            PresignRejection::InvalidMpcPubkey,
            metadata! {
                "expected" => trade_detail.mpc_pubkey.to_string(),
                "actual" => keys[0].to_string(),
            },
        );
    }
    if signatures[0] != Signature::default() {
        return reject(
            PresignRejection::MpcAlreadySigned,
            metadata! { "expected" => Value::Null, "actual" => hex::encode(signatures[0].as_ref()) },
        );
    }

    let params = SettlementParams {
        trade_id: *trade_id,
        mpc_pubkey: trade_detail.mpc_pubkey,
        user_ephemeral_pubkey: trade_detail.user_ephemeral_pubkey,
        pmm_pubkey: *pmm_pubkey,
    };
    let nonce_value = ledger.fetch_nonce_value(&trade_detail.user_ephemeral_pubkey)?;
    let rebuilt = settlement_transaction(program_id, &params, &trade_detail, nonce_value);
    tracing::debug!(%trade_id, nonce = %nonce_value, "rebuilt settlement for presign check");

    let ephemeral_signature = &signatures[1];
    if !ephemeral_signature.verify(trade_detail.user_ephemeral_pubkey.as_ref(), &rebuilt.message_data()) {
        return reject(
            PresignRejection::InvalidEphemeralSignature,
            metadata! {
                "ephemeralPresign" => keys[1].to_string(),
                "ephemeralActual" => trade_detail.user_ephemeral_pubkey.to_string(),
                "signature" => signature_value(ephemeral_signature),
            },
        );
    }

    tracing::info!(%trade_id, pmm = %pmm_pubkey, "presign verified");
    Ok(PresignVerdict::Verified)
}
