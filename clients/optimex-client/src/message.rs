//! Legacy message compilation with the account order of `@solana/web3.js`.
//!
//! Users presign from the TypeScript SDK, whose `Transaction.compileMessage`
//! orders accounts differently from [`Message::new_with_blockhash`]. The MPC
//! rebuilds the expected transaction and compares signatures over its bytes,
//! so both sides must compile the same key order:
//!
//! 1. instruction accounts in order, then each program id once (readonly);
//! 2. stable sort: signers first, writable first, then base58 text;
//! 3. duplicates merged into their first position;
//! 4. fee payer moved to the front as a writable signer.

use std::cmp::Ordering;

use anchor_lang::prelude::{AccountMeta, Pubkey};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{CompiledInstruction, Instruction};
use solana_sdk::message::{Message, MessageHeader};

/// Orders base58 strings the way `String.prototype.localeCompare` does under
/// the default collation: digits before letters, letters case-insensitive,
/// and lowercase before uppercase when nothing else differs.
pub fn compare_base58(a: &str, b: &str) -> Ordering {
    let primary = |c: u8| {
        if c.is_ascii_digit() {
            (0, c)
        } else {
            (1, c.to_ascii_lowercase())
        }
    };
    a.bytes()
        .map(primary)
        .cmp(b.bytes().map(primary))
        .then_with(|| {
            a.bytes()
                .map(|c| c.is_ascii_uppercase())
                .cmp(b.bytes().map(|c| c.is_ascii_uppercase()))
        })
}

pub fn compile_message(instructions: &[Instruction], fee_payer: &Pubkey, recent_blockhash: &Hash) -> Message {
    let mut program_ids: Vec<Pubkey> = Vec::new();
    let mut metas: Vec<(AccountMeta, String)> = Vec::new();
    for instruction in instructions {
        metas.extend(
            instruction
                .accounts
                .iter()
                .map(|meta| (meta.clone(), meta.pubkey.to_string())),
        );
        if !program_ids.contains(&instruction.program_id) {
            program_ids.push(instruction.program_id);
        }
    }
    metas.extend(
        program_ids
            .iter()
            .map(|id| (AccountMeta::new_readonly(*id, false), id.to_string())),
    );

    metas.sort_by(|(x, x58), (y, y58)| {
        y.is_signer
            .cmp(&x.is_signer)
            .then(y.is_writable.cmp(&x.is_writable))
            .then_with(|| compare_base58(x58, y58))
    });

    let mut unique: Vec<AccountMeta> = Vec::with_capacity(metas.len());
    for (meta, _) in metas {
        match unique.iter_mut().find(|u| u.pubkey == meta.pubkey) {
            Some(existing) => {
                existing.is_signer |= meta.is_signer;
                existing.is_writable |= meta.is_writable;
            }
            None => unique.push(meta),
        }
    }

    if let Some(index) = unique.iter().position(|meta| meta.pubkey == *fee_payer) {
        unique.remove(index);
    }
    unique.insert(0, AccountMeta::new(*fee_payer, true));

    let (signed, unsigned): (Vec<_>, Vec<_>) = unique.into_iter().partition(|meta| meta.is_signer);
    let header = MessageHeader {
        num_required_signatures: signed.len() as u8,
        num_readonly_signed_accounts: signed.iter().filter(|meta| !meta.is_writable).count() as u8,
        num_readonly_unsigned_accounts: unsigned.iter().filter(|meta| !meta.is_writable).count() as u8,
    };
    let account_keys: Vec<Pubkey> = signed.iter().chain(unsigned.iter()).map(|meta| meta.pubkey).collect();

    // every key referenced below was collected into account_keys
    let index_of = |key: &Pubkey| account_keys.iter().position(|k| k == key).unwrap_or_default() as u8;
    let compiled = instructions
        .iter()
        .map(|instruction| CompiledInstruction {
            program_id_index: index_of(&instruction.program_id),
            accounts: instruction.accounts.iter().map(|meta| index_of(&meta.pubkey)).collect(),
            data: instruction.data.clone(),
        })
        .collect();

    Message {
        header,
        account_keys,
        recent_blockhash: *recent_blockhash,
        instructions: compiled,
    }
}
