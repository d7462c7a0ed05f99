use anchor_lang::prelude::Pubkey;
use solana_sdk::instruction::Instruction;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::keypair::keypair_from_seed;
use solana_sdk::system_instruction;

use crate::error::{metadata, ClientError, Result};

/// Hex characters of the seed carved out of the user's signature.
pub const EPHEMERAL_SEED_HEX_LEN: usize = 64;

/// Size of a system-program nonce account.
pub const NONCE_ACCOUNT_LENGTH: usize = 80;

/// Derives the per-trade ephemeral keypair from an off-chain signature.
///
/// The last 32 bytes of the signature are the ed25519 seed, so the same
/// signature always regenerates the same signer.
pub fn derive_ephemeral_keypair(signature_hex: &str) -> Result<Keypair> {
    let digits = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
    if digits.len() < EPHEMERAL_SEED_HEX_LEN {
        return Err(ClientError::invalid_param(
            "Insufficient length for seed",
            metadata! { "minLength" => EPHEMERAL_SEED_HEX_LEN.to_string() },
        ));
    }
    let tail = digits
        .get(digits.len() - EPHEMERAL_SEED_HEX_LEN..)
        .ok_or_else(|| ClientError::invalid_param("Seed is not hex", metadata! {}))?;
    let mut seed = [0u8; 32];
    hex::decode_to_slice(tail, &mut seed)
        .map_err(|_| ClientError::invalid_param("Seed is not hex", metadata! { "seed" => tail }))?;

    keypair_from_seed(&seed).map_err(|err| {
        ClientError::invalid_param(
            "Cannot derive keypair from seed",
            metadata! { "reason" => err.to_string() },
        )
    })
}

/// Creates the ephemeral durable nonce account and hands its authority to the MPC.
///
/// `user` funds the rent (`lamports`); both `user` and `ephemeral` must sign.
pub fn create_ephemeral_nonce_account_instructions(
    user: &Pubkey,
    ephemeral: &Pubkey,
    authority: &Pubkey,
    lamports: u64,
) -> Vec<Instruction> {
    system_instruction::create_nonce_account(user, ephemeral, authority, lamports)
}
