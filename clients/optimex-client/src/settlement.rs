//! Settlement transactions.
//!
//! A settlement is a durable-nonce transaction: the first instruction advances
//! the ephemeral nonce account (authority: MPC), the second calls the program's
//! `settlement` instruction. The user presigns it with the ephemeral key long
//! before the MPC completes and submits it.

use anchor_lang::prelude::{borsh, AccountMeta, AnchorDeserialize, AnchorSerialize, Pubkey};
use anchor_lang::{system_program, Discriminator, InstructionData, ToAccountMetas};
use anchor_spl::associated_token::get_associated_token_address;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;

use crate::codec::TradeId;
use crate::error::{metadata, ClientError, Result};
use crate::ledger::{fetch_trade_detail, LedgerReader};
use crate::message::compile_message;
use crate::pda::{nonce_check_pda, protocol_pda, trade_vault_pda, user_trade_detail_pda};
use crate::state::{TradeAsset, TradeDetail};
use crate::verify::verify_transaction_signatures;

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct SettlementArgs {
    pub trade_id: [u8; 32],
}

/// Instruction data of `settlement`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub settlement_args: SettlementArgs,
}

impl Discriminator for Settlement {
    const DISCRIMINATOR: &'static [u8] = &[128, 21, 174, 60, 47, 86, 130, 108];
}

impl InstructionData for Settlement {}

/// Accounts of `settlement`, in the order the program declares them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementAccounts {
    pub signer: Pubkey,
    pub user_account: Pubkey,
    pub user_ephemeral_account: Pubkey,
    pub user_trade_detail: Pubkey,
    pub nonce_check_account: Pubkey,
    pub vault: Pubkey,
    pub refund_account: Pubkey,
    pub protocol: Pubkey,
    pub pmm: Pubkey,
    pub system_program: Pubkey,
}

impl ToAccountMetas for SettlementAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.signer, true),
            AccountMeta::new(self.user_account, false),
            AccountMeta::new_readonly(self.user_ephemeral_account, true),
            AccountMeta::new(self.user_trade_detail, false),
            AccountMeta::new(self.nonce_check_account, false),
            AccountMeta::new(self.vault, false),
            AccountMeta::new(self.refund_account, false),
            AccountMeta::new(self.protocol, false),
            AccountMeta::new(self.pmm, false),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }
}

/// Extra accounts appended after [`SettlementAccounts`].
///
/// The program reads them by position, so they are only built through the
/// per-asset constructors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettlementRemainingAccounts(Vec<AccountMeta>);

impl SettlementRemainingAccounts {
    pub fn native() -> Self {
        Self(Vec::new())
    }

    /// `[token program, mint, vault ATA, pmm ATA, protocol ATA]`
    pub fn token(mint: &Pubkey, trade_vault: &Pubkey, pmm: &Pubkey, protocol: &Pubkey) -> Self {
        Self(vec![
            AccountMeta::new_readonly(anchor_spl::token::ID, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(get_associated_token_address(trade_vault, mint), false),
            AccountMeta::new(get_associated_token_address(pmm, mint), false),
            AccountMeta::new(get_associated_token_address(protocol, mint), false),
        ])
    }

    pub fn as_slice(&self) -> &[AccountMeta] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<AccountMeta> {
        self.0
    }
}

/// Who takes part in a settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementParams {
    pub trade_id: TradeId,
    /// Coordinator allowed to settle; fee payer of the transaction.
    pub mpc_pubkey: Pubkey,
    /// Ephemeral key of the trade, also its nonce account.
    pub user_ephemeral_pubkey: Pubkey,
    /// Receives the settled amount.
    pub pmm_pubkey: Pubkey,
}

/// Like [`SettlementParams`], with the ephemeral keypair that presigns.
#[derive(Clone, Copy, Debug)]
pub struct UserPresignParams<'a> {
    pub trade_id: TradeId,
    pub mpc_pubkey: Pubkey,
    pub user_ephemeral: &'a Keypair,
    pub pmm_pubkey: Pubkey,
}

impl UserPresignParams<'_> {
    pub fn settlement_params(&self) -> SettlementParams {
        SettlementParams {
            trade_id: self.trade_id,
            mpc_pubkey: self.mpc_pubkey,
            user_ephemeral_pubkey: self.user_ephemeral.pubkey(),
            pmm_pubkey: self.pmm_pubkey,
        }
    }
}

pub fn nonce_advance_instruction(mpc_pubkey: &Pubkey, user_ephemeral_pubkey: &Pubkey) -> Instruction {
    system_instruction::advance_nonce_account(user_ephemeral_pubkey, mpc_pubkey)
}

/// The `settlement` instruction for a trade, given its on-chain record.
pub fn settlement_instruction(
    program_id: &Pubkey,
    params: &SettlementParams,
    trade_detail: &TradeDetail,
) -> Instruction {
    let trade_vault = trade_vault_pda(program_id, &params.trade_id);
    let protocol = protocol_pda(program_id);

    let remaining = match trade_detail.asset() {
        TradeAsset::Native => SettlementRemainingAccounts::native(),
        TradeAsset::Token { mint } => {
            SettlementRemainingAccounts::token(&mint, &trade_vault, &params.pmm_pubkey, &protocol)
        }
    };

    let mut accounts = SettlementAccounts {
        signer: params.mpc_pubkey,
        user_account: trade_detail.user_pubkey,
        user_ephemeral_account: params.user_ephemeral_pubkey,
        user_trade_detail: user_trade_detail_pda(program_id, &params.trade_id),
        nonce_check_account: nonce_check_pda(program_id, &params.user_ephemeral_pubkey),
        vault: trade_vault,
        refund_account: trade_detail.refund_pubkey,
        protocol,
        pmm: params.pmm_pubkey,
        system_program: system_program::ID,
    }
    .to_account_metas(None);
    accounts.extend(remaining.into_inner());

    Instruction {
        program_id: *program_id,
        data: Settlement {
            settlement_args: SettlementArgs {
                trade_id: params.trade_id.to_bytes(),
            },
        }
        .data(),
        accounts,
    }
}

pub fn nonce_advance_and_settlement_instructions(
    program_id: &Pubkey,
    params: &SettlementParams,
    trade_detail: &TradeDetail,
) -> Vec<Instruction> {
    vec![
        nonce_advance_instruction(&params.mpc_pubkey, &params.user_ephemeral_pubkey),
        settlement_instruction(program_id, params, trade_detail),
    ]
}

/// Unsigned settlement transaction: MPC pays, the nonce value stands in for
/// the recent blockhash. Keys are ordered as the TypeScript SDK orders them,
/// see [`crate::message`].
pub fn settlement_transaction(
    program_id: &Pubkey,
    params: &SettlementParams,
    trade_detail: &TradeDetail,
    nonce_value: Hash,
) -> Transaction {
    let instructions = nonce_advance_and_settlement_instructions(program_id, params, trade_detail);
    let message = compile_message(&instructions, &params.mpc_pubkey, &nonce_value);
    Transaction::new_unsigned(message)
}

/// Settlement instruction only, reading the trade record from the ledger.
pub fn create_settlement_instructions(
    ledger: &impl LedgerReader,
    program_id: &Pubkey,
    params: &SettlementParams,
) -> Result<Vec<Instruction>> {
    let trade_detail = fetch_trade_detail(ledger, program_id, &params.trade_id)?;
    Ok(vec![settlement_instruction(program_id, params, &trade_detail)])
}

pub fn create_nonce_advance_and_settlement_instructions(
    ledger: &impl LedgerReader,
    program_id: &Pubkey,
    params: &SettlementParams,
) -> Result<Vec<Instruction>> {
    let trade_detail = fetch_trade_detail(ledger, program_id, &params.trade_id)?;
    Ok(nonce_advance_and_settlement_instructions(program_id, params, &trade_detail))
}

pub fn create_settlement_transaction(
    ledger: &impl LedgerReader,
    program_id: &Pubkey,
    params: &SettlementParams,
) -> Result<Transaction> {
    let trade_detail = fetch_trade_detail(ledger, program_id, &params.trade_id)?;
    let nonce_value = ledger.fetch_nonce_value(&params.user_ephemeral_pubkey)?;
    tracing::debug!(
        trade_id = %params.trade_id,
        nonce = %nonce_value,
        "building settlement transaction"
    );
    Ok(settlement_transaction(program_id, params, &trade_detail, nonce_value))
}

pub fn create_settlement_transaction_and_serialize_to_string(
    ledger: &impl LedgerReader,
    program_id: &Pubkey,
    params: &SettlementParams,
) -> Result<String> {
    serialize_presign(&create_settlement_transaction(ledger, program_id, params)?)
}

/// Settlement transaction carrying only the ephemeral signature; the MPC slot
/// stays empty.
pub fn create_user_presign_settlement_transaction(
    ledger: &impl LedgerReader,
    program_id: &Pubkey,
    params: &UserPresignParams<'_>,
) -> Result<Transaction> {
    let mut transaction = create_settlement_transaction(ledger, program_id, &params.settlement_params())?;
    let nonce_value = transaction.message.recent_blockhash;
    transaction.try_partial_sign(&[params.user_ephemeral], nonce_value)?;
    tracing::debug!(
        trade_id = %params.trade_id,
        ephemeral = %params.user_ephemeral.pubkey(),
        "presigned settlement"
    );
    Ok(transaction)
}

/// Hex string handed to the MPC.
pub fn create_user_presign_settlement_transaction_and_serialize_to_string(
    ledger: &impl LedgerReader,
    program_id: &Pubkey,
    params: &UserPresignParams<'_>,
) -> Result<String> {
    serialize_presign(&create_user_presign_settlement_transaction(ledger, program_id, params)?)
}

/// Wire encoding of a (possibly partially signed) transaction, as hex.
///
/// Missing signatures are allowed; a present one that does not verify is not.
pub fn serialize_presign(transaction: &Transaction) -> Result<String> {
    if !verify_transaction_signatures(transaction) {
        let signatures: Vec<String> = transaction.signatures.iter().map(ToString::to_string).collect();
        return Err(ClientError::invalid_param(
            "Signature verification failed",
            metadata! { "signatures" => signatures },
        ));
    }
    let bytes = bincode::serialize(transaction).map_err(|err| {
        ClientError::invalid_param("Cannot serialize transaction", metadata! { "reason" => err.to_string() })
    })?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::tests::MemoryLedger;
    use solana_sdk::signature::Signature;

    fn trade_detail(trade_id: TradeId, token: Option<Pubkey>) -> TradeDetail {
        TradeDetail {
            trade_id: trade_id.to_bytes(),
            user_pubkey: Pubkey::new_unique(),
            token,
            amount: 1_000,
            mpc_pubkey: Pubkey::new_unique(),
            user_ephemeral_pubkey: Pubkey::new_unique(),
            refund_pubkey: Pubkey::new_unique(),
            ..Default::default()
        }
    }

    fn params(detail: &TradeDetail) -> SettlementParams {
        SettlementParams {
            trade_id: TradeId::new(detail.trade_id),
            mpc_pubkey: detail.mpc_pubkey,
            user_ephemeral_pubkey: detail.user_ephemeral_pubkey,
            pmm_pubkey: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_instruction_data() {
        let trade_id = TradeId::new([7; 32]);
        let detail = trade_detail(trade_id, None);
        let ix = settlement_instruction(&crate::ID, &params(&detail), &detail);
        assert_eq!(ix.program_id, crate::ID);
        assert_eq!(&ix.data[..8], &[128, 21, 174, 60, 47, 86, 130, 108]);
        assert_eq!(&ix.data[8..], &[7; 32]);
    }

    #[test]
    fn test_native_account_order() {
        let detail = trade_detail(TradeId::new([1; 32]), None);
        let params = params(&detail);
        let ix = settlement_instruction(&crate::ID, &params, &detail);

        let expected = [
            (params.mpc_pubkey, true, true),
            (detail.user_pubkey, false, true),
            (params.user_ephemeral_pubkey, true, false),
            (user_trade_detail_pda(&crate::ID, &params.trade_id), false, true),
            (nonce_check_pda(&crate::ID, &params.user_ephemeral_pubkey), false, true),
            (trade_vault_pda(&crate::ID, &params.trade_id), false, true),
            (detail.refund_pubkey, false, true),
            (protocol_pda(&crate::ID), false, true),
            (params.pmm_pubkey, false, true),
            (system_program::ID, false, false),
        ];
        assert_eq!(ix.accounts.len(), expected.len());
        for (meta, (pubkey, is_signer, is_writable)) in ix.accounts.iter().zip(expected) {
            assert_eq!(meta.pubkey, pubkey);
            assert_eq!(meta.is_signer, is_signer);
            assert_eq!(meta.is_writable, is_writable);
        }
    }

    #[test]
    fn test_token_remaining_accounts_order() {
        let mint = Pubkey::new_unique();
        let detail = trade_detail(TradeId::new([2; 32]), Some(mint));
        let params = params(&detail);
        let ix = settlement_instruction(&crate::ID, &params, &detail);
        assert_eq!(ix.accounts.len(), 15);

        let trade_vault = trade_vault_pda(&crate::ID, &params.trade_id);
        let protocol = protocol_pda(&crate::ID);
        let remaining = &ix.accounts[10..];
        assert_eq!(remaining[0], AccountMeta::new_readonly(anchor_spl::token::ID, false));
        assert_eq!(remaining[1], AccountMeta::new_readonly(mint, false));
        assert_eq!(remaining[2], AccountMeta::new(get_associated_token_address(&trade_vault, &mint), false));
        assert_eq!(remaining[3], AccountMeta::new(get_associated_token_address(&params.pmm_pubkey, &mint), false));
        assert_eq!(remaining[4], AccountMeta::new(get_associated_token_address(&protocol, &mint), false));

        assert!(SettlementRemainingAccounts::native().as_slice().is_empty());
    }

    #[test]
    fn test_transaction_shape() {
        let detail = trade_detail(TradeId::new([3; 32]), None);
        let params = params(&detail);
        let nonce_value = Hash::new_unique();
        let tx = settlement_transaction(&crate::ID, &params, &detail, nonce_value);

        assert_eq!(tx.message.recent_blockhash, nonce_value);
        assert_eq!(tx.message.header.num_required_signatures, 2);
        assert_eq!(tx.message.account_keys[0], params.mpc_pubkey);
        assert_eq!(tx.message.account_keys[1], params.user_ephemeral_pubkey);
        assert_eq!(tx.signatures, vec![Signature::default(); 2]);

        let first = &tx.message.instructions[0];
        assert_eq!(
            tx.message.account_keys[first.program_id_index as usize],
            solana_sdk::system_program::id()
        );
        assert_eq!(tx.message.instructions.len(), 2);

        // writable accounts, then readonly, each group in base58 order
        let header = &tx.message.header;
        let readonly_from = tx.message.account_keys.len() - header.num_readonly_unsigned_accounts as usize;
        let keys: Vec<String> = tx.message.account_keys.iter().map(Pubkey::to_string).collect();
        for group in [&keys[2..readonly_from], &keys[readonly_from..]] {
            assert!(group
                .windows(2)
                .all(|pair| crate::message::compare_base58(&pair[0], &pair[1]).is_lt()));
        }
        // recent blockhashes sysvar, system program, settlement program
        assert_eq!(header.num_readonly_unsigned_accounts, 3);
    }

    #[test]
    fn test_presign_from_ledger() {
        let ephemeral = Keypair::new();
        let mut detail = trade_detail(TradeId::new([4; 32]), None);
        detail.user_ephemeral_pubkey = ephemeral.pubkey();

        let mut ledger = MemoryLedger::default();
        ledger.insert_trade_detail(&crate::ID, &detail);
        let nonce_value = ledger.insert_nonce(ephemeral.pubkey(), detail.mpc_pubkey);

        let presign_params = UserPresignParams {
            trade_id: TradeId::new(detail.trade_id),
            mpc_pubkey: detail.mpc_pubkey,
            user_ephemeral: &ephemeral,
            pmm_pubkey: Pubkey::new_unique(),
        };
        let tx = create_user_presign_settlement_transaction(&ledger, &crate::ID, &presign_params).unwrap();
        assert_eq!(tx.message.recent_blockhash, nonce_value);
        assert_eq!(tx.signatures[0], Signature::default());
        assert!(tx.signatures[1].verify(ephemeral.pubkey().as_ref(), &tx.message_data()));

        let encoded =
            create_user_presign_settlement_transaction_and_serialize_to_string(&ledger, &crate::ID, &presign_params)
                .unwrap();
        let decoded: Transaction = bincode::deserialize(&hex::decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded, tx);

        let unsigned = create_settlement_transaction_and_serialize_to_string(
            &ledger,
            &crate::ID,
            &presign_params.settlement_params(),
        )
        .unwrap();
        assert!(!unsigned.is_empty());
    }

    #[test]
    fn test_missing_record_or_nonce_is_fetch_error() {
        let ephemeral = Keypair::new();
        let mut detail = trade_detail(TradeId::new([5; 32]), None);
        detail.user_ephemeral_pubkey = ephemeral.pubkey();
        let params = params(&detail);

        let mut ledger = MemoryLedger::default();
        assert!(matches!(
            create_settlement_instructions(&ledger, &crate::ID, &params),
            Err(ClientError::FetchAccount { .. })
        ));

        ledger.insert_trade_detail(&crate::ID, &detail);
        assert_eq!(create_settlement_instructions(&ledger, &crate::ID, &params).unwrap().len(), 1);
        assert_eq!(
            create_nonce_advance_and_settlement_instructions(&ledger, &crate::ID, &params).unwrap().len(),
            2
        );
        assert!(matches!(
            create_settlement_transaction(&ledger, &crate::ID, &params),
            Err(ClientError::FetchAccount { .. })
        ));
    }

    #[test]
    fn test_serialize_rejects_bad_signature() {
        let detail = trade_detail(TradeId::new([6; 32]), None);
        let mut tx = settlement_transaction(&crate::ID, &params(&detail), &detail, Hash::new_unique());
        assert!(serialize_presign(&tx).is_ok());

        tx.signatures[1] = Signature::from([1u8; 64]);
        assert!(serialize_presign(&tx).unwrap_err().is_invalid_param());
    }
}
