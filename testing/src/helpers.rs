use {
    litesvm::{types::TransactionResult, LiteSVM},
    optimex_client::{
        create_ephemeral_nonce_account_instructions, ephemeral::NONCE_ACCOUNT_LENGTH,
        error::Result, settlement::nonce_advance_instruction, LedgerReader,
    },
    solana_program::hash::Hash,
    solana_sdk::{
        account::Account, instruction::Instruction, native_token::LAMPORTS_PER_SOL,
        pubkey::Pubkey, signature::Keypair, signer::Signer, transaction::Transaction,
    },
    tracing_subscriber::EnvFilter,
};

/// Read access to an in-process ledger.
pub struct SvmLedger<'a>(pub &'a LiteSVM);

impl LedgerReader for SvmLedger<'_> {
    fn get_account(&self, address: &Pubkey) -> Result<Option<Account>> {
        Ok(self.0.get_account(address))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn generate_and_fund_key(svm: &mut LiteSVM) -> Keypair {
    let keypair = Keypair::new();
    let pubkey = keypair.pubkey();
    svm.airdrop(&pubkey, 10 * LAMPORTS_PER_SOL).unwrap();
    keypair
}

#[allow(clippy::result_large_err)]
pub fn submit_transaction(
    svm: &mut LiteSVM,
    ixs: &[Instruction],
    payer: &Keypair,
    signers: &[&Keypair],
) -> TransactionResult {
    let tx = Transaction::new_signed_with_payer(
        ixs,
        Some(&payer.pubkey()),
        signers,
        svm.latest_blockhash(),
    );

    svm.send_transaction(tx)
}

/// Opens the ephemeral nonce account the way a deposit does, funded by `user`
/// with `mpc` as authority, and returns its first nonce value.
pub fn create_nonce_account(
    svm: &mut LiteSVM,
    user: &Keypair,
    ephemeral: &Keypair,
    mpc: &Pubkey,
) -> Hash {
    let lamports = svm.minimum_balance_for_rent_exemption(NONCE_ACCOUNT_LENGTH);
    let ixs = create_ephemeral_nonce_account_instructions(
        &user.pubkey(),
        &ephemeral.pubkey(),
        mpc,
        lamports,
    );
    let result = submit_transaction(svm, &ixs, user, &[user, ephemeral]);
    assert!(result.is_ok(), "Nonce account creation failed: {:?}", result);
    SvmLedger(&*svm).fetch_nonce_value(&ephemeral.pubkey()).unwrap()
}

/// Advances the nonce with `AdvanceNonceAccount` signed by the MPC and returns
/// the new value. The blockhash is expired first: the system program refuses
/// to advance within the blockhash the nonce was stored at.
pub fn advance_nonce(svm: &mut LiteSVM, ephemeral: &Pubkey, mpc: &Keypair) -> Hash {
    svm.expire_blockhash();
    let advance = nonce_advance_instruction(&mpc.pubkey(), ephemeral);
    let result = submit_transaction(svm, &[advance], mpc, &[mpc]);
    assert!(result.is_ok(), "Nonce advance failed: {:?}", result);
    SvmLedger(&*svm).fetch_nonce_value(ephemeral).unwrap()
}

/// Hex of the bincode wire format, the encoding presigns travel in.
pub fn encode_transaction(tx: &Transaction) -> String {
    hex::encode(bincode::serialize(tx).unwrap())
}

pub fn decode_transaction(presign: &str) -> Transaction {
    bincode::deserialize(&hex::decode(presign).unwrap()).unwrap()
}
