use anchor_client::anchor_lang::AccountSerialize;
use optimex_client::{
    derive_ephemeral_keypair, get_trade_input, pda::user_trade_detail_pda,
    ChainToken, TradeDetail, TradeId, TradeInputParams, TradeStatus, U256,
};
use solana_program::hash::Hash;
use solana_sdk::{account::Account, pubkey::Pubkey, signature::Keypair, signer::Signer};

use crate::helpers::{create_nonce_account, generate_and_fund_key};

/// Signature the user produced off-chain; its last 32 bytes seed the ephemeral key.
pub const USER_SIGNATURE: &str = "0x9a4e0c1d2b3f40516273849a5b6c7d8e9f00112233445566778899aabbccddeeff\
                                  3c1e5a7b9d0f2e4c6a8b0d1f3e5c7a9b1d3f5e7c9a0b2d4f6e8c0a1b3d5f7e9c";

pub struct SetupOptions {
    /// Mint of the deposited token; `None` for SOL.
    pub token: Option<Pubkey>,
    pub amount: u64,
    pub session_id: u64,
    pub signature_hex: String,
}

impl Default for SetupOptions {
    fn default() -> Self {
        SetupOptions {
            token: None,
            amount: 100_000,
            session_id: 1,
            signature_hex: USER_SIGNATURE.to_string(),
        }
    }
}

pub struct SetupResult {
    pub svm: litesvm::LiteSVM,
    pub user: Keypair,
    pub mpc: Keypair,
    pub ephemeral: Keypair,
    pub pmm: Pubkey,
    pub trade_id: TradeId,
    pub trade_detail: TradeDetail,
    /// Value of the ephemeral nonce account right after deposit.
    pub nonce_value: Hash,
}

fn tokens(token: Option<Pubkey>) -> (ChainToken, ChainToken) {
    let from_token = ChainToken {
        token_id: if token.is_some() { "USDC" } else { "SOL" }.to_string(),
        network_id: "solana-devnet".to_string(),
        network_type: Some("SOLANA".to_string()),
        token_address: token.map_or_else(|| "native".to_string(), |mint| mint.to_string()),
    };
    let to_token = ChainToken {
        token_id: "WETH".to_string(),
        network_id: "ethereum-sepolia".to_string(),
        network_type: Some("EVM".to_string()),
        token_address: "0x7b79995e5f793a07bc00c21412e50ecae098e7f9".to_string(),
    };
    (from_token, to_token)
}

/// Ledger state of a trade right after a successful deposit: funded parties,
/// the ephemeral nonce account under MPC authority, and the trade record.
pub fn setup(options: Option<SetupOptions>) -> SetupResult {
    let options = options.unwrap_or_default();

    let mut svm = litesvm::LiteSVM::new();

    let user = generate_and_fund_key(&mut svm);
    let mpc = generate_and_fund_key(&mut svm);
    let pmm = Pubkey::new_unique();
    let ephemeral = derive_ephemeral_keypair(&options.signature_hex).unwrap();

    let (from_token, to_token) = tokens(options.token);
    let trade = get_trade_input(&TradeInputParams {
        from_token: &from_token,
        to_token: &to_token,
        user_pubkey: &user.pubkey(),
        to_user_address: "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4",
        solver: "0x0000000000000000000000000000000000000000",
        amount: &options.amount.to_string(),
        session_id: U256::from(options.session_id),
    })
    .unwrap();
    assert_eq!(trade.is_native_token, options.token.is_none());

    let nonce_value = create_nonce_account(&mut svm, &user, &ephemeral, &mpc.pubkey());

    let trade_detail = TradeDetail {
        trade_id: trade.trade_id.to_bytes(),
        user_pubkey: user.pubkey(),
        token: options.token,
        amount: options.amount,
        timeout: 1_900_000_000,
        mpc_pubkey: mpc.pubkey(),
        user_ephemeral_pubkey: ephemeral.pubkey(),
        refund_pubkey: user.pubkey(),
        total_fee: None,
        status: TradeStatus::Deposited,
        settled_pmm: Pubkey::default(),
        _reserve: [0; 8],
    };
    write_trade_detail(&mut svm, &trade_detail);

    SetupResult {
        svm,
        user,
        mpc,
        ephemeral,
        pmm,
        trade_id: trade.trade_id,
        trade_detail,
        nonce_value,
    }
}

/// Stores `trade_detail` where the program keeps it.
pub fn write_trade_detail(svm: &mut litesvm::LiteSVM, trade_detail: &TradeDetail) {
    let mut data = Vec::new();
    trade_detail.try_serialize(&mut data).unwrap();
    let address = user_trade_detail_pda(&optimex_client::ID, &TradeId::new(trade_detail.trade_id));
    let account = Account {
        lamports: svm.minimum_balance_for_rent_exemption(data.len()),
        data,
        owner: optimex_client::ID,
        executable: false,
        rent_epoch: 0,
    };
    svm.set_account(address, account).unwrap();
}
