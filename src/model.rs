//! Canonical block shape, serialized with Solana JSON-RPC field names.

use serde::{Deserialize, Serialize};

use crate::types::{AddressTableLookup, LoadedAddresses, LogKind, TransactionVersion};

/// Index into a transaction's combined account-key list.
pub type AccountIndex = u16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub blockhash: String,
    pub previous_blockhash: String,
    pub parent_slot: u64,
    pub transactions: Vec<Transaction>,
    /// First signature of every transaction, in block order.
    pub signatures: Vec<String>,
    pub rewards: Vec<BlockReward>,
    pub block_time: i64,
    pub block_height: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub slot: u64,
    pub block_time: i64,
    pub transaction: EncodedTransaction,
    pub meta: TransactionMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<TransactionVersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedTransaction {
    pub message: Message,
    pub signatures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Static keys followed by loaded writable, then loaded readonly addresses.
    pub account_keys: Vec<String>,
    pub header: MessageHeader,
    pub recent_blockhash: String,
    /// Top-level instructions in program order.
    pub instructions: Vec<CompiledInstruction>,
    pub address_table_lookups: Vec<AddressTableLookup>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    pub err: Option<serde_json::Value>,
    pub fee: u64,
    /// Changed accounts only, ordered by account index. Parallel to `post_balances`.
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub inner_instructions: Vec<InnerInstruction>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub log_messages: Vec<String>,
    pub logs: Vec<Log>,
    pub loaded_addresses: LoadedAddresses,
    pub compute_units_consumed: Option<u64>,
}

/// An instruction expressed as indices into the message's account keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledInstruction {
    pub program_id_index: AccountIndex,
    pub accounts: Vec<AccountIndex>,
    /// Base58 instruction data, passed through untouched.
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerInstruction {
    /// Position of the top-level instruction that invoked these.
    pub index: u32,
    pub instructions: Vec<CompiledInstruction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub account_index: AccountIndex,
    pub mint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    pub ui_token_amount: UiTokenAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
    pub amount: String,
    pub decimals: u8,
    /// Lossy float of the scaled amount, kept for RPC compatibility.
    pub ui_amount: Option<f64>,
    pub ui_amount_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub message: String,
    pub program_id: String,
    pub log_index: u32,
    pub kind: LogKind,
    pub instruction_address: Vec<u32>,
}

impl Log {
    /// The line as it appears in RPC `logMessages`.
    pub fn rendered(&self) -> String {
        match self.kind {
            LogKind::Log => format!("Program log: {}", self.message),
            LogKind::Data => format!("Program data: {}", self.message),
            LogKind::Other => self.message.clone(),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum RewardType {
    Fee,
    Rent,
    Voting,
    Staking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockReward {
    pub pubkey: String,
    pub lamports: i64,
    pub post_balance: u64,
    pub reward_type: Option<RewardType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission: Option<u8>,
}
