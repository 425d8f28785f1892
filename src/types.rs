use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

/// Position of a transaction within its block, as assigned by the archive.
/// Not contiguous once vote transactions or filtered rows are dropped.
pub type TransactionIndex = u32;

/// Archive list fields come back as `null` when unselected or empty.
fn nullable<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Block header as returned by either archive dialect.
///
/// The legacy archive reports `number` (height), `slot` and `parentSlot`.
/// The portal reports `height`, `number` (slot) and `parentNumber`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "HeaderFields")]
pub struct RawBlockHeader {
    pub hash: String,
    /// Canonical block height.
    pub height: u64,
    pub parent_hash: String,
    /// Chain slot; differs from `height` whenever slots were skipped.
    pub slot: u64,
    pub parent_slot: u64,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeaderFields {
    hash: String,
    parent_hash: String,
    #[serde(default)]
    timestamp: i64,
    slot: Option<u64>,
    parent_slot: Option<u64>,
    height: Option<u64>,
    number: Option<u64>,
    parent_number: Option<u64>,
}

impl TryFrom<HeaderFields> for RawBlockHeader {
    type Error = String;

    fn try_from(fields: HeaderFields) -> Result<Self, Self::Error> {
        let legacy = fields.slot.is_some() || fields.parent_slot.is_some();
        let (height, slot, parent_slot) = if legacy {
            (
                fields.number.ok_or("legacy header is missing `number`")?,
                fields.slot.ok_or("legacy header is missing `slot`")?,
                fields.parent_slot.unwrap_or(0),
            )
        } else {
            (
                fields.height.ok_or("header is missing `height`")?,
                fields.number.ok_or("header is missing `number`")?,
                fields.parent_number.unwrap_or(0),
            )
        };

        Ok(Self {
            hash: fields.hash,
            height,
            parent_hash: fields.parent_hash,
            slot,
            parent_slot,
            timestamp: fields.timestamp,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionVersion {
    Legacy,
    #[serde(untagged)]
    Number(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressTableLookup {
    pub account_key: String,
    #[serde(default, deserialize_with = "nullable")]
    pub writable_indexes: Vec<u8>,
    #[serde(default, deserialize_with = "nullable")]
    pub readonly_indexes: Vec<u8>,
}

/// Accounts pulled in through address lookup tables at execution time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedAddresses {
    #[serde(default, deserialize_with = "nullable")]
    pub writable: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub readonly: Vec<String>,
}

/// A transaction row. Vote transactions are never present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub transaction_index: TransactionIndex,
    #[serde(default, deserialize_with = "nullable")]
    pub signatures: Vec<String>,
    /// `null` for successful transactions.
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub version: Option<TransactionVersion>,
    /// Static account keys; the first one is always the fee payer.
    #[serde(default, deserialize_with = "nullable")]
    pub account_keys: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub address_table_lookups: Vec<AddressTableLookup>,
    #[serde(default)]
    pub num_readonly_signed_accounts: u8,
    #[serde(default)]
    pub num_readonly_unsigned_accounts: u8,
    #[serde(default)]
    pub num_required_signatures: u8,
    #[serde(default)]
    pub recent_blockhash: Option<String>,
    #[serde(default)]
    pub compute_units_consumed: Option<String>,
    /// Lamports, string encoded.
    #[serde(default)]
    pub fee: String,
    #[serde(default)]
    pub fee_payer: Option<String>,
    #[serde(default)]
    pub loaded_addresses: LoadedAddresses,
    #[serde(default)]
    pub has_dropped_log_messages: bool,
}

/// An instruction row. Accounts are literal addresses, not indices.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstruction {
    pub transaction_index: TransactionIndex,
    /// Position in the call tree: `[i]` is the i-th top-level instruction,
    /// `[i, ..]` is invoked (directly or transitively) by it.
    #[serde(default, deserialize_with = "nullable")]
    pub instruction_address: Vec<u32>,
    pub program_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub accounts: Vec<String>,
    /// Base58 instruction data.
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub is_committed: bool,
    #[serde(default)]
    pub compute_units_consumed: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub has_dropped_log_messages: bool,
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogKind {
    Log,
    Data,
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub transaction_index: TransactionIndex,
    pub log_index: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub instruction_address: Vec<u32>,
    pub program_id: String,
    pub kind: LogKind,
    pub message: String,
}

/// Lamport balance change of one account. Unchanged accounts have no row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBalance {
    pub transaction_index: TransactionIndex,
    pub account: String,
    #[serde(default)]
    pub pre: String,
    #[serde(default)]
    pub post: String,
}

/// Token account balance row; the pre and post sides are independent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTokenBalance {
    pub transaction_index: TransactionIndex,
    pub account: String,
    #[serde(default)]
    pub pre_mint: Option<String>,
    #[serde(default)]
    pub pre_decimals: Option<u8>,
    #[serde(default)]
    pub pre_owner: Option<String>,
    #[serde(default)]
    pub pre_program_id: Option<String>,
    #[serde(default)]
    pub pre_amount: Option<String>,
    #[serde(default)]
    pub post_mint: Option<String>,
    #[serde(default)]
    pub post_decimals: Option<u8>,
    #[serde(default)]
    pub post_owner: Option<String>,
    #[serde(default)]
    pub post_program_id: Option<String>,
    #[serde(default)]
    pub post_amount: Option<String>,
}

/// One side of a [`RawTokenBalance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBalanceFacet<'a> {
    pub mint: &'a str,
    pub decimals: u8,
    pub owner: &'a str,
    pub program_id: Option<&'a str>,
    pub amount: &'a str,
}

impl RawTokenBalance {
    /// The balance before execution, present only when the archive reports a pre owner.
    pub fn pre(&self) -> Option<TokenBalanceFacet<'_>> {
        Some(TokenBalanceFacet {
            owner: self.pre_owner.as_deref()?,
            mint: self.pre_mint.as_deref().unwrap_or_default(),
            decimals: self.pre_decimals.unwrap_or(0),
            program_id: self.pre_program_id.as_deref(),
            amount: self.pre_amount.as_deref().unwrap_or_default(),
        })
    }

    /// The balance after execution, present only when the archive reports a post owner.
    pub fn post(&self) -> Option<TokenBalanceFacet<'_>> {
        Some(TokenBalanceFacet {
            owner: self.post_owner.as_deref()?,
            mint: self.post_mint.as_deref().unwrap_or_default(),
            decimals: self.post_decimals.unwrap_or(0),
            program_id: self.post_program_id.as_deref(),
            amount: self.post_amount.as_deref().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReward {
    pub pubkey: String,
    /// Signed lamport delta, string encoded.
    #[serde(default)]
    pub lamports: String,
    #[serde(default)]
    pub post_balance: String,
    #[serde(default)]
    pub reward_type: Option<String>,
    #[serde(default)]
    pub commission: Option<u8>,
}

/// One block of a flat archive response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub header: RawBlockHeader,
    #[serde(default, deserialize_with = "nullable")]
    pub transactions: Vec<RawTransaction>,
    #[serde(default, deserialize_with = "nullable")]
    pub instructions: Vec<RawInstruction>,
    #[serde(default, deserialize_with = "nullable")]
    pub logs: Vec<RawLog>,
    #[serde(default, deserialize_with = "nullable")]
    pub balances: Vec<RawBalance>,
    #[serde(default, deserialize_with = "nullable")]
    pub token_balances: Vec<RawTokenBalance>,
    #[serde(default, deserialize_with = "nullable")]
    pub rewards: Vec<RawReward>,
}

impl RawBlock {
    /// Decode a newline-delimited stream of blocks, as served by the portal.
    pub fn from_json_lines(input: &str) -> Result<Vec<Self>, Error> {
        serde_json::Deserializer::from_str(input)
            .into_iter::<Self>()
            .map(|block| block.map_err(Error::from))
            .collect()
    }
}
