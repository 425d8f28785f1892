//! Archive query payloads.
//!
//! Filtering is a two step affair. [`SolanaRequest::matching_blocks`] asks the
//! archive which blocks in a range contain anything matching a [`BlockFilter`];
//! [`SolanaRequest::full_block`] then fetches each of those blocks unfiltered so
//! that [`crate::transform_block`] sees every record it needs to resolve.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::LogKind;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Which columns the archive returns per record kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSelection {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub instruction: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub transaction: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub log: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub balance: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub token_balance: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reward: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub block: BTreeMap<String, bool>,
}

fn selected(names: &[&str]) -> BTreeMap<String, bool> {
    names.iter().map(|name| ((*name).to_string(), true)).collect()
}

/// Portal records only carry their transaction index when it is selected.
fn indexed(names: &[&str]) -> BTreeMap<String, bool> {
    let mut fields = selected(names);
    fields.insert("transactionIndex".to_string(), true);
    fields
}

const TOKEN_BALANCE_FIELDS: &[&str] = &[
    "preMint",
    "preDecimals",
    "preOwner",
    "preAmount",
    "preProgramId",
    "postMint",
    "postDecimals",
    "postOwner",
    "postAmount",
    "postProgramId",
];

// the archive rejects `recentBlockhash` as a selected field
const TRANSACTION_FIELDS: &[&str] = &[
    "accountKeys",
    "loadedAddresses",
    "feePayer",
    "fee",
    "err",
    "signatures",
    "numReadonlySignedAccounts",
    "numReadonlyUnsignedAccounts",
    "numRequiredSignatures",
    "addressTableLookups",
];

impl FieldSelection {
    /// Every column the engine consumes, in the portal dialect.
    pub fn portal() -> Self {
        let mut transaction = indexed(TRANSACTION_FIELDS);
        transaction.insert("computeUnitsConsumed".to_string(), true);
        let mut token_balance = indexed(TOKEN_BALANCE_FIELDS);
        token_balance.insert("account".to_string(), true);

        Self {
            instruction: indexed(&[
                "instructionAddress",
                "programId",
                "data",
                "accounts",
                "isCommitted",
            ]),
            transaction,
            log: indexed(&["logIndex", "instructionAddress", "programId", "kind", "message"]),
            balance: indexed(&["account", "pre", "post"]),
            token_balance,
            reward: selected(&["pubkey", "lamports", "rewardType", "postBalance", "commission"]),
            block: selected(&[
                "hash",
                "number",
                "height",
                "parentHash",
                "parentNumber",
                "timestamp",
            ]),
        }
    }

    /// The legacy archive's preset. It reports identity columns implicitly
    /// and names the block fields `slot` and `parentSlot`.
    pub fn legacy() -> Self {
        Self {
            instruction: selected(&["programId", "data", "accounts"]),
            transaction: selected(TRANSACTION_FIELDS),
            log: selected(&["kind", "programId", "message"]),
            balance: selected(&["pre", "post"]),
            token_balance: selected(TOKEN_BALANCE_FIELDS),
            reward: selected(&["rewardType", "lamports", "postBalance"]),
            block: selected(&["parentHash", "slot", "parentSlot", "timestamp"]),
        }
    }

    /// Just enough to identify a block.
    pub fn block_numbers() -> Self {
        Self {
            block: selected(&["number", "height"]),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fee_payer: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub instructions: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub logs: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub balances: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub token_balances: bool,
}

/// Instruction filter. `d*` hold hex discriminators by byte length and
/// `a*` restrict the account at that position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub program_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub d1: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub d2: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub d4: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub d8: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a0: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a1: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a2: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a3: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a4: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a5: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a6: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a7: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a8: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a9: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_committed: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub transaction: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub transaction_balances: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub transaction_token_balances: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub transaction_instructions: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub inner_instructions: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub logs: bool,
}

impl InstructionRequest {
    pub const MAX_ACCOUNT_POSITIONS: usize = 10;

    /// Restricts the account at `position` to one of `accounts`.
    pub fn set_accounts(&mut self, position: usize, accounts: Vec<String>) -> Result<(), Error> {
        let slot = match position {
            0 => &mut self.a0,
            1 => &mut self.a1,
            2 => &mut self.a2,
            3 => &mut self.a3,
            4 => &mut self.a4,
            5 => &mut self.a5,
            6 => &mut self.a6,
            7 => &mut self.a7,
            8 => &mut self.a8,
            9 => &mut self.a9,
            _ => {
                return Err(Error::InvalidFilter {
                    reason: format!(
                        "account position {position} exceeds the {} supported",
                        Self::MAX_ACCOUNT_POSITIONS
                    ),
                });
            }
        };
        *slot = accounts;
        Ok(())
    }

    /// Sorts `0x`-prefixed hex discriminators into the field matching their byte length.
    pub fn set_discriminators<S: AsRef<str>>(&mut self, discriminators: &[S]) -> Result<(), Error> {
        for discriminator in discriminators {
            let discriminator = discriminator.as_ref();
            let digits = discriminator
                .strip_prefix("0x")
                .filter(|d| !d.is_empty() && d.len() % 2 == 0)
                .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
                .ok_or_else(|| Error::InvalidFilter {
                    reason: format!("discriminator `{discriminator}` is not 0x-prefixed hex"),
                })?;

            let bucket = match digits.len() / 2 {
                1 => &mut self.d1,
                2 => &mut self.d2,
                4 => &mut self.d4,
                8 => &mut self.d8,
                bytes => {
                    return Err(Error::InvalidFilter {
                        reason: format!(
                            "discriminator `{discriminator}` is {bytes} bytes, expected 1, 2, 4 or 8"
                        ),
                    });
                }
            };
            bucket.push(discriminator.to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub program_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kind: Vec<LogKind>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub transaction: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub instruction: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pubkey: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub account: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub transaction: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub transaction_instructions: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalanceRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub account: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_program_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_program_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_mint: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_mint: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_owner: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_owner: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_instructions: Option<bool>,
}

/// A query against the archive's `stream` endpoint.
///
/// Item lists left as `None` are not requested at all. An empty item inside a
/// list matches every record of that kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub from_block: u64,
    pub to_block: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_all_blocks: Option<bool>,
    #[serde(default)]
    pub fields: FieldSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<TransactionRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<InstructionRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<LogRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewards: Option<Vec<RewardRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_balances: Option<Vec<TokenBalanceRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balances: Option<Vec<BalanceRequest>>,
}

impl SolanaRequest {
    pub const KIND: &'static str = "solana";

    pub fn new(from_block: u64, to_block: u64, fields: FieldSelection) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            from_block,
            to_block,
            include_all_blocks: None,
            fields,
            transactions: None,
            instructions: None,
            logs: None,
            rewards: None,
            token_balances: None,
            balances: None,
        }
    }

    /// Finds the blocks in `from..=to` holding anything `filter` matches.
    ///
    /// Only block numbers are selected; the archive always returns the first
    /// and last block of the range so callers can tell which range was searched.
    pub fn matching_blocks(from: u64, to: u64, filter: &BlockFilter) -> Result<Self, Error> {
        let mut request = Self::new(from, to, FieldSelection::block_numbers());

        if !filter.transactions.is_empty() {
            request.transactions = Some(
                filter
                    .transactions
                    .iter()
                    .map(|tx| TransactionRequest {
                        fee_payer: tx.signer_account_keys.clone(),
                        ..TransactionRequest::default()
                    })
                    .collect(),
            );
        }

        if !filter.instructions.is_empty() {
            request.instructions = Some(
                filter
                    .instructions
                    .iter()
                    .map(InstructionFilter::to_request)
                    .collect::<Result<Vec<_>, _>>()?,
            );
        }

        if !filter.logs.is_empty() {
            request.logs = Some(
                filter
                    .logs
                    .iter()
                    .map(|log| LogRequest {
                        program_id: log.program_ids.clone(),
                        kind: log.kinds.clone(),
                        ..LogRequest::default()
                    })
                    .collect(),
            );
        }

        Ok(request)
    }

    /// Every record of one block, the input [`crate::transform_block`] expects.
    pub fn full_block(slot: u64, fields: FieldSelection) -> Self {
        Self {
            transactions: Some(vec![TransactionRequest::default()]),
            instructions: Some(vec![InstructionRequest::default()]),
            logs: Some(vec![LogRequest::default()]),
            rewards: Some(vec![RewardRequest::default()]),
            token_balances: Some(vec![TokenBalanceRequest::default()]),
            balances: Some(vec![BalanceRequest::default()]),
            ..Self::new(slot, slot, fields)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    #[serde(default)]
    pub signer_account_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionFilter {
    #[serde(default)]
    pub program_ids: Vec<String>,
    /// Allowed addresses per account position.
    #[serde(default)]
    pub accounts: Vec<Vec<String>>,
    #[serde(default)]
    pub discriminators: Vec<String>,
    #[serde(default)]
    pub is_committed: bool,
}

impl InstructionFilter {
    fn to_request(&self) -> Result<InstructionRequest, Error> {
        let mut request = InstructionRequest {
            program_id: self.program_ids.clone(),
            is_committed: self.is_committed,
            ..InstructionRequest::default()
        };
        for (position, accounts) in self.accounts.iter().enumerate() {
            request.set_accounts(position, accounts.clone())?;
        }
        request.set_discriminators(self.discriminators.as_slice())?;
        Ok(request)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    #[serde(default)]
    pub program_ids: Vec<String>,
    #[serde(default)]
    pub kinds: Vec<LogKind>,
}

/// Caller-facing block filter; each list is an OR of its entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockFilter {
    #[serde(default)]
    pub transactions: Vec<TransactionFilter>,
    #[serde(default)]
    pub instructions: Vec<InstructionFilter>,
    #[serde(default)]
    pub logs: Vec<LogFilter>,
}
