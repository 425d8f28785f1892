use crate::types::TransactionIndex;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("address {address} not found in transaction {transaction_index}")]
    AddressNotFound {
        transaction_index: TransactionIndex,
        address: String,
    },

    #[error("{record} references missing transaction {transaction_index}")]
    DanglingReference {
        record: &'static str,
        transaction_index: TransactionIndex,
    },

    #[error("failed to parse {field} `{value}` ({location}): {reason}")]
    NumericParse {
        field: &'static str,
        value: String,
        location: String,
        reason: String,
    },

    #[error("account index {index} overflows u16 in transaction {transaction_index}")]
    AccountIndexOverflow {
        transaction_index: TransactionIndex,
        index: usize,
    },

    #[error("empty instruction address in transaction {transaction_index}")]
    InvalidInstructionAddress { transaction_index: TransactionIndex },

    #[error("invalid instruction data in transaction {transaction_index}: {reason}")]
    InstructionData {
        transaction_index: TransactionIndex,
        reason: String,
    },

    #[error("unknown reward type `{value}` for {pubkey}")]
    UnknownRewardType { pubkey: String, value: String },

    #[error("invalid filter: {reason}")]
    InvalidFilter { reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
