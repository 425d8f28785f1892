use crate::error::Error;
use crate::model::{
    CompiledInstruction, EncodedTransaction, InnerInstruction, Log, Message, MessageHeader,
    TokenBalance, Transaction, TransactionMeta,
};
use crate::transform::address::AddressSpace;
use crate::types::{RawBlockHeader, RawTransaction};

/// One transaction's share of the block-wide grouping passes.
#[derive(Debug, Clone, Default)]
pub struct TransactionParts {
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub instructions: Vec<CompiledInstruction>,
    pub inner_instructions: Vec<InnerInstruction>,
    pub logs: Vec<Log>,
}

fn parse_u64(field: &'static str, value: &str, raw: &RawTransaction) -> Result<u64, Error> {
    value.parse().map_err(|e: std::num::ParseIntError| Error::NumericParse {
        field,
        value: value.to_string(),
        location: format!("transaction {}", raw.transaction_index),
        reason: e.to_string(),
    })
}

/// Builds the RPC transaction from its raw row and already grouped parts.
pub fn assemble_transaction(
    raw: &RawTransaction,
    header: &RawBlockHeader,
    parts: TransactionParts,
) -> Result<Transaction, Error> {
    let fee = parse_u64("fee", &raw.fee, raw)?;
    let compute_units_consumed = raw
        .compute_units_consumed
        .as_deref()
        .map(|units| parse_u64("compute units consumed", units, raw))
        .transpose()?;

    let account_keys: Vec<String> = AddressSpace::of(raw).keys().cloned().collect();

    let log_messages = parts.logs.iter().map(Log::rendered).collect();

    Ok(Transaction {
        slot: header.slot,
        block_time: header.timestamp,
        transaction: EncodedTransaction {
            message: Message {
                account_keys,
                header: MessageHeader {
                    num_required_signatures: raw.num_required_signatures,
                    num_readonly_signed_accounts: raw.num_readonly_signed_accounts,
                    num_readonly_unsigned_accounts: raw.num_readonly_unsigned_accounts,
                },
                recent_blockhash: raw.recent_blockhash.clone().unwrap_or_default(),
                instructions: parts.instructions,
                address_table_lookups: raw.address_table_lookups.clone(),
            },
            signatures: raw.signatures.clone(),
        },
        meta: TransactionMeta {
            err: raw.err.clone(),
            fee,
            pre_balances: parts.pre_balances,
            post_balances: parts.post_balances,
            inner_instructions: parts.inner_instructions,
            pre_token_balances: parts.pre_token_balances,
            post_token_balances: parts.post_token_balances,
            log_messages,
            logs: parts.logs,
            loaded_addresses: raw.loaded_addresses.clone(),
            compute_units_consumed,
        },
        version: raw.version,
    })
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::types::{LogKind, TransactionVersion};

    fn header() -> RawBlockHeader {
        serde_json::from_value(serde_json::json!({
            "hash": "h",
            "parentHash": "p",
            "number": 327_347_682_u64,
            "height": 305_604_799_u64,
            "parentNumber": 327_347_681_u64,
            "timestamp": 1_742_000_000
        }))
        .unwrap()
    }

    fn raw(value: serde_json::Value) -> RawTransaction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn assembles_message_and_meta() {
        let tx = raw(serde_json::json!({
            "transactionIndex": 2,
            "version": 0,
            "signatures": ["sigA", "sigB"],
            "accountKeys": ["payer", "prog"],
            "loadedAddresses": { "writable": ["pool"], "readonly": ["oracle"] },
            "addressTableLookups": [
                { "accountKey": "table", "writableIndexes": [3], "readonlyIndexes": [7] }
            ],
            "numRequiredSignatures": 1,
            "numReadonlySignedAccounts": 0,
            "numReadonlyUnsignedAccounts": 1,
            "recentBlockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N",
            "computeUnitsConsumed": "42000",
            "fee": "5000",
            "err": { "InstructionError": [0, "Custom"] }
        }));
        let parts = TransactionParts {
            pre_balances: vec![100],
            post_balances: vec![95],
            logs: vec![Log {
                message: "hello".to_string(),
                program_id: "prog".to_string(),
                log_index: 0,
                kind: LogKind::Log,
                instruction_address: vec![0],
            }],
            ..TransactionParts::default()
        };
        let assembled = assemble_transaction(&tx, &header(), parts).unwrap();

        assert_eq!(assembled.slot, 327_347_682);
        assert_eq!(assembled.block_time, 1_742_000_000);
        assert_eq!(assembled.version, Some(TransactionVersion::Number(0)));

        let message = &assembled.transaction.message;
        assert_eq!(message.account_keys, vec!["payer", "prog", "pool", "oracle"]);
        assert_eq!(message.header.num_readonly_unsigned_accounts, 1);
        assert_eq!(message.address_table_lookups[0].writable_indexes, vec![3]);
        assert_eq!(assembled.transaction.signatures, vec!["sigA", "sigB"]);

        let meta = &assembled.meta;
        assert_eq!(meta.fee, 5000);
        assert_eq!(meta.compute_units_consumed, Some(42_000));
        assert_eq!(meta.pre_balances, vec![100]);
        assert_eq!(meta.log_messages, vec!["Program log: hello"]);
        assert!(meta.err.is_some());
        assert_eq!(meta.loaded_addresses.readonly, vec!["oracle"]);
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let tx = raw(serde_json::json!({
            "transactionIndex": 0,
            "accountKeys": ["payer"],
            "fee": "0"
        }));
        let assembled = assemble_transaction(&tx, &header(), TransactionParts::default()).unwrap();
        assert_eq!(assembled.transaction.message.recent_blockhash, "");
        assert_eq!(assembled.meta.compute_units_consumed, None);
        assert_eq!(assembled.version, None);
        assert!(assembled.meta.err.is_none());

        let json = serde_json::to_value(&assembled).unwrap();
        assert!(json.get("version").is_none());
        assert_eq!(json["meta"]["computeUnitsConsumed"], serde_json::Value::Null);
    }

    #[test]
    fn bad_fee_is_a_numeric_error() {
        let tx = raw(serde_json::json!({
            "transactionIndex": 8,
            "accountKeys": ["payer"],
            "fee": "five"
        }));
        let err = assemble_transaction(&tx, &header(), TransactionParts::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::NumericParse { field: "fee", ref location, .. } if location == "transaction 8"
        ));
    }

    #[test]
    fn bad_compute_units_are_a_numeric_error() {
        let tx = raw(serde_json::json!({
            "transactionIndex": 1,
            "accountKeys": ["payer"],
            "computeUnitsConsumed": "-1",
            "fee": "5000"
        }));
        let err = assemble_transaction(&tx, &header(), TransactionParts::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::NumericParse {
                field: "compute units consumed",
                ..
            }
        ));
    }
}
