use std::collections::HashMap;

use crate::error::Error;
use crate::model::Log;
use crate::transform::address::AddressSpaces;
use crate::types::{RawLog, TransactionIndex};

/// Groups log rows per transaction, keeping archive order (already log-index order).
///
/// A log naming a transaction the block does not contain is a dangling reference.
pub fn group_logs(
    logs: &[RawLog],
    spaces: &AddressSpaces<'_>,
) -> Result<HashMap<TransactionIndex, Vec<Log>>, Error> {
    let mut grouped: HashMap<TransactionIndex, Vec<Log>> = HashMap::new();
    for log in logs {
        spaces.get(log.transaction_index, "log")?;
        grouped.entry(log.transaction_index).or_default().push(Log {
            message: log.message.clone(),
            program_id: log.program_id.clone(),
            log_index: log.log_index,
            kind: log.kind,
            instruction_address: log.instruction_address.clone(),
        });
    }
    tracing::trace!(rows = logs.len(), transactions = grouped.len(), "grouped logs");
    Ok(grouped)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::types::{LogKind, RawTransaction};

    fn transactions() -> Vec<RawTransaction> {
        serde_json::from_value(serde_json::json!([
            { "transactionIndex": 0, "accountKeys": ["payer"], "fee": "5000" },
            { "transactionIndex": 3, "accountKeys": ["payer"], "fee": "5000" }
        ]))
        .unwrap()
    }

    fn raw(tx: TransactionIndex, log_index: u32, kind: &str, message: &str) -> RawLog {
        serde_json::from_value(serde_json::json!({
            "transactionIndex": tx,
            "logIndex": log_index,
            "instructionAddress": [0],
            "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
            "kind": kind,
            "message": message
        }))
        .unwrap()
    }

    #[test]
    fn groups_by_transaction_in_archive_order() {
        let rows = vec![
            raw(0, 0, "log", "Instruction: Transfer"),
            raw(3, 0, "other", "Program consumption: 1200 units remaining"),
            raw(0, 1, "data", "GmTE6l15"),
            raw(0, 2, "log", "done"),
        ];
        let txs = transactions();
        let grouped = group_logs(&rows, &AddressSpaces::new(&txs)).unwrap();

        assert_eq!(grouped.len(), 2);
        let indices: Vec<u32> = grouped[&0].iter().map(|l| l.log_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(grouped[&0][1].kind, LogKind::Data);
        assert_eq!(grouped[&3][0].kind, LogKind::Other);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let txs = transactions();
        assert!(group_logs(&[], &AddressSpaces::new(&txs)).unwrap().is_empty());
    }

    #[test]
    fn log_for_missing_transaction_is_dangling() {
        let txs = transactions();
        let rows = vec![raw(0, 0, "log", "ok"), raw(5, 0, "log", "orphan")];
        let err = group_logs(&rows, &AddressSpaces::new(&txs)).unwrap_err();
        assert!(matches!(
            err,
            Error::DanglingReference {
                record: "log",
                transaction_index: 5
            }
        ));
    }

    #[test]
    fn unknown_kind_fails_to_decode() {
        let result = serde_json::from_value::<RawLog>(serde_json::json!({
            "transactionIndex": 0,
            "logIndex": 0,
            "programId": "p",
            "kind": "warning",
            "message": "m"
        }));
        assert!(result.is_err());
    }
}
