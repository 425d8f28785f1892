#![expect(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test code uses unwrap/panic for concise assertions"
)]

use sqd_solana_blocks::{
    Block, Error, FieldSelection, RawBlock, RewardType, SolanaRequest, transform_block,
};

fn load_fixture(filename: &str) -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let path = format!("{manifest_dir}/tests/fixtures/{filename}");
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"))
}

fn load_value(filename: &str) -> serde_json::Value {
    serde_json::from_str(&load_fixture(filename))
        .unwrap_or_else(|e| panic!("failed to parse {filename}: {e}"))
}

fn transform_value(value: serde_json::Value) -> Result<Block, Error> {
    let raw: RawBlock = serde_json::from_value(value).unwrap();
    transform_block(&raw)
}

// ──────────────────── portal block ────────────────────

#[test]
fn portal_block_header_and_signatures() {
    let block = transform_value(load_value("portal_block.json")).unwrap();

    assert_eq!(block.blockhash, "5Y4gQsbRpSz2tkDFSfUxDxpmUtnp3bz2ZbQn3Qh6aTqu");
    assert_eq!(block.previous_blockhash, "8qYtXeM8vqsw8KHpSZd4Bb8LWRvHYXmBVcZXe7nEfNaX");
    assert_eq!(block.parent_slot, 327_347_681);
    assert_eq!(block.block_height, 305_604_799);
    assert_eq!(block.block_time, 1_742_000_000);
    assert_eq!(block.transactions.len(), 3);
    assert_eq!(block.signatures.len(), 3);
    assert_eq!(
        block.signatures[1],
        "2SB7fVzaUyU8knSbEa42c2BKQJXm1QPamtiFXKapX6YwLbbAm7dzezaGKyXfb6uGRH8a1xTeovSmWnbgav7jeKCS"
    );
    for tx in &block.transactions {
        assert_eq!(tx.slot, 327_347_682);
    }
}

#[test]
fn portal_block_transfer_transaction() {
    let block = transform_value(load_value("portal_block.json")).unwrap();
    let tx = &block.transactions[0];
    let message = &tx.transaction.message;

    assert_eq!(message.account_keys.len(), 4);
    assert_eq!(message.header.num_readonly_unsigned_accounts, 2);
    assert_eq!(message.instructions.len(), 2);
    assert_eq!(message.instructions[0].program_id_index, 3);
    assert_eq!(message.instructions[1].program_id_index, 2);
    assert_eq!(message.instructions[1].accounts, vec![0, 1]);
    assert!(tx.meta.inner_instructions.is_empty());

    assert_eq!(tx.meta.pre_balances, vec![1_000_000_000, 0]);
    assert_eq!(tx.meta.post_balances, vec![899_995_000, 100_000_000]);
    assert_eq!(tx.meta.fee, 5000);
    assert_eq!(tx.meta.compute_units_consumed, Some(450));
    assert_eq!(
        tx.meta.log_messages,
        vec![
            "Program 11111111111111111111111111111111 invoke [1]",
            "Program 11111111111111111111111111111111 success",
        ]
    );
}

#[test]
fn portal_block_swap_with_lookup_tables() {
    let block = transform_value(load_value("portal_block.json")).unwrap();
    let tx = &block.transactions[1];
    let message = &tx.transaction.message;

    assert_eq!(message.account_keys.len(), 7);
    assert_eq!(
        message.account_keys[5],
        "8SHPtQtMHcaAkRG8L2xLiMUgdqxAfpD5bv2qjY7GfEQq"
    );
    assert_eq!(
        message.account_keys[6],
        "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
    );
    assert_eq!(message.address_table_lookups.len(), 1);

    assert_eq!(message.instructions.len(), 1);
    assert_eq!(message.instructions[0].program_id_index, 3);
    assert_eq!(message.instructions[0].accounts, vec![0, 1, 5, 6, 4]);

    assert_eq!(tx.meta.inner_instructions.len(), 1);
    let group = &tx.meta.inner_instructions[0];
    assert_eq!(group.index, 0);
    assert_eq!(group.instructions.len(), 2);
    assert_eq!(group.instructions[0].accounts, vec![1, 5, 0]);
    assert_eq!(group.instructions[1].accounts, vec![5, 2, 0]);
    assert!(group.instructions.iter().all(|ix| ix.stack_height == Some(2)));

    let pre: Vec<(u16, &str)> = tx
        .meta
        .pre_token_balances
        .iter()
        .map(|b| (b.account_index, b.ui_token_amount.ui_amount_string.as_str()))
        .collect();
    assert_eq!(pre, vec![(1, "25"), (5, "1000000")]);

    let post: Vec<(u16, &str)> = tx
        .meta
        .post_token_balances
        .iter()
        .map(|b| (b.account_index, b.ui_token_amount.ui_amount_string.as_str()))
        .collect();
    assert_eq!(post, vec![(1, "15"), (2, "0.052"), (5, "1000010")]);

    assert_eq!(
        tx.meta.log_messages[..2],
        ["Program log: Instruction: Route", "Program log: Instruction: Transfer"]
    );
    assert!(tx.meta.log_messages[2].starts_with("Program data: QMqFu4fYGGeUEysFnenhAv"));
}

#[test]
fn portal_block_failed_transaction_keeps_error() {
    let block = transform_value(load_value("portal_block.json")).unwrap();
    let tx = &block.transactions[2];

    let err = tx.meta.err.as_ref().unwrap();
    assert_eq!(err["InstructionError"][1]["Custom"], 6001);
    assert_eq!(tx.transaction.message.instructions.len(), 1);
    assert_eq!(tx.meta.pre_balances, vec![20_000_000]);
    assert!(tx.meta.pre_token_balances.is_empty());
    assert!(tx.meta.log_messages.is_empty());
}

#[test]
fn portal_block_rewards() {
    let block = transform_value(load_value("portal_block.json")).unwrap();
    assert_eq!(block.rewards.len(), 1);
    let reward = &block.rewards[0];
    assert_eq!(reward.lamports, 13_517_530);
    assert_eq!(reward.post_balance, 41_832_697_146);
    assert_eq!(reward.reward_type, Some(RewardType::Fee));
    assert_eq!(reward.commission, None);
}

#[test]
fn portal_block_serializes_with_rpc_field_names() {
    let block = transform_value(load_value("portal_block.json")).unwrap();
    let json = serde_json::to_value(&block).unwrap();

    assert_eq!(json["blockHeight"], 305_604_799);
    assert_eq!(json["parentSlot"], 327_347_681);
    assert!(json["previousBlockhash"].is_string());

    let swap = &json["transactions"][1];
    assert_eq!(swap["version"], 0);
    assert_eq!(json["transactions"][0]["version"], "legacy");
    assert_eq!(swap["transaction"]["message"]["instructions"][0]["programIdIndex"], 3);
    assert_eq!(
        swap["meta"]["innerInstructions"][0]["instructions"][0]["stackHeight"],
        2
    );
    assert_eq!(
        swap["meta"]["postTokenBalances"][1]["uiTokenAmount"]["uiAmountString"],
        "0.052"
    );
    assert_eq!(swap["meta"]["loadedAddresses"]["readonly"][0], "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
    assert_eq!(json["rewards"][0]["rewardType"], "Fee");
}

#[test]
fn portal_block_instruction_count_is_preserved() {
    let value = load_value("portal_block.json");
    let raw_count = value["instructions"].as_array().unwrap().len();
    let block = transform_value(value).unwrap();

    let compiled: usize = block
        .transactions
        .iter()
        .map(|tx| {
            tx.transaction.message.instructions.len()
                + tx
                    .meta
                    .inner_instructions
                    .iter()
                    .map(|g| g.instructions.len())
                    .sum::<usize>()
        })
        .sum();
    assert_eq!(compiled, raw_count);
}

// ──────────────────── failures ────────────────────

#[test]
fn unresolvable_program_fails_the_block() {
    let mut value = load_value("portal_block.json");
    value["instructions"][3]["programId"] = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8".into();

    match transform_value(value) {
        Err(Error::AddressNotFound {
            transaction_index,
            address,
        }) => {
            assert_eq!(transaction_index, 2);
            assert_eq!(address, "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8");
        }
        other => panic!("expected AddressNotFound, got {other:?}"),
    }
}

#[test]
fn token_balance_for_missing_transaction_fails_the_block() {
    let mut value = load_value("portal_block.json");
    value["tokenBalances"][0]["transactionIndex"] = 9.into();

    let err = transform_value(value).unwrap_err();
    assert!(matches!(
        err,
        Error::DanglingReference {
            record: "token balance",
            transaction_index: 9
        }
    ));
}

#[test]
fn malformed_fee_fails_the_block() {
    let mut value = load_value("portal_block.json");
    value["transactions"][1]["fee"] = "5,000".into();

    let err = transform_value(value).unwrap_err();
    assert!(matches!(err, Error::NumericParse { field: "fee", .. }));
    assert!(err.to_string().contains("transaction 2"));
}

// ──────────────────── legacy dialect & streams ────────────────────

#[test]
fn legacy_block_reads_slot_and_height() {
    let block = transform_value(load_value("legacy_block.json")).unwrap();

    assert_eq!(block.block_height, 305_604_799);
    assert_eq!(block.parent_slot, 327_347_680);
    assert_eq!(block.transactions[0].slot, 327_347_682);
    assert_eq!(block.transactions[0].version, None);
    assert_eq!(block.transactions[0].transaction.message.instructions.len(), 1);
    assert!(block.transactions[0].meta.pre_balances.is_empty());
    assert_eq!(block.rewards[0].reward_type, Some(RewardType::Rent));
    assert_eq!(block.rewards[0].lamports, -2_039_280);
}

#[test]
fn portal_stream_transforms_each_block() {
    let blocks = RawBlock::from_json_lines(&load_fixture("portal_stream.jsonl")).unwrap();
    assert_eq!(blocks.len(), 2);

    let transformed: Vec<Block> = blocks.iter().map(|b| transform_block(b).unwrap()).collect();
    assert!(transformed[0].transactions.is_empty());
    assert_eq!(transformed[1].previous_blockhash, "A1");
    assert_eq!(transformed[1].parent_slot, 327_347_682);
    assert_eq!(transformed[1].signatures, vec!["s"]);
}

#[test]
fn full_block_request_targets_the_fixture_slot() {
    let raw: RawBlock = serde_json::from_value(load_value("portal_block.json")).unwrap();
    let request = SolanaRequest::full_block(raw.header.slot, FieldSelection::portal());

    assert_eq!(request.from_block, 327_347_682);
    assert_eq!(request.to_block, 327_347_682);
    assert_eq!(request.kind, "solana");
    assert!(request.fields.block.contains_key("parentNumber"));
}
