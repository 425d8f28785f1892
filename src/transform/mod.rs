//! Rebuilds a canonical block from one flat archive block.
//!
//! Every relationship in the archive shape is implicit: records point at their
//! transaction by index and instructions locate themselves with an address path.
//! The groupers below re-derive those links in one pass each over the block, and
//! the assembler then hands every transaction its slice of the grouped data.

pub mod address;
pub mod amount;
pub mod balances;
pub mod instructions;
pub mod logs;
pub mod transaction;

use crate::error::Error;
use crate::model::{Block, BlockReward, RewardType};
use crate::types::{RawBlock, RawReward};

use self::address::AddressSpaces;
use self::balances::{group_balances, group_token_balances};
use self::instructions::group_instructions;
use self::logs::group_logs;
use self::transaction::{TransactionParts, assemble_transaction};

/// Transforms one archive block into its RPC form.
///
/// Fails as a whole: any unresolved address, dangling record or unparsable
/// number aborts the block and no partial result is produced.
pub fn transform_block(raw: &RawBlock) -> Result<Block, Error> {
    let spaces = AddressSpaces::new(&raw.transactions);

    let mut balances = group_balances(&raw.balances, &spaces)?;
    let mut token_balances = group_token_balances(&raw.token_balances, &spaces)?;
    let mut instructions = group_instructions(&raw.instructions, &spaces)?;
    let mut logs = group_logs(&raw.logs, &spaces)?;

    let mut transactions = Vec::with_capacity(raw.transactions.len());
    for tx in &raw.transactions {
        let index = tx.transaction_index;
        let balance_lists = balances.remove(&index).unwrap_or_default();
        let token_lists = token_balances.remove(&index).unwrap_or_default();
        // a repeated index finds its slice already taken by the first owner
        let parts = TransactionParts {
            pre_balances: balance_lists.pre,
            post_balances: balance_lists.post,
            pre_token_balances: token_lists.pre,
            post_token_balances: token_lists.post,
            instructions: instructions.top_level.remove(&index).unwrap_or_default(),
            inner_instructions: instructions.inner.remove(&index).unwrap_or_default(),
            logs: logs.remove(&index).unwrap_or_default(),
        };
        transactions.push(assemble_transaction(tx, &raw.header, parts)?);
    }

    let rewards = raw
        .rewards
        .iter()
        .map(transform_reward)
        .collect::<Result<Vec<_>, _>>()?;

    let signatures = raw
        .transactions
        .iter()
        .filter_map(|tx| tx.signatures.first().cloned())
        .collect();

    tracing::debug!(
        slot = raw.header.slot,
        transactions = transactions.len(),
        instructions = raw.instructions.len(),
        rewards = rewards.len(),
        "transformed block"
    );

    Ok(Block {
        blockhash: raw.header.hash.clone(),
        previous_blockhash: raw.header.parent_hash.clone(),
        parent_slot: raw.header.parent_slot,
        transactions,
        signatures,
        rewards,
        block_time: raw.header.timestamp,
        block_height: raw.header.height,
    })
}

pub fn transform_reward(raw: &RawReward) -> Result<BlockReward, Error> {
    let location = || format!("reward {}", raw.pubkey);

    let lamports = raw
        .lamports
        .parse::<i64>()
        .map_err(|e| Error::NumericParse {
            field: "reward lamports",
            value: raw.lamports.clone(),
            location: location(),
            reason: e.to_string(),
        })?;
    let post_balance = raw
        .post_balance
        .parse::<u64>()
        .map_err(|e| Error::NumericParse {
            field: "reward post balance",
            value: raw.post_balance.clone(),
            location: location(),
            reason: e.to_string(),
        })?;

    let reward_type = raw
        .reward_type
        .as_deref()
        .map(|tag| {
            tag.parse::<RewardType>()
                .map_err(|_| Error::UnknownRewardType {
                    pubkey: raw.pubkey.clone(),
                    value: tag.to_string(),
                })
        })
        .transpose()?;

    Ok(BlockReward {
        pubkey: raw.pubkey.clone(),
        lamports,
        post_balance,
        reward_type,
        commission: raw.commission,
    })
}
