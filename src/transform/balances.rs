use std::collections::HashMap;

use crate::error::Error;
use crate::model::{AccountIndex, TokenBalance};
use crate::transform::address::AddressSpaces;
use crate::transform::amount::ui_token_amount;
use crate::types::{RawBalance, RawTokenBalance, TokenBalanceFacet, TransactionIndex};

/// Lamport balances of the accounts a transaction changed, index-parallel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceLists {
    pub pre: Vec<u64>,
    pub post: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenBalanceLists {
    pub pre: Vec<TokenBalance>,
    pub post: Vec<TokenBalance>,
}

fn parse_lamports(
    field: &'static str,
    value: &str,
    balance: &RawBalance,
) -> Result<u64, Error> {
    value.parse().map_err(|e: std::num::ParseIntError| Error::NumericParse {
        field,
        value: value.to_string(),
        location: format!(
            "transaction {}, account {}",
            balance.transaction_index, balance.account
        ),
        reason: e.to_string(),
    })
}

/// Groups balance rows per transaction, ordered by resolved account index.
pub fn group_balances(
    balances: &[RawBalance],
    spaces: &AddressSpaces<'_>,
) -> Result<HashMap<TransactionIndex, BalanceLists>, Error> {
    let mut rows: HashMap<TransactionIndex, Vec<(AccountIndex, u64, u64)>> = HashMap::new();

    for balance in balances {
        let space = spaces.get(balance.transaction_index, "balance")?;
        let account_index = space.resolve(&balance.account)?;
        let pre = parse_lamports("pre balance", &balance.pre, balance)?;
        let post = parse_lamports("post balance", &balance.post, balance)?;
        rows.entry(balance.transaction_index)
            .or_default()
            .push((account_index, pre, post));
    }

    Ok(rows
        .into_iter()
        .map(|(tx_index, mut entries)| {
            entries.sort_by_key(|(account_index, _, _)| *account_index);
            let (pre, post) = entries.into_iter().map(|(_, pre, post)| (pre, post)).unzip();
            (tx_index, BalanceLists { pre, post })
        })
        .collect())
}

fn token_balance(
    account_index: AccountIndex,
    facet: TokenBalanceFacet<'_>,
    location: &str,
) -> Result<TokenBalance, Error> {
    Ok(TokenBalance {
        account_index,
        mint: facet.mint.to_string(),
        owner: Some(facet.owner.to_string()),
        program_id: facet.program_id.map(str::to_string),
        ui_token_amount: ui_token_amount(facet.amount, facet.decimals, location)?,
    })
}

/// Groups token balance rows per transaction. The pre and post sides of a
/// row are built independently, and each list is ordered by account index.
/// Rows without an owner on either side are skipped before their account is
/// resolved.
pub fn group_token_balances(
    token_balances: &[RawTokenBalance],
    spaces: &AddressSpaces<'_>,
) -> Result<HashMap<TransactionIndex, TokenBalanceLists>, Error> {
    let mut out: HashMap<TransactionIndex, TokenBalanceLists> = HashMap::new();

    for balance in token_balances {
        let space = spaces.get(balance.transaction_index, "token balance")?;
        let (pre, post) = (balance.pre(), balance.post());
        // no owner on either side: nothing to emit
        if pre.is_none() && post.is_none() {
            continue;
        }

        let account_index = space.resolve(&balance.account)?;
        let location = format!(
            "transaction {}, account {}",
            balance.transaction_index, balance.account
        );

        let lists = out.entry(balance.transaction_index).or_default();
        if let Some(pre) = pre {
            lists.pre.push(token_balance(account_index, pre, &location)?);
        }
        if let Some(post) = post {
            lists.post.push(token_balance(account_index, post, &location)?);
        }
    }

    for lists in out.values_mut() {
        lists.pre.sort_by_key(|b| b.account_index);
        lists.post.sort_by_key(|b| b.account_index);
    }

    Ok(out)
}
