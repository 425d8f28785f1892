use std::collections::HashMap;

use crate::error::Error;
use crate::model::AccountIndex;
use crate::types::{RawTransaction, TransactionIndex};

/// A transaction's account namespace: ordered segments of addresses, each
/// offset by the combined length of the segments before it.
///
/// For a regular transaction the segments are the static account keys, the
/// loaded writable addresses and the loaded readonly addresses.
#[derive(Debug)]
pub struct AddressSpace<'a> {
    transaction_index: TransactionIndex,
    segments: Vec<&'a [String]>,
    positions: HashMap<&'a str, usize>,
}

impl<'a> AddressSpace<'a> {
    pub fn new(
        transaction_index: TransactionIndex,
        segments: impl IntoIterator<Item = &'a [String]>,
    ) -> Self {
        let segments: Vec<&'a [String]> = segments.into_iter().collect();
        let mut positions = HashMap::new();
        let addresses = segments.iter().copied().flat_map(<[String]>::iter);
        for (position, address) in addresses.enumerate() {
            // first occurrence wins, matching an in-order search
            positions.entry(address.as_str()).or_insert(position);
        }
        Self {
            transaction_index,
            segments,
            positions,
        }
    }

    pub fn of(tx: &'a RawTransaction) -> Self {
        Self::new(
            tx.transaction_index,
            [
                tx.account_keys.as_slice(),
                tx.loaded_addresses.writable.as_slice(),
                tx.loaded_addresses.readonly.as_slice(),
            ],
        )
    }

    /// Every address in index order.
    pub fn keys(&self) -> impl Iterator<Item = &'a String> + '_ {
        self.segments.iter().copied().flat_map(<[String]>::iter)
    }

    pub fn resolve(&self, address: &str) -> Result<AccountIndex, Error> {
        let position = self
            .positions
            .get(address)
            .copied()
            .ok_or_else(|| Error::AddressNotFound {
                transaction_index: self.transaction_index,
                address: address.to_string(),
            })?;
        AccountIndex::try_from(position).map_err(|_| Error::AccountIndexOverflow {
            transaction_index: self.transaction_index,
            index: position,
        })
    }
}

/// Address spaces of every transaction in a block, keyed by transaction index.
#[derive(Debug, Default)]
pub struct AddressSpaces<'a> {
    by_transaction: HashMap<TransactionIndex, AddressSpace<'a>>,
}

impl<'a> AddressSpaces<'a> {
    pub fn new(transactions: &'a [RawTransaction]) -> Self {
        let mut by_transaction = HashMap::with_capacity(transactions.len());
        for tx in transactions {
            by_transaction
                .entry(tx.transaction_index)
                .or_insert_with(|| AddressSpace::of(tx));
        }
        Self { by_transaction }
    }

    /// Looks up the space owning a record; `record` names the record kind in the error.
    pub fn get(
        &self,
        transaction_index: TransactionIndex,
        record: &'static str,
    ) -> Result<&AddressSpace<'a>, Error> {
        self.by_transaction
            .get(&transaction_index)
            .ok_or(Error::DanglingReference {
                record,
                transaction_index,
            })
    }
}
