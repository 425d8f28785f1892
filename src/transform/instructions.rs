use std::collections::HashMap;

use crate::error::Error;
use crate::model::{CompiledInstruction, InnerInstruction};
use crate::transform::address::{AddressSpace, AddressSpaces};
use crate::types::{RawInstruction, TransactionIndex};

/// Instructions of a block split per transaction into the top-level list
/// and the inner groups.
#[derive(Debug, Default)]
pub struct GroupedInstructions {
    pub top_level: HashMap<TransactionIndex, Vec<CompiledInstruction>>,
    pub inner: HashMap<TransactionIndex, Vec<InnerInstruction>>,
}

pub fn compile_instruction(
    ix: &RawInstruction,
    space: &AddressSpace<'_>,
) -> Result<CompiledInstruction, Error> {
    if !ix.data.is_empty() {
        bs58::decode(&ix.data)
            .into_vec()
            .map_err(|e| Error::InstructionData {
                transaction_index: ix.transaction_index,
                reason: e.to_string(),
            })?;
    }

    let program_id_index = space.resolve(&ix.program_id)?;
    let accounts = ix
        .accounts
        .iter()
        .map(|account| space.resolve(account))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledInstruction {
        program_id_index,
        accounts,
        data: ix.data.clone(),
        stack_height: Some(ix.instruction_address.len() as u32),
    })
}

/// Splits a block's flat instruction rows into per-transaction top-level
/// lists and inner groups.
///
/// A path of length one is a top-level instruction. Anything longer lands in
/// the group of the top-level instruction named by the path's first element;
/// deeper call levels are not distinguished. Groups keep first-seen order.
pub fn group_instructions(
    instructions: &[RawInstruction],
    spaces: &AddressSpaces<'_>,
) -> Result<GroupedInstructions, Error> {
    let mut top_level: HashMap<TransactionIndex, Vec<(u32, CompiledInstruction)>> =
        HashMap::new();
    let mut inner: HashMap<TransactionIndex, Vec<InnerInstruction>> = HashMap::new();
    let mut group_positions: HashMap<(TransactionIndex, u32), usize> = HashMap::new();

    for ix in instructions {
        let space = spaces.get(ix.transaction_index, "instruction")?;
        let compiled = compile_instruction(ix, space)?;

        match ix.instruction_address.as_slice() {
            [] => {
                return Err(Error::InvalidInstructionAddress {
                    transaction_index: ix.transaction_index,
                });
            }
            [position] => {
                top_level
                    .entry(ix.transaction_index)
                    .or_default()
                    .push((*position, compiled));
            }
            [parent, ..] => {
                let groups = inner.entry(ix.transaction_index).or_default();
                let slot = *group_positions
                    .entry((ix.transaction_index, *parent))
                    .or_insert_with(|| {
                        groups.push(InnerInstruction {
                            index: *parent,
                            instructions: Vec::new(),
                        });
                        groups.len() - 1
                    });
                groups[slot].instructions.push(compiled);
            }
        }
    }

    let top_level: HashMap<TransactionIndex, Vec<CompiledInstruction>> = top_level
        .into_iter()
        .map(|(tx_index, mut list)| {
            // archive order is program order already; the stable sort only guards it
            list.sort_by_key(|(position, _)| *position);
            (tx_index, list.into_iter().map(|(_, ix)| ix).collect())
        })
        .collect();

    tracing::trace!(
        rows = instructions.len(),
        inner_groups = inner.values().map(Vec::len).sum::<usize>(),
        "grouped instructions"
    );

    Ok(GroupedInstructions { top_level, inner })
}
