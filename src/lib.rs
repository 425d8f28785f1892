#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::dbg_macro,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::panic,
    )
)]

pub mod error;
pub mod model;
pub mod request;
pub mod transform;
pub mod types;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::Error;
pub use model::{
    AccountIndex, Block, BlockReward, CompiledInstruction, InnerInstruction, Log, RewardType,
    TokenBalance, Transaction, TransactionMeta, UiTokenAmount,
};
pub use request::{BlockFilter, FieldSelection, SolanaRequest};
pub use transform::amount::{ScaledAmount, scale};
pub use transform::{transform_block, transform_reward};
pub use types::{
    LogKind, RawBalance, RawBlock, RawBlockHeader, RawInstruction, RawLog, RawReward,
    RawTokenBalance, RawTransaction, TransactionIndex,
};
