//! Transfer Executor
//!
//! Executes exactly one [`Transfer`](crate::payment::Transfer) end to end:
//!
//! ```text
//! Idle -> Loading(Init) -> ReadyToExecute -> Loading(SwitchingNetwork)
//!                                         -> Loading(SigningTransaction)
//!                                         -> Loading(ConfirmingTransaction) -> Success
//! ```
//!
//! with `Error` and `NeedToSwitchNetworkManually` reachable from the loading
//! stages. Provider errors are classified with
//! [`classify`](crate::classifier::classify) and either absorbed (retry,
//! automatic switch), surfaced as a warning, or surfaced as a terminal
//! [`ExecutionFailure`].
//!
//! Guarantees:
//!
//! - at most one signature is obtained between explicit resets;
//! - `execute()` while a drive is active issues nothing; during a
//!   `prepare()` it hands its intent to that drive instead;
//! - a signed transfer is never dropped by `reset()`; only
//!   [`TransferExecutor::discard_pending_transfer`] abandons it;
//! - completions issued before a reset never touch the reset state.

mod machine;
mod state;
mod status;

pub use machine::{ExecuteOutcome, TransferExecutor};
pub use state::{
    Event, ExecutionFailure, ExecutionState, ExecutionWarning, FailureKind, LoadingStage, Phase,
    Step,
};
pub use status::{ExecutionStatus, StatusKind, StatusProjector};
