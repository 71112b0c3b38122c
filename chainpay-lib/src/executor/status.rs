//! Read-only execution status snapshots.

use super::state::{ExecutionFailure, ExecutionState, ExecutionWarning, LoadingStage, Phase};
use crate::payment::Transfer;
use crate::wallet::{Receipt, TxHandle};
use serde::Serialize;

/// Coarse status tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Idle,
    Loading,
    ReadyToExecute,
    NeedToSwitchNetworkManually,
    Success,
    Error,
}

/// Snapshot of an executor, as seen by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecutionStatus {
    /// The transfer being executed.
    pub active_transfer: Transfer,
    pub kind: StatusKind,
    /// Set while `kind` is [`StatusKind::Loading`].
    pub loading_stage: Option<LoadingStage>,
    /// Terminal failure, requires reset.
    pub failure: Option<ExecutionFailure>,
    /// Dismissable problem; the action can be retried.
    pub warning: Option<ExecutionWarning>,
    pub is_loading: bool,
    pub is_need_to_switch_network_manually: bool,
    /// The wallet is prompting for a signature.
    pub is_user_signing: bool,
    /// A signature was obtained for the active transfer.
    pub is_user_signed: bool,
    /// Latched: stays true until explicit reset.
    pub is_success: bool,
    pub is_error: bool,
    pub tx: Option<TxHandle>,
    pub receipt: Option<Receipt>,
    /// Automatic retries spent since the last explicit reset.
    pub retries: u32,
}

/// Builds [`ExecutionStatus`] values from state.
///
/// Once a snapshot reports success, later snapshots keep reporting it (and
/// its receipt) until [`clear`](Self::clear) is called on explicit reset.
#[derive(Clone, Debug, Default)]
pub struct StatusProjector {
    success: Option<Receipt>,
}

impl StatusProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project `state` into a snapshot.
    pub fn project(&mut self, state: &ExecutionState) -> ExecutionStatus {
        if state.phase() == Phase::Success {
            if let Some(receipt) = state.receipt() {
                self.success = Some(receipt.clone());
            }
        }

        let (kind, loading_stage) = match state.phase() {
            Phase::Idle => (StatusKind::Idle, None),
            Phase::Loading(stage) => (StatusKind::Loading, Some(stage)),
            Phase::ReadyToExecute => (StatusKind::ReadyToExecute, None),
            Phase::NeedToSwitchNetworkManually => (StatusKind::NeedToSwitchNetworkManually, None),
            Phase::Success => (StatusKind::Success, None),
            Phase::Error => (StatusKind::Error, None),
        };

        let latched = self.success.is_some();
        let (kind, loading_stage) = if latched {
            (StatusKind::Success, None)
        } else {
            (kind, loading_stage)
        };

        ExecutionStatus {
            active_transfer: state.active_transfer().clone(),
            kind,
            loading_stage,
            failure: state.failure().cloned(),
            warning: state.warning().cloned(),
            is_loading: loading_stage.is_some(),
            is_need_to_switch_network_manually: kind == StatusKind::NeedToSwitchNetworkManually,
            is_user_signing: loading_stage == Some(LoadingStage::SigningTransaction),
            is_user_signed: state.user_signed_transaction() || latched,
            is_success: latched,
            is_error: kind == StatusKind::Error,
            tx: state.tx().cloned(),
            receipt: self.success.clone().or_else(|| state.receipt().cloned()),
            retries: state.retries(),
        }
    }

    /// Drop the success latch.
    pub fn clear(&mut self) {
        self.success = None;
    }
}
