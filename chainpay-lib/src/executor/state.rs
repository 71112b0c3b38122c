//! Transfer execution state machine.
//!
//! [`ExecutionState`] holds no wallet and performs no I/O. The driver asks
//! it for the next [`Step`], performs the step against the wallet, and
//! feeds the outcome back as an [`Event`]. All transitions happen here,
//! synchronously.

use crate::classifier::{classify, ErrorKind};
use crate::config::ExecutorConfig;
use crate::errors::ResetRefusal;
use crate::payment::Transfer;
use crate::wallet::{PreparedTransfer, ProviderError, Receipt, TxHandle};
use crate::NetworkId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sub-stage of [`Phase::Loading`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingStage {
    /// Preparing the transfer (fee estimation).
    Init,
    /// Waiting for the signer to change networks.
    SwitchingNetwork,
    /// Waiting for the user to sign.
    SigningTransaction,
    /// Waiting for confirmations.
    ConfirmingTransaction,
}

/// Lifecycle phase of an execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Constructed, not yet prepared.
    Idle,
    /// Work in progress.
    Loading(LoadingStage),
    /// Prepared; `execute()` will proceed.
    ReadyToExecute,
    /// The signer must change networks outside the executor.
    NeedToSwitchNetworkManually,
    /// Transfer confirmed.
    Success,
    /// Terminal until reset.
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading(stage) => write!(f, "loading({:?})", stage),
            Self::ReadyToExecute => write!(f, "ready_to_execute"),
            Self::NeedToSwitchNetworkManually => write!(f, "need_to_switch_network_manually"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Why an execution ended in [`Phase::Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unclassified or unrecoverable provider error.
    Fatal,
    /// A retryable error persisted past the retry bound.
    RetriesExhausted,
    /// The payer cannot pay the network fee on this network.
    FeeUnaffordable,
    /// The signer never reported the requested network.
    NetworkSwitchTimeout,
    /// The driver was dropped while a signature was requested; the
    /// outcome of that request is unknown.
    Interrupted,
}

/// A surfaced, terminal failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Classification of the provider error, if one caused it.
    pub error_kind: Option<ErrorKind>,
    /// The provider error, if one caused it.
    pub error: Option<ProviderError>,
}

impl ExecutionFailure {
    fn from_provider(kind: FailureKind, error_kind: ErrorKind, error: ProviderError) -> Self {
        Self {
            kind,
            error_kind: Some(error_kind),
            error: Some(error),
        }
    }

    fn bare(kind: FailureKind) -> Self {
        Self {
            kind,
            error_kind: None,
            error: None,
        }
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Fatal => write!(f, "transfer failed")?,
            FailureKind::RetriesExhausted => write!(f, "transfer failed after retrying")?,
            FailureKind::FeeUnaffordable => write!(f, "cannot afford the network fee")?,
            FailureKind::NetworkSwitchTimeout => write!(f, "network switch timed out")?,
            FailureKind::Interrupted => write!(f, "signature request interrupted")?,
        }
        if let Some(error) = &self.error {
            write!(f, ": {}", error)?;
        }
        Ok(())
    }
}

/// A dismissable, non-terminal problem; the action can be re-offered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionWarning {
    /// Classification of the provider error.
    pub kind: ErrorKind,
    /// The provider error.
    pub error: ProviderError,
}

impl fmt::Display for ExecutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// What the driver should do next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Call `prepare_transfer`.
    Prepare(Transfer),
    /// Call `switch_network` and poll until it lands.
    Switch(NetworkId),
    /// Call `sign_and_send`.
    Sign(PreparedTransfer),
    /// Call `wait_for_confirmation`.
    Confirm(TxHandle),
    /// Nothing to do until the caller acts.
    Done,
}

/// Outcome of a [`Step`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// `prepare_transfer` succeeded.
    Prepared(PreparedTransfer),
    /// `prepare_transfer` failed.
    PrepareFailed(ProviderError),
    /// The signer reports the requested network.
    SwitchConfirmed,
    /// `switch_network` failed.
    SwitchFailed(ProviderError),
    /// Polling budget exhausted.
    SwitchTimedOut,
    /// `sign_and_send` succeeded.
    Signed(TxHandle),
    /// `sign_and_send` failed.
    SignFailed(ProviderError),
    /// `wait_for_confirmation` succeeded.
    Confirmed(Receipt),
    /// `wait_for_confirmation` failed.
    ConfirmFailed(ProviderError),
}

/// Mutable core of one transfer execution.
#[derive(Clone, Debug)]
pub struct ExecutionState {
    phase: Phase,
    active_transfer: Transfer,
    latest_transfer: Transfer,
    prepared: Option<PreparedTransfer>,
    tx: Option<TxHandle>,
    receipt: Option<Receipt>,
    user_signed_transaction: bool,
    retries: u32,
    last_error: Option<ErrorKind>,
    failure: Option<ExecutionFailure>,
    warning: Option<ExecutionWarning>,
    auto_execute: bool,
    switch_attempted: bool,
    generation: u64,
}

impl ExecutionState {
    /// Create an idle state for `transfer`.
    pub fn new(transfer: Transfer) -> Self {
        Self {
            phase: Phase::Idle,
            active_transfer: transfer.clone(),
            latest_transfer: transfer,
            prepared: None,
            tx: None,
            receipt: None,
            user_signed_transaction: false,
            retries: 0,
            last_error: None,
            failure: None,
            warning: None,
            auto_execute: false,
            switch_attempted: false,
            generation: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The transfer being executed. Only changes on reset.
    pub fn active_transfer(&self) -> &Transfer {
        &self.active_transfer
    }

    /// The most recent transfer supplied by the caller.
    pub fn latest_transfer(&self) -> &Transfer {
        &self.latest_transfer
    }

    /// Prepared transfer, cleared whenever it must be prepared again.
    pub fn prepared(&self) -> Option<&PreparedTransfer> {
        self.prepared.as_ref()
    }

    /// Broadcast transaction, once signed.
    pub fn tx(&self) -> Option<&TxHandle> {
        self.tx.as_ref()
    }

    /// Confirmation receipt, once confirmed.
    pub fn receipt(&self) -> Option<&Receipt> {
        self.receipt.as_ref()
    }

    /// True once a signature was obtained, until reset.
    pub fn user_signed_transaction(&self) -> bool {
        self.user_signed_transaction
    }

    /// Automatic retries spent since the last explicit reset.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Most recent classified provider error.
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    /// Terminal failure, set in [`Phase::Error`].
    pub fn failure(&self) -> Option<&ExecutionFailure> {
        self.failure.as_ref()
    }

    /// Dismissable warning from the last attempt.
    pub fn warning(&self) -> Option<&ExecutionWarning> {
        self.warning.as_ref()
    }

    /// Incremented on every reset; completions from older generations are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Network the active transfer must be signed on.
    pub fn required_network(&self) -> NetworkId {
        self.active_transfer.network_id()
    }

    fn transition(&mut self, next: Phase) {
        if self.phase != next {
            tracing::debug!(from = %self.phase, to = %next, generation = self.generation, "transition");
            self.phase = next;
        }
    }

    fn fail(&mut self, failure: ExecutionFailure) {
        tracing::warn!(%failure, "execution failed");
        self.failure = Some(failure);
        self.auto_execute = false;
        self.transition(Phase::Error);
    }

    fn warn(&mut self, kind: ErrorKind, error: ProviderError) {
        tracing::warn!(%kind, %error, "execution paused");
        self.warning = Some(ExecutionWarning { kind, error });
        self.auto_execute = false;
        self.transition(Phase::ReadyToExecute);
    }

    /// Register a caller's request to execute.
    ///
    /// Returns false when the current phase cannot make progress from an
    /// `execute()` call.
    pub fn request_execute(&mut self) -> bool {
        match self.phase {
            Phase::Idle => {
                self.transition(Phase::Loading(LoadingStage::Init));
            }
            Phase::NeedToSwitchNetworkManually => {
                self.transition(Phase::ReadyToExecute);
            }
            Phase::Loading(LoadingStage::Init) | Phase::ReadyToExecute => {}
            // Resuming an interrupted drive. Signing is never resumed.
            Phase::Loading(LoadingStage::SwitchingNetwork)
            | Phase::Loading(LoadingStage::ConfirmingTransaction) => return true,
            Phase::Loading(LoadingStage::SigningTransaction) | Phase::Success | Phase::Error => {
                return false
            }
        }
        self.auto_execute = true;
        self.switch_attempted = false;
        self.warning = None;
        true
    }

    /// Hand an `execute()` request to a drive that is still preparing.
    ///
    /// Returns false outside `Loading(Init)` or when the drive already
    /// carries an execute intent.
    pub fn queue_execute(&mut self) -> bool {
        if self.phase != Phase::Loading(LoadingStage::Init) || self.auto_execute {
            return false;
        }
        tracing::debug!("execute requested while preparing");
        self.auto_execute = true;
        self.switch_attempted = false;
        self.warning = None;
        true
    }

    /// Register a caller's request to prepare without executing.
    pub fn request_prepare(&mut self) -> bool {
        match self.phase {
            Phase::Idle => {
                self.transition(Phase::Loading(LoadingStage::Init));
                true
            }
            Phase::Loading(LoadingStage::Init) => true,
            _ => false,
        }
    }

    /// Decide the next step and enter the matching loading stage.
    pub fn next_step(&mut self, active_network: Option<NetworkId>, can_switch: bool) -> Step {
        match self.phase {
            Phase::Loading(LoadingStage::Init) => Step::Prepare(self.active_transfer.clone()),
            Phase::ReadyToExecute if self.auto_execute => {
                self.auto_execute = false;
                if active_network == Some(self.required_network()) {
                    self.transition(Phase::Loading(LoadingStage::SigningTransaction));
                } else {
                    self.transition(Phase::Loading(LoadingStage::SwitchingNetwork));
                }
                self.next_step(active_network, can_switch)
            }
            Phase::Loading(LoadingStage::SwitchingNetwork) => {
                if can_switch {
                    self.switch_attempted = true;
                    Step::Switch(self.required_network())
                } else {
                    tracing::debug!(network = %self.required_network(), "wallet cannot switch networks");
                    self.transition(Phase::NeedToSwitchNetworkManually);
                    Step::Done
                }
            }
            Phase::Loading(LoadingStage::SigningTransaction) => match &self.prepared {
                Some(prepared) if !self.user_signed_transaction => Step::Sign(prepared.clone()),
                _ if self.user_signed_transaction => match &self.tx {
                    Some(tx) => {
                        let tx = tx.clone();
                        self.transition(Phase::Loading(LoadingStage::ConfirmingTransaction));
                        Step::Confirm(tx)
                    }
                    None => Step::Done,
                },
                _ => {
                    self.auto_execute = true;
                    self.transition(Phase::Loading(LoadingStage::Init));
                    Step::Prepare(self.active_transfer.clone())
                }
            },
            Phase::Loading(LoadingStage::ConfirmingTransaction) => match &self.tx {
                Some(tx) => Step::Confirm(tx.clone()),
                None => {
                    self.fail(ExecutionFailure::bare(FailureKind::Fatal));
                    Step::Done
                }
            },
            _ => Step::Done,
        }
    }

    /// Apply the outcome of a step.
    pub fn apply(&mut self, event: Event, config: &ExecutorConfig) {
        match event {
            Event::Prepared(prepared) => {
                if self.phase == Phase::Loading(LoadingStage::Init) {
                    self.prepared = Some(prepared);
                    self.transition(Phase::ReadyToExecute);
                }
            }
            Event::PrepareFailed(error) => {
                let kind = self.record(&error);
                match kind {
                    ErrorKind::ChainMismatch if !self.switch_attempted => {
                        self.prepared = None;
                        if self.auto_execute {
                            tracing::debug!("chain mismatch while preparing, switching networks");
                            self.transition(Phase::Loading(LoadingStage::SwitchingNetwork));
                        } else {
                            tracing::debug!("chain mismatch while preparing, waiting for execute()");
                            self.transition(Phase::ReadyToExecute);
                        }
                    }
                    _ if self.retry_unsigned(kind, &error, config) => {}
                    _ => self.fail_with(kind, error),
                }
            }
            Event::SwitchConfirmed => {
                // One-shot: the next step signs without another execute().
                self.auto_execute = true;
                self.transition(Phase::ReadyToExecute);
            }
            Event::SwitchFailed(error) => {
                let kind = self.record(&error);
                match kind {
                    ErrorKind::UserRejectedNetworkAdd
                    | ErrorKind::UserRejectedNetworkSwitch
                    | ErrorKind::NetworkSwitchNonFatal => self.warn(kind, error),
                    _ if self.retry_unsigned(kind, &error, config) => {}
                    ErrorKind::FeeUnaffordable | ErrorKind::RetryableProviderError => {
                        self.fail_with(kind, error)
                    }
                    _ => {
                        tracing::warn!(%error, "network switch failed");
                        self.auto_execute = false;
                        self.transition(Phase::NeedToSwitchNetworkManually);
                    }
                }
            }
            Event::SwitchTimedOut => {
                self.fail(ExecutionFailure::bare(FailureKind::NetworkSwitchTimeout));
            }
            Event::Signed(tx) => {
                tracing::info!(hash = %tx.hash, network = %tx.network_id, "transaction signed");
                self.user_signed_transaction = true;
                self.tx = Some(tx);
                self.transition(Phase::Loading(LoadingStage::ConfirmingTransaction));
            }
            Event::SignFailed(error) => {
                let kind = self.record(&error);
                match kind {
                    ErrorKind::UserRejectedTransaction
                    | ErrorKind::UserRejectedNetworkAdd
                    | ErrorKind::UserRejectedNetworkSwitch
                    | ErrorKind::NetworkSwitchNonFatal => self.warn(kind, error),
                    ErrorKind::ChainMismatch if !self.switch_attempted => {
                        tracing::debug!("chain mismatch while signing, switching networks");
                        self.transition(Phase::Loading(LoadingStage::SwitchingNetwork));
                    }
                    _ if self.retry_unsigned(kind, &error, config) => {}
                    _ => self.fail_with(kind, error),
                }
            }
            Event::Confirmed(receipt) => {
                tracing::info!(hash = %receipt.tx_hash, block = receipt.block_number, "transfer confirmed");
                self.receipt = Some(receipt);
                self.transition(Phase::Success);
            }
            Event::ConfirmFailed(error) => {
                let kind = self.record(&error);
                match kind {
                    ErrorKind::EphemeralPrepareError => {
                        tracing::debug!(%error, "re-waiting for confirmation");
                    }
                    ErrorKind::RetryableProviderError if self.retries < config.max_automatic_retries => {
                        self.retries += 1;
                        tracing::debug!(retries = self.retries, "re-waiting for confirmation");
                    }
                    // The signer left the transaction's network; move it back
                    // and wait on the same handle.
                    ErrorKind::ChainMismatch if self.retries < config.max_automatic_retries => {
                        self.retries += 1;
                        tracing::debug!(retries = self.retries, "chain mismatch while confirming, switching back");
                        self.auto_execute = true;
                        self.transition(Phase::Loading(LoadingStage::SwitchingNetwork));
                    }
                    ErrorKind::ChainMismatch => self.fail(ExecutionFailure::from_provider(
                        FailureKind::RetriesExhausted,
                        kind,
                        error,
                    )),
                    _ => self.fail_with(kind, error),
                }
            }
        }
    }

    fn record(&mut self, error: &ProviderError) -> ErrorKind {
        let kind = classify(error);
        self.last_error = Some(kind);
        kind
    }

    /// Re-prepare after an ephemeral or retryable error in an unsigned
    /// stage. Returns false when the error is neither or the bound is hit.
    fn retry_unsigned(&mut self, kind: ErrorKind, error: &ProviderError, config: &ExecutorConfig) -> bool {
        match kind {
            ErrorKind::EphemeralPrepareError => {}
            ErrorKind::RetryableProviderError if self.retries < config.max_automatic_retries => {
                self.retries += 1;
            }
            _ => return false,
        }
        tracing::debug!(%kind, %error, retries = self.retries, "re-preparing transfer");
        // Keep an outstanding execute() intent across the re-prepare.
        self.auto_execute = self.auto_execute || self.phase != Phase::Loading(LoadingStage::Init);
        self.prepared = None;
        self.transition(Phase::Loading(LoadingStage::Init));
        true
    }

    fn fail_with(&mut self, kind: ErrorKind, error: ProviderError) {
        let failure = match kind {
            ErrorKind::FeeUnaffordable => FailureKind::FeeUnaffordable,
            ErrorKind::RetryableProviderError => FailureKind::RetriesExhausted,
            _ => FailureKind::Fatal,
        };
        self.fail(ExecutionFailure::from_provider(failure, kind, error));
    }

    /// Check whether a reset would abandon a signature.
    pub fn check_reset(&self) -> Result<(), ResetRefusal> {
        self.check_discard()?;
        if self.user_signed_transaction && self.receipt.is_none() {
            return Err(ResetRefusal::AwaitingConfirmation);
        }
        Ok(())
    }

    /// Check whether the pending transfer may be discarded.
    pub fn check_discard(&self) -> Result<(), ResetRefusal> {
        if self.phase == Phase::Loading(LoadingStage::SigningTransaction) {
            return Err(ResetRefusal::SignatureInFlight);
        }
        Ok(())
    }

    /// Recache the latest transfer and return to `Loading(Init)`.
    ///
    /// `explicit` resets also zero the retry counter.
    pub fn reset(&mut self, explicit: bool) {
        self.generation += 1;
        self.active_transfer = self.latest_transfer.clone();
        self.prepared = None;
        self.tx = None;
        self.receipt = None;
        self.user_signed_transaction = false;
        self.failure = None;
        self.warning = None;
        self.auto_execute = false;
        self.switch_attempted = false;
        if explicit {
            self.retries = 0;
            self.last_error = None;
        }
        self.transition(Phase::Loading(LoadingStage::Init));
    }

    /// Record a new caller transfer. Returns true if it triggered an
    /// automatic reset onto it.
    pub fn set_transfer(&mut self, transfer: Transfer) -> bool {
        self.latest_transfer = transfer;
        if self.latest_transfer == self.active_transfer {
            return false;
        }
        let signing = self.phase == Phase::Loading(LoadingStage::SigningTransaction);
        if signing || self.user_signed_transaction || self.phase == Phase::Success {
            tracing::debug!("transfer changed during signature, keeping active transfer");
            return false;
        }
        self.reset(false);
        true
    }

    /// The caller saw the signer change networks.
    pub fn network_changed(&mut self, network_id: Option<NetworkId>) {
        if self.phase == Phase::NeedToSwitchNetworkManually
            && network_id == Some(self.required_network())
        {
            self.transition(Phase::ReadyToExecute);
        }
    }

    /// The driver went away with a step outstanding.
    pub fn abandon_drive(&mut self) {
        self.auto_execute = false;
        if self.phase == Phase::Loading(LoadingStage::SigningTransaction) {
            // The wallet may still broadcast; never offer to sign again.
            self.user_signed_transaction = true;
            self.fail(ExecutionFailure::bare(FailureKind::Interrupted));
        }
    }
}
