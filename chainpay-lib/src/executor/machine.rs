//! Async driver for [`ExecutionState`].

use super::state::{Event, ExecutionState, Phase, Step};
use super::status::{ExecutionStatus, StatusProjector};
use crate::config::ExecutorConfig;
use crate::payment::{Strategy, Transfer};
use crate::wallet::{WalletCapability, SEND_TRANSACTION_METHOD, SWITCH_CHAIN_METHOD};
use crate::{ChainpayError, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// What an [`execute`](TransferExecutor::execute) or
/// [`prepare`](TransferExecutor::prepare) call did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// The drive ran until it needed the caller again.
    Settled(ExecutionStatus),
    /// Another call is already driving this executor; nothing was issued.
    AlreadyDriving,
    /// Another call is preparing; it will go on to execute when done.
    Queued,
    /// The current phase does not accept the call.
    Ignored(Phase),
    /// A reset happened while the drive was waiting on the wallet.
    Superseded,
}

struct Inner {
    state: ExecutionState,
    projector: StatusProjector,
    driving: bool,
}

/// Drives one transfer through switching, signing and confirmation.
///
/// Cheap to share behind an [`Arc`]; all methods take `&self`. The internal
/// lock is never held across a wallet call.
///
/// # Example
///
/// ```
/// # tokio_test_block_on(async {
/// use chainpay_lib::config::ExecutorConfig;
/// use chainpay_lib::executor::TransferExecutor;
/// use chainpay_lib::wallet::MockWallet;
/// # let transfer = chainpay_lib::payment::Transfer {
/// #     to_address: "0x00000000000000000000000000000000000000bb".parse().unwrap(),
/// #     from_address: Some("0x00000000000000000000000000000000000000aa".parse().unwrap()),
/// #     asset: chainpay_lib::assets::Asset::native(chainpay_lib::NetworkId::BASE, 18, "ETH"),
/// #     amount: chainpay_lib::amount::TokenAmount::new(1),
/// # };
/// use std::sync::Arc;
///
/// let wallet = Arc::new(MockWallet::on_network(chainpay_lib::NetworkId::ETHEREUM));
/// let executor = TransferExecutor::for_transfer(wallet, transfer, ExecutorConfig::default()).unwrap();
/// executor.execute().await;
/// assert!(executor.status().is_success);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
pub struct TransferExecutor {
    wallet: Arc<dyn WalletCapability>,
    config: ExecutorConfig,
    inner: Mutex<Inner>,
    status_tx: watch::Sender<ExecutionStatus>,
}

impl TransferExecutor {
    /// Create an executor for an affordable strategy.
    ///
    /// Proposed strategies are illustrative only and are rejected.
    pub fn new(
        wallet: Arc<dyn WalletCapability>,
        strategy: &Strategy,
        config: ExecutorConfig,
    ) -> Result<Self> {
        if strategy.is_proposed() {
            return Err(ChainpayError::ProposedStrategy {
                ticker: strategy.transfer.asset.ticker().to_string(),
                network_id: strategy.network_id().as_u64(),
            });
        }
        Self::for_transfer(wallet, strategy.transfer.clone(), config)
    }

    /// Create an executor for a transfer with a known sender.
    pub fn for_transfer(
        wallet: Arc<dyn WalletCapability>,
        transfer: Transfer,
        config: ExecutorConfig,
    ) -> Result<Self> {
        config.validate()?;
        transfer.require_sender()?;

        let state = ExecutionState::new(transfer);
        let mut projector = StatusProjector::new();
        let status = projector.project(&state);

        Ok(Self {
            wallet,
            config,
            inner: Mutex::new(Inner {
                state,
                projector,
                driving: false,
            }),
            status_tx: watch::Sender::new(status),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish a snapshot if it differs from the last one.
    fn publish(&self, inner: &mut Inner) {
        let next = inner.projector.project(&inner.state);
        self.status_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Executor configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Current status snapshot.
    pub fn status(&self) -> ExecutionStatus {
        self.status_tx.borrow().clone()
    }

    /// Receive every published status change.
    pub fn subscribe(&self) -> watch::Receiver<ExecutionStatus> {
        self.status_tx.subscribe()
    }

    /// Execute the active transfer.
    ///
    /// Prepares first when needed, switches networks when the signer is
    /// elsewhere, then signs and waits for confirmation. Returns when the
    /// transfer succeeds, fails, or needs the caller (warning or manual
    /// network switch). A call made while a [`prepare`](Self::prepare) is
    /// in flight hands its intent to that drive and returns
    /// [`ExecuteOutcome::Queued`]. Any other call made while another is
    /// driving returns [`ExecuteOutcome::AlreadyDriving`] without touching
    /// the wallet.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self) -> ExecuteOutcome {
        self.start(ExecutionState::request_execute, ExecutionState::queue_execute)
            .await
    }

    /// Prepare the active transfer without executing it.
    ///
    /// Used after construction or a reset to have the executor reach
    /// `ReadyToExecute` ahead of the caller's `execute()`.
    #[tracing::instrument(skip(self))]
    pub async fn prepare(&self) -> ExecuteOutcome {
        self.start(ExecutionState::request_prepare, |_| false).await
    }

    async fn start(
        &self,
        request: fn(&mut ExecutionState) -> bool,
        queue: fn(&mut ExecutionState) -> bool,
    ) -> ExecuteOutcome {
        let generation = {
            let mut inner = self.lock();
            if inner.driving {
                if queue(&mut inner.state) {
                    self.publish(&mut inner);
                    return ExecuteOutcome::Queued;
                }
                tracing::debug!("drive already active");
                return ExecuteOutcome::AlreadyDriving;
            }
            if !request(&mut inner.state) {
                return ExecuteOutcome::Ignored(inner.state.phase());
            }
            inner.driving = true;
            self.publish(&mut inner);
            inner.state.generation()
        };

        let mut guard = DriveGuard {
            executor: self,
            generation,
            armed: true,
        };
        let outcome = self.drive(generation).await;
        guard.armed = false;
        outcome
    }

    async fn drive(&self, generation: u64) -> ExecuteOutcome {
        loop {
            let step = {
                let mut inner = self.lock();
                if inner.state.generation() != generation {
                    return ExecuteOutcome::Superseded;
                }
                let step = inner.state.next_step(
                    self.wallet.active_network_id(),
                    self.wallet.supports_network_switch(),
                );
                if step == Step::Done {
                    inner.driving = false;
                }
                self.publish(&mut inner);
                if step == Step::Done {
                    return ExecuteOutcome::Settled(self.status_tx.borrow().clone());
                }
                step
            };

            let Some(event) = self.perform(step).await else {
                continue;
            };

            let mut inner = self.lock();
            if inner.state.generation() != generation {
                tracing::warn!(?event, "discarding completion from before reset");
                return ExecuteOutcome::Superseded;
            }
            inner.state.apply(event, &self.config);
            self.publish(&mut inner);
        }
    }

    async fn perform(&self, step: Step) -> Option<Event> {
        let event = match step {
            Step::Prepare(transfer) => match self.wallet.prepare_transfer(&transfer).await {
                Ok(prepared) => Event::Prepared(prepared),
                Err(error) => Event::PrepareFailed(error),
            },
            Step::Switch(network_id) => {
                if let Err(error) = self.wallet.switch_network(network_id).await {
                    return Some(Event::SwitchFailed(
                        error.with_method_if_absent(SWITCH_CHAIN_METHOD),
                    ));
                }
                for attempt in 1..=self.config.switch_poll_attempts {
                    if self.wallet.active_network_id() == Some(network_id) {
                        return Some(Event::SwitchConfirmed);
                    }
                    if attempt < self.config.switch_poll_attempts {
                        tokio::time::sleep(self.config.switch_poll_interval()).await;
                    }
                }
                Event::SwitchTimedOut
            }
            Step::Sign(prepared) => match self.wallet.sign_and_send(&prepared).await {
                Ok(tx) => Event::Signed(tx),
                Err(error) => Event::SignFailed(error.with_method_if_absent(SEND_TRANSACTION_METHOD)),
            },
            Step::Confirm(tx) => match self
                .wallet
                .wait_for_confirmation(&tx, self.config.required_confirmations)
                .await
            {
                Ok(receipt) => Event::Confirmed(receipt),
                Err(error) => Event::ConfirmFailed(error),
            },
            Step::Done => return None,
        };
        Some(event)
    }

    /// Return to `Loading(Init)` on the latest transfer.
    ///
    /// Refused while a signature is requested, and while a signed transfer
    /// has not been confirmed; use
    /// [`discard_pending_transfer`](Self::discard_pending_transfer) to
    /// abandon the latter deliberately. Zeroes the retry counter.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.lock();
        inner
            .state
            .check_reset()
            .map_err(ChainpayError::ResetRefused)?;
        self.reset_locked(&mut inner);
        Ok(())
    }

    /// Abandon a signed but unconfirmed transfer and reset.
    ///
    /// The transaction may still confirm on chain; the executor stops
    /// tracking it.
    pub fn discard_pending_transfer(&self) -> Result<()> {
        let mut inner = self.lock();
        inner
            .state
            .check_discard()
            .map_err(ChainpayError::ResetRefused)?;
        if let Some(tx) = inner.state.tx() {
            tracing::warn!(hash = %tx.hash, "discarding unconfirmed transaction");
        }
        self.reset_locked(&mut inner);
        Ok(())
    }

    fn reset_locked(&self, inner: &mut Inner) {
        inner.state.reset(true);
        inner.projector.clear();
        inner.driving = false;
        tracing::debug!(generation = inner.state.generation(), "executor reset");
        self.publish(inner);
    }

    /// Supply new transfer parameters (amount, asset, receiver).
    ///
    /// The active transfer is only replaced when nothing was signed or is
    /// being signed; otherwise the transfer is kept for the next reset.
    /// Returns whether an automatic reset happened.
    pub fn set_transfer(&self, transfer: Transfer) -> Result<bool> {
        transfer.require_sender()?;
        let mut inner = self.lock();
        let reset = inner.state.set_transfer(transfer);
        if reset {
            inner.driving = false;
        }
        self.publish(&mut inner);
        Ok(reset)
    }

    /// Report that the signer's network changed outside the executor.
    pub fn notify_network_changed(&self) {
        let network = self.wallet.active_network_id();
        let mut inner = self.lock();
        inner.state.network_changed(network);
        self.publish(&mut inner);
    }
}

impl std::fmt::Debug for TransferExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferExecutor")
            .field("config", &self.config)
            .field("status", &*self.status_tx.borrow())
            .finish_non_exhaustive()
    }
}

/// Releases the drive if the `execute()` future is dropped mid-await.
struct DriveGuard<'a> {
    executor: &'a TransferExecutor,
    generation: u64,
    armed: bool,
}

impl Drop for DriveGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.executor.lock();
        if inner.state.generation() == self.generation {
            tracing::warn!(phase = %inner.state.phase(), "drive dropped before completion");
            inner.driving = false;
            inner.state.abandon_drive();
            self.executor.publish(&mut inner);
        }
    }
}
