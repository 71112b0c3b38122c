//! In-memory wallet for demos and tests.

use super::{
    PreparedTransfer, ProviderError, ProviderResult, Receipt, TxHandle, WalletCapability,
};
use crate::amount::TokenAmount;
use crate::payment::Transfer;
use crate::NetworkId;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// Provider errors shaped the way common wallets report them.
pub mod provider_errors {
    use super::ProviderError;
    use crate::NetworkId;

    /// EIP-1193 user rejection (code 4001), no method attached.
    pub fn user_rejected() -> ProviderError {
        ProviderError::new("User rejected the request.")
            .with_code(4001)
            .with_name("UserRejectedRequestError")
    }

    /// A second switch prompt while one is already open.
    pub fn request_already_pending() -> ProviderError {
        ProviderError::new("Request of type 'wallet_switchEthereumChain' already pending")
            .with_code(-32002)
    }

    /// The wallet does not know the requested network.
    pub fn unrecognized_chain(network_id: NetworkId) -> ProviderError {
        ProviderError::new(format!("Unrecognized chain ID \"{}\".", network_id)).with_code(4902)
    }

    /// Signer is on a different network than the transaction.
    pub fn chain_mismatch(expected: NetworkId, actual: Option<NetworkId>) -> ProviderError {
        let actual = actual.map_or_else(|| "unknown".to_string(), |id| id.to_string());
        ProviderError::new("The current chain of the wallet does not match the target chain for the transaction.")
            .with_name("ChainMismatchError")
            .with_details(format!("chain mismatch: expected {}, got {}", expected, actual))
    }

    /// Stale fee estimate.
    pub fn fee_too_low() -> ProviderError {
        ProviderError::new("replacement transaction underpriced").with_code(-32000)
    }

    /// Native balance cannot cover the network fee.
    pub fn insufficient_funds_for_gas() -> ProviderError {
        ProviderError::new("insufficient funds for gas * price + value").with_code(-32000)
    }

    /// Local connector race; safe to retry immediately.
    pub fn connector_not_connected() -> ProviderError {
        ProviderError::new("Connector not connected.").with_name("ConnectorNotConnectedError")
    }
}

/// Number of calls observed per wallet operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalletCalls {
    /// `switch_network` calls.
    pub switch: usize,
    /// `prepare_transfer` calls.
    pub prepare: usize,
    /// `sign_and_send` calls.
    pub sign: usize,
    /// `wait_for_confirmation` calls.
    pub confirm: usize,
}

#[derive(Debug)]
struct MockState {
    active_network: Option<NetworkId>,
    switch_supported: bool,
    switch_lag_polls: u32,
    pending_switch: Option<(NetworkId, u32)>,
    enforce_chain: bool,
    fee_estimate: Option<TokenAmount>,
    switch_errors: VecDeque<ProviderError>,
    prepare_errors: VecDeque<ProviderError>,
    sign_errors: VecDeque<ProviderError>,
    confirm_errors: VecDeque<ProviderError>,
    calls: WalletCalls,
    signed: Vec<Transfer>,
    block_number: u64,
}

/// Scriptable [`WalletCapability`].
///
/// Successful by default: switches land immediately, signatures produce a
/// fresh hash, confirmations resolve at once. Failures are queued per
/// operation and consumed in order. `sign_and_send` fails with a chain
/// mismatch when the active network differs from the transfer's, unless
/// disabled with [`without_chain_check`](Self::without_chain_check).
///
/// # Example
///
/// ```
/// use chainpay_lib::wallet::{provider_errors, MockWallet};
/// use chainpay_lib::NetworkId;
///
/// let wallet = MockWallet::on_network(NetworkId::ETHEREUM);
/// wallet.push_sign_error(provider_errors::user_rejected());
/// assert_eq!(wallet.calls().sign, 0);
/// ```
#[derive(Debug)]
pub struct MockWallet {
    state: Mutex<MockState>,
    signing_held: watch::Sender<bool>,
    preparing_held: watch::Sender<bool>,
}

impl Default for MockWallet {
    fn default() -> Self {
        Self {
            state: Mutex::new(MockState {
                active_network: None,
                switch_supported: true,
                switch_lag_polls: 0,
                pending_switch: None,
                enforce_chain: true,
                fee_estimate: None,
                switch_errors: VecDeque::new(),
                prepare_errors: VecDeque::new(),
                sign_errors: VecDeque::new(),
                confirm_errors: VecDeque::new(),
                calls: WalletCalls::default(),
                signed: Vec::new(),
                block_number: 19_000_000,
            }),
            signing_held: watch::Sender::new(false),
            preparing_held: watch::Sender::new(false),
        }
    }
}

impl MockWallet {
    /// Create a wallet with no active network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a wallet on `network_id`.
    pub fn on_network(network_id: NetworkId) -> Self {
        let wallet = Self::default();
        wallet.lock().active_network = Some(network_id);
        wallet
    }

    /// Refuse network switches (manual switching required).
    pub fn without_switch_support(self) -> Self {
        self.lock().switch_supported = false;
        self
    }

    /// Accept mismatched signatures instead of failing with a chain mismatch.
    pub fn without_chain_check(self) -> Self {
        self.lock().enforce_chain = false;
        self
    }

    /// Report the old network for `polls` reads after an accepted switch.
    pub fn with_switch_lag(self, polls: u32) -> Self {
        self.lock().switch_lag_polls = polls;
        self
    }

    /// Fee estimate returned from `prepare_transfer`.
    pub fn with_fee_estimate(self, fee: TokenAmount) -> Self {
        self.lock().fee_estimate = Some(fee);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Simulate the user switching networks in the wallet UI.
    pub fn set_active_network(&self, network_id: Option<NetworkId>) {
        let mut state = self.lock();
        state.pending_switch = None;
        state.active_network = network_id;
    }

    /// Queue a failure for the next `switch_network`.
    pub fn push_switch_error(&self, error: ProviderError) {
        self.lock().switch_errors.push_back(error);
    }

    /// Queue a failure for the next `prepare_transfer`.
    pub fn push_prepare_error(&self, error: ProviderError) {
        self.lock().prepare_errors.push_back(error);
    }

    /// Queue a failure for the next `sign_and_send`.
    pub fn push_sign_error(&self, error: ProviderError) {
        self.lock().sign_errors.push_back(error);
    }

    /// Queue a failure for the next `wait_for_confirmation`.
    pub fn push_confirm_error(&self, error: ProviderError) {
        self.lock().confirm_errors.push_back(error);
    }

    /// Park every `sign_and_send` until [`release_signatures`](Self::release_signatures).
    pub fn hold_signatures(&self) {
        self.signing_held.send_replace(true);
    }

    /// Let parked and future signatures proceed.
    pub fn release_signatures(&self) {
        self.signing_held.send_replace(false);
    }

    /// Park every `prepare_transfer` until [`release_prepares`](Self::release_prepares).
    pub fn hold_prepares(&self) {
        self.preparing_held.send_replace(true);
    }

    /// Let parked and future prepares proceed.
    pub fn release_prepares(&self) {
        self.preparing_held.send_replace(false);
    }

    /// Calls observed so far.
    pub fn calls(&self) -> WalletCalls {
        self.lock().calls
    }

    /// Transfers that were successfully signed, in order.
    pub fn signed_transfers(&self) -> Vec<Transfer> {
        self.lock().signed.clone()
    }
}

#[async_trait]
impl WalletCapability for MockWallet {
    fn active_network_id(&self) -> Option<NetworkId> {
        let mut state = self.lock();
        if let Some((target, remaining)) = state.pending_switch {
            if remaining == 0 {
                state.active_network = Some(target);
                state.pending_switch = None;
            } else {
                state.pending_switch = Some((target, remaining - 1));
            }
        }
        state.active_network
    }

    fn supports_network_switch(&self) -> bool {
        self.lock().switch_supported
    }

    async fn switch_network(&self, network_id: NetworkId) -> ProviderResult<()> {
        let mut state = self.lock();
        state.calls.switch += 1;
        if let Some(error) = state.switch_errors.pop_front() {
            return Err(error);
        }
        if state.switch_lag_polls == 0 {
            state.active_network = Some(network_id);
        } else {
            state.pending_switch = Some((network_id, state.switch_lag_polls));
        }
        Ok(())
    }

    async fn prepare_transfer(&self, transfer: &Transfer) -> ProviderResult<PreparedTransfer> {
        self.lock().calls.prepare += 1;

        let mut held = self.preparing_held.subscribe();
        if held.wait_for(|held| !*held).await.is_err() {
            return Err(ProviderError::new("wallet dropped"));
        }

        let mut state = self.lock();
        if let Some(error) = state.prepare_errors.pop_front() {
            return Err(error);
        }
        Ok(PreparedTransfer {
            transfer: transfer.clone(),
            fee_estimate: state.fee_estimate,
        })
    }

    async fn sign_and_send(&self, prepared: &PreparedTransfer) -> ProviderResult<TxHandle> {
        self.lock().calls.sign += 1;

        let mut held = self.signing_held.subscribe();
        // The sender lives as long as `self`, so this only fails if the
        // wallet is being dropped mid-call.
        if held.wait_for(|held| !*held).await.is_err() {
            return Err(ProviderError::new("wallet dropped"));
        }

        let mut state = self.lock();
        if let Some(error) = state.sign_errors.pop_front() {
            return Err(error);
        }

        let required = prepared.transfer.network_id();
        if state.enforce_chain && state.active_network != Some(required) {
            return Err(provider_errors::chain_mismatch(
                required,
                state.active_network,
            ));
        }

        state.signed.push(prepared.transfer.clone());
        let nonce = state.signed.len() as u64;
        Ok(TxHandle {
            hash: format!("0x{:064x}", nonce),
            network_id: required,
        })
    }

    async fn wait_for_confirmation(
        &self,
        tx: &TxHandle,
        required_confirmations: u64,
    ) -> ProviderResult<Receipt> {
        let mut state = self.lock();
        state.calls.confirm += 1;
        if let Some(error) = state.confirm_errors.pop_front() {
            return Err(error);
        }
        state.block_number += 1;
        Ok(Receipt {
            tx_hash: tx.hash.clone(),
            block_number: state.block_number,
            confirmations: required_confirmations,
        })
    }
}
