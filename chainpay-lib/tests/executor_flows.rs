//! End-to-end executor flows against the in-memory wallet.
//!
//! ```bash
//! cargo test -p chainpay-lib --test executor_flows
//! ```

use chainpay_lib::prelude::*;
use chainpay_lib::wallet::provider_errors;
use std::sync::Arc;
use std::time::Duration;

fn payer() -> Address {
    Address::new("0x00000000000000000000000000000000000000aa").unwrap()
}

fn receiver() -> Address {
    Address::new("0x00000000000000000000000000000000000000bb").unwrap()
}

fn transfer(network: NetworkId, amount: u128) -> Transfer {
    Transfer {
        to_address: receiver(),
        from_address: Some(payer()),
        asset: Asset::native(network, 18, "ETH"),
        amount: TokenAmount::new(amount),
    }
}

fn executor(wallet: &Arc<MockWallet>, transfer: Transfer) -> Arc<TransferExecutor> {
    executor_with(wallet, transfer, ExecutorConfig::default())
}

fn executor_with(
    wallet: &Arc<MockWallet>,
    transfer: Transfer,
    config: ExecutorConfig,
) -> Arc<TransferExecutor> {
    let wallet: Arc<dyn WalletCapability> = wallet.clone();
    Arc::new(TransferExecutor::for_transfer(wallet, transfer, config).unwrap())
}

fn settled(outcome: ExecuteOutcome) -> ExecutionStatus {
    match outcome {
        ExecuteOutcome::Settled(status) => status,
        other => panic!("expected settled drive, got {:?}", other),
    }
}

// ============================================================================
// Happy paths
// ============================================================================

#[tokio::test]
async fn test_execute_on_matching_network() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));
    assert_eq!(executor.status().kind, StatusKind::Idle);

    let status = settled(executor.execute().await);
    assert!(status.is_success);
    assert!(status.is_user_signed);
    assert!(status.receipt.is_some());

    let calls = wallet.calls();
    assert_eq!(calls.switch, 0);
    assert_eq!(calls.prepare, 1);
    assert_eq!(calls.sign, 1);
    assert_eq!(calls.confirm, 1);
}

#[tokio::test(start_paused = true)]
async fn test_switch_then_sign_without_second_execute() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::ETHEREUM).with_switch_lag(3));
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.execute().await);
    assert!(status.is_success);
    assert_eq!(wallet.calls().switch, 1);
    assert_eq!(wallet.calls().sign, 1);
    assert_eq!(wallet.signed_transfers()[0].network_id(), NetworkId::BASE);
}

#[tokio::test]
async fn test_chain_mismatch_triggers_automatic_switch() {
    // The wallet claims the right network but the signer disagrees.
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    wallet.push_sign_error(provider_errors::chain_mismatch(
        NetworkId::BASE,
        Some(NetworkId::ETHEREUM),
    ));
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.execute().await);
    assert!(status.is_success);
    assert_eq!(wallet.calls().switch, 1);
    assert_eq!(wallet.calls().sign, 2);
    assert_eq!(wallet.signed_transfers().len(), 1);
}

#[tokio::test]
async fn test_chain_mismatch_while_preparing_switches_then_signs() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::ETHEREUM));
    wallet.push_prepare_error(provider_errors::chain_mismatch(
        NetworkId::BASE,
        Some(NetworkId::ETHEREUM),
    ));
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.execute().await);
    assert!(status.is_success);
    assert!(!status.is_error);
    assert!(status.failure.is_none());

    let calls = wallet.calls();
    assert_eq!(calls.switch, 1);
    assert_eq!(calls.prepare, 2);
    assert_eq!(calls.sign, 1);
    assert_eq!(wallet.signed_transfers()[0].network_id(), NetworkId::BASE);
}

#[tokio::test]
async fn test_chain_mismatch_while_preparing_ahead_waits_for_execute() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::ETHEREUM));
    wallet.push_prepare_error(provider_errors::chain_mismatch(
        NetworkId::BASE,
        Some(NetworkId::ETHEREUM),
    ));
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.prepare().await);
    assert_eq!(status.kind, StatusKind::ReadyToExecute);
    assert!(!status.is_error);
    assert_eq!(wallet.calls().switch, 0);

    assert!(settled(executor.execute().await).is_success);
    assert_eq!(wallet.calls().switch, 1);
    assert_eq!(wallet.calls().sign, 1);
}

#[tokio::test]
async fn test_chain_mismatch_while_confirming_switches_back_without_resigning() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    wallet.push_confirm_error(provider_errors::chain_mismatch(
        NetworkId::BASE,
        Some(NetworkId::ETHEREUM),
    ));
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.execute().await);
    assert!(status.is_success);
    assert_eq!(status.retries, 1);

    let calls = wallet.calls();
    assert_eq!(calls.switch, 1);
    assert_eq!(calls.sign, 1);
    assert_eq!(calls.confirm, 2);
}

#[tokio::test]
async fn test_prepare_ahead_of_execute() {
    let wallet = Arc::new(
        MockWallet::on_network(NetworkId::BASE).with_fee_estimate(TokenAmount::new(21_000)),
    );
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.prepare().await);
    assert_eq!(status.kind, StatusKind::ReadyToExecute);
    assert_eq!(wallet.calls().sign, 0);
    assert_eq!(executor.prepare().await, ExecuteOutcome::Ignored(Phase::ReadyToExecute));

    assert!(settled(executor.execute().await).is_success);
    assert_eq!(wallet.calls().prepare, 1);
}

// ============================================================================
// Idempotency and reset safety
// ============================================================================

#[tokio::test]
async fn test_second_execute_while_signing_is_noop() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    wallet.hold_signatures();
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let mut rx = executor.subscribe();
    let first = tokio::spawn({
        let executor = Arc::clone(&executor);
        async move { executor.execute().await }
    });
    rx.wait_for(|s| s.is_user_signing).await.unwrap();

    assert_eq!(executor.execute().await, ExecuteOutcome::AlreadyDriving);
    assert_eq!(wallet.calls().sign, 1);

    let refused = executor.reset().unwrap_err();
    assert_eq!(refused.code(), ChainpayErrorCode::ResetRefused);
    assert!(executor.discard_pending_transfer().is_err());

    wallet.release_signatures();
    assert!(settled(first.await.unwrap()).is_success);
    assert_eq!(wallet.calls().sign, 1);
}

#[tokio::test]
async fn test_signed_transfer_survives_reset_attempt() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    wallet.push_confirm_error(ProviderError::new("header not found").with_code(-32000));
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.execute().await);
    assert!(status.is_error);
    assert!(status.is_user_signed);
    assert!(status.tx.is_some());

    match executor.reset() {
        Err(ChainpayError::ResetRefused(ResetRefusal::AwaitingConfirmation)) => {}
        other => panic!("expected refusal, got {:?}", other),
    }
    assert!(executor.status().is_user_signed);

    executor.discard_pending_transfer().unwrap();
    let status = executor.status();
    assert!(!status.is_user_signed);
    assert_eq!(status.loading_stage, Some(LoadingStage::Init));
}

#[tokio::test]
async fn test_set_transfer_after_signature_keeps_active() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));
    settled(executor.execute().await);

    assert!(!executor.set_transfer(transfer(NetworkId::BASE, 2)).unwrap());
    assert_eq!(executor.status().active_transfer.amount, TokenAmount::new(1));
    assert!(executor.status().is_success);

    // Explicit reset picks up the latest transfer and clears the latch.
    executor.reset().unwrap();
    let status = executor.status();
    assert!(!status.is_success);
    assert_eq!(status.active_transfer.amount, TokenAmount::new(2));
}

#[tokio::test]
async fn test_set_transfer_before_execute_resets() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));
    settled(executor.prepare().await);

    assert!(executor.set_transfer(transfer(NetworkId::BASE, 5)).unwrap());
    settled(executor.execute().await);
    assert_eq!(wallet.signed_transfers()[0].amount, TokenAmount::new(5));
}

#[tokio::test(start_paused = true)]
async fn test_completion_after_reset_is_discarded() {
    let wallet = Arc::new(
        MockWallet::on_network(NetworkId::ETHEREUM).with_switch_lag(u32::MAX),
    );
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let mut rx = executor.subscribe();
    let drive = tokio::spawn({
        let executor = Arc::clone(&executor);
        async move { executor.execute().await }
    });
    rx.wait_for(|s| s.loading_stage == Some(LoadingStage::SwitchingNetwork))
        .await
        .unwrap();

    assert!(executor.set_transfer(transfer(NetworkId::BASE, 7)).unwrap());
    assert_eq!(drive.await.unwrap(), ExecuteOutcome::Superseded);

    let status = executor.status();
    assert!(!status.is_error);
    assert!(status.failure.is_none());
    assert_eq!(status.loading_stage, Some(LoadingStage::Init));
    assert_eq!(status.active_transfer.amount, TokenAmount::new(7));
}

#[tokio::test]
async fn test_execute_while_preparing_continues_the_drive() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    wallet.hold_prepares();
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let mut rx = executor.subscribe();
    let preparing = tokio::spawn({
        let executor = Arc::clone(&executor);
        async move { executor.prepare().await }
    });
    rx.wait_for(|s| s.loading_stage == Some(LoadingStage::Init))
        .await
        .unwrap();

    assert_eq!(executor.execute().await, ExecuteOutcome::Queued);
    // A second request adds nothing.
    assert_eq!(executor.execute().await, ExecuteOutcome::AlreadyDriving);
    assert_eq!(wallet.calls().sign, 0);

    wallet.release_prepares();
    let status = settled(preparing.await.unwrap());
    assert!(status.is_success);
    assert_eq!(wallet.calls().prepare, 1);
    assert_eq!(wallet.calls().sign, 1);
}

// ============================================================================
// Warnings
// ============================================================================

#[tokio::test]
async fn test_rejected_signature_is_reoffered() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    wallet.push_sign_error(provider_errors::user_rejected());
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.execute().await);
    assert_eq!(status.kind, StatusKind::ReadyToExecute);
    assert!(!status.is_error);
    assert_eq!(
        status.warning.as_ref().map(|w| w.kind),
        Some(ErrorKind::UserRejectedTransaction)
    );
    assert_eq!(status.retries, 0);

    let status = settled(executor.execute().await);
    assert!(status.is_success);
    assert!(status.warning.is_none());
    assert_eq!(wallet.signed_transfers().len(), 1);
}

#[tokio::test]
async fn test_rejected_switch_is_warning() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::ETHEREUM));
    wallet.push_switch_error(provider_errors::user_rejected());
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.execute().await);
    assert_eq!(status.kind, StatusKind::ReadyToExecute);
    assert_eq!(
        status.warning.map(|w| w.kind),
        Some(ErrorKind::UserRejectedNetworkSwitch)
    );
    assert_eq!(wallet.calls().sign, 0);
}

#[tokio::test]
async fn test_manual_switch_required() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::ETHEREUM).without_switch_support());
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.execute().await);
    assert!(status.is_need_to_switch_network_manually);

    executor.notify_network_changed();
    assert!(executor.status().is_need_to_switch_network_manually);

    wallet.set_active_network(Some(NetworkId::BASE));
    executor.notify_network_changed();
    assert_eq!(executor.status().kind, StatusKind::ReadyToExecute);

    assert!(settled(executor.execute().await).is_success);
    assert_eq!(wallet.calls().switch, 0);
}

// ============================================================================
// Retries and failures
// ============================================================================

#[tokio::test]
async fn test_retryable_error_retried_once() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    wallet.push_sign_error(provider_errors::fee_too_low());
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.execute().await);
    assert!(status.is_success);
    assert_eq!(status.retries, 1);
    assert_eq!(wallet.calls().prepare, 2);
    assert_eq!(wallet.calls().sign, 2);
}

#[tokio::test]
async fn test_retry_bound_then_explicit_reset() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    wallet.push_sign_error(provider_errors::fee_too_low());
    wallet.push_sign_error(provider_errors::fee_too_low());
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.execute().await);
    assert!(status.is_error);
    assert_eq!(
        status.failure.as_ref().map(|f| f.kind),
        Some(FailureKind::RetriesExhausted)
    );
    assert_eq!(executor.execute().await, ExecuteOutcome::Ignored(Phase::Error));

    executor.reset().unwrap();
    assert_eq!(executor.status().retries, 0);
    assert!(settled(executor.execute().await).is_success);
}

#[tokio::test]
async fn test_ephemeral_errors_are_unbounded() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    for _ in 0..3 {
        wallet.push_prepare_error(provider_errors::connector_not_connected());
    }
    wallet.push_confirm_error(provider_errors::connector_not_connected());
    let config = ExecutorConfig::default().with_max_automatic_retries(0);
    let executor = executor_with(&wallet, transfer(NetworkId::BASE, 1), config);

    let status = settled(executor.execute().await);
    assert!(status.is_success);
    assert_eq!(status.retries, 0);
    assert_eq!(wallet.calls().prepare, 4);
    assert_eq!(wallet.calls().sign, 1);
    assert_eq!(wallet.calls().confirm, 2);
}

#[tokio::test]
async fn test_unknown_error_is_fatal() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    wallet.push_sign_error(ProviderError::new("execution reverted: ERC20: transfer amount exceeds balance"));
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let status = settled(executor.execute().await);
    let failure = status.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::Fatal);
    assert_eq!(failure.error_kind, Some(ErrorKind::Fatal));
    assert!(!status.is_user_signed);
}

#[tokio::test(start_paused = true)]
async fn test_switch_polling_times_out() {
    let wallet = Arc::new(
        MockWallet::on_network(NetworkId::ETHEREUM).with_switch_lag(u32::MAX),
    );
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));

    let start = tokio::time::Instant::now();
    let status = settled(executor.execute().await);
    let elapsed = start.elapsed();

    assert_eq!(
        status.failure.map(|f| f.kind),
        Some(FailureKind::NetworkSwitchTimeout)
    );
    assert!(elapsed >= Duration::from_millis(19 * 250));
    assert!(elapsed < Duration::from_secs(6));
    assert_eq!(wallet.calls().sign, 0);
}

// ============================================================================
// Strategy engine + executor
// ============================================================================

#[tokio::test]
async fn test_fee_unaffordable_falls_back_to_next_network() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    let context = EngineContext::new(wallet.clone());

    let registry = StaticTokenRegistry::with_defaults();
    let mut holdings = HoldingsSnapshot::new();
    for asset in registry.assets_for("USD") {
        holdings.set_balance(&payer(), &asset, TokenAmount::new(1_000_000_000));
    }
    let payment =
        LogicalPayment::new(receiver(), "USD", LogicalAmount::parse("12.50").unwrap()).with_sender(payer());
    let prefs = StrategyPreferences::default();
    let engine = context.strategy_engine();

    let mut selector = StrategySelector::with_candidates(engine.strategies(&payment, &prefs, Some(&holdings)));
    let best = selector.best().unwrap().clone();
    assert_eq!(best.network_id(), NetworkId::BASE);
    assert_eq!(best.transfer.amount, TokenAmount::new(12_500_000));

    wallet.push_prepare_error(provider_errors::insufficient_funds_for_gas());
    let executor = context.executor_for(&best).unwrap();
    let status = settled(executor.execute().await);
    let failure = status.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::FeeUnaffordable);

    selector.disable_network(status.active_transfer.network_id());
    selector.set_candidates(engine.strategies(&payment, &prefs, Some(&holdings)));
    let next = selector.best().unwrap().clone();
    assert_eq!(next.network_id(), NetworkId::OPTIMISM);

    let executor = context.executor_for(&next).unwrap();
    assert!(settled(executor.execute().await).is_success);
    assert_eq!(wallet.signed_transfers()[0].network_id(), NetworkId::OPTIMISM);
}

#[test]
fn test_executor_requires_sender() {
    let wallet: Arc<dyn WalletCapability> = Arc::new(MockWallet::new());
    let mut t = transfer(NetworkId::BASE, 1);
    t.from_address = None;
    let err = TransferExecutor::for_transfer(wallet, t, ExecutorConfig::default()).unwrap_err();
    assert_eq!(err.code(), ChainpayErrorCode::MissingSender);
}

#[tokio::test]
async fn test_subscriber_sees_final_status() {
    let wallet = Arc::new(MockWallet::on_network(NetworkId::BASE));
    let executor = executor(&wallet, transfer(NetworkId::BASE, 1));
    let mut rx = executor.subscribe();
    assert!(!rx.has_changed().unwrap());

    settled(executor.execute().await);
    assert!(rx.has_changed().unwrap());
    let status = rx.borrow_and_update().clone();
    assert!(status.is_success);
    assert_eq!(status.kind, StatusKind::Success);

    // Nothing functionally changed, nothing published.
    executor.notify_network_changed();
    assert!(!rx.has_changed().unwrap());
}
