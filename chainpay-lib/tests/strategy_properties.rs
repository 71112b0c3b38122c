//! Property tests for strategy generation, ordering and selection.

use chainpay_lib::amount::{LogicalAmount, TokenAmount};
use chainpay_lib::assets::{StaticTokenRegistry, TokenRegistry};
use chainpay_lib::config::PriorityTable;
use chainpay_lib::holdings::{HoldingsProvider, HoldingsSnapshot};
use chainpay_lib::payment::{LogicalPayment, StrategyMode};
use chainpay_lib::strategy::{
    generate, prioritize, StrategyEngine, StrategyPreferences, StrategySelector,
};
use chainpay_lib::{Address, NetworkId};
use proptest::prelude::*;

const NETWORKS: [NetworkId; 6] = [
    NetworkId::ETHEREUM,
    NetworkId::OPTIMISM,
    NetworkId::POLYGON,
    NetworkId::BASE,
    NetworkId::ARBITRUM,
    NetworkId(56),
];

const TICKERS: [&str; 4] = ["USDC", "USDT", "DAI", "ETH"];

fn payer() -> Address {
    Address::new("0x00000000000000000000000000000000000000aa").unwrap()
}

fn receiver() -> Address {
    Address::new("0x00000000000000000000000000000000000000bb").unwrap()
}

fn arb_preferences() -> impl Strategy<Value = StrategyPreferences> {
    (
        proptest::option::of(proptest::sample::subsequence(TICKERS.to_vec(), 0..=TICKERS.len())),
        proptest::option::of(proptest::sample::subsequence(NETWORKS.to_vec(), 0..=NETWORKS.len())),
    )
        .prop_map(|(tickers, networks)| StrategyPreferences {
            excluded_tickers: tickers.map(|t| t.into_iter().map(String::from).collect()),
            excluded_networks: networks,
        })
}

/// Whole cents up to 10,000 USD.
fn arb_amount() -> impl Strategy<Value = LogicalAmount> {
    (0u64..1_000_000).prop_map(|cents| {
        LogicalAmount::from_canonical_units(cents as u128 * 10u128.pow(16))
    })
}

fn registry() -> StaticTokenRegistry {
    StaticTokenRegistry::with_defaults()
}

proptest! {
    #[test]
    fn prop_exclusions_are_honoured(prefs in arb_preferences(), amount in arb_amount()) {
        let payment = LogicalPayment::new(receiver(), "USD", amount);
        for strategy in generate(&registry(), &payment, &prefs, None) {
            prop_assert!(!prefs.is_ticker_excluded(strategy.transfer.asset.ticker()));
            prop_assert!(!prefs.is_network_excluded(strategy.network_id()));
            prop_assert!(strategy.is_proposed());
        }
    }

    #[test]
    fn prop_affordable_within_balance(
        balances in proptest::collection::vec(0u128..20_000_000_000_000_000_000, 9),
        amount in arb_amount(),
    ) {
        let registry = registry();
        let assets = registry.assets_for("USD");
        let mut holdings = HoldingsSnapshot::new();
        for (asset, balance) in assets.iter().zip(balances.iter()) {
            holdings.set_balance(&payer(), asset, TokenAmount::new(*balance));
        }

        let payment = LogicalPayment::new(receiver(), "USD", amount).with_sender(payer());
        let strategies = generate(&registry, &payment, &StrategyPreferences::default(), Some(&holdings));
        for strategy in &strategies {
            let balance = holdings.balance_of(&payer(), &strategy.transfer.asset);
            prop_assert!(balance.is_some_and(|b| b >= strategy.transfer.amount));
            prop_assert_eq!(strategy.mode, StrategyMode::Affordable);
        }
    }

    #[test]
    fn prop_prioritize_is_deterministic(seed in proptest::collection::vec(any::<usize>(), 0..20)) {
        let registry = registry();
        let payment = LogicalPayment::new(receiver(), "USD", LogicalAmount::from_whole(1));
        let mut strategies = generate(&registry, &payment, &StrategyPreferences::default(), None);
        // Shuffle by the seed.
        for (i, s) in seed.iter().enumerate() {
            let len = strategies.len();
            strategies.swap(i % len, s % len);
        }

        let table = PriorityTable::default();
        let first = prioritize(strategies.clone(), &table);
        let second = prioritize(strategies.into_iter().rev().collect(), &table);
        let keys = |list: &[chainpay_lib::payment::Strategy]| -> Vec<_> {
            list.iter()
                .map(|s| (table.network_rank(s.network_id()), table.asset_rank(s.transfer.asset.ticker())))
                .collect()
        };
        prop_assert_eq!(keys(&first), keys(&second));

        let ranks = keys(&first);
        let sortable: Vec<_> = ranks
            .iter()
            .map(|(n, a)| (n.unwrap_or(usize::MAX), a.unwrap_or(usize::MAX)))
            .collect();
        prop_assert!(sortable.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn prop_disabled_network_never_best(
        disabled in proptest::sample::subsequence(NETWORKS.to_vec(), 0..=NETWORKS.len()),
        amounts in proptest::collection::vec(arb_amount(), 1..5),
    ) {
        let engine = StrategyEngine::new(std::sync::Arc::new(registry()), PriorityTable::default());
        let mut selector = StrategySelector::new();
        for network in &disabled {
            selector.disable_network(*network);
        }

        for amount in amounts {
            let payment = LogicalPayment::new(receiver(), "USD", amount);
            selector.set_candidates(engine.strategies(&payment, &StrategyPreferences::default(), None));
            if let Some(first) = selector.candidates().first().cloned() {
                selector.select(&first);
            }
            if let Some(best) = selector.best() {
                prop_assert!(!disabled.contains(&best.network_id()));
            }
            prop_assert!(selector.others().iter().all(|s| !disabled.contains(&s.network_id())));
        }
    }
}
