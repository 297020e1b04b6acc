mod common;

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{address, app_config, response, subscription, FakeChain, ScriptedWallet, SubmitBehaviour};
use suistream_access::access::{evaluate, has_access, AccessState};
use suistream_access::block_chain::utils::{now_ms, now_secs};
use suistream_access::config::Network;
use suistream_access::notifications::{NotificationCenter, NotificationKind};
use suistream_access::subscription::query::{QueryKey, SubscriptionQuery, SubscriptionState};
use suistream_access::subscription::service::SubscriptionService;
use suistream_access::subscription::tiers::SubscriptionTier;
use suistream_access::transactions::builder::{Operation, TransactionBuilder};
use suistream_access::transactions::executor::{ExecutionOutcome, TransactionExecutor};
use suistream_access::wallet::{ConnectRequest, WalletError, WalletSessionAdapter};

const STALE_AFTER: Duration = Duration::from_secs(60);
const REFETCH_EVERY: Duration = Duration::from_secs(60);

struct Harness {
    chain: Arc<FakeChain>,
    wallet_bridge: Arc<ScriptedWallet>,
    notifications: Arc<NotificationCenter>,
    wallet: Arc<WalletSessionAdapter>,
    query: Arc<SubscriptionQuery>,
    service: SubscriptionService,
}

fn harness(wallet_bridge: Arc<ScriptedWallet>) -> Harness {
    let config = app_config();
    let chain = FakeChain::new();
    chain.set_subscriptions(Some(Vec::new()));
    let notifications = Arc::new(NotificationCenter::default());
    let wallet = Arc::new(WalletSessionAdapter::new(
        wallet_bridge.clone(),
        notifications.clone(),
        Network::Testnet,
        config.configured_networks(),
    ));
    let query = Arc::new(SubscriptionQuery::new(chain.clients(), STALE_AFTER, REFETCH_EVERY));
    let executor = Arc::new(TransactionExecutor::new(
        notifications.clone(),
        chain.clients(),
        Duration::from_secs(120),
    ));
    let builders: HashMap<_, _> = config
        .networks
        .iter()
        .map(|(network, network_config)| (*network, TransactionBuilder::new(*network, network_config)))
        .collect();
    let service = SubscriptionService::new(wallet.clone(), query.clone(), executor, notifications.clone(), builders);

    Harness {
        chain,
        wallet_bridge,
        notifications,
        wallet,
        query,
        service,
    }
}

async fn connect(h: &Harness) -> String {
    let owner = address("0xa1");
    assert!(h.wallet.connect(ConnectRequest { address: Some(owner.clone()) }).await);
    owner
}

fn in_thirty_days() -> u64 {
    now_secs() + 30 * 24 * 60 * 60
}

async fn settle<F: Fn() -> bool>(done: F) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn disconnected_wallet_has_no_subscription_and_no_rpc() {
    let h = harness(ScriptedWallet::approving());

    assert_eq!(h.query.get_subscription_status(Network::Testnet, None).await, None);
    assert_eq!(h.query.status(Network::Testnet, None), SubscriptionState::Resolved(None));
    assert_eq!(h.chain.subscription_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_read_resolves_to_none_and_denies() {
    let h = harness(ScriptedWallet::approving());
    let owner = connect(&h).await;
    h.chain.set_subscriptions(None);

    assert_eq!(h.query.get_subscription_status(Network::Testnet, Some(&owner)).await, None);

    let state = h.query.status(Network::Testnet, Some(&owner));
    assert_eq!(state, SubscriptionState::Resolved(None));
    assert!(!has_access(&state, SubscriptionTier::Basic, now_ms()));
    assert_eq!(evaluate(&state, SubscriptionTier::Basic, now_ms()), AccessState::Denied);
}

#[tokio::test]
async fn unresolved_subscription_is_unknown_not_granted() {
    let h = harness(ScriptedWallet::approving());
    let owner = connect(&h).await;

    let state = h.query.status(Network::Testnet, Some(&owner));
    assert_eq!(state, SubscriptionState::Loading);
    assert_eq!(evaluate(&state, SubscriptionTier::Basic, now_ms()), AccessState::Unknown);
}

#[tokio::test(start_paused = true)]
async fn reads_are_served_from_cache_within_staleness_window() {
    let h = harness(ScriptedWallet::approving());
    let owner = connect(&h).await;
    h.chain
        .set_subscriptions(Some(vec![subscription(SubscriptionTier::Premium, &owner, in_thirty_days())]));

    let first = h.query.get_subscription_status(Network::Testnet, Some(&owner)).await;
    tokio::time::advance(Duration::from_secs(59)).await;
    let second = h.query.get_subscription_status(Network::Testnet, Some(&owner)).await;
    assert_eq!(first, second);
    assert_eq!(h.chain.subscription_calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    h.query.get_subscription_status(Network::Testnet, Some(&owner)).await;
    assert_eq!(h.chain.subscription_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn highest_tier_grants_lower_tiers() {
    let h = harness(ScriptedWallet::approving());
    let owner = connect(&h).await;
    h.chain
        .set_subscriptions(Some(vec![subscription(SubscriptionTier::Ultimate, &owner, in_thirty_days())]));

    h.query.get_subscription_status(Network::Testnet, Some(&owner)).await;
    let state = h.query.status(Network::Testnet, Some(&owner));
    for tier in [SubscriptionTier::Basic, SubscriptionTier::Premium, SubscriptionTier::Ultimate] {
        assert!(has_access(&state, tier, now_ms()));
    }
}

#[tokio::test(start_paused = true)]
async fn successful_subscribe_refreshes_before_next_periodic_refetch() {
    let h = harness(ScriptedWallet::approving());
    let owner = connect(&h).await;

    assert_eq!(h.query.get_subscription_status(Network::Testnet, Some(&owner)).await, None);
    let key = QueryKey::subscription(Network::Testnet, &owner);
    let generation = h.query.cache().generation(&key);

    let new_subscription = subscription(SubscriptionTier::Premium, &owner, in_thirty_days());
    h.chain.set_subscriptions(Some(vec![new_subscription.clone()]));

    let outcome = h.service.subscribe(2, 1).await;
    assert!(outcome.is_success());
    assert_eq!(h.query.cache().generation(&key), generation + 1);
    assert_eq!(h.query.status(Network::Testnet, Some(&owner)), SubscriptionState::Loading);

    // no time passes: the refresh comes from the mutation, not the interval
    let query = h.query.clone();
    let owner_clone = owner.clone();
    settle(move || query.status(Network::Testnet, Some(&owner_clone)) != SubscriptionState::Loading).await;
    assert_eq!(
        h.query.status(Network::Testnet, Some(&owner)),
        SubscriptionState::Resolved(Some(new_subscription))
    );

    let submitted = h.wallet_bridge.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].operation, Operation::Subscribe);
    assert_eq!(submitted[0].payment_amount(), Some(10_000_000_000));

    let last = h.notifications.recent().pop().unwrap();
    assert_eq!(last.kind, NotificationKind::Success);
    assert_eq!(last.message, "Subscription successful!");
}

#[tokio::test]
async fn failed_transaction_keeps_cached_subscription() {
    let h = harness(ScriptedWallet::new(SubmitBehaviour::Respond(Err(WalletError::Rejected(
        "User rejected the request".to_string(),
    )))));
    let owner = connect(&h).await;
    h.query.get_subscription_status(Network::Testnet, Some(&owner)).await;
    let key = QueryKey::subscription(Network::Testnet, &owner);
    let generation = h.query.cache().generation(&key);

    let outcome = h.service.subscribe(1, 3).await;

    assert_eq!(
        outcome,
        ExecutionOutcome::failure("Subscription failed: Request rejected: User rejected the request")
    );
    assert_eq!(h.query.cache().generation(&key), generation);
    assert_eq!(h.query.status(Network::Testnet, Some(&owner)), SubscriptionState::Resolved(None));
    let last = h.notifications.recent().pop().unwrap();
    assert_eq!(last.kind, NotificationKind::Error);
}

#[tokio::test]
async fn aborted_execution_reports_failure() {
    let h = harness(ScriptedWallet::new(SubmitBehaviour::Respond(Ok(response(
        "Fa1led",
        Some("failure"),
    )))));
    connect(&h).await;

    let outcome = h.service.subscribe(1, 1).await;
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn renewal_is_charged_at_current_tier() {
    let h = harness(ScriptedWallet::approving());
    let owner = connect(&h).await;
    h.chain
        .set_subscriptions(Some(vec![subscription(SubscriptionTier::Basic, &owner, in_thirty_days())]));

    let outcome = h.service.renew(2).await;
    assert!(outcome.is_success());

    let submitted = h.wallet_bridge.submitted();
    assert_eq!(submitted[0].operation, Operation::RenewSubscription);
    assert_eq!(submitted[0].payment_amount(), Some(SubscriptionTier::Basic.price() * 2));
    let last = h.notifications.recent().pop().unwrap();
    assert_eq!(last.message, "Subscription renewed for 2 months!");
}

#[tokio::test]
async fn cancel_without_subscription_is_refused() {
    let h = harness(ScriptedWallet::approving());
    connect(&h).await;

    assert_eq!(h.service.cancel().await, ExecutionOutcome::failure("No subscription to cancel"));
    assert!(h.wallet_bridge.submitted().is_empty());
}

#[tokio::test]
async fn auto_renew_targets_the_subscription_object() {
    let h = harness(ScriptedWallet::approving());
    let owner = connect(&h).await;
    h.chain
        .set_subscriptions(Some(vec![subscription(SubscriptionTier::Premium, &owner, in_thirty_days())]));

    assert!(h.service.set_auto_renew(true).await.is_success());

    let submitted = h.wallet_bridge.submitted();
    let (target, _) = submitted[0].move_call().unwrap();
    assert!(target.ends_with("::set_auto_renew"));
    assert_eq!(submitted[0].payment_amount(), None);
}

#[tokio::test]
async fn disconnected_subscribe_never_reaches_wallet() {
    let h = harness(ScriptedWallet::approving());

    let outcome = h.service.subscribe(1, 1).await;

    assert_eq!(outcome, ExecutionOutcome::failure("Please connect your wallet first"));
    assert!(h.wallet_bridge.submitted().is_empty());
}

#[tokio::test]
async fn invalid_tier_never_reaches_wallet() {
    let h = harness(ScriptedWallet::approving());
    connect(&h).await;

    for (tier, months) in [(0, 1), (4, 1), (1, 0)] {
        assert!(!h.service.subscribe(tier, months).await.is_success());
    }
    assert!(h.wallet_bridge.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn periodic_refetch_follows_session_changes() {
    let h = harness(ScriptedWallet::approving());
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let task = h.query.clone().spawn_refetch(h.wallet.watch(), stop_rx);

    let owner = connect(&h).await;
    let query = h.query.clone();
    let owner_clone = owner.clone();
    settle(move || query.status(Network::Testnet, Some(&owner_clone)) != SubscriptionState::Loading).await;
    let calls = h.chain.subscription_calls.load(Ordering::SeqCst);

    tokio::time::sleep(REFETCH_EVERY + Duration::from_secs(1)).await;
    assert!(h.chain.subscription_calls.load(Ordering::SeqCst) > calls);

    stop_tx.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn abandoned_read_does_not_block_later_resolution() {
    let h = harness(ScriptedWallet::approving());
    let owner = connect(&h).await;
    let current = subscription(SubscriptionTier::Basic, &owner, in_thirty_days());
    h.chain.set_subscriptions(Some(vec![current.clone()]));
    let _gate = h.chain.gate_subscriptions();

    let abandoned = tokio::time::timeout(
        Duration::from_secs(1),
        h.query.get_subscription_status(Network::Testnet, Some(&owner)),
    )
    .await;
    assert!(abandoned.is_err());
    assert!(!h.query.is_fetching(Network::Testnet, &owner));

    h.chain.open_subscriptions();
    h.query.resolve_in_background(Network::Testnet, &owner);
    let query = h.query.clone();
    let owner_clone = owner.clone();
    settle(move || query.status(Network::Testnet, Some(&owner_clone)) != SubscriptionState::Loading).await;
    assert_eq!(
        h.query.status(Network::Testnet, Some(&owner)),
        SubscriptionState::Resolved(Some(current))
    );
}

#[tokio::test]
async fn read_started_before_invalidation_is_discarded() {
    let h = harness(ScriptedWallet::approving());
    let owner = connect(&h).await;
    let gate = h.chain.gate_subscriptions();

    let query = h.query.clone();
    let reader_owner = owner.clone();
    let late = tokio::spawn(async move { query.refetch(Network::Testnet, &reader_owner).await });
    while h.chain.subscription_calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    // a mutation lands while the old read is still on the wire
    h.query.invalidate(Network::Testnet, &owner);
    let renewed = subscription(SubscriptionTier::Premium, &owner, in_thirty_days());
    h.chain.set_subscriptions(Some(vec![renewed.clone()]));
    h.chain.open_subscriptions();
    gate.notify_one();

    assert_eq!(late.await.unwrap(), None);
    assert_eq!(h.query.status(Network::Testnet, Some(&owner)), SubscriptionState::Loading);

    assert_eq!(
        h.query.get_subscription_status(Network::Testnet, Some(&owner)).await,
        Some(renewed)
    );
}

#[tokio::test]
async fn view_content_records_view_without_touching_cache() {
    let h = harness(ScriptedWallet::approving());
    let owner = connect(&h).await;
    h.chain
        .set_subscriptions(Some(vec![subscription(SubscriptionTier::Basic, &owner, in_thirty_days())]));
    h.query.get_subscription_status(Network::Testnet, Some(&owner)).await;
    let key = QueryKey::subscription(Network::Testnet, &owner);
    let generation = h.query.cache().generation(&key);

    let outcome = h.service.view_content("movie-42").await;
    assert!(outcome.is_success());

    let submitted = h.wallet_bridge.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].operation, Operation::ViewContent);
    assert_eq!(submitted[0].payment_amount(), None);
    assert_eq!(h.query.cache().generation(&key), generation);
}

#[tokio::test]
async fn view_content_needs_current_subscription() {
    let h = harness(ScriptedWallet::approving());
    let owner = connect(&h).await;
    h.chain
        .set_subscriptions(Some(vec![subscription(SubscriptionTier::Ultimate, &owner, now_secs() - 60)]));

    assert_eq!(
        h.service.view_content("movie-42").await,
        ExecutionOutcome::failure("An active subscription is required to view content")
    );
    assert!(h.wallet_bridge.submitted().is_empty());
}
