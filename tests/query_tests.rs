//! Command and query layer tests.
//!
//! Wire the in-memory repositories and a scripted vault into a
//! `TradingCommands`, then check what lands in the store, what the queries
//! derive from it, and which events get recorded.

use async_trait::async_trait;
use perps_risk::query::{
    AccountMetricsQuery, CurrentAccountOpenPositionsQuery, IncreasePositionParams,
    IncreasePositionRequest, MarketConfigQuery, PositionHistoryQuery, Repositories,
    RiskMetricsQuery, VaultError, VaultPort,
};
use perps_risk::repository::{
    AssetPriceFilter, CandleFilter, InMemoryAssetPriceRepository, InMemoryAssetRepository,
    InMemoryCandleRepository, InMemoryMarketConfigRepository, InMemoryPositionRepository,
};
use perps_risk::*;
use std::sync::{Arc, Mutex};

const ME: &str = "0xme";
const OTHER: &str = "0xother";

struct ScriptedVault {
    account: Option<Address>,
    reject_with: Option<String>,
    submitted: Mutex<Vec<IncreasePositionRequest>>,
}

impl ScriptedVault {
    fn connected() -> Self {
        Self {
            account: Some(Address::new(ME)),
            reject_with: None,
            submitted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VaultPort for ScriptedVault {
    async fn account(&self) -> Option<Address> {
        self.account.clone()
    }

    async fn increase_position(&self, request: &IncreasePositionRequest) -> Result<(), VaultError> {
        if let Some(reason) = &self.reject_with {
            return Err(VaultError(reason.clone()));
        }
        self.submitted.lock().unwrap().push(request.clone());
        Ok(())
    }
}

fn revision(id: &str, stable: &str, account: &str, at: i64, size: i128, collateral: i128) -> PositionEntity {
    PositionEntity {
        revision_id: PositionRevisionId::new(id),
        stable_id: PositionStableId::new(stable),
        account: Address::new(account),
        asset_id: AssetId::new("0xbtc"),
        side: Side::Long,
        is_latest: true,
        change: PositionChange::Increase,
        timestamp: Timestamp::from_secs(at),
        collateral_delta: Collateral::from_units(collateral),
        size_delta: Size::from_units(size),
        pnl_delta: Usd::zero(),
        fees: PositionFees::default(),
        size: Size::from_units(size),
        collateral: Collateral::from_units(collateral),
        realized_pnl: Usd::zero(),
        entry_price: Price::zero(),
    }
}

fn btc_price(units: i128, at: i64) -> AssetPriceEntity {
    AssetPriceEntity::new(AssetId::new("0xbtc"), Price::from_units(units), Timestamp::from_secs(at))
}

struct Harness {
    commands: TradingCommands,
    positions: Arc<InMemoryPositionRepository>,
    vault: Arc<ScriptedVault>,
}

fn harness_with(vault: ScriptedVault, configs: Vec<MarketConfigEntity>) -> Harness {
    let positions = Arc::new(InMemoryPositionRepository::new(vec![
        revision("r1", "mine", ME, 100, 1, 50_000),
        revision("r2", "theirs", OTHER, 100, 2, 90_000),
    ]));
    positions.append(PositionEntity {
        change: PositionChange::Close,
        size: Size::zero(),
        collateral: Collateral::zero(),
        ..revision("r3", "closed", ME, 200, 0, 0)
    });

    let assets = vec![AssetEntity {
        asset_id: AssetId::new("0xbtc"),
        symbol: "BTC".to_string(),
        name: "Bitcoin".to_string(),
        decimals: 9,
        contract_id: None,
        is_base_asset: Some(false),
    }];
    let candles = vec![Candle {
        asset: AssetId::new("0xbtc"),
        interval: CandleInterval::H1,
        close_price: Price::from_units(55_000),
        high_price: Price::from_units(56_000),
        low_price: Price::from_units(54_000),
        started_at: Timestamp::from_secs(3_600),
    }];

    let repos = Repositories {
        assets: Arc::new(InMemoryAssetRepository::new(assets)),
        asset_prices: Arc::new(InMemoryAssetPriceRepository::new(vec![
            btc_price(50_000, 10),
            btc_price(55_000, 20),
        ])),
        candles: Arc::new(InMemoryCandleRepository::new(candles)),
        market_configs: Arc::new(InMemoryMarketConfigRepository::new(configs)),
        positions: positions.clone(),
    };
    let vault = Arc::new(vault);
    let commands = TradingCommands::new(
        Arc::new(TradingStore::new()),
        repos,
        vault.clone(),
        CoreConfig::default(),
    );
    Harness {
        commands,
        positions,
        vault,
    }
}

fn harness() -> Harness {
    harness_with(
        ScriptedVault::connected(),
        vec![MarketConfigEntity::btc_default(AssetId::new("0xbtc"))],
    )
}

#[tokio::test]
async fn fetches_fill_store_slices() {
    let h = harness();
    let store = h.commands.store().clone();

    h.commands.fetch_assets().await.unwrap();
    h.commands
        .fetch_historical_asset_prices(AssetPriceFilter::default())
        .await
        .unwrap();
    h.commands
        .fetch_candles(CandleFilter::new(CandleInterval::H1))
        .await
        .unwrap();
    h.commands.fetch_market_config(&AssetId::new("0xbtc")).await.unwrap();

    assert_eq!(store.assets().data.len(), 1);
    assert_eq!(store.asset_prices().data.len(), 2);
    assert_eq!(store.candles().data.len(), 1);
    assert_eq!(store.status(SliceKey::MarketConfigs), FetchStatus::Fulfilled);
    assert!(h.commands.events().is_empty());
}

#[tokio::test]
async fn latest_price_lands_in_store() {
    let h = harness();
    let price = h
        .commands
        .fetch_latest_asset_price(&AssetId::new("0xbtc"))
        .await
        .unwrap();
    assert_eq!(price.map(|p| p.price), Some(Price::from_units(55_000)));
    assert_eq!(h.commands.store().asset_prices().data.len(), 1);

    let before = h.commands.store().asset_prices().data;
    let missing = h
        .commands
        .fetch_latest_asset_price(&AssetId::new("0xeth"))
        .await
        .unwrap();
    assert!(missing.is_none());
    let after = h.commands.store().asset_prices();
    assert_eq!(after.status, FetchStatus::Fulfilled);
    assert!(Arc::ptr_eq(&before, &after.data));
}

#[tokio::test]
async fn missing_market_config_rejects_the_slice() {
    let h = harness_with(ScriptedVault::connected(), Vec::new());
    let err = h
        .commands
        .fetch_market_config(&AssetId::new("0xbtc"))
        .await
        .unwrap_err();
    assert_eq!(err, RepositoryError::MarketConfigNotFound(AssetId::new("0xbtc")));

    let query = MarketConfigQuery::new(h.commands.store().clone());
    assert_eq!(query.fetch_status(), FetchStatus::Rejected);
    assert_eq!(query.error(), Some(err.to_string()));
    assert!(query.all().is_empty());

    let events = h.commands.take_events();
    assert_eq!(events.len(), 1);
    match &events[0].payload {
        EventPayload::FetchRejected(e) => assert_eq!(e.slice, SliceKey::MarketConfigs),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(h.commands.events().is_empty());
}

#[tokio::test]
async fn open_positions_follow_the_current_user() {
    let h = harness();
    let store = h.commands.store().clone();
    let query = CurrentAccountOpenPositionsQuery::new(store.clone());

    h.commands
        .fetch_positions_by_account(&Address::new(ME))
        .await
        .unwrap();
    h.commands
        .fetch_positions_by_account(&Address::new(OTHER))
        .await
        .unwrap();
    assert!(query.get().is_empty());

    h.commands.set_current_user(Some(Address::new(ME)));
    let open = query.get();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].stable_id, PositionStableId::new("mine"));
    assert!(Arc::ptr_eq(&open, &query.get()));

    h.commands.set_current_user(None);
    assert!(query.get().is_empty());
}

#[tokio::test]
async fn new_revision_invalidates_memoized_views() {
    let h = harness();
    let store = h.commands.store().clone();
    let history = PositionHistoryQuery::new(store.clone());
    let id = PositionStableId::new("mine");

    h.commands.fetch_positions_by_stable_id(&id).await.unwrap();
    let before = history.get(&id);
    assert_eq!(before.len(), 1);
    assert!(Arc::ptr_eq(&before, &history.get(&id)));

    h.positions.append(revision("r4", "mine", ME, 300, 2, 100_000));
    h.commands.fetch_positions_by_stable_id(&id).await.unwrap();

    let after = history.get(&id);
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].revision_id, PositionRevisionId::new("r4"));
    assert!(after[0].is_latest);
    assert!(!after[1].is_latest);
}

#[tokio::test]
async fn risk_metrics_need_a_loaded_price() {
    let h = harness();
    let store = h.commands.store().clone();
    let query = RiskMetricsQuery::new(store.clone());
    let id = PositionStableId::new("mine");

    h.commands.fetch_positions_by_stable_id(&id).await.unwrap();
    h.commands.fetch_market_configs().await.unwrap();
    assert_eq!(
        query.get(&id, Usd::from_units(10_000)).unwrap_err(),
        QueryError::MissingOraclePrice(AssetId::new("0xbtc"))
    );

    h.commands
        .fetch_asset_prices(&[AssetId::new("0xbtc")])
        .await
        .unwrap();
    let metrics = query.get(&id, Usd::from_units(10_000)).unwrap();
    assert_eq!(metrics.initial_margin, Usd::from_units(2_750));
    assert_eq!(metrics.max_leverage, Ratio::from_units(20));
}

#[tokio::test]
async fn account_metrics_value_open_positions() {
    let h = harness();
    h.commands
        .fetch_positions_by_account(&Address::new(ME))
        .await
        .unwrap();
    h.commands
        .fetch_asset_prices(&[AssetId::new("0xbtc")])
        .await
        .unwrap();
    h.commands.set_current_user(Some(Address::new(ME)));

    let query = AccountMetricsQuery::new(h.commands.store().clone());
    let metrics = query.get(Usd::from_units(10_000), Usd::from_units(2_750));
    // 1 BTC bought with 50000, marked at 55000
    assert_eq!(metrics.equity, Usd::from_units(15_000));
    assert_eq!(metrics.total_notional, Usd::from_units(55_000));
    assert_eq!(metrics.margin_usage.to_string(), "18.333333");
}

#[tokio::test]
async fn increase_position_submits_sized_request() {
    let h = harness();
    let params = IncreasePositionParams {
        is_long: true,
        index_asset: AssetId::new("0xbtc"),
        collateral_asset: AssetId::new("0xusdc"),
        leverage: Ratio::from_units(10),
        collateral_amount: Collateral::from_units(100),
    };

    let request = h.commands.increase_position(&params).await.unwrap();
    assert_eq!(request.account, Address::new(ME));
    assert_eq!(request.size.raw(), 1_000_000_000);
    assert_eq!(h.vault.submitted.lock().unwrap().len(), 1);

    let events = h.commands.events();
    assert_eq!(events.len(), 1);
    match &events[0].payload {
        EventPayload::PositionIncreased(e) => {
            assert_eq!(e.side, Side::Long);
            assert_eq!(e.size, Size::from_units(1_000));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn increase_position_surfaces_vault_failures() {
    let params = IncreasePositionParams {
        is_long: false,
        index_asset: AssetId::new("0xbtc"),
        collateral_asset: AssetId::new("0xusdc"),
        leverage: Ratio::from_units(2),
        collateral_amount: Collateral::from_units(10),
    };

    let disconnected = harness_with(
        ScriptedVault {
            account: None,
            ..ScriptedVault::connected()
        },
        Vec::new(),
    );
    assert_eq!(
        disconnected.commands.increase_position(&params).await.unwrap_err(),
        QueryError::NoCurrentUser
    );
    assert!(disconnected.commands.events().is_empty());

    let rejecting = harness_with(
        ScriptedVault {
            reject_with: Some("insufficient allowance".to_string()),
            ..ScriptedVault::connected()
        },
        Vec::new(),
    );
    let err = rejecting.commands.increase_position(&params).await.unwrap_err();
    assert_eq!(
        err,
        QueryError::Vault(VaultError("insufficient allowance".to_string()))
    );
    let events = rejecting.commands.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0].payload,
        EventPayload::VaultOperationFailed(e) if e.operation == "increase_position"
    ));
    assert!(rejecting.vault.submitted.lock().unwrap().is_empty());
}
