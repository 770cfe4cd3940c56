//! Engine wired to an in-memory ledger and a mock rate source.

use std::sync::Arc;

use cf_funding_engine::{
    Address, Amount, EngineConfig, FundingApi, FundingService, InMemoryLedger, MemorySessionStore,
    MilestoneDraft, MockRateSource, ProjectId, Provisioner,
};
use rust_decimal::Decimal;

pub const CHARITY: Address = Address([0xc1; 20]);
pub const ALICE: Address = Address([0xa1; 20]);
pub const BOB: Address = Address([0xb2; 20]);

pub type Engine = FundingService<InMemoryLedger, MockRateSource>;

pub struct World {
    pub ledger: Arc<InMemoryLedger>,
    pub rates: Arc<MockRateSource>,
    pub engine: Engine,
}

/// Provision a session the way a first run does, then build the engine.
pub async fn world_with(config: EngineConfig) -> World {
    let ledger = Arc::new(InMemoryLedger::new());
    let rates = Arc::new(MockRateSource::with_rate(Decimal::from(2500)));
    let store = Arc::new(MemorySessionStore::new());
    let session = Provisioner::new(ledger.clone(), store)
        .ensure_session(CHARITY)
        .await
        .unwrap();
    let engine = FundingService::new(ledger.clone(), rates.clone(), session, &config);
    World {
        ledger,
        rates,
        engine,
    }
}

pub async fn world() -> World {
    world_with(EngineConfig::for_testing()).await
}

pub fn amt(v: u64) -> Amount {
    Amount::from(v)
}

/// goal=100, milestones 40 and 60.
pub async fn wells(engine: &Engine) -> ProjectId {
    engine
        .create_project(
            CHARITY,
            "Clean water wells",
            amt(100),
            vec![
                MilestoneDraft::new("Drill", 40u64),
                MilestoneDraft::new("Pumps", 60u64),
            ],
        )
        .await
        .unwrap()
        .project_id
        .unwrap()
}
