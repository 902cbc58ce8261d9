pub mod advisor;
pub mod common;
pub mod equipment;
pub mod inventory;
pub mod records;
pub mod settings;
pub mod sop;

use std::sync::Arc;

use crate::events::ChangeFeed;
use crate::schedule::SharedClock;
use crate::services::{
    advisor::MaintenanceAdvisor, ledger::StockLedger, maintenance::MaintenanceService,
    settings::SettingsService, sop::SopService,
};
use crate::store::StoreHandle;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub maintenance: Arc<MaintenanceService>,
    pub ledger: Arc<StockLedger>,
    pub sop: Arc<SopService>,
    pub settings: Arc<SettingsService>,
    pub advisor: Arc<MaintenanceAdvisor>,
}

impl AppServices {
    /// Builds every service over one store handle and change feed.
    pub fn new(
        store: StoreHandle,
        feed: ChangeFeed,
        clock: SharedClock,
        advisor: MaintenanceAdvisor,
    ) -> Self {
        Self {
            maintenance: Arc::new(MaintenanceService::new(
                store.clone(),
                feed.clone(),
                clock.clone(),
            )),
            ledger: Arc::new(StockLedger::new(store.clone(), feed.clone(), clock.clone())),
            sop: Arc::new(SopService::new(store.clone(), feed.clone(), clock)),
            settings: Arc::new(SettingsService::new(store, feed)),
            advisor: Arc::new(advisor),
        }
    }
}
