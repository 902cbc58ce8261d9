use tracing::{info, instrument, warn};

use crate::errors::ServiceError;
use crate::events::{Change, ChangeFeed};
use crate::models::AppSettings;
use crate::store::StoreHandle;

#[derive(Clone)]
pub struct SettingsService {
    store: StoreHandle,
    feed: ChangeFeed,
}

impl SettingsService {
    pub fn new(store: StoreHandle, feed: ChangeFeed) -> Self {
        Self { store, feed }
    }

    /// Stored settings; defaults when the store is not connected.
    pub async fn get_settings(&self) -> Result<AppSettings, ServiceError> {
        match self.store.require() {
            Ok(store) => store.settings().load().await,
            Err(e) => {
                warn!(error = %e, "settings unavailable; using defaults");
                Ok(AppSettings::default())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn update_settings(&self, settings: AppSettings) -> Result<AppSettings, ServiceError> {
        let store = self.store.require()?;
        store.settings().save(settings).await?;
        info!(retention_days = settings.photo_retention_days, "settings updated");
        self.feed.publish(Change::Settings);
        Ok(settings)
    }
}
