use chrono::Days;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::degrade;
use crate::errors::ServiceError;
use crate::events::{Change, ChangeFeed};
use crate::models::{
    id_or_new, CompleteTaskInput, Equipment, EquipmentInput, RecordFilter, RecordUpdate,
    ServiceRecord,
};
use crate::schedule::{self, SharedClock, StatusSummary};
use crate::store::{OrderBy, StoreHandle};

/// Equipment schedules and their service history
#[derive(Clone)]
pub struct MaintenanceService {
    store: StoreHandle,
    feed: ChangeFeed,
    clock: SharedClock,
}

impl MaintenanceService {
    pub fn new(store: StoreHandle, feed: ChangeFeed, clock: SharedClock) -> Self {
        Self { store, feed, clock }
    }

    #[instrument(skip(self))]
    pub async fn list_equipment(&self) -> Result<Vec<Equipment>, ServiceError> {
        let equipment = match self.store.require() {
            Ok(store) => store.equipment().list(Some(&OrderBy::asc("name"))).await,
            Err(e) => Err(e),
        };
        degrade(equipment, "equipment")
    }

    #[instrument(skip(self))]
    pub async fn search_equipment(&self, term: &str) -> Result<Vec<Equipment>, ServiceError> {
        let term = term.trim();
        let equipment = self.list_equipment().await?;
        if term.is_empty() {
            return Ok(equipment);
        }
        Ok(equipment.into_iter().filter(|eq| eq.matches(term)).collect())
    }

    /// Creates or replaces equipment; the next service date is always recomputed.
    #[instrument(skip(self))]
    pub async fn save_equipment(&self, input: EquipmentInput) -> Result<Equipment, ServiceError> {
        input.validate()?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError("name is required".into()));
        }
        let next_service_date =
            schedule::compute_next_date(input.last_service_date, input.cycle_days)?;
        let store = self.store.require()?;

        let equipment = Equipment {
            id: id_or_new(input.id),
            name: name.to_string(),
            equipment_type: input.equipment_type,
            location: input.location,
            lubricant: input.lubricant,
            cycle_days: input.cycle_days,
            last_service_date: input.last_service_date,
            next_service_date,
            capacity: input.capacity,
            notes: input.notes.filter(|n| !n.trim().is_empty()),
        };
        store.equipment().upsert(vec![equipment.clone()]).await?;
        info!(equipment_id = %equipment.id, next = %equipment.next_service_date, "equipment saved");
        self.feed.publish(Change::Equipment);
        Ok(equipment)
    }

    /// Removes equipment; its service records keep their name snapshot.
    #[instrument(skip(self))]
    pub async fn delete_equipment(&self, id: &str) -> Result<(), ServiceError> {
        let store = self.store.require()?;
        if store.equipment().get(id).await?.is_none() {
            return Err(ServiceError::equipment_not_found(id));
        }
        store.equipment().delete(id).await?;
        info!(equipment_id = %id, "equipment deleted");
        self.feed.publish(Change::Equipment);
        Ok(())
    }

    /// Equipment due today or overdue, most overdue first.
    pub async fn due_items(&self) -> Result<Vec<Equipment>, ServiceError> {
        let equipment = self.list_equipment().await?;
        Ok(schedule::due_items(&equipment, self.clock.today()))
    }

    pub async fn status_summary(&self) -> Result<StatusSummary, ServiceError> {
        let equipment = self.list_equipment().await?;
        Ok(schedule::status_summary(&equipment, self.clock.today()))
    }

    /// Records a completed lubrication task and moves the equipment schedule.
    ///
    /// The record is written first. If the equipment update then fails the
    /// caller gets `PartialCompletion` naming the stored record.
    #[instrument(skip(self, input), fields(photos = input.photos.len()))]
    pub async fn complete_task(
        &self,
        equipment_id: &str,
        input: CompleteTaskInput,
    ) -> Result<ServiceRecord, ServiceError> {
        input.validate()?;
        let performed_by = input.performed_by.trim();
        if performed_by.is_empty() {
            return Err(ServiceError::ValidationError("performedBy is required".into()));
        }
        let store = self.store.require()?;
        let mut equipment = store
            .equipment()
            .get(equipment_id)
            .await?
            .ok_or_else(|| ServiceError::equipment_not_found(equipment_id))?;

        let next_date = match input.next_date {
            Some(date) => date,
            None => schedule::compute_next_date(input.performed_date, equipment.cycle_days)?,
        };

        let record = ServiceRecord {
            id: Uuid::new_v4().to_string(),
            equipment_id: equipment.id.clone(),
            equipment_name: equipment.name.clone(),
            performed_date: input.performed_date,
            performed_by: performed_by.to_string(),
            notes: input.notes,
            photos: input.photos,
        };
        store.records().upsert(vec![record.clone()]).await?;
        self.feed.publish(Change::Records);

        equipment.last_service_date = input.performed_date;
        equipment.next_service_date = next_date;
        if let Err(e) = store.equipment().upsert(vec![equipment.clone()]).await {
            warn!(record_id = %record.id, error = %e, "service record stored but equipment update failed");
            return Err(ServiceError::PartialCompletion {
                record_id: record.id,
                reason: e.to_string(),
            });
        }
        self.feed.publish(Change::Equipment);

        info!(
            equipment_id = %equipment.id,
            record_id = %record.id,
            next = %next_date,
            "task completed"
        );
        Ok(record)
    }

    /// Records newest first, optionally for one piece of equipment.
    #[instrument(skip(self))]
    pub async fn list_records(&self, filter: RecordFilter) -> Result<Vec<ServiceRecord>, ServiceError> {
        let records = match self.store.require() {
            Ok(store) => {
                store
                    .records()
                    .list(Some(&OrderBy::desc("performed_date")))
                    .await
            }
            Err(e) => Err(e),
        };
        let records = degrade(records, "service records")?;
        Ok(match filter.equipment_id {
            Some(equipment_id) => records
                .into_iter()
                .filter(|r| r.equipment_id == equipment_id)
                .collect(),
            None => records,
        })
    }

    /// Corrects a record. The equipment schedule is not recomputed.
    #[instrument(skip(self, input))]
    pub async fn edit_record(
        &self,
        id: &str,
        input: RecordUpdate,
    ) -> Result<ServiceRecord, ServiceError> {
        input.validate()?;
        let store = self.store.require()?;
        let mut record = store
            .records()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Service record {} not found", id)))?;
        record.performed_date = input.performed_date;
        record.performed_by = input.performed_by.trim().to_string();
        record.notes = input.notes;
        record.photos = input.photos;
        store.records().upsert(vec![record.clone()]).await?;
        self.feed.publish(Change::Records);
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn delete_record(&self, id: &str) -> Result<(), ServiceError> {
        let store = self.store.require()?;
        if store.records().get(id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Service record {} not found", id)));
        }
        store.records().delete(id).await?;
        self.feed.publish(Change::Records);
        Ok(())
    }

    /// Clears photos on records performed before `today - retention_days`.
    ///
    /// Returns how many photos were removed. Records themselves are kept and
    /// only changed records are written back.
    #[instrument(skip(self))]
    pub async fn purge_expired_photos(&self, retention_days: u32) -> Result<usize, ServiceError> {
        if retention_days == 0 {
            return Ok(0);
        }
        let Some(cutoff) = self
            .clock
            .today()
            .checked_sub_days(Days::new(u64::from(retention_days)))
        else {
            return Ok(0);
        };
        let store = self.store.require()?;

        let mut removed = 0;
        let changed: Vec<ServiceRecord> = store
            .records()
            .list(None)
            .await?
            .into_iter()
            .filter(|r| r.performed_date < cutoff && !r.photos.is_empty())
            .map(|mut r| {
                removed += r.photos.len();
                r.photos.clear();
                r
            })
            .collect();

        if changed.is_empty() {
            return Ok(0);
        }
        let records = changed.len();
        store.records().upsert(changed).await?;
        info!(%cutoff, records, photos = removed, "expired photos purged");
        self.feed.publish(Change::Records);
        Ok(removed)
    }

    /// Purges with the retention period from the stored settings.
    pub async fn run_retention_sweep(&self) -> Result<usize, ServiceError> {
        let store = self.store.require()?;
        let settings = store.settings().load().await?;
        self.purge_expired_photos(settings.photo_retention_days).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{parse_date, FixedClock};
    use crate::store::LocalStore;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn service(today: &str) -> MaintenanceService {
        MaintenanceService::new(
            StoreHandle::connected(LocalStore::in_memory()),
            ChangeFeed::default(),
            Arc::new(FixedClock::on(parse_date(today).unwrap())),
        )
    }

    fn pump(cycle_days: u32, last: &str) -> EquipmentInput {
        EquipmentInput {
            id: None,
            name: "Cooling pump".into(),
            equipment_type: "Pump".into(),
            location: "Hall B".into(),
            lubricant: "ISO VG 68".into(),
            cycle_days,
            last_service_date: parse_date(last).unwrap(),
            capacity: "1.5L".into(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn saving_recomputes_next_date() {
        let svc = service("2024-01-10");
        let eq = svc.save_equipment(pump(30, "2024-01-01")).await.unwrap();
        assert_eq!(eq.next_service_date, parse_date("2024-01-31").unwrap());
    }

    #[tokio::test]
    async fn zero_cycle_is_rejected() {
        let svc = service("2024-01-10");
        assert_matches!(
            svc.save_equipment(pump(0, "2024-01-01")).await,
            Err(ServiceError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn search_matches_location_case_insensitively() {
        let svc = service("2024-01-10");
        svc.save_equipment(pump(30, "2024-01-01")).await.unwrap();
        assert_eq!(svc.search_equipment("hall b").await.unwrap().len(), 1);
        assert!(svc.search_equipment("warehouse").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn completing_unknown_equipment_is_not_found() {
        let svc = service("2024-02-05");
        let input = CompleteTaskInput {
            performed_date: parse_date("2024-02-05").unwrap(),
            next_date: None,
            notes: String::new(),
            performed_by: "Chen".into(),
            photos: vec![],
        };
        assert_matches!(
            svc.complete_task("missing", input).await,
            Err(ServiceError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn retention_of_zero_days_is_disabled() {
        let svc = service("2024-06-02");
        assert_eq!(svc.purge_expired_photos(0).await.unwrap(), 0);
    }
}
