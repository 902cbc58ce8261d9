// Lubrication schedules and service history
pub mod maintenance;

// Oil and grease stock
pub mod ledger;

// Standard operating procedures
pub mod sop;

pub mod settings;

// External text completion
pub mod advisor;

use tracing::warn;

use crate::errors::ServiceError;

/// Reads fall back to an empty list while storage is unavailable.
pub(crate) fn degrade<T>(
    result: Result<Vec<T>, ServiceError>,
    what: &str,
) -> Result<Vec<T>, ServiceError> {
    match result {
        Err(ServiceError::StorageUnavailable(reason)) => {
            warn!(%reason, "{} unavailable; returning empty list", what);
            Ok(Vec::new())
        }
        other => other,
    }
}
