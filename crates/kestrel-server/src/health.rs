//! Aggregated health of the record store and the shared key-value store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kestrel_core::{RecordStore, SharedClock};
use kestrel_store::SharedStore;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Status of one dependency.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    pub message: String,
}

impl ServiceHealth {
    fn from_ping<E: std::fmt::Display>(name: &str, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                status: HealthStatus::Healthy,
                message: format!("{} connection is healthy", name),
            },
            Err(e) => {
                warn!(service = name, error = %e, "Health check failed");
                Self {
                    status: HealthStatus::Unhealthy,
                    message: format!("{} connection failed: {}", name, e),
                }
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServicesHealth {
    pub database: ServiceHealth,
    pub store: ServiceHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub services: ServicesHealth,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[derive(Clone)]
pub struct HealthService {
    store: SharedStore,
    records: Arc<dyn RecordStore>,
    clock: SharedClock,
}

impl HealthService {
    pub fn new(store: SharedStore, records: Arc<dyn RecordStore>, clock: SharedClock) -> Self {
        Self {
            store,
            records,
            clock,
        }
    }

    /// Pings both stores concurrently. Healthy only when both answer.
    pub async fn check(&self) -> HealthReport {
        let (database, store) = tokio::join!(self.records.ping(), self.store.ping());

        let services = ServicesHealth {
            database: ServiceHealth::from_ping("Database", database),
            store: ServiceHealth::from_ping("Store", store),
        };
        let status = if services.database.is_healthy() && services.store.is_healthy() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport {
            status,
            timestamp: self.clock.now(),
            services,
        }
    }
}
