//! # Service Registry
//!
//! Maps a service type identifier to the factory that builds it. Keys are
//! unique and the last registration wins. Lookups clone the stored `Arc`
//! under a read lock, so a lookup racing a registration sees either the old
//! or the new factory.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use shared_types::{ServiceOptions, ServiceProposal};
use tracing::{info, warn};

use crate::domain::errors::ServiceError;
use crate::ports::{Service, ServiceFactory};

#[derive(Default)]
pub struct ServiceRegistry {
    factories: RwLock<HashMap<String, Arc<dyn ServiceFactory>>>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for `service_type`, replacing any previous one.
    pub fn register(&self, service_type: impl Into<String>, factory: Arc<dyn ServiceFactory>) {
        let service_type = service_type.into();
        info!("[pn-05] Registering service factory: {}", service_type);
        let previous = self.factories.write().insert(service_type.clone(), factory);
        if previous.is_some() {
            warn!(
                service_type = %service_type,
                "[pn-05] Service factory replaced an earlier registration"
            );
        }
    }

    #[must_use]
    pub fn lookup(&self, service_type: &str) -> Option<Arc<dyn ServiceFactory>> {
        self.factories.read().get(service_type).cloned()
    }

    /// Registered service types, sorted.
    #[must_use]
    pub fn service_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// Look up the factory for `service_type` and run it.
    ///
    /// # Errors
    ///
    /// [`ServiceError::UnsupportedServiceType`] when nothing is registered,
    /// otherwise the factory's error.
    pub async fn create(
        &self,
        service_type: &str,
        options: ServiceOptions,
    ) -> Result<(Arc<dyn Service>, ServiceProposal), ServiceError> {
        let factory = self
            .lookup(service_type)
            .ok_or_else(|| ServiceError::UnsupportedServiceType {
                requested: service_type.to_string(),
                supported: self.service_types(),
            })?;
        factory.create(options).await
    }
}
