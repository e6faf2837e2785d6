//! Real-time configuration synchronization.
//!
//! Subscribes to the store's change stream for one `(company, service)`
//! identity, invalidates the shared cache and force-reloads on each matching
//! event, then publishes the fresh configuration downstream. Consumers
//! decide when to recompute; this component never calculates.
//!
//! No automatic reconnect: a dropped transport moves the subscription to
//! `Closed` and the engine keeps serving cached/fallback configuration.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ConfigCache;
use crate::config::ServiceConfig;
use crate::error::PricingError;
use crate::store::ConfigStore;

/// Subscription lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Subscribing,
    Active,
    Closed,
}

pub struct RealtimeSync {
    store: Arc<dyn ConfigStore>,
    cache: Arc<ConfigCache>,
}

/// Handle owning a live subscription's background task.
///
/// `unsubscribe()` (or dropping the handle) stops the task; a subscription
/// never outlives its handle.
#[derive(Debug)]
pub struct Subscription {
    state: Arc<Mutex<SyncState>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Subscription {
    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn unsubscribe(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = SyncState::Closed;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl RealtimeSync {
    pub fn new(store: Arc<dyn ConfigStore>, cache: Arc<ConfigCache>) -> Self {
        Self { store, cache }
    }

    /// Channel form: fresh configurations are published to the returned
    /// receiver after each matching change event.
    pub async fn subscribe_channel(
        &self,
        service_name: &str,
        company_id: &str,
    ) -> Result<(Subscription, mpsc::Receiver<Arc<ServiceConfig>>), PricingError> {
        let state = Arc::new(Mutex::new(SyncState::Subscribing));

        let mut events = self
            .store
            .subscribe(company_id, service_name)
            .await
            .map_err(|e| {
                *state.lock().unwrap_or_else(|p| p.into_inner()) = SyncState::Closed;
                PricingError::Subscription {
                    company_id: company_id.to_string(),
                    service_name: service_name.to_string(),
                    reason: e.to_string(),
                }
            })?;

        *state.lock().unwrap_or_else(|p| p.into_inner()) = SyncState::Active;
        info!(company_id, service_name, "Config subscription active");

        let (tx, rx) = mpsc::channel(16);
        let cache = self.cache.clone();
        let task_state = state.clone();
        let company = company_id.to_string();
        let service = service_name.to_string();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        // Filter by identity before acting
                        if event.company_id != company || event.service_name != service {
                            debug!(
                                event_company = %event.company_id,
                                event_service = %event.service_name,
                                "Ignoring change event for different identity"
                            );
                            continue;
                        }

                        info!(
                            company_id = %company,
                            service_name = %service,
                            event_type = ?event.event_type,
                            "Config change received, refreshing cache"
                        );
                        cache.invalidate(&company, &service);
                        let fresh = cache.force_reload(&company, &service).await;
                        crate::metrics::record_sync_event(&service);

                        if tx.send(fresh).await.is_err() {
                            // Receiver gone; nothing left to notify
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed events collapse into one refresh
                        warn!(
                            company_id = %company,
                            service_name = %service,
                            skipped,
                            "Change stream lagged, forcing refresh"
                        );
                        let fresh = cache.force_reload(&company, &service).await;
                        if tx.send(fresh).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        warn!(
                            company_id = %company,
                            service_name = %service,
                            "Change stream closed, subscription ended"
                        );
                        break;
                    }
                }
            }
            *task_state.lock().unwrap_or_else(|p| p.into_inner()) = SyncState::Closed;
        });

        Ok((
            Subscription {
                state,
                tasks: vec![task],
            },
            rx,
        ))
    }

    /// Callback form of [`Self::subscribe_channel`], matching the classic
    /// `subscribe(service, company, on_update) -> unsubscribe` contract.
    pub async fn subscribe<F>(
        &self,
        service_name: &str,
        company_id: &str,
        on_update: F,
    ) -> Result<Subscription, PricingError>
    where
        F: Fn(Arc<ServiceConfig>) + Send + Sync + 'static,
    {
        let (mut subscription, mut rx) = self.subscribe_channel(service_name, company_id).await?;

        // Drive the callback from the channel. Both tasks live in the same
        // handle so unsubscribe (or drop) stops the whole chain.
        let state = subscription.state.clone();
        let task = tokio::spawn(async move {
            while let Some(config) = rx.recv().await {
                on_update(config);
            }
            *state.lock().unwrap_or_else(|p| p.into_inner()) = SyncState::Closed;
        });
        subscription.tasks.push(task);

        Ok(subscription)
    }
}
