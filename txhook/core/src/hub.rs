use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::extension::{main_carrier, Carrier};
use crate::trace::{SamplingContext, TraceError, Transaction, TransactionContext};

static MAIN_HUB: Lazy<Hub> = Lazy::new(|| Hub::new(main_carrier()));

/// The hub bound to [`main_carrier`](crate::main_carrier).
pub fn current_hub() -> &'static Hub {
    &MAIN_HUB
}

/// Receives transaction lifecycle notifications.
///
/// Both hooks run synchronously on the thread that starts or finishes the
/// transaction.
pub trait TransactionObserver: Send + Sync {
    fn on_transaction_start(&self, transaction: &dyn Transaction);
    fn on_transaction_finish(&self, transaction: &dyn Transaction);
}

/// A pluggable extension registered with a [`Hub`].
pub trait Integration: Send + Sync {
    fn name(&self) -> &str;

    /// The lifecycle hooks this integration offers, if any.
    fn transaction_observer(self: Arc<Self>) -> Option<Arc<dyn TransactionObserver>> {
        None
    }
}

/// The active tracing session.
pub struct Hub {
    carrier: Arc<Carrier>,
    integrations: RwLock<BTreeMap<String, Arc<dyn Integration>>>,
}

impl Hub {
    pub fn new(carrier: Arc<Carrier>) -> Self {
        Hub {
            carrier,
            integrations: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn carrier(&self) -> &Arc<Carrier> {
        &self.carrier
    }

    /// Register `integration` under its name, returning the one it replaces.
    pub fn add_integration(
        &self,
        integration: Arc<dyn Integration>,
    ) -> Option<Arc<dyn Integration>> {
        let name = integration.name().to_string();
        log::debug!("registering integration [{name}]");
        self.integrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, integration)
    }

    pub fn get_integration(&self, name: &str) -> Option<Arc<dyn Integration>> {
        self.integrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn remove_integration(&self, name: &str) -> Option<Arc<dyn Integration>> {
        self.integrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// The first integration, in name order, that offers lifecycle hooks.
    pub fn transaction_observer(&self) -> Option<Arc<dyn TransactionObserver>> {
        let integrations: Vec<_> = {
            let integrations = self
                .integrations
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            integrations.values().cloned().collect()
        };

        integrations
            .into_iter()
            .find_map(|integration| integration.transaction_observer())
    }

    /// Start a transaction through the carrier's registered factory.
    pub fn start_transaction(
        &self,
        ctx: &mut TransactionContext,
        sampling: Option<&SamplingContext>,
    ) -> Result<Arc<dyn Transaction>, TraceError> {
        let factory = self
            .carrier
            .extensions()
            .start_transaction()
            .ok_or(TraceError::TracingExtensionMissing)?;
        factory.start_transaction(self, ctx, sampling)
    }
}
