//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and only ever talk to driving
//! ports, so they can be exercised against in-memory adapters.

use std::sync::Arc;

use crate::domain::ports::{
    AccountService, InventoryCommand, InventoryQuery, TransferQuery, TransferWorkflow,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub transfers: Arc<dyn TransferWorkflow>,
    pub transfers_query: Arc<dyn TransferQuery>,
    pub inventory: Arc<dyn InventoryCommand>,
    pub inventory_query: Arc<dyn InventoryQuery>,
    pub accounts: Arc<dyn AccountService>,
}

impl HttpState {
    /// Build state from services that implement both halves of their
    /// command/query pair.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use logistics::domain::{AccountDirectory, InventoryService, TransferWorkflowService};
    /// use logistics::inbound::http::state::HttpState;
    /// use logistics::test_support::InMemoryLogisticsStore;
    /// use mockable::DefaultClock;
    ///
    /// let store = Arc::new(InMemoryLogisticsStore::default());
    /// let state = HttpState::from_services(
    ///     Arc::new(TransferWorkflowService::new(store.clone(), Arc::new(DefaultClock))),
    ///     Arc::new(InventoryService::new(store.clone())),
    ///     Arc::new(AccountDirectory::new(store)),
    /// );
    /// let _accounts = state.accounts.clone();
    /// ```
    pub fn from_services<T, I, A>(transfers: Arc<T>, inventory: Arc<I>, accounts: Arc<A>) -> Self
    where
        T: TransferWorkflow + TransferQuery + 'static,
        I: InventoryCommand + InventoryQuery + 'static,
        A: AccountService + 'static,
    {
        Self {
            transfers: transfers.clone(),
            transfers_query: transfers,
            inventory: inventory.clone(),
            inventory_query: inventory,
            accounts,
        }
    }
}
