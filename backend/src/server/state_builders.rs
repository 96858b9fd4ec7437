//! Wiring from Diesel repositories to the driving ports handlers use.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use logistics::domain::{AccountDirectory, InventoryService, TransferWorkflowService};
use logistics::inbound::http::state::HttpState;
use logistics::outbound::persistence::{
    DbPool, DieselInventoryRepository, DieselTransferRepository, DieselUserRepository,
};

/// Build handler state over `pool`, stamping workflow events with `clock`.
pub(super) fn build_http_state(pool: &DbPool, clock: Arc<dyn Clock>) -> web::Data<HttpState> {
    let transfers = TransferWorkflowService::new(
        Arc::new(DieselTransferRepository::new(pool.clone())),
        clock,
    );
    let inventory = InventoryService::new(Arc::new(DieselInventoryRepository::new(pool.clone())));
    let accounts = AccountDirectory::new(Arc::new(DieselUserRepository::new(pool.clone())));
    web::Data::new(HttpState::from_services(
        Arc::new(transfers),
        Arc::new(inventory),
        Arc::new(accounts),
    ))
}

/// Wall-clock time for production request stamping.
pub(super) fn system_clock() -> Arc<dyn Clock> {
    Arc::new(DefaultClock)
}
