//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`) describe what the domain needs from storage;
//! each exposes a typed error so adapters map failures into predictable
//! variants. Driving ports are the use-cases inbound adapters call.

mod macros;
pub(crate) use macros::define_port_error;

mod account_service;
mod inventory;
mod inventory_repository;
mod transfer_repository;
mod transfer_workflow;
mod user_repository;

#[cfg(test)]
pub use account_service::MockAccountService;
pub use account_service::AccountService;
#[cfg(test)]
pub use inventory::{MockInventoryCommand, MockInventoryQuery};
pub use inventory::{InventoryCommand, InventoryQuery};
#[cfg(test)]
pub use inventory_repository::MockInventoryRepository;
pub use inventory_repository::{InventoryRepository, InventoryRepositoryError};
#[cfg(test)]
pub use transfer_repository::MockTransferRepository;
pub use transfer_repository::{TransferRepository, TransferRepositoryError};
#[cfg(test)]
pub use transfer_workflow::{MockTransferQuery, MockTransferWorkflow};
pub use transfer_workflow::{TransferQuery, TransferWorkflow};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{StoredUser, UserRepository, UserRepositoryError};
