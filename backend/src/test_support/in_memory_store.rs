//! In-memory store implementing every driven port.
//!
//! Each operation runs against a staged copy of the tables and only replaces
//! the live tables when it succeeds, so a failed operation writes nothing.
//! The store also enforces a single open location per asset.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::ports::{
    InventoryRepository, InventoryRepositoryError, StoredUser, TransferRepository,
    TransferRepositoryError, UserRepository, UserRepositoryError,
};
use crate::domain::{
    Asset, AssetDisposal, AssetId, AssetListing, AssetLocation, AssetReportRow, Facility,
    FacilityId, NewAsset, NewFacility, PasswordDigest, Role, TransferCommand, TransferDraft,
    TransferListing, TransferMutation, TransferRequest, TransferRequestId, TransferSnapshot,
    TransferStage, TransitRecord, User, UserId, Username, plan_disposal, plan_request,
};

/// Rows held by [`InMemoryLogisticsStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogisticsTables {
    pub users: Vec<StoredUser>,
    pub facilities: Vec<Facility>,
    pub assets: Vec<Asset>,
    pub locations: Vec<AssetLocation>,
    pub requests: Vec<TransferRequest>,
    pub transits: Vec<TransitRecord>,
}

impl LogisticsTables {
    /// The asset's open location row.
    pub fn current_location(&self, asset_id: AssetId) -> Option<&AssetLocation> {
        self.locations
            .iter()
            .find(|row| row.asset_id == asset_id && row.is_current())
    }

    /// Every location row of the asset, oldest first.
    pub fn history(&self, asset_id: AssetId) -> Vec<AssetLocation> {
        let mut rows: Vec<_> = self
            .locations
            .iter()
            .filter(|row| row.asset_id == asset_id)
            .copied()
            .collect();
        rows.sort_by_key(|row| row.arrival);
        rows
    }

    /// Whether an unfinished request references the asset.
    pub fn has_open_request(&self, asset_id: AssetId) -> bool {
        self.requests
            .iter()
            .any(|request| request.asset_id == asset_id && !request.completed)
    }

    /// Transit record of a request.
    pub fn transit(&self, request_id: TransferRequestId) -> Option<&TransitRecord> {
        self.transits
            .iter()
            .find(|record| record.request_id == request_id)
    }

    /// Request by identifier.
    pub fn request(&self, request_id: TransferRequestId) -> Option<&TransferRequest> {
        self.requests.iter().find(|request| request.id == request_id)
    }

    fn facility(&self, facility_id: FacilityId) -> Option<&Facility> {
        self.facilities
            .iter()
            .find(|facility| facility.id == facility_id)
    }

    fn asset(&self, asset_id: AssetId) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.id == asset_id)
    }

    fn listing(&self, request: &TransferRequest) -> Option<TransferListing> {
        Some(TransferListing {
            request: request.clone(),
            asset_tag: self.asset(request.asset_id)?.tag.clone(),
            source: self.facility(request.source)?.clone(),
            destination: self.facility(request.destination)?.clone(),
            transit: self.transit(request.id).copied(),
        })
    }

    fn listings(&self, keep: impl Fn(&TransferRequest) -> bool) -> Vec<TransferListing> {
        self.requests
            .iter()
            .filter(|request| keep(*request))
            .filter_map(|request| self.listing(request))
            .collect()
    }

    fn asset_listing(&self, asset: &Asset) -> AssetListing {
        let current = self.current_location(asset.id);
        AssetListing {
            asset: asset.clone(),
            current_facility: current.and_then(|row| self.facility(row.facility_id).cloned()),
            arrival: current.map(|row| row.arrival),
        }
    }

    fn request_mut(&mut self, request_id: TransferRequestId) -> Result<&mut TransferRequest, String> {
        self.requests
            .iter_mut()
            .find(|request| request.id == request_id)
            .ok_or_else(|| format!("request {request_id} vanished"))
    }

    fn transit_mut(&mut self, request_id: TransferRequestId) -> Result<&mut TransitRecord, String> {
        self.transits
            .iter_mut()
            .find(|record| record.request_id == request_id)
            .ok_or_else(|| format!("no transit record for request {request_id}"))
    }

    fn apply_mutation(
        &mut self,
        request_id: TransferRequestId,
        mutation: TransferMutation,
    ) -> Result<(), String> {
        match mutation {
            TransferMutation::MarkCompleted => self.request_mut(request_id)?.completed = true,
            TransferMutation::MarkApproved {
                approved_by,
                approved_at,
            } => {
                let request = self.request_mut(request_id)?;
                request.approved = true;
                request.approved_by = Some(approved_by);
                request.approved_at = Some(approved_at);
            }
            TransferMutation::InsertTransit => {
                if self.transit(request_id).is_some() {
                    return Err(format!("duplicate transit record for request {request_id}"));
                }
                self.transits.push(TransitRecord::empty(request_id));
            }
            TransferMutation::SetLoadDate(date) => {
                self.transit_mut(request_id)?.load_date = Some(date);
            }
            TransferMutation::SetUnloadDate(date) => {
                self.transit_mut(request_id)?.unload_date = Some(date);
            }
            TransferMutation::CloseLocation {
                asset_id,
                arrival,
                departure,
            } => {
                let row = self
                    .locations
                    .iter_mut()
                    .find(|row| row.asset_id == asset_id && row.arrival == arrival && row.is_current())
                    .ok_or_else(|| format!("asset {asset_id} has no open location to close"))?;
                row.departure = Some(departure);
            }
            TransferMutation::OpenLocation(location) => self.open_location(location)?,
        }
        Ok(())
    }

    fn open_location(&mut self, location: AssetLocation) -> Result<(), String> {
        if self.current_location(location.asset_id).is_some() {
            return Err(format!(
                "asset {} already has an open location",
                location.asset_id
            ));
        }
        self.locations.push(location);
        Ok(())
    }
}

fn next_id(ids: impl Iterator<Item = i32>) -> i32 {
    ids.max().unwrap_or(0) + 1
}

trait StoreFailure {
    fn unavailable(message: String) -> Self;
    fn failed(message: String) -> Self;
}

macro_rules! store_failure {
    ($($error:ty),*) => {
        $(
            impl StoreFailure for $error {
                fn unavailable(message: String) -> Self {
                    Self::Connection { message }
                }

                fn failed(message: String) -> Self {
                    Self::Query { message }
                }
            }
        )*
    };
}

store_failure!(
    TransferRepositoryError,
    InventoryRepositoryError,
    UserRepositoryError
);

/// Store backing every driven port with plain vectors.
///
/// ```
/// use chrono::NaiveDate;
/// use logistics::test_support::InMemoryLogisticsStore;
///
/// let store = InMemoryLogisticsStore::default();
/// let hq = store.seed_facility("HQ", "Headquarters", "Arlington");
/// let arrival = NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid date");
/// let asset = store.seed_asset("A42", hq.id, arrival);
/// let tables = store.tables();
/// assert_eq!(tables.current_location(asset.id).map(|row| row.facility_id), Some(hq.id));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLogisticsStore {
    tables: Mutex<LogisticsTables>,
    offline: AtomicBool,
}

impl InMemoryLogisticsStore {
    /// Copy of the current rows.
    #[expect(clippy::expect_used, reason = "test fixtures fail loudly")]
    pub fn tables(&self) -> LogisticsTables {
        self.tables.lock().expect("store mutex").clone()
    }

    /// Make every subsequent call fail with a connection error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Insert a facility directly.
    #[expect(clippy::expect_used, reason = "test fixtures fail loudly")]
    pub fn seed_facility(&self, code: &str, common_name: &str, location: &str) -> Facility {
        let draft =
            NewFacility::try_new(code, common_name, location).expect("valid seeded facility");
        self.transact::<_, InventoryRepositoryError>(|tables| {
            Ok(insert_facility_row(tables, &draft))
        })
        .expect("seed facility")
    }

    /// Insert an asset and its first open location directly.
    #[expect(clippy::expect_used, reason = "test fixtures fail loudly")]
    pub fn seed_asset(&self, tag: &str, facility_id: FacilityId, arrival: NaiveDate) -> Asset {
        let draft = NewAsset::try_new(tag, "seeded asset", facility_id, arrival)
            .expect("valid seeded asset");
        self.transact::<_, InventoryRepositoryError>(|tables| insert_asset_row(tables, &draft))
            .expect("seed asset")
    }

    /// Register an account with a hashed password.
    #[expect(clippy::expect_used, reason = "test fixtures fail loudly")]
    pub fn seed_user(&self, username: &str, password: &str, role: Role) -> User {
        let name = Username::new(username).expect("valid seeded username");
        let digest = PasswordDigest::hash(password).expect("hash seeded password");
        self.transact::<_, UserRepositoryError>(|tables| {
            insert_user_row(tables, &name, &digest, role)
        })
        .expect("seed user")
    }

    fn transact<T, E: StoreFailure>(
        &self,
        op: impl FnOnce(&mut LogisticsTables) -> Result<T, E>,
    ) -> Result<T, E> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(E::unavailable("in-memory store is offline".to_owned()));
        }
        let mut guard = self
            .tables
            .lock()
            .map_err(|_| E::failed("store mutex poisoned".to_owned()))?;
        let mut staged = guard.clone();
        let value = op(&mut staged)?;
        *guard = staged;
        Ok(value)
    }

    fn read<T, E: StoreFailure>(&self, op: impl FnOnce(&LogisticsTables) -> T) -> Result<T, E> {
        self.transact(|tables| Ok(op(tables)))
    }
}

fn insert_facility_row(tables: &mut LogisticsTables, draft: &NewFacility) -> Facility {
    let facility = Facility {
        id: FacilityId::new(next_id(tables.facilities.iter().map(|f| f.id.value()))),
        code: draft.code().to_owned(),
        common_name: draft.common_name().to_owned(),
        location: draft.location().to_owned(),
    };
    tables.facilities.push(facility.clone());
    facility
}

fn insert_asset_row(
    tables: &mut LogisticsTables,
    draft: &NewAsset,
) -> Result<Asset, InventoryRepositoryError> {
    if tables.facility(draft.facility_id()).is_none() {
        return Err(InventoryRepositoryError::facility_not_found(
            draft.facility_id(),
        ));
    }
    if tables.assets.iter().any(|asset| asset.tag == draft.tag()) {
        return Err(InventoryRepositoryError::duplicate("asset"));
    }
    let asset = Asset {
        id: AssetId::new(next_id(tables.assets.iter().map(|a| a.id.value()))),
        tag: draft.tag().to_owned(),
        description: draft.description().to_owned(),
        disposed: false,
    };
    tables.assets.push(asset.clone());
    tables
        .open_location(AssetLocation::open(
            asset.id,
            draft.facility_id(),
            draft.arrival(),
        ))
        .map_err(InventoryRepositoryError::query)?;
    Ok(asset)
}

fn insert_user_row(
    tables: &mut LogisticsTables,
    username: &Username,
    password: &PasswordDigest,
    role: Role,
) -> Result<User, UserRepositoryError> {
    if tables
        .users
        .iter()
        .any(|stored| stored.user.username == *username)
    {
        return Err(UserRepositoryError::duplicate_username(username.as_str()));
    }
    let user = User {
        id: UserId::new(next_id(tables.users.iter().map(|s| s.user.id.value()))),
        username: username.clone(),
        role,
    };
    tables.users.push(StoredUser {
        user: user.clone(),
        password: password.clone(),
    });
    Ok(user)
}

#[async_trait]
impl TransferRepository for InMemoryLogisticsStore {
    async fn create_request(
        &self,
        draft: TransferDraft,
        requested_by: UserId,
        requested_at: DateTime<Utc>,
    ) -> Result<TransferRequest, TransferRepositoryError> {
        self.transact(|tables| {
            let new = plan_request(
                draft,
                requested_by,
                requested_at,
                tables.current_location(draft.asset_id),
                tables.has_open_request(draft.asset_id),
            )?;
            if tables.facility(new.destination).is_none() {
                return Err(TransferRepositoryError::facility_not_found(
                    new.destination,
                ));
            }
            let request = TransferRequest {
                id: TransferRequestId::new(next_id(tables.requests.iter().map(|r| r.id.value()))),
                asset_id: new.asset_id,
                requested_by: new.requested_by,
                source: new.source,
                destination: new.destination,
                requested_at: new.requested_at,
                approved: false,
                approved_by: None,
                approved_at: None,
                completed: false,
            };
            tables.requests.push(request.clone());
            Ok(request)
        })
    }

    async fn apply(
        &self,
        request_id: TransferRequestId,
        command: TransferCommand,
    ) -> Result<TransferStage, TransferRepositoryError> {
        self.transact(|tables| {
            let request = tables
                .request(request_id)
                .cloned()
                .ok_or_else(|| TransferRepositoryError::request_not_found(request_id))?;
            let snapshot = TransferSnapshot {
                transit: tables.transit(request_id).copied(),
                current_location: tables.current_location(request.asset_id).copied(),
                request,
            };
            let plan = snapshot.plan(&command)?;
            for mutation in plan.mutations {
                tables
                    .apply_mutation(request_id, mutation)
                    .map_err(TransferRepositoryError::query)?;
            }
            Ok(plan.outcome)
        })
    }

    async fn find(
        &self,
        request_id: TransferRequestId,
    ) -> Result<Option<TransferListing>, TransferRepositoryError> {
        self.read(|tables| {
            tables
                .request(request_id)
                .and_then(|request| tables.listing(request))
        })
    }

    async fn list_pending(&self) -> Result<Vec<TransferListing>, TransferRepositoryError> {
        self.read(|tables| tables.listings(|request| !request.approved && !request.completed))
    }

    async fn list_in_transit(&self) -> Result<Vec<TransferListing>, TransferRepositoryError> {
        self.read(|tables| tables.listings(|request| request.approved && !request.completed))
    }
}

#[async_trait]
impl InventoryRepository for InMemoryLogisticsStore {
    async fn insert_facility(
        &self,
        facility: &NewFacility,
    ) -> Result<Facility, InventoryRepositoryError> {
        self.transact(|tables| {
            let taken = tables.facilities.iter().any(|existing| {
                existing.code == facility.code() || existing.common_name == facility.common_name()
            });
            if taken {
                return Err(InventoryRepositoryError::duplicate("facility"));
            }
            Ok(insert_facility_row(tables, facility))
        })
    }

    async fn list_facilities(&self) -> Result<Vec<Facility>, InventoryRepositoryError> {
        self.read(|tables| tables.facilities.clone())
    }

    async fn find_facility(
        &self,
        facility_id: FacilityId,
    ) -> Result<Option<Facility>, InventoryRepositoryError> {
        self.read(|tables| tables.facility(facility_id).cloned())
    }

    async fn insert_asset(&self, asset: &NewAsset) -> Result<Asset, InventoryRepositoryError> {
        self.transact(|tables| insert_asset_row(tables, asset))
    }

    async fn list_assets(&self) -> Result<Vec<AssetListing>, InventoryRepositoryError> {
        self.read(|tables| {
            tables
                .assets
                .iter()
                .map(|asset| tables.asset_listing(asset))
                .collect()
        })
    }

    async fn list_transfer_eligible(
        &self,
    ) -> Result<Vec<AssetListing>, InventoryRepositoryError> {
        self.read(|tables| {
            tables
                .assets
                .iter()
                .filter(|asset| {
                    !asset.disposed
                        && tables.current_location(asset.id).is_some()
                        && !tables.has_open_request(asset.id)
                })
                .map(|asset| tables.asset_listing(asset))
                .collect()
        })
    }

    async fn dispose_asset(
        &self,
        disposal: &AssetDisposal,
    ) -> Result<Asset, InventoryRepositoryError> {
        self.transact(|tables| {
            let asset = tables
                .assets
                .iter()
                .find(|asset| asset.tag == disposal.tag())
                .cloned()
                .ok_or_else(|| InventoryRepositoryError::asset_not_found(disposal.tag()))?;
            let closed = plan_disposal(
                &asset,
                tables.current_location(asset.id),
                tables.has_open_request(asset.id),
                disposal.date(),
            )
            .map_err(InventoryRepositoryError::rejected)?;
            if let Some(closed) = closed {
                let row = tables
                    .locations
                    .iter_mut()
                    .find(|row| row.asset_id == asset.id && row.is_current())
                    .ok_or_else(|| InventoryRepositoryError::query("open location vanished"))?;
                *row = closed;
            }
            let stored = tables
                .assets
                .iter_mut()
                .find(|row| row.id == asset.id)
                .ok_or_else(|| InventoryRepositoryError::query("asset vanished"))?;
            stored.disposed = true;
            Ok(stored.clone())
        })
    }

    async fn asset_report(
        &self,
        date: NaiveDate,
        facility: Option<FacilityId>,
    ) -> Result<Vec<AssetReportRow>, InventoryRepositoryError> {
        self.read(|tables| {
            let mut rows: Vec<AssetReportRow> = tables
                .locations
                .iter()
                .filter(|row| row.covers(date))
                .filter(|row| facility.is_none_or(|id| row.facility_id == id))
                .filter_map(|row| {
                    Some(AssetReportRow {
                        asset: tables.asset(row.asset_id)?.clone(),
                        facility: tables.facility(row.facility_id)?.clone(),
                        arrival: row.arrival,
                        departure: row.departure,
                    })
                })
                .collect();
            rows.sort_by(|a, b| {
                (a.facility.id, &a.asset.tag).cmp(&(b.facility.id, &b.asset.tag))
            });
            rows
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryLogisticsStore {
    async fn insert(
        &self,
        username: &Username,
        password: &PasswordDigest,
        role: Role,
    ) -> Result<User, UserRepositoryError> {
        self.transact(|tables| insert_user_row(tables, username, password, role))
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<StoredUser>, UserRepositoryError> {
        self.read(|tables| {
            tables
                .users
                .iter()
                .find(|stored| stored.user.username == *username)
                .cloned()
        })
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError> {
        self.read(|tables| {
            tables
                .users
                .iter()
                .find(|stored| stored.user.id == id)
                .map(|stored| stored.user.clone())
        })
    }
}
