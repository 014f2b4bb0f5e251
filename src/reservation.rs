//! Reservation ledger.
//!
//! The ledger is the only shared-resource discipline in the scheduler: an
//! advisory board recording which entities, stockpile cells, container
//! capacity and map cells are claimed by a live job. Other subsystems (the
//! AI planner, stockpile logic) consult it and skip claimed candidates; the
//! scheduler itself never blocks on a claim.
//!
//! # Release Guarantee
//!
//! Every claim is an RAII guard. Dropping the guard (explicitly, or by
//! dropping the job that owns it) releases the claim exactly once, whatever
//! path led to the drop.
//!
//! The ledger is a cheap `Rc` handle and is intentionally `!Send`: the whole
//! scheduler runs on the simulation thread.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::error::JobError;
use crate::models::{ContainerId, Coordinate, EntityId, ItemType, JobId, MarkerId, StockpileId};

/// Something observing a container's contents.
///
/// Only stockpiles matter to the scheduler; everything else is carried
/// along opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerListener {
    Stockpile(StockpileId),
    Other(EntityId),
}

impl ContainerListener {
    /// The stockpile behind this listener, if it is one.
    pub fn stockpile(self) -> Option<StockpileId> {
        match self {
            ContainerListener::Stockpile(id) => Some(id),
            ContainerListener::Other(_) => None,
        }
    }
}

/// A marker drawn on the map for the lifetime of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapMarker {
    pub position: Coordinate,
    pub label: String,
}

impl MapMarker {
    pub fn new(position: Coordinate, label: impl Into<String>) -> Self {
        Self {
            position,
            label: label.into(),
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    entities: HashSet<EntityId>,
    spots: HashMap<(StockpileId, Coordinate), Option<ItemType>>,
    container_space: HashMap<ContainerId, i32>,
    marked_ground: HashSet<Coordinate>,
    markers: BTreeMap<MarkerId, MapMarker>,
    next_marker: u32,
    connections: HashMap<EntityId, JobId>,
    listeners: HashMap<ContainerId, Vec<ContainerListener>>,
}

/// Shared handle to the claim board.
#[derive(Clone, Default)]
pub struct ReservationLedger {
    state: Rc<RefCell<LedgerState>>,
}

impl ReservationLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    // ======================== Claims ========================

    /// Claims an entity exclusively.
    pub fn claim_entity(&self, entity: EntityId) -> Result<EntityClaim, JobError> {
        if !self.state.borrow_mut().entities.insert(entity) {
            return Err(JobError::EntityReserved(entity));
        }
        Ok(EntityClaim {
            ledger: self.clone(),
            entity,
        })
    }

    /// Claims one stockpile cell for an item type.
    pub fn claim_spot(
        &self,
        stockpile: StockpileId,
        location: Coordinate,
        item_type: Option<ItemType>,
    ) -> Result<SpotClaim, JobError> {
        let mut state = self.state.borrow_mut();
        if state.spots.contains_key(&(stockpile, location)) {
            return Err(JobError::SpotReserved {
                stockpile,
                location,
            });
        }
        state.spots.insert((stockpile, location), item_type);
        Ok(SpotClaim {
            ledger: self.clone(),
            stockpile,
            location,
            item_type,
        })
    }

    /// Reserves `max(1, bulk)` units of capacity inside a container.
    pub fn claim_space(&self, container: ContainerId, bulk: i32) -> SpaceClaim {
        let bulk = bulk.max(1);
        *self
            .state
            .borrow_mut()
            .container_space
            .entry(container)
            .or_insert(0) += bulk;
        SpaceClaim {
            ledger: self.clone(),
            container,
            bulk,
        }
    }

    /// Flags a map cell exclusively.
    pub fn mark_ground(&self, cell: Coordinate) -> Result<GroundMark, JobError> {
        if !self.state.borrow_mut().marked_ground.insert(cell) {
            return Err(JobError::GroundMarked(cell));
        }
        Ok(GroundMark {
            ledger: self.clone(),
            cell,
        })
    }

    /// Places a map marker.
    pub fn place_marker(&self, marker: MapMarker) -> MarkerClaim {
        let mut state = self.state.borrow_mut();
        let id = MarkerId(state.next_marker);
        state.next_marker += 1;
        state.markers.insert(id, marker);
        MarkerClaim {
            ledger: self.clone(),
            id,
        }
    }

    /// Records that `entity` refers back to `job`.
    ///
    /// A newer connection on the same entity replaces the old one.
    pub fn connect(&self, entity: EntityId, job: JobId) -> EntityConnection {
        self.state.borrow_mut().connections.insert(entity, job);
        EntityConnection {
            ledger: self.clone(),
            entity,
            job,
        }
    }

    // ======================== Listeners ========================

    /// Registers a container listener.
    pub fn add_container_listener(&self, container: ContainerId, listener: ContainerListener) {
        let mut state = self.state.borrow_mut();
        let listeners = state.listeners.entry(container).or_default();
        if !listeners.contains(&listener) {
            listeners.push(listener);
        }
    }

    /// Unregisters a container listener.
    pub fn remove_container_listener(&self, container: ContainerId, listener: ContainerListener) {
        let mut state = self.state.borrow_mut();
        if let Some(listeners) = state.listeners.get_mut(&container) {
            listeners.retain(|l| *l != listener);
        }
    }

    /// Stockpiles listening to a container.
    pub fn stockpiles_listening(&self, container: ContainerId) -> Vec<StockpileId> {
        self.state
            .borrow()
            .listeners
            .get(&container)
            .map(|ls| ls.iter().filter_map(|l| l.stockpile()).collect())
            .unwrap_or_default()
    }

    /// Bulk currently reserved in containers a stockpile listens to.
    ///
    /// Lets stockpile logic count incoming items before they arrive.
    pub fn stockpile_incoming_bulk(&self, stockpile: StockpileId) -> i32 {
        let state = self.state.borrow();
        state
            .container_space
            .iter()
            .filter(|(container, _)| {
                state.listeners.get(container).is_some_and(|ls| {
                    ls.iter().any(|l| l.stockpile() == Some(stockpile))
                })
            })
            .map(|(_, bulk)| *bulk)
            .sum()
    }

    // ======================== Queries ========================

    pub fn is_entity_reserved(&self, entity: EntityId) -> bool {
        self.state.borrow().entities.contains(&entity)
    }

    pub fn is_spot_reserved(&self, stockpile: StockpileId, location: Coordinate) -> bool {
        self.state.borrow().spots.contains_key(&(stockpile, location))
    }

    /// Item type a reserved spot is held for.
    pub fn reserved_spot_type(
        &self,
        stockpile: StockpileId,
        location: Coordinate,
    ) -> Option<ItemType> {
        self.state
            .borrow()
            .spots
            .get(&(stockpile, location))
            .copied()
            .flatten()
    }

    /// Capacity reserved inside a container (0 if none).
    pub fn reserved_space(&self, container: ContainerId) -> i32 {
        self.state
            .borrow()
            .container_space
            .get(&container)
            .copied()
            .unwrap_or(0)
    }

    pub fn is_ground_marked(&self, cell: Coordinate) -> bool {
        self.state.borrow().marked_ground.contains(&cell)
    }

    pub fn marker(&self, id: MarkerId) -> Option<MapMarker> {
        self.state.borrow().markers.get(&id).cloned()
    }

    pub fn marker_count(&self) -> usize {
        self.state.borrow().markers.len()
    }

    /// Job an entity currently refers back to.
    pub fn connected_job(&self, entity: EntityId) -> Option<JobId> {
        self.state.borrow().connections.get(&entity).copied()
    }

    /// Whether no claim of any kind is outstanding.
    pub fn is_idle(&self) -> bool {
        let state = self.state.borrow();
        state.entities.is_empty()
            && state.spots.is_empty()
            && state.container_space.is_empty()
            && state.marked_ground.is_empty()
            && state.markers.is_empty()
            && state.connections.is_empty()
    }
}

impl fmt::Debug for ReservationLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReservationLedger").finish_non_exhaustive()
    }
}

// ======================== Guards ========================

/// Exclusive claim on an entity.
#[derive(Debug)]
pub struct EntityClaim {
    ledger: ReservationLedger,
    entity: EntityId,
}

impl EntityClaim {
    pub fn entity(&self) -> EntityId {
        self.entity
    }
}

impl Drop for EntityClaim {
    fn drop(&mut self) {
        self.ledger.state.borrow_mut().entities.remove(&self.entity);
    }
}

/// Claim on a stockpile cell.
#[derive(Debug)]
pub struct SpotClaim {
    ledger: ReservationLedger,
    stockpile: StockpileId,
    location: Coordinate,
    item_type: Option<ItemType>,
}

impl SpotClaim {
    pub fn stockpile(&self) -> StockpileId {
        self.stockpile
    }

    pub fn location(&self) -> Coordinate {
        self.location
    }

    pub fn item_type(&self) -> Option<ItemType> {
        self.item_type
    }
}

impl Drop for SpotClaim {
    fn drop(&mut self) {
        self.ledger
            .state
            .borrow_mut()
            .spots
            .remove(&(self.stockpile, self.location));
    }
}

/// Reserved capacity inside a container.
#[derive(Debug)]
pub struct SpaceClaim {
    ledger: ReservationLedger,
    container: ContainerId,
    bulk: i32,
}

impl SpaceClaim {
    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn bulk(&self) -> i32 {
        self.bulk
    }
}

impl Drop for SpaceClaim {
    fn drop(&mut self) {
        let mut state = self.ledger.state.borrow_mut();
        if let Some(space) = state.container_space.get_mut(&self.container) {
            *space -= self.bulk;
            if *space <= 0 {
                state.container_space.remove(&self.container);
            }
        }
    }
}

/// An exclusively marked map cell.
#[derive(Debug)]
pub struct GroundMark {
    ledger: ReservationLedger,
    cell: Coordinate,
}

impl GroundMark {
    pub fn cell(&self) -> Coordinate {
        self.cell
    }
}

impl Drop for GroundMark {
    fn drop(&mut self) {
        self.ledger.state.borrow_mut().marked_ground.remove(&self.cell);
    }
}

/// A placed map marker.
#[derive(Debug)]
pub struct MarkerClaim {
    ledger: ReservationLedger,
    id: MarkerId,
}

impl MarkerClaim {
    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn marker(&self) -> Option<MapMarker> {
        self.ledger.marker(self.id)
    }
}

impl Drop for MarkerClaim {
    fn drop(&mut self) {
        self.ledger.state.borrow_mut().markers.remove(&self.id);
    }
}

/// An entity's back reference to a job.
#[derive(Debug)]
pub struct EntityConnection {
    ledger: ReservationLedger,
    entity: EntityId,
    job: JobId,
}

impl EntityConnection {
    pub fn entity(&self) -> EntityId {
        self.entity
    }
}

impl Drop for EntityConnection {
    fn drop(&mut self) {
        let mut state = self.ledger.state.borrow_mut();
        if state.connections.get(&self.entity) == Some(&self.job) {
            state.connections.remove(&self.entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_claim_released_on_drop() {
        let ledger = ReservationLedger::new();
        let claim = ledger.claim_entity(EntityId(1)).unwrap();
        assert!(ledger.is_entity_reserved(EntityId(1)));
        assert_eq!(claim.entity(), EntityId(1));

        drop(claim);
        assert!(!ledger.is_entity_reserved(EntityId(1)));
        assert!(ledger.is_idle());
    }

    #[test]
    fn test_entity_double_claim_refused() {
        let ledger = ReservationLedger::new();
        let _held = ledger.claim_entity(EntityId(5)).unwrap();
        assert_eq!(
            ledger.claim_entity(EntityId(5)).unwrap_err(),
            JobError::EntityReserved(EntityId(5))
        );
    }

    #[test]
    fn test_spot_claim() {
        let ledger = ReservationLedger::new();
        let at = Coordinate::new(3, 3);
        let claim = ledger
            .claim_spot(StockpileId(1), at, Some(ItemType(4)))
            .unwrap();
        assert!(ledger.is_spot_reserved(StockpileId(1), at));
        assert_eq!(ledger.reserved_spot_type(StockpileId(1), at), Some(ItemType(4)));
        assert!(!ledger.is_spot_reserved(StockpileId(2), at));
        assert!(ledger.claim_spot(StockpileId(1), at, None).is_err());

        drop(claim);
        assert!(!ledger.is_spot_reserved(StockpileId(1), at));
    }

    #[test]
    fn test_space_claims_accumulate() {
        let ledger = ReservationLedger::new();
        let a = ledger.claim_space(ContainerId(1), 3);
        let b = ledger.claim_space(ContainerId(1), 0); // clamped to 1
        assert_eq!(b.bulk(), 1);
        assert_eq!(ledger.reserved_space(ContainerId(1)), 4);

        drop(a);
        assert_eq!(ledger.reserved_space(ContainerId(1)), 1);
        drop(b);
        assert_eq!(ledger.reserved_space(ContainerId(1)), 0);
        assert!(ledger.is_idle());
    }

    #[test]
    fn test_ground_mark_exclusive() {
        let ledger = ReservationLedger::new();
        let cell = Coordinate::new(7, 1);
        let mark = ledger.mark_ground(cell).unwrap();
        assert!(ledger.is_ground_marked(cell));
        assert_eq!(
            ledger.mark_ground(cell).unwrap_err(),
            JobError::GroundMarked(cell)
        );
        drop(mark);
        assert!(!ledger.is_ground_marked(cell));
    }

    #[test]
    fn test_markers() {
        let ledger = ReservationLedger::new();
        let m1 = ledger.place_marker(MapMarker::new(Coordinate::new(1, 1), "dig"));
        let m2 = ledger.place_marker(MapMarker::new(Coordinate::new(2, 2), "fell"));
        assert_ne!(m1.id(), m2.id());
        assert_eq!(ledger.marker_count(), 2);
        assert_eq!(m2.marker().unwrap().label, "fell");

        drop(m1);
        assert_eq!(ledger.marker_count(), 1);
    }

    #[test]
    fn test_connection_replaced_keeps_newer() {
        let ledger = ReservationLedger::new();
        let old = ledger.connect(EntityId(3), JobId(1));
        let _new = ledger.connect(EntityId(3), JobId(2));
        drop(old);
        assert_eq!(ledger.connected_job(EntityId(3)), Some(JobId(2)));
    }

    #[test]
    fn test_stockpile_incoming_bulk() {
        let ledger = ReservationLedger::new();
        ledger.add_container_listener(ContainerId(1), ContainerListener::Stockpile(StockpileId(9)));
        ledger.add_container_listener(ContainerId(1), ContainerListener::Other(EntityId(4)));
        ledger.add_container_listener(ContainerId(2), ContainerListener::Other(EntityId(4)));

        let _a = ledger.claim_space(ContainerId(1), 2);
        let _b = ledger.claim_space(ContainerId(2), 5);

        assert_eq!(ledger.stockpiles_listening(ContainerId(1)), vec![StockpileId(9)]);
        assert!(ledger.stockpiles_listening(ContainerId(2)).is_empty());
        assert_eq!(ledger.stockpile_incoming_bulk(StockpileId(9)), 2);

        ledger.remove_container_listener(ContainerId(1), ContainerListener::Stockpile(StockpileId(9)));
        assert_eq!(ledger.stockpile_incoming_bulk(StockpileId(9)), 0);
    }
}
