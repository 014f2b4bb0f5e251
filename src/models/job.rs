//! Job model.
//!
//! A job is an ordered sequence of tasks plus scheduling metadata: priority,
//! worker class, dependency links, reservations, retry accounting and
//! completion state.
//!
//! # Dependencies
//!
//! Jobs form a forest. A job's `prerequisites` must settle before it may be
//! scheduled; its `parent` is the job it was created to serve, and failing a
//! job fails its parent chain (the cascade itself is run by `JobManager`).
//!
//! # Reservations
//!
//! Claims taken through the job (`reserve_entity`, `reserve_spot`,
//! `reserve_space`, `mark_ground`, `add_map_marker`, `connect_to_entity`) are
//! guards owned by the job. They are released when the job is dropped,
//! regardless of how it ended.

use serde::{Deserialize, Serialize};

use super::{
    ContainerId, Coordinate, EntityId, ItemCategory, ItemType, JobArena, JobId, MarkerId, NpcId,
    StockpileId, Task,
};
use crate::colony::Colony;
use crate::error::JobError;
use crate::reservation::{
    EntityClaim, EntityConnection, GroundMark, MapMarker, MarkerClaim, ReservationLedger,
    SpaceClaim, SpotClaim,
};

/// Default number of times a job may be submitted.
pub const DEFAULT_ATTEMPT_LIMIT: u32 = 5;

/// Scheduling priority. Declaration order is scheduling order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum JobPriority {
    VeryHigh,
    High,
    #[default]
    Med,
    Low,
}

/// Number of priority buckets.
pub const PRIORITY_COUNT: usize = 4;

impl JobPriority {
    /// All levels, highest first.
    pub const ALL: [JobPriority; PRIORITY_COUNT] = [
        JobPriority::VeryHigh,
        JobPriority::High,
        JobPriority::Med,
        JobPriority::Low,
    ];

    /// Bucket index (0 = highest).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Level for a bucket index; out-of-range indices fold into `Low`.
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(JobPriority::Low)
    }
}

/// Completion state. Terminal once not `Ongoing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobCompletion {
    #[default]
    Ongoing,
    Success,
    Failure,
}

/// A unit of work for one worker.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    /// Player-facing name.
    pub name: String,
    /// Instructions, executed in order.
    pub tasks: Vec<Task>,
    /// Created by the simulation rather than ordered by the player.
    pub internal: bool,
    /// Effects applied to the worker while running this job.
    pub status_effects: Vec<String>,
    priority: JobPriority,
    completion: JobCompletion,
    prerequisites: Vec<JobId>,
    parent: Option<JobId>,
    menial: bool,
    assigned: Option<NpcId>,
    paused: bool,
    removal_requested: bool,
    attempts: u32,
    attempt_limit: u32,
    required_tool: Option<ItemCategory>,
    obeys_territory: bool,
    fire_allowed: bool,
    reserved_entities: Vec<EntityClaim>,
    reserved_spot: Option<SpotClaim>,
    reserved_container: Option<SpaceClaim>,
    marked_ground: Option<GroundMark>,
    map_markers: Vec<MarkerClaim>,
    connection: Option<EntityConnection>,
}

impl Job {
    /// Creates an empty menial job at `Med` priority.
    pub fn new(id: JobId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            tasks: Vec::new(),
            internal: false,
            status_effects: Vec::new(),
            priority: JobPriority::Med,
            completion: JobCompletion::Ongoing,
            prerequisites: Vec::new(),
            parent: None,
            menial: true,
            assigned: None,
            paused: false,
            removal_requested: false,
            attempts: 0,
            attempt_limit: DEFAULT_ATTEMPT_LIMIT,
            required_tool: None,
            obeys_territory: true,
            fire_allowed: false,
            reserved_entities: Vec::new(),
            reserved_spot: None,
            reserved_container: None,
            marked_ground: None,
            map_markers: Vec::new(),
            connection: None,
        }
    }

    // ======================== Builders ========================

    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Marks the job as expert work.
    pub fn expert(mut self) -> Self {
        self.menial = false;
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_prerequisite(mut self, prerequisite: JobId) -> Self {
        self.add_prerequisite(prerequisite);
        self
    }

    pub fn with_parent(mut self, parent: JobId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_required_tool(mut self, category: ItemCategory) -> Self {
        self.required_tool = Some(category);
        self
    }

    pub fn with_attempt_limit(mut self, limit: u32) -> Self {
        self.attempt_limit = limit;
        self
    }

    /// Allows the job to target cells outside colony territory.
    pub fn disregard_territory(mut self) -> Self {
        self.obeys_territory = false;
        self
    }

    /// Allows the job to target burning cells.
    pub fn allow_fire(mut self) -> Self {
        self.fire_allowed = true;
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn with_status_effect(mut self, effect: impl Into<String>) -> Self {
        self.status_effects.push(effect.into());
        self
    }

    // ======================== Accessors ========================

    #[inline]
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: JobPriority) {
        self.priority = priority;
    }

    pub fn completion(&self) -> JobCompletion {
        self.completion
    }

    /// Whether the job reached a terminal state (success or failure).
    pub fn completed(&self) -> bool {
        self.completion != JobCompletion::Ongoing
    }

    pub fn is_menial(&self) -> bool {
        self.menial
    }

    pub fn prerequisites(&self) -> &[JobId] {
        &self.prerequisites
    }

    pub fn add_prerequisite(&mut self, prerequisite: JobId) {
        if prerequisite != self.id && !self.prerequisites.contains(&prerequisite) {
            self.prerequisites.push(prerequisite);
        }
    }

    pub fn parent(&self) -> Option<JobId> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: Option<JobId>) {
        self.parent = parent;
    }

    pub fn assigned(&self) -> Option<NpcId> {
        self.assigned
    }

    /// Sets or clears (`None`) the assigned worker.
    pub fn assign(&mut self, npc: Option<NpcId>) {
        self.assigned = npc;
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn removal_requested(&self) -> bool {
        self.removal_requested
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn attempt_limit(&self) -> u32 {
        self.attempt_limit
    }

    pub fn required_tool(&self) -> Option<ItemCategory> {
        self.required_tool
    }

    pub fn set_required_tool(&mut self, category: Option<ItemCategory>) {
        self.required_tool = category;
    }

    pub fn requires_tool(&self) -> bool {
        self.required_tool.is_some()
    }

    pub fn obeys_territory(&self) -> bool {
        self.obeys_territory
    }

    pub fn fire_allowed(&self) -> bool {
        self.fire_allowed
    }

    pub fn first_task(&self) -> Option<&Task> {
        self.tasks.first()
    }

    pub fn reserved_entities(&self) -> Vec<EntityId> {
        self.reserved_entities.iter().map(EntityClaim::entity).collect()
    }

    pub fn reserved_spot(&self) -> Option<(StockpileId, Coordinate, Option<ItemType>)> {
        self.reserved_spot
            .as_ref()
            .map(|s| (s.stockpile(), s.location(), s.item_type()))
    }

    pub fn reserved_container(&self) -> Option<(ContainerId, i32)> {
        self.reserved_container
            .as_ref()
            .map(|c| (c.container(), c.bulk()))
    }

    pub fn marked_ground(&self) -> Option<Coordinate> {
        self.marked_ground.as_ref().map(GroundMark::cell)
    }

    pub fn map_markers(&self) -> Vec<MarkerId> {
        self.map_markers.iter().map(MarkerClaim::id).collect()
    }

    pub fn connected_entity(&self) -> Option<EntityId> {
        self.connection.as_ref().map(EntityConnection::entity)
    }

    // ======================== Lifecycle ========================

    /// Counts one submission. Returns `false` once the limit is exceeded.
    pub fn attempt(&mut self) -> bool {
        self.attempts += 1;
        self.attempts <= self.attempt_limit
    }

    /// Marks success. No effect on a job that already finished.
    pub fn complete(&mut self) {
        if self.completion == JobCompletion::Ongoing {
            self.completion = JobCompletion::Success;
            self.assigned = None;
        }
    }

    /// Marks failure and requests removal.
    ///
    /// Returns the parent to fail next, or `None` when the job had already
    /// succeeded (a finished job cannot be failed) or has no parent.
    pub fn fail(&mut self) -> Option<JobId> {
        if self.completion == JobCompletion::Success {
            return None;
        }
        self.completion = JobCompletion::Failure;
        self.assigned = None;
        self.removal_requested = true;
        self.parent
    }

    /// Requests removal once prerequisites allow it.
    pub fn remove(&mut self) {
        self.removal_requested = true;
    }

    /// Whether the job may be dropped: removal requested and no unsettled
    /// prerequisite still depends on it being around.
    pub fn removable(&self, arena: &JobArena) -> bool {
        self.removal_requested && self.prerequisites_completed(arena)
    }

    /// Whether every prerequisite is gone or finished.
    ///
    /// A failed prerequisite counts as finished.
    pub fn prerequisites_completed(&self, arena: &JobArena) -> bool {
        self.prerequisites.iter().all(|&id| arena.is_settled(id))
    }

    /// Whether the parent is gone or finished.
    pub fn parent_completed(&self, arena: &JobArena) -> bool {
        self.parent.map_or(true, |id| arena.is_settled(id))
    }

    // ======================== Validation ========================

    /// Cells the job's tasks act on. A target off the map falls back to the
    /// task entity's position.
    fn checked_cells<'a>(&'a self, colony: &'a dyn Colony) -> impl Iterator<Item = Coordinate> + 'a {
        self.tasks.iter().filter_map(move |task| {
            let mut cell = task.target;
            if !colony.is_inside(cell) {
                if let Some(pos) = task.entity.and_then(|e| colony.entity_position(e)) {
                    cell = pos;
                }
            }
            colony.is_inside(cell).then_some(cell)
        })
    }

    /// Whether a territory-bound job targets a cell outside territory.
    pub fn outside_territory(&self, colony: &dyn Colony) -> bool {
        self.obeys_territory && self.checked_cells(colony).any(|c| !colony.is_territory(c))
    }

    /// Whether a fire-averse job targets a burning cell.
    pub fn invalid_fire_allowance(&self, colony: &dyn Colony) -> bool {
        !self.fire_allowed && self.checked_cells(colony).any(|c| colony.on_fire(c))
    }

    // ======================== Reservations ========================

    /// Claims an entity for this job.
    pub fn reserve_entity(
        &mut self,
        ledger: &ReservationLedger,
        entity: EntityId,
    ) -> Result<(), JobError> {
        let claim = ledger.claim_entity(entity)?;
        self.reserved_entities.push(claim);
        Ok(())
    }

    /// Releases every entity claim.
    pub fn unreserve_entities(&mut self) {
        self.reserved_entities.clear();
    }

    /// Claims a stockpile cell, replacing any spot this job held.
    pub fn reserve_spot(
        &mut self,
        ledger: &ReservationLedger,
        stockpile: StockpileId,
        location: Coordinate,
        item_type: Option<ItemType>,
    ) -> Result<(), JobError> {
        if self
            .reserved_spot
            .as_ref()
            .is_some_and(|s| s.stockpile() == stockpile && s.location() == location)
        {
            self.reserved_spot = None;
        }
        let claim = ledger.claim_spot(stockpile, location, item_type)?;
        self.reserved_spot = Some(claim);
        Ok(())
    }

    pub fn unreserve_spot(&mut self) {
        self.reserved_spot = None;
    }

    /// Reserves capacity in a container, replacing any previous container claim.
    pub fn reserve_space(&mut self, ledger: &ReservationLedger, container: ContainerId, bulk: i32) {
        self.reserved_container = None;
        self.reserved_container = Some(ledger.claim_space(container, bulk));
    }

    pub fn unreserve_space(&mut self) {
        self.reserved_container = None;
    }

    /// Links an entity back to this job.
    pub fn connect_to_entity(&mut self, ledger: &ReservationLedger, entity: EntityId) {
        self.connection = Some(ledger.connect(entity, self.id));
    }

    /// Flags a map cell for the job's lifetime.
    ///
    /// Returns `Ok(false)` and marks nothing when the cell is off the map.
    /// A refused mark leaves the previous one in place.
    pub fn mark_ground(
        &mut self,
        ledger: &ReservationLedger,
        colony: &dyn Colony,
        cell: Coordinate,
    ) -> Result<bool, JobError> {
        if !colony.is_inside(cell) {
            return Ok(false);
        }
        if self.marked_ground() == Some(cell) {
            return Ok(true);
        }
        let mark = ledger.mark_ground(cell)?;
        self.marked_ground = Some(mark);
        Ok(true)
    }

    /// Places a map marker removed together with the job.
    pub fn add_map_marker(&mut self, ledger: &ReservationLedger, marker: MapMarker) -> MarkerId {
        let claim = ledger.place_marker(marker);
        let id = claim.id();
        self.map_markers.push(claim);
        id
    }

    // ======================== Persistence ========================

    /// Plain-data copy of the job for snapshots.
    pub fn to_record(&self) -> JobRecord {
        JobRecord {
            id: self.id,
            name: self.name.clone(),
            priority: self.priority,
            completion: self.completion,
            tasks: self.tasks.clone(),
            prerequisites: self.prerequisites.clone(),
            parent: self.parent,
            menial: self.menial,
            assigned: self.assigned,
            paused: self.paused,
            removal_requested: self.removal_requested,
            attempts: self.attempts,
            attempt_limit: self.attempt_limit,
            required_tool: self.required_tool,
            obeys_territory: self.obeys_territory,
            fire_allowed: self.fire_allowed,
            internal: self.internal,
            status_effects: self.status_effects.clone(),
            reserved_entities: self.reserved_entities(),
            reserved_spot: self.reserved_spot().map(|(stockpile, location, item_type)| {
                SpotRecord {
                    stockpile,
                    location,
                    item_type,
                }
            }),
            reserved_container: self.reserved_container(),
            marked_ground: self.marked_ground(),
            map_markers: self.map_markers.iter().filter_map(MarkerClaim::marker).collect(),
            connected_entity: self.connected_entity(),
        }
    }

    /// Rebuilds a job from a record, re-claiming its reservations on `ledger`.
    pub fn from_record(record: JobRecord, ledger: &ReservationLedger) -> Result<Self, JobError> {
        let mut job = Job::new(record.id, record.name);
        job.priority = record.priority;
        job.completion = record.completion;
        job.tasks = record.tasks;
        job.prerequisites = record.prerequisites;
        job.parent = record.parent;
        job.menial = record.menial;
        job.assigned = record.assigned;
        job.paused = record.paused;
        job.removal_requested = record.removal_requested;
        job.attempts = record.attempts;
        job.attempt_limit = record.attempt_limit;
        job.required_tool = record.required_tool;
        job.obeys_territory = record.obeys_territory;
        job.fire_allowed = record.fire_allowed;
        job.internal = record.internal;
        job.status_effects = record.status_effects;

        for entity in record.reserved_entities {
            job.reserve_entity(ledger, entity)?;
        }
        if let Some(spot) = record.reserved_spot {
            job.reserve_spot(ledger, spot.stockpile, spot.location, spot.item_type)?;
        }
        if let Some((container, bulk)) = record.reserved_container {
            job.reserve_space(ledger, container, bulk);
        }
        if let Some(cell) = record.marked_ground {
            job.marked_ground = Some(ledger.mark_ground(cell)?);
        }
        for marker in record.map_markers {
            job.add_map_marker(ledger, marker);
        }
        if let Some(entity) = record.connected_entity {
            job.connect_to_entity(ledger, entity);
        }
        Ok(job)
    }
}

/// Reserved stockpile cell in a `JobRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotRecord {
    pub stockpile: StockpileId,
    pub location: Coordinate,
    pub item_type: Option<ItemType>,
}

/// Serializable form of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub name: String,
    pub priority: JobPriority,
    pub completion: JobCompletion,
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub prerequisites: Vec<JobId>,
    #[serde(default)]
    pub parent: Option<JobId>,
    pub menial: bool,
    #[serde(default)]
    pub assigned: Option<NpcId>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub removal_requested: bool,
    pub attempts: u32,
    pub attempt_limit: u32,
    #[serde(default)]
    pub required_tool: Option<ItemCategory>,
    pub obeys_territory: bool,
    pub fire_allowed: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub status_effects: Vec<String>,
    #[serde(default)]
    pub reserved_entities: Vec<EntityId>,
    #[serde(default)]
    pub reserved_spot: Option<SpotRecord>,
    #[serde(default)]
    pub reserved_container: Option<(ContainerId, i32)>,
    #[serde(default)]
    pub marked_ground: Option<Coordinate>,
    #[serde(default)]
    pub map_markers: Vec<MapMarker>,
    #[serde(default)]
    pub connected_entity: Option<EntityId>,
}
