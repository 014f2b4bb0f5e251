//! In-memory colony.
//!
//! A rectangular map with optional territory and fire sets, a worker roster,
//! entity positions and tool counts. Notifications are recorded so callers
//! can inspect what the scheduler asked workers to do.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::Colony;
use crate::models::{Coordinate, EntityId, ItemCategory, Job, JobId, NpcId};

/// A worker in the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxNpc {
    pub position: Coordinate,
    pub expert: bool,
    pub wielding: Option<ItemCategory>,
}

/// Simple `Colony` implementation backed by plain collections.
#[derive(Debug, Clone)]
pub struct SandboxColony {
    width: i32,
    height: i32,
    /// `None` = the whole map is territory.
    territory: Option<HashSet<Coordinate>>,
    fires: HashSet<Coordinate>,
    npcs: BTreeMap<NpcId, SandboxNpc>,
    entities: HashMap<EntityId, Coordinate>,
    tools: HashMap<ItemCategory, usize>,
    /// `(worker, job)` pairs passed to `start_job`, in call order.
    pub started: Vec<(NpcId, JobId)>,
    /// `(worker, job)` pairs passed to `abort_job`, in call order.
    pub aborted: Vec<(NpcId, JobId)>,
}

impl SandboxColony {
    /// Creates a `width` × `height` map that is entirely territory.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            territory: None,
            fires: HashSet::new(),
            npcs: BTreeMap::new(),
            entities: HashMap::new(),
            tools: HashMap::new(),
            started: Vec::new(),
            aborted: Vec::new(),
        }
    }

    /// Adds a menial worker.
    pub fn with_menial(mut self, npc: NpcId, position: Coordinate) -> Self {
        self.add_npc(npc, position, false);
        self
    }

    /// Adds an expert worker.
    pub fn with_expert(mut self, npc: NpcId, position: Coordinate) -> Self {
        self.add_npc(npc, position, true);
        self
    }

    /// Sets the number of available tools of a category.
    pub fn with_tools(mut self, category: ItemCategory, count: usize) -> Self {
        self.set_tools(category, count);
        self
    }

    /// Restricts territory to the given cells.
    pub fn with_territory(mut self, cells: impl IntoIterator<Item = Coordinate>) -> Self {
        self.territory = Some(cells.into_iter().collect());
        self
    }

    pub fn add_npc(&mut self, npc: NpcId, position: Coordinate, expert: bool) {
        self.npcs.insert(
            npc,
            SandboxNpc {
                position,
                expert,
                wielding: None,
            },
        );
    }

    pub fn remove_npc(&mut self, npc: NpcId) {
        self.npcs.remove(&npc);
    }

    pub fn npc(&self, npc: NpcId) -> Option<&SandboxNpc> {
        self.npcs.get(&npc)
    }

    /// Puts an item of `category` in the worker's hands.
    pub fn wield(&mut self, npc: NpcId, category: ItemCategory) {
        if let Some(n) = self.npcs.get_mut(&npc) {
            n.wielding = Some(category);
        }
    }

    pub fn set_tools(&mut self, category: ItemCategory, count: usize) {
        self.tools.insert(category, count);
    }

    pub fn place_entity(&mut self, entity: EntityId, position: Coordinate) {
        self.entities.insert(entity, position);
    }

    pub fn ignite(&mut self, at: Coordinate) {
        self.fires.insert(at);
    }

    pub fn extinguish(&mut self, at: Coordinate) {
        self.fires.remove(&at);
    }

    /// Job most recently started by a worker.
    pub fn last_started(&self, npc: NpcId) -> Option<JobId> {
        self.started
            .iter()
            .rev()
            .find(|(n, _)| *n == npc)
            .map(|(_, job)| *job)
    }
}

impl Colony for SandboxColony {
    fn is_inside(&self, at: Coordinate) -> bool {
        at.x >= 0 && at.y >= 0 && at.x < self.width && at.y < self.height
    }

    fn is_territory(&self, at: Coordinate) -> bool {
        self.territory.as_ref().map_or(true, |t| t.contains(&at))
    }

    fn on_fire(&self, at: Coordinate) -> bool {
        self.fires.contains(&at)
    }

    fn entity_position(&self, entity: EntityId) -> Option<Coordinate> {
        self.entities.get(&entity).copied()
    }

    fn npc_position(&self, npc: NpcId) -> Option<Coordinate> {
        self.npcs.get(&npc).map(|n| n.position)
    }

    fn npc_is_expert(&self, npc: NpcId) -> bool {
        self.npcs.get(&npc).is_some_and(|n| n.expert)
    }

    fn npc_wields(&self, npc: NpcId, category: ItemCategory) -> bool {
        self.npcs
            .get(&npc)
            .is_some_and(|n| n.wielding == Some(category))
    }

    fn available_tools(&self, category: ItemCategory) -> usize {
        self.tools.get(&category).copied().unwrap_or(0)
    }

    fn start_job(&mut self, npc: NpcId, job: &Job) {
        self.started.push((npc, job.id()));
    }

    fn abort_job(&mut self, npc: NpcId, job: JobId) {
        self.aborted.push((npc, job));
    }
}
