//! Task model.
//!
//! A task is one atomic instruction inside a job: an action performed at a
//! target cell, optionally on an entity or with an item category. Tasks are
//! read-only once built; the worker executes them in order.

use serde::{Deserialize, Serialize};

use super::{Coordinate, EntityId, ItemCategory};

/// What a worker does when executing a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    NoAction,
    Use,
    Take,
    Drop,
    PutIn,
    Build,
    Move,
    MoveAdjacent,
    MoveNear,
    Wait,
    Drink,
    Eat,
    Find,
    Harvest,
    Fell,
    HarvestWildPlant,
    Kill,
    FleeMap,
    Sleep,
    Dismantle,
    Wield,
    Wear,
    BogIron,
    StockpileItem,
    Quiver,
    Fill,
    Pour,
    Dig,
    Forget,
    Unwield,
    GetAngry,
    CalmDown,
    StartFire,
    Repair,
    FillDitch,
}

impl Action {
    /// Player-facing label for job lists.
    pub fn description(self) -> &'static str {
        match self {
            Action::NoAction => "No Action",
            Action::Use => "Use",
            Action::Take => "Pick up",
            Action::Drop => "Drop",
            Action::PutIn => "Put in",
            Action::Build => "Build",
            Action::Move => "Move",
            Action::MoveAdjacent => "Move adjacent",
            Action::MoveNear => "Move Near",
            Action::Wait => "Wait",
            Action::Drink => "Drink",
            Action::Eat => "Eat",
            Action::Find => "Find",
            Action::Harvest => "Harvest",
            Action::Fell => "Fell",
            Action::HarvestWildPlant => "Harvest plant",
            Action::Kill => "Kill",
            Action::FleeMap => "Flee!!",
            Action::Sleep => "Sleep",
            Action::Dismantle => "Dismantle",
            Action::Wield => "Wield",
            Action::Wear => "Wear",
            Action::BogIron => "Collect bog iron",
            Action::StockpileItem => "Stockpile item",
            Action::Quiver => "Quiver",
            Action::Fill => "Fill",
            Action::Pour => "Pour",
            Action::Dig => "Dig",
            Action::Forget => "Huh?",
            Action::Unwield => "Unwield",
            Action::GetAngry => "Get angry",
            Action::CalmDown => "Calm down",
            Action::StartFire => "Start fire",
            Action::Repair => "Repair",
            Action::FillDitch => "Fill ditch",
        }
    }
}

/// Outcome a worker reports after executing (part of) a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskResult {
    /// Task finished; advance to the next one.
    Success,
    /// Task failed but the job may be retried.
    FailNonFatal,
    /// Task failed; the job cannot succeed.
    FailFatal,
    /// Task needs more ticks.
    Continue,
    /// Worker finished on its own terms (e.g. need satisfied).
    OwnDone,
    /// Pathfinding produced no route.
    PathEmpty,
}

impl TaskResult {
    /// Whether the result ends the job unsuccessfully.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            TaskResult::FailNonFatal | TaskResult::FailFatal | TaskResult::PathEmpty
        )
    }
}

/// An atomic instruction within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// What to do.
    pub action: Action,
    /// Where to do it. `Coordinate::UNDEFINED` when the action has no place.
    pub target: Coordinate,
    /// Entity acted upon, if any.
    pub entity: Option<EntityId>,
    /// Item category the action works with, if any.
    pub item: Option<ItemCategory>,
    /// Action-specific flags.
    pub flags: u32,
}

impl Task {
    /// Creates a task performing `action` at `target`.
    pub fn new(action: Action, target: Coordinate) -> Self {
        Self {
            action,
            target,
            entity: None,
            item: None,
            flags: 0,
        }
    }

    /// Creates a task with no target location.
    pub fn act(action: Action) -> Self {
        Self::new(action, Coordinate::UNDEFINED)
    }

    /// Sets the entity acted upon.
    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Sets the item category.
    pub fn with_item(mut self, item: ItemCategory) -> Self {
        self.item = Some(item);
        self
    }

    /// Sets action flags.
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Whether this task matches an `(action, location)` pair.
    pub fn matches(&self, action: Action, location: Coordinate) -> bool {
        self.action == action && self.target == location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new(Action::Fill, Coordinate::new(4, 2))
            .with_entity(EntityId(9))
            .with_item(ItemCategory(1))
            .with_flags(3);

        assert_eq!(task.action, Action::Fill);
        assert_eq!(task.target, Coordinate::new(4, 2));
        assert_eq!(task.entity, Some(EntityId(9)));
        assert_eq!(task.item, Some(ItemCategory(1)));
        assert_eq!(task.flags, 3);
    }

    #[test]
    fn test_act_has_no_target() {
        let task = Task::act(Action::StockpileItem);
        assert_eq!(task.target, Coordinate::UNDEFINED);
        assert!(task.entity.is_none());
    }

    #[test]
    fn test_matches() {
        let task = Task::new(Action::Dig, Coordinate::new(1, 1));
        assert!(task.matches(Action::Dig, Coordinate::new(1, 1)));
        assert!(!task.matches(Action::Fell, Coordinate::new(1, 1)));
        assert!(!task.matches(Action::Dig, Coordinate::new(1, 2)));
    }

    #[test]
    fn test_action_descriptions() {
        assert_eq!(Action::Take.description(), "Pick up");
        assert_eq!(Action::BogIron.description(), "Collect bog iron");
        assert_eq!(Action::Forget.description(), "Huh?");
    }

    #[test]
    fn test_task_result_failure() {
        assert!(TaskResult::FailFatal.is_failure());
        assert!(TaskResult::PathEmpty.is_failure());
        assert!(!TaskResult::Continue.is_failure());
        assert!(!TaskResult::Success.is_failure());
    }
}
