//! Job scheduling core for colony simulations.
//!
//! Turns units of work ("harvest this plant", "fill this bucket") into a
//! per-tick optimal assignment between idle workers and pending jobs,
//! subject to priorities, dependencies, tool availability and reservations.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Coordinate`, identifiers, `Task`, `Action`, `Job`
//! - **`reservation`**: Advisory claim ledger (entities, stockpile spots,
//!   container space, marked ground, map markers) with RAII release
//! - **`colony`**: The `Colony` collaborator trait and an in-memory `SandboxColony`
//! - **`matching`**: Kuhn-Munkres maximum-weight assignment over a dense matrix
//! - **`dispatching`**: Worker/job scoring used to fill the assignment matrix
//! - **`manager`**: `JobManager` with queues, tick update, batch assignment, snapshots
//! - **`validation`**: Job graph integrity checks (cycles, queue consistency)
//!
//! # Tick Protocol
//!
//! ```text
//! add_job ... npc_waiting ... update(colony) → assign_jobs(colony)
//! ```
//!
//! The crate is single-threaded: both tick entry points run to completion.
//!
//! # References
//!
//! - Kuhn (1955), "The Hungarian Method for the Assignment Problem"
//! - Munkres (1957), "Algorithms for the Assignment and Transportation Problems"

pub mod colony;
pub mod config;
pub mod dispatching;
pub mod error;
pub mod manager;
pub mod matching;
pub mod models;
pub mod reservation;
pub mod validation;

pub use config::DispatchConfig;
pub use error::JobError;
