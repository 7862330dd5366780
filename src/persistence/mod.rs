//! Persistence layer (spec.md §4.3) — backend-neutral repositories over a
//! relational store. Every public function here is one call = one
//! transaction; nothing holds a connection open across an `.await` that
//! isn't itself a database call.

mod ids;
mod placeholder;
mod pool;

pub mod captain_logs;
pub mod container_logs;
pub mod containers;
pub mod markets;
pub mod players;
pub mod routes;
pub mod ship_assignments;
pub mod ships;
pub mod waypoints;

pub use pool::Db;
