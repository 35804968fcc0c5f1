//! SeaORM entities for the tables the webhook core reads and writes.
//!
//! The schema itself is owned by the CRUD application; these entities only
//! mirror the columns this service touches.

pub mod agent;
pub mod meeting;

