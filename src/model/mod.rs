//! Core data model types: parsed messages and batch work items.

pub mod item;
pub mod message;
