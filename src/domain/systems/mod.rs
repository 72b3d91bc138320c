// Per-tick simulation systems operating on the entity store.

pub mod collision;
pub mod movement;
