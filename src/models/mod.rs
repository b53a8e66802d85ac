// Data models
pub mod card;
pub mod challenge;
pub mod schedule;
