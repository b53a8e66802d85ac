pub mod discord;
pub mod packs;
pub mod store;
