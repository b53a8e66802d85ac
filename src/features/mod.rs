pub mod minigame;
pub mod minigame_handler;
