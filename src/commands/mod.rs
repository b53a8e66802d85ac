pub mod minigame;
