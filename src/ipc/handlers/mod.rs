pub mod auth;
pub mod core;
pub mod flappy;
pub mod games;
pub mod notes;
pub mod roster;
