pub mod errors;
pub mod live_messages;
pub mod manager;
pub mod player;
pub mod scoring;
pub mod squad;
pub mod tier;
