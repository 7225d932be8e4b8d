pub mod manager_handler;
pub mod rank_handler;
pub mod tier_handler;
pub mod transfer_handler;
