pub mod engine;
pub mod rank;
pub mod rules;

pub use engine::ScoreCalculator;
pub use rank::{HeuristicRankModel, RankInput, RankModel};
