pub mod broadcast;
pub mod live_score_service;
pub mod poller;
pub mod sampler;
pub mod scheduler;
pub mod telemetry;

pub use broadcast::BroadcastService;
pub use live_score_service::LiveScoreService;
pub use poller::LivePollerService;
pub use sampler::TierSamplerService;
pub use scheduler::SchedulerService;
