pub mod config;
pub mod cooldown;
pub mod dive;
pub mod eligibility;
pub mod enemy;
pub mod enemy_fire;
pub mod formation;
pub mod level;
pub mod life;
pub mod motion;
pub mod pool;
pub mod scoring;
pub mod session;
pub mod weapon;

pub use config::ArcadeConfig;
pub use session::{ArcadeSession, FrameInput, RunCounters, RunSummary};
