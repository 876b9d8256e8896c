pub mod config;
pub mod daemon;
pub mod engine;
pub mod ipc;
pub mod monitor;
pub mod notifier;
pub mod scheduler;
pub mod session;
pub mod status;
pub mod techniques;

pub use daemon::Daemon;
pub use engine::{Engine, EngineConfig, TickOutcome};
pub use scheduler::{
    Intervention, InterventionHistory, InterventionScheduler, InterventionVariant,
    TechniquePicker,
};
pub use session::{SessionEvent, SessionState, SessionTracker, WatchConfiguration};
pub use status::StatusUpdate;
