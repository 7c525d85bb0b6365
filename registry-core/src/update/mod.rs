//! Update subsystem (§4.7): checking, caching, scheduling and opt-in
//! auto-apply, all layered on top of
//! [`crate::manager::RegistryManager::check_updates`].

pub mod auto_update;
pub mod cache;
pub mod checker;
pub mod scheduler;

pub use auto_update::AutoUpdateService;
pub use cache::UpdateCache;
pub use checker::UpdateChecker;
pub use scheduler::{UpdateFrequency, UpdateScheduler, UPDATE_SCHEDULER_ALLOW_TIMERS_IN_TESTS};
