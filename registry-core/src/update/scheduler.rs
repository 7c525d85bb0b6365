//! Update scheduler (§4.7): a cooperative background timer that triggers
//! periodic update checks according to the configured frequency.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::update::auto_update::AutoUpdateService;

/// Delay before the first check after the scheduler starts, giving the host
/// time to finish its own startup before the network fires.
const STARTUP_DELAY: Duration = Duration::from_secs(5);

/// When set to any non-empty value, [`UpdateScheduler::run`] uses its real
/// timers even under `cfg(test)`. Without it, a test build's `run` returns
/// immediately; tests drive checks directly via
/// [`UpdateScheduler::run_once`] instead of waiting on real sleeps.
pub const UPDATE_SCHEDULER_ALLOW_TIMERS_IN_TESTS: &str = "UPDATE_SCHEDULER_ALLOW_TIMERS_IN_TESTS";

/// How often the scheduler re-checks for updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateFrequency {
    /// Check once every 24 hours.
    Daily,
    /// Check once every 7 days.
    Weekly,
    /// Never check automatically; only an explicit [`UpdateScheduler::run_once`] checks.
    Manual,
}

impl UpdateFrequency {
    /// Parse the free-form string stored in `RegistrySettings::update_frequency`,
    /// defaulting to `Daily` for anything unrecognised.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "weekly" => UpdateFrequency::Weekly,
            "manual" => UpdateFrequency::Manual,
            _ => UpdateFrequency::Daily,
        }
    }

    fn interval(self) -> Option<Duration> {
        match self {
            UpdateFrequency::Daily => Some(Duration::from_secs(24 * 60 * 60)),
            UpdateFrequency::Weekly => Some(Duration::from_secs(7 * 24 * 60 * 60)),
            UpdateFrequency::Manual => None,
        }
    }
}

/// Drives an [`AutoUpdateService`] on a cooperative loop: one startup check
/// roughly five seconds in, then repeating checks at the active
/// frequency's interval. The active frequency is held in a
/// [`watch::Sender`] so [`Self::update_schedule`] can swap it while `run`
/// is sleeping, without tearing down and respawning the task.
pub struct UpdateScheduler {
    auto_update: Arc<AutoUpdateService>,
    frequency: watch::Sender<UpdateFrequency>,
}

impl UpdateScheduler {
    /// Build a scheduler around `auto_update`, checking at `frequency`.
    pub fn new(auto_update: Arc<AutoUpdateService>, frequency: UpdateFrequency) -> Self {
        let (frequency, _) = watch::channel(frequency);
        Self {
            auto_update,
            frequency,
        }
    }

    /// Cancel and replace the active schedule. Takes effect on `run`'s next
    /// wakeup; the task keeps running, nothing is respawned.
    pub fn update_schedule(&self, new_frequency: UpdateFrequency) {
        self.frequency.send_replace(new_frequency);
    }

    /// Run the scheduler loop forever. Intended to be spawned onto its own
    /// task; cancel by dropping the `JoinHandle`.
    pub async fn run(self) {
        if cfg!(test) && std::env::var(UPDATE_SCHEDULER_ALLOW_TIMERS_IN_TESTS).is_err() {
            warn!(
                "UpdateScheduler::run called under test without {} set; returning immediately",
                UPDATE_SCHEDULER_ALLOW_TIMERS_IN_TESTS
            );
            return;
        }

        sleep(STARTUP_DELAY).await;
        self.run_once().await;

        let mut frequency = self.frequency.subscribe();
        loop {
            let current = *frequency.borrow_and_update();
            let Some(interval) = current.interval() else {
                info!("update frequency is manual, waiting for a schedule change");
                if frequency.changed().await.is_err() {
                    return;
                }
                continue;
            };

            tokio::select! {
                _ = sleep(interval) => {
                    self.run_once().await;
                }
                changed = frequency.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    // Frequency replaced mid-sleep; loop back and pick up
                    // the new interval without running an extra check.
                }
            }
        }
    }

    /// Run exactly one check-and-apply pass, regardless of frequency or
    /// timers. Used by the startup check, by a "check now" command, and by
    /// tests that don't want to wait on real sleeps.
    pub async fn run_once(&self) {
        if let Err(e) = self.auto_update.check_and_apply().await {
            warn!(error = %e, "scheduled update check failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognises_weekly_and_manual_case_insensitively() {
        assert_eq!(UpdateFrequency::parse("Weekly"), UpdateFrequency::Weekly);
        assert_eq!(UpdateFrequency::parse("MANUAL"), UpdateFrequency::Manual);
    }

    #[test]
    fn parse_defaults_to_daily_for_unrecognised_values() {
        assert_eq!(UpdateFrequency::parse("fortnightly"), UpdateFrequency::Daily);
        assert_eq!(UpdateFrequency::parse(""), UpdateFrequency::Daily);
    }

    #[test]
    fn manual_has_no_repeat_interval() {
        assert_eq!(UpdateFrequency::Manual.interval(), None);
        assert!(UpdateFrequency::Daily.interval().is_some());
        assert!(UpdateFrequency::Weekly.interval().is_some());
    }
}
