//! Scheduler: owns the active randomizers and drives them on a fixed cadence.
//!
//! Every tick sweeps all active randomizers and calls their update pass; the
//! "is anything due" decision lives in the lights themselves. Activation,
//! deactivation, actions and ticks all go through one async mutex, so a tick
//! never observes a half-registered randomizer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use occupancy_domain::action::RandomizerAction;
use occupancy_domain::error::{NotFoundError, OccupancyError};
use occupancy_domain::id::RandomizerId;
use occupancy_domain::randomizer::RandomizerConfig;
use occupancy_domain::time::{self, Timestamp};

use crate::ports::DeviceRegistry;
use crate::randomizer::{Randomizer, UpdateSummary};

/// Default time between two ticks.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5);

/// Shortest pause between two ticks, used when a tick overruns the period.
pub const MIN_SLEEP: Duration = Duration::from_millis(100);

type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Snapshot of one active randomizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomizerStatus {
    pub id: RandomizerId,
    pub name: String,
    pub on: bool,
    pub next_update: Option<Timestamp>,
    pub lights: usize,
}

impl<D: DeviceRegistry> From<&Randomizer<D>> for RandomizerStatus {
    fn from(randomizer: &Randomizer<D>) -> Self {
        Self {
            id: randomizer.id(),
            name: randomizer.name().to_string(),
            on: randomizer.on_state(),
            next_update: randomizer.next_update(),
            lights: randomizer.lights().len(),
        }
    }
}

/// Owns the active randomizers and runs the periodic sweep.
pub struct SchedulerService<D> {
    registry: Arc<D>,
    randomizers: Arc<Mutex<HashMap<RandomizerId, Randomizer<D>>>>,
    period: Duration,
    clock: Clock,
}

impl<D> Clone for SchedulerService<D> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            randomizers: Arc::clone(&self.randomizers),
            period: self.period,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<D: DeviceRegistry + 'static> SchedulerService<D> {
    /// Create a scheduler ticking every `period`, reading the wall clock.
    pub fn new(registry: Arc<D>, period: Duration) -> Self {
        Self {
            registry,
            randomizers: Arc::new(Mutex::new(HashMap::new())),
            period,
            clock: Arc::new(time::now),
        }
    }

    /// Replace the time source used for expiry bookkeeping.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Register a randomizer. Activating an id that is already active is a
    /// no-op and returns `false`.
    #[tracing::instrument(skip(self, config), fields(randomizer = %config.name))]
    pub async fn activate(&self, config: &RandomizerConfig, on: bool) -> bool {
        let randomizer = Randomizer::new(config, on, Arc::clone(&self.registry));
        self.insert(randomizer).await
    }

    /// Register an already-built randomizer (e.g. one with a seeded generator).
    pub async fn insert(&self, randomizer: Randomizer<D>) -> bool {
        let mut randomizers = self.randomizers.lock().await;
        if randomizers.contains_key(&randomizer.id()) {
            tracing::debug!(id = %randomizer.id(), "randomizer already active");
            return false;
        }
        tracing::debug!(
            id = %randomizer.id(),
            lights = randomizer.lights().len(),
            on = randomizer.on_state(),
            "randomizer activated"
        );
        randomizers.insert(randomizer.id(), randomizer);
        true
    }

    /// Forget a randomizer. Its devices and their pending commands are left
    /// untouched. Returns whether it was active.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&self, id: RandomizerId) -> bool {
        let removed = self.randomizers.lock().await.remove(&id).is_some();
        if removed {
            tracing::debug!("randomizer deactivated");
        }
        removed
    }

    /// Status of one active randomizer.
    pub async fn status(&self, id: RandomizerId) -> Option<RandomizerStatus> {
        self.randomizers
            .lock()
            .await
            .get(&id)
            .map(RandomizerStatus::from)
    }

    /// Status of every active randomizer, ordered by id.
    pub async fn statuses(&self) -> Vec<RandomizerStatus> {
        let randomizers = self.randomizers.lock().await;
        let mut all: Vec<_> = randomizers.values().map(RandomizerStatus::from).collect();
        all.sort_by_key(|s| s.id);
        all
    }

    /// Run one sweep over every active randomizer.
    pub async fn tick(&self) -> UpdateSummary {
        let now = (self.clock)();
        let mut randomizers = self.randomizers.lock().await;
        let mut total = UpdateSummary::default();
        for randomizer in randomizers.values_mut() {
            let summary = randomizer.update(now).await;
            total.acted += summary.acted;
            total.failed += summary.failed;
        }
        tracing::debug!(
            randomizers = randomizers.len(),
            acted = total.acted,
            failed = total.failed,
            "tick"
        );
        total
    }

    /// Apply a user action to a randomizer.
    ///
    /// # Errors
    ///
    /// Returns [`OccupancyError::NotFound`] when `id` is not active, or the
    /// host error when the randomizer's own state cannot be published.
    #[tracing::instrument(skip(self))]
    pub async fn handle_action(
        &self,
        id: RandomizerId,
        action: RandomizerAction,
    ) -> Result<(), OccupancyError> {
        let now = (self.clock)();
        let mut randomizers = self.randomizers.lock().await;
        let randomizer = randomizers.get_mut(&id).ok_or_else(|| NotFoundError {
            entity: "Randomizer",
            id: id.to_string(),
        })?;

        match action {
            RandomizerAction::TurnOn => {
                randomizer.set_on_state(true, now).await?;
            }
            RandomizerAction::TurnOff => {
                randomizer.set_on_state(false, now).await?;
            }
            RandomizerAction::Toggle => {
                let value = !randomizer.on_state();
                randomizer.set_on_state(value, now).await?;
            }
            RandomizerAction::RequestStatus => {
                tracing::info!("\"{}\" status update", randomizer.name());
                randomizer.update(now).await;
            }
            RandomizerAction::Freeze => {
                randomizer.cancel(false).await?;
            }
            RandomizerAction::ForceOff => {
                randomizer.cancel(true).await?;
            }
        }
        Ok(())
    }

    /// Apply an action given by name. Unknown names are logged and ignored.
    ///
    /// # Errors
    ///
    /// Same as [`handle_action`](Self::handle_action).
    pub async fn handle_action_name(
        &self,
        id: RandomizerId,
        name: &str,
    ) -> Result<(), OccupancyError> {
        match name.parse::<RandomizerAction>() {
            Ok(action) => self.handle_action(id, action).await,
            Err(err) => {
                tracing::debug!(%id, error = %err, "ignoring action");
                Ok(())
            }
        }
    }

    /// Tick until `shutdown` turns `true` (or its sender is dropped).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(period_secs = self.period.as_secs_f64(), "scheduler started");
        while !*shutdown.borrow_and_update() {
            let started = Instant::now();
            self.tick().await;
            let pause = next_sleep(self.period, started.elapsed());

            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("scheduler stopped");
    }

    /// Spawn [`run`](Self::run) on the tokio runtime.
    #[must_use]
    pub fn start(&self) -> SchedulerHandle {
        let (shutdown, rx) = watch::channel(false);
        let service = self.clone();
        let task = tokio::spawn(async move { service.run(rx).await });
        SchedulerHandle { shutdown, task }
    }
}

/// Handle to a running scheduler loop.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Interrupt the current sleep and wait for the loop to finish.
    pub async fn stop(self) {
        // the loop may already have exited
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "scheduler task ended abnormally");
        }
    }
}

/// Pause before the next tick: what is left of `period`, never less than
/// [`MIN_SLEEP`].
#[must_use]
pub fn next_sleep(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed).max(MIN_SLEEP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Recorded, RecordingRegistry};
    use occupancy_domain::id::DeviceId;
    use occupancy_domain::slot::LightSlotConfig;
    use occupancy_domain::time::after_secs;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn config(id: u64, devices: &[u64]) -> RandomizerConfig {
        let mut config = RandomizerConfig {
            id: RandomizerId::new(id),
            name: format!("Randomizer {id}"),
            slots: [None; 10],
        };
        for (slot, &device) in config.slots.iter_mut().zip(devices) {
            *slot = Some(LightSlotConfig {
                device_id: DeviceId::new(device),
                min_delay: 1,
                max_delay: 1,
                min_duration: 1,
                max_duration: 1,
            });
        }
        config
    }

    /// A clock the test can move forward by hand.
    fn manual_clock() -> (Arc<AtomicI64>, impl Fn() -> Timestamp + Send + Sync + 'static) {
        let offset = Arc::new(AtomicI64::new(0));
        let base = time::now();
        let handle = Arc::clone(&offset);
        let clock = move || {
            let secs = u32::try_from(handle.load(Ordering::SeqCst)).unwrap_or(0);
            after_secs(base, secs)
        };
        (offset, clock)
    }

    fn make(
        devices: &[(u64, &str, bool)],
    ) -> (SchedulerService<RecordingRegistry>, Arc<RecordingRegistry>) {
        let registry = Arc::new(RecordingRegistry::with_devices(devices));
        let scheduler = SchedulerService::new(Arc::clone(&registry), DEFAULT_PERIOD);
        (scheduler, registry)
    }

    fn turn_on_count(registry: &RecordingRegistry) -> usize {
        registry
            .commands()
            .iter()
            .filter(|c| matches!(c, Recorded::TurnOn { .. }))
            .count()
    }

    #[test]
    fn should_sleep_remaining_period() {
        let pause = next_sleep(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(pause, Duration::from_secs(4));
    }

    #[test]
    fn should_clamp_sleep_when_tick_overruns() {
        let pause = next_sleep(Duration::from_secs(5), Duration::from_secs(7));
        assert_eq!(pause, MIN_SLEEP);
    }

    #[tokio::test]
    async fn should_ignore_duplicate_activation() {
        let (scheduler, _) = make(&[(11, "Hall", false)]);
        assert!(scheduler.activate(&config(1, &[11]), false).await);
        assert!(!scheduler.activate(&config(1, &[11]), true).await);

        let status = scheduler.status(RandomizerId::new(1)).await.unwrap();
        assert!(!status.on);
        assert_eq!(status.lights, 1);
    }

    #[tokio::test]
    async fn should_deactivate_without_touching_devices() {
        let (scheduler, registry) = make(&[(11, "Hall", false)]);
        scheduler.activate(&config(1, &[11]), true).await;

        assert!(scheduler.deactivate(RandomizerId::new(1)).await);
        assert!(!scheduler.deactivate(RandomizerId::new(1)).await);
        assert!(scheduler.statuses().await.is_empty());
        assert!(registry.commands().is_empty());
    }

    #[tokio::test]
    async fn should_update_only_enabled_randomizers_on_tick() {
        let (scheduler, registry) = make(&[(11, "Hall", false), (12, "Kitchen", false)]);
        scheduler.activate(&config(1, &[11]), true).await;
        scheduler.activate(&config(2, &[12]), false).await;

        let summary = scheduler.tick().await;

        assert_eq!(summary.acted, 1);
        assert_eq!(
            registry.commands(),
            vec![Recorded::TurnOn {
                device: DeviceId::new(11),
                delay_secs: 60,
                duration_secs: 60,
            }]
        );
    }

    #[tokio::test]
    async fn should_wait_for_expiry_between_ticks() {
        let (offset, clock) = manual_clock();
        let registry = Arc::new(RecordingRegistry::with_devices(&[(11, "Hall", false)]));
        let scheduler =
            SchedulerService::new(Arc::clone(&registry), DEFAULT_PERIOD).with_clock(clock);
        scheduler
            .insert(Randomizer::with_rng(
                &config(1, &[11]),
                true,
                Arc::clone(&registry),
                StdRng::seed_from_u64(1),
            ))
            .await;

        scheduler.tick().await;
        offset.store(60, Ordering::SeqCst);
        scheduler.tick().await;
        assert_eq!(turn_on_count(&registry), 1);

        offset.store(121, Ordering::SeqCst);
        scheduler.tick().await;
        assert_eq!(turn_on_count(&registry), 2);
    }

    #[tokio::test]
    async fn should_turn_on_and_off_through_actions() {
        let (scheduler, registry) = make(&[(11, "Hall", false)]);
        let id = RandomizerId::new(1);
        scheduler.activate(&config(1, &[11]), false).await;

        scheduler.handle_action(id, RandomizerAction::TurnOn).await.unwrap();
        assert!(scheduler.status(id).await.unwrap().on);
        assert_eq!(turn_on_count(&registry), 1);

        scheduler.handle_action(id, RandomizerAction::Toggle).await.unwrap();
        assert!(!scheduler.status(id).await.unwrap().on);

        scheduler.handle_action(id, RandomizerAction::Toggle).await.unwrap();
        assert!(scheduler.status(id).await.unwrap().on);
    }

    #[tokio::test]
    async fn should_rerun_update_on_status_request_only_when_on() {
        let (scheduler, registry) = make(&[(11, "Hall", false)]);
        let id = RandomizerId::new(1);
        scheduler.activate(&config(1, &[11]), false).await;

        scheduler
            .handle_action(id, RandomizerAction::RequestStatus)
            .await
            .unwrap();
        assert!(registry.commands().is_empty());

        scheduler.handle_action(id, RandomizerAction::TurnOn).await.unwrap();
        registry.clear_commands();
        scheduler
            .handle_action(id, RandomizerAction::RequestStatus)
            .await
            .unwrap();
        // the light is not due yet, so nothing new is issued
        assert!(registry.commands().is_empty());
    }

    #[tokio::test]
    async fn should_force_off_lit_devices() {
        let (scheduler, registry) = make(&[(11, "Hall", true), (12, "Kitchen", true)]);
        let id = RandomizerId::new(1);
        scheduler.activate(&config(1, &[11, 12]), true).await;

        scheduler.handle_action(id, RandomizerAction::ForceOff).await.unwrap();

        assert!(!registry.is_on(11));
        assert!(!registry.is_on(12));
        assert!(!scheduler.status(id).await.unwrap().on);
    }

    #[tokio::test]
    async fn should_freeze_leaving_devices_on() {
        let (scheduler, registry) = make(&[(11, "Hall", true)]);
        let id = RandomizerId::new(1);
        scheduler.activate(&config(1, &[11]), true).await;

        scheduler.handle_action(id, RandomizerAction::Freeze).await.unwrap();

        assert!(registry.is_on(11));
        assert!(!scheduler.status(id).await.unwrap().on);
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_randomizer() {
        let (scheduler, _) = make(&[]);
        let result = scheduler
            .handle_action(RandomizerId::new(9), RandomizerAction::TurnOn)
            .await;
        assert!(matches!(result, Err(OccupancyError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_ignore_unknown_action_name() {
        let (scheduler, registry) = make(&[(11, "Hall", false)]);
        scheduler.activate(&config(1, &[11]), false).await;

        let result = scheduler
            .handle_action_name(RandomizerId::new(1), "set_brightness")
            .await;

        assert!(result.is_ok());
        assert!(registry.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_tick_until_stopped() {
        let (scheduler, registry) = make(&[(11, "Hall", false)]);
        scheduler.activate(&config(1, &[11]), true).await;

        let handle = scheduler.start();
        tokio::time::sleep(Duration::from_secs(12)).await;
        handle.stop().await;

        assert_eq!(turn_on_count(&registry), 1);
        let status = scheduler.status(RandomizerId::new(1)).await.unwrap();
        assert!(status.next_update.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_promptly_during_sleep() {
        let (scheduler, _) = make(&[]);
        let scheduler = SchedulerService {
            period: Duration::from_secs(3_600),
            ..scheduler
        };

        let handle = scheduler.start();
        tokio::task::yield_now().await;
        let before = Instant::now();
        handle.stop().await;

        assert!(before.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn should_list_statuses_sorted_by_id() {
        let (scheduler, _) = make(&[]);
        scheduler.activate(&config(3, &[]), false).await;
        scheduler.activate(&config(1, &[]), true).await;

        let ids: Vec<_> = scheduler.statuses().await.iter().map(|s| s.id.get()).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
