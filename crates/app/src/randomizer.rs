//! Randomizer: a switchable group of controlled lights.
//!
//! While on, every update pass gives each light a chance to re-randomize and
//! then republishes the earliest light expiry as the randomizer's next update.
//! A light that fails (device removed, command rejected) is logged and
//! skipped; the other lights are still updated.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use occupancy_domain::error::OccupancyError;
use occupancy_domain::id::RandomizerId;
use occupancy_domain::randomizer::RandomizerConfig;
use occupancy_domain::time::Timestamp;

use crate::controlled_light::ControlledLight;
use crate::ports::DeviceRegistry;

/// Outcome of one [`Randomizer::update`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Lights that issued a command.
    pub acted: usize,
    /// Lights that failed and were skipped.
    pub failed: usize,
}

/// A logical automation device owning a fixed set of lights.
pub struct Randomizer<D> {
    id: RandomizerId,
    name: String,
    on_state: bool,
    lights: Vec<ControlledLight<D>>,
    next_update: Option<Timestamp>,
    registry: Arc<D>,
    rng: StdRng,
}

impl<D: DeviceRegistry> Randomizer<D> {
    /// Build a randomizer from validated configuration, seeded from OS entropy.
    pub fn new(config: &RandomizerConfig, on_state: bool, registry: Arc<D>) -> Self {
        Self::with_rng(config, on_state, registry, StdRng::from_entropy())
    }

    /// Build a randomizer drawing from the given generator.
    pub fn with_rng(
        config: &RandomizerConfig,
        on_state: bool,
        registry: Arc<D>,
        rng: StdRng,
    ) -> Self {
        let lights = config
            .lights()
            .map(|slot| ControlledLight::new(*slot, Arc::clone(&registry)))
            .collect();
        Self {
            id: config.id,
            name: config.name.clone(),
            on_state,
            lights,
            next_update: None,
            registry,
            rng,
        }
    }

    #[must_use]
    pub fn id(&self) -> RandomizerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn on_state(&self) -> bool {
        self.on_state
    }

    #[must_use]
    pub fn lights(&self) -> &[ControlledLight<D>] {
        &self.lights
    }

    /// Earliest light expiry as of the last update pass.
    #[must_use]
    pub fn next_update(&self) -> Option<Timestamp> {
        self.next_update
    }

    /// Give every due light a new random command.
    ///
    /// Does nothing while the randomizer is off.
    #[tracing::instrument(skip(self, now), fields(randomizer = %self.name))]
    pub async fn update(&mut self, now: Timestamp) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        if !self.on_state {
            return summary;
        }

        for light in &mut self.lights {
            match light.update(&mut self.rng, now).await {
                Ok(Some(_)) => summary.acted += 1,
                Ok(None) => {}
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(
                        device_id = %light.device_id(),
                        error = %err,
                        "skipping light after failed update"
                    );
                }
            }
        }

        self.refresh_next_update().await;
        summary
    }

    /// Switch randomizing on or off.
    ///
    /// Nothing happens when `value` matches the current state. Otherwise the
    /// new state is published, and switching on runs an update pass straight
    /// away so the first randomization does not wait for the next tick.
    ///
    /// # Errors
    ///
    /// Returns the host error when the new state cannot be published; the
    /// cached state is left unchanged in that case.
    #[tracing::instrument(skip(self, now), fields(randomizer = %self.name))]
    pub async fn set_on_state(
        &mut self,
        value: bool,
        now: Timestamp,
    ) -> Result<Option<UpdateSummary>, OccupancyError> {
        if value == self.on_state {
            return Ok(None);
        }
        self.registry.set_state(self.id, value).await?;
        self.on_state = value;
        tracing::info!("\"{}\" {}", self.name, if value { "on" } else { "off" });

        if value {
            Ok(Some(self.update(now).await))
        } else {
            Ok(None)
        }
    }

    /// Stop randomizing and cancel every light's pending commands.
    ///
    /// The off state is always published, even when already off. With
    /// `turn_off`, lights whose device is on are switched off as well.
    ///
    /// # Errors
    ///
    /// Returns the host error when the off state cannot be published; the
    /// randomizer is switched off and every light cancelled regardless. Light
    /// failures are logged and counted in the summary instead.
    #[tracing::instrument(skip(self), fields(randomizer = %self.name))]
    pub async fn cancel(&mut self, turn_off: bool) -> Result<UpdateSummary, OccupancyError> {
        let published = self.registry.set_state(self.id, false).await;
        self.on_state = false;

        let mut summary = UpdateSummary::default();
        for light in &mut self.lights {
            match light.cancel(turn_off).await {
                Ok(()) => summary.acted += 1,
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(
                        device_id = %light.device_id(),
                        error = %err,
                        "skipping light after failed cancel"
                    );
                }
            }
        }
        self.refresh_next_update().await;
        published?;
        Ok(summary)
    }

    /// Recompute the earliest light expiry and publish it to the host.
    async fn refresh_next_update(&mut self) {
        self.next_update = self.lights.iter().map(ControlledLight::expire).min();
        if let Err(err) = self
            .registry
            .set_next_update(self.id, self.next_update)
            .await
        {
            tracing::warn!(error = %err, "failed to publish next update");
        }
    }
}
