//! Pixel-string devices and their output scheduling.
//!
//! A [`Device`] owns at most one bound [`Effect`] and an [`Output`] sink.
//! While active it ticks at `refresh_rate` on a tokio interval: each tick
//! renders the effect (if animated), assembles a brightness-scaled frame when
//! the effect is dirty, and flushes it to the sink unless in preview mode.

pub mod outputs;
pub mod registry;

pub use outputs::{MemoryOutput, NullOutput, Output, OutputError, StripConfig, UdpConfig, UdpOutput};
pub use registry::{DeviceType, Devices};

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::{ConfigError, OptionSpec, Params};
use crate::effects::shared::lock;
use crate::effects::{Effect, EffectError, Pixel};

/// Errors raised by devices and the device registry.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Unknown device type: {0}")]
    UnknownType(String),
    #[error("Device '{0}' already exists")]
    DuplicateId(String),
    #[error("Device '{0}' not found")]
    NotFound(String),
    #[error("Invalid device configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),
    #[error("Output error: {0}")]
    Output(#[from] OutputError),
    #[error("Device '{0}' has no effect bound")]
    NoEffect(String),
}

/// Options common to every device type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Friendly name.
    pub name: String,
    /// Brightness ceiling as a fraction of the sink's range.
    pub max_brightness: f32,
    /// Ticks per second.
    pub refresh_rate: u32,
    /// Re-send the last frame on every tick even if nothing changed.
    pub force_refresh: bool,
    /// Assemble frames for preview without sending them.
    pub preview_only: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_brightness: 1.0,
            refresh_rate: 60,
            force_refresh: false,
            preview_only: false,
        }
    }
}

impl Params for DeviceConfig {
    const SCHEMA: &'static [OptionSpec] = &[
        OptionSpec::text("name", "Friendly name for the device").required(),
        OptionSpec::float("max_brightness", "Max brightness for the device", 0.0, 1.0),
        OptionSpec::int("refresh_rate", "Rate that pixels are sent to the device", 1, 1000),
        OptionSpec::boolean("force_refresh", "Force the device to always refresh"),
        OptionSpec::boolean("preview_only", "Preview the pixels without updating the device"),
    ];
}

impl DeviceConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_rate.max(1) as f64)
    }
}

struct DeviceState {
    id: String,
    config: DeviceConfig,
    output: Box<dyn Output>,
    effect: Option<Box<dyn Effect>>,
    latest_frame: Vec<Pixel>,
    active: bool,
    task: Option<JoinHandle<()>>,
    /// Bumped on every start; a loop only ticks while it owns the current one.
    generation: u64,
}

impl DeviceState {
    /// One scheduling tick. Returns `false` once the device is inactive.
    fn tick(&mut self) -> bool {
        if !self.active {
            return false;
        }
        if let Some(frame) = self.assemble_frame() {
            if !self.config.preview_only {
                if let Err(e) = self.output.flush(&frame) {
                    log::warn!("Device '{}' flush failed: {}", self.id, e);
                }
            }
        }
        true
    }

    /// Tick on behalf of the loop started as `generation`.
    ///
    /// Returns `false` for a loop superseded by a restart, which must exit.
    fn scheduled_tick(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.tick()
    }

    /// Render the bound effect and scale its pixels if they changed.
    fn assemble_frame(&mut self) -> Option<Vec<Pixel>> {
        let effect = self.effect.as_mut()?;
        if effect.is_animated() {
            effect.render();
        }
        if !effect.is_dirty() {
            return None;
        }

        let brightness = self.config.max_brightness;
        let frame: Vec<Pixel> = effect
            .pixels()
            .iter()
            .map(|pixel| pixel.map(|c| (c * brightness).clamp(0.0, 255.0)))
            .collect();
        effect.set_dirty(self.config.force_refresh);
        self.latest_frame.clone_from(&frame);
        Some(frame)
    }

    fn stop(&mut self) {
        self.active = false;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_output_loop(state: Weak<Mutex<DeviceState>>, period: Duration, generation: u64) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let Some(state) = state.upgrade() else {
            break;
        };
        let running = lock(&state).scheduled_tick(generation);
        if !running {
            break;
        }
    }
}

/// A pixel string driven by one effect at a fixed refresh rate.
pub struct Device {
    id: String,
    pixel_count: usize,
    runtime: Option<Handle>,
    state: Arc<Mutex<DeviceState>>,
}

impl Device {
    /// Create an inactive device around `output`.
    ///
    /// The tick loop runs on the runtime given to [`with_runtime`](Self::with_runtime),
    /// or on the ambient tokio runtime at activation time.
    pub fn new(id: impl Into<String>, config: DeviceConfig, output: Box<dyn Output>) -> Self {
        let id = id.into();
        let pixel_count = output.pixel_count();
        Self {
            id: id.clone(),
            pixel_count,
            runtime: None,
            state: Arc::new(Mutex::new(DeviceState {
                id,
                config,
                output,
                effect: None,
                latest_frame: vec![[0.0; 3]; pixel_count],
                active: false,
                task: None,
                generation: 0,
            })),
        }
    }

    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> String {
        lock(&self.state).config.name.clone()
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    /// Brightness ceiling in the sink's native integer range.
    pub fn max_brightness(&self) -> f32 {
        lock(&self.state).config.max_brightness * 256.0
    }

    pub fn refresh_rate(&self) -> u32 {
        lock(&self.state).config.refresh_rate
    }

    pub fn config(&self) -> DeviceConfig {
        lock(&self.state).config.clone()
    }

    /// Copy of the last assembled frame.
    pub fn latest_frame(&self) -> Vec<Pixel> {
        lock(&self.state).latest_frame.clone()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }

    /// Whether a tick loop task is currently scheduled.
    pub fn is_scheduled(&self) -> bool {
        lock(&self.state)
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn active_effect_name(&self) -> Option<&'static str> {
        lock(&self.state).effect.as_ref().map(|effect| effect.name())
    }

    /// Configuration of the bound effect.
    pub fn effect_config(&self) -> Option<Value> {
        lock(&self.state).effect.as_ref().map(|effect| effect.config())
    }

    /// Bind `effect`, activating it with this device's pixel count.
    ///
    /// The previously bound effect is deactivated and handed back. Starts the
    /// tick loop if the device is not running.
    pub fn set_effect(&self, mut effect: Box<dyn Effect>) -> Option<Box<dyn Effect>> {
        let mut state = lock(&self.state);
        let previous = state.effect.take().map(|mut previous| {
            previous.deactivate();
            previous
        });

        effect.activate(self.pixel_count);
        log::info!("Device '{}' now running {}", self.id, effect.name());
        state.effect = Some(effect);
        if !state.active {
            self.start(&mut state);
        }
        previous
    }

    /// Unbind the effect and blank the strip.
    ///
    /// If the device is running, one all-zero frame is forced through the
    /// sink (even in preview mode) before the tick loop stops.
    pub fn clear_effect(&self) -> Option<Box<dyn Effect>> {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        let previous = state.effect.take().map(|mut previous| {
            previous.deactivate();
            previous
        });

        if state.active {
            state.latest_frame = vec![[0.0; 3]; self.pixel_count];
            if let Err(e) = state.output.flush(&state.latest_frame) {
                log::warn!("Device '{}' failed to blank: {}", self.id, e);
            }
            state.stop();
            log::info!("Device '{}' cleared", self.id);
        }
        previous
    }

    /// Pass a new configuration mapping to the bound effect.
    pub fn update_effect_config(&self, config: &Value) -> Result<(), DeviceError> {
        let mut state = lock(&self.state);
        let effect = state
            .effect
            .as_mut()
            .ok_or_else(|| DeviceError::NoEffect(self.id.clone()))?;
        effect.config_updated(config)?;
        Ok(())
    }

    /// Replace the device configuration. A running tick loop is restarted so
    /// a new refresh rate applies.
    pub fn update_config(&self, config: DeviceConfig) {
        let mut state = lock(&self.state);
        state.config = config;
        if state.active {
            state.stop();
            self.start(&mut state);
        }
    }

    /// Start ticking.
    pub fn activate(&self) {
        let mut state = lock(&self.state);
        if !state.active {
            self.start(&mut state);
        }
    }

    /// Stop ticking. No tick does any work once this returns.
    pub fn deactivate(&self) {
        let mut state = lock(&self.state);
        if state.active {
            state.stop();
            log::debug!("Device '{}' deactivated", self.id);
        }
    }

    /// Run one scheduling tick on the calling thread.
    ///
    /// Returns `false` when the device is inactive and nothing was done.
    pub fn tick(&self) -> bool {
        lock(&self.state).tick()
    }

    fn start(&self, state: &mut DeviceState) {
        state.active = true;
        state.generation += 1;
        let generation = state.generation;
        let runtime = self.runtime.clone().or_else(|| Handle::try_current().ok());
        match runtime {
            Some(runtime) => {
                let period = state.config.tick_period();
                let task = run_output_loop(Arc::downgrade(&self.state), period, generation);
                state.task = Some(runtime.spawn(task));
                log::debug!("Device '{}' ticking every {:?}", self.id, period);
            }
            None => log::warn!("Device '{}' has no runtime; ticks must be driven manually", self.id),
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.stop();
        if let Some(effect) = state.effect.as_mut() {
            effect.deactivate();
        }
    }
}
