//! Device registry: creates devices from configuration and binds effects.
//!
//! Binding an audio-reactive effect through the registry also subscribes its
//! audio half to the shared [`AudioBus`] under the device id.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;

use super::outputs::{MemoryOutput, NullOutput, Output, StripConfig, UdpConfig, UdpOutput};
use super::{Device, DeviceConfig, DeviceError};
use crate::audio::AudioBus;
use crate::config::{validate, DeviceEntry, OptionSpec, Params};
use crate::effects::registry::create_effect_by_name;
use crate::effects::Effect;

/// Available device (sink) types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Udp,
    Memory,
    Null,
}

impl DeviceType {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "udp" | "udp_raw" => Some(Self::Udp),
            "memory" | "virtual" | "preview" => Some(Self::Memory),
            "null" | "dummy" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Memory => "memory",
            Self::Null => "null",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Udp => "Raw RGB bytes over UDP, one datagram per frame",
            Self::Memory => "Keeps flushed frames in memory for previews",
            Self::Null => "Discards every frame",
        }
    }

    /// Options specific to this type, on top of [`DeviceConfig::SCHEMA`].
    pub fn schema(&self) -> &'static [OptionSpec] {
        match self {
            Self::Udp => UdpConfig::SCHEMA,
            Self::Memory | Self::Null => StripConfig::SCHEMA,
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::Udp, Self::Memory, Self::Null]
    }

    fn create_output(&self, config: &Value) -> Result<Box<dyn Output>, DeviceError> {
        let output: Box<dyn Output> = match self {
            Self::Udp => Box::new(UdpOutput::from_config(&UdpConfig::deserialize_unchecked(config)?)?),
            Self::Memory => Box::new(MemoryOutput::new(StripConfig::deserialize_unchecked(config)?.pixel_count)),
            Self::Null => Box::new(NullOutput::new(StripConfig::deserialize_unchecked(config)?.pixel_count)),
        };
        Ok(output)
    }
}

/// Owns every device, keyed by id.
pub struct Devices {
    devices: BTreeMap<String, Arc<Device>>,
    audio: AudioBus,
    runtime: Option<Handle>,
}

impl Devices {
    pub fn new(audio: AudioBus) -> Self {
        Self {
            devices: BTreeMap::new(),
            audio,
            runtime: None,
        }
    }

    /// Run device tick loops on `runtime` instead of the ambient one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn audio_bus(&self) -> &AudioBus {
        &self.audio
    }

    /// Create a device of `type_name` from a configuration mapping.
    ///
    /// The mapping holds the common [`DeviceConfig`] options plus those of
    /// the device type.
    pub fn create(&mut self, id: &str, type_name: &str, config: &Value) -> Result<Arc<Device>, DeviceError> {
        let device_type =
            DeviceType::from_str(type_name).ok_or_else(|| DeviceError::UnknownType(type_name.to_string()))?;
        if self.devices.contains_key(id) {
            return Err(DeviceError::DuplicateId(id.to_string()));
        }

        validate(config, &[DeviceConfig::SCHEMA, device_type.schema()])?;
        let device_config = DeviceConfig::deserialize_unchecked(config)?;
        let output = device_type.create_output(config)?;

        let mut device = Device::new(id, device_config, output);
        if let Some(runtime) = &self.runtime {
            device = device.with_runtime(runtime.clone());
        }
        let device = Arc::new(device);
        self.devices.insert(id.to_string(), Arc::clone(&device));
        log::info!(
            "Created {} device '{}' with {} pixels",
            device_type.name(),
            id,
            device.pixel_count()
        );
        Ok(device)
    }

    /// Create every device in `entries`, binding the listed effects.
    pub fn create_from_config(&mut self, entries: &[DeviceEntry]) -> Result<(), DeviceError> {
        for entry in entries {
            log::info!("Loading device from config: {}", entry.id);
            self.create(&entry.id, &entry.device_type, &entry.config)?;
            if let Some(effect) = &entry.effect {
                self.set_effect_by_name(&entry.id, &effect.effect_type, &effect.config)?;
            }
        }
        Ok(())
    }

    pub fn get_device(&self, id: &str) -> Option<Arc<Device>> {
        self.devices.get(id).cloned()
    }

    /// Remove a device, blanking it first.
    pub fn remove(&mut self, id: &str) -> Option<Arc<Device>> {
        let device = self.devices.remove(id)?;
        self.audio.unsubscribe(id);
        device.clear_effect();
        log::info!("Removed device '{}'", id);
        Some(device)
    }

    /// Bind `effect` to a device and route audio frames to it.
    pub fn set_effect(&self, id: &str, effect: Box<dyn Effect>) -> Result<Option<Box<dyn Effect>>, DeviceError> {
        let device = self.device(id)?;
        let audio_input = effect.audio_input();
        self.audio.unsubscribe(id);
        let previous = device.set_effect(effect);
        if let Some(input) = audio_input {
            self.audio.subscribe(id, input);
        }
        Ok(previous)
    }

    /// Create an effect by registry name and bind it to a device.
    pub fn set_effect_by_name(
        &self,
        id: &str,
        effect_name: &str,
        config: &Value,
    ) -> Result<Option<Box<dyn Effect>>, DeviceError> {
        self.device(id)?;
        let effect = create_effect_by_name(effect_name, config)?;
        self.set_effect(id, effect)
    }

    pub fn clear_effect(&self, id: &str) -> Result<Option<Box<dyn Effect>>, DeviceError> {
        let device = self.device(id)?;
        self.audio.unsubscribe(id);
        Ok(device.clear_effect())
    }

    /// Blank every device and stop its tick loop.
    pub fn clear_all_effects(&self) {
        for (id, device) in &self.devices {
            self.audio.unsubscribe(id);
            device.clear_effect();
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn device(&self, id: &str) -> Result<Arc<Device>, DeviceError> {
        self.get_device(id)
            .ok_or_else(|| DeviceError::NotFound(id.to_string()))
    }
}

impl Drop for Devices {
    fn drop(&mut self) {
        self.clear_all_effects();
    }
}
