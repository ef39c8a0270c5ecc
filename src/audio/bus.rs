//! Fan-out of feature frames from the audio pipeline to subscribed effects.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::FeatureFrame;
use crate::effects::shared::lock;
use crate::effects::AudioReactive;

/// Keyed set of audio inputs. Cloning shares the same set.
#[derive(Clone, Default)]
pub struct AudioBus {
    subscribers: Arc<Mutex<HashMap<String, Arc<dyn AudioReactive>>>>,
}

impl AudioBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route frames to `input` under `key`, replacing any previous subscriber.
    pub fn subscribe(&self, key: impl Into<String>, input: Arc<dyn AudioReactive>) {
        let key = key.into();
        log::debug!("Audio subscriber '{}' attached", key);
        lock(&self.subscribers).insert(key, input);
    }

    /// Stop routing frames to `key`. Returns whether it was subscribed.
    pub fn unsubscribe(&self, key: &str) -> bool {
        let removed = lock(&self.subscribers).remove(key).is_some();
        if removed {
            log::debug!("Audio subscriber '{}' detached", key);
        }
        removed
    }

    pub fn is_subscribed(&self, key: &str) -> bool {
        lock(&self.subscribers).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.subscribers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver one frame to every subscriber on the calling thread.
    ///
    /// The subscriber set is snapshotted first so inputs may subscribe or
    /// unsubscribe from inside their callback.
    pub fn publish(&self, frame: &FeatureFrame) {
        let inputs: Vec<Arc<dyn AudioReactive>> = lock(&self.subscribers).values().cloned().collect();
        for input in inputs {
            input.audio_data_updated(frame);
        }
    }
}
