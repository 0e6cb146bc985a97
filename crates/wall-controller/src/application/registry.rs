//! Device registry: health and last-known resolution per device.
//!
//! The registry is the controller's memory between configuration runs. A
//! device that drops out of one run keeps its last-known resolution here, so
//! the next run's provisional plan starts from something the hardware has
//! actually accepted rather than from a cold default.

use std::collections::HashMap;

use wall_core::{DeviceId, Resolution};

/// Health of a device as observed by the most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceHealth {
    /// Not yet contacted.
    Unknown,
    /// Responded during the most recent negotiation.
    Active,
    /// Produced no usable result during the most recent negotiation.
    Excluded,
}

/// Runtime state for one tracked device.
#[derive(Debug, Clone)]
pub struct DeviceRuntimeState {
    pub id: DeviceId,
    pub name: String,
    pub health: DeviceHealth,
    /// The resolution the device last reported as applied, if any.
    pub last_resolution: Option<Resolution>,
}

/// In-memory registry of all configured devices.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: HashMap<DeviceId, DeviceRuntimeState>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a device entry.
    pub fn upsert(&mut self, state: DeviceRuntimeState) {
        self.devices.insert(state.id, state);
    }

    /// Returns the state for a specific device.
    pub fn get(&self, id: DeviceId) -> Option<&DeviceRuntimeState> {
        self.devices.get(&id)
    }

    /// Returns a snapshot of all devices.
    pub fn all(&self) -> Vec<DeviceRuntimeState> {
        self.devices.values().cloned().collect()
    }

    /// Updates health for a specific device.
    pub fn set_health(&mut self, id: DeviceId, health: DeviceHealth) {
        if let Some(device) = self.devices.get_mut(&id) {
            device.health = health;
        }
    }

    /// Records a successfully applied resolution and marks the device active.
    pub fn record_resolution(&mut self, id: DeviceId, resolution: Resolution) {
        if let Some(device) = self.devices.get_mut(&id) {
            device.last_resolution = Some(resolution);
            device.health = DeviceHealth::Active;
        }
    }

    /// The last resolution this device reported as applied, if any.
    pub fn last_known_resolution(&self, id: DeviceId) -> Option<Resolution> {
        self.devices.get(&id).and_then(|d| d.last_resolution)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn make_device(name: &str) -> DeviceRuntimeState {
        DeviceRuntimeState {
            id: Uuid::new_v4(),
            name: name.to_string(),
            health: DeviceHealth::Unknown,
            last_resolution: None,
        }
    }

    #[test]
    fn test_registry_starts_empty() {
        assert!(DeviceRegistry::new().all().is_empty());
    }

    #[test]
    fn test_upsert_adds_device() {
        let mut registry = DeviceRegistry::new();
        let device = make_device("encoder-1");
        let id = device.id;
        registry.upsert(device);
        assert!(registry.get(id).is_some());
    }

    #[test]
    fn test_record_resolution_marks_device_active() {
        let mut registry = DeviceRegistry::new();
        let device = make_device("encoder-1");
        let id = device.id;
        registry.upsert(device);

        registry.record_resolution(id, Resolution::new(1920, 1080));

        let state = registry.get(id).unwrap();
        assert_eq!(state.health, DeviceHealth::Active);
        assert_eq!(state.last_resolution, Some(Resolution::new(1920, 1080)));
    }

    #[test]
    fn test_excluded_device_keeps_last_known_resolution() {
        // A device that fails a run stays excluded but its resolution is
        // retained for the next run's provisional plan.
        let mut registry = DeviceRegistry::new();
        let device = make_device("encoder-2");
        let id = device.id;
        registry.upsert(device);

        registry.record_resolution(id, Resolution::new(1280, 720));
        registry.set_health(id, DeviceHealth::Excluded);

        assert_eq!(registry.get(id).unwrap().health, DeviceHealth::Excluded);
        assert_eq!(
            registry.last_known_resolution(id),
            Some(Resolution::new(1280, 720))
        );
    }

    #[test]
    fn test_last_known_resolution_is_none_for_unknown_device() {
        let registry = DeviceRegistry::new();
        assert_eq!(registry.last_known_resolution(Uuid::new_v4()), None);
    }
}
