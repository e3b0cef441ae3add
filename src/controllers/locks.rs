//! Lock controller.

use serde_json::Map;

use crate::{
    controllers::{DeviceController, DeviceKind, SupportedResourceEvents},
    error::Result,
    models::{LockKind, LockState},
    websocket::messages::ResourceEventType,
};

impl DeviceKind for LockKind {
    const ENDPOINT: Option<&'static str> = Some("devices/locks");

    fn supported_events() -> SupportedResourceEvents {
        SupportedResourceEvents {
            events: &[ResourceEventType::DoorLocked, ResourceEventType::DoorUnlocked],
            property_changes: &[],
        }
    }

    fn event_state(event: ResourceEventType) -> Option<i64> {
        match event {
            ResourceEventType::DoorLocked => Some(LockState::Locked.value()),
            ResourceEventType::DoorUnlocked => Some(LockState::Unlocked.value()),
            _ => None,
        }
    }
}

pub type LockController = DeviceController<LockKind>;

impl LockController {
    pub async fn lock(&self, id: &str) -> Result<()> {
        self.send_command(id, "lock", Map::new()).await
    }

    pub async fn unlock(&self, id: &str) -> Result<()> {
        self.send_command(id, "unlock", Map::new()).await
    }
}
