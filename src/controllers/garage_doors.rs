//! Garage door controller.

use serde_json::Map;

use crate::{
    controllers::{DeviceController, DeviceKind, SupportedResourceEvents},
    error::Result,
    models::{GarageDoorKind, GarageDoorState},
    websocket::messages::ResourceEventType,
};

impl DeviceKind for GarageDoorKind {
    const ENDPOINT: Option<&'static str> = Some("devices/garageDoors");

    fn supported_events() -> SupportedResourceEvents {
        SupportedResourceEvents {
            events: &[ResourceEventType::Opened, ResourceEventType::Closed],
            property_changes: &[],
        }
    }

    fn event_state(event: ResourceEventType) -> Option<i64> {
        match event {
            ResourceEventType::Opened => Some(GarageDoorState::Open.value()),
            ResourceEventType::Closed => Some(GarageDoorState::Closed.value()),
            _ => None,
        }
    }
}

pub type GarageDoorController = DeviceController<GarageDoorKind>;

impl GarageDoorController {
    pub async fn open(&self, id: &str) -> Result<()> {
        self.send_command(id, "open", Map::new()).await
    }

    pub async fn close(&self, id: &str) -> Result<()> {
        self.send_command(id, "close", Map::new()).await
    }
}
