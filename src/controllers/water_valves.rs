//! Water valve controller.

use serde_json::Map;

use crate::{
    controllers::{DeviceController, DeviceKind, SupportedResourceEvents},
    error::Result,
    models::{WaterValveKind, WaterValveState},
    websocket::messages::ResourceEventType,
};

impl DeviceKind for WaterValveKind {
    const ENDPOINT: Option<&'static str> = Some("devices/waterValves");

    fn supported_events() -> SupportedResourceEvents {
        SupportedResourceEvents {
            events: &[ResourceEventType::Opened, ResourceEventType::Closed],
            property_changes: &[],
        }
    }

    fn event_state(event: ResourceEventType) -> Option<i64> {
        match event {
            ResourceEventType::Opened => Some(WaterValveState::Open.value()),
            ResourceEventType::Closed => Some(WaterValveState::Closed.value()),
            _ => None,
        }
    }
}

pub type WaterValveController = DeviceController<WaterValveKind>;

impl WaterValveController {
    pub async fn open(&self, id: &str) -> Result<()> {
        self.send_command(id, "open", Map::new()).await
    }

    pub async fn close(&self, id: &str) -> Result<()> {
        self.send_command(id, "close", Map::new()).await
    }
}
