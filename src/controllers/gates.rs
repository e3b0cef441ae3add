//! Gate controller.

use serde_json::Map;

use crate::{
    controllers::{DeviceController, DeviceKind, SupportedResourceEvents},
    error::Result,
    models::{GateKind, GateState},
    websocket::messages::ResourceEventType,
};

impl DeviceKind for GateKind {
    const ENDPOINT: Option<&'static str> = Some("devices/gates");

    fn supported_events() -> SupportedResourceEvents {
        SupportedResourceEvents {
            events: &[ResourceEventType::Opened, ResourceEventType::Closed],
            property_changes: &[],
        }
    }

    fn event_state(event: ResourceEventType) -> Option<i64> {
        match event {
            ResourceEventType::Opened => Some(GateState::Open.value()),
            ResourceEventType::Closed => Some(GateState::Closed.value()),
            _ => None,
        }
    }
}

pub type GateController = DeviceController<GateKind>;

impl GateController {
    pub async fn open(&self, id: &str) -> Result<()> {
        self.send_command(id, "open", Map::new()).await
    }

    pub async fn close(&self, id: &str) -> Result<()> {
        self.send_command(id, "close", Map::new()).await
    }
}
