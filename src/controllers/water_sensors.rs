//! Water sensor controller. Read-only; wet/dry arrive as opened/closed
//! events.

use crate::{
    controllers::{DeviceController, DeviceKind, SupportedResourceEvents},
    models::{SensorState, WaterSensorKind},
    websocket::messages::ResourceEventType,
};

impl DeviceKind for WaterSensorKind {
    const ENDPOINT: Option<&'static str> = Some("devices/waterSensors");

    fn supported_events() -> SupportedResourceEvents {
        SupportedResourceEvents {
            events: &[ResourceEventType::Opened, ResourceEventType::Closed],
            property_changes: &[],
        }
    }

    fn event_state(event: ResourceEventType) -> Option<i64> {
        match event {
            ResourceEventType::Opened => Some(SensorState::Wet.value()),
            ResourceEventType::Closed => Some(SensorState::Dry.value()),
            _ => None,
        }
    }
}

pub type WaterSensorController = DeviceController<WaterSensorKind>;
