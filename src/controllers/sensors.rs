//! Sensor controller. Sensors take no commands; bypass changes go through
//! the partition.

use serde_json::{json, Map, Value};

use crate::{
    controllers::{DeviceContext, DeviceController, DeviceKind, SupportedResourceEvents},
    models::{SensorKind, SensorState, SensorSubtype},
    websocket::{messages::ResourceEventType, WsMessage},
};

impl DeviceKind for SensorKind {
    const ENDPOINT: Option<&'static str> = Some("devices/sensors");

    fn supported_events() -> SupportedResourceEvents {
        SupportedResourceEvents {
            events: &[
                ResourceEventType::Opened,
                ResourceEventType::Closed,
                ResourceEventType::OpenedClosed,
                ResourceEventType::DoorLeftOpenRestoral,
                ResourceEventType::Bypassed,
                ResourceEventType::EndOfBypass,
            ],
            property_changes: &[],
        }
    }

    fn apply_event(attributes: &mut Map<String, Value>, message: &WsMessage, _ctx: &DeviceContext) {
        let event = match message {
            WsMessage::Event(event) => event,
            WsMessage::PropertyChange(_) => return,
        };
        if event.value.is_none() {
            return;
        }

        // Open/close events read differently on motion sensors.
        let is_motion = attributes
            .get("deviceType")
            .and_then(Value::as_i64)
            .map(|subtype| SensorSubtype::from(subtype) == SensorSubtype::MotionSensor)
            .unwrap_or(false);

        let state = match event.subtype {
            ResourceEventType::Closed => Some(if is_motion {
                SensorState::Idle
            } else {
                SensorState::Closed
            }),
            ResourceEventType::Opened => Some(if is_motion {
                SensorState::Active
            } else {
                SensorState::Open
            }),
            ResourceEventType::OpenedClosed => Some(SensorState::OpenedClosed),
            ResourceEventType::DoorLeftOpenRestoral => Some(SensorState::Closed),
            _ => None,
        };

        if let Some(state) = state {
            attributes.insert("state".to_owned(), json!(state.value()));
            attributes.insert("desiredState".to_owned(), json!(state.value()));
        }

        if matches!(
            event.subtype,
            ResourceEventType::Bypassed | ResourceEventType::EndOfBypass
        ) {
            attributes.insert(
                "isBypassed".to_owned(),
                json!(event.subtype == ResourceEventType::Bypassed),
            );
        }
    }
}

pub type SensorController = DeviceController<SensorKind>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::testing::{offline_controller, resource};
    use crate::models::{ResourceType, StatefulDevice};
    use crate::websocket::EventMessage;

    fn sensor_attributes(subtype: SensorSubtype) -> Value {
        json!({
            "description": "Hallway",
            "state": 1,
            "desiredState": 1,
            "hasPermissionToChangeState": true,
            "remoteCommandsEnabled": true,
            "deviceType": subtype.value(),
        })
    }

    fn closed_event(device_id: &str) -> WsMessage {
        WsMessage::Event(EventMessage {
            device_id: device_id.into(),
            subtype: ResourceEventType::Closed,
            value: Some(0.0),
            subvalue: String::new(),
            date_utc: None,
        })
    }

    #[tokio::test]
    async fn must_map_closed_events_per_subtype() {
        let (controller, _broker) = offline_controller::<SensorKind>();
        controller
            .apply_universe(vec![
                resource(
                    "1-2",
                    ResourceType::Sensor,
                    sensor_attributes(SensorSubtype::MotionSensor),
                ),
                resource(
                    "1-3",
                    ResourceType::Sensor,
                    sensor_attributes(SensorSubtype::ContactSensor),
                ),
            ])
            .await
            .unwrap();

        controller.handle_ws(&closed_event("1-2"));
        controller.handle_ws(&closed_event("1-3"));

        assert_eq!(
            controller.get("1-2").unwrap().attributes().state(),
            SensorState::Idle
        );
        assert_eq!(
            controller.get("1-3").unwrap().attributes().state(),
            SensorState::Closed
        );
    }

    #[tokio::test]
    async fn must_toggle_bypass_flag_from_events() {
        let (controller, _broker) = offline_controller::<SensorKind>();
        controller
            .apply_universe(vec![resource(
                "1-2",
                ResourceType::Sensor,
                sensor_attributes(SensorSubtype::ContactSensor),
            )])
            .await
            .unwrap();

        let bypass = WsMessage::Event(EventMessage {
            device_id: "1-2".into(),
            subtype: ResourceEventType::Bypassed,
            value: Some(1.0),
            subvalue: String::new(),
            date_utc: None,
        });
        controller.handle_ws(&bypass);
        assert!(controller.get("1-2").unwrap().attributes().is_bypassed);

        let restore = WsMessage::Event(EventMessage {
            device_id: "1-2".into(),
            subtype: ResourceEventType::EndOfBypass,
            value: Some(1.0),
            subvalue: String::new(),
            date_utc: None,
        });
        controller.handle_ws(&restore);
        assert!(!controller.get("1-2").unwrap().attributes().is_bypassed);
    }
}
