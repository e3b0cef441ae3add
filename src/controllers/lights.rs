//! Light controller.

use serde_json::{json, Map, Value};

use crate::{
    controllers::{DeviceContext, DeviceController, DeviceKind, SupportedResourceEvents},
    error::{Error, Result},
    models::{LightKind, LightState},
    websocket::{
        messages::{ResourceEventType, ResourcePropertyChangeType},
        WsMessage,
    },
};

impl DeviceKind for LightKind {
    const ENDPOINT: Option<&'static str> = Some("devices/lights");

    fn supported_events() -> SupportedResourceEvents {
        SupportedResourceEvents {
            events: &[
                ResourceEventType::LightTurnedOn,
                ResourceEventType::LightTurnedOff,
                ResourceEventType::SwitchLevelChanged,
            ],
            property_changes: &[ResourcePropertyChangeType::LightColor],
        }
    }

    fn event_state(event: ResourceEventType) -> Option<i64> {
        match event {
            ResourceEventType::LightTurnedOn => Some(LightState::On.value()),
            ResourceEventType::LightTurnedOff => Some(LightState::Off.value()),
            _ => None,
        }
    }

    fn apply_event(attributes: &mut Map<String, Value>, message: &WsMessage, _ctx: &DeviceContext) {
        // A level change implies the on/off state. The level may be 0, so
        // check for presence rather than truthiness.
        if let WsMessage::Event(event) = message {
            if event.subtype == ResourceEventType::SwitchLevelChanged {
                if let Some(level) = event.value {
                    let level = level as i64;
                    let state = if level > 0 {
                        LightState::On
                    } else {
                        LightState::Off
                    };
                    attributes.insert("lightLevel".to_owned(), json!(level));
                    attributes.insert("state".to_owned(), json!(state.value()));
                    attributes.insert("desiredState".to_owned(), json!(state.value()));
                }
            }
        }
    }
}

pub type LightController = DeviceController<LightKind>;

impl LightController {
    pub async fn turn_on(&self, id: &str, brightness: Option<u8>) -> Result<()> {
        self.set_state(id, LightState::On, brightness).await
    }

    pub async fn turn_off(&self, id: &str) -> Result<()> {
        self.set_state(id, LightState::Off, None).await
    }

    /// Turns a dimmer on at the given brightness (1-100).
    pub async fn set_brightness(&self, id: &str, brightness: u8) -> Result<()> {
        self.set_state(id, LightState::On, Some(brightness)).await
    }

    pub async fn set_state(
        &self,
        id: &str,
        state: LightState,
        brightness: Option<u8>,
    ) -> Result<()> {
        let command = match state {
            LightState::On => "turnOn",
            LightState::Off => "turnOff",
            other => {
                return Err(Error::unsupported(format!(
                    "light state {:?} cannot be requested",
                    other
                )))
            }
        };

        let mut body = Map::new();
        if let Some(brightness) = brightness {
            if brightness > 100 {
                return Err(Error::invalid("brightness must be between 0 and 100"));
            }
            let light = self
                .get(id)
                .ok_or_else(|| Error::UnknownDevice { id: id.to_owned() })?;
            if !light.attributes().is_dimmer {
                return Err(Error::unsupported("light does not support brightness"));
            }
            body.insert("dimmerLevel".to_owned(), json!(brightness));
        }

        self.send_command(id, command, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::testing::{offline_controller, resource};
    use crate::events::Topic;
    use crate::models::{ResourceType, StatefulDevice};
    use crate::websocket::EventMessage;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn dimmer(level: i64, state: i64) -> Value {
        json!({
            "description": "Porch",
            "state": state,
            "desiredState": state,
            "hasPermissionToChangeState": true,
            "remoteCommandsEnabled": true,
            "isDimmer": true,
            "lightLevel": level,
        })
    }

    #[tokio::test]
    async fn must_derive_state_from_level_changes() {
        let (controller, broker) = offline_controller::<LightKind>();
        let updated = Arc::new(AtomicUsize::new(0));
        let hits = updated.clone();
        broker.subscribe(
            &[Topic::ResourceUpdated],
            crate::events::Handler::sync(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }),
        );

        controller
            .apply_universe(vec![resource(
                "1-7",
                ResourceType::Light,
                dimmer(80, LightState::On.value()),
            )])
            .await
            .unwrap();

        let message = WsMessage::Event(EventMessage {
            device_id: "1-7".into(),
            subtype: ResourceEventType::SwitchLevelChanged,
            value: Some(0.0),
            subvalue: String::new(),
            date_utc: None,
        });
        controller.handle_ws(&message);

        let light = controller.get("1-7").unwrap();
        assert_eq!(light.attributes().light_level, 0);
        assert_eq!(light.attributes().state(), LightState::Off);
        assert_eq!(light.attributes().desired_state(), Some(LightState::Off));
        assert_eq!(updated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn must_refuse_brightness_on_non_dimmers() {
        let (controller, _broker) = offline_controller::<LightKind>();
        let mut attrs = dimmer(0, LightState::Off.value());
        attrs["isDimmer"] = json!(false);
        controller
            .apply_universe(vec![resource("1-8", ResourceType::Light, attrs)])
            .await
            .unwrap();

        let err = controller.set_brightness("1-8", 50).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }
}
