//! Thermostat controller.

use serde_json::{json, Map, Value};

use crate::{
    controllers::{DeviceContext, DeviceController, DeviceKind, SupportedResourceEvents},
    error::{Error, Result},
    models::{TemperatureUnit, ThermostatFanMode, ThermostatKind, ThermostatScheduleMode, ThermostatState},
    websocket::{
        messages::{ResourceEventType, ResourcePropertyChangeType},
        WsMessage,
    },
};

/// Rounds to one decimal place, as the provider's web app displays.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Temperatures on the WebSocket arrive in 1/100 degree F.
fn adjust_temperature(raw: i64, use_celsius: bool) -> f64 {
    let fahrenheit = raw as f64 / 100.0;
    if use_celsius {
        round1((fahrenheit - 32.0) * 5.0 / 9.0)
    } else {
        fahrenheit
    }
}

impl DeviceKind for ThermostatKind {
    const ENDPOINT: Option<&'static str> = Some("devices/thermostats");

    fn supported_events() -> SupportedResourceEvents {
        SupportedResourceEvents {
            events: &[
                ResourceEventType::ThermostatModeChanged,
                ResourceEventType::ThermostatFanModeChanged,
                ResourceEventType::ThermostatOffset,
                ResourceEventType::ThermostatSetPointChanged,
            ],
            property_changes: &[
                ResourcePropertyChangeType::AmbientTemperature,
                ResourcePropertyChangeType::CoolSetPoint,
                ResourcePropertyChangeType::HeatSetPoint,
            ],
        }
    }

    fn apply_event(attributes: &mut Map<String, Value>, message: &WsMessage, ctx: &DeviceContext) {
        match message {
            WsMessage::Event(event) => {
                let value = match event.value {
                    Some(value) => value,
                    None => return,
                };
                match event.subtype {
                    ResourceEventType::ThermostatModeChanged => {
                        // The wire value is one less than the state enum.
                        let state = value as i64 + 1;
                        attributes.insert("state".to_owned(), json!(state));
                        attributes.insert("desiredState".to_owned(), json!(state));
                    }
                    ResourceEventType::ThermostatFanModeChanged => {
                        attributes.insert("fanMode".to_owned(), json!(value as i64));
                    }
                    ResourceEventType::ThermostatOffset => {
                        attributes.insert("setpointOffset".to_owned(), json!(value));
                    }
                    _ => {}
                }
            }
            WsMessage::PropertyChange(change) => {
                let adjusted = adjust_temperature(change.value, ctx.use_celsius());
                match change.subtype {
                    ResourcePropertyChangeType::CoolSetPoint => {
                        attributes.insert("coolSetpoint".to_owned(), json!(adjusted));
                        attributes.insert("desiredCoolSetpoint".to_owned(), json!(adjusted));
                    }
                    ResourcePropertyChangeType::HeatSetPoint => {
                        attributes.insert("heatSetpoint".to_owned(), json!(adjusted));
                        attributes.insert("desiredHeatSetpoint".to_owned(), json!(adjusted));
                    }
                    ResourcePropertyChangeType::AmbientTemperature => {
                        attributes.insert("ambientTemp".to_owned(), json!(adjusted));
                    }
                    _ => {}
                }
            }
        }
    }
}

/// One state change per request; the provider rejects combined updates.
#[derive(Clone, Debug, Default)]
pub struct ThermostatStateChange {
    pub state: Option<ThermostatState>,
    /// Fan mode plus run duration in hours; duration is forced to 0 when
    /// the mode is AUTO.
    pub fan_mode: Option<(ThermostatFanMode, i64)>,
    pub cool_setpoint: Option<f64>,
    pub heat_setpoint: Option<f64>,
    pub schedule_mode: Option<ThermostatScheduleMode>,
    pub temperature_unit: Option<TemperatureUnit>,
}

impl ThermostatStateChange {
    fn set_count(&self) -> usize {
        usize::from(self.state.is_some())
            + usize::from(self.fan_mode.is_some())
            + usize::from(self.cool_setpoint.is_some())
            + usize::from(self.heat_setpoint.is_some())
            + usize::from(self.schedule_mode.is_some())
            + usize::from(self.temperature_unit.is_some())
    }
}

pub type ThermostatController = DeviceController<ThermostatKind>;

impl ThermostatController {
    /// Applies exactly one field of the change; more than one set field is
    /// an invalid argument.
    pub async fn set_state(&self, id: &str, change: ThermostatStateChange) -> Result<()> {
        if change.set_count() != 1 {
            return Err(Error::invalid(
                "exactly one thermostat attribute can be set at a time",
            ));
        }

        let mut body = Map::new();
        if let Some(state) = change.state {
            body.insert("state".to_owned(), json!(state.value()));
        } else if let Some((mode, duration)) = change.fan_mode {
            let duration = if mode == ThermostatFanMode::Auto {
                0
            } else {
                duration
            };
            body.insert("desiredFanMode".to_owned(), json!(mode.value()));
            body.insert("desiredFanDuration".to_owned(), json!(duration));
        } else if let Some(setpoint) = change.cool_setpoint {
            body.insert("desiredCoolSetpoint".to_owned(), json!(setpoint));
        } else if let Some(setpoint) = change.heat_setpoint {
            body.insert("desiredHeatSetpoint".to_owned(), json!(setpoint));
        } else if let Some(mode) = change.schedule_mode {
            body.insert("desiredScheduleMode".to_owned(), json!(mode.value()));
        } else if let Some(unit) = change.temperature_unit {
            body.insert("desiredLocalDisplayTemperatureUnit".to_owned(), json!(unit.value()));
        }

        self.send_command(id, "setState", body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::testing::{offline_controller, resource};
    use crate::models::ResourceType;
    use crate::websocket::{EventMessage, PropertyChangeMessage};

    fn thermostat_attributes() -> Value {
        json!({
            "description": "Hallway",
            "state": 3,
            "desiredState": 3,
            "hasPermissionToChangeState": true,
            "remoteCommandsEnabled": true,
            "ambientTemp": 72.0,
            "coolSetpoint": 75.0,
            "desiredCoolSetpoint": 75.0,
            "heatSetpoint": 68.0,
            "desiredHeatSetpoint": 68.0,
        })
    }

    async fn controller_with_thermostat(
        use_celsius: bool,
    ) -> (ThermostatController, crate::events::EventBroker) {
        let (controller, broker) = offline_controller::<ThermostatKind>();
        controller.inner.context.set_use_celsius(use_celsius);
        controller
            .apply_universe(vec![resource(
                "1-20",
                ResourceType::Thermostat,
                thermostat_attributes(),
            )])
            .await
            .unwrap();
        (controller, broker)
    }

    #[tokio::test]
    async fn must_convert_setpoint_property_changes_to_celsius() {
        let (controller, _broker) = controller_with_thermostat(true).await;

        controller.handle_ws(&WsMessage::PropertyChange(PropertyChangeMessage {
            device_id: "1-20".into(),
            subtype: ResourcePropertyChangeType::CoolSetPoint,
            value: 7500,
        }));

        let attrs = controller.get("1-20").unwrap().attributes().clone();
        assert_eq!(attrs.cool_setpoint, 23.9);
        assert_eq!(attrs.desired_cool_setpoint, 23.9);
    }

    #[tokio::test]
    async fn must_keep_fahrenheit_setpoints_unconverted() {
        let (controller, _broker) = controller_with_thermostat(false).await;

        controller.handle_ws(&WsMessage::PropertyChange(PropertyChangeMessage {
            device_id: "1-20".into(),
            subtype: ResourcePropertyChangeType::HeatSetPoint,
            value: 6850,
        }));

        let attrs = controller.get("1-20").unwrap().attributes().clone();
        assert_eq!(attrs.heat_setpoint, 68.5);
        assert_eq!(attrs.desired_heat_setpoint, 68.5);
    }

    #[tokio::test]
    async fn must_offset_mode_change_values() {
        let (controller, _broker) = controller_with_thermostat(false).await;

        controller.handle_ws(&WsMessage::Event(EventMessage {
            device_id: "1-20".into(),
            subtype: ResourceEventType::ThermostatModeChanged,
            value: Some(1.0),
            subvalue: String::new(),
            date_utc: None,
        }));

        use crate::models::StatefulDevice;
        let attrs = controller.get("1-20").unwrap().attributes().clone();
        assert_eq!(attrs.state(), ThermostatState::Heat);
    }

    #[tokio::test]
    async fn must_require_exactly_one_field_in_state_changes() {
        let (controller, _broker) = controller_with_thermostat(false).await;

        let change = ThermostatStateChange {
            state: Some(ThermostatState::Cool),
            cool_setpoint: Some(74.0),
            ..ThermostatStateChange::default()
        };
        assert!(matches!(
            controller.set_state("1-20", change).await.unwrap_err(),
            Error::InvalidArgument { .. }
        ));

        assert!(matches!(
            controller
                .set_state("1-20", ThermostatStateChange::default())
                .await
                .unwrap_err(),
            Error::InvalidArgument { .. }
        ));
    }
}
