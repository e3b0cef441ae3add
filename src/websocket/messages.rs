/*
 * Copyright 2021 the alarmdotcom_sdk developers
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */
//! WebSocket frame classification.
//!
//! Frames are untyped JSON; their kind is determined by which fields are
//! present. Only event and property-change frames carry device mutations;
//! geofence, monitoring and panel status-update frames are recognized and
//! dropped (the provider delivers their effects through regular events).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

wire_enum! {
    /// Semantic device events.
    pub enum ResourceEventType {
        Unknown = -1,
        Closed = 0,
        Alarm = 1,
        Tamper = 7,
        Disarmed = 8,
        ArmedStay = 9,
        ArmedAway = 10,
        Bypassed = 13,
        Opened = 15,
        EndOfBypass = 35,
        DoorUnlocked = 90,
        DoorLocked = 91,
        ThermostatSetPointChanged = 94,
        ThermostatModeChanged = 95,
        OpenedClosed = 100,
        DoorLeftOpen = 101,
        DoorLeftOpenRestoral = 103,
        ThermostatOffset = 105,
        ArmedNight = 113,
        ThermostatFanModeChanged = 120,
        LightTurnedOn = 315,
        LightTurnedOff = 316,
        SwitchLevelChanged = 317,
    }
    fallback Unknown
}

wire_enum! {
    /// Numeric attribute deltas. Temperatures arrive in 1/100 degree F.
    pub enum ResourcePropertyChangeType {
        Unknown = -1,
        AmbientTemperature = 1,
        HeatSetPoint = 2,
        CoolSetPoint = 3,
        LightColor = 4,
        IrrigationStatus = 5,
    }
    fallback Unknown
}

/// A semantic action on a device (opened, armed-away, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct EventMessage {
    pub device_id: String,
    pub subtype: ResourceEventType,
    pub value: Option<f64>,
    pub subvalue: String,
    pub date_utc: Option<DateTime<Utc>>,
}

/// A numeric attribute change on a device.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyChangeMessage {
    pub device_id: String,
    pub subtype: ResourcePropertyChangeType,
    pub value: i64,
}

/// A classified, actionable WebSocket message.
#[derive(Clone, Debug, PartialEq)]
pub enum WsMessage {
    Event(EventMessage),
    PropertyChange(PropertyChangeMessage),
}

impl WsMessage {
    pub fn device_id(&self) -> &str {
        match self {
            WsMessage::Event(event) => &event.device_id,
            WsMessage::PropertyChange(change) => &change.device_id,
        }
    }
}

/// Outcome of classifying a raw frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
    Message(WsMessage),
    /// Recognized but intentionally unhandled frame kinds.
    Ignored(IgnoredKind),
    /// Frame shape matched nothing we know.
    Unsupported,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoredKind {
    GeofenceCrossing,
    MonitoringEvent,
    StatusUpdate,
}

/// Probe deserialization target; fields are optional so that presence can be
/// tested.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameProbe {
    unit_id: Option<Value>,
    device_id: Option<Value>,
    event_type: Option<i64>,
    event_value: Option<f64>,
    event_date_utc: Option<String>,
    qstring_for_extra_data: Option<String>,
    correlated_event_id: Option<Value>,
    property: Option<i64>,
    property_value: Option<i64>,
    fence_id: Option<Value>,
    is_inside_now: Option<Value>,
    new_state: Option<Value>,
    flag_mask: Option<Value>,
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Composes the registry device id from a frame's unit id and device index.
fn compose_device_id(unit_id: &Value, device_id: &Value) -> String {
    format!("{}-{}", value_to_string(unit_id), value_to_string(device_id))
}

/// Classifies a raw text frame by which fields are present.
pub fn classify(raw: &str) -> Result<Classification> {
    let probe: FrameProbe = serde_json::from_str(raw)
        .map_err(|err| Error::unexpected(format!("unparseable WebSocket frame: {}", err)))?;

    if probe.fence_id.is_some() && probe.is_inside_now.is_some() {
        return Ok(Classification::Ignored(IgnoredKind::GeofenceCrossing));
    }
    if probe.event_type.is_some() && probe.correlated_event_id.is_some() {
        return Ok(Classification::Ignored(IgnoredKind::MonitoringEvent));
    }
    if probe.new_state.is_some() && probe.flag_mask.is_some() {
        return Ok(Classification::Ignored(IgnoredKind::StatusUpdate));
    }

    let (unit_id, device_id) = match (&probe.unit_id, &probe.device_id) {
        (Some(unit_id), Some(device_id)) => (unit_id, device_id),
        _ => return Ok(Classification::Unsupported),
    };

    if let (Some(event_type), Some(event_value), Some(subvalue)) = (
        probe.event_type,
        probe.event_value,
        &probe.qstring_for_extra_data,
    ) {
        return Ok(Classification::Message(WsMessage::Event(EventMessage {
            device_id: compose_device_id(unit_id, device_id),
            subtype: ResourceEventType::from(event_type),
            value: Some(event_value),
            subvalue: subvalue.clone(),
            date_utc: probe
                .event_date_utc
                .as_deref()
                .and_then(|date| date.parse().ok()),
        })));
    }

    if let (Some(property), Some(value)) = (probe.property, probe.property_value) {
        return Ok(Classification::Message(WsMessage::PropertyChange(
            PropertyChangeMessage {
                device_id: compose_device_id(unit_id, device_id),
                subtype: ResourcePropertyChangeType::from(property),
                value,
            },
        )));
    }

    Ok(Classification::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn must_compose_device_ids_from_unit_and_index() {
        let raw = r#"{
            "unitId": "1",
            "deviceId": 7,
            "eventType": 317,
            "eventValue": 0,
            "qstringForExtraData": ""
        }"#;
        let message = match classify(raw).unwrap() {
            Classification::Message(WsMessage::Event(event)) => event,
            other => panic!("expected event message, got {:?}", other),
        };
        assert_eq!(message.device_id, "1-7");
        assert_eq!(message.subtype, ResourceEventType::SwitchLevelChanged);
        assert_eq!(message.value, Some(0.0));
    }

    #[test]
    fn must_classify_property_changes() {
        let raw = r#"{
            "unitId": 1,
            "deviceId": 20,
            "property": 3,
            "propertyValue": 7500
        }"#;
        let message = match classify(raw).unwrap() {
            Classification::Message(WsMessage::PropertyChange(change)) => change,
            other => panic!("expected property change, got {:?}", other),
        };
        assert_eq!(message.device_id, "1-20");
        assert_eq!(message.subtype, ResourcePropertyChangeType::CoolSetPoint);
        assert_eq!(message.value, 7500);
    }

    #[test]
    fn must_ignore_geofence_monitoring_and_status_frames() {
        let geofence = r#"{"unitId": "1", "deviceId": 2, "fenceId": 9, "isInsideNow": true}"#;
        assert_eq!(
            classify(geofence).unwrap(),
            Classification::Ignored(IgnoredKind::GeofenceCrossing)
        );

        let monitoring =
            r#"{"unitId": "1", "deviceId": 2, "eventType": 10, "correlatedEventId": 4}"#;
        assert_eq!(
            classify(monitoring).unwrap(),
            Classification::Ignored(IgnoredKind::MonitoringEvent)
        );

        let status = r#"{"unitId": "1", "deviceId": 2, "newState": 1, "flagMask": 3}"#;
        assert_eq!(
            classify(status).unwrap(),
            Classification::Ignored(IgnoredKind::StatusUpdate)
        );
    }

    #[test]
    fn must_flag_unknown_shapes_as_unsupported() {
        assert_eq!(
            classify(r#"{"unitId": "1", "deviceId": 2}"#).unwrap(),
            Classification::Unsupported
        );
        assert_eq!(
            classify(r#"{"somethingElse": true}"#).unwrap(),
            Classification::Unsupported
        );
        // An event frame is the three-field tuple; a missing eventValue key
        // disqualifies it.
        assert_eq!(
            classify(r#"{"unitId": "1", "deviceId": 7, "eventType": 317, "qstringForExtraData": ""}"#)
                .unwrap(),
            Classification::Unsupported
        );
        assert!(classify("not json").is_err());
    }

    #[test]
    fn must_fold_unknown_event_types() {
        let raw = r#"{
            "unitId": "1",
            "deviceId": 7,
            "eventType": 9999,
            "eventValue": 1,
            "qstringForExtraData": ""
        }"#;
        let message = match classify(raw).unwrap() {
            Classification::Message(WsMessage::Event(event)) => event,
            other => panic!("expected event message, got {:?}", other),
        };
        assert_eq!(message.subtype, ResourceEventType::Unknown);
    }
}
