//! Sensors (contact, motion, smoke, and friends).

use serde::{Deserialize, Serialize};

use crate::models::{
    AnyResource, DeviceBaseAttributes, DeviceState, ResourceKind, ResourceType, StatefulDevice,
    TypedResource,
};

wire_enum! {
    pub enum SensorState {
        Unknown = -1,
        Closed = 1,
        Open = 2,
        Idle = 3,
        Active = 4,
        Dry = 5,
        Wet = 6,
        Full = 7,
        Low = 8,
        OpenedClosed = 9,
        Issue = 10,
        Ok = 11,
    }
    fallback Unknown
}

impl DeviceState for SensorState {}

wire_enum! {
    pub enum SensorSubtype {
        Unknown = -1,
        ContactSensor = 1,
        MotionSensor = 2,
        SmokeDetector = 5,
        CoDetector = 6,
        FreezeSensor = 8,
        PanicButton = 9,
        FixedPanic = 10,
        Siren = 14,
        GlassBreakDetector = 19,
        ContactShockSensor = 52,
        PanelImageSensor = 68,
        MobilePhone = 69,
        PanelGlassBreakDetector = 83,
        PanelMotionSensor = 89,
    }
    fallback Unknown
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorAttributes {
    #[serde(flatten)]
    pub base: DeviceBaseAttributes<SensorState>,
    pub device_type: SensorSubtype,
    #[serde(default)]
    pub is_bypassed: bool,
    #[serde(default)]
    pub supports_bypass: bool,
    /// Whether the sensor can be bypassed outside an arming event.
    #[serde(default)]
    pub supports_immediate_bypass: bool,
    #[serde(default)]
    pub is_monitoring_enabled: bool,
    #[serde(default)]
    pub is_flex_io: bool,
}

impl StatefulDevice for SensorAttributes {
    type State = SensorState;

    fn base(&self) -> &DeviceBaseAttributes<SensorState> {
        &self.base
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SensorKind;

impl ResourceKind for SensorKind {
    type Attributes = SensorAttributes;
    const TYPE: ResourceType = ResourceType::Sensor;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::Sensor(resource)
    }
}

pub type Sensor = TypedResource<SensorKind>;

impl Sensor {
    pub fn subtype(&self) -> SensorSubtype {
        self.attributes().device_type
    }
}
