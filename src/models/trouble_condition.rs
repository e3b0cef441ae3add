//! Trouble conditions reported against the account's devices.

use serde::{Deserialize, Serialize};

use crate::models::{AnyResource, ResourceKind, ResourceType, TypedResource};

wire_enum! {
    pub enum TroubleConditionSeverity {
        Unknown = 0,
        Alarm = 1,
        Issue = 2,
    }
    fallback Unknown
}

wire_enum! {
    pub enum TroubleConditionType {
        Unknown = -1,
        SensorMalfunction = 12,
        AcFailure = 14,
        SensorLowBattery = 15,
        PanelLowBattery = 16,
        PanelNotResponding = 17,
        CameraNotReachable = 21,
        WaterAlert = 50,
        AlarmInMemory = 53,
        SmokeSensorReset = 57,
        BatteryCharging = 69,
        SensorNotResponding = 190,
    }
    fallback Unknown
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TroubleConditionAttributes {
    #[serde(default)]
    pub severity: TroubleConditionSeverity,
    #[serde(default)]
    pub trouble_condition_type: TroubleConditionType,
    #[serde(default)]
    pub device_id: i64,
    #[serde(default)]
    pub ember_device_id: String,
    #[serde(default)]
    pub can_be_muted_or_reset: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TroubleConditionKind;

impl ResourceKind for TroubleConditionKind {
    type Attributes = TroubleConditionAttributes;
    const TYPE: ResourceType = ResourceType::TroubleCondition;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::TroubleCondition(resource)
    }
}

pub type TroubleCondition = TypedResource<TroubleConditionKind>;
