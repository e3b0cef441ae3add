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
//! Typed resources.
//!
//! Each supported wire type has an attribute record decoded from the raw
//! JSON:API attributes map. The raw resource is kept alongside the decoded
//! record so that WebSocket mutations can edit attributes in place and so
//! controllers can diff by value.

mod garage_door;
mod gate;
mod light;
mod lock;
mod partition;
mod sensor;
mod system;
mod thermostat;
mod trouble_condition;
mod two_factor;
mod user;
mod water_sensor;
mod water_valve;

pub use garage_door::{GarageDoor, GarageDoorAttributes, GarageDoorKind, GarageDoorState};
pub use gate::{Gate, GateAttributes, GateKind, GateState};
pub use light::{Light, LightAttributes, LightColorFormat, LightKind, LightState};
pub use lock::{Lock, LockAttributes, LockKind, LockState};
pub use partition::{
    ExtendedArmingOption, ExtendedArmingOptions, Partition, PartitionAttributes, PartitionKind,
    PartitionState,
};
pub use sensor::{Sensor, SensorAttributes, SensorKind, SensorState, SensorSubtype};
pub use system::{System, SystemAttributes, SystemKind};
pub use thermostat::{
    TemperatureUnit, Thermostat, ThermostatAttributes, ThermostatFanMode, ThermostatKind,
    ThermostatReportedFanMode, ThermostatScheduleMode, ThermostatState, THERMOSTAT_MODELS,
};
pub use trouble_condition::{
    TroubleCondition, TroubleConditionAttributes, TroubleConditionKind, TroubleConditionSeverity,
    TroubleConditionType,
};
pub use two_factor::{SmsMobileNumber, TwoFactor, TwoFactorAttributes, TwoFactorKind};
pub use user::{
    ApplicationSessionProperties, Dealer, DealerAttributes, DealerKind, Identity,
    IdentityAttributes, IdentityKind, Profile, ProfileAttributes, ProfileKind,
};
pub use water_sensor::{WaterSensor, WaterSensorKind};
pub use water_valve::{WaterValve, WaterValveAttributes, WaterValveKind, WaterValveState};

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    jsonapi::Resource,
};

/// Wire `type` discriminator for every resource kind this crate understands.
///
/// Unknown wire strings map to [`ResourceType::Unknown`]; such resources are
/// preserved as raw documents and never promoted to typed ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    System,
    Partition,
    Sensor,
    Light,
    Lock,
    GarageDoor,
    Gate,
    Thermostat,
    WaterValve,
    WaterSensor,
    Identity,
    Profile,
    Dealer,
    TwoFactor,
    TroubleCondition,
    Unknown,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::System => "systems/system",
            ResourceType::Partition => "devices/partition",
            ResourceType::Sensor => "devices/sensor",
            ResourceType::Light => "devices/light",
            ResourceType::Lock => "devices/lock",
            ResourceType::GarageDoor => "devices/garage-door",
            ResourceType::Gate => "devices/gate",
            ResourceType::Thermostat => "devices/thermostat",
            ResourceType::WaterValve => "devices/water-valve",
            ResourceType::WaterSensor => "devices/water-sensor",
            ResourceType::Identity => "identity",
            ResourceType::Profile => "profile/profile",
            ResourceType::Dealer => "dealer/dealer",
            ResourceType::TwoFactor => "twoFactorAuthentication/twoFactorAuthentication",
            ResourceType::TroubleCondition => "troubleConditions/trouble-condition",
            ResourceType::Unknown => "unknown",
        }
    }

    pub fn from_wire(kind: &str) -> ResourceType {
        match kind {
            "systems/system" => ResourceType::System,
            "devices/partition" => ResourceType::Partition,
            "devices/sensor" => ResourceType::Sensor,
            "devices/light" => ResourceType::Light,
            "devices/lock" => ResourceType::Lock,
            "devices/garage-door" => ResourceType::GarageDoor,
            "devices/gate" => ResourceType::Gate,
            "devices/thermostat" => ResourceType::Thermostat,
            "devices/water-valve" => ResourceType::WaterValve,
            "devices/water-sensor" => ResourceType::WaterSensor,
            "identity" => ResourceType::Identity,
            "profile/profile" => ResourceType::Profile,
            "dealer/dealer" => ResourceType::Dealer,
            "twoFactorAuthentication/twoFactorAuthentication" => ResourceType::TwoFactor,
            "troubleConditions/trouble-condition" => ResourceType::TroubleCondition,
            _ => ResourceType::Unknown,
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let kind = String::deserialize(deserializer)?;
        Ok(ResourceType::from_wire(&kind))
    }
}

/// One supported resource kind: its wire tag plus the attribute record its
/// raw attributes decode into.
///
/// Kinds are zero-sized markers so that two kinds (sensors and water
/// sensors) can share one attribute record while remaining distinct
/// registry types.
pub trait ResourceKind: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    type Attributes: DeserializeOwned
        + Serialize
        + Clone
        + PartialEq
        + std::fmt::Debug
        + Send
        + Sync
        + 'static;

    const TYPE: ResourceType;

    /// Lifts a typed resource into the closed [`AnyResource`] variant.
    fn wrap(resource: TypedResource<Self>) -> AnyResource;
}

/// A raw resource plus its decoded attribute record.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedResource<K: ResourceKind> {
    raw: Resource,
    attributes: K::Attributes,
    _kind: std::marker::PhantomData<K>,
}

impl<K: ResourceKind> TypedResource<K> {
    /// Decodes the raw attributes map into the typed record. The raw
    /// resource is preserved for diffing and re-serialization.
    pub fn from_resource(raw: Resource) -> Result<Self> {
        let attributes: K::Attributes =
            serde_json::from_value(Value::Object(raw.attributes.clone())).map_err(|err| {
                Error::unexpected(format!(
                    "decoding attributes of {} {}: {}",
                    raw.kind, raw.id, err
                ))
            })?;
        Ok(Self {
            raw,
            attributes,
            _kind: std::marker::PhantomData,
        })
    }

    pub fn id(&self) -> &str {
        &self.raw.id
    }

    pub fn resource_type(&self) -> ResourceType {
        K::TYPE
    }

    pub fn attributes(&self) -> &K::Attributes {
        &self.attributes
    }

    pub fn raw(&self) -> &Resource {
        &self.raw
    }

    /// The device name, when the resource carries one.
    pub fn name(&self) -> &str {
        self.raw
            .attributes
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Id of the system this resource belongs to, from its `system`
    /// relationship.
    pub fn system_id(&self) -> Option<&str> {
        self.raw.has_one("system").map(|ri| ri.id.as_str())
    }

    pub fn into_any(self) -> AnyResource {
        K::wrap(self)
    }
}

/// Closed variant over every typed resource, with a fall-through arm that
/// preserves resources of unknown type as raw documents.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyResource {
    System(System),
    Partition(Partition),
    Sensor(Sensor),
    Light(Light),
    Lock(Lock),
    GarageDoor(GarageDoor),
    Gate(Gate),
    Thermostat(Thermostat),
    WaterValve(WaterValve),
    WaterSensor(WaterSensor),
    Identity(Identity),
    Profile(Profile),
    Dealer(Dealer),
    TwoFactor(TwoFactor),
    TroubleCondition(TroubleCondition),
    Unknown(Resource),
}

impl AnyResource {
    pub fn id(&self) -> &str {
        match self {
            AnyResource::System(r) => r.id(),
            AnyResource::Partition(r) => r.id(),
            AnyResource::Sensor(r) => r.id(),
            AnyResource::Light(r) => r.id(),
            AnyResource::Lock(r) => r.id(),
            AnyResource::GarageDoor(r) => r.id(),
            AnyResource::Gate(r) => r.id(),
            AnyResource::Thermostat(r) => r.id(),
            AnyResource::WaterValve(r) => r.id(),
            AnyResource::WaterSensor(r) => r.id(),
            AnyResource::Identity(r) => r.id(),
            AnyResource::Profile(r) => r.id(),
            AnyResource::Dealer(r) => r.id(),
            AnyResource::TwoFactor(r) => r.id(),
            AnyResource::TroubleCondition(r) => r.id(),
            AnyResource::Unknown(r) => &r.id,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            AnyResource::System(_) => ResourceType::System,
            AnyResource::Partition(_) => ResourceType::Partition,
            AnyResource::Sensor(_) => ResourceType::Sensor,
            AnyResource::Light(_) => ResourceType::Light,
            AnyResource::Lock(_) => ResourceType::Lock,
            AnyResource::GarageDoor(_) => ResourceType::GarageDoor,
            AnyResource::Gate(_) => ResourceType::Gate,
            AnyResource::Thermostat(_) => ResourceType::Thermostat,
            AnyResource::WaterValve(_) => ResourceType::WaterValve,
            AnyResource::WaterSensor(_) => ResourceType::WaterSensor,
            AnyResource::Identity(_) => ResourceType::Identity,
            AnyResource::Profile(_) => ResourceType::Profile,
            AnyResource::Dealer(_) => ResourceType::Dealer,
            AnyResource::TwoFactor(_) => ResourceType::TwoFactor,
            AnyResource::TroubleCondition(_) => ResourceType::TroubleCondition,
            AnyResource::Unknown(_) => ResourceType::Unknown,
        }
    }
}

/// State domain of a stateful device.
pub trait DeviceState: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// The transitional placeholder the provider reports while a device is
    /// still loading, for kinds that have one.
    fn loading() -> Option<Self> {
        None
    }
}

/// Attribute fields shared by every stateful device kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceBaseAttributes<S> {
    pub description: String,
    pub state: S,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_state: Option<S>,
    pub has_permission_to_change_state: bool,
    pub remote_commands_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level_null: Option<i64>,
    #[serde(default)]
    pub critical_battery: bool,
    #[serde(default)]
    pub low_battery: bool,
    #[serde(default)]
    pub can_be_saved: bool,
    #[serde(default)]
    pub can_confirm_state_change: bool,
    #[serde(default)]
    pub can_receive_commands: bool,
    #[serde(default)]
    pub is_malfunctioning: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model_id: Option<i64>,
}

/// Accessors shared by every stateful device attribute record.
pub trait StatefulDevice {
    type State: DeviceState;

    fn base(&self) -> &DeviceBaseAttributes<Self::State>;

    fn state(&self) -> Self::State {
        self.base().state
    }

    fn desired_state(&self) -> Option<Self::State> {
        self.base().desired_state
    }

    /// Whether the logged-in user can change this device's state.
    fn can_change_state(&self) -> bool {
        self.base().has_permission_to_change_state && self.base().remote_commands_enabled
    }

    /// Whether the reported state is still the transitional placeholder.
    fn is_loading(&self) -> bool {
        Self::State::loading() == Some(self.base().state)
    }

    /// Whether the device state has not yet caught up with the desired
    /// state.
    fn is_refreshing(&self) -> bool {
        self.is_loading()
            || self
                .base()
                .desired_state
                .map_or(false, |desired| desired != self.base().state)
    }

    fn battery_level_pct(&self) -> Option<i64> {
        self.base().battery_level_null
    }
}
