//! Thermostats.

use serde::{Deserialize, Serialize};

use crate::models::{
    AnyResource, DeviceBaseAttributes, DeviceState, ResourceKind, ResourceType, StatefulDevice,
    TypedResource,
};

wire_enum! {
    pub enum ThermostatState {
        Loading = -1,
        Unknown = 0,
        Off = 1,
        Heat = 2,
        Cool = 3,
        Auto = 4,
        AuxHeat = 5,
    }
    fallback Unknown
}

impl DeviceState for ThermostatState {
    fn loading() -> Option<Self> {
        Some(ThermostatState::Loading)
    }
}

wire_enum! {
    /// Fan modes as reported in the thermostat response object.
    pub enum ThermostatReportedFanMode {
        AutoLow = 0,
        OnLow = 1,
        AutoHigh = 2,
        OnHigh = 3,
        AutoMedium = 4,
        OnMedium = 5,
        Circulate = 6,
        Humidity = 7,
    }
    fallback AutoLow
}

wire_enum! {
    /// User-facing fan modes.
    pub enum ThermostatFanMode {
        Unknown = -1,
        Auto = 0,
        On = 1,
        Circulate = 2,
    }
    fallback Unknown
}

wire_enum! {
    pub enum ThermostatScheduleMode {
        ManualMode = 0,
        Scheduled = 1,
        SmartSchedules = 2,
    }
    fallback ManualMode
}

wire_enum! {
    pub enum TemperatureUnit {
        Fahrenheit = 1,
        Celsius = 2,
        Kelvin = 3,
    }
    fallback Fahrenheit
}

/// Device-model table for thermostats: model id to (manufacturer, model).
pub const THERMOSTAT_MODELS: &[(i64, &str, &str)] = &[
    (4293, "Honeywell", "T6 Pro"),
    (10023, "ecobee", "ecobee3 lite"),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermostatAttributes {
    #[serde(flatten)]
    pub base: DeviceBaseAttributes<ThermostatState>,
    /// Current temperature reported by the device.
    #[serde(default)]
    pub ambient_temp: f64,
    #[serde(default)]
    pub cool_setpoint: f64,
    #[serde(default)]
    pub desired_cool_setpoint: f64,
    #[serde(default)]
    pub heat_setpoint: f64,
    #[serde(default)]
    pub desired_heat_setpoint: f64,
    /// Minimum buffer between the heat and cool setpoints.
    #[serde(default)]
    pub auto_setpoint_buffer: f64,
    #[serde(default)]
    pub setpoint_offset: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cool_setpoint: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cool_setpoint: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_heat_setpoint: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_heat_setpoint: Option<f64>,
    #[serde(default)]
    pub fan_mode: ThermostatReportedFanMode,
    #[serde(default)]
    pub desired_fan_mode: ThermostatReportedFanMode,
    /// Fan duration is not echoed back in server responses, even when the
    /// fan is turned on for a fixed time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fan_duration: Option<i64>,
    #[serde(default)]
    pub supported_fan_durations: Vec<i64>,
    /// Reported as a display string, unlike the integer sent on commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_mode: Option<String>,
    #[serde(default)]
    pub has_pending_setpoint_change: bool,
    #[serde(default)]
    pub has_pending_temp_mode_change: bool,
    #[serde(default)]
    pub humidity_level: i64,
    #[serde(default)]
    pub supports_humidity: bool,
    #[serde(default)]
    pub supports_auto_mode: bool,
    #[serde(default)]
    pub supports_aux_heat_mode: bool,
    #[serde(default)]
    pub supports_cool_mode: bool,
    #[serde(default)]
    pub supports_heat_mode: bool,
    #[serde(default)]
    pub supports_off_mode: bool,
    #[serde(default)]
    pub supports_fan_mode: bool,
    #[serde(default)]
    pub supports_schedules: bool,
    #[serde(default)]
    pub supports_setpoints: bool,
}

impl ThermostatAttributes {
    /// Whether a setpoint or mode change is still in flight.
    pub fn has_dirty_setpoint(&self) -> bool {
        self.has_pending_setpoint_change || self.has_pending_temp_mode_change
    }

    /// Folds the reported fan mode down to the user-facing domain.
    pub fn user_fan_mode(&self) -> ThermostatFanMode {
        match self.desired_fan_mode {
            ThermostatReportedFanMode::AutoLow
            | ThermostatReportedFanMode::AutoMedium
            | ThermostatReportedFanMode::AutoHigh => ThermostatFanMode::Auto,
            ThermostatReportedFanMode::OnLow
            | ThermostatReportedFanMode::OnMedium
            | ThermostatReportedFanMode::OnHigh => ThermostatFanMode::On,
            ThermostatReportedFanMode::Circulate => ThermostatFanMode::Circulate,
            ThermostatReportedFanMode::Humidity => ThermostatFanMode::Unknown,
        }
    }
}

impl StatefulDevice for ThermostatAttributes {
    type State = ThermostatState;

    fn base(&self) -> &DeviceBaseAttributes<ThermostatState> {
        &self.base
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThermostatKind;

impl ResourceKind for ThermostatKind {
    type Attributes = ThermostatAttributes;
    const TYPE: ResourceType = ResourceType::Thermostat;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::Thermostat(resource)
    }
}

pub type Thermostat = TypedResource<ThermostatKind>;

impl Thermostat {
    /// Manufacturer/model from the device-model table, falling back to the
    /// model string the provider reports directly.
    pub fn model(&self) -> Option<String> {
        if let Some(model) = &self.attributes().base.device_model {
            return Some(model.clone());
        }
        let id = self.attributes().base.device_model_id?;
        THERMOSTAT_MODELS
            .iter()
            .find(|(model_id, _, _)| *model_id == id)
            .map(|(_, _, model)| (*model).to_owned())
    }
}
