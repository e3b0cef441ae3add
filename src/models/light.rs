//! Lights and dimmers.

use serde::{Deserialize, Serialize};

use crate::models::{
    AnyResource, DeviceBaseAttributes, DeviceState, ResourceKind, ResourceType, StatefulDevice,
    TypedResource,
};

wire_enum! {
    pub enum LightState {
        Loading = -1,
        Offline = 0,
        NoState = 1,
        On = 2,
        Off = 3,
        LevelChange = 4,
    }
    fallback Offline
}

impl DeviceState for LightState {
    fn loading() -> Option<Self> {
        Some(LightState::Loading)
    }
}

wire_enum! {
    pub enum LightColorFormat {
        NotSet = 0,
        Rgbw = 1,
        Rgb = 2,
        WarmToCool = 3,
        Hsv = 4,
    }
    fallback NotSet
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightAttributes {
    #[serde(flatten)]
    pub base: DeviceBaseAttributes<LightState>,
    /// Whether the light is a dimmer.
    pub is_dimmer: bool,
    /// Dimmer level, 0-100.
    #[serde(default)]
    pub light_level: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_color_format: Option<LightColorFormat>,
    #[serde(default)]
    pub percent_warmth: i64,
    #[serde(default)]
    pub supports_rgb_color_control: bool,
    #[serde(default)]
    pub supports_white_light_color_control: bool,
}

impl LightAttributes {
    /// Whether the light supports any form of color control.
    pub fn supports_color_control(&self) -> bool {
        self.supports_rgb_color_control || self.supports_white_light_color_control
    }
}

impl StatefulDevice for LightAttributes {
    type State = LightState;

    fn base(&self) -> &DeviceBaseAttributes<LightState> {
        &self.base
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightKind;

impl ResourceKind for LightKind {
    type Attributes = LightAttributes;
    const TYPE: ResourceType = ResourceType::Light;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::Light(resource)
    }
}

pub type Light = TypedResource<LightKind>;
