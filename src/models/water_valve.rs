//! Water valves.

use serde::{Deserialize, Serialize};

use crate::models::{
    AnyResource, DeviceBaseAttributes, DeviceState, ResourceKind, ResourceType, StatefulDevice,
    TypedResource,
};

wire_enum! {
    pub enum WaterValveState {
        Loading = -1,
        Unknown = 0,
        Open = 1,
        Closed = 2,
    }
    fallback Unknown
}

impl DeviceState for WaterValveState {
    fn loading() -> Option<Self> {
        Some(WaterValveState::Loading)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterValveAttributes {
    #[serde(flatten)]
    pub base: DeviceBaseAttributes<WaterValveState>,
}

impl StatefulDevice for WaterValveAttributes {
    type State = WaterValveState;

    fn base(&self) -> &DeviceBaseAttributes<WaterValveState> {
        &self.base
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WaterValveKind;

impl ResourceKind for WaterValveKind {
    type Attributes = WaterValveAttributes;
    const TYPE: ResourceType = ResourceType::WaterValve;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::WaterValve(resource)
    }
}

pub type WaterValve = TypedResource<WaterValveKind>;
