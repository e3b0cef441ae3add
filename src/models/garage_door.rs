//! Garage doors.

use serde::{Deserialize, Serialize};

use crate::models::{
    AnyResource, DeviceBaseAttributes, DeviceState, ResourceKind, ResourceType, StatefulDevice,
    TypedResource,
};

wire_enum! {
    pub enum GarageDoorState {
        Loading = -1,
        Unknown = 0,
        Open = 1,
        Closed = 2,
        Hidden = 3,
    }
    fallback Unknown
}

impl DeviceState for GarageDoorState {
    fn loading() -> Option<Self> {
        Some(GarageDoorState::Loading)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarageDoorAttributes {
    #[serde(flatten)]
    pub base: DeviceBaseAttributes<GarageDoorState>,
}

impl StatefulDevice for GarageDoorAttributes {
    type State = GarageDoorState;

    fn base(&self) -> &DeviceBaseAttributes<GarageDoorState> {
        &self.base
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GarageDoorKind;

impl ResourceKind for GarageDoorKind {
    type Attributes = GarageDoorAttributes;
    const TYPE: ResourceType = ResourceType::GarageDoor;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::GarageDoor(resource)
    }
}

pub type GarageDoor = TypedResource<GarageDoorKind>;
