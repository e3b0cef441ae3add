//! Gates.

use serde::{Deserialize, Serialize};

use crate::models::{
    AnyResource, DeviceBaseAttributes, DeviceState, ResourceKind, ResourceType, StatefulDevice,
    TypedResource,
};

wire_enum! {
    pub enum GateState {
        Loading = -1,
        Unknown = 0,
        Open = 1,
        Closed = 2,
    }
    fallback Unknown
}

impl DeviceState for GateState {
    fn loading() -> Option<Self> {
        Some(GateState::Loading)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateAttributes {
    #[serde(flatten)]
    pub base: DeviceBaseAttributes<GateState>,
    /// Whether the gate can be closed remotely.
    #[serde(default)]
    pub supports_remote_close: bool,
}

impl StatefulDevice for GateAttributes {
    type State = GateState;

    fn base(&self) -> &DeviceBaseAttributes<GateState> {
        &self.base
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GateKind;

impl ResourceKind for GateKind {
    type Attributes = GateAttributes;
    const TYPE: ResourceType = ResourceType::Gate;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::Gate(resource)
    }
}

pub type Gate = TypedResource<GateKind>;
