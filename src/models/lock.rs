//! Locks.

use serde::{Deserialize, Serialize};

use crate::models::{
    AnyResource, DeviceBaseAttributes, DeviceState, ResourceKind, ResourceType, StatefulDevice,
    TypedResource,
};

wire_enum! {
    pub enum LockState {
        Loading = -1,
        Unknown = 0,
        Locked = 1,
        Unlocked = 2,
        Hidden = 3,
    }
    fallback Unknown
}

impl DeviceState for LockState {
    fn loading() -> Option<Self> {
        Some(LockState::Loading)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockAttributes {
    #[serde(flatten)]
    pub base: DeviceBaseAttributes<LockState>,
    /// Whether the lock supports remotely controlling the latch.
    #[serde(default)]
    pub supports_latch_control: bool,
}

impl StatefulDevice for LockAttributes {
    type State = LockState;

    fn base(&self) -> &DeviceBaseAttributes<LockState> {
        &self.base
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LockKind;

impl ResourceKind for LockKind {
    type Attributes = LockAttributes;
    const TYPE: ResourceType = ResourceType::Lock;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::Lock(resource)
    }
}

pub type Lock = TypedResource<LockKind>;
