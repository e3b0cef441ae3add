//! Alarm systems (units).

use serde::{Deserialize, Serialize};

use crate::models::{AnyResource, ResourceKind, ResourceType, TypedResource};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemAttributes {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit_id: serde_json::Value,
    #[serde(default)]
    pub supports_secure_arming: bool,
    #[serde(default)]
    pub has_snap_shot_cameras: bool,
    #[serde(default)]
    pub remaining_image_quota: i64,
    #[serde(default)]
    pub system_group_name: String,
    #[serde(default)]
    pub is_in_partial_lockdown: bool,
}

impl SystemAttributes {
    /// The unit id as a string; the provider emits it both ways.
    pub fn unit_id_str(&self) -> Option<String> {
        match &self.unit_id {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SystemKind;

impl ResourceKind for SystemKind {
    type Attributes = SystemAttributes;
    const TYPE: ResourceType = ResourceType::System;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::System(resource)
    }
}

pub type System = TypedResource<SystemKind>;
