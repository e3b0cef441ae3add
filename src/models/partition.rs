//! Alarm panel partitions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{
    AnyResource, DeviceBaseAttributes, DeviceState, ResourceKind, ResourceType, StatefulDevice,
    TypedResource,
};

wire_enum! {
    pub enum PartitionState {
        Loading = -1,
        Unknown = 0,
        Disarmed = 1,
        ArmedStay = 2,
        ArmedAway = 3,
        ArmedNight = 4,
        Hidden = 5,
    }
    fallback Unknown
}

impl DeviceState for PartitionState {
    fn loading() -> Option<Self> {
        Some(PartitionState::Loading)
    }
}

wire_enum! {
    pub enum ExtendedArmingOption {
        Unknown = -1,
        BypassSensors = 0,
        NoEntryDelay = 1,
        SilentArming = 2,
        NightArming = 3,
        SelectivelyBypassSensors = 4,
        ForceArm = 5,
        InstantArm = 6,
        StayArm = 7,
        AwayArm = 8,
    }
    fallback Unknown
}

/// Extended arming options supported per arming mode.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedArmingOptions {
    #[serde(default)]
    pub disarmed: Vec<ExtendedArmingOption>,
    #[serde(default)]
    pub armed_stay: Vec<ExtendedArmingOption>,
    #[serde(default)]
    pub armed_away: Vec<ExtendedArmingOption>,
    #[serde(default)]
    pub armed_night: Vec<ExtendedArmingOption>,
}

impl ExtendedArmingOptions {
    /// The option list for the given target state; empty for states that
    /// have no extended options.
    pub fn for_state(&self, state: PartitionState) -> &[ExtendedArmingOption] {
        match state {
            PartitionState::Disarmed => &self.disarmed,
            PartitionState::ArmedStay => &self.armed_stay,
            PartitionState::ArmedAway => &self.armed_away,
            PartitionState::ArmedNight => &self.armed_night,
            _ => &[],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionAttributes {
    #[serde(flatten)]
    pub base: DeviceBaseAttributes<PartitionState>,
    pub extended_arming_options: ExtendedArmingOptions,
    #[serde(default)]
    pub invalid_extended_arming_options: Option<ExtendedArmingOptions>,
    /// Whether the panel accepts bypass commands while armed.
    #[serde(default)]
    pub can_bypass_sensor_when_armed: bool,
    #[serde(default)]
    pub has_open_bypassable_sensors: bool,
    #[serde(default)]
    pub has_sensor_in_trouble_condition: bool,
    /// If hidden, force bypass is always enabled.
    #[serde(default)]
    pub hide_force_bypass: bool,
    #[serde(default)]
    pub needs_clear_issues_prompt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<String>,
}

impl PartitionAttributes {
    pub fn supports_night_arming(&self) -> bool {
        self.extended_arming_options
            .armed_night
            .contains(&ExtendedArmingOption::NightArming)
    }
}

impl StatefulDevice for PartitionAttributes {
    type State = PartitionState;

    fn base(&self) -> &DeviceBaseAttributes<PartitionState> {
        &self.base
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PartitionKind;

impl ResourceKind for PartitionKind {
    type Attributes = PartitionAttributes;
    const TYPE: ResourceType = ResourceType::Partition;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::Partition(resource)
    }
}

pub type Partition = TypedResource<PartitionKind>;

impl Partition {
    /// Ids of the devices on this partition: every related id minus the
    /// parent system.
    pub fn child_ids(&self) -> HashSet<String> {
        let mut ids = self.raw().all_related_ids();
        if let Some(system_id) = self.system_id() {
            ids.remove(system_id);
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn must_exclude_system_from_child_ids() {
        let raw = serde_json::from_value(serde_json::json!({
            "id": "1",
            "type": "devices/partition",
            "attributes": {
                "description": "Main",
                "state": 1,
                "desiredState": 1,
                "hasPermissionToChangeState": true,
                "remoteCommandsEnabled": true,
                "extendedArmingOptions": {
                    "disarmed": [],
                    "armedStay": [0, 1, 2],
                    "armedAway": [0, 1],
                    "armedNight": [0, 1, 3]
                }
            },
            "relationships": {
                "system": {"data": {"id": "100", "type": "systems/system"}},
                "sensors": {"data": [
                    {"id": "1-2", "type": "devices/sensor"},
                    {"id": "1-3", "type": "devices/sensor"}
                ]}
            }
        }))
        .unwrap();

        let partition = Partition::from_resource(raw).unwrap();
        let children = partition.child_ids();
        assert_eq!(children.len(), 2);
        assert!(!children.contains("100"));
        assert!(partition.attributes().supports_night_arming());
    }
}
