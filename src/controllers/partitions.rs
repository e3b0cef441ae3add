//! Partition controller: arming, disarming, fault clearing, and sensor
//! bypass.

use serde_json::{json, Map, Value};

use crate::{
    controllers::{DeviceController, DeviceKind, SupportedResourceEvents},
    error::{Error, Result},
    models::{ExtendedArmingOption, PartitionKind, PartitionState},
    websocket::messages::ResourceEventType,
};

impl DeviceKind for PartitionKind {
    const ENDPOINT: Option<&'static str> = Some("devices/partitions");

    fn supported_events() -> SupportedResourceEvents {
        SupportedResourceEvents {
            events: &[
                ResourceEventType::Disarmed,
                ResourceEventType::ArmedStay,
                ResourceEventType::ArmedAway,
                ResourceEventType::ArmedNight,
            ],
            property_changes: &[],
        }
    }

    fn event_state(event: ResourceEventType) -> Option<i64> {
        match event {
            ResourceEventType::Disarmed => Some(PartitionState::Disarmed.value()),
            ResourceEventType::ArmedStay => Some(PartitionState::ArmedStay.value()),
            ResourceEventType::ArmedAway => Some(PartitionState::ArmedAway.value()),
            ResourceEventType::ArmedNight => Some(PartitionState::ArmedNight.value()),
            _ => None,
        }
    }
}

/// Request body fragment for each extended arming option.
fn option_body(option: ExtendedArmingOption) -> Option<(&'static str, Value)> {
    match option {
        ExtendedArmingOption::BypassSensors => Some(("forceBypass", json!(true))),
        ExtendedArmingOption::NoEntryDelay => Some(("noEntryDelay", json!(true))),
        ExtendedArmingOption::SilentArming => Some(("silentArming", json!(true))),
        ExtendedArmingOption::NightArming => Some(("nightArming", json!(true))),
        _ => None,
    }
}

fn state_command(state: PartitionState) -> Option<&'static str> {
    match state {
        PartitionState::Disarmed => Some("disarm"),
        PartitionState::ArmedStay => Some("armStay"),
        PartitionState::ArmedAway => Some("armAway"),
        // Night arming is stay arming plus the night-arming option.
        PartitionState::ArmedNight => Some("armStay"),
        _ => None,
    }
}

pub type PartitionController = DeviceController<PartitionKind>;

impl PartitionController {
    pub async fn disarm(&self, id: &str) -> Result<()> {
        self.set_state(id, PartitionState::Disarmed, &[]).await
    }

    pub async fn arm_stay(
        &self,
        id: &str,
        force_bypass: bool,
        no_entry_delay: bool,
        silent_arming: bool,
    ) -> Result<()> {
        let mut options = Vec::new();
        if force_bypass {
            options.push(ExtendedArmingOption::BypassSensors);
        }
        if no_entry_delay {
            options.push(ExtendedArmingOption::NoEntryDelay);
        }
        if silent_arming {
            options.push(ExtendedArmingOption::SilentArming);
        }
        self.set_state(id, PartitionState::ArmedStay, &options).await
    }

    pub async fn arm_away(&self, id: &str, force_bypass: bool, no_entry_delay: bool) -> Result<()> {
        let mut options = Vec::new();
        if force_bypass {
            options.push(ExtendedArmingOption::BypassSensors);
        }
        if no_entry_delay {
            options.push(ExtendedArmingOption::NoEntryDelay);
        }
        self.set_state(id, PartitionState::ArmedAway, &options).await
    }

    pub async fn arm_night(&self, id: &str, force_bypass: bool, no_entry_delay: bool) -> Result<()> {
        let mut options = Vec::new();
        if force_bypass {
            options.push(ExtendedArmingOption::BypassSensors);
        }
        if no_entry_delay {
            options.push(ExtendedArmingOption::NoEntryDelay);
        }
        options.push(ExtendedArmingOption::NightArming);
        self.set_state(id, PartitionState::ArmedNight, &options).await
    }

    pub async fn clear_faults(&self, id: &str) -> Result<()> {
        self.send_command(id, "clearIssues", Map::new()).await
    }

    /// Arms or disarms the partition. Every requested extended option is
    /// validated against the partition's option list for the target state;
    /// an unsupported option fails the call before any request is sent.
    pub async fn set_state(
        &self,
        id: &str,
        state: PartitionState,
        options: &[ExtendedArmingOption],
    ) -> Result<()> {
        let command = state_command(state).ok_or_else(|| {
            Error::unsupported(format!("partition state {:?} cannot be requested", state))
        })?;

        if state == PartitionState::Disarmed && !options.is_empty() {
            return Err(Error::unsupported(
                "extended arming options are not supported for disarm",
            ));
        }

        let partition = self
            .get(id)
            .ok_or_else(|| Error::UnknownDevice { id: id.to_owned() })?;
        let allowed = partition
            .attributes()
            .extended_arming_options
            .for_state(state);

        let mut body = Map::new();
        for option in options {
            let fragment = option_body(*option);
            if !allowed.contains(option) || fragment.is_none() {
                return Err(Error::unsupported(format!(
                    "extended arming option {:?} not supported for {:?}",
                    option, state
                )));
            }
            let (key, value) = fragment.unwrap();
            body.insert(key.to_owned(), value);
        }

        self.send_command(id, command, body).await
    }

    /// Bypasses and/or un-bypasses sensors on the partition. At least one
    /// id list must be non-empty.
    pub async fn change_sensor_bypass(
        &self,
        partition_id: &str,
        bypass_ids: &[&str],
        unbypass_ids: &[&str],
    ) -> Result<()> {
        if bypass_ids.is_empty() && unbypass_ids.is_empty() {
            return Err(Error::invalid(
                "either bypass_ids or unbypass_ids must be provided",
            ));
        }

        let mut body = Map::new();
        body.insert("bypass".to_owned(), json!(bypass_ids.join("|")));
        body.insert("unbypass".to_owned(), json!(unbypass_ids.join("|")));
        self.send_command(partition_id, "bypassSensors", body).await
    }

    /// The partition a device belongs to, by searching each partition's
    /// related ids.
    pub fn partition_id_for(&self, resource_id: &str) -> Option<String> {
        self.items()
            .into_iter()
            .find(|partition| partition.child_ids().contains(resource_id))
            .map(|partition| partition.id().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::testing::{offline_controller, resource};
    use crate::models::ResourceType;

    fn partition_attributes() -> Value {
        json!({
            "description": "Main",
            "state": 1,
            "desiredState": 1,
            "hasPermissionToChangeState": true,
            "remoteCommandsEnabled": true,
            "extendedArmingOptions": {
                "disarmed": [],
                "armedStay": [0, 1, 2],
                "armedAway": [1],
                "armedNight": [0, 1, 3]
            }
        })
    }

    #[tokio::test]
    async fn must_reject_unsupported_extended_options_before_posting() {
        let (controller, _broker) = offline_controller::<PartitionKind>();
        controller
            .apply_universe(vec![resource(
                "1",
                ResourceType::Partition,
                partition_attributes(),
            )])
            .await
            .unwrap();

        // armedAway lacks BypassSensors (0): force_bypass must fail without
        // any HTTP traffic (the offline session would error loudly).
        let err = controller.arm_away("1", true, false).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    #[tokio::test]
    async fn must_reject_bypass_change_without_ids() {
        let (controller, _broker) = offline_controller::<PartitionKind>();
        controller
            .apply_universe(vec![resource(
                "1",
                ResourceType::Partition,
                partition_attributes(),
            )])
            .await
            .unwrap();

        let err = controller
            .change_sensor_bypass("1", &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn must_find_owning_partition_for_device() {
        let (controller, _broker) = offline_controller::<PartitionKind>();
        let raw = serde_json::from_value(json!({
            "id": "1",
            "type": "devices/partition",
            "attributes": partition_attributes(),
            "relationships": {
                "system": {"data": {"id": "100", "type": "systems/system"}},
                "sensors": {"data": [{"id": "1-2", "type": "devices/sensor"}]}
            }
        }))
        .unwrap();
        controller.apply_universe(vec![raw]).await.unwrap();

        assert_eq!(controller.partition_id_for("1-2").as_deref(), Some("1"));
        assert_eq!(controller.partition_id_for("100"), None);
        assert_eq!(controller.partition_id_for("1-99"), None);
    }
}
