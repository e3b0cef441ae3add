//! System (unit) controller.

use serde_json::{json, Map};

use crate::{
    controllers::{DeviceController, DeviceKind},
    error::Result,
    models::SystemKind,
};

impl DeviceKind for SystemKind {
    const ENDPOINT: Option<&'static str> = Some("systems/systems");
}

pub type SystemController = DeviceController<SystemKind>;

impl SystemController {
    /// Stops all alarms and disarms the system.
    pub async fn stop_alarms(&self, id: &str) -> Result<()> {
        self.send_command(id, "stopAlarms", Map::new()).await
    }

    pub async fn clear_alarms_in_memory(&self, id: &str) -> Result<()> {
        self.send_command(id, "clearAlarmsInMemoryTrouble", Map::new()).await
    }

    /// Resets a smoke sensor to closed.
    pub async fn clear_smoke_sensor(&self, system_id: &str, smoke_sensor_id: &str) -> Result<()> {
        let mut body = Map::new();
        body.insert("data".to_owned(), json!(smoke_sensor_id));
        self.send_command(system_id, "clearSmokeSensorStatus", body).await
    }
}
