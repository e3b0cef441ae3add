//! Trouble condition controller (read-only).

use crate::{
    controllers::{DeviceController, DeviceKind},
    models::TroubleConditionKind,
};

impl DeviceKind for TroubleConditionKind {
    const ENDPOINT: Option<&'static str> = Some("troubleConditions/troubleConditions");
    const QUERY: Option<&'static str> = Some("forceRefresh=false");
}

pub type TroubleConditionController = DeviceController<TroubleConditionKind>;
