//! Identity, profile and dealer controllers.
//!
//! The identities endpoint returns the profile in its `included` list, so
//! the profile controller is data-provided by the identity controller.
//! Dealers are only reachable as single-serve fetches by id.

use crate::{
    controllers::{DeviceController, DeviceKind},
    models::{DealerKind, IdentityKind, ProfileKind},
};

impl DeviceKind for IdentityKind {
    const ENDPOINT: Option<&'static str> = Some("identities");
}

impl DeviceKind for ProfileKind {
    const ENDPOINT: Option<&'static str> = None;
}

impl DeviceKind for DealerKind {
    const ENDPOINT: Option<&'static str> = Some("dealers/dealers");
    const REQUIRES_TARGET_IDS: bool = true;
}

pub type IdentityController = DeviceController<IdentityKind>;
pub type ProfileController = DeviceController<ProfileKind>;
pub type DealerController = DeviceController<DealerKind>;
