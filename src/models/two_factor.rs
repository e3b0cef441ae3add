//! The account's two-factor-authentication record.

use serde::{Deserialize, Serialize};

use crate::models::{AnyResource, ResourceKind, ResourceType, TypedResource};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsMobileNumber {
    #[serde(default)]
    pub mobile_number: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub cell_provider: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorAttributes {
    /// Bitmask over the OTP method values.
    #[serde(default)]
    pub enabled_two_factor_types: u8,
    #[serde(default)]
    pub is_current_device_trusted: bool,
    #[serde(default)]
    pub show_suggested_setup: bool,
    #[serde(default)]
    pub can_skip_suggested_setup: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub sms_mobile_number: Option<SmsMobileNumber>,
    #[serde(default)]
    pub current_device_name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TwoFactorKind;

impl ResourceKind for TwoFactorKind {
    type Attributes = TwoFactorAttributes;
    const TYPE: ResourceType = ResourceType::TwoFactor;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::TwoFactor(resource)
    }
}

pub type TwoFactor = TypedResource<TwoFactorKind>;
