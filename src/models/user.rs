//! Identity, profile, and dealer resources returned by the identities
//! endpoint.

use serde::{Deserialize, Serialize};

use crate::models::{AnyResource, ResourceKind, ResourceType, TypedResource};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSessionProperties {
    #[serde(default)]
    pub should_timeout: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_keep_alive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logout_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactivity_warning_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityAttributes {
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub preferred_timezone: String,
    #[serde(default)]
    pub application_session_properties: ApplicationSessionProperties,
    #[serde(default)]
    pub localize_temp_units_to_celsius: bool,
    #[serde(default)]
    pub has_trouble_conditions_service: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IdentityKind;

impl ResourceKind for IdentityKind {
    type Attributes = IdentityAttributes;
    const TYPE: ResourceType = ResourceType::Identity;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::Identity(resource)
    }
}

pub type Identity = TypedResource<IdentityKind>;

impl Identity {
    /// Keep-alive URL, when keep-alive is enabled for the session.
    pub fn keep_alive_url(&self) -> Option<&str> {
        let props = &self.attributes().application_session_properties;
        if props.enable_keep_alive.unwrap_or(true) {
            props.keep_alive_url.as_deref()
        } else {
            None
        }
    }

    pub fn dealer_id(&self) -> Option<&str> {
        self.raw().has_one("dealer").map(|ri| ri.id.as_str())
    }

    pub fn selected_system_id(&self) -> Option<&str> {
        self.raw().has_one("selectedSystem").map(|ri| ri.id.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileAttributes {
    #[serde(default)]
    pub login_email_address: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProfileKind;

impl ResourceKind for ProfileKind {
    type Attributes = ProfileAttributes;
    const TYPE: ResourceType = ResourceType::Profile;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::Profile(resource)
    }
}

pub type Profile = TypedResource<ProfileKind>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerAttributes {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DealerKind;

impl ResourceKind for DealerKind {
    type Attributes = DealerAttributes;
    const TYPE: ResourceType = ResourceType::Dealer;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::Dealer(resource)
    }
}

pub type Dealer = TypedResource<DealerKind>;
