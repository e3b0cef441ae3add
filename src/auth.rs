/*
 * Copyright 2021 the alarmdotcom_sdk developers
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */
//! Login orchestration: credential submission, identity discovery, and the
//! two-factor sub-protocol.

use std::sync::Arc;

use serde_json::json;

use crate::{
    controllers::{DealerController, DeviceContext, IdentityController, ProfileController},
    error::{Error, Result},
    events::EventBroker,
    http::HttpSession,
    models::{Identity, TwoFactor},
};

const TWO_FACTOR_PATH: &str = "engines/twoFactorAuthentication/twoFactorAuthentications";

/// Session refresh fallback when the identity does not report an inactivity
/// timeout. Provider sessions expire at 15 minutes.
const DEFAULT_SESSION_REFRESH_MS: u64 = 5 * 60 * 1000;

wire_enum! {
    /// Two-factor authentication methods, as used in the provider's
    /// enabled-types bitmask.
    pub enum OtpType {
        Disabled = 0,
        App = 1,
        Sms = 2,
        Email = 4,
    }
    fallback Disabled
}

impl OtpType {
    /// Decodes the enabled-types bitmask into the list of enabled methods.
    pub fn from_bitmask(mask: u8) -> Vec<OtpType> {
        [OtpType::App, OtpType::Sms, OtpType::Email]
            .into_iter()
            .filter(|method| mask & method.value() as u8 != 0)
            .collect()
    }
}

/// Where the provider can deliver a one-time password.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OtpDestination {
    pub email: Option<String>,
    pub sms_number: Option<String>,
    pub sms_country: Option<String>,
}

/// Result of a login attempt that did not fail outright.
#[derive(Clone, Debug, PartialEq)]
pub enum LoginOutcome {
    /// Fully logged in; the session is ready for API calls.
    Success,
    /// Credentials were accepted but a one-time password is required.
    OtpRequired {
        methods: Vec<OtpType>,
        destination: OtpDestination,
    },
    /// The provider demands that two-factor authentication be configured
    /// before the account may be used.
    MustConfigureMfa,
}

/// Owns the login flow and the identity-scoped resources (identity, profile,
/// dealer) that every other component reads its session facts from.
pub struct AuthController {
    session: HttpSession,
    context: Arc<DeviceContext>,
    identities: IdentityController,
    profiles: ProfileController,
    dealers: DealerController,
}

impl AuthController {
    pub fn new(session: HttpSession, broker: EventBroker, context: Arc<DeviceContext>) -> Self {
        Self {
            identities: IdentityController::new(session.clone(), broker.clone(), context.clone()),
            profiles: ProfileController::new(session.clone(), broker.clone(), context.clone()),
            dealers: DealerController::new(session.clone(), broker, context.clone()),
            session,
            context,
        }
    }

    /// Logs in to the provider.
    ///
    /// Step 1 and 2 (login page preload, credential POST) are owned by the
    /// HTTP session. Step 3 fetches identity, profile and dealer, then
    /// consults the two-factor record to decide whether an OTP gate applies.
    /// Bad credentials, lockout and transport failures are `Err`; the OTP
    /// gates are ordinary outcomes.
    pub async fn login(&self) -> Result<LoginOutcome> {
        tracing::info!("logging in to Alarm.com");
        self.session.login_credentials().await?;
        tracing::info!("logged in, checking MFA requirements");

        if self.profiles.is_initialized() {
            // Re-login on an existing bridge: refresh rather than re-wire.
            self.identities.refresh().await?;
        } else {
            self.profiles
                .initialize_with_provider(&self.identities)
                .await?;
            self.identities.initialize().await?;
            self.dealers.initialize().await?;
        }

        let identity = self.primary_identity().ok_or_else(|| {
            Error::unexpected("no identities found")
        })?;
        self.context
            .set_use_celsius(identity.attributes().localize_temp_units_to_celsius);

        match identity.dealer_id() {
            Some(dealer_id) => {
                if let Err(err) = self.dealers.add_target(dealer_id).await {
                    tracing::warn!("failed to fetch dealer {}: {}", dealer_id, err);
                }
            }
            None => tracing::warn!("identity has no dealer relationship"),
        }

        self.otp_discovery(identity.id()).await
    }

    async fn otp_discovery(&self, identity_id: &str) -> Result<LoginOutcome> {
        let url = self
            .session
            .api_url(&format!("{}/{}", TWO_FACTOR_PATH, identity_id));
        let two_factor = TwoFactor::from_resource(self.session.get(url).await?.single()?)?;
        let attributes = two_factor.attributes();

        if attributes.show_suggested_setup {
            return Ok(LoginOutcome::MustConfigureMfa);
        }

        let methods = OtpType::from_bitmask(attributes.enabled_two_factor_types);
        if methods.contains(&OtpType::Disabled)
            || attributes.is_current_device_trusted
            || methods.is_empty()
        {
            // Two-factor is off, or our device-trust cookie was accepted.
            return Ok(LoginOutcome::Success);
        }

        tracing::info!("one-time password required; enabled methods {:?}", methods);
        Ok(LoginOutcome::OtpRequired {
            methods,
            destination: OtpDestination {
                email: attributes.email.clone(),
                sms_number: attributes
                    .sms_mobile_number
                    .as_ref()
                    .map(|sms| sms.mobile_number.clone()),
                sms_country: attributes
                    .sms_mobile_number
                    .as_ref()
                    .map(|sms| sms.country.clone()),
            },
        })
    }

    /// Asks the provider to deliver an OTP. Only SMS and email need a
    /// delivery request; app-based codes are generated locally, so this is
    /// a no-op for every other method.
    pub async fn request_otp(&self, method: OtpType) -> Result<()> {
        let action = match method {
            OtpType::Sms => "sendTwoFactorAuthenticationCodeViaSms",
            OtpType::Email => "sendTwoFactorAuthenticationCodeViaEmail",
            _ => return Ok(()),
        };
        let identity_id = self.identity_id().ok_or(Error::NotInitialized)?;
        let url = self
            .session
            .api_url(&format!("{}/{}/{}", TWO_FACTOR_PATH, identity_id, action));
        self.session.post_mini(url, None).await?;
        Ok(())
    }

    /// Verifies an OTP. When `device_name` is given the current device is
    /// additionally registered as trusted, and the resulting two-factor
    /// cookie is returned (and kept on the session for reuse).
    pub async fn submit_otp(
        &self,
        code: &str,
        method: OtpType,
        device_name: Option<&str>,
    ) -> Result<Option<String>> {
        let identity_id = self.identity_id().ok_or(Error::NotInitialized)?;

        let url = self.session.api_url(&format!(
            "{}/{}/verifyTwoFactorCode",
            TWO_FACTOR_PATH, identity_id
        ));
        self.session
            .post_mini(url, Some(json!({"code": code, "typeOf2FA": method.value()})))
            .await?;

        let device_name = match device_name {
            Some(device_name) => device_name,
            None => {
                tracing::debug!("skipping device trust registration");
                return Ok(None);
            }
        };

        let url = self.session.api_url(&format!(
            "{}/{}/trustTwoFactorDevice",
            TWO_FACTOR_PATH, identity_id
        ));
        self.session
            .post_mini(url, Some(json!({"deviceName": device_name})))
            .await?;

        match self.session.mfa_cookie() {
            Some(cookie) => Ok(Some(cookie)),
            None => Err(Error::unexpected(
                "no two-factor cookie found after trusting device",
            )),
        }
    }

    //
    // Session facts read by the bridge and the WebSocket client.
    //

    fn primary_identity(&self) -> Option<Identity> {
        // TODO: accounts can carry multiple identities; the first one is
        // used, matching the provider web app's behavior.
        self.identities.items().into_iter().next()
    }

    pub fn identity_id(&self) -> Option<String> {
        self.primary_identity().map(|identity| identity.id().to_owned())
    }

    /// Id of the user's profile; the keep-alive context reload posts
    /// against it.
    pub fn profile_id(&self) -> Option<String> {
        self.profiles
            .items()
            .into_iter()
            .next()
            .map(|profile| profile.id().to_owned())
    }

    pub fn user_email(&self) -> Option<String> {
        self.profiles
            .items()
            .into_iter()
            .next()
            .map(|profile| profile.attributes().login_email_address.clone())
    }

    /// Name of the Alarm.com reseller for this account.
    pub fn dealer(&self) -> String {
        self.dealers
            .items()
            .into_iter()
            .next()
            .map(|dealer| dealer.attributes().name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Alarm.com".to_owned())
    }

    pub fn use_celsius(&self) -> bool {
        self.context.use_celsius()
    }

    pub fn session_refresh_interval_ms(&self) -> u64 {
        self.primary_identity()
            .and_then(|identity| {
                identity
                    .attributes()
                    .application_session_properties
                    .inactivity_warning_timeout_ms
            })
            .unwrap_or(DEFAULT_SESSION_REFRESH_MS)
    }

    pub fn keep_alive_url(&self) -> Option<String> {
        self.primary_identity()
            .and_then(|identity| identity.keep_alive_url().map(str::to_owned))
    }

    pub fn enable_keep_alive(&self) -> bool {
        self.primary_identity()
            .and_then(|identity| {
                identity
                    .attributes()
                    .application_session_properties
                    .enable_keep_alive
            })
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn must_decode_otp_bitmasks() {
        assert_eq!(OtpType::from_bitmask(0), vec![]);
        assert_eq!(OtpType::from_bitmask(1), vec![OtpType::App]);
        assert_eq!(OtpType::from_bitmask(3), vec![OtpType::App, OtpType::Sms]);
        assert_eq!(
            OtpType::from_bitmask(7),
            vec![OtpType::App, OtpType::Sms, OtpType::Email]
        );
        assert_eq!(OtpType::from_bitmask(4), vec![OtpType::Email]);
    }
}
