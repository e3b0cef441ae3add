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
use derive_more::{Display, Error};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type surfaced by every public operation of this crate.
///
/// Lower-level failures (transport, serialization, WebSocket) are translated
/// into one of these kinds at the HTTP and WebSocket layers; callers never
/// see a raw `reqwest` or `tungstenite` error.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum Error {
    /// Credentials were rejected, the session expired, or the provider
    /// demands two-factor authentication for this request.
    #[display(fmt = "authentication failed: {}", message)]
    AuthenticationFailed {
        message: String,
        /// Whether a transparent re-login is expected to fix this.
        can_autocorrect: bool,
    },

    /// The provider requires the account to set up two-factor authentication
    /// before the API may be used.
    #[display(fmt = "two-factor authentication must be configured for this account")]
    MustConfigureMfa,

    /// The logged-in account lacks permission (or the service plan lacks
    /// support) for the requested resource.
    #[display(fmt = "not authorized: {}", message)]
    NotAuthorized { message: String },

    /// A command was issued against an id that is not in the registry.
    #[display(fmt = "unknown device id '{}'", id)]
    UnknownDevice { id: String },

    /// The device does not support the requested operation.
    #[display(fmt = "unsupported operation: {}", message)]
    UnsupportedOperation { message: String },

    /// Mutually exclusive or out-of-range arguments.
    #[display(fmt = "invalid argument: {}", message)]
    InvalidArgument { message: String },

    /// The wire data could not be parsed, or a JSON:API document had an
    /// unrecognized shape.
    #[display(fmt = "unexpected response: {}", message)]
    UnexpectedResponse { message: String },

    /// Connection or timeout failure that survived the retry budget.
    #[display(fmt = "service unavailable: {}", message)]
    ServiceUnavailable { message: String },

    /// The provider reported the session as expired.
    #[display(fmt = "session expired")]
    SessionExpired,

    /// An operation was invoked before `initialize()`.
    #[display(fmt = "not initialized")]
    NotInitialized,
}

impl Error {
    pub(crate) fn unexpected(message: impl Into<String>) -> Self {
        Error::UnexpectedResponse {
            message: message.into(),
        }
    }

    pub(crate) fn unavailable(message: impl Into<String>) -> Self {
        Error::ServiceUnavailable {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Error::UnsupportedOperation {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn auth(message: impl Into<String>, can_autocorrect: bool) -> Self {
        Error::AuthenticationFailed {
            message: message.into(),
            can_autocorrect,
        }
    }

    /// Whether a single transparent re-login may repair this failure.
    pub fn can_autocorrect(&self) -> bool {
        matches!(
            self,
            Error::AuthenticationFailed {
                can_autocorrect: true,
                ..
            }
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Error::unavailable(err.to_string())
        } else {
            Error::unexpected(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::unexpected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn must_report_autocorrectable_failures() {
        assert!(Error::auth("logged out", true).can_autocorrect());
        assert!(!Error::auth("two-factor required", false).can_autocorrect());
        assert!(!Error::SessionExpired.can_autocorrect());
    }
}
