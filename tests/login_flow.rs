//! End-to-end login flow against a mocked provider: HTML preload,
//! credential submission, identity discovery, and the OTP sub-protocol.

use std::sync::{Arc, Mutex};

use alarmdotcom_sdk::{
    controllers::DeviceContext, AuthController, Credentials, Error, EventBroker, HttpSession,
    LoginOutcome, OtpType, Url,
};

// The mock server is shared by every test in this binary; tests that mock
// the same paths must not overlap.
static LOGIN_MOCKS: Mutex<()> = Mutex::new(());

const LOGIN_PAGE: &str = r#"
<html><body><form id="loginform">
    <input type="hidden" id="__VIEWSTATE" value="dDwtMTIzNDU2Nzg5" />
    <input type="hidden" id="__VIEWSTATEGENERATOR" value="CA0B0334" />
    <input type="hidden" id="__EVENTVALIDATION" value="dDwtOTg3NjU0MzIx" />
    <input type="hidden" id="__PREVIOUSPAGE" value="prevPageToken" />
</form></body></html>
"#;

fn session() -> HttpSession {
    let base: Url = mockito::server_url().parse().unwrap();
    HttpSession::new(
        base,
        Credentials {
            username: "user@example.com".into(),
            password: "hunter2".into(),
        },
        None,
    )
    .unwrap()
}

fn auth_controller(session: &HttpSession) -> AuthController {
    AuthController::new(
        session.clone(),
        EventBroker::new(),
        Arc::new(DeviceContext::default()),
    )
}

#[tokio::test]
async fn login_discovers_otp_requirements_and_submits_code() {
    let _serial = LOGIN_MOCKS.lock().unwrap_or_else(|poison| poison.into_inner());
    let _login = mockito::mock("GET", "/login").with_body(LOGIN_PAGE).create();
    let _submit = mockito::mock("POST", "/web/Default.aspx")
        .with_header("set-cookie", "afg=forgery-key; Path=/")
        .with_body("<html></html>")
        .create();
    let _identities = mockito::mock("GET", "/web/api/identities")
        .with_body(
            r#"{
                "data": [{
                    "id": 12345,
                    "type": "identity",
                    "attributes": {
                        "timezone": "America/New_York",
                        "preferredTimezone": "America/New_York",
                        "applicationSessionProperties": {
                            "shouldTimeout": true,
                            "keepAliveUrl": "/web/KeepAlive.aspx",
                            "enableKeepAlive": true,
                            "logoutTimeoutMs": 900000,
                            "inactivityWarningTimeoutMs": 780000
                        },
                        "localizeTempUnitsToCelsius": true,
                        "hasTroubleConditionsService": false
                    },
                    "relationships": {
                        "dealer": {"data": {"id": "9001", "type": "dealer/dealer"}}
                    }
                }],
                "included": [{
                    "id": "77",
                    "type": "profile/profile",
                    "attributes": {"loginEmailAddress": "user@example.com"}
                }]
            }"#,
        )
        .create();
    let _dealer = mockito::mock("GET", "/web/api/dealers/dealers/9001")
        .with_body(
            r#"{"data": {"id": "9001", "type": "dealer/dealer", "attributes": {"name": "Example Security"}}}"#,
        )
        .create();
    let _two_factor = mockito::mock(
        "GET",
        "/web/api/engines/twoFactorAuthentication/twoFactorAuthentications/12345",
    )
    .with_body(
        r#"{
            "data": {
                "id": 12345,
                "type": "twoFactorAuthentication/twoFactorAuthentication",
                "attributes": {
                    "showSuggestedSetup": false,
                    "enabledTwoFactorTypes": 3,
                    "isCurrentDeviceTrusted": false,
                    "email": "user@example.com"
                }
            }
        }"#,
    )
    .create();

    let session = session();
    let auth = auth_controller(&session);

    // app (1) | sms (2) enabled, device not trusted: the OTP gate applies.
    let outcome = auth.login().await.unwrap();
    match outcome {
        LoginOutcome::OtpRequired {
            methods,
            destination,
        } => {
            assert_eq!(methods, vec![OtpType::App, OtpType::Sms]);
            assert_eq!(destination.email.as_deref(), Some("user@example.com"));
        }
        other => panic!("expected OTP gate, got {:?}", other),
    }

    assert_eq!(session.ajax_key().as_deref(), Some("forgery-key"));
    assert_eq!(auth.user_email().as_deref(), Some("user@example.com"));
    assert_eq!(auth.dealer(), "Example Security");
    assert!(auth.use_celsius());
    assert_eq!(auth.session_refresh_interval_ms(), 780_000);
    assert_eq!(auth.profile_id().as_deref(), Some("77"));

    // Verify the code and trust this device; the two-factor cookie must be
    // captured for reuse.
    let _verify = mockito::mock(
        "POST",
        "/web/api/engines/twoFactorAuthentication/twoFactorAuthentications/12345/verifyTwoFactorCode",
    )
    .with_body(r#"{"value": null, "errors": [], "meta": {}}"#)
    .create();
    let _trust = mockito::mock(
        "POST",
        "/web/api/engines/twoFactorAuthentication/twoFactorAuthentications/12345/trustTwoFactorDevice",
    )
    .with_header(
        "set-cookie",
        "twoFactorAuthenticationId=trusted-device-token; Path=/",
    )
    .with_body("{}")
    .create();

    let cookie = auth
        .submit_otp("123456", OtpType::App, Some("laptop"))
        .await
        .unwrap();
    assert_eq!(cookie.as_deref(), Some("trusted-device-token"));
    assert_eq!(session.mfa_cookie().as_deref(), Some("trusted-device-token"));
}

#[tokio::test]
async fn login_fails_on_rejected_credentials() {
    let _serial = LOGIN_MOCKS.lock().unwrap_or_else(|poison| poison.into_inner());
    let _login = mockito::mock("GET", "/login").with_body(LOGIN_PAGE).create();
    let _submit = mockito::mock("POST", "/web/Default.aspx")
        .with_status(302)
        .with_header("location", "/failed?m=login_fail")
        .create();
    let _failed = mockito::mock("GET", "/failed")
        .match_query(mockito::Matcher::Any)
        .with_body("<html></html>")
        .create();

    let session = session();
    let auth = auth_controller(&session);

    let err = auth.login().await.unwrap_err();
    assert!(matches!(
        err,
        Error::AuthenticationFailed {
            can_autocorrect: false,
            ..
        }
    ));
}

#[tokio::test]
async fn mini_envelope_failures_surface_as_errors() {
    let _token = mockito::mock("GET", "/web/api/websockets/token")
        .with_body(r#"{"value": "tok", "errors": [{"code": 409}], "meta": {}}"#)
        .create();

    let session = session();
    let err = session
        .get_mini(session.api_url("websockets/token"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailed { .. }));
}
