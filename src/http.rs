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
//! HTTP session: connection pool, cookie jar, base headers, retries, and the
//! credential half of the login flow.

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use rand::Rng;
use reqwest::{cookie::CookieStore, cookie::Jar, Client, Method, RequestBuilder, Response, Url};
use scraper::{Html, Selector};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    jsonapi::{ApiError, Document, MiniEnvelope, SuccessDocument},
};

pub(crate) const URL_BASE: &str = "https://www.alarm.com/";
const LOGIN_PATH: &str = "login";
const LOGIN_POST_PATH: &str = "web/Default.aspx";
const API_PATH: &str = "web/api/";
pub(crate) const KEEP_ALIVE_DEFAULT_PATH: &str = "web/KeepAlive.aspx";

const AJAX_KEY_HEADER: &str = "ajaxrequestuniquekey";
const AFG_COOKIE: &str = "afg";
pub(crate) const MFA_COOKIE: &str = "twoFactorAuthenticationId";
const JSON_API_MIME: &str = "application/vnd.api+json";

const VIEWSTATE_FIELD: &str = "__VIEWSTATE";
const VIEWSTATEGENERATOR_FIELD: &str = "__VIEWSTATEGENERATOR";
const EVENTVALIDATION_FIELD: &str = "__EVENTVALIDATION";
const PREVIOUSPAGE_FIELD: &str = "__PREVIOUSPAGE";
const USERNAME_FIELD: &str = "ctl00$ContentPlaceHolder1$loginform$txtUserName";
const PASSWORD_FIELD: &str = "txtPassword";

const REQUEST_RETRY_LIMIT: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body format expected from (and advertised to) the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accept {
    JsonApi,
    Html,
    Form,
}

#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// All provider I/O goes through this session.
///
/// Holds the reqwest connection pool, a shared cookie jar (session cookies,
/// the `afg` anti-forgery cookie, the two-factor device-trust cookie), and
/// the anti-forgery header value extracted during login. On an
/// autocorrectable authentication failure the session re-runs the credential
/// login once and retries the request.
#[derive(Clone)]
pub struct HttpSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    client: Client,
    jar: Arc<Jar>,
    base: Url,
    credentials: Credentials,
    ajax_key: RwLock<Option<String>>,
}

impl HttpSession {
    pub fn new(base: Url, credentials: Credentials, mfa_cookie: Option<String>) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        if let Some(mfa) = mfa_cookie.as_deref().filter(|value| !value.is_empty()) {
            jar.add_cookie_str(&format!("{}={}; Path=/", MFA_COOKIE, mfa), &base);
        }

        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("alarmdotcom_sdk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| Error::unavailable(format!("building HTTP client: {}", err)))?;

        Ok(Self {
            inner: Arc::new(SessionInner {
                client,
                jar,
                base,
                credentials,
                ajax_key: RwLock::new(None),
            }),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    /// Joins a path under `web/api/`. Only called with paths we construct
    /// ourselves.
    pub fn api_url(&self, path: &str) -> Url {
        self.inner
            .base
            .join(API_PATH)
            .and_then(|api| api.join(path))
            .expect("api paths are statically valid")
    }

    pub fn ajax_key(&self) -> Option<String> {
        self.inner.ajax_key.read().unwrap().clone()
    }

    /// The named cookie's current value, read back from the jar.
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        let header = self.inner.jar.cookies(&self.inner.base)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_owned())
        })
    }

    pub fn mfa_cookie(&self) -> Option<String> {
        self.cookie_value(MFA_COOKIE)
    }

    /// GET a JSON:API document.
    pub async fn get(&self, url: Url) -> Result<SuccessDocument> {
        self.request_document(Method::GET, url, None, true).await
    }

    /// POST a JSON body and parse the JSON:API response.
    pub async fn post(&self, url: Url, body: Value) -> Result<SuccessDocument> {
        self.request_document(Method::POST, url, Some(body), true).await
    }

    /// POST against a mini-envelope endpoint.
    pub async fn post_mini(&self, url: Url, body: Option<Value>) -> Result<MiniEnvelope> {
        let text = self
            .request_text(Method::POST, url, Accept::JsonApi, body, true)
            .await?;
        let envelope = MiniEnvelope::parse(&text)?;
        if envelope.is_failure() {
            return Err(classify_errors(&envelope.errors));
        }
        Ok(envelope)
    }

    /// GET against a mini-envelope endpoint.
    pub async fn get_mini(&self, url: Url) -> Result<MiniEnvelope> {
        let text = self
            .request_text(Method::GET, url, Accept::JsonApi, None, true)
            .await?;
        let envelope = MiniEnvelope::parse(&text)?;
        if envelope.is_failure() {
            return Err(classify_errors(&envelope.errors));
        }
        Ok(envelope)
    }

    /// POST a JSON body where only the HTTP status matters (the context
    /// reload endpoint answers with an uninteresting body).
    pub async fn post_raw(&self, url: Url, body: Value) -> Result<()> {
        let response = self
            .send_with_retries(
                |client| client.post(url.clone()).json(&body),
                Accept::JsonApi,
                true,
            )
            .await?;
        response
            .error_for_status()
            .map_err(|err| Error::unexpected(format!("context reload failed: {}", err)))?;
        Ok(())
    }

    /// Plain GET with `raise_for_status` semantics; returns the final URL.
    /// Used by the keep-alive task, which only cares whether the session was
    /// bounced back to the login page.
    pub async fn get_html(&self, url: Url) -> Result<Url> {
        let response = self
            .send_with_retries(|client| client.get(url.clone()), Accept::Html, false)
            .await?;
        let response = response
            .error_for_status()
            .map_err(|err| Error::unavailable(err.to_string()))?;
        Ok(response.url().clone())
    }

    async fn request_document(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        allow_login_repair: bool,
    ) -> Result<SuccessDocument> {
        let text = self
            .request_text(method.clone(), url.clone(), Accept::JsonApi, body.clone(), true)
            .await?;

        match Document::parse(&text)? {
            Document::Success(success) => Ok(success),
            Document::Meta(_) => Err(Error::unexpected("unhandled JSON:API meta document")),
            Document::Failure(failure) => {
                let err = classify_errors(&failure.errors);
                if err.can_autocorrect() && allow_login_repair {
                    tracing::info!("attempting to repair session after {}", err);
                    if self.login_credentials().await.is_err() {
                        return Err(err);
                    }
                    // The retry runs with repair disabled; if it fails again
                    // the original error is surfaced.
                    return match Box::pin(self.request_document(method, url, body, false)).await {
                        Ok(success) => Ok(success),
                        Err(_) => Err(err),
                    };
                }
                Err(err)
            }
        }
    }

    /// Sends a request and returns the response body. For JSON:API accepts
    /// the body is returned regardless of HTTP status (errors live in the
    /// document); for HTML/form accepts a non-success status is an error.
    async fn request_text(
        &self,
        method: Method,
        url: Url,
        accept: Accept,
        body: Option<Value>,
        use_ajax_key: bool,
    ) -> Result<String> {
        let response = self
            .send_with_retries(
                |client| {
                    let mut builder = client.request(method.clone(), url.clone());
                    if let Some(body) = &body {
                        builder = builder.json(body);
                    }
                    builder
                },
                accept,
                use_ajax_key,
            )
            .await?;

        if accept != Accept::JsonApi {
            let response = response
                .error_for_status()
                .map_err(|err| Error::unavailable(err.to_string()))?;
            return Ok(response.text().await?);
        }

        Ok(response.text().await?)
    }

    /// Performs a request with exponential backoff on connection/timeout
    /// failures. Body-level errors are never retried here.
    async fn send_with_retries(
        &self,
        build: impl Fn(&Client) -> RequestBuilder,
        accept: Accept,
        use_ajax_key: bool,
    ) -> Result<Response> {
        let mut retries = 0;
        let mut delay = Duration::from_secs(0);
        loop {
            let builder = self.decorate(build(&self.inner.client), accept, use_ajax_key);
            match builder.send().await {
                Ok(response) => return Ok(response),
                Err(err) if (err.is_timeout() || err.is_connect()) && retries < REQUEST_RETRY_LIMIT => {
                    retries += 1;
                    delay = delay * 2 + Duration::from_millis(rand::thread_rng().gen_range(10..200));
                    tracing::debug!(
                        "connection error ({}), retry {} of {} in {:?}",
                        err,
                        retries,
                        REQUEST_RETRY_LIMIT,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_timeout() || err.is_connect() => {
                    return Err(Error::unavailable(err.to_string()));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn decorate(&self, builder: RequestBuilder, accept: Accept, use_ajax_key: bool) -> RequestBuilder {
        // The web app sends a "Referrer" header (sic); the provider checks it.
        let mut builder = builder.header("Referrer", format!("{}web/system/home", URL_BASE));
        if use_ajax_key {
            if let Some(key) = self.ajax_key() {
                builder = builder.header(AJAX_KEY_HEADER, key);
            }
        }
        if accept == Accept::JsonApi {
            builder = builder.header(reqwest::header::ACCEPT, JSON_API_MIME);
        }
        builder
    }

    //
    // Credential login (steps 1 and 2 of the login flow). OTP discovery
    // lives in the auth controller; this half is what session repair re-runs.
    //

    /// Loads the login page, extracts the hidden form fields, submits
    /// credentials, and captures the anti-forgery cookie.
    pub async fn login_credentials(&self) -> Result<()> {
        *self.inner.ajax_key.write().unwrap() = None;

        let fields = self.login_preload().await?;
        self.login_submit(fields).await
    }

    async fn login_preload(&self) -> Result<LoginFormFields> {
        let url = self
            .inner
            .base
            .join(LOGIN_PATH)
            .expect("login path is statically valid");

        let mut retries = 0;
        loop {
            let response = self
                .send_with_retries(|client| client.get(url.clone()), Accept::Html, false)
                .await?;

            match response.error_for_status() {
                Ok(response) => {
                    let text = response.text().await?;
                    return extract_login_fields(&text);
                }
                Err(err) if retries < REQUEST_RETRY_LIMIT => {
                    tracing::debug!("login page fetch failed ({}), retrying", err);
                    retries += 1;
                }
                Err(err) => return Err(Error::unavailable(err.to_string())),
            }
        }
    }

    async fn login_submit(&self, fields: LoginFormFields) -> Result<()> {
        let url = self
            .inner
            .base
            .join(LOGIN_POST_PATH)
            .expect("login post path is statically valid");

        let form = [
            (USERNAME_FIELD, self.inner.credentials.username.as_str()),
            (PASSWORD_FIELD, self.inner.credentials.password.as_str()),
            (VIEWSTATE_FIELD, fields.viewstate.as_str()),
            (VIEWSTATEGENERATOR_FIELD, fields.viewstate_generator.as_str()),
            (EVENTVALIDATION_FIELD, fields.event_validation.as_str()),
            (PREVIOUSPAGE_FIELD, fields.previous_page.as_str()),
            ("__EVENTTARGET", ""),
            ("__EVENTARGUMENT", ""),
            ("__VIEWSTATEENCRYPTED", ""),
            ("IsFromNewSite", "1"),
        ];

        let response = self
            .send_with_retries(
                |client| client.post(url.clone()).form(&form),
                Accept::Form,
                false,
            )
            .await?;
        let response = response
            .error_for_status()
            .map_err(|err| Error::auth(err.to_string(), false))?;

        let final_url = response.url().as_str();
        if final_url.contains("m=login_fail") {
            return Err(Error::auth("invalid username or password", false));
        }
        if final_url.contains("m=LockedOut") {
            return Err(Error::auth("account is locked", false));
        }

        // The afg cookie is not returned by every provider tenant; its
        // absence is not a failure.
        let afg = response
            .cookies()
            .find(|cookie| cookie.name() == AFG_COOKIE)
            .map(|cookie| cookie.value().to_owned());
        if afg.is_none() {
            tracing::debug!("no anti-forgery cookie in login response");
        }
        *self.inner.ajax_key.write().unwrap() = afg;

        Ok(())
    }
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("base", &self.inner.base.as_str())
            .field("username", &self.inner.credentials.username)
            .finish()
    }
}

struct LoginFormFields {
    viewstate: String,
    viewstate_generator: String,
    event_validation: String,
    previous_page: String,
}

/// Pulls the four hidden ASP.NET form fields out of the login page.
fn extract_login_fields(html: &str) -> Result<LoginFormFields> {
    let document = Html::parse_document(html);
    let field = |id: &str| -> Result<String> {
        let selector = Selector::parse(&format!(r#"input[id="{}"]"#, id))
            .map_err(|_| Error::unexpected("invalid login field selector"))?;
        document
            .select(&selector)
            .next()
            .and_then(|input| input.value().attr("value"))
            .map(str::to_owned)
            .ok_or_else(|| Error::unexpected(format!("login page is missing {}", id)))
    };

    Ok(LoginFormFields {
        viewstate: field(VIEWSTATE_FIELD)?,
        viewstate_generator: field(VIEWSTATEGENERATOR_FIELD)?,
        event_validation: field(EVENTVALIDATION_FIELD)?,
        previous_page: field(PREVIOUSPAGE_FIELD)?,
    })
}

/// Maps body-level JSON:API error codes onto the crate error taxonomy.
pub(crate) fn classify_errors(errors: &[ApiError]) -> Error {
    let codes: Vec<u16> = errors.iter().filter_map(ApiError::code_u16).collect();

    // 403 + 426 together signal a plan/permission processing error.
    if codes.contains(&403) && codes.contains(&426) {
        return Error::NotAuthorized {
            message: format!("processing error (codes {:?})", codes),
        };
    }
    // 401 + 403: logged out or stale anti-forgery key; a re-login fixes it.
    if codes.contains(&401) && codes.contains(&403) {
        return Error::auth(format!("session rejected (codes {:?})", codes), true);
    }
    if codes.contains(&409) {
        return Error::auth("two-factor authentication required", false);
    }
    Error::unexpected(format!("provider returned errors (codes {:?})", codes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16) -> ApiError {
        ApiError {
            code: Some(code.to_string()),
            ..ApiError::default()
        }
    }

    #[test]
    fn must_map_error_codes_per_taxonomy() {
        assert!(matches!(
            classify_errors(&[api_error(403), api_error(426)]),
            Error::NotAuthorized { .. }
        ));
        assert!(classify_errors(&[api_error(401), api_error(403)]).can_autocorrect());
        assert!(matches!(
            classify_errors(&[api_error(409)]),
            Error::AuthenticationFailed {
                can_autocorrect: false,
                ..
            }
        ));
        assert!(matches!(
            classify_errors(&[api_error(422)]),
            Error::UnexpectedResponse { .. }
        ));
    }

    #[test]
    fn must_extract_hidden_login_fields() {
        let html = r#"
            <html><body><form>
                <input type="hidden" id="__VIEWSTATE" value="vs" />
                <input type="hidden" id="__VIEWSTATEGENERATOR" value="vsg" />
                <input type="hidden" id="__EVENTVALIDATION" value="ev" />
                <input type="hidden" id="__PREVIOUSPAGE" value="pp" />
            </form></body></html>
        "#;
        let fields = extract_login_fields(html).unwrap();
        assert_eq!(fields.viewstate, "vs");
        assert_eq!(fields.viewstate_generator, "vsg");
        assert_eq!(fields.event_validation, "ev");
        assert_eq!(fields.previous_page, "pp");
    }

    #[test]
    fn must_reject_login_page_without_fields() {
        assert!(matches!(
            extract_login_fields("<html><body>maintenance</body></html>"),
            Err(Error::UnexpectedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn must_parse_document_regardless_of_http_status() {
        let _mock = mockito::mock("GET", "/web/api/devices/lights")
            .with_status(403)
            .with_body(r#"{"errors": [{"code": 403}, {"code": 426}]}"#)
            .create();

        let base: Url = mockito::server_url().parse().unwrap();
        let session = HttpSession::new(
            base,
            Credentials {
                username: "user".into(),
                password: "pass".into(),
            },
            None,
        )
        .unwrap();

        let err = session
            .get(session.api_url("devices/lights"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotAuthorized { .. }));
    }

    #[tokio::test]
    async fn must_return_success_documents() {
        let _mock = mockito::mock("GET", "/web/api/devices/locks")
            .with_status(200)
            .with_body(r#"{"data": [{"id": "1-9", "type": "devices/lock", "attributes": {}}]}"#)
            .create();

        let base: Url = mockito::server_url().parse().unwrap();
        let session = HttpSession::new(
            base,
            Credentials {
                username: "user".into(),
                password: "pass".into(),
            },
            None,
        )
        .unwrap();

        let doc = session.get(session.api_url("devices/locks")).await.unwrap();
        assert_eq!(doc.data.as_slice()[0].id, "1-9");
    }
}
