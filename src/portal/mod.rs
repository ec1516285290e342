//! Attendance portal client.
//!
//! [`PortalClient`] drives the portal's browser login flow and the clock
//! action on top of a [`SessionStore`]. The store is installed as the HTTP
//! client's cookie provider, so every response updates it and every request
//! carries it. Whether a call logs in first is decided solely by the store's
//! validity.

mod context;
mod error;

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{APP_KEY, ClientConfig, Credentials, PortalEndpoints};
use crate::extract::{self, ExtractError};
use crate::session::SessionStore;
use crate::user_agent::browser_headers;

pub use context::CallContext;
pub use error::{PortalError, Step};

/// Result of a completed login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Status shown on the page the login landed on.
    pub status: String,
    /// Toggle token from that page; empty when the page had none.
    pub token: String,
}

/// Status before and after a clock action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Status before the toggle.
    pub previous: String,
    /// Status reported by the toggle endpoint.
    pub current: String,
}

/// Session-persistent client for one portal account.
///
/// Obtain with [`PortalClient::new`], run any number of operations, then call
/// [`PortalClient::close`] to persist the session.
#[derive(Debug)]
pub struct PortalClient {
    credentials: Credentials,
    endpoints: PortalEndpoints,
    adit_group_id: String,
    http: Client,
    session: Arc<SessionStore>,
}

impl PortalClient {
    /// Validates `config`, restores the session file, and builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Config`] for invalid configuration,
    /// [`PortalError::Persistence`] if the session file cannot be read, or
    /// [`PortalError::ClientBuild`] if the HTTP client cannot be constructed.
    #[instrument(level = "debug", skip(config), fields(session_file = %config.session_path.display()))]
    pub fn new(config: ClientConfig) -> Result<Self, PortalError> {
        config.validate()?;
        let session = Arc::new(SessionStore::load(&config.session_path)?);

        let headers = browser_headers(&config.endpoints.origin, &config.endpoints.referer)
            .map_err(|e| PortalError::ClientBuild(format!("invalid browser header: {e}")))?;
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .default_headers(headers)
            .cookie_provider(Arc::clone(&session))
            .build()
            .map_err(|e| PortalError::ClientBuild(e.to_string()))?;

        debug!(
            cookies = session.len(),
            valid = session.is_valid(),
            "portal client ready"
        );
        Ok(Self {
            credentials: config.credentials,
            endpoints: config.endpoints,
            adit_group_id: config.adit_group_id,
            http,
            session,
        })
    }

    /// The session store backing this client.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Returns true if the stored session can be used without logging in.
    #[must_use]
    pub fn is_logined(&self) -> bool {
        self.session.is_valid()
    }

    /// Discards the stored session; the next operation logs in again.
    pub fn reset(&mut self) {
        self.session.clear();
        info!("session reset");
    }

    /// Performs the full login flow.
    ///
    /// Returns the status and toggle token found on the page the sign-in
    /// landed on. A missing toggle token is tolerated and reported as empty.
    ///
    /// # Errors
    ///
    /// Any failed request, non-200 response, missing anti-forgery token, or
    /// missing status aborts the login.
    #[instrument(skip(self, ctx), fields(username = %self.credentials.username()))]
    pub async fn login(&mut self, ctx: &CallContext) -> Result<LoginOutcome, PortalError> {
        let login_page = self.endpoints.login_page.clone();
        let page = self
            .fetch(ctx, Step::LoginPage, self.http.get(login_page.clone()), &login_page)
            .await?;
        let csrf_token =
            extract::extract_csrf_token(&page).map_err(|e| PortalError::parse(Step::LoginPage, e))?;
        debug!("found anti-forgery token on login page");

        let sign_in = self.endpoints.sign_in.clone();
        let form = [
            ("authenticity_token", csrf_token.as_str()),
            ("user[email]", self.credentials.username()),
            ("user[client_code]", ""),
            ("user[password]", self.credentials.password()),
            ("app_key", APP_KEY),
            ("commit", "Login"),
        ];
        let landing = self
            .fetch(ctx, Step::SignIn, self.http.post(sign_in.clone()).form(&form), &sign_in)
            .await?;

        let token = extract::extract_toggle_token(&landing).unwrap_or_else(|| {
            warn!("sign-in response has no toggle token; continuing with an empty token");
            String::new()
        });
        let status =
            extract::extract_status(&landing).map_err(|e| PortalError::parse(Step::SignIn, e))?;

        info!(status = %status, cookies = self.session.len(), "logged in");
        Ok(LoginOutcome { status, token })
    }

    /// Returns the current status, logging in first if the session is not valid.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] if the login or the status page request fails,
    /// or the page carries no single status assignment.
    #[instrument(skip(self, ctx))]
    pub async fn get_status(&mut self, ctx: &CallContext) -> Result<String, PortalError> {
        if !self.is_logined() {
            debug!("session not valid; logging in");
            return Ok(self.login(ctx).await?.status);
        }
        let page = self.status_page(ctx).await?;
        extract::extract_status(&page).map_err(|e| PortalError::parse(Step::StatusPage, e))
    }

    /// Toggles between clocked in and clocked out.
    ///
    /// Without a valid session this logs in once and uses the login page's
    /// status and token. Otherwise the status page supplies both, and its
    /// token is required.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] if any step fails; nothing is retried.
    #[instrument(skip(self, ctx), fields(adit_group_id = %self.adit_group_id))]
    pub async fn toggle(&mut self, ctx: &CallContext) -> Result<ToggleOutcome, PortalError> {
        let (previous, token) = if self.is_logined() {
            let page = self.status_page(ctx).await?;
            let status = extract::extract_status(&page)
                .map_err(|e| PortalError::parse(Step::StatusPage, e))?;
            let token = extract::extract_toggle_token(&page).ok_or_else(|| {
                PortalError::parse(Step::StatusPage, ExtractError::MissingField { field: "token" })
            })?;
            (status, token)
        } else {
            debug!("session not valid; logging in");
            let outcome = self.login(ctx).await?;
            (outcome.status, outcome.token)
        };

        let toggle = self.endpoints.toggle.clone();
        let form = [
            ("is_yakin", "0"),
            ("adit_item", "DEF"),
            ("notice", ""),
            ("token", token.as_str()),
            ("adit_group_id", self.adit_group_id.as_str()),
            ("_", ""),
        ];
        let body = self
            .fetch(ctx, Step::Toggle, self.http.post(toggle.clone()).form(&form), &toggle)
            .await?;
        let result =
            extract::parse_toggle_result(&body).map_err(|e| PortalError::parse(Step::Toggle, e))?;

        info!(
            previous = %previous,
            current = %result.current_status,
            result = ?result.result,
            state = ?result.state,
            "toggled status"
        );
        Ok(ToggleOutcome {
            previous,
            current: result.current_status,
        })
    }

    /// Persists the session and releases the client.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Persistence`] if the session file cannot be written.
    #[instrument(level = "debug", skip(self), fields(session_file = %self.session.path().display()))]
    pub fn close(self) -> Result<(), PortalError> {
        self.session.flush()?;
        debug!(cookies = self.session.len(), "session persisted");
        Ok(())
    }

    async fn status_page(&self, ctx: &CallContext) -> Result<String, PortalError> {
        let url = self.endpoints.status_page.clone();
        self.fetch(ctx, Step::StatusPage, self.http.get(url.clone()), &url)
            .await
    }

    /// Sends `request` within the context deadline and returns a 200 body.
    async fn fetch(
        &self,
        ctx: &CallContext,
        step: Step,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<String, PortalError> {
        ctx.bound(step, async {
            let response = request
                .send()
                .await
                .map_err(|e| PortalError::transport(step, url.as_str(), e))?;
            let status = response.status();
            debug!(step = %step, status = status.as_u16(), final_url = %response.url(), "response received");
            if status != StatusCode::OK {
                return Err(PortalError::http_status(step, url.as_str(), status.as_u16()));
            }
            response
                .text()
                .await
                .map_err(|e| PortalError::transport(step, url.as_str(), e))
        })
        .await
    }
}
