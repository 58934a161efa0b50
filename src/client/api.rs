use chrono::Utc;
use log::{debug, info, warn};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::ClientError;
use super::session::{Session, SessionStore};
use crate::api_router::API_PREFIX;
use crate::auth::{LoginRequest, RegisterRequest, RegisterResponse, TokenResponse};
use crate::core::store::{Entity, Pagination};
use crate::dashboards::{DashboardSummary, HrMetrics, RevenueTrend, StageRevenue};
use crate::directory::User;
use crate::people::{ActionResponse, LeaveRequest};

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

/// HTTP client holding the current session. Every call made while signed in
/// carries `Authorization: Bearer <token>`; any 401 on such a call ends the
/// session, including its persisted copy.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: RwLock<Option<Session>>,
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, store: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
            store,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn collection<E: Entity>() -> String {
        format!("/{}", E::PATH)
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    async fn start_session(&self, session: Session) -> Result<(), ClientError> {
        self.store.save(&session)?;
        *self.session.write().await = Some(session);
        Ok(())
    }

    async fn end_session(&self) {
        *self.session.write().await = None;
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear stored session: {}", e);
        }
    }

    /// Sends without credentials. A 401 here is a rejected login, not an
    /// expired session.
    async fn send_anonymous(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        self.check(response, false).await
    }

    async fn send_authorized(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.token.clone())
            .ok_or(ClientError::NotAuthenticated)?;

        let response = request.bearer_auth(token).send().await?;
        self.check(response, true).await
    }

    async fn check(&self, response: Response, authorized: bool) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = if body.message.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            body.message
        };
        debug!("API error {} ({}): {}", status, body.error, message);

        Err(match status {
            StatusCode::UNAUTHORIZED if authorized => {
                info!("Session rejected by the server, signing out");
                self.end_session().await;
                ClientError::SessionExpired
            }
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::BAD_REQUEST => ClientError::Validation(message),
            _ => ClientError::Api {
                status,
                code: body.error,
                message,
            },
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl Serialize + ?Sized)>,
    ) -> Result<T, ClientError> {
        let mut request = self.http.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(self.send_authorized(request).await?.json().await?)
    }

    /// On failure the current session, if any, is left untouched.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<User, ClientError> {
        let request = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest::new(identifier, password));
        let token: TokenResponse = self.send_anonymous(request).await?.json().await?;

        let session = Session::from_token(token, Utc::now());
        let user = session.user.clone();
        self.start_session(session).await?;
        info!("Signed in as {}", user.username);
        Ok(user)
    }

    pub async fn logout(&self) {
        self.end_session().await;
    }

    /// Creates the account; with `request.login` set the new account is
    /// signed in straight away.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ClientError> {
        let builder = self.http.post(self.url("/auth/register")).json(request);
        let response: RegisterResponse = self.send_anonymous(builder).await?.json().await?;

        if let (Some(access_token), Some(expires_in)) =
            (response.access_token.clone(), response.expires_in)
        {
            let token = TokenResponse {
                access_token,
                token_type: response.token_type.clone().unwrap_or_default(),
                expires_in,
                user: response.user.clone(),
            };
            self.start_session(Session::from_token(token, Utc::now())).await?;
        }
        Ok(response.user)
    }

    /// Picks up a persisted session and re-validates it against `/auth/me`.
    /// `Ok(None)` means there is nothing usable and the user must sign in.
    pub async fn restore(&self) -> Result<Option<User>, ClientError> {
        let Some(session) = self.store.load()? else {
            return Ok(None);
        };
        if session.is_expired(Utc::now()) {
            debug!("Stored session for {} has expired", session.user.username);
            self.end_session().await;
            return Ok(None);
        }

        *self.session.write().await = Some(session.clone());
        match self.me().await {
            Ok(user) => {
                self.start_session(Session {
                    user: user.clone(),
                    ..session
                })
                .await?;
                Ok(Some(user))
            }
            Err(ClientError::SessionExpired) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        self.call(Method::GET, "/auth/me", None::<&()>).await
    }

    /// Swaps the current token for a fresh one.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let token: TokenResponse = self.call(Method::POST, "/auth/refresh", None::<&()>).await?;
        self.start_session(Session::from_token(token, Utc::now())).await
    }

    pub async fn list<E: Entity>(
        &self,
        filter: &E::Filter,
        page: Pagination,
    ) -> Result<Vec<E>, ClientError> {
        let request = self
            .http
            .get(self.url(&Self::collection::<E>()))
            .query(filter)
            .query(&page);
        Ok(self.send_authorized(request).await?.json().await?)
    }

    pub async fn get<E: Entity>(&self, id: Uuid) -> Result<E, ClientError> {
        let path = format!("{}/{}", Self::collection::<E>(), id);
        self.call(Method::GET, &path, None::<&()>).await
    }

    pub async fn create<E: Entity>(&self, input: &E::Input) -> Result<E, ClientError> {
        self.call(Method::POST, &Self::collection::<E>(), Some(input))
            .await
    }

    pub async fn update<E: Entity>(&self, id: Uuid, input: &E::Input) -> Result<E, ClientError> {
        let path = format!("{}/{}", Self::collection::<E>(), id);
        self.call(Method::PUT, &path, Some(input)).await
    }

    pub async fn delete<E: Entity>(&self, id: Uuid) -> Result<(), ClientError> {
        let path = format!("{}/{}", Self::collection::<E>(), id);
        self.send_authorized(self.http.delete(self.url(&path)))
            .await?;
        Ok(())
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary, ClientError> {
        self.call(Method::GET, "/dashboard", None::<&()>).await
    }

    pub async fn revenue_by_stage(&self) -> Result<Vec<StageRevenue>, ClientError> {
        self.call(Method::GET, "/deals/revenue/by-stage", None::<&()>)
            .await
    }

    pub async fn revenue_trends(&self, year: i32) -> Result<Vec<RevenueTrend>, ClientError> {
        let path = format!("/analytics/revenue/trends?year={year}");
        self.call(Method::GET, &path, None::<&()>).await
    }

    pub async fn hr_metrics(&self) -> Result<HrMetrics, ClientError> {
        self.call(Method::GET, "/analytics/hr/metrics", None::<&()>)
            .await
    }

    pub async fn approve_leave_request(&self, id: Uuid) -> Result<ActionResponse, ClientError> {
        let path = format!("/{}/{}/approve", LeaveRequest::PATH, id);
        self.call(Method::PUT, &path, None::<&()>).await
    }
}
