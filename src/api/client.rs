//! API client for the FareCard service.
//!
//! Every outbound call goes through `dispatch`: the current access token is
//! attached as a bearer credential, a first 401 triggers one coordinated
//! refresh followed by a single replay, and 403s are interpreted by
//! endpoint class - fatal on the authentication surface, an ordinary
//! application error everywhere else.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::auth::refresh::{RefreshCoordinator, TokenPairResponse};
use crate::auth::session::SessionManager;
use crate::config::Config;

use super::transport::{
    ApiRequest, EndpointClass, HttpTransport, RawResponse, Transport,
};
use super::{ApiError, ErrorBody};

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: Arc<SessionManager>,
    refresher: RefreshCoordinator,
    auth_base_url: String,
    api_base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config, session: Arc<SessionManager>) -> anyhow::Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
        Ok(Self::with_transport(
            transport,
            session,
            config.auth_base_url(),
            config.api_base_url(),
        ))
    }

    pub(crate) fn with_transport(
        transport: Arc<dyn Transport>,
        session: Arc<SessionManager>,
        auth_base_url: String,
        api_base_url: String,
    ) -> Self {
        let refresher = RefreshCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(session.store()),
            auth_base_url.clone(),
        );
        Self {
            transport,
            session,
            refresher,
            auth_base_url,
            api_base_url,
        }
    }

    // ===== Dispatch =====

    pub(crate) async fn dispatch(&self, req: &ApiRequest) -> Result<RawResponse, ApiError> {
        let token = self.session.access_token();
        let response = self.transport.execute(req, token.as_deref()).await?;
        match response.status {
            200..=299 => Ok(response),
            401 => self.recover_unauthorized(req, token.as_deref()).await,
            403 => self.handle_forbidden(req, response),
            _ => Err(ApiError::from_status(response.status, &response.body)),
        }
    }

    /// First 401 for this request: one coordinated refresh, one replay.
    async fn recover_unauthorized(
        &self,
        req: &ApiRequest,
        stale: Option<&str>,
    ) -> Result<RawResponse, ApiError> {
        debug!(url = %req.url, "Request was rejected, attempting token refresh");
        let fresh = match self.refresher.fresh_token(stale).await {
            Ok(token) => token,
            Err(e) => {
                warn!("Session could not be renewed, logging out");
                self.session.logout();
                return Err(e);
            }
        };

        let response = self.transport.execute(req, Some(&fresh)).await?;
        match response.status {
            200..=299 => Ok(response),
            // Already replayed once; do not recurse into another refresh
            401 => Err(ApiError::Unauthorized),
            403 => self.handle_forbidden(req, response),
            _ => Err(ApiError::from_status(response.status, &response.body)),
        }
    }

    fn handle_forbidden(
        &self,
        req: &ApiRequest,
        response: RawResponse,
    ) -> Result<RawResponse, ApiError> {
        match req.class {
            EndpointClass::Auth => {
                warn!(url = %req.url, "Authentication surface denied access, ending session");
                self.session.logout();
                Err(ApiError::SessionExpired)
            }
            // A 403 on a business endpoint means "not allowed to do this",
            // not "your session is invalid" - the session stays.
            EndpointClass::Resource => {
                Err(ApiError::from_status(response.status, &response.body))
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        let req = ApiRequest::get(url);
        let response = self.dispatch(&req).await?;
        Self::parse(&response)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: String,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        let req = ApiRequest::post(url, body);
        let response = self.dispatch(&req).await?;
        Self::parse(&response)
    }

    fn parse<T: DeserializeOwned>(response: &RawResponse) -> Result<T, ApiError> {
        serde_json::from_str(&response.body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    // ===== Authentication =====

    /// Log in and cache the verified profile. Bypasses `dispatch`: a 401
    /// here means bad credentials, not a stale token, and must not trigger
    /// a refresh.
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<crate::models::Profile, ApiError> {
        let req = ApiRequest::post(
            format!("{}/auth/login", self.auth_base_url),
            serde_json::json!({ "identifier": identifier, "secret": secret }),
        );
        let response = self.transport.execute(&req, None).await?;

        if response.status == 403 {
            // Forbidden on the auth surface is terminal even here
            warn!("Login endpoint denied access, ending session");
            self.session.logout();
            return Err(ApiError::SessionExpired);
        }
        if !response.is_success() {
            return Err(match ErrorBody::parse(&response.body) {
                Some(body) if matches!(response.status, 400 | 401) => {
                    debug!(kind = ?body.exception_kind, "Login rejected");
                    ApiError::InvalidCredentials(body.message)
                }
                _ => ApiError::from_status(response.status, &response.body),
            });
        }

        let pair: TokenPairResponse = Self::parse(&response)?;
        self.session
            .store()
            .set_token_pair(&pair.access_token, &pair.refresh_token)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        info!("Logged in");

        // The verification fetch doubles as the cached profile snapshot
        self.profile().await
    }

    // ===== Account =====

    pub async fn profile(&self) -> Result<crate::models::Profile, ApiError> {
        let profile: crate::models::Profile = self
            .get_json(format!("{}/account/profile", self.api_base_url))
            .await?;
        if let Err(e) = self.session.store().put_profile(&profile) {
            warn!(error = %e, "Failed to cache profile snapshot");
        }
        Ok(profile)
    }

    pub async fn update_settings(
        &self,
        settings: &crate::models::Settings,
    ) -> Result<crate::models::Profile, ApiError> {
        let req = ApiRequest::put(
            format!("{}/account/settings", self.api_base_url),
            serde_json::to_value(settings)
                .map_err(|e| ApiError::InvalidResponse(e.to_string()))?,
        );
        let response = self.dispatch(&req).await?;
        let profile: crate::models::Profile = Self::parse(&response)?;
        if let Err(e) = self.session.store().put_profile(&profile) {
            warn!(error = %e, "Failed to cache profile snapshot");
        }
        Ok(profile)
    }

    /// Delete the account. On success the server side is gone, so the
    /// client tears the session down itself.
    pub async fn delete_account(&self) -> Result<(), ApiError> {
        let req = ApiRequest::delete(format!("{}/account", self.api_base_url));
        self.dispatch(&req).await?;
        info!("Account deleted");
        self.session.logout();
        Ok(())
    }

    // ===== Wallet =====

    pub async fn cards(&self) -> Result<Vec<crate::models::CardSummary>, ApiError> {
        self.get_json(format!("{}/wallet", self.api_base_url)).await
    }

    /// Place a top-up order. `amount` is in minor currency units.
    pub async fn top_up(
        &self,
        card_number: &str,
        amount: i64,
    ) -> Result<crate::models::TopUpOrder, ApiError> {
        self.post_json(
            format!("{}/wallet/topup", self.api_base_url),
            serde_json::json!({ "cardNumber": card_number, "amount": amount }),
        )
        .await
    }

    // ===== News =====

    /// News feed page, read through the session cache.
    pub async fn news(&self, page: i32) -> Result<crate::models::NewsPage, ApiError> {
        if let Some(cached) = self.session.store().scratch().news_page(page) {
            if !cached.is_stale() {
                debug!(page, "Serving news page from session cache");
                return Ok(cached.data);
            }
        }
        let fetched: crate::models::NewsPage = self
            .get_json(format!("{}/news?page={}", self.api_base_url, page))
            .await?;
        self.session
            .store()
            .scratch()
            .put_news_page(page, fetched.clone());
        Ok(fetched)
    }

    // ===== Payment points =====

    pub async fn payment_points(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
    ) -> Result<Vec<crate::models::PaymentPoint>, ApiError> {
        self.get_json(format!(
            "{}/payment-points?lat={}&lon={}&radius={}",
            self.api_base_url, latitude, longitude, radius_m
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::testing::MockTransport;
    use crate::auth::session::testing::FakeNavigator;
    use crate::auth::session::Navigator;
    use crate::auth::store::{CredentialKind, CredentialStore, MemoryStore};

    const AUTH_BASE: &str = "https://auth.test";
    const API_BASE: &str = "https://api.test";

    const PAIR_BODY: &str = r#"{"accessToken":"acc-2","refreshToken":"ref-2"}"#;
    const PROFILE_BODY: &str =
        r#"{"id":7,"email":"rider@example.com","firstName":"Eva","lastName":null,"phoneNumber":null}"#;
    const CARDS_BODY: &str = r#"[{"cardNumber":"9417","cardAlias":null,"balance":{"amount":500,"currency":"EUR","updatedAt":null},"validUntil":null}]"#;

    struct Fixture {
        client: ApiClient,
        transport: Arc<MockTransport>,
        store: Arc<CredentialStore>,
        navigator: Arc<FakeNavigator>,
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(CredentialStore::new(Box::new(MemoryStore::new())));
        let navigator = Arc::new(FakeNavigator::default());
        let session = Arc::new(SessionManager::new(
            Arc::clone(&store),
            Arc::clone(&navigator) as Arc<dyn Navigator>,
        ));
        let client = ApiClient::with_transport(
            Arc::clone(&transport) as Arc<dyn Transport>,
            session,
            AUTH_BASE.to_string(),
            API_BASE.to_string(),
        );
        Fixture {
            client,
            transport,
            store,
            navigator,
        }
    }

    #[tokio::test]
    async fn rejected_request_is_replayed_once_with_the_new_token() {
        let f = fixture();
        f.store.set_token_pair("acc-1", "ref-1").expect("seed tokens");
        f.transport.push(401, "");
        f.transport.push(200, PAIR_BODY);
        f.transport.push(200, CARDS_BODY);

        let cards = f.client.cards().await.expect("replay should succeed");

        assert_eq!(cards.len(), 1);
        let calls = f.transport.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].bearer.as_deref(), Some("acc-1"));
        assert!(calls[1].url.contains("/auth/refresh"));
        // Identical request, new token
        assert_eq!(calls[2].url, calls[0].url);
        assert_eq!(calls[2].bearer.as_deref(), Some("acc-2"));
    }

    #[tokio::test]
    async fn second_rejection_propagates_without_recursion() {
        let f = fixture();
        f.store.set_token_pair("acc-1", "ref-1").expect("seed tokens");
        f.transport.push(401, "");
        f.transport.push(200, PAIR_BODY);
        f.transport.push(401, "");

        let result = f.client.cards().await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        // One refresh, one replay, nothing more
        assert_eq!(f.transport.calls_to("/auth/refresh"), 1);
        assert_eq!(f.transport.call_count(), 3);
    }

    #[tokio::test]
    async fn failed_refresh_is_terminal() {
        let f = fixture();
        f.store.set_token_pair("acc-1", "ref-1").expect("seed tokens");
        f.transport.push(401, "");
        f.transport.push(401, r#"{"message":"refresh token expired"}"#);

        let result = f.client.cards().await;

        assert!(matches!(result, Err(ApiError::SessionExpired)));
        assert!(f.store.get(CredentialKind::AccessToken).is_none());
        assert_eq!(f.navigator.navigation_count(), 1);
    }

    #[tokio::test]
    async fn expired_access_with_no_refresh_token_ends_the_session() {
        let f = fixture();
        // Access token present and unexpired, refresh token absent
        f.store
            .set(CredentialKind::AccessToken, "acc-1")
            .expect("seed access token");
        f.transport.push(401, "");

        let result = f.client.cards().await;

        assert!(matches!(result, Err(ApiError::SessionExpired)));
        assert!(f.store.get(CredentialKind::AccessToken).is_none());
        assert_eq!(f.navigator.navigation_count(), 1);
    }

    #[tokio::test]
    async fn forbidden_resource_preserves_the_session() {
        let f = fixture();
        f.store.set_token_pair("acc-1", "ref-1").expect("seed tokens");
        f.transport
            .push(403, r#"{"message":"Card belongs to another account"}"#);

        let result = f.client.top_up("9417", 1000).await;

        match result {
            Err(ApiError::AccessDenied(msg)) => {
                assert_eq!(msg, "Card belongs to another account")
            }
            other => panic!("expected AccessDenied, got {:?}", other),
        }
        assert_eq!(f.store.get(CredentialKind::AccessToken).as_deref(), Some("acc-1"));
        assert_eq!(f.navigator.navigation_count(), 0);
    }

    #[tokio::test]
    async fn forbidden_auth_surface_is_terminal() {
        let f = fixture();
        f.store.set_token_pair("acc-1", "ref-1").expect("seed tokens");
        f.transport.push(403, "");

        let req = ApiRequest::get(format!("{}/auth/sessions", AUTH_BASE));
        let result = f.client.dispatch(&req).await;

        assert!(matches!(result, Err(ApiError::SessionExpired)));
        assert!(f.store.get(CredentialKind::AccessToken).is_none());
        assert_eq!(f.navigator.navigation_count(), 1);
    }

    #[tokio::test]
    async fn transient_network_failure_never_logs_out() {
        let f = fixture();
        f.store.set_token_pair("acc-1", "ref-1").expect("seed tokens");
        f.transport
            .push_err(crate::api::transport::TransportError::Timeout);

        let result = f.client.cards().await;

        assert!(matches!(result, Err(ApiError::Network(_))));
        assert_eq!(f.store.get(CredentialKind::AccessToken).as_deref(), Some("acc-1"));
        assert_eq!(f.navigator.navigation_count(), 0);
    }

    #[tokio::test]
    async fn login_stores_the_pair_and_caches_the_profile() {
        let f = fixture();
        f.transport.push(200, PAIR_BODY);
        f.transport.push(200, PROFILE_BODY);

        let profile = f
            .client
            .login("rider@example.com", "hunter2")
            .await
            .expect("login should succeed");

        assert_eq!(profile.display_name(), "Eva");
        assert_eq!(f.store.get(CredentialKind::AccessToken).as_deref(), Some("acc-2"));
        assert_eq!(f.store.get(CredentialKind::RefreshToken).as_deref(), Some("ref-2"));
        assert!(f.store.profile().is_some());
        // Login is not bearer-decorated
        assert_eq!(f.transport.calls()[0].bearer, None);
    }

    #[tokio::test]
    async fn login_failure_surfaces_the_service_message() {
        let f = fixture();
        f.transport.push(
            401,
            r#"{"message":"Unknown identifier or wrong secret","exceptionKind":"BadCredentials"}"#,
        );

        let result = f.client.login("rider@example.com", "wrong").await;

        match result {
            Err(ApiError::InvalidCredentials(msg)) => {
                assert_eq!(msg, "Unknown identifier or wrong secret")
            }
            other => panic!("expected InvalidCredentials, got {:?}", other),
        }
        // No session state existed, nothing was created
        assert!(f.store.get(CredentialKind::AccessToken).is_none());
        assert_eq!(f.transport.calls_to("/auth/refresh"), 0);
    }

    #[tokio::test]
    async fn delete_account_tears_the_session_down() {
        let f = fixture();
        f.store.set_token_pair("acc-1", "ref-1").expect("seed tokens");
        f.transport.push(204, "");

        f.client.delete_account().await.expect("delete should succeed");

        assert!(f.store.get(CredentialKind::AccessToken).is_none());
        assert_eq!(f.navigator.navigation_count(), 1);
    }

    #[tokio::test]
    async fn news_is_served_from_the_session_cache_until_stale() {
        let f = fixture();
        f.store.set_token_pair("acc-1", "ref-1").expect("seed tokens");
        f.transport
            .push(200, r#"{"items":[],"page":1,"totalPages":3}"#);

        let first = f.client.news(1).await.expect("first fetch");
        let second = f.client.news(1).await.expect("cached fetch");

        assert_eq!(first.total_pages, second.total_pages);
        // Only one network call; the second read hit the cache
        assert_eq!(f.transport.call_count(), 1);
    }
}
