//! Single-flight token refresh.
//!
//! Every request that sees a 401 lands here. The first caller performs the
//! rotation; everyone else blocks until that one network call settles and
//! then observes its outcome. Between the first rejection and settlement
//! there is never a second call to the refresh endpoint.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::transport::{ApiRequest, Transport};
use crate::api::ApiError;
use crate::auth::store::{CredentialKind, CredentialStore};

/// Wire shape of the login and refresh endpoints: both tokens, always
/// rotated together.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenPairResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    auth_base_url: String,
    /// Single-flight guard. Held for the whole refresh round-trip.
    flight: Mutex<()>,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        auth_base_url: String,
    ) -> Self {
        Self {
            transport,
            store,
            auth_base_url,
            flight: Mutex::new(()),
        }
    }

    /// Produce an access token that is newer than `stale`, the token the
    /// caller saw rejected (`None` if the request went out unauthenticated).
    ///
    /// Exactly one caller performs the network rotation; concurrent callers
    /// wait on the flight guard and are released only after the outcome is
    /// durable - either both tokens rotated, or the store cleared.
    pub async fn fresh_token(&self, stale: Option<&str>) -> Result<String, ApiError> {
        if self.flight.try_lock().is_err() {
            debug!("Refresh already in flight, waiting for its outcome");
        }
        let _flight = self.flight.lock().await;

        // A refresh that settled while we waited decides our outcome too.
        match self.store.get(CredentialKind::AccessToken) {
            Some(current) if Some(current.as_str()) != stale => return Ok(current),
            None if stale.is_some() => return Err(ApiError::SessionExpired),
            _ => {}
        }

        let refresh_token = match self.store.get(CredentialKind::RefreshToken) {
            Some(token) => token,
            None => {
                warn!("No refresh token stored, session cannot be renewed");
                return self.fail_closed();
            }
        };

        debug!("Requesting token rotation");
        let req = ApiRequest::post(
            format!("{}/auth/refresh", self.auth_base_url),
            serde_json::json!({ "refreshToken": refresh_token }),
        );

        let response = match self.transport.execute(&req, None).await {
            Ok(response) => response,
            Err(e) => {
                // The operation must settle even on timeout; waiters are
                // never left to guess whether a retry is coming.
                warn!(error = %e, "Token refresh did not complete");
                return self.fail_closed();
            }
        };

        if !response.is_success() {
            debug!(status = response.status, "Refresh token was rejected");
            return self.fail_closed();
        }

        let pair: TokenPairResponse = match serde_json::from_str(&response.body) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Refresh endpoint returned a malformed payload");
                return self.fail_closed();
            }
        };

        // Both tokens land before any waiter is released.
        if let Err(e) = self
            .store
            .set_token_pair(&pair.access_token, &pair.refresh_token)
        {
            warn!(error = %e, "Failed to persist rotated tokens");
            return self.fail_closed();
        }

        info!("Access token rotated");
        Ok(pair.access_token)
    }

    /// Settle the operation as failure: tear down all credential state so
    /// waiters (and any later caller) observe a terminally ended session.
    fn fail_closed(&self) -> Result<String, ApiError> {
        if let Err(e) = self.store.clear_all() {
            warn!(error = %e, "Failed to clear credential store");
        }
        Err(ApiError::SessionExpired)
    }
}
