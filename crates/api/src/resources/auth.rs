//! `/auth/*` endpoints.

use serde::Deserialize;
use tracing::instrument;

use crate::auth::{AuthSession, REFRESH_COOKIE, TokenPair, TokenResponse, refresh_token_from_headers};
use crate::client::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::types::{LoginRequest, RegisterRequest, ResetPasswordRequest, User};

/// A signed-in user and their tokens.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
struct AuthPayload {
    user: User,
    #[serde(flatten)]
    tokens: TokenResponse,
}

#[derive(Debug, serde::Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

impl ApiClient {
    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` or `ApiError::Validation` for bad
    /// credentials, or a transport error.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResult, ApiError> {
        self.authenticate(ApiRequest::post("/auth/login").json(request)?)
            .await
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if the email is taken.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<LoginResult, ApiError> {
        self.authenticate(ApiRequest::post("/auth/register").json(request)?)
            .await
    }

    async fn authenticate(&self, request: ApiRequest) -> Result<LoginResult, ApiError> {
        let response = self.dispatch(&request, None).await?;
        let cookie_token = refresh_token_from_headers(response.headers());
        let payload: AuthPayload = Self::decode(&request, response).await?.data;
        Ok(LoginResult {
            user: payload.user,
            tokens: payload.tokens.into_pair(cookie_token),
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token is sent as the `refresh_token` cookie. A rotated
    /// refresh token may come back in the body or in `Set-Cookie`. Callers
    /// presenting a token that was just exchanged get the same new pair.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the refresh token is rejected.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.coalesce_refresh(refresh_token, self.exchange_refresh_token(refresh_token))
            .await
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let request =
            ApiRequest::post("/auth/refresh").cookie(format!("{REFRESH_COOKIE}={refresh_token}"));
        let response = self.dispatch(&request, None).await?;
        let cookie_token = refresh_token_from_headers(response.headers());
        let body: TokenResponse = Self::decode(&request, response).await?.data;
        Ok(body.into_pair(cookie_token))
    }

    /// Revoke the session on the API side.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. Callers usually log and
    /// continue, since the local session is dropped either way.
    #[instrument(skip_all)]
    pub async fn logout(&self, auth: &AuthSession) -> Result<(), ApiError> {
        let mut request = ApiRequest::post("/auth/logout");
        if let Some(refresh_token) = auth.refresh_token() {
            request = request.cookie(format!("{REFRESH_COOKIE}={refresh_token}"));
        }
        let response = self.dispatch(&request, Some(auth)).await?;
        Self::decode::<serde::de::IgnoredAny>(&request, response).await?;
        Ok(())
    }

    /// Ask the API to email a password-reset link.
    ///
    /// Returns the API's confirmation message, if it sent one.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a malformed address.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>, ApiError> {
        let request = ApiRequest::post("/auth/forgot-password").json(&EmailBody { email })?;
        let response = self
            .execute::<serde::de::IgnoredAny>(request, None)
            .await?;
        Ok(response.message)
    }

    /// Set a new password using the token from the reset email.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<Option<String>, ApiError> {
        let request = ApiRequest::post("/auth/reset-password").json(request)?;
        let response = self
            .execute::<serde::de::IgnoredAny>(request, None)
            .await?;
        Ok(response.message)
    }

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the tokens are no longer valid.
    #[instrument(skip_all)]
    pub async fn me(&self, auth: &AuthSession) -> Result<User, ApiError> {
        self.get("/auth/me", &[], Some(auth)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_payload_flattens_tokens() {
        let json = r#"{
            "user": {"id":"u1","email":"a@sapa.vn","name":"An","role":"ADMIN"},
            "accessToken": "acc",
            "expiresIn": 900
        }"#;
        let payload: AuthPayload = serde_json::from_str(json).unwrap();
        assert!(payload.user.is_admin());
        let tokens = payload.tokens.into_pair(Some("from-cookie".into()));
        assert_eq!(tokens.access_token, "acc");
        assert_eq!(tokens.refresh_token.as_deref(), Some("from-cookie"));
    }
}
