//! Auth and account endpoints.

use tracing::instrument;

use coursedeck_core::UserId;

use super::types::{
    AuthResponse, LoginRequest, ProfileUpdate, RegisterRequest, User, UserEnvelope,
};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Authenticate with email and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let mut response: AuthResponse = self.post_json("/login", credentials).await?;
        self.normalize_user(&mut response.data);
        Ok(response)
    }

    /// Create a new account.
    ///
    /// The server issues a token here too, but registration does not sign
    /// the user in; callers go through [`Self::login`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the account cannot be created.
    #[instrument(skip(self, data), fields(email = %data.email))]
    pub async fn register(&self, data: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let mut response: AuthResponse = self.post_json("/register", data).await?;
        self.normalize_user(&mut response.data);
        Ok(response)
    }

    /// Fetch a user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or the request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn fetch_user(&self, user_id: &UserId) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self.get_json(&format!("/user/{user_id}")).await?;
        let mut user = envelope.data;
        self.normalize_user(&mut user);
        Ok(user)
    }

    /// Apply a partial profile update and return the updated user.
    ///
    /// # Errors
    ///
    /// Returns an error if the update is rejected or the request fails.
    #[instrument(skip(self, patch), fields(user_id = %user_id))]
    pub async fn update_profile(
        &self,
        user_id: &UserId,
        patch: &ProfileUpdate,
    ) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self
            .post_json(&format!("/user/edit/{user_id}"), patch)
            .await?;
        let mut user = envelope.data;
        self.normalize_user(&mut user);
        Ok(user)
    }
}
