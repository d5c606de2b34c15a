/// Authentication extractors
use crate::{
    api::middleware::extract_bearer_token,
    context::AppContext,
    error::AppError,
    identity::{Identity, IdentityProvider},
    paper::models::{Actor, Role},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - resolves the bearer token to an identity
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: Identity,
}

impl AuthContext {
    /// The identity as a lifecycle actor
    pub fn actor(&self) -> Actor {
        Actor::new(
            self.identity.user_id.clone(),
            self.identity.role,
            self.identity.department.clone(),
        )
    }

    /// Require a specific role, else Forbidden
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.identity.role != role {
            return Err(AppError::Forbidden(format!(
                "Requires {} role",
                role.as_str()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let identity = state.users.resolve(&token).await?;

        Ok(AuthContext { identity })
    }
}
