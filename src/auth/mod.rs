use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{DbPool, ScopedSelect};
use crate::entities::user::{self, Entity as UserEntity, Role};
use crate::errors::{ApiError, ServiceError};

/// JWT claims carried by every access token. `company_id` is the tenant the
/// token acts for; handlers never accept a tenant id from the request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub company_id: String,
    pub role: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller, resolved from the bearer token by the extractor.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
    pub email: String,
}

impl AuthenticatedUser {
    /// Gate a handler on a minimum role.
    pub fn require(&self, role: Role) -> Result<(), ServiceError> {
        if self.role.allows(role) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "{} role required",
                role.as_str()
            )))
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub role: String,
    pub company_id: Uuid,
}

#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_secs: u64,
    db: Arc<DbPool>,
}

impl AuthService {
    pub fn new(jwt_secret: &str, token_ttl_secs: u64, db: Arc<DbPool>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_ttl_secs,
            db,
        }
    }

    pub fn hash_password(password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::Internal(format!("password hashing failed: {e}")))
    }

    pub fn verify_password(password: &str, password_hash: &str) -> bool {
        PasswordHash::new(password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Verify credentials and issue an access token. Failures are deliberately
    /// indistinguishable between unknown email and wrong password.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ServiceError> {
        let user = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::Active.eq(true))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("invalid credentials".to_string()))?;

        if !Self::verify_password(password, &user.password_hash) {
            return Err(ServiceError::Unauthorized("invalid credentials".to_string()));
        }

        let token = self.issue_token(&user)?;
        Ok(LoginResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_ttl_secs,
            role: user.role,
            company_id: user.company_id,
        })
    }

    pub fn issue_token(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            company_id: user.company_id.to_string(),
            role: user.role.clone(),
            email: user.email.clone(),
            iat: now,
            exp: now + self.token_ttl_secs as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(format!("token encoding failed: {e}")))
    }

    /// Create a user inside the caller's tenant. Emails are globally unique;
    /// a collision is a conflict regardless of tenant so no account probing
    /// is possible via error shape.
    #[instrument(skip(self, password))]
    pub async fn create_user(
        &self,
        company_id: Uuid,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<user::Model, ServiceError> {
        if password.len() < 12 {
            return Err(ServiceError::validation(
                "password must be at least 12 characters",
            ));
        }

        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "user {email} already exists"
            )));
        }

        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            email: Set(email.to_string()),
            password_hash: Set(Self::hash_password(password)?),
            role: Set(role.as_str().to_string()),
            active: Set(true),
            created_at: Set(Utc::now()),
        };

        model.insert(self.db.as_ref()).await.map_err(ServiceError::from)
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self, company_id: Uuid) -> Result<Vec<user::Model>, ServiceError> {
        UserEntity::find()
            .for_company(company_id)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::from)
    }

    /// Deactivate a user in the caller's tenant; their tokens stop resolving
    /// at the next login, and the login path refuses inactive accounts.
    #[instrument(skip(self))]
    pub async fn deactivate_user(
        &self,
        company_id: Uuid,
        user_id: Uuid,
    ) -> Result<user::Model, ServiceError> {
        let existing = UserEntity::find_by_id(user_id)
            .for_company(company_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("user", user_id))?;

        let mut active: user::ActiveModel = existing.into();
        active.active = Set(false);
        active.update(self.db.as_ref()).await.map_err(ServiceError::from)
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, ServiceError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|_| ServiceError::Unauthorized("invalid or expired token".to_string()))?;

        let claims = data.claims;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("malformed token subject".to_string()))?;
        let company_id = Uuid::parse_str(&claims.company_id)
            .map_err(|_| ServiceError::Unauthorized("malformed token tenant".to_string()))?;
        let role = Role::from_str(&claims.role)
            .ok_or_else(|| ServiceError::Unauthorized("unknown role".to_string()))?;

        Ok(AuthenticatedUser {
            user_id,
            company_id,
            role,
            email: claims.email,
        })
    }
}

#[async_trait]
impl FromRequestParts<crate::AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &crate::AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or(ApiError::Unauthorized)?;

        state.auth.validate_token(token).map_err(ApiError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = AuthService::hash_password("correct horse battery staple").unwrap();
        assert!(AuthService::verify_password(
            "correct horse battery staple",
            &hash
        ));
        assert!(!AuthService::verify_password("wrong", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!AuthService::verify_password("anything", "not-a-phc-string"));
    }
}
