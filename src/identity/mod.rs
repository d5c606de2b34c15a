/// Identity Provider
///
/// Handles user registration, login, and bearer-token resolution. The
/// lifecycle manager never touches credentials; it only consumes the
/// resolved `Identity`. The `IdentityProvider` trait keeps it testable
/// with fakes.
use crate::{
    error::{AppError, AppResult},
    paper::models::Role,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// A resolved actor: what a valid bearer token maps to
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
    pub department: String,
    pub name: String,
}

/// Resolves a bearer credential to an identity, or fails with
/// `Authentication`
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> AppResult<Identity>;
}

/// Public view of a user; the credential hash never leaves this module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub department: String,
    pub created_at: DateTime<Utc>,
}

/// Registration request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub department: String,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token + user info returned by register/login
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: String,
    exp: i64,
    iat: i64,
}

/// User directory backed by the users table
#[derive(Clone)]
pub struct UserDirectory {
    db: SqlitePool,
    jwt_secret: String,
    token_ttl: i64,
}

impl UserDirectory {
    pub fn new(db: SqlitePool, jwt_secret: String, token_ttl: i64) -> Self {
        Self {
            db,
            jwt_secret,
            token_ttl,
        }
    }

    /// Register a new user and issue a token
    pub async fn register(&self, req: RegisterRequest) -> AppResult<AuthResponse> {
        let email = req.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        if req.password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        if req.name.trim().is_empty() || req.department.trim().is_empty() {
            return Err(AppError::Validation(
                "Name and department are required".to_string(),
            ));
        }

        let existing = sqlx::query("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let password_hash = hash_password(&req.password)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, department, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&password_hash)
        .bind(req.name.trim())
        .bind(req.role.as_str())
        .bind(req.department.trim())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        let user = UserInfo {
            id: id.clone(),
            email,
            name: req.name.trim().to_string(),
            role: req.role,
            department: req.department.trim().to_string(),
            created_at: now,
        };

        Ok(AuthResponse {
            token: self.issue_token(&user)?,
            user,
        })
    }

    /// Verify credentials and issue a token
    pub async fn login(&self, req: LoginRequest) -> AppResult<AuthResponse> {
        let email = req.email.trim().to_lowercase();

        let row = sqlx::query(
            "SELECT id, email, password_hash, name, role, department, created_at
             FROM users WHERE email = ?",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

        let password_hash: String = row.get("password_hash");
        if !verify_password(&req.password, &password_hash) {
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let user = parse_user_row(row)?;

        Ok(AuthResponse {
            token: self.issue_token(&user)?,
            user,
        })
    }

    /// Fetch a user by id
    pub async fn get_user(&self, user_id: &str) -> AppResult<UserInfo> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, name, role, department, created_at
             FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        parse_user_row(row)
    }

    /// List all users (HOD dashboards)
    pub async fn list_users(&self) -> AppResult<Vec<UserInfo>> {
        let rows = sqlx::query(
            "SELECT id, email, password_hash, name, role, department, created_at
             FROM users ORDER BY created_at ASC",
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_user_row).collect()
    }

    fn issue_token(&self, user: &UserInfo) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role.as_str().to_string(),
            exp: now + self.token_ttl,
            iat: now,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token issuance failed: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for UserDirectory {
    async fn resolve(&self, token: &str) -> AppResult<Identity> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 300;

        let data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Authentication("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::Authentication("Invalid token signature".to_string())
                }
                _ => AppError::Authentication(format!("Invalid token: {}", e)),
            }
        })?;

        // Role and department come from the current user record, not
        // the claims, so stale tokens reflect the latest state
        let user = self
            .get_user(&data.claims.sub)
            .await
            .map_err(|_| AppError::Authentication("User no longer exists".to_string()))?;

        Ok(Identity {
            user_id: user.id,
            role: user.role,
            department: user.department,
            name: user.name,
        })
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn parse_user_row(row: sqlx::sqlite::SqliteRow) -> AppResult<UserInfo> {
    let role_str: String = row.get("role");
    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| AppError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(UserInfo {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        role: Role::parse(&role_str)?,
        department: row.get("department"),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_directory() -> UserDirectory {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                department TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&db)
        .await
        .unwrap();

        UserDirectory::new(db, "test-secret-that-is-long-enough-0000".to_string(), 3600)
    }

    fn register_request(email: &str, role: Role) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "correct horse battery".to_string(),
            name: "Test User".to_string(),
            role,
            department: "Computer Science".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_login_resolve() {
        let directory = test_directory().await;

        let registered = directory
            .register(register_request("lec@example.edu", Role::Lecturer))
            .await
            .unwrap();
        assert_eq!(registered.user.role, Role::Lecturer);

        let login = directory
            .login(LoginRequest {
                email: "lec@example.edu".to_string(),
                password: "correct horse battery".to_string(),
            })
            .await
            .unwrap();

        let identity = directory.resolve(&login.token).await.unwrap();
        assert_eq!(identity.user_id, registered.user.id);
        assert_eq!(identity.role, Role::Lecturer);
        assert_eq!(identity.department, "Computer Science");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let directory = test_directory().await;

        directory
            .register(register_request("dup@example.edu", Role::Examiner))
            .await
            .unwrap();
        let err = directory
            .register(register_request("dup@example.edu", Role::Examiner))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let directory = test_directory().await;

        directory
            .register(register_request("x@example.edu", Role::Hod))
            .await
            .unwrap();

        let err = directory
            .login(LoginRequest {
                email: "x@example.edu".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let directory = test_directory().await;
        let err = directory.resolve("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let directory = test_directory().await;
        let mut req = register_request("s@example.edu", Role::Lecturer);
        req.password = "short".to_string();
        assert!(matches!(
            directory.register(req).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }
}
