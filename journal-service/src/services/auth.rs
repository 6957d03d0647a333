use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{
    config::AuthSettings,
    dtos::auth::{
        AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
        VerifyEmailRequest,
    },
    models::{user::normalize_email, Profile, SecurityEventType, User, UserResponse},
    repositories::UserRepository,
    services::{
        clock::Clock, EmailProvider, JwtService, LoginDefense, ServiceError, TokenResponse,
    },
    utils::{
        codes::{generate_numeric_code, hash_code},
        hash_password, Password, PasswordHashString, PasswordVerifier,
    },
};

pub const LOGIN_ENDPOINT: &str = "/api/v1/auth/login";

const VERIFICATION_CODE_TTL_HOURS: i64 = 24;
const RESET_CODE_TTL_HOURS: i64 = 1;

/// Client details attached to a login attempt.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub ip_address: String,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    email: Arc<dyn EmailProvider>,
    jwt: JwtService,
    defense: Arc<LoginDefense>,
    settings: AuthSettings,
    clock: Arc<dyn Clock>,
    verifier: Arc<PasswordVerifier>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        email: Arc<dyn EmailProvider>,
        jwt: JwtService,
        defense: Arc<LoginDefense>,
        settings: AuthSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            email,
            jwt,
            defense,
            settings,
            clock,
            verifier: Arc::new(PasswordVerifier::default()),
        }
    }

    /// Replace the default scheme chain.
    pub fn with_password_verifier(mut self, verifier: PasswordVerifier) -> Self {
        self.verifier = Arc::new(verifier);
        self
    }

    fn issue_tokens(&self, user: &User) -> Result<TokenResponse, ServiceError> {
        Ok(self
            .jwt
            .generate_token_pair(&user.user_id.to_string(), user.is_admin)?)
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ServiceError> {
        let email = normalize_email(&req.email);

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&Password::new(req.password))?;

        let display_name = req
            .display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let mut user = User::new(
            &email,
            display_name,
            password_hash.into_string(),
            !self.settings.require_email_verification,
        );

        let verification_code = if self.settings.require_email_verification {
            let code = generate_numeric_code();
            user.verification_code_hash = Some(hash_code(&code));
            user.verification_expires_utc =
                Some(self.clock.now() + Duration::hours(VERIFICATION_CODE_TTL_HOURS));
            Some(code)
        } else {
            None
        };

        let profile = Profile::default_for(user.user_id);
        self.users.create_with_profile(&user, &profile).await?;

        tracing::info!(user_id = %user.user_id, profile_id = %profile.profile_id, "User registered");

        let greeting = user.display_name.clone().unwrap_or_else(|| user.email.clone());
        if let Err(e) = self
            .email
            .send_welcome_email(&user.email, &greeting, &self.settings.frontend_url)
            .await
        {
            tracing::warn!(error = %e, user_id = %user.user_id, "Failed to send welcome email");
        }

        if let Some(code) = verification_code {
            if let Err(e) = self.email.send_verification_email(&user.email, &code).await {
                tracing::warn!(error = %e, user_id = %user.user_id, "Failed to send verification email");
            }
        }

        Ok(AuthResponse {
            tokens: self.issue_tokens(&user)?,
            user: user.sanitized(),
        })
    }

    /// Authenticate with email and password.
    ///
    /// Blocked IPs are turned away before the credentials are looked at.
    /// Unknown emails and wrong passwords fail identically and both count
    /// against the IP.
    pub async fn login(
        &self,
        req: LoginRequest,
        client: &ClientContext,
    ) -> Result<AuthResponse, ServiceError> {
        let ip = client.ip_address.as_str();
        self.defense.ensure_not_blocked(ip, LOGIN_ENDPOINT).await?;

        let email = normalize_email(&req.email);
        let password = Password::new(req.password);

        let user = self.users.find_by_email(&email).await?;
        let stored = user
            .as_ref()
            .map(|u| PasswordHashString::new(u.password_hash.clone()));
        let matched = self.verifier.verify_account(&password, stored.as_ref());

        let (user, scheme) = match (user, matched) {
            (Some(user), Some(scheme)) => (user, scheme),
            _ => {
                let outcome = self
                    .defense
                    .record_failure(ip, &email, client.user_agent.clone(), LOGIN_ENDPOINT)
                    .await?;
                return Err(if outcome.blocked {
                    ServiceError::IpBlocked
                } else {
                    ServiceError::InvalidCredentials
                });
            }
        };

        if self.settings.require_email_verification && !user.email_verified {
            return Err(ServiceError::EmailNotVerified);
        }

        self.defense.record_success(ip).await?;

        if PasswordVerifier::needs_rehash(scheme) {
            let upgraded = hash_password(&password)?;
            self.users
                .update_password(user.user_id, upgraded.as_str())
                .await?;
            tracing::info!(user_id = %user.user_id, from = scheme, "Upgraded legacy password hash");
        }

        let now = self.clock.now();
        self.users.record_login(user.user_id, now).await?;
        self.defense
            .log(
                ip,
                SecurityEventType::LoginSuccess,
                format!("Login for user {}", user.user_id),
                Some(LOGIN_ENDPOINT),
            )
            .await;

        tracing::info!(user_id = %user.user_id, "User logged in");

        let mut user = user;
        user.last_login_utc = Some(now);
        Ok(AuthResponse {
            tokens: self.issue_tokens(&user)?,
            user: user.sanitized(),
        })
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ServiceError> {
        let claims = self
            .jwt
            .validate_refresh_token(refresh_token)
            .map_err(|_| ServiceError::InvalidToken)?;
        let user_id = claims.user_id().map_err(|_| ServiceError::InvalidToken)?;

        if self.users.find_by_id(user_id).await?.is_none() {
            tracing::warn!(user_id = %user_id, "Refresh token for unknown user");
            return Err(ServiceError::InvalidToken);
        }

        let tokens = self.jwt.refresh_access_token(refresh_token)?;
        tracing::debug!(user_id = %user_id, "Access token refreshed");
        Ok(tokens)
    }

    pub async fn me(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        req: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let current = Password::new(req.current_password);
        if self
            .verifier
            .verify(&current, &PasswordHashString::new(user.password_hash))
            .is_none()
        {
            return Err(ServiceError::InvalidCredentials);
        }

        let new_hash = hash_password(&Password::new(req.new_password))?;
        self.users
            .update_password(user_id, new_hash.as_str())
            .await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Email a reset code when the account exists. Silent otherwise.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        let Some(user) = self.users.find_by_email(&normalize_email(email)).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let code = generate_numeric_code();
        self.users
            .set_reset_code(
                user.user_id,
                &hash_code(&code),
                self.clock.now() + Duration::hours(RESET_CODE_TTL_HOURS),
            )
            .await?;

        if let Err(e) = self.email.send_password_reset_email(&user.email, &code).await {
            tracing::warn!(error = %e, user_id = %user.user_id, "Failed to send reset email");
        }

        tracing::info!(user_id = %user.user_id, "Password reset requested");
        Ok(())
    }

    pub async fn reset_password(
        &self,
        req: ResetPasswordRequest,
        client: &ClientContext,
    ) -> Result<(), ServiceError> {
        let user = self
            .users
            .find_by_email(&normalize_email(&req.email))
            .await?
            .filter(|u| {
                code_matches(
                    u.reset_code_hash.as_deref(),
                    u.reset_expires_utc,
                    &req.code,
                    self.clock.now(),
                )
            })
            .ok_or_else(invalid_code)?;

        let new_hash = hash_password(&Password::new(req.new_password))?;
        self.users
            .complete_password_reset(user.user_id, new_hash.as_str())
            .await?;

        self.defense
            .log(
                &client.ip_address,
                SecurityEventType::PasswordReset,
                format!("Password reset for user {}", user.user_id),
                Some("/api/v1/auth/reset-password"),
            )
            .await;

        tracing::info!(user_id = %user.user_id, "Password reset completed");
        Ok(())
    }

    pub async fn verify_email(&self, req: VerifyEmailRequest) -> Result<(), ServiceError> {
        let user = self
            .users
            .find_by_email(&normalize_email(&req.email))
            .await?
            .ok_or_else(invalid_code)?;

        if user.email_verified {
            return Ok(());
        }

        if !code_matches(
            user.verification_code_hash.as_deref(),
            user.verification_expires_utc,
            &req.code,
            self.clock.now(),
        ) {
            return Err(invalid_code());
        }

        self.users.mark_email_verified(user.user_id).await?;
        tracing::info!(user_id = %user.user_id, "Email verified");
        Ok(())
    }

    /// Issue a fresh verification code for an unverified account. Silent
    /// for unknown or already verified emails.
    pub async fn resend_verification(&self, email: &str) -> Result<(), ServiceError> {
        let Some(user) = self.users.find_by_email(&normalize_email(email)).await? else {
            return Ok(());
        };
        if user.email_verified {
            return Ok(());
        }

        let code = generate_numeric_code();
        self.users
            .set_verification_code(
                user.user_id,
                &hash_code(&code),
                self.clock.now() + Duration::hours(VERIFICATION_CODE_TTL_HOURS),
            )
            .await?;

        self.email
            .send_verification_email(&user.email, &code)
            .await
            .map_err(|e| ServiceError::EmailError(e.to_string()))?;

        tracing::info!(user_id = %user.user_id, "Verification code re-sent");
        Ok(())
    }
}

fn invalid_code() -> ServiceError {
    ServiceError::ValidationError("Invalid or expired code".to_string())
}

fn code_matches(
    stored_hash: Option<&str>,
    expires: Option<DateTime<Utc>>,
    code: &str,
    now: DateTime<Utc>,
) -> bool {
    let (Some(stored), Some(expires)) = (stored_hash, expires) else {
        return false;
    };
    if now >= expires {
        return false;
    }
    stored.as_bytes().ct_eq(hash_code(code).as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JwtConfig, LoginDefenseConfig};
    use crate::repositories::InMemoryStore;
    use crate::services::{clock::ManualClock, MockEmailService};
    use crate::utils::PasswordScheme;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingArgon2(Arc<AtomicUsize>);

    impl PasswordScheme for CountingArgon2 {
        fn name(&self) -> &'static str {
            "argon2"
        }

        fn verify(&self, password: &Password, hash: &str) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            crate::utils::password::Argon2Scheme.verify(password, hash)
        }
    }

    fn service(calls: Arc<AtomicUsize>) -> AuthService {
        let store = Arc::new(InMemoryStore::new());
        let mail = Arc::new(MockEmailService::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let jwt = JwtService::new(&JwtConfig {
            secret: "unit-test-secret".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        })
        .unwrap();
        let defense = Arc::new(LoginDefense::new(
            store.clone(),
            mail.clone(),
            LoginDefenseConfig::default(),
            clock.clone(),
        ));

        AuthService::new(
            store,
            mail,
            jwt,
            defense,
            AuthSettings {
                require_email_verification: false,
                frontend_url: "http://localhost:3000".to_string(),
            },
            clock,
        )
        .with_password_verifier(PasswordVerifier::new(vec![Box::new(CountingArgon2(calls))]))
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_unknown_email_pays_for_a_hash_check() {
        let calls = Arc::new(AtomicUsize::new(0));
        let auth = service(calls.clone());
        let client = ClientContext {
            ip_address: "203.0.113.7".to_string(),
            user_agent: None,
        };

        auth.register(RegisterRequest {
            email: "known@example.com".to_string(),
            password: "right-password".to_string(),
            display_name: None,
        })
        .await
        .unwrap();

        let wrong = auth
            .login(login("known@example.com", "wrong-password"), &client)
            .await;
        assert!(matches!(wrong, Err(ServiceError::InvalidCredentials)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let unknown = auth
            .login(login("nobody@example.com", "wrong-password"), &client)
            .await;
        assert!(matches!(unknown, Err(ServiceError::InvalidCredentials)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_code_matches_checks_hash_and_expiry() {
        let now = Utc::now();
        let stored = hash_code("123456");

        assert!(code_matches(Some(&stored), Some(now + Duration::minutes(5)), "123456", now));
        assert!(!code_matches(Some(&stored), Some(now + Duration::minutes(5)), "654321", now));
        assert!(!code_matches(Some(&stored), Some(now), "123456", now));
        assert!(!code_matches(None, Some(now + Duration::minutes(5)), "123456", now));
    }
}
