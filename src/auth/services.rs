use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::RegisterRequest,
    error::{AuthError, AuthResult},
    jwt::JwtKeys,
    password::{validate_password, CredentialHasher},
};
use crate::users::{
    model::{NewUser, User},
    store::UserStore,
};

pub const REGISTERED_MESSAGE: &str = "User registered successfully";
pub const MAX_NAME_LEN: usize = 50;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_name(name: &str) -> AuthResult<()> {
    if name.is_empty() {
        return Err(AuthError::Validation("Name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AuthError::Validation(format!(
            "Name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(AuthError::Validation(
            "Name must contain printable characters only".into(),
        ));
    }
    Ok(())
}

/// Registration, login and profile lookup over a [`UserStore`].
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, hasher: CredentialHasher, keys: JwtKeys) -> Self {
        Self {
            users,
            hasher,
            keys,
        }
    }

    pub async fn register(&self, candidate: RegisterRequest) -> AuthResult<&'static str> {
        let name = candidate.name.trim().to_string();
        let email = normalize_email(&candidate.email);
        let avatar = candidate
            .avatar
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        validate_name(&name)?;
        if !is_valid_email(&email) {
            return Err(AuthError::Validation("Email should be valid".into()));
        }
        validate_password(&candidate.password)?;

        // Fast path only; `save` below is what actually guards uniqueness.
        if self.users.find_by_email(&email).await?.is_some() {
            warn!("registration with taken email");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hash(candidate.password).await?;
        let user = self
            .users
            .save(NewUser {
                name,
                email,
                password_hash,
                role: candidate.role,
                avatar,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(REGISTERED_MESSAGE)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<String> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!("login unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify(password.to_string(), user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.keys.issue(&user.email)?;
        info!(user_id = %user.id, "user logged in");
        Ok(token)
    }

    pub async fn get_profile(&self, token: &str) -> AuthResult<User> {
        let email = self.keys.validate(token)?;
        self.users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn hash(&self, password: String) -> AuthResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
    }

    async fn verify(&self, password: String, hash: String) -> AuthResult<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("verify task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::password::fast_hasher,
        config::JwtConfig,
        users::{memory::InMemoryUserStore, model::Role},
    };

    fn test_keys() -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        })
    }

    fn make_service() -> (AuthService, Arc<InMemoryUserStore>) {
        let store = Arc::new(InMemoryUserStore::new());
        let service = AuthService::new(store.clone(), fast_hasher(), test_keys());
        (service, store)
    }

    fn candidate(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: Role::Client,
            avatar: None,
        }
    }

    #[tokio::test]
    async fn register_authenticate_and_fetch_profile() {
        let (service, _) = make_service();
        let msg = service
            .register(candidate("Ana", "ana@x.com", "secret1"))
            .await
            .expect("register");
        assert_eq!(msg, REGISTERED_MESSAGE);

        let token = service
            .authenticate("ana@x.com", "secret1")
            .await
            .expect("authenticate");
        assert_eq!(test_keys().validate(&token).unwrap(), "ana@x.com");

        let user = service.get_profile(&token).await.expect("profile");
        assert_eq!(user.email, "ana@x.com");
        assert_eq!(user.name, "Ana");
        assert_eq!(user.role, Role::Client);
        assert_ne!(user.password_hash, "secret1");
        assert!(!user.password_hash.is_empty());
    }

    #[tokio::test]
    async fn email_is_normalized() {
        let (service, store) = make_service();
        service
            .register(candidate("Ana", "  Ana@X.com ", "secret1"))
            .await
            .unwrap();
        assert!(store.find_by_email("ana@x.com").await.unwrap().is_some());
        assert!(service.authenticate("ANA@x.com", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let (service, _) = make_service();
        service
            .register(candidate("Ana", "ana@x.com", "secret1"))
            .await
            .unwrap();

        let unknown = service
            .authenticate("nobody@x.com", "secret1")
            .await
            .unwrap_err();
        let wrong = service
            .authenticate("ana@x.com", "secret2")
            .await
            .unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.status_code(), wrong.status_code());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (service, store) = make_service();
        service
            .register(candidate("Ana", "ana@x.com", "secret1"))
            .await
            .unwrap();
        let err = service
            .register(candidate("Other", "ana@x.com", "another1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn invalid_password_is_reported_before_taken_email() {
        let (service, store) = make_service();
        service
            .register(candidate("Ana", "ana@x.com", "secret1"))
            .await
            .unwrap();
        for bad in ["123", "", "      "] {
            let err = service
                .register(candidate("Ana", "ana@x.com", bad))
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::Validation(_)), "{bad:?}: {err:?}");
        }
        let err = service
            .register(candidate("", "ana@x.com", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_admit_exactly_one() {
        let (service, store) = make_service();
        let service = Arc::new(service);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .register(candidate(&format!("User {i}"), "race@x.com", "secret1"))
                        .await
                })
            })
            .collect();

        let mut ok = 0;
        for h in handles {
            match h.await.expect("join") {
                Ok(_) => ok += 1,
                Err(AuthError::DuplicateEmail) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn profile_of_deleted_user_is_user_not_found() {
        let (service, store) = make_service();
        service
            .register(candidate("Ana", "ana@x.com", "secret1"))
            .await
            .unwrap();
        let token = service.authenticate("ana@x.com", "secret1").await.unwrap();

        store.remove("ana@x.com").await.expect("was stored");
        let err = service.get_profile(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn profile_with_bad_token_is_invalid_token() {
        let (service, _) = make_service();
        let err = service.get_profile("garbage").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));

        let expired = test_keys()
            .issue_at(
                "ana@x.com",
                time::OffsetDateTime::now_utc() - time::Duration::hours(1),
            )
            .unwrap();
        let err = service.get_profile(&expired).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn register_validates_fields() {
        let (service, store) = make_service();
        let cases = [
            candidate("", "ana@x.com", "secret1"),
            candidate("   ", "ana@x.com", "secret1"),
            candidate(&"a".repeat(MAX_NAME_LEN + 1), "ana@x.com", "secret1"),
            candidate("An\u{0007}a", "ana@x.com", "secret1"),
            candidate("Ana", "not-an-email", "secret1"),
            candidate("Ana", "ana@x.com", "short"),
            candidate("Ana", "ana@x.com", ""),
        ];
        for c in cases {
            let err = service.register(c).await.unwrap_err();
            assert!(matches!(err, AuthError::Validation(_)), "{err:?}");
        }
        assert_eq!(store.len().await, 0);

        assert!(service
            .register(candidate(&"a".repeat(MAX_NAME_LEN), "ana@x.com", "secret1"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn register_keeps_role_and_avatar() {
        let (service, store) = make_service();
        service
            .register(RegisterRequest {
                name: "Sam".into(),
                email: "sam@x.com".into(),
                password: "secret1".into(),
                role: Role::Seller,
                avatar: Some("  ".into()),
            })
            .await
            .unwrap();
        let user = store.find_by_email("sam@x.com").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Seller);
        assert_eq!(user.avatar, None);
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("ana@x.com"));
        assert!(!is_valid_email("ana@x"));
        assert!(!is_valid_email("ana x@x.com"));
        assert!(!is_valid_email(""));
    }
}
