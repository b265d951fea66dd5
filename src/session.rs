//! Session and profile
//!
//! Token handling belongs to an external session manager; the portal only
//! asks it for the current user, asks it to start an interactive sign-in,
//! and asks it to forget the user on sign-out.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::api::ApiClient;
use crate::config::SessionConfig;
use crate::error::PortalResult;
use crate::model::UserProfile;

/// The authenticated user as the session manager sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub access_token: String,
    /// Subject claim of the token; the user's id
    pub subject: String,
}

/// External session manager
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// The current user, if signed in
    async fn get_user(&self) -> Option<SessionUser>;

    /// Start an interactive sign-in. May never return control in a browser.
    async fn signin_redirect(&self);

    /// Forget the current user
    async fn remove_user(&self);
}

/// Session with a fixed token, for headless use
#[derive(Debug, Default)]
pub struct StaticSession {
    user: Mutex<Option<SessionUser>>,
    signin_requests: AtomicUsize,
}

impl StaticSession {
    pub fn new(user: Option<SessionUser>) -> Self {
        Self {
            user: Mutex::new(user),
            signin_requests: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        let user = config.access_token.as_ref().map(|token| SessionUser {
            access_token: token.clone(),
            subject: config.subject.clone().unwrap_or_default(),
        });
        Self::new(user)
    }

    /// How many sign-ins have been requested
    pub fn signin_requests(&self) -> usize {
        self.signin_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionManager for StaticSession {
    async fn get_user(&self) -> Option<SessionUser> {
        self.user.lock().ok().and_then(|user| user.clone())
    }

    async fn signin_redirect(&self) {
        self.signin_requests.fetch_add(1, Ordering::SeqCst);
        tracing::warn!("Sign-in required; a static session cannot sign in interactively");
    }

    async fn remove_user(&self) {
        if let Ok(mut user) = self.user.lock() {
            *user = None;
        }
    }
}

/// Result of loading the profile for the current session
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileCheck {
    /// The profile belongs to the session's user
    Valid(UserProfile),
    /// The profile belongs to someone else; the session must end
    SubjectMismatch(UserProfile),
}

/// Fetch `users/profile` and compare its id with the session subject.
pub async fn load_profile(api: &ApiClient, session: &dyn SessionManager) -> PortalResult<ProfileCheck> {
    let profile: UserProfile = api.get("users/profile", None).await?;
    let subject = session
        .get_user()
        .await
        .and_then(|user| user.subject.trim().parse::<i64>().ok());

    if subject == Some(profile.id) {
        Ok(ProfileCheck::Valid(profile))
    } else {
        tracing::warn!(
            subject = ?subject,
            profile_id = profile.id,
            "Session subject does not match profile"
        );
        Ok(ProfileCheck::SubjectMismatch(profile))
    }
}
