use crate::domain::models::{AuthResponse, UserId};
use crate::error::{ClientError, ClientResult};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub user_id: UserId,
}

/// Value of the `Authorization` header for an API token.
pub fn authorization_value(token: &str) -> String {
    format!("Token {token}")
}

impl From<AuthResponse> for Session {
    fn from(auth: AuthResponse) -> Self {
        Self {
            token: auth.token,
            username: auth.username,
            user_id: auth.user_id,
        }
    }
}

// ========== Persistence ==========

/// Keeps the session in a JSON file so the token survives restarts.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nobody is logged in.
    pub fn load(&self) -> ClientResult<Option<Session>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(session_error("read", &self.path, e)),
        };
        let session: Session =
            serde_json::from_str(&raw).map_err(|e| session_error("parse", &self.path, e))?;
        if session.token.trim().is_empty() {
            tracing::warn!("Ignoring session file with empty token: {}", self.path.display());
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> ClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| session_error("create", parent, e))?;
        }
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| session_error("serialize", &self.path, e))?;
        fs::write(&self.path, json).map_err(|e| session_error("write", &self.path, e))?;
        tracing::info!("Session saved for {}", session.username);
        Ok(())
    }

    /// Removing a missing file is not an error.
    pub fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(session_error("remove", &self.path, e)),
        }
    }
}

fn session_error(action: &str, path: &Path, err: impl std::fmt::Display) -> ClientError {
    ClientError::Session(format!("failed to {action} {}: {err}", path.display()))
}

// ========== Auth gate ==========

/// Where the user must go to log in, remembering where they wanted to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub next: String,
}

impl LoginRedirect {
    /// Login path with `next` form-encoded, so destinations carrying their own query survive.
    pub fn location(&self) -> String {
        let query = Url::parse_with_params(LOGIN_URL, [("next", self.next.as_str())])
            .ok()
            .and_then(|url| url.query().map(str::to_string))
            .unwrap_or_default();
        format!("/login?{query}")
    }
}

const LOGIN_URL: &str = "http://localhost/login";

pub const DEFAULT_DESTINATION: &str = "/";

/// Guards views that need a logged-in user.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    session: Option<Session>,
    pending: Option<String>,
}

impl AuthGate {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session,
            pending: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn require(&mut self, destination: &str) -> Result<&Session, LoginRedirect> {
        match self.session {
            Some(ref session) => Ok(session),
            None => {
                let next = if destination.trim().is_empty() {
                    DEFAULT_DESTINATION.to_string()
                } else {
                    destination.to_string()
                };
                tracing::debug!("Login required for {}", next);
                self.pending = Some(next.clone());
                Err(LoginRedirect { next })
            }
        }
    }

    /// Stores the session and returns the page the user was sent away from.
    pub fn complete_login(&mut self, session: Session) -> String {
        self.session = Some(session);
        self.pending
            .take()
            .unwrap_or_else(|| DEFAULT_DESTINATION.to_string())
    }

    pub fn logout(&mut self) -> Option<Session> {
        self.pending = None;
        self.session.take()
    }
}
