use crate::config::Config;
use crate::domain::models::AuthResponse;
use crate::error::ClientResult;
use crate::services::api::{ApiClient, SurveyApi};
use crate::services::request_tracker::RequestTracker;
use crate::services::surveys::SurveyWorkflow;
use crate::session::{AuthGate, LoginRedirect, Session, SessionStore};
use std::sync::Arc;

/// Everything a view needs: configuration, one API client carrying the current token,
/// and the session it was built from.
pub struct AppContext {
    pub config: Config,
    client: ApiClient,
    store: SessionStore,
    gate: AuthGate,
    tracker: RequestTracker,
}

pub type SharedContext = Arc<tokio::sync::RwLock<AppContext>>;

impl AppContext {
    pub fn new(config: Config) -> ClientResult<Self> {
        let client = ApiClient::new(&config.api_url, config.timeout)?;
        let store = SessionStore::new(config.session_file.clone());
        Ok(Self {
            config,
            client,
            store,
            gate: AuthGate::default(),
            tracker: RequestTracker::new(),
        })
    }

    /// Builds the context and restores a persisted session, if any.
    pub fn restore(config: Config) -> ClientResult<Self> {
        let mut ctx = Self::new(config)?;
        if let Some(session) = ctx.store.load()? {
            tracing::info!("Restored session for {}", session.username);
            ctx.replace_session(Some(session));
        }
        Ok(ctx)
    }

    pub fn shared(self) -> SharedContext {
        Arc::new(tokio::sync::RwLock::new(self))
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> Option<&Session> {
        self.gate.session()
    }

    pub fn require_session(&mut self, destination: &str) -> Result<&Session, LoginRedirect> {
        self.gate.require(destination)
    }

    pub fn workflow(&self) -> SurveyWorkflow {
        let api: Arc<dyn SurveyApi> = Arc::new(self.client.clone());
        SurveyWorkflow::new(api, self.tracker.clone(), self.config.submit_policy)
    }

    /// Swaps the session and rebuilds the client with the matching token.
    fn replace_session(&mut self, session: Option<Session>) -> String {
        self.client = self
            .client
            .with_token(session.as_ref().map(|s| s.token.clone()));
        match session {
            Some(session) => self.gate.complete_login(session),
            None => {
                self.gate.logout();
                crate::session::DEFAULT_DESTINATION.to_string()
            }
        }
    }

    /// Persists the new session and returns where the user should land next.
    pub fn sign_in(&mut self, auth: AuthResponse) -> ClientResult<String> {
        let session = Session::from(auth);
        self.store.save(&session)?;
        tracing::info!("Signed in as {} (id={})", session.username, session.user_id);
        Ok(self.replace_session(Some(session)))
    }

    pub fn sign_out(&mut self) -> ClientResult<()> {
        self.store.clear()?;
        if let Some(session) = self.session() {
            tracing::info!("Signed out {}", session.username);
        }
        self.replace_session(None);
        Ok(())
    }
}
