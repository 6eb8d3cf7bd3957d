use crate::domain::models::{
    AnswerRecord, AuthResponse, LoginRequest, ProfilePage, ProfileUpdate, QuestionPayload,
    RegisterRequest, Survey, SurveyId, SurveyListing, SurveyPayload, UserProfile,
};
use crate::error::{ClientError, ClientResult};
use crate::session::authorization_value;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Every call the survey views make against the polls API.
#[async_trait]
pub trait SurveyApi: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthResponse>;
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse>;
    async fn list_surveys(&self) -> ClientResult<SurveyListing>;
    async fn get_survey(&self, id: SurveyId) -> ClientResult<Survey>;
    async fn create_survey(&self, payload: &SurveyPayload) -> ClientResult<Survey>;
    async fn update_survey(&self, id: SurveyId, payload: &SurveyPayload) -> ClientResult<Survey>;
    async fn delete_survey(&self, id: SurveyId) -> ClientResult<()>;
    async fn add_questions(&self, id: SurveyId, questions: &[QuestionPayload]) -> ClientResult<()>;
    async fn submit_answers(&self, id: SurveyId, answers: &[AnswerRecord]) -> ClientResult<()>;
    async fn get_profile(&self, username: &str) -> ClientResult<ProfilePage>;
    async fn update_profile(&self, username: &str, update: &ProfileUpdate)
        -> ClientResult<UserProfile>;
    async fn delete_profile(&self, username: &str) -> ClientResult<()>;
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid API url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "API url '{base_url}' cannot be used as a base"
            )));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            token: None,
        })
    }

    /// Same connection pool, different credentials.
    pub fn with_token(&self, token: Option<String>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `/api/<segments>/`, each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments).push("");
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        tracing::debug!("{} {}", method, url);
        let builder = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, authorization_value(token)),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = check_status(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_unit(&self, builder: RequestBuilder) -> ClientResult<()> {
        check_status(builder.send().await?).await?;
        Ok(())
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::POST, segments).json(body))
            .await
    }
}

#[async_trait]
impl SurveyApi for ApiClient {
    async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthResponse> {
        let auth: AuthResponse = self.post_json(&["register"], request).await?;
        tracing::info!("Registered user {} (id={})", auth.username, auth.user_id);
        Ok(auth)
    }

    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse> {
        let auth: AuthResponse = self.post_json(&["login"], request).await?;
        tracing::info!("Logged in as {} (id={})", auth.username, auth.user_id);
        Ok(auth)
    }

    async fn list_surveys(&self) -> ClientResult<SurveyListing> {
        self.send_json(self.request(Method::GET, &["surveys"])).await
    }

    async fn get_survey(&self, id: SurveyId) -> ClientResult<Survey> {
        let id = id.to_string();
        self.send_json(self.request(Method::GET, &["surveys", id.as_str()]))
            .await
    }

    async fn create_survey(&self, payload: &SurveyPayload) -> ClientResult<Survey> {
        let survey: Survey = self.post_json(&["surveys", "create"], payload).await?;
        tracing::info!(
            "Survey created: id={}, questions={}",
            survey.id,
            survey.questions.len()
        );
        Ok(survey)
    }

    async fn update_survey(&self, id: SurveyId, payload: &SurveyPayload) -> ClientResult<Survey> {
        let path_id = id.to_string();
        let survey: Survey = self
            .send_json(
                self.request(Method::PUT, &["surveys", path_id.as_str()])
                    .json(payload),
            )
            .await?;
        tracing::info!("Survey updated: id={}", survey.id);
        Ok(survey)
    }

    async fn delete_survey(&self, id: SurveyId) -> ClientResult<()> {
        let path_id = id.to_string();
        self.send_unit(self.request(Method::DELETE, &["surveys", path_id.as_str()]))
            .await?;
        tracing::info!("Survey deleted: id={}", id);
        Ok(())
    }

    async fn add_questions(&self, id: SurveyId, questions: &[QuestionPayload]) -> ClientResult<()> {
        let path_id = id.to_string();
        self.send_unit(
            self.request(Method::POST, &["surveys", path_id.as_str(), "questions"])
                .json(questions),
        )
        .await?;
        tracing::info!("Added {} questions to survey {}", questions.len(), id);
        Ok(())
    }

    async fn submit_answers(&self, id: SurveyId, answers: &[AnswerRecord]) -> ClientResult<()> {
        let path_id = id.to_string();
        self.send_unit(
            self.request(Method::POST, &["surveys", path_id.as_str(), "answers"])
                .json(answers),
        )
        .await?;
        tracing::info!("Submitted {} answer records to survey {}", answers.len(), id);
        Ok(())
    }

    async fn get_profile(&self, username: &str) -> ClientResult<ProfilePage> {
        self.send_json(self.request(Method::GET, &["profile", username]))
            .await
    }

    async fn update_profile(
        &self,
        username: &str,
        update: &ProfileUpdate,
    ) -> ClientResult<UserProfile> {
        let profile: UserProfile = self
            .send_json(
                self.request(Method::PUT, &["profile", username])
                    .json(update),
            )
            .await?;
        tracing::info!("Profile updated: {}", profile.username);
        Ok(profile)
    }

    async fn delete_profile(&self, username: &str) -> ClientResult<()> {
        self.send_unit(self.request(Method::DELETE, &["profile", username]))
            .await?;
        tracing::info!("Profile deleted: {}", username);
        Ok(())
    }
}

async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    tracing::warn!("API returned {}: {}", status, message);

    if status == StatusCode::UNAUTHORIZED {
        Err(ClientError::Auth { message })
    } else {
        Err(ClientError::Status { status, message })
    }
}

/// First human-readable message from a DRF-style error body.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    };

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        let trimmed = body.trim();
        return if trimmed.is_empty() || trimmed.starts_with('<') {
            fallback()
        } else {
            trimmed.chars().take(200).collect()
        };
    };

    first_message(&value, None).unwrap_or_else(fallback)
}

fn first_message(value: &serde_json::Value, field: Option<&str>) -> Option<String> {
    use serde_json::Value;

    match value {
        Value::String(text) => Some(match field {
            Some(field) if field != "detail" && field != "non_field_errors" => {
                format!("{field}: {text}")
            }
            _ => text.clone(),
        }),
        Value::Array(items) => items.iter().find_map(|item| first_message(item, field)),
        Value::Object(map) => {
            for key in ["detail", "non_field_errors"] {
                if let Some(found) = map.get(key).and_then(|v| first_message(v, Some(key))) {
                    return Some(found);
                }
            }
            map.iter()
                .find_map(|(key, v)| first_message(v, Some(key.as_str())))
        }
        _ => None,
    }
}
