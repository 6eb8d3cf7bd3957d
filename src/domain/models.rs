use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type SurveyId = i64;
pub type QuestionId = i64;
pub type ChoiceId = i64;
pub type UserId = i64;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[default]
    Radio,
    Checkbox,
    Text,
    Rating,
    YesNo,
    Ranking,
}

impl QuestionType {
    pub const ALL: [QuestionType; 6] = [
        QuestionType::Radio,
        QuestionType::Checkbox,
        QuestionType::Text,
        QuestionType::Rating,
        QuestionType::YesNo,
        QuestionType::Ranking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Text => "text",
            QuestionType::Rating => "rating",
            QuestionType::YesNo => "yesno",
            QuestionType::Ranking => "ranking",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::Radio => "Single choice",
            QuestionType::Checkbox => "Multiple choice",
            QuestionType::Text => "Text answer",
            QuestionType::Rating => "Rating scale",
            QuestionType::YesNo => "Yes/No",
            QuestionType::Ranking => "Ranking",
        }
    }

    /// Only radio, checkbox and ranking questions carry a choice list.
    pub fn has_choices(&self) -> bool {
        matches!(
            self,
            QuestionType::Radio | QuestionType::Checkbox | QuestionType::Ranking
        )
    }
}

impl TryFrom<&str> for QuestionType {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "radio" => Ok(QuestionType::Radio),
            "checkbox" => Ok(QuestionType::Checkbox),
            "text" => Ok(QuestionType::Text),
            "rating" => Ok(QuestionType::Rating),
            "yesno" | "yes_no" => Ok(QuestionType::YesNo),
            "ranking" => Ok(QuestionType::Ranking),
            other => Err(ValidationError::new(
                "question_type",
                format!("unknown question type '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn label(&self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::User => "User",
        }
    }
}

fn default_true() -> bool {
    true
}

// ========== Surveys ==========

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Choice {
    pub id: ChoiceId,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    #[serde(default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Read-only list of choice texts some API versions send instead of `choices`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices_display: Vec<String>,
}

impl Question {
    pub fn choice(&self, id: ChoiceId) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == id)
    }

    pub fn has_choice(&self, id: ChoiceId) -> bool {
        self.choice(id).is_some()
    }

    pub fn choice_ids(&self) -> Vec<ChoiceId> {
        self.choices.iter().map(|c| c.id).collect()
    }

    /// Choice texts in order, falling back to `choices_display` when no full choices were sent.
    pub fn choice_texts(&self) -> Vec<String> {
        if self.choices.is_empty() {
            self.choices_display.clone()
        } else {
            self.choices.iter().map(|c| c.text.clone()).collect()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    #[serde(default)]
    pub id: Option<UserId>,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Survey {
    pub id: SurveyId,
    pub title: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserRef>,
    /// The caller's own earlier answers, included in detail responses for a logged-in user.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_answers: Vec<SubmittedAnswer>,
}

impl Survey {
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SurveySummary {
    pub id: SurveyId,
    pub title: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SurveyListing {
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub surveys: Vec<SurveySummary>,
}

/// Body of create and update requests. Choices travel as plain texts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SurveyPayload {
    pub title: String,
    pub is_active: bool,
    pub questions: Vec<QuestionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QuestionId>,
    pub text: String,
    pub question_type: QuestionType,
    pub choices: Vec<String>,
}

// ========== Answers ==========

/// The one populated field of an answer, keyed by what the question asks for.
/// Radio and checkbox answers both travel as `choice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Choice(ChoiceId),
    Text(String),
    Rating(u8),
    YesNo(bool),
    Ranking(Vec<ChoiceId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireAnswer", try_from = "WireAnswer")]
pub struct AnswerRecord {
    pub question: QuestionId,
    pub value: AnswerValue,
}

impl AnswerRecord {
    pub fn new(question: QuestionId, value: AnswerValue) -> Self {
        Self { question, value }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireAnswer {
    question: QuestionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    choice: Option<ChoiceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating_answer: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    yesno_answer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ranking_answer: Option<Vec<ChoiceId>>,
}

impl From<AnswerRecord> for WireAnswer {
    fn from(record: AnswerRecord) -> Self {
        let mut wire = WireAnswer {
            question: record.question,
            ..WireAnswer::default()
        };
        match record.value {
            AnswerValue::Choice(id) => wire.choice = Some(id),
            AnswerValue::Text(text) => wire.text_answer = Some(text),
            AnswerValue::Rating(rating) => wire.rating_answer = Some(i64::from(rating)),
            AnswerValue::YesNo(yes) => wire.yesno_answer = Some(yes),
            AnswerValue::Ranking(order) => wire.ranking_answer = Some(order),
        }
        wire
    }
}

impl TryFrom<WireAnswer> for AnswerRecord {
    type Error = ValidationError;

    fn try_from(wire: WireAnswer) -> Result<Self, Self::Error> {
        let mut values = Vec::with_capacity(1);
        if let Some(id) = wire.choice {
            values.push(AnswerValue::Choice(id));
        }
        if let Some(text) = wire.text_answer {
            values.push(AnswerValue::Text(text));
        }
        if let Some(rating) = wire.rating_answer {
            let rating = u8::try_from(rating)
                .ok()
                .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
                .ok_or_else(|| {
                    ValidationError::new(
                        "rating_answer",
                        format!("rating {rating} is outside {MIN_RATING}..={MAX_RATING}"),
                    )
                })?;
            values.push(AnswerValue::Rating(rating));
        }
        if let Some(yes) = wire.yesno_answer {
            values.push(AnswerValue::YesNo(yes));
        }
        if let Some(order) = wire.ranking_answer {
            values.push(AnswerValue::Ranking(order));
        }

        if values.len() != 1 {
            return Err(ValidationError::new(
                "answer",
                format!(
                    "expected exactly one populated answer field for question {}, found {}",
                    wire.question,
                    values.len()
                ),
            ));
        }

        Ok(AnswerRecord {
            question: wire.question,
            value: values.remove(0),
        })
    }
}

/// An answer as stored by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmittedAnswer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub record: AnswerRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// ========== Auth & profiles ==========

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<UserId>,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn role(&self) -> UserRole {
        if self.is_staff {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }

    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("not specified")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfilePage {
    pub user: UserProfile,
    /// Surveys the user has answered.
    #[serde(default)]
    pub surveys: Vec<SurveySummary>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}
