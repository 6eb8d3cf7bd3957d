pub mod history;
pub mod models;
pub mod response_form;
pub mod survey_form;

pub use models::{
    AnswerRecord, AnswerValue, Choice, Question, QuestionType, Survey, SurveyPayload,
    SurveySummary,
};
pub use response_form::{AnswerDraft, ResponseForm, SubmitPolicy};
pub use survey_form::{QuestionDraft, SurveyForm};
