//! Authoring state for creating and editing surveys.
//! Keeps at least one question, and at least one choice slot per question.
use crate::domain::models::{QuestionId, QuestionPayload, QuestionType, Survey, SurveyPayload};
use crate::error::{ValidationError, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub id: Option<QuestionId>,
    pub text: String,
    pub question_type: QuestionType,
    pub choices: Vec<String>,
}

impl QuestionDraft {
    pub fn blank() -> Self {
        Self {
            id: None,
            text: String::new(),
            question_type: QuestionType::Radio,
            choices: vec![String::new()],
        }
    }

    /// Choices that survive submission: whitespace-only entries dropped, the rest sent as typed.
    pub fn submitted_choices(&self) -> Vec<String> {
        if !self.question_type.has_choices() {
            return Vec::new();
        }
        self.choices
            .iter()
            .filter(|c| !c.trim().is_empty())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyForm {
    pub title: String,
    pub is_active: bool,
    questions: Vec<QuestionDraft>,
}

impl Default for SurveyForm {
    fn default() -> Self {
        Self::new()
    }
}

impl SurveyForm {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            is_active: true,
            questions: vec![QuestionDraft::blank()],
        }
    }

    /// Edit form for an existing survey. Question ids are kept so updates can reference them.
    pub fn from_survey(survey: &Survey) -> Self {
        let mut questions: Vec<QuestionDraft> = survey
            .questions
            .iter()
            .map(|q| {
                let mut choices = q.choice_texts();
                if choices.is_empty() {
                    choices.push(String::new());
                }
                QuestionDraft {
                    id: Some(q.id),
                    text: q.text.clone(),
                    question_type: q.question_type,
                    choices,
                }
            })
            .collect();

        if questions.is_empty() {
            questions.push(QuestionDraft::blank());
        }

        Self {
            title: survey.title.clone(),
            is_active: survey.is_active,
            questions,
        }
    }

    pub fn questions(&self) -> &[QuestionDraft] {
        &self.questions
    }

    pub fn question(&self, index: usize) -> Option<&QuestionDraft> {
        self.questions.get(index)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    pub fn add_question(&mut self) -> usize {
        self.questions.push(QuestionDraft::blank());
        self.questions.len() - 1
    }

    pub fn remove_question(&mut self, index: usize) -> Result<QuestionDraft, ValidationError> {
        self.check_question(index)?;
        if self.questions.len() == 1 {
            tracing::debug!("Refusing to remove the last question");
            return Err(ValidationError::new(
                "questions",
                "cannot remove the last question; a survey needs at least one question",
            ));
        }
        Ok(self.questions.remove(index))
    }

    pub fn set_question_text(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), ValidationError> {
        self.question_mut(index)?.text = text.into();
        Ok(())
    }

    /// Changing the type keeps the choice list; it is ignored at serialization for non-choice types.
    pub fn set_question_type(
        &mut self,
        index: usize,
        question_type: QuestionType,
    ) -> Result<(), ValidationError> {
        self.question_mut(index)?.question_type = question_type;
        Ok(())
    }

    pub fn add_choice(&mut self, question_index: usize) -> Result<usize, ValidationError> {
        let question = self.question_mut(question_index)?;
        question.choices.push(String::new());
        Ok(question.choices.len() - 1)
    }

    pub fn set_choice_text(
        &mut self,
        question_index: usize,
        choice_index: usize,
        text: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let question = self.question_mut(question_index)?;
        let slot = question.choices.get_mut(choice_index).ok_or_else(|| {
            ValidationError::new(
                format!("questions[{question_index}].choices[{choice_index}]"),
                "no such choice",
            )
        })?;
        *slot = text.into();
        Ok(())
    }

    pub fn remove_choice(
        &mut self,
        question_index: usize,
        choice_index: usize,
    ) -> Result<String, ValidationError> {
        let question = self.question_mut(question_index)?;
        if choice_index >= question.choices.len() {
            return Err(ValidationError::new(
                format!("questions[{question_index}].choices[{choice_index}]"),
                "no such choice",
            ));
        }
        if question.choices.len() == 1 {
            tracing::debug!(question_index, "Refusing to remove the last choice");
            return Err(ValidationError::new(
                format!("questions[{question_index}].choices"),
                "cannot remove the last choice",
            ));
        }
        Ok(question.choices.remove(choice_index))
    }

    pub fn to_create_payload(&self) -> Result<SurveyPayload, ValidationErrors> {
        self.survey_payload(false)
    }

    pub fn to_update_payload(&self) -> Result<SurveyPayload, ValidationErrors> {
        self.survey_payload(true)
    }

    /// Body for appending questions to an existing survey.
    pub fn to_questions_payload(&self) -> Result<Vec<QuestionPayload>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let questions = self.question_payloads(false, &mut errors);
        errors.into_result().map(|_| questions)
    }

    fn survey_payload(&self, keep_ids: bool) -> Result<SurveyPayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = normalize_title(&self.title);
        if title.is_empty() {
            errors.push("title", "survey title must not be empty");
        }

        let questions = self.question_payloads(keep_ids, &mut errors);
        errors.into_result()?;

        Ok(SurveyPayload {
            title,
            is_active: self.is_active,
            questions,
        })
    }

    fn question_payloads(
        &self,
        keep_ids: bool,
        errors: &mut ValidationErrors,
    ) -> Vec<QuestionPayload> {
        self.questions
            .iter()
            .enumerate()
            .map(|(index, draft)| {
                let text = draft.text.trim().to_string();
                if text.is_empty() {
                    errors.push(
                        format!("questions[{index}].text"),
                        "question text must not be empty",
                    );
                }

                let choices = draft.submitted_choices();
                if draft.question_type.has_choices() && choices.is_empty() {
                    errors.push(
                        format!("questions[{index}].choices"),
                        format!(
                            "a {} question needs at least one non-empty choice",
                            draft.question_type.as_str()
                        ),
                    );
                }

                QuestionPayload {
                    id: if keep_ids { draft.id } else { None },
                    text,
                    question_type: draft.question_type,
                    choices,
                }
            })
            .collect()
    }

    fn check_question(&self, index: usize) -> Result<(), ValidationError> {
        if index < self.questions.len() {
            Ok(())
        } else {
            Err(ValidationError::new(
                format!("questions[{index}]"),
                "no such question",
            ))
        }
    }

    fn question_mut(&mut self, index: usize) -> Result<&mut QuestionDraft, ValidationError> {
        self.questions
            .get_mut(index)
            .ok_or_else(|| ValidationError::new(format!("questions[{index}]"), "no such question"))
    }
}

/// Trims the title and drops one pair of stray surrounding double quotes.
pub fn normalize_title(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.trim().to_string()
}
