//! Answering state for one survey: a typed draft per question, and the conversion
//! into the answer records the API accepts.
use crate::domain::models::{
    AnswerRecord, AnswerValue, ChoiceId, Question, QuestionId, QuestionType, Survey, SurveyId,
    MAX_RATING, MIN_RATING,
};
use crate::error::{ValidationError, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Whether unanswered questions block submission.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmitPolicy {
    /// Unanswered questions are left out of the payload.
    #[default]
    Lenient,
    /// Every question must be answered.
    Strict,
}

impl SubmitPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitPolicy::Lenient => "lenient",
            SubmitPolicy::Strict => "strict",
        }
    }
}

impl TryFrom<&str> for SubmitPolicy {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "lenient" | "partial" => Ok(SubmitPolicy::Lenient),
            "strict" | "complete" => Ok(SubmitPolicy::Strict),
            other => Err(ValidationError::new(
                "submit_policy",
                format!("unknown submit policy '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerDraft {
    Radio(Option<ChoiceId>),
    Checkbox(BTreeSet<ChoiceId>),
    Text(String),
    Rating(u8),
    YesNo(Option<bool>),
    Ranking(Vec<ChoiceId>),
}

impl AnswerDraft {
    pub fn initial(question: &Question) -> Self {
        match question.question_type {
            QuestionType::Radio => AnswerDraft::Radio(None),
            QuestionType::Checkbox => AnswerDraft::Checkbox(BTreeSet::new()),
            QuestionType::Text => AnswerDraft::Text(String::new()),
            QuestionType::Rating => AnswerDraft::Rating(MIN_RATING),
            QuestionType::YesNo => AnswerDraft::YesNo(None),
            QuestionType::Ranking => AnswerDraft::Ranking(question.choice_ids()),
        }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            AnswerDraft::Radio(_) => QuestionType::Radio,
            AnswerDraft::Checkbox(_) => QuestionType::Checkbox,
            AnswerDraft::Text(_) => QuestionType::Text,
            AnswerDraft::Rating(_) => QuestionType::Rating,
            AnswerDraft::YesNo(_) => QuestionType::YesNo,
            AnswerDraft::Ranking(_) => QuestionType::Ranking,
        }
    }

    pub fn is_answered(&self) -> bool {
        match self {
            AnswerDraft::Radio(choice) => choice.is_some(),
            AnswerDraft::Checkbox(selected) => !selected.is_empty(),
            AnswerDraft::Text(text) => !text.trim().is_empty(),
            AnswerDraft::Rating(_) => true,
            AnswerDraft::YesNo(value) => value.is_some(),
            AnswerDraft::Ranking(order) => !order.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    question: Question,
    draft: AnswerDraft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseForm {
    survey_id: SurveyId,
    entries: Vec<Entry>,
}

impl ResponseForm {
    pub fn from_detail_response(survey: &Survey) -> Self {
        let entries = survey
            .questions
            .iter()
            .map(|question| Entry {
                draft: AnswerDraft::initial(question),
                question: question.clone(),
            })
            .collect();
        Self {
            survey_id: survey.id,
            entries,
        }
    }

    pub fn survey_id(&self) -> SurveyId {
        self.survey_id
    }

    pub fn draft(&self, question_id: QuestionId) -> Option<&AnswerDraft> {
        self.entries
            .iter()
            .find(|e| e.question.id == question_id)
            .map(|e| &e.draft)
    }

    pub fn ranking(&self, question_id: QuestionId) -> Option<&[ChoiceId]> {
        match self.draft(question_id)? {
            AnswerDraft::Ranking(order) => Some(order),
            _ => None,
        }
    }

    pub fn select_choice(
        &mut self,
        question_id: QuestionId,
        choice_id: ChoiceId,
    ) -> Result<(), ValidationError> {
        let entry = self.entry_with_choice(question_id, choice_id)?;
        match &mut entry.draft {
            AnswerDraft::Radio(selected) => {
                *selected = Some(choice_id);
                Ok(())
            }
            other => Err(type_mismatch(question_id, QuestionType::Radio, other)),
        }
    }

    /// Flips one checkbox; returns whether it is now selected.
    pub fn toggle_choice(
        &mut self,
        question_id: QuestionId,
        choice_id: ChoiceId,
    ) -> Result<bool, ValidationError> {
        let entry = self.entry_with_choice(question_id, choice_id)?;
        match &mut entry.draft {
            AnswerDraft::Checkbox(selected) => {
                if selected.remove(&choice_id) {
                    Ok(false)
                } else {
                    selected.insert(choice_id);
                    Ok(true)
                }
            }
            other => Err(type_mismatch(question_id, QuestionType::Checkbox, other)),
        }
    }

    pub fn set_text(
        &mut self,
        question_id: QuestionId,
        text: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let entry = self.entry_mut(question_id)?;
        match &mut entry.draft {
            AnswerDraft::Text(current) => {
                *current = text.into();
                Ok(())
            }
            other => Err(type_mismatch(question_id, QuestionType::Text, other)),
        }
    }

    pub fn set_rating(&mut self, question_id: QuestionId, rating: u8) -> Result<(), ValidationError> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ValidationError::new(
                answer_field(question_id),
                format!("rating must be between {MIN_RATING} and {MAX_RATING}"),
            ));
        }
        let entry = self.entry_mut(question_id)?;
        match &mut entry.draft {
            AnswerDraft::Rating(current) => {
                *current = rating;
                Ok(())
            }
            other => Err(type_mismatch(question_id, QuestionType::Rating, other)),
        }
    }

    pub fn set_yes_no(&mut self, question_id: QuestionId, yes: bool) -> Result<(), ValidationError> {
        let entry = self.entry_mut(question_id)?;
        match &mut entry.draft {
            AnswerDraft::YesNo(current) => {
                *current = Some(yes);
                Ok(())
            }
            other => Err(type_mismatch(question_id, QuestionType::YesNo, other)),
        }
    }

    /// Swaps the choice with its predecessor. No-op when it is already first.
    pub fn move_up(
        &mut self,
        question_id: QuestionId,
        choice_id: ChoiceId,
    ) -> Result<(), ValidationError> {
        let order = self.ranking_mut(question_id)?;
        let position = ranking_position(order.as_slice(), question_id, choice_id)?;
        if position > 0 {
            order.swap(position - 1, position);
        }
        Ok(())
    }

    /// Swaps the choice with its successor. No-op when it is already last.
    pub fn move_down(
        &mut self,
        question_id: QuestionId,
        choice_id: ChoiceId,
    ) -> Result<(), ValidationError> {
        let order = self.ranking_mut(question_id)?;
        let position = ranking_position(order.as_slice(), question_id, choice_id)?;
        if position + 1 < order.len() {
            order.swap(position, position + 1);
        }
        Ok(())
    }

    pub fn unanswered(&self) -> Vec<QuestionId> {
        self.entries
            .iter()
            .filter(|e| !e.draft.is_answered())
            .map(|e| e.question.id)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.draft.is_answered())
    }

    pub fn to_answer_payload(
        &self,
        policy: SubmitPolicy,
    ) -> Result<Vec<AnswerRecord>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut records = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let question = &entry.question;
            if !entry.draft.is_answered() {
                match policy {
                    SubmitPolicy::Lenient => {
                        tracing::debug!(question_id = question.id, "Omitting unanswered question");
                    }
                    SubmitPolicy::Strict => {
                        errors.push(answer_field(question.id), missing_answer_reason(question));
                    }
                }
                continue;
            }

            match &entry.draft {
                AnswerDraft::Radio(Some(choice)) => {
                    records.push(AnswerRecord::new(question.id, AnswerValue::Choice(*choice)));
                }
                AnswerDraft::Checkbox(selected) => {
                    // Fan out in the question's choice order.
                    records.extend(
                        question
                            .choices
                            .iter()
                            .filter(|c| selected.contains(&c.id))
                            .map(|c| AnswerRecord::new(question.id, AnswerValue::Choice(c.id))),
                    );
                }
                AnswerDraft::Text(text) => {
                    records.push(AnswerRecord::new(
                        question.id,
                        AnswerValue::Text(text.trim().to_string()),
                    ));
                }
                AnswerDraft::Rating(rating) => {
                    records.push(AnswerRecord::new(question.id, AnswerValue::Rating(*rating)));
                }
                AnswerDraft::YesNo(Some(yes)) => {
                    records.push(AnswerRecord::new(question.id, AnswerValue::YesNo(*yes)));
                }
                AnswerDraft::Ranking(order) => {
                    records.push(AnswerRecord::new(
                        question.id,
                        AnswerValue::Ranking(order.clone()),
                    ));
                }
                AnswerDraft::Radio(None) | AnswerDraft::YesNo(None) => {}
            }
        }

        errors.into_result().map(|_| records)
    }

    fn entry_mut(&mut self, question_id: QuestionId) -> Result<&mut Entry, ValidationError> {
        self.entries
            .iter_mut()
            .find(|e| e.question.id == question_id)
            .ok_or_else(|| ValidationError::new(answer_field(question_id), "no such question"))
    }

    fn entry_with_choice(
        &mut self,
        question_id: QuestionId,
        choice_id: ChoiceId,
    ) -> Result<&mut Entry, ValidationError> {
        let entry = self.entry_mut(question_id)?;
        if !entry.question.has_choice(choice_id) {
            return Err(ValidationError::new(
                answer_field(question_id),
                format!("choice {choice_id} does not belong to this question"),
            ));
        }
        Ok(entry)
    }

    fn ranking_mut(&mut self, question_id: QuestionId) -> Result<&mut Vec<ChoiceId>, ValidationError> {
        let entry = self.entry_mut(question_id)?;
        match &mut entry.draft {
            AnswerDraft::Ranking(order) => Ok(order),
            other => Err(type_mismatch(question_id, QuestionType::Ranking, other)),
        }
    }
}

fn answer_field(question_id: QuestionId) -> String {
    format!("answers[{question_id}]")
}

fn type_mismatch(question_id: QuestionId, expected: QuestionType, draft: &AnswerDraft) -> ValidationError {
    ValidationError::new(
        answer_field(question_id),
        format!(
            "expected a {} question, found {}",
            expected.as_str(),
            draft.question_type().as_str()
        ),
    )
}

fn ranking_position(
    order: &[ChoiceId],
    question_id: QuestionId,
    choice_id: ChoiceId,
) -> Result<usize, ValidationError> {
    order.iter().position(|id| *id == choice_id).ok_or_else(|| {
        ValidationError::new(
            answer_field(question_id),
            format!("choice {choice_id} is not part of the ranking"),
        )
    })
}

fn missing_answer_reason(question: &Question) -> String {
    match question.question_type {
        QuestionType::Radio => format!("select an option for \"{}\"", question.text),
        QuestionType::Checkbox => format!("select at least one option for \"{}\"", question.text),
        QuestionType::Text => format!("enter text for \"{}\"", question.text),
        QuestionType::Rating => format!(
            "pick a rating from {MIN_RATING} to {MAX_RATING} for \"{}\"",
            question.text
        ),
        QuestionType::YesNo => format!("answer yes or no for \"{}\"", question.text),
        QuestionType::Ranking => format!("rank all options for \"{}\"", question.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Choice;
    use proptest::prelude::*;

    fn question(id: QuestionId, question_type: QuestionType, choice_ids: &[ChoiceId]) -> Question {
        Question {
            id,
            text: format!("Question {id}"),
            question_type,
            choices: choice_ids
                .iter()
                .map(|cid| Choice {
                    id: *cid,
                    text: format!("Choice {cid}"),
                })
                .collect(),
            choices_display: Vec::new(),
        }
    }

    fn sample_survey() -> Survey {
        Survey {
            id: 5,
            title: "Office".to_string(),
            is_active: true,
            author: None,
            user_answers: Vec::new(),
            questions: vec![
                question(1, QuestionType::Radio, &[10, 11]),
                question(2, QuestionType::Checkbox, &[20, 21, 22]),
                question(3, QuestionType::Text, &[]),
                question(4, QuestionType::Rating, &[]),
                question(5, QuestionType::YesNo, &[]),
                question(6, QuestionType::Ranking, &[1, 2, 3]),
            ],
        }
    }

    #[test]
    fn test_initial_drafts() {
        let form = ResponseForm::from_detail_response(&sample_survey());
        assert_eq!(form.draft(1), Some(&AnswerDraft::Radio(None)));
        assert_eq!(form.draft(2), Some(&AnswerDraft::Checkbox(BTreeSet::new())));
        assert_eq!(form.draft(3), Some(&AnswerDraft::Text(String::new())));
        assert_eq!(form.draft(4), Some(&AnswerDraft::Rating(1)));
        assert_eq!(form.draft(5), Some(&AnswerDraft::YesNo(None)));
        assert_eq!(form.ranking(6), Some(&[1, 2, 3][..]));
        assert_eq!(form.unanswered(), vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_ranking_down_move() {
        let mut form = ResponseForm::from_detail_response(&sample_survey());
        form.move_down(6, 1).unwrap();
        assert_eq!(form.ranking(6), Some(&[2, 1, 3][..]));
    }

    #[test]
    fn test_ranking_boundaries_are_noops() {
        let mut form = ResponseForm::from_detail_response(&sample_survey());
        form.move_up(6, 1).unwrap();
        form.move_down(6, 3).unwrap();
        assert_eq!(form.ranking(6), Some(&[1, 2, 3][..]));
        assert!(form.move_up(6, 99).is_err());
        assert!(form.move_up(1, 10).is_err());
    }

    #[test]
    fn test_full_payload() {
        let mut form = ResponseForm::from_detail_response(&sample_survey());
        form.select_choice(1, 11).unwrap();
        assert!(form.toggle_choice(2, 22).unwrap());
        assert!(form.toggle_choice(2, 20).unwrap());
        form.set_text(3, "  more plants  ").unwrap();
        form.set_rating(4, 7).unwrap();
        form.set_yes_no(5, true).unwrap();
        form.move_up(6, 3).unwrap();

        assert!(form.is_complete());
        let records = form.to_answer_payload(SubmitPolicy::Strict).unwrap();
        assert_eq!(
            records,
            vec![
                AnswerRecord::new(1, AnswerValue::Choice(11)),
                AnswerRecord::new(2, AnswerValue::Choice(20)),
                AnswerRecord::new(2, AnswerValue::Choice(22)),
                AnswerRecord::new(3, AnswerValue::Text("more plants".to_string())),
                AnswerRecord::new(4, AnswerValue::Rating(7)),
                AnswerRecord::new(5, AnswerValue::YesNo(true)),
                AnswerRecord::new(6, AnswerValue::Ranking(vec![1, 3, 2])),
            ]
        );
    }

    #[test]
    fn test_lenient_policy_omits_unanswered() {
        let form = ResponseForm::from_detail_response(&sample_survey());
        let records = form.to_answer_payload(SubmitPolicy::Lenient).unwrap();
        let questions: Vec<QuestionId> = records.iter().map(|r| r.question).collect();
        assert_eq!(questions, vec![4, 6]);
    }

    #[test]
    fn test_strict_policy_reports_unanswered() {
        let form = ResponseForm::from_detail_response(&sample_survey());
        let err = form.to_answer_payload(SubmitPolicy::Strict).unwrap_err();
        assert_eq!(err.len(), 4);
        assert!(err.has_field("answers[1]"));
        assert!(err.has_field("answers[5]"));
    }

    #[test]
    fn test_checkbox_toggle_off_yields_no_records() {
        let mut form = ResponseForm::from_detail_response(&sample_survey());
        assert!(form.toggle_choice(2, 21).unwrap());
        assert!(!form.toggle_choice(2, 21).unwrap());
        let records = form.to_answer_payload(SubmitPolicy::Lenient).unwrap();
        assert!(records.iter().all(|r| r.question != 2));
    }

    #[test]
    fn test_setters_reject_bad_input() {
        let mut form = ResponseForm::from_detail_response(&sample_survey());
        let before = form.clone();
        assert!(form.set_rating(4, 0).is_err());
        assert!(form.set_rating(4, 11).is_err());
        assert!(form.select_choice(1, 20).is_err());
        assert!(form.select_choice(2, 20).is_err());
        assert!(form.set_text(1, "nope").is_err());
        assert!(form.set_yes_no(99, true).is_err());
        assert_eq!(form, before);
    }

    #[test]
    fn test_whitespace_text_counts_as_unanswered() {
        let mut form = ResponseForm::from_detail_response(&sample_survey());
        form.set_text(3, "   ").unwrap();
        assert!(form.unanswered().contains(&3));
    }

    #[test]
    fn test_submit_policy_parsing() {
        assert_eq!(SubmitPolicy::try_from("Strict").unwrap(), SubmitPolicy::Strict);
        assert_eq!(SubmitPolicy::try_from("lenient").unwrap(), SubmitPolicy::Lenient);
        assert!(SubmitPolicy::try_from("sometimes").is_err());
    }

    proptest! {
        #[test]
        fn prop_checkbox_fan_out_matches_selection(
            picks in prop::collection::btree_set(20i64..23, 0..=3),
        ) {
            let mut form = ResponseForm::from_detail_response(&sample_survey());
            for pick in &picks {
                form.toggle_choice(2, *pick).unwrap();
            }
            let records = form.to_answer_payload(SubmitPolicy::Lenient).unwrap();
            let fanned: Vec<ChoiceId> = records
                .iter()
                .filter(|r| r.question == 2)
                .map(|r| match r.value {
                    AnswerValue::Choice(id) => id,
                    _ => panic!("checkbox answers carry a choice"),
                })
                .collect();
            prop_assert_eq!(fanned, picks.into_iter().collect::<Vec<_>>());
        }

        #[test]
        fn prop_ranking_moves_are_adjacent_transpositions(
            moves in prop::collection::vec((any::<bool>(), 1i64..=3), 0..12),
        ) {
            let mut form = ResponseForm::from_detail_response(&sample_survey());
            for (up, choice) in moves {
                let before = form.ranking(6).unwrap().to_vec();
                let position = before.iter().position(|id| *id == choice).unwrap();
                if up {
                    form.move_up(6, choice).unwrap();
                } else {
                    form.move_down(6, choice).unwrap();
                }
                let after = form.ranking(6).unwrap().to_vec();

                let mut expected = before.clone();
                if up && position > 0 {
                    expected.swap(position - 1, position);
                } else if !up && position + 1 < expected.len() {
                    expected.swap(position, position + 1);
                }
                prop_assert_eq!(after, expected);
            }
        }
    }
}
