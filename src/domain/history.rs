use crate::domain::models::{AnswerValue, ChoiceId, Question, QuestionId, SubmittedAnswer, Survey, MAX_RATING};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AnswerLine {
    pub question_id: QuestionId,
    pub question: String,
    pub answer: String,
    pub answered_at: Option<DateTime<Utc>>,
}

pub fn describe_answer(question: &Question, value: &AnswerValue) -> String {
    match value {
        AnswerValue::Choice(id) => choice_text(question, *id),
        AnswerValue::Text(text) => text.clone(),
        AnswerValue::Rating(rating) => format!("{rating}/{MAX_RATING}"),
        AnswerValue::YesNo(true) => "Yes".to_string(),
        AnswerValue::YesNo(false) => "No".to_string(),
        AnswerValue::Ranking(order) => order
            .iter()
            .enumerate()
            .map(|(rank, id)| format!("{}. {}", rank + 1, choice_text(question, *id)))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// One line per answered question, in survey order. Checkbox records of the same
/// question are merged; answers to questions no longer in the survey are dropped.
pub fn summarize(survey: &Survey, answers: &[SubmittedAnswer]) -> Vec<AnswerLine> {
    survey
        .questions
        .iter()
        .filter_map(|question| {
            let mine: Vec<&SubmittedAnswer> = answers
                .iter()
                .filter(|a| a.record.question == question.id)
                .collect();
            if mine.is_empty() {
                return None;
            }

            let answer = mine
                .iter()
                .map(|a| describe_answer(question, &a.record.value))
                .collect::<Vec<_>>()
                .join("; ");
            let answered_at = mine.iter().filter_map(|a| a.created_at).max();

            Some(AnswerLine {
                question_id: question.id,
                question: question.text.clone(),
                answer,
                answered_at,
            })
        })
        .collect()
}

fn choice_text(question: &Question, id: ChoiceId) -> String {
    question
        .choice(id)
        .map(|c| c.text.clone())
        .unwrap_or_else(|| format!("#{id}"))
}
