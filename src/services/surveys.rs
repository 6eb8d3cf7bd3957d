use crate::domain::models::{Survey, SurveyId, SurveyListing};
use crate::domain::response_form::{ResponseForm, SubmitPolicy};
use crate::domain::survey_form::SurveyForm;
use crate::error::ClientResult;
use crate::services::api::SurveyApi;
use crate::services::request_tracker::RequestTracker;
use std::sync::Arc;

/// Glue between the form models and the API: validation happens locally before any call,
/// and view loads go through the request tracker so stale responses are dropped.
#[derive(Clone)]
pub struct SurveyWorkflow {
    api: Arc<dyn SurveyApi>,
    tracker: RequestTracker,
    policy: SubmitPolicy,
}

impl SurveyWorkflow {
    pub fn new(api: Arc<dyn SurveyApi>, tracker: RequestTracker, policy: SubmitPolicy) -> Self {
        Self {
            api,
            tracker,
            policy,
        }
    }

    pub fn policy(&self) -> SubmitPolicy {
        self.policy
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// `None` means a newer list request superseded this one, whether this one
    /// succeeded or failed.
    pub async fn list(&self) -> ClientResult<Option<SurveyListing>> {
        let ticket = self.tracker.begin("surveys").await;
        let result = self.api.list_surveys().await;
        self.tracker.settle(&ticket, result).await
    }

    pub async fn show(&self, id: SurveyId) -> ClientResult<Option<Survey>> {
        let ticket = self.tracker.begin(&survey_key(id)).await;
        let result = self.api.get_survey(id).await;
        self.tracker.settle(&ticket, result).await
    }

    pub async fn create(&self, form: &SurveyForm) -> ClientResult<Survey> {
        let payload = form.to_create_payload()?;
        self.api.create_survey(&payload).await
    }

    pub async fn load_for_edit(&self, id: SurveyId) -> ClientResult<Option<SurveyForm>> {
        Ok(self.show(id).await?.map(|survey| SurveyForm::from_survey(&survey)))
    }

    pub async fn save(&self, id: SurveyId, form: &SurveyForm) -> ClientResult<Survey> {
        let payload = form.to_update_payload()?;
        self.api.update_survey(id, &payload).await
    }

    /// Appends every question of `form` to an existing survey; the form title is ignored.
    pub async fn append_questions(&self, id: SurveyId, form: &SurveyForm) -> ClientResult<usize> {
        let questions = form.to_questions_payload()?;
        self.api.add_questions(id, &questions).await?;
        Ok(questions.len())
    }

    pub async fn delete(&self, id: SurveyId) -> ClientResult<()> {
        self.api.delete_survey(id).await?;
        self.tracker.reset(&survey_key(id)).await;
        Ok(())
    }

    pub async fn load_for_answering(&self, id: SurveyId) -> ClientResult<Option<ResponseForm>> {
        Ok(self
            .show(id)
            .await?
            .map(|survey| ResponseForm::from_detail_response(&survey)))
    }

    /// Returns how many answer records were sent.
    pub async fn submit(&self, form: &ResponseForm) -> ClientResult<usize> {
        let records = form.to_answer_payload(self.policy)?;
        if records.is_empty() {
            tracing::warn!(
                "Submitting survey {} with no answers (policy {})",
                form.survey_id(),
                self.policy.as_str()
            );
        }
        self.api.submit_answers(form.survey_id(), &records).await?;
        Ok(records.len())
    }
}

fn survey_key(id: SurveyId) -> String {
    format!("survey:{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        AnswerRecord, AnswerValue, AuthResponse, Choice, LoginRequest, ProfilePage, ProfileUpdate,
        Question, QuestionPayload, QuestionType, RegisterRequest, SurveyPayload, UserProfile,
    };
    use crate::error::{ClientError, ErrorKind};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorded {
        created: Vec<SurveyPayload>,
        updated: Vec<(SurveyId, SurveyPayload)>,
        appended: Vec<(SurveyId, Vec<QuestionPayload>)>,
        submitted: Vec<(SurveyId, Vec<AnswerRecord>)>,
        deleted: Vec<SurveyId>,
    }

    struct FakeApi {
        survey: Survey,
        recorded: Mutex<Recorded>,
        // Starts a competing request while a fetch is in flight.
        interrupt: Option<RequestTracker>,
    }

    impl FakeApi {
        fn new(survey: Survey) -> Self {
            Self {
                survey,
                recorded: Mutex::new(Recorded::default()),
                interrupt: None,
            }
        }
    }

    #[async_trait]
    impl SurveyApi for FakeApi {
        async fn register(&self, _request: &RegisterRequest) -> ClientResult<AuthResponse> {
            unimplemented!()
        }

        async fn login(&self, _request: &LoginRequest) -> ClientResult<AuthResponse> {
            unimplemented!()
        }

        async fn list_surveys(&self) -> ClientResult<SurveyListing> {
            Ok(SurveyListing::default())
        }

        async fn get_survey(&self, id: SurveyId) -> ClientResult<Survey> {
            if let Some(tracker) = &self.interrupt {
                tracker.begin(&survey_key(id)).await;
            }
            if id == self.survey.id {
                Ok(self.survey.clone())
            } else {
                Err(ClientError::Status {
                    status: reqwest::StatusCode::NOT_FOUND,
                    message: "Not found.".to_string(),
                })
            }
        }

        async fn create_survey(&self, payload: &SurveyPayload) -> ClientResult<Survey> {
            self.recorded.lock().unwrap().created.push(payload.clone());
            Ok(Survey {
                id: 99,
                title: payload.title.clone(),
                ..self.survey.clone()
            })
        }

        async fn update_survey(&self, id: SurveyId, payload: &SurveyPayload) -> ClientResult<Survey> {
            self.recorded
                .lock()
                .unwrap()
                .updated
                .push((id, payload.clone()));
            Ok(self.survey.clone())
        }

        async fn delete_survey(&self, id: SurveyId) -> ClientResult<()> {
            self.recorded.lock().unwrap().deleted.push(id);
            Ok(())
        }

        async fn add_questions(&self, id: SurveyId, questions: &[QuestionPayload]) -> ClientResult<()> {
            self.recorded
                .lock()
                .unwrap()
                .appended
                .push((id, questions.to_vec()));
            Ok(())
        }

        async fn submit_answers(&self, id: SurveyId, answers: &[AnswerRecord]) -> ClientResult<()> {
            self.recorded
                .lock()
                .unwrap()
                .submitted
                .push((id, answers.to_vec()));
            Ok(())
        }

        async fn get_profile(&self, _username: &str) -> ClientResult<ProfilePage> {
            unimplemented!()
        }

        async fn update_profile(
            &self,
            _username: &str,
            _update: &ProfileUpdate,
        ) -> ClientResult<UserProfile> {
            unimplemented!()
        }

        async fn delete_profile(&self, _username: &str) -> ClientResult<()> {
            unimplemented!()
        }
    }

    fn sample_survey() -> Survey {
        Survey {
            id: 5,
            title: "Lunch".to_string(),
            is_active: true,
            author: None,
            user_answers: Vec::new(),
            questions: vec![
                Question {
                    id: 10,
                    text: "Sides".to_string(),
                    question_type: QuestionType::Checkbox,
                    choices: vec![
                        Choice {
                            id: 1,
                            text: "Fries".to_string(),
                        },
                        Choice {
                            id: 2,
                            text: "Salad".to_string(),
                        },
                    ],
                    choices_display: Vec::new(),
                },
                Question {
                    id: 11,
                    text: "Comments".to_string(),
                    question_type: QuestionType::Text,
                    choices: Vec::new(),
                    choices_display: Vec::new(),
                },
            ],
        }
    }

    fn workflow(api: Arc<FakeApi>, policy: SubmitPolicy) -> SurveyWorkflow {
        SurveyWorkflow::new(api, RequestTracker::new(), policy)
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_api() {
        let api = Arc::new(FakeApi::new(sample_survey()));
        let flow = workflow(api.clone(), SubmitPolicy::Lenient);

        let err = flow.create(&SurveyForm::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(api.recorded.lock().unwrap().created.is_empty());
    }

    #[tokio::test]
    async fn test_create_sends_trimmed_payload() {
        let api = Arc::new(FakeApi::new(sample_survey()));
        let flow = workflow(api.clone(), SubmitPolicy::Lenient);

        let mut form = SurveyForm::new();
        form.set_title("Team lunch");
        form.set_question_text(0, "Where?").unwrap();
        form.set_choice_text(0, 0, "Cafe").unwrap();
        form.add_choice(0).unwrap();

        let created = flow.create(&form).await.unwrap();
        assert_eq!(created.id, 99);

        let recorded = api.recorded.lock().unwrap();
        assert_eq!(recorded.created.len(), 1);
        assert_eq!(recorded.created[0].questions[0].choices, vec!["Cafe"]);
    }

    #[tokio::test]
    async fn test_edit_round_trip_keeps_question_ids() {
        let api = Arc::new(FakeApi::new(sample_survey()));
        let flow = workflow(api.clone(), SubmitPolicy::Lenient);

        let mut form = flow.load_for_edit(5).await.unwrap().unwrap();
        form.set_title("Lunch v2");
        flow.save(5, &form).await.unwrap();

        let recorded = api.recorded.lock().unwrap();
        let (id, payload) = &recorded.updated[0];
        assert_eq!(*id, 5);
        assert_eq!(payload.title, "Lunch v2");
        assert_eq!(payload.questions[0].id, Some(10));
        assert_eq!(payload.questions[0].choices, vec!["Fries", "Salad"]);
        assert!(payload.questions[1].choices.is_empty());
    }

    #[tokio::test]
    async fn test_append_questions() {
        let api = Arc::new(FakeApi::new(sample_survey()));
        let flow = workflow(api.clone(), SubmitPolicy::Lenient);

        let mut form = SurveyForm::new();
        form.set_question_text(0, "Rate the food").unwrap();
        form.set_question_type(0, QuestionType::Rating).unwrap();

        assert_eq!(flow.append_questions(5, &form).await.unwrap(), 1);
        let recorded = api.recorded.lock().unwrap();
        assert_eq!(recorded.appended[0].0, 5);
        assert!(recorded.appended[0].1[0].choices.is_empty());
    }

    #[tokio::test]
    async fn test_submit_lenient_and_strict() {
        let api = Arc::new(FakeApi::new(sample_survey()));

        let lenient = workflow(api.clone(), SubmitPolicy::Lenient);
        let mut form = lenient.load_for_answering(5).await.unwrap().unwrap();
        form.toggle_choice(10, 2).unwrap();
        form.toggle_choice(10, 1).unwrap();
        assert_eq!(lenient.submit(&form).await.unwrap(), 2);

        let strict = workflow(api.clone(), SubmitPolicy::Strict);
        let err = strict.submit(&form).await.unwrap_err();
        match err {
            ClientError::Validation(errors) => assert!(errors.has_field("answers[11]")),
            other => panic!("expected validation error, got {other:?}"),
        }

        let recorded = api.recorded.lock().unwrap();
        assert_eq!(recorded.submitted.len(), 1);
        let (id, records) = &recorded.submitted[0];
        assert_eq!(*id, 5);
        assert_eq!(records[0].value, AnswerValue::Choice(1));
        assert_eq!(records[1].value, AnswerValue::Choice(2));
    }

    #[tokio::test]
    async fn test_superseded_load_is_dropped() {
        let tracker = RequestTracker::new();
        let mut fake = FakeApi::new(sample_survey());
        fake.interrupt = Some(tracker.clone());
        let flow = SurveyWorkflow::new(Arc::new(fake), tracker, SubmitPolicy::Lenient);

        assert!(flow.show(5).await.unwrap().is_none());
        assert!(flow.list().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_survey_is_status_error() {
        let api = Arc::new(FakeApi::new(sample_survey()));
        let flow = workflow(api.clone(), SubmitPolicy::Lenient);

        let err = flow.load_for_answering(404).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { .. }));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_delete_drops_in_flight_load() {
        let tracker = RequestTracker::new();
        let api = Arc::new(FakeApi::new(sample_survey()));
        let flow = SurveyWorkflow::new(api.clone(), tracker.clone(), SubmitPolicy::Lenient);

        // A load that was in flight when the survey got deleted.
        let before_delete = tracker.begin(&survey_key(5)).await;
        flow.delete(5).await.unwrap();
        assert!(flow.show(5).await.unwrap().is_some());
        assert_eq!(
            tracker.accept(&before_delete, sample_survey()).await,
            None
        );
        assert_eq!(tracker.tracked_keys().await, 0);
        assert_eq!(api.recorded.lock().unwrap().deleted, vec![5]);
    }

    #[tokio::test]
    async fn test_superseded_failure_is_dropped() {
        let tracker = RequestTracker::new();
        let mut fake = FakeApi::new(sample_survey());
        fake.interrupt = Some(tracker.clone());
        let flow = SurveyWorkflow::new(Arc::new(fake), tracker, SubmitPolicy::Lenient);

        assert!(flow.show(404).await.unwrap().is_none());
    }
}
