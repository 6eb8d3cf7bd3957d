pub mod api;
pub mod request_tracker;
pub mod surveys;

pub use api::{ApiClient, SurveyApi};
pub use request_tracker::{RequestTracker, Ticket};
pub use surveys::SurveyWorkflow;
