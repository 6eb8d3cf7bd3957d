pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod session;
pub mod state;

pub use config::Config;
pub use error::{ClientError, ClientResult, ErrorKind, ValidationError, ValidationErrors};
pub use state::{AppContext, SharedContext};
