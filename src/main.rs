use anyhow::Context;
use clap::{Parser, Subcommand};
use polls_client::domain::history;
use polls_client::domain::models::{LoginRequest, RegisterRequest, SurveyId};
use polls_client::services::api::SurveyApi;
use polls_client::{AppContext, ClientError, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "polls_client", about = "Command-line client for the polls API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the token
    Login { username: String, password: String },
    /// Create an account and log in
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Forget the stored token
    Logout,
    /// List surveys
    List,
    /// Show one survey with its questions
    Show { id: SurveyId },
    /// Delete a survey you own
    Delete { id: SurveyId },
    /// Show a user's profile and answered surveys
    Profile { username: String },
}

impl Command {
    fn destination(&self) -> String {
        match self {
            Command::List => "/surveys".to_string(),
            Command::Show { id } | Command::Delete { id } => format!("/surveys/{id}"),
            Command::Profile { username } => format!("/profile/{username}"),
            Command::Login { .. } | Command::Register { .. } | Command::Logout => "/".to_string(),
        }
    }

    fn needs_session(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. } | Command::Register { .. } | Command::Logout
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("loading configuration")?;
    tracing::info!("Using polls API at {}", config.api_url);
    let mut ctx = AppContext::restore(config)?;

    if cli.command.needs_session() {
        if let Err(redirect) = ctx.require_session(&cli.command.destination()) {
            println!("Login required: {}", redirect.location());
            println!("Run `polls_client login <username> <password>` first.");
            return Ok(());
        }
    }

    match run(&mut ctx, cli.command).await {
        Err(err) if err.requires_login() => {
            tracing::warn!("Stored session rejected by the server");
            ctx.sign_out()?;
            println!("Your session has expired. Please log in again.");
            Ok(())
        }
        other => Ok(other?),
    }
}

async fn run(ctx: &mut AppContext, command: Command) -> Result<(), ClientError> {
    match command {
        Command::Login { username, password } => {
            let auth = ctx
                .client()
                .login(&LoginRequest { username, password })
                .await?;
            let next = ctx.sign_in(auth)?;
            println!("Logged in. Continue at {next}");
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let auth = ctx
                .client()
                .register(&RegisterRequest {
                    username,
                    email,
                    password,
                })
                .await?;
            ctx.sign_in(auth)?;
            println!("Account created.");
        }
        Command::Logout => {
            ctx.sign_out()?;
            println!("Logged out.");
        }
        Command::List => {
            let workflow = ctx.workflow();
            let Some(listing) = workflow.list().await? else {
                return Ok(());
            };
            if let Some(user) = &listing.user {
                println!("Surveys for {}:", user.username);
            }
            if listing.surveys.is_empty() {
                println!("No surveys yet.");
            }
            for survey in &listing.surveys {
                let status = if survey.is_active { "" } else { " (closed)" };
                println!("{:>5}  {}{}", survey.id, survey.title, status);
            }
        }
        Command::Show { id } => {
            let workflow = ctx.workflow();
            let Some(survey) = workflow.show(id).await? else {
                return Ok(());
            };
            println!("{} (#{})", survey.title, survey.id);
            for (index, question) in survey.questions.iter().enumerate() {
                println!(
                    "{}. {} [{}]",
                    index + 1,
                    question.text,
                    question.question_type.label()
                );
                for text in question.choice_texts() {
                    println!("     - {text}");
                }
            }
            let answers = history::summarize(&survey, &survey.user_answers);
            if !answers.is_empty() {
                println!();
                println!("Your answers:");
                for line in &answers {
                    match line.answered_at {
                        Some(at) => println!(
                            "  {}: {} ({})",
                            line.question,
                            line.answer,
                            at.format("%Y-%m-%d %H:%M")
                        ),
                        None => println!("  {}: {}", line.question, line.answer),
                    }
                }
            }
        }
        Command::Delete { id } => {
            ctx.workflow().delete(id).await?;
            println!("Survey {id} deleted.");
        }
        Command::Profile { username } => {
            let page = ctx.client().get_profile(&username).await?;
            let user = &page.user;
            println!("{} <{}>", user.username, user.email);
            println!("Name: {}", user.display_name());
            println!("Role: {}", user.role().label());
            if let Some(joined) = user.date_joined {
                println!("Joined: {}", joined.format("%Y-%m-%d"));
            }
            println!("Answered surveys: {}", page.surveys.len());
            for survey in &page.surveys {
                println!("{:>5}  {}", survey.id, survey.title);
            }
        }
    }
    Ok(())
}
