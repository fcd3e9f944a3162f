use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    load_settings,
    render::{render_submit_state, render_user_list, spawn_renderer},
    FormBinder, FormField, FormKind, UserApi, UserListView,
};
use shared::{domain::UserFilter, protocol::ReadOperation};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "user-feedback", about = "List users and submit user feedback")]
struct Cli {
    /// Overrides the endpoint from client.toml and the environment.
    #[arg(long, global = true)]
    graphql_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show users, optionally filtered.
    List {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        /// Include job title, feedback and timestamp.
        #[arg(long)]
        feedback: bool,
    },
    /// Create a user.
    Create(UserArgs),
    /// Create a user together with their feedback.
    Feedback {
        #[command(flatten)]
        user: UserArgs,
        #[arg(long)]
        text: String,
    },
}

#[derive(Args, Debug)]
struct UserArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    job_title: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings()?;
    if let Some(url) = cli.graphql_url {
        settings.graphql_url = url;
    }
    info!(graphql_url = %settings.graphql_url, "using endpoint");
    let api = UserApi::from_settings(&settings).context("failed to build graphql client")?;

    match cli.command {
        Command::List {
            id,
            email,
            first_name,
            feedback,
        } => {
            let operation = if feedback {
                ReadOperation::GetUserFeedback
            } else {
                ReadOperation::GetUser
            };
            let filter = UserFilter {
                id,
                email,
                first_name,
            };
            list(api, operation, filter).await
        }
        Command::Create(user) => {
            let form = FormBinder::new(api, FormKind::CreateUser)
                .with_policy(settings.submit_policy());
            fill(&form, &user)?;
            submit(&form).await
        }
        Command::Feedback { user, text } => {
            let form = FormBinder::new(api, FormKind::Feedback)
                .with_policy(settings.submit_policy());
            fill(&form, &user)?;
            form.edit(FormField::Feedback, text)?;
            submit(&form).await
        }
    }
}

async fn list(api: UserApi, operation: ReadOperation, filter: UserFilter) -> Result<ExitCode> {
    let view = UserListView::new(api, operation, filter);
    let mut rx = view.subscribe();
    let renderer = spawn_renderer(view.subscribe(), |state| {
        println!("{}", render_user_list(state));
    });

    view.mount();
    let settled = rx
        .wait_for(|state| !state.is_pending())
        .await
        .map(|state| state.clone())
        .context("user list closed before settling")?;
    drop(rx);
    view.unmount();
    drop(view);
    renderer.await.context("renderer task failed")?;

    Ok(if settled.is_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn fill(form: &FormBinder, user: &UserArgs) -> Result<()> {
    form.edit(FormField::FirstName, &user.first_name)?;
    form.edit(FormField::LastName, &user.last_name)?;
    form.edit(FormField::Email, &user.email)?;
    if let Some(job_title) = &user.job_title {
        form.edit(FormField::JobTitle, job_title)?;
    }
    Ok(())
}

async fn submit(form: &FormBinder) -> Result<ExitCode> {
    let result = form.submit().await;
    println!("{}", render_submit_state(&form.outcome()));
    Ok(match result {
        Ok(saved) => {
            info!(id = %saved.id, "user saved");
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    })
}
