use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tasktrack_client::{
    CallbackOutcome, ClientConfig, CookieTokenStore, Error, SessionState, Task, TaskId,
    TaskTracker,
};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "tasktrack", about = "Task Tracker from the command line")]
struct Cli {
    /// Cookie file holding the session tokens
    #[arg(long, env = "TASKTRACK_COOKIE_FILE", default_value = ".tasktrack-cookies")]
    cookie_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Google sign-in URL
    LoginUrl,
    /// Finish sign-in with the URL Google redirected to
    Callback { url: Url },
    /// Show the signed-in user
    Whoami,
    /// List tasks
    List,
    /// Add a task
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Flip a task between open and done
    Toggle { id: TaskId },
    /// Delete a task
    Delete { id: TaskId },
    /// Sign out and forget the stored tokens
    Logout,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Error> {
    let config = ClientConfig::from_env()?;
    let store = Arc::new(CookieTokenStore::open(cli.cookie_file)?);
    let tracker = TaskTracker::new(config, store);

    let needs_login = matches!(
        cli.command,
        Commands::List | Commands::Add { .. } | Commands::Toggle { .. } | Commands::Delete { .. }
    );
    if needs_login && !require_login(&tracker).await? {
        return Ok(ExitCode::FAILURE);
    }

    match cli.command {
        Commands::LoginUrl => println!("{}", tracker.login_url()),
        Commands::Callback { url } => {
            let outcome = tracker.complete_login(&url).await;
            if outcome != CallbackOutcome::SignedIn {
                eprintln!("sign-in failed: {}", outcome.redirect_target());
                return Ok(ExitCode::FAILURE);
            }
            print_session(&tracker.session().state());
        }
        Commands::Whoami => print_session(&tracker.session().check_auth().await),
        Commands::Logout => {
            if let Err(e) = tracker.logout().await {
                eprintln!("warning: server logout failed ({e}); local tokens removed");
            }
            println!("Signed out");
        }
        Commands::List => print_tasks(&tracker.tasks().tasks()),
        Commands::Add { title } => {
            tracker.submit_task(&title.join(" ")).await?;
            print_tasks(&tracker.tasks().tasks());
        }
        Commands::Toggle { id } => {
            tracker.toggle_task(id).await?;
            print_tasks(&tracker.tasks().tasks());
        }
        Commands::Delete { id } => {
            tracker.delete_task(id).await?;
            print_tasks(&tracker.tasks().tasks());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Check the session and load tasks; `false` if not signed in.
async fn require_login(tracker: &TaskTracker) -> Result<bool, Error> {
    if tracker.load().await?.is_authenticated() {
        return Ok(true);
    }
    eprintln!("Not signed in. Run `tasktrack login-url`, then `tasktrack callback <url>`.");
    Ok(false)
}

fn print_session(state: &SessionState) {
    match state.user() {
        Some(user) => println!("{} <{}>", user.display_name(), user.email),
        None => println!("Not signed in"),
    }
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks yet.");
        return;
    }
    for task in tasks {
        let mark = if task.completed { "x" } else { " " };
        println!("[{mark}] {:>5}  {}", task.id, task.title);
    }
}
