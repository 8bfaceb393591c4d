use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use session_keeper::providers::http::HttpSessionBackend;
use session_keeper::providers::local::LocalIdentityProvider;
use session_keeper::{
    AccessGate, ActivityBus, ActivityKind, Credential, GateView, JsonFileStorage, MemoryStorage, Navigator, Notifier,
    Principal, SessionBackends, SessionConfig, SessionError, SessionStorage, SessionStore, SessionSynchronizer,
    SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("stdin read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "session-keeper", about = "Interactive client session lifecycle driver")]
struct Cli {
    /// Base URL of the auth backend (`/api/auth/{me,refresh,logout}`).
    #[arg(long, env = "SESSION_API_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    /// Persist the session here across runs; in-memory when absent.
    #[arg(long, env = "SESSION_STORAGE_PATH")]
    storage_path: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
enum Command {
    SignIn { uid: String, token: String },
    SignOut,
    Activity(ActivityKind),
    Refresh,
    Logout,
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Err("empty command".to_owned());
    };
    match head {
        "signin" => match (parts.next(), parts.next()) {
            (Some(uid), Some(token)) => Ok(Command::SignIn { uid: uid.to_owned(), token: token.to_owned() }),
            _ => Err("usage: signin <uid> <token>".to_owned()),
        },
        "signout" => Ok(Command::SignOut),
        "refresh" => Ok(Command::Refresh),
        "logout" => Ok(Command::Logout),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => other
            .parse::<ActivityKind>()
            .map(Command::Activity)
            .map_err(|_| format!("unknown command: {other} (try `help`)")),
    }
}

const HELP: &str = "commands: signin <uid> <token> | signout | move | key | scroll | touch | refresh | logout | status | quit";

struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, path: &str) {
        tracing::info!(%path, "redirect");
        println!("-> redirect {path}");
    }
}

struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, message: &str) {
        println!("!! {message}");
    }
}

fn print_view(view: &GateView) {
    match view {
        GateView::Checking => println!("[gate] checking"),
        GateView::Content(user) => println!("[gate] content for {} (expires_at={})", user.id, user.expires_at),
        GateView::Redirected => println!("[gate] redirected"),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!(error = %e, "session-keeper failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = SessionConfig::from_env()?;
    let backend = Arc::new(HttpSessionBackend::new(&config.http_config(&cli.base_url))?);
    let storage: Arc<dyn SessionStorage> = match &cli.storage_path {
        Some(path) => Arc::new(JsonFileStorage::new(path)),
        None => Arc::new(MemoryStorage::new()),
    };
    let store = SessionStore::new(SessionBackends::from_shared(backend), storage, Arc::new(SystemClock));

    let provider = LocalIdentityProvider::new();
    let bus = ActivityBus::new();

    let mut gate = AccessGate::mount(&store, Arc::new(LogNavigator), Some(Arc::new(StdoutNotifier)), config.gate_config());
    if store.rehydrate() {
        println!("restored persisted session");
    }
    let sync = SessionSynchronizer::mount(store.clone(), &provider, &bus, &config.sync_config());

    tracing::info!(base_url = %cli.base_url, "session-keeper ready");
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(msg) => {
                        println!("{msg}");
                        continue;
                    }
                };
                match command {
                    Command::SignIn { uid, token } => provider.sign_in(Principal { uid, credential: Credential::new(token) }),
                    Command::SignOut => provider.sign_out(),
                    Command::Activity(kind) => {
                        bus.emit(kind);
                    }
                    Command::Refresh => match store.refresh_session().await {
                        Ok(user) => println!("refreshed; expires_at={}", user.expires_at),
                        Err(e) => println!("refresh failed: {e}"),
                    },
                    Command::Logout => store.logout().await,
                    Command::Status => {
                        println!("session: {}", store.state().label());
                        print_view(&gate.view());
                    }
                    Command::Help => println!("{HELP}"),
                    Command::Quit => break,
                }
            }
            view = gate.changed() => {
                match view {
                    Some(view) => print_view(&view),
                    None => break,
                }
            }
        }
    }

    sync.unmount();
    gate.unmount();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sign_in_with_uid_and_token() {
        assert_eq!(
            parse_command("signin alice tok-1"),
            Ok(Command::SignIn { uid: "alice".into(), token: "tok-1".into() })
        );
        assert!(parse_command("signin alice").is_err());
    }

    #[test]
    fn parses_activity_aliases() {
        assert_eq!(parse_command("move"), Ok(Command::Activity(ActivityKind::PointerMove)));
        assert_eq!(parse_command("touch"), Ok(Command::Activity(ActivityKind::TouchStart)));
    }

    #[test]
    fn rejects_unknown_commands() {
        let err = parse_command("dance").unwrap_err();
        assert!(err.contains("dance"));
        assert!(parse_command("   ").is_err());
    }
}
