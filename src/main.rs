use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use photofolio::config::{ClientConfig, ConfigError};
use photofolio::dashboard::Dashboard;
use photofolio::login::{self, Credentials, LoginError};
use photofolio::{ApiClient, ApiError, FileStore, Identity, KeyValueStore, Session, SessionStore};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("api client error: {0}")]
    Api(#[from] ApiError),
    #[error("{}", .0.user_message())]
    Login(#[from] LoginError),
    #[error("not signed in; run `photofolio login` first")]
    NotSignedIn,
    #[error("the dashboard is only available to photographer accounts")]
    NotPhotographer,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "photofolio", about = "Photographer profile and gallery client")]
struct Cli {
    #[arg(long, env = "PHOTOFOLIO_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "PHOTOFOLIO_STORE_PATH", help = "Session file path")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Restore the persisted session and show who is signed in.
    Status,
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PHOTOFOLIO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the persisted session.
    Logout,
    /// Show gallery stats for the signed-in photographer.
    Dashboard,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: ignoring unreadable .env file: {e}");
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::resolve(cli.api_url, cli.store)?;
    let api = Arc::new(ApiClient::from_config(&config)?);
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.store_path));

    let (session, _restore) = SessionStore::start(storage.clone(), api.clone());
    let current = session.wait_hydrated().await;
    tracing::debug!(authenticated = current.is_authenticated(), "session hydrated");

    match cli.command {
        Command::Status => print_json(&session_json(&current)),
        Command::Login { email, password } => {
            let credentials = Credentials { email, password };
            let current = login::login(api.as_ref(), storage.as_ref(), &session, &credentials).await?;
            eprintln!("Login successful!");
            print_json(&session_json(&current))
        }
        Command::Logout => {
            session.signout().await;
            eprintln!("signed out");
            Ok(())
        }
        Command::Dashboard => run_dashboard(api.as_ref(), &current).await,
    }
}

async fn run_dashboard(api: &ApiClient, current: &Session) -> Result<(), CliError> {
    if !current.is_authenticated() {
        return Err(CliError::NotSignedIn);
    }
    let photographer = current.photographer().ok_or(CliError::NotPhotographer)?;
    let dashboard = Dashboard::load(api, photographer).await;
    print_json(&json!({
        "photographer": identity_json(photographer),
        "galleryItems": dashboard.gallery_count(),
        "impressions": dashboard.impressions(),
        "downloads": dashboard.downloads(),
        "pendingImages": dashboard.pending_photos.len(),
        "catalogues": dashboard.catalogues.len(),
        "blogs": dashboard.blogs.len(),
        "uploadLimit": dashboard.upload_limit(),
        "photos": dashboard
            .photos
            .iter()
            .map(|p| json!({ "id": p.id, "original": p.image_links.original, "views": p.views() }))
            .collect::<Vec<_>>(),
    }))
}

fn session_json(session: &Session) -> Value {
    let Some(profile) = &session.profile else {
        return json!({ "signedIn": false });
    };
    json!({
        "signedIn": true,
        "role": profile.role().as_str(),
        "profile": identity_json(profile.identity()),
    })
}

fn identity_json(identity: &Identity) -> Value {
    json!({
        "id": identity.id,
        "name": identity.display_name(),
        "email": identity.email,
        "location": identity.location(),
        "profileImage": identity.profile_image,
        "coverImage": identity.cover_image,
    })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
