// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::error;

use cli::{Cli, Commands};
use navigator::TerminalNavigator;
use repset_api_client::{ApiClient, session_file};
use repset_core::flows;
use repset_core::models::{AvatarUpload, NewProfileHints};
use repset_core::provision::{ProfileProvisioner, ProvisionerConfig};
use repset_core::session::SessionManager;
use repset_core::workouts::{self, WorkoutKind};

mod cli;
mod navigator;
mod screens;

fn main() {
    if let Err(e) = run() {
        error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".parse().unwrap()),
        )
        .init();

    let args = Cli::parse();
    let navigator = TerminalNavigator;
    let cancel = CancellationToken::new();

    match args.command {
        Commands::Signup {
            email,
            password,
            confirm_password,
            nickname,
            avatar,
        } => {
            let (session, provisioner) = connect(&args.api);
            let avatar = avatar.map(read_avatar).transpose()?;
            let profile = flows::sign_up(
                &session,
                &provisioner,
                &navigator,
                &email,
                &password,
                &confirm_password,
                NewProfileHints { nickname, avatar },
                &cancel,
            )
            .await?;
            println!("{}", screens::render_profile(&profile));
        }

        Commands::Login { email, password } => {
            let (session, provisioner) = connect(&args.api);
            let profile = flows::sign_in(
                &session,
                &provisioner,
                &navigator,
                &email,
                &password,
                &cancel,
            )
            .await?;
            println!("{}", screens::render_profile(&profile));
        }

        Commands::Logout => {
            let (session, _) = connect(&args.api);
            session.initialize().await;
            flows::sign_out(&session, &navigator).await?;
            println!("Signed out.");
        }

        Commands::Dashboard => {
            let (session, provisioner) = connect(&args.api);
            match flows::bootstrap_dashboard(&session, &provisioner, &navigator, &cancel).await? {
                Some(profile) => {
                    println!("{}", screens::render_profile(&profile));
                    println!("{}", screens::render_catalog(&workouts::catalog()));
                }
                None => println!("Not signed in. Run `repset login` first."),
            }
        }

        Commands::Workout { kind } => {
            let kind: WorkoutKind = kind
                .parse()
                .map_err(|e: workouts::UnknownWorkout| Error::Custom(e.to_string()))?;
            println!("{}", screens::render_routine(&workouts::routine(kind)));
        }

        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Wire the core against a persisted API client session.
fn connect(api: &str) -> (SessionManager, ProfileProvisioner) {
    let client = Arc::new(ApiClient::with_persistence(
        api,
        session_file::default_session_path(),
    ));
    let session = SessionManager::new(client.clone());
    let provisioner = ProfileProvisioner::new(
        client.clone(),
        client,
        ProvisionerConfig::default(),
    );
    (session, provisioner)
}

fn read_avatar(path: std::path::PathBuf) -> Result<AvatarUpload> {
    let bytes = std::fs::read(&path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Custom(format!("unusable avatar path: {}", path.display())))?;
    Ok(AvatarUpload { file_name, bytes })
}
