//! Command-line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "repset", about = "Repset workout tracker")]
pub struct Cli {
    /// Base URL of the Repset API server.
    #[arg(long, env = "REPSET_API", default_value = "http://127.0.0.1:4600")]
    pub api: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account and provision its profile.
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Repeat the password; mismatches abort before any request.
        #[arg(long)]
        confirm_password: String,
        /// Display name. Defaults to the email's local part.
        #[arg(long)]
        nickname: Option<String>,
        /// Image file to upload as the avatar.
        #[arg(long)]
        avatar: Option<PathBuf>,
    },

    /// Sign in to an existing account.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign out and discard the persisted session.
    Logout,

    /// Show the signed-in profile and the workout catalog.
    Dashboard,

    /// Show one workout routine (push, pull, legs, full-body).
    Workout { kind: String },

    /// Print the version.
    Version,
}
