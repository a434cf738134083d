pub mod account;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "animeplay")]
#[command(about = "AnimePlay local account CLI", long_about = None)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "animeplay.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and log in with it
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        /// Page to continue to afterwards
        #[arg(long)]
        from: Option<String>,
    },
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        from: Option<String>,
    },
    /// Clear the current session
    Logout,
    /// Show the current session
    Whoami,
    /// Edit the logged-in profile
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, conflicts_with = "clear_avatar")]
        avatar: Option<String>,
        #[arg(long)]
        clear_avatar: bool,
    },
    /// Print the navigation bar for the current session
    Nav {
        #[arg(long, default_value = "/")]
        path: String,
    },
    /// List registered accounts (credentials omitted)
    Accounts,
}
