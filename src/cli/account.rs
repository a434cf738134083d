use std::error::Error;
use tracing::error;

use crate::account::{AuthStore, ProfileUpdate, Session};
use crate::error::AuthError;
use crate::shell::{nav_items, Field, LoginForm, Outcome, Tab};
use crate::storage::KeyValueStore;

use super::Commands;

type CliResult = Result<(), Box<dyn Error>>;

pub async fn handle_command<S: KeyValueStore>(store: &mut AuthStore<S>, cmd: Commands) -> CliResult {
    match cmd {
        Commands::Register { username, email, password, confirm_password, from } => {
            let Some(mut form) = open_form(store, from.as_deref()) else {
                return Ok(());
            };
            form.switch_tab(Tab::Register);
            form.set_field(Field::Username, username);
            form.set_field(Field::Email, email);
            form.set_field(Field::Password, password);
            form.set_field(Field::ConfirmPassword, confirm_password);
            submit(store, form).await
        }
        Commands::Login { email, password, from } => {
            let Some(mut form) = open_form(store, from.as_deref()) else {
                return Ok(());
            };
            form.set_field(Field::Email, email);
            form.set_field(Field::Password, password);
            submit(store, form).await
        }
        Commands::Logout => {
            store.logout();
            println!("Logged out.");
            Ok(())
        }
        Commands::Whoami => {
            match store.current_session() {
                Some(session) => print_session(session),
                None => println!("Not logged in."),
            }
            Ok(())
        }
        Commands::Update { username, email, avatar, clear_avatar } => {
            let update = ProfileUpdate {
                username,
                email,
                avatar: if clear_avatar { Some(None) } else { avatar.map(Some) },
            };
            if update.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }
            let session = store.update_profile(update).inspect_err(report_environment)?;
            print_session(&session);
            Ok(())
        }
        Commands::Nav { path } => {
            for item in nav_items(store.current_session(), &path) {
                let marker = if item.active { ">" } else { " " };
                let dot = if item.logged_in_indicator { " *" } else { "" };
                println!("{} {:<8} {}{}", marker, item.label, item.path, dot);
            }
            Ok(())
        }
        Commands::Accounts => {
            for account in store.accounts() {
                print_session(&Session::from(&account));
            }
            Ok(())
        }
    }
}

/// The auth form, unless someone is already logged in
fn open_form<S: KeyValueStore>(store: &AuthStore<S>, from: Option<&str>) -> Option<LoginForm> {
    let form = LoginForm::new(from);
    if let Some(target) = form.initial_redirect(store) {
        println!("Already logged in. Continue to {}", target);
        return None;
    }
    Some(form)
}

/// User mistakes are shown as-is; anything else also goes to the log.
fn report_environment(err: &AuthError) {
    if !err.is_validation() {
        error!("Account store failure: {}", err);
    }
}

async fn submit<S: KeyValueStore>(store: &mut AuthStore<S>, mut form: LoginForm) -> CliResult {
    println!("Memproses...");
    match form.submit(store).await {
        Outcome::Redirect(target) => {
            if let Some(msg) = form.success() {
                println!("{}", msg);
            }
            if let Some(session) = store.current_session() {
                print_session(session);
            }
            println!("Continue to {}", target);
            Ok(())
        }
        Outcome::Stay => {
            if let Some(err) = form.store_error() {
                report_environment(err);
            }
            Err(form
                .display_error()
                .unwrap_or_else(|| "Request rejected".to_string())
                .into())
        }
    }
}

fn print_session(session: &Session) {
    println!(
        "{} <{}> id={} avatar={} joined={}",
        session.username,
        session.email,
        session.id,
        session.avatar.as_deref().unwrap_or("-"),
        session.joined_at.to_rfc3339(),
    );
}
