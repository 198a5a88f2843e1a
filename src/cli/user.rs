//! tickoff user command implementation
//!
//! Sign-in, sign-up, guest mode and sign-out against the local session.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::session::{self, Session, SessionStore, UserProfile};

/// Options for `tickoff user show`
pub struct ShowOptions {
    pub user: Option<String>,
    pub data_dir: PathBuf,
    pub output: OutputOptions,
}

/// Options for `tickoff user login`
pub struct LoginOptions {
    pub email: String,
    pub data_dir: PathBuf,
    pub output: OutputOptions,
}

/// Options for `tickoff user signup`
pub struct SignupOptions {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub data_dir: PathBuf,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct UserShowReport {
    user: String,
    guest: bool,
    session: Option<Session>,
    onboarding_seen: bool,
}

#[derive(Serialize)]
struct UserSignedInReport {
    user: String,
    profile: UserProfile,
}

#[derive(Serialize)]
struct UserSessionReport {
    user: String,
    guest: bool,
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let config = Config::load_from_dir(&options.data_dir);
    let sessions = SessionStore::new(&options.data_dir);

    let user = session::resolve_user(options.user.as_deref(), &sessions, &config)?;
    let current = sessions.current().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "unreadable session");
        None
    });
    let onboarding_seen = sessions.has_seen_onboarding().unwrap_or(false);
    let guest = user == config.session.guest_id.trim();

    let header = match current.as_ref().and_then(Session::profile) {
        Some(profile) if profile.id == user => format!("Signed in as {}", profile.email),
        _ if guest => "Guest session".to_string(),
        _ => format!("User: {user}"),
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("User", user.clone());
    if let Some(profile) = current.as_ref().and_then(Session::profile) {
        human.push_summary("Name", profile.name.clone());
        human.push_summary("Email", profile.email.clone());
        if let Some(phone) = profile.phone.as_ref() {
            human.push_summary("Phone", phone.clone());
        }
    }
    if current.is_none() {
        human.push_next_step("tickoff user login <email>");
        human.push_next_step("tickoff user guest");
    }
    if !onboarding_seen {
        human.push_next_step("tickoff init");
    }

    let report = UserShowReport {
        user,
        guest,
        session: current,
        onboarding_seen,
    };

    emit_success(options.output, "user show", &report, Some(&human))
}

pub fn run_login(options: LoginOptions) -> Result<()> {
    let sessions = SessionStore::new(&options.data_dir);
    let profile = sessions.sign_in(&options.email)?;
    emit_signed_in(options.output, "user login", profile)
}

pub fn run_signup(options: SignupOptions) -> Result<()> {
    let sessions = SessionStore::new(&options.data_dir);
    let profile = sessions.sign_up(&options.name, &options.email, options.phone.as_deref())?;
    emit_signed_in(options.output, "user signup", profile)
}

pub fn run_guest(data_dir: PathBuf, output: OutputOptions) -> Result<()> {
    let config = Config::load_from_dir(&data_dir);
    SessionStore::new(&data_dir).continue_as_guest()?;

    let user = config.session.guest_id.trim().to_string();
    let mut human = HumanOutput::new("Continuing as guest");
    human.push_summary("User", user.clone());
    human.push_next_step("tickoff add <text>");

    let report = UserSessionReport { user, guest: true };
    emit_success(output, "user guest", &report, Some(&human))
}

pub fn run_logout(data_dir: PathBuf, output: OutputOptions) -> Result<()> {
    let config = Config::load_from_dir(&data_dir);
    SessionStore::new(&data_dir).sign_out()?;

    let user = config.session.guest_id.trim().to_string();
    let mut human = HumanOutput::new("Signed out");
    human.push_summary("User", user.clone());
    human.push_next_step("tickoff user login <email>");

    let report = UserSessionReport { user, guest: true };
    emit_success(output, "user logout", &report, Some(&human))
}

fn emit_signed_in(output: OutputOptions, command: &str, profile: UserProfile) -> Result<()> {
    let mut human = HumanOutput::new(format!("Signed in as {}", profile.email));
    human.push_summary("User", profile.id.clone());
    human.push_summary("Name", profile.name.clone());
    if let Some(phone) = profile.phone.as_ref() {
        human.push_summary("Phone", phone.clone());
    }
    human.push_next_step("tickoff list");

    let report = UserSignedInReport {
        user: profile.id.clone(),
        profile,
    };
    emit_success(output, command, &report, Some(&human))
}
