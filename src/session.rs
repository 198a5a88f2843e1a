//! Session identity.
//!
//! The session decides whose task collection the store works on. Sign-in is
//! local only: profiles are remembered in `session.json` so the same email
//! keeps the same storage partition across sign-ins.
//!
//! User resolution order:
//! 1) CLI --user (explicit)
//! 2) TICKOFF_USER environment variable
//! 3) Persisted session in `<data_dir>/session.json`
//! 4) Guest sentinel (`session.guest_id`, default "guest")

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::storage;

const SESSION_FILENAME: &str = "session.json";

/// Environment variable overriding the persisted session
pub const USER_ENV: &str = "TICKOFF_USER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Session {
    User(UserProfile),
    Guest,
}

impl Session {
    /// Identifier the task store partitions storage by.
    pub fn user_key<'a>(&'a self, guest_id: &'a str) -> &'a str {
        match self {
            Session::User(profile) => &profile.id,
            Session::Guest => guest_id,
        }
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            Session::User(profile) => Some(profile),
            Session::Guest => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    #[serde(default)]
    session: Option<Session>,
    #[serde(default)]
    onboarding_seen: bool,
    #[serde(default)]
    profiles: Vec<UserProfile>,
}

impl SessionRecord {
    fn profile_by_email(&self, email: &str) -> Option<&UserProfile> {
        self.profiles
            .iter()
            .find(|profile| profile.email.eq_ignore_ascii_case(email))
    }

    fn remember(&mut self, profile: UserProfile) {
        self.profiles
            .retain(|known| !known.email.eq_ignore_ascii_case(&profile.email));
        self.profiles.push(profile);
    }
}

/// Persisted session state under a data directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILENAME)
    }

    /// Active session, or `None` when nobody has signed in or chosen guest.
    pub fn current(&self) -> Result<Option<Session>> {
        Ok(self.load()?.session)
    }

    /// Sign in with an email. A remembered profile is reused; otherwise a
    /// new one is created with the local part of the email as its name.
    pub fn sign_in(&self, email: &str) -> Result<UserProfile> {
        let email = validate_email(email)?;
        let profile = self.update(|record| {
            let profile = match record.profile_by_email(email) {
                Some(profile) => profile.clone(),
                None => {
                    let name = email.split('@').next().unwrap_or(email).to_string();
                    new_profile(name, email.to_string(), None)
                }
            };
            record.remember(profile.clone());
            record.session = Some(Session::User(profile.clone()));
            profile
        })?;
        tracing::debug!(user = %profile.id, "signed in");
        Ok(profile)
    }

    /// Register a profile and sign in with it. Signing up again with a known
    /// email updates the name and phone but keeps the id.
    pub fn sign_up(&self, name: &str, email: &str, phone: Option<&str>) -> Result<UserProfile> {
        let name = non_empty(Some(name))
            .ok_or_else(|| Error::InvalidArgument("name cannot be empty".to_string()))?;
        let email = validate_email(email)?;
        let phone = non_empty(phone).map(str::to_string);

        let profile = self.update(|record| {
            let profile = match record.profile_by_email(email) {
                Some(existing) => UserProfile {
                    id: existing.id.clone(),
                    name: name.to_string(),
                    email: email.to_string(),
                    phone,
                },
                None => new_profile(name.to_string(), email.to_string(), phone),
            };
            record.remember(profile.clone());
            record.session = Some(Session::User(profile.clone()));
            profile
        })?;
        tracing::debug!(user = %profile.id, "signed up");
        Ok(profile)
    }

    pub fn continue_as_guest(&self) -> Result<()> {
        self.update(|record| record.session = Some(Session::Guest))
    }

    /// Forget the active session. Remembered profiles and the onboarding
    /// flag are kept.
    pub fn sign_out(&self) -> Result<()> {
        self.update(|record| record.session = None)
    }

    pub fn mark_onboarding_seen(&self) -> Result<()> {
        self.update(|record| record.onboarding_seen = true)
    }

    pub fn has_seen_onboarding(&self) -> Result<bool> {
        Ok(self.load()?.onboarding_seen)
    }

    fn load(&self) -> Result<SessionRecord> {
        let path = self.path();
        if !path.exists() {
            return Ok(SessionRecord::default());
        }
        parse_record(lock::read_locked(&path, DEFAULT_LOCK_TIMEOUT_MS)?)
    }

    /// Read-modify-write under a single hold of `session.json.lock`.
    fn update<T>(&self, apply: impl FnOnce(&mut SessionRecord) -> T) -> Result<T> {
        let path = self.path();
        let _lock = FileLock::acquire(lock::lock_path_for(&path), DEFAULT_LOCK_TIMEOUT_MS)?;

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(Error::Io(err)),
        };
        let mut record = parse_record(raw)?;
        let value = apply(&mut record);

        let json = serde_json::to_string_pretty(&record)?;
        lock::write_atomic(&path, json.as_bytes())?;
        Ok(value)
    }
}

fn parse_record(raw: Option<String>) -> Result<SessionRecord> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
        _ => Ok(SessionRecord::default()),
    }
}

/// Resolve the user key the task store should open.
pub fn resolve_user(
    cli_user: Option<&str>,
    sessions: &SessionStore,
    config: &Config,
) -> Result<String> {
    let user = resolve_unchecked(cli_user, sessions, config);
    storage::validate_key(&storage::storage_key(&user))?;
    Ok(user)
}

fn resolve_unchecked(cli_user: Option<&str>, sessions: &SessionStore, config: &Config) -> String {
    if let Some(user) = non_empty(cli_user) {
        return user.to_string();
    }

    if let Ok(env_user) = std::env::var(USER_ENV) {
        if let Some(user) = non_empty(Some(env_user.as_str())) {
            return user.to_string();
        }
    }

    let guest_id = config.session.guest_id.trim();
    match sessions.current() {
        Ok(Some(session)) => session.user_key(guest_id).to_string(),
        Ok(None) => guest_id.to_string(),
        Err(err) => {
            tracing::warn!(path = %sessions.path().display(), error = %err, "unreadable session; using guest");
            guest_id.to_string()
        }
    }
}

fn new_profile(name: String, email: String, phone: Option<String>) -> UserProfile {
    UserProfile {
        id: ulid::Ulid::new().to_string().to_lowercase(),
        name,
        email,
        phone,
    }
}

fn validate_email(email: &str) -> Result<&str> {
    let email = non_empty(Some(email))
        .ok_or_else(|| Error::InvalidArgument("email cannot be empty".to_string()))?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(Error::InvalidArgument(format!("invalid email: {email}"))),
    }
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
