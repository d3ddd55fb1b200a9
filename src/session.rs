use std::path::PathBuf;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaxmateError};
use crate::models::Profile;
use crate::profiles::{find_user_by_email, get_profile, get_user};
use crate::settings::config_dir;

const SESSION_FILE: &str = "session.json";

/// The signed-in identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub signed_in_at: String,
}

/// Somewhere the current session can be read from.
pub trait SessionSource: Send + Sync {
    fn current(&self) -> Result<Option<Session>>;
}

/// Session stored as JSON next to the settings file.
#[derive(Debug, Clone)]
pub struct FileSessionSource {
    path: PathBuf,
}

impl FileSessionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        // Readers only ever see the old file or the new one.
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, format!("{json}\n"))?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }

    /// Remove the stored session. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for FileSessionSource {
    fn default() -> Self {
        Self::new(config_dir().join(SESSION_FILE))
    }
}

impl SessionSource for FileSessionSource {
    /// `Ok(None)` only when no session is stored. Unreadable content is an error.
    fn current(&self) -> Result<Option<Session>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map(Some).map_err(|e| {
            log::warn!("unreadable session {}: {e}", self.path.display());
            TaxmateError::UnreadableSession(self.path.display().to_string())
        })
    }
}

/// What a protected screen gets once the guard lets it through.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session: Session,
    /// `None` when the identity exists but never completed a profile.
    pub profile: Option<Profile>,
}

impl AuthContext {
    pub fn user_id(&self) -> &str {
        &self.session.user_id
    }
}

#[derive(Debug, Clone)]
pub enum AuthState {
    Loading,
    Authenticated(AuthContext),
    Redirecting,
}

/// Gate for screens that need a signed-in user.
///
/// Starts in `Loading`. Once unmounted, results from late loads or
/// session changes are discarded and the state stays where it was.
pub struct AuthGuard<'a, S: SessionSource + ?Sized> {
    source: &'a S,
    state: AuthState,
    mounted: bool,
}

impl<'a, S: SessionSource + ?Sized> AuthGuard<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            state: AuthState::Loading,
            mounted: true,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn load(&mut self, conn: &Connection) -> Result<&AuthState> {
        let session = self.source.current()?;
        self.on_session_change(conn, session)
    }

    pub fn on_session_change(&mut self, conn: &Connection, session: Option<Session>) -> Result<&AuthState> {
        let next = match session {
            None => AuthState::Redirecting,
            Some(session) => resolve(conn, session)?,
        };
        if self.mounted {
            self.state = next;
        } else {
            log::debug!("guard unmounted, discarding session update");
        }
        Ok(&self.state)
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    pub fn into_context(self) -> Result<AuthContext> {
        match self.state {
            AuthState::Authenticated(ctx) => Ok(ctx),
            AuthState::Loading | AuthState::Redirecting => Err(TaxmateError::NotSignedIn),
        }
    }
}

fn resolve(conn: &Connection, session: Session) -> Result<AuthState> {
    if get_user(conn, &session.user_id)?.is_none() {
        log::warn!("session for {} points at an unknown account", session.email);
        return Ok(AuthState::Redirecting);
    }
    let profile = get_profile(conn, &session.user_id)?;
    Ok(AuthState::Authenticated(AuthContext { session, profile }))
}

/// Load the signed-in context or fail with a sign-in hint.
pub fn require_auth<S: SessionSource + ?Sized>(conn: &Connection, source: &S) -> Result<AuthContext> {
    let mut guard = AuthGuard::new(source);
    guard.load(conn)?;
    guard.into_context()
}

/// Select the identity registered under `email`. No credential check is made.
pub fn sign_in(conn: &Connection, source: &FileSessionSource, email: &str) -> Result<Session> {
    let user = find_user_by_email(conn, email)?.ok_or_else(|| TaxmateError::UnknownUser(email.trim().to_string()))?;
    let session = Session {
        user_id: user.id,
        email: user.email,
        signed_in_at: chrono::Local::now().to_rfc3339(),
    };
    source.save(&session)?;
    log::info!("signed in as {}", session.email);
    Ok(session)
}

pub fn sign_out(source: &FileSessionSource) -> Result<bool> {
    source.clear()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{add_user, test_db};

    fn session_for(user_id: &str) -> Session {
        Session {
            user_id: user_id.to_string(),
            email: format!("{user_id}@gmail.com"),
            signed_in_at: "2025-08-01T09:00:00+01:00".to_string(),
        }
    }

    #[test]
    fn test_no_session_redirects() {
        let (dir, conn) = test_db();
        let source = FileSessionSource::new(dir.path().join("session.json"));
        let mut guard = AuthGuard::new(&source);
        assert!(matches!(guard.state(), AuthState::Loading));
        assert!(matches!(guard.load(&conn).unwrap(), AuthState::Redirecting));
        assert!(matches!(guard.into_context(), Err(TaxmateError::NotSignedIn)));
    }

    #[test]
    fn test_session_loads_context() {
        let (dir, conn) = test_db();
        add_user(&conn, "alice");
        let source = FileSessionSource::new(dir.path().join("session.json"));
        source.save(&session_for("alice")).unwrap();
        let ctx = require_auth(&conn, &source).unwrap();
        assert_eq!(ctx.user_id(), "alice");
        assert!(ctx.profile.is_none());
    }

    #[test]
    fn test_session_for_unknown_account_redirects() {
        let (dir, conn) = test_db();
        let source = FileSessionSource::new(dir.path().join("session.json"));
        source.save(&session_for("ghost")).unwrap();
        assert!(matches!(require_auth(&conn, &source), Err(TaxmateError::NotSignedIn)));
    }

    #[test]
    fn test_sign_out_mid_session_redirects() {
        let (dir, conn) = test_db();
        add_user(&conn, "alice");
        let source = FileSessionSource::new(dir.path().join("session.json"));
        source.save(&session_for("alice")).unwrap();
        let mut guard = AuthGuard::new(&source);
        assert!(matches!(guard.load(&conn).unwrap(), AuthState::Authenticated(_)));
        assert!(matches!(guard.on_session_change(&conn, None).unwrap(), AuthState::Redirecting));
    }

    #[test]
    fn test_unmounted_guard_ignores_updates() {
        let (dir, conn) = test_db();
        add_user(&conn, "alice");
        let source = FileSessionSource::new(dir.path().join("session.json"));
        source.save(&session_for("alice")).unwrap();
        let mut guard = AuthGuard::new(&source);
        guard.load(&conn).unwrap();
        guard.unmount();
        guard.on_session_change(&conn, None).unwrap();
        assert!(matches!(guard.state(), AuthState::Authenticated(_)));
    }

    #[test]
    fn test_sign_in_and_out() {
        let (dir, conn) = test_db();
        add_user(&conn, "alice");
        let source = FileSessionSource::new(dir.path().join("nested").join("session.json"));
        assert!(matches!(
            sign_in(&conn, &source, "nobody@gmail.com"),
            Err(TaxmateError::UnknownUser(_))
        ));
        let session = sign_in(&conn, &source, "alice@gmail.com").unwrap();
        assert_eq!(source.current().unwrap(), Some(session));
        assert!(sign_out(&source).unwrap());
        assert!(!sign_out(&source).unwrap());
        assert_eq!(source.current().unwrap(), None);
    }

    #[test]
    fn test_unreadable_session_is_not_a_sign_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let source = FileSessionSource::new(&path);
        for content in ["{not json", ""] {
            std::fs::write(&path, content).unwrap();
            assert!(matches!(source.current(), Err(TaxmateError::UnreadableSession(_))));
        }
        assert!(sign_out(&source).unwrap());
        assert_eq!(source.current().unwrap(), None);
    }

    #[test]
    fn test_save_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSessionSource::new(dir.path().join("session.json"));
        source.save(&session_for("alice")).unwrap();
        source.save(&session_for("bob")).unwrap();
        assert_eq!(source.current().unwrap(), Some(session_for("bob")));
        assert!(!dir.path().join("session.json.tmp").exists());
    }
}
