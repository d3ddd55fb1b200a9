use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::db::{get_connection, revision};
use crate::error::Result;
use crate::session::{Session, SessionSource};

const STOP_CHECK: Duration = Duration::from_millis(25);

/// Something changed upstream; listeners refetch in full.
#[derive(Debug, Clone, PartialEq)]
pub enum PortalEvent {
    TransactionsChanged { revision: i64 },
    SessionChanged(Option<Session>),
}

/// A background poller. Dropping it stops the poller and waits for it to exit.
pub struct Subscription {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Runs `tick` every `interval` until stopped or until `tick` returns false.
    fn spawn<F>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            let mut next = Instant::now() + interval;
            while !flag.load(Ordering::Relaxed) {
                let now = Instant::now();
                if now < next {
                    std::thread::sleep((next - now).min(STOP_CHECK));
                    continue;
                }
                next = now + interval;
                if !tick() {
                    log::debug!("listener gone, stopping poller");
                    break;
                }
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("poller thread panicked");
            }
        }
    }
}

/// Notify `sender` whenever the owner's transactions are inserted, updated or deleted.
pub fn subscribe_transactions(
    db_path: PathBuf,
    user_id: String,
    interval: Duration,
    sender: Sender<PortalEvent>,
) -> Result<Subscription> {
    let conn = get_connection(&db_path)?;
    let mut last = revision(&conn, &user_id)?;
    log::debug!("watching transactions for {user_id} from revision {last}");

    Ok(Subscription::spawn(interval, move || match revision(&conn, &user_id) {
        Ok(rev) if rev != last => {
            last = rev;
            sender.send(PortalEvent::TransactionsChanged { revision: rev }).is_ok()
        }
        Ok(_) => true,
        Err(e) => {
            log::warn!("change poll failed: {e}");
            true
        }
    }))
}

/// Notify `sender` when the stored session appears, disappears or switches identity.
pub fn subscribe_session<S>(source: Arc<S>, interval: Duration, sender: Sender<PortalEvent>) -> Result<Subscription>
where
    S: SessionSource + 'static,
{
    let mut last = source.current()?;

    Ok(Subscription::spawn(interval, move || match source.current() {
        Ok(current) if current != last => {
            last = current.clone();
            sender.send(PortalEvent::SessionChanged(current)).is_ok()
        }
        Ok(_) => true,
        Err(e) => {
            log::warn!("session poll failed: {e}");
            true
        }
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::db::init_db;
    use crate::db::test_support::{add_txn, add_user};
    use crate::session::FileSessionSource;

    const TICK: Duration = Duration::from_millis(10);
    const WAIT: Duration = Duration::from_secs(5);

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let conn = get_connection(&path).unwrap();
        init_db(&conn).unwrap();
        add_user(&conn, "alice");
        add_user(&conn, "bob");
        (dir, path)
    }

    #[test]
    fn test_insert_triggers_notification() {
        let (_dir, path) = setup();
        let (tx, rx) = mpsc::channel();
        let _sub = subscribe_transactions(path.clone(), "alice".to_string(), TICK, tx).unwrap();

        let conn = get_connection(&path).unwrap();
        add_txn(&conn, "alice", "2025-08-01", 10.0, "expense", None);
        let event = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(event, PortalEvent::TransactionsChanged { revision: 1 });
    }

    #[test]
    fn test_other_owner_changes_are_not_delivered() {
        let (_dir, path) = setup();
        let (tx, rx) = mpsc::channel();
        let _sub = subscribe_transactions(path.clone(), "alice".to_string(), TICK, tx).unwrap();

        let conn = get_connection(&path).unwrap();
        add_txn(&conn, "bob", "2025-08-01", 10.0, "expense", None);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_drop_stops_delivery() {
        let (_dir, path) = setup();
        let (tx, rx) = mpsc::channel();
        let sub = subscribe_transactions(path.clone(), "alice".to_string(), TICK, tx).unwrap();
        drop(sub);

        let conn = get_connection(&path).unwrap();
        add_txn(&conn, "alice", "2025-08-01", 10.0, "expense", None);
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(200)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn test_sign_out_is_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FileSessionSource::new(dir.path().join("session.json")));
        source
            .save(&Session {
                user_id: "alice".to_string(),
                email: "alice@gmail.com".to_string(),
                signed_in_at: "2025-08-01T09:00:00+00:00".to_string(),
            })
            .unwrap();

        let (tx, rx) = mpsc::channel();
        let _sub = subscribe_session(Arc::clone(&source), TICK, tx).unwrap();
        source.clear().unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), PortalEvent::SessionChanged(None));
    }

    #[test]
    fn test_unreadable_session_is_not_delivered_as_sign_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let source = Arc::new(FileSessionSource::new(&path));
        source
            .save(&Session {
                user_id: "alice".to_string(),
                email: "alice@gmail.com".to_string(),
                signed_in_at: "2025-08-01T09:00:00+00:00".to_string(),
            })
            .unwrap();

        let (tx, rx) = mpsc::channel();
        let _sub = subscribe_session(Arc::clone(&source), TICK, tx).unwrap();
        std::fs::write(&path, "").unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }
}
