use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const DB_FILE: &str = "taxmate.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    dob TEXT NOT NULL,
    ni_number TEXT NOT NULL,
    country TEXT NOT NULL,
    occupation TEXT NOT NULL,
    account_method TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    start_date TEXT NOT NULL,
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS filings (
    id INTEGER PRIMARY KEY,
    user_id TEXT NOT NULL,
    tax_year INTEGER NOT NULL,
    month INTEGER,
    status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'open', 'submitted')),
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    user_id TEXT NOT NULL,
    filing_id INTEGER,
    date TEXT NOT NULL,
    amount REAL NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
    category TEXT,
    description TEXT,
    notes TEXT,
    receipt TEXT,
    source TEXT NOT NULL DEFAULT 'manual' CHECK (source IN ('manual', 'import')),
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (user_id) REFERENCES users(id),
    FOREIGN KEY (filing_id) REFERENCES filings(id)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    user_id TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    checksum TEXT,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS imported_rows (
    user_id TEXT NOT NULL,
    checksum TEXT NOT NULL,
    row_index INTEGER NOT NULL,
    transaction_id INTEGER NOT NULL,
    PRIMARY KEY (user_id, checksum, row_index),
    FOREIGN KEY (user_id) REFERENCES users(id),
    FOREIGN KEY (transaction_id) REFERENCES transactions(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS change_log (
    user_id TEXT PRIMARY KEY,
    revision INTEGER NOT NULL DEFAULT 0
);

CREATE TRIGGER IF NOT EXISTS transactions_after_insert AFTER INSERT ON transactions
BEGIN
    INSERT OR IGNORE INTO change_log (user_id, revision) VALUES (NEW.user_id, 0);
    UPDATE change_log SET revision = revision + 1 WHERE user_id = NEW.user_id;
END;

CREATE TRIGGER IF NOT EXISTS transactions_after_update AFTER UPDATE ON transactions
BEGIN
    INSERT OR IGNORE INTO change_log (user_id, revision) VALUES (NEW.user_id, 0);
    UPDATE change_log SET revision = revision + 1 WHERE user_id = NEW.user_id;
END;

CREATE TRIGGER IF NOT EXISTS transactions_after_delete AFTER DELETE ON transactions
BEGIN
    INSERT OR IGNORE INTO change_log (user_id, revision) VALUES (OLD.user_id, 0);
    UPDATE change_log SET revision = revision + 1 WHERE user_id = OLD.user_id;
END;

CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id, date);
CREATE INDEX IF NOT EXISTS idx_transactions_filing ON transactions(filing_id);
CREATE INDEX IF NOT EXISTS idx_filings_user ON filings(user_id, tax_year);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Current change revision for an owner's transactions (0 if never touched).
pub fn revision(conn: &Connection, user_id: &str) -> Result<i64> {
    let mut stmt = conn.prepare_cached("SELECT revision FROM change_log WHERE user_id = ?1")?;
    let mut rows = stmt.query([user_id])?;
    match rows.next()? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}
