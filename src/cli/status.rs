use crate::db::{get_connection, revision};
use crate::error::Result;
use crate::session::{FileSessionSource, SessionSource};
use crate::settings::{db_path, get_data_dir, load_settings};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = get_data_dir();
    let db_path = db_path();
    let session = FileSessionSource::default().current()?;

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());
    println!("Assistant:  {}", settings.assistant_url);
    println!(
        "Signed in:  {}",
        session.as_ref().map(|s| s.email.as_str()).unwrap_or("(nobody)")
    );

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `taxmate init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let users: i64 = conn.query_row("SELECT count(*) FROM users", [], |r| r.get(0))?;
    println!();
    println!("Accounts:      {users}");

    if let Some(session) = session {
        let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [&session.user_id], |r| r.get(0))?) };
        let filings = count("SELECT count(*) FROM filings WHERE user_id = ?1")?;
        let transactions = count("SELECT count(*) FROM transactions WHERE user_id = ?1")?;
        let uploads = count("SELECT count(*) FROM imports WHERE user_id = ?1")?;
        println!("Filings:       {filings}");
        println!("Transactions:  {transactions}");
        println!("Uploads:       {uploads}");
        println!("Revision:      {}", revision(&conn, &session.user_id)?);
    }
    Ok(())
}
