pub mod account;
pub mod ask;
pub mod dashboard;
pub mod export;
pub mod filing;
pub mod init;
pub mod profile;
pub mod status;
pub mod summary;
pub mod tax;
pub mod txn;
pub mod upload;

use std::sync::{mpsc, Arc};
use std::time::Duration;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::changes::{subscribe_session, subscribe_transactions, PortalEvent};
use crate::db::get_connection;
use crate::error::{Result, TaxmateError};
use crate::session::{require_auth, AuthContext, AuthGuard, AuthState, FileSessionSource};
use crate::settings::{db_path, load_settings};
use crate::summary::MonthKey;

const MIN_POLL_MS: u64 = 100;

/// An open database plus the signed-in user's context.
pub(crate) struct Portal {
    pub conn: Connection,
    pub ctx: AuthContext,
}

impl Portal {
    pub fn user_id(&self) -> &str {
        self.ctx.user_id()
    }
}

pub(crate) fn open_db() -> Result<Connection> {
    let path = db_path();
    if !path.exists() {
        return Err(TaxmateError::Other(
            "Database not found. Run `taxmate init` to set up.".to_string(),
        ));
    }
    get_connection(&path)
}

/// Open the database and require a signed-in user.
pub(crate) fn portal() -> Result<Portal> {
    let conn = open_db()?;
    let ctx = require_auth(&conn, &FileSessionSource::default())?;
    Ok(Portal { conn, ctx })
}

/// Render once, then re-render on every transaction change until the session ends.
pub(crate) fn watch<F>(p: &Portal, mut render: F) -> Result<()>
where
    F: FnMut(&Portal) -> Result<()>,
{
    render(p)?;

    let interval = Duration::from_millis(load_settings().poll_interval_ms.max(MIN_POLL_MS));
    let source = Arc::new(FileSessionSource::default());
    let (tx, rx) = mpsc::channel();
    let _txns = subscribe_transactions(db_path(), p.user_id().to_string(), interval, tx.clone())?;
    let _session = subscribe_session(Arc::clone(&source), interval, tx)?;

    let mut guard = AuthGuard::new(source.as_ref());
    guard.on_session_change(&p.conn, Some(p.ctx.session.clone()))?;
    println!("Watching for changes. Press Ctrl-C to stop.");

    for event in rx {
        match event {
            PortalEvent::TransactionsChanged { revision } => {
                log::debug!("refetching at revision {revision}");
                println!();
                render(p)?;
            }
            PortalEvent::SessionChanged(session) => match guard.on_session_change(&p.conn, session)? {
                AuthState::Authenticated(ctx) if ctx.user_id() == p.user_id() => {}
                _ => {
                    guard.unmount();
                    println!("Session ended. Stopped watching.");
                    break;
                }
            },
        }
    }
    Ok(())
}

pub(crate) fn parse_month_opt(month: &Option<String>) -> Result<Option<MonthKey>> {
    match month {
        None => Ok(None),
        Some(m) => MonthKey::parse(m)
            .map(Some)
            .ok_or_else(|| TaxmateError::Validation(format!("Invalid month '{m}' (expected YYYY-MM or 'August 2025')"))),
    }
}

#[derive(Parser)]
#[command(name = "taxmate", about = "Income, expense and filing tracker for sole traders.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up taxmate: choose a data directory and initialize the database.
    Init {
        /// Path for taxmate data (default: ~/Documents/taxmate)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Register a new account and profile. Missing fields are prompted for.
    Signup {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Dialling code: +44, +92, +91, +34, +880, +971
        #[arg(long = "country-code", default_value = "+44")]
        country_code: String,
        /// Phone number without the dialling code
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        occupation: Option<String>,
        /// National Insurance number (9 characters)
        #[arg(long)]
        ni: Option<String>,
        /// Date of birth: YYYY-MM-DD
        #[arg(long)]
        dob: Option<String>,
        /// Accounting method: cash, accrual or other
        #[arg(long)]
        method: Option<String>,
        /// Description when --method is other
        #[arg(long = "method-other")]
        method_other: Option<String>,
    },
    /// Sign in as an existing account.
    Login {
        email: String,
    },
    /// Sign out.
    Logout,
    /// Show who is signed in.
    Whoami,
    /// Show or update your profile.
    Profile {
        #[command(subcommand)]
        command: Option<ProfileCommands>,
    },
    /// Profile and filings overview.
    Dashboard,
    /// Manage filings.
    Filing {
        #[command(subcommand)]
        command: FilingCommands,
    },
    /// Manage transactions.
    Txn {
        #[command(subcommand)]
        command: TxnCommands,
    },
    /// Upload bank CSVs and review the parsed rows.
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<String>,
        /// Attach accepted rows to this filing
        #[arg(long)]
        filing: Option<i64>,
        /// Accept every valid row without prompting
        #[arg(long = "accept-all")]
        accept_all: bool,
    },
    /// Monthly income and expense summary.
    Summary {
        /// Month: YYYY-MM or 'August 2025'
        #[arg(long)]
        month: Option<String>,
        /// Only show this category
        #[arg(long)]
        category: Option<String>,
        /// Keep running and refresh when transactions change
        #[arg(long)]
        watch: bool,
    },
    /// Income, expenses and estimated tax by month.
    Tax {
        /// Keep running and refresh when transactions change
        #[arg(long)]
        watch: bool,
    },
    /// Export CSV files.
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Ask the assistant a question.
    Ask {
        /// The question
        message: Vec<String>,
        /// List the quick prompts
        #[arg(long)]
        prompts: bool,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show the profile.
    Show,
    /// Update profile fields.
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        occupation: Option<String>,
        #[arg(long)]
        method: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum FilingCommands {
    /// Start a draft filing with income and expense totals.
    New {
        /// Tax year (2000-2100)
        #[arg(long)]
        year: i32,
        /// Month number 1-12; omit for a yearly filing
        #[arg(long)]
        month: Option<u32>,
        #[arg(long, default_value = "0")]
        income: f64,
        #[arg(long, default_value = "0")]
        expenses: f64,
    },
    /// List filings, newest first.
    List,
    /// Show a filing and its transactions.
    Show {
        id: i64,
    },
    /// Submit a filing.
    Submit {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum TxnCommands {
    /// Record a transaction by hand.
    Add {
        amount: f64,
        /// income or expense
        #[arg(long = "type", default_value = "expense")]
        kind: String,
        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Path or reference to a receipt
        #[arg(long)]
        receipt: Option<String>,
    },
    /// List transactions.
    List {
        /// Only this filing
        #[arg(long)]
        filing: Option<i64>,
    },
    /// Edit a transaction.
    Edit {
        id: i64,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Set or clear a transaction's notes.
    Notes {
        id: i64,
        text: Option<String>,
        #[arg(long)]
        clear: bool,
    },
    /// Delete a transaction.
    Delete {
        id: i64,
        /// Skip the typed confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export one month's transactions.
    Transactions {
        /// Month: YYYY-MM or 'August 2025' (default: latest month with data)
        #[arg(long)]
        month: Option<String>,
        /// Output file path
        #[arg(long)]
        output: Option<String>,
    },
    /// Export the monthly tax breakdown.
    Tax {
        /// Output file path
        #[arg(long)]
        output: Option<String>,
    },
}
