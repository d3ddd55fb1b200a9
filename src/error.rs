use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaxmateError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Assistant request failed: {0}")]
    Http(#[from] Box<ureq::Error>),

    #[error("Not signed in. Run `taxmate login <email>` or `taxmate signup` first.")]
    NotSignedIn,

    #[error("No account registered for {0}")]
    UnknownUser(String),

    #[error("Unknown filing: {0}")]
    UnknownFiling(i64),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(i64),

    #[error("Session file {0} is unreadable. Run `taxmate login` again.")]
    UnreadableSession(String),

    #[error("Row {0} has an invalid amount. Edit it before accepting.")]
    InvalidAmount(usize),

    #[error("No parsed row at position {0}")]
    UnknownRow(usize),

    #[error("{0}")]
    Validation(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl From<ureq::Error> for TaxmateError {
    fn from(e: ureq::Error) -> Self {
        TaxmateError::Http(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, TaxmateError>;
