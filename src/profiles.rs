use regex::Regex;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{Result, TaxmateError};
use crate::fmt::mask;
use crate::models::{Profile, User};

pub const ALLOWED_EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "outlook.com",
    "hotmail.com",
    "hotmail.co.uk",
    "yahoo.com",
    "icloud.com",
    "live.com",
    "aol.com",
    "protonmail.com",
    "zoho.com",
    "gmx.com",
    "mail.com",
];

/// Dialling codes offered at signup, with the country recorded on the profile.
pub const COUNTRY_CODES: &[(&str, &str)] = &[
    ("+44", "United Kingdom"),
    ("+92", "Pakistan"),
    ("+91", "India"),
    ("+34", "Spain"),
    ("+880", "Bangladesh"),
    ("+971", "United Arab Emirates"),
];

pub const ACCOUNT_METHODS: &[&str] = &["cash", "accrual", "other"];

const MIN_BIRTH_YEAR: i32 = 1900;
const MAX_BIRTH_YEAR: i32 = 2013;

const SELECT_PROFILE: &str = "SELECT id, full_name, dob, ni_number, country, occupation, account_method, \
     phone_number, start_date FROM profiles";

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub full_name: String,
    pub email: String,
    pub country_code: String,
    pub phone_number: String,
    pub occupation: String,
    pub ni_number: String,
    /// YYYY-MM-DD
    pub dob: String,
    pub account_method: String,
    /// Required when `account_method` is "other".
    pub account_method_other: Option<String>,
}

impl SignupForm {
    /// The method stored on the profile: the free-text answer when "other" was chosen.
    pub fn resolved_account_method(&self) -> String {
        if self.account_method.trim().eq_ignore_ascii_case("other") {
            self.account_method_other.as_deref().unwrap_or("").trim().to_string()
        } else {
            self.account_method.trim().to_lowercase()
        }
    }
}

/// Editable profile fields. `None` leaves a field untouched.
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub occupation: Option<String>,
    pub account_method: Option<String>,
}

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.(com|co\.uk)$";
const NI_PATTERN: &str = r"^[A-Za-z0-9]{9}$";

fn matches(pattern: &str, value: &str) -> bool {
    Regex::new(pattern).is_ok_and(|re| re.is_match(value))
}

pub fn is_valid_email(email: &str) -> bool {
    let domain = email.split('@').nth(1).unwrap_or("");
    matches(EMAIL_PATTERN, email) && ALLOWED_EMAIL_DOMAINS.contains(&domain)
}

/// UK numbers are `0` plus 10 digits or `7` plus 9 digits; elsewhere 7 to 15 digits.
pub fn is_valid_phone(country_code: &str, number: &str) -> bool {
    let digits = number.chars().all(|c| c.is_ascii_digit());
    if !digits {
        return false;
    }
    if country_code == "+44" {
        (number.len() == 11 && number.starts_with('0')) || (number.len() == 10 && number.starts_with('7'))
    } else {
        (7..=15).contains(&number.len())
    }
}

pub fn is_valid_dob(dob: &str) -> bool {
    dob.split('-')
        .next()
        .and_then(|y| y.trim().parse::<i32>().ok())
        .is_some_and(|year| (MIN_BIRTH_YEAR..=MAX_BIRTH_YEAR).contains(&year))
}

pub fn country_for_code(code: &str) -> Option<&'static str> {
    COUNTRY_CODES.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}

fn validate_account_method(method: &str, other: Option<&str>) -> Option<&'static str> {
    let method = method.trim().to_lowercase();
    if method.is_empty() {
        return Some("Please select an accounting method.");
    }
    if !ACCOUNT_METHODS.contains(&method.as_str()) {
        return Some("Accounting method must be cash, accrual or other.");
    }
    if method == "other" && other.map_or(true, |o| o.trim().is_empty()) {
        return Some("Please specify your accounting method.");
    }
    None
}

/// Check every field and report all problems at once.
pub fn validate_signup(form: &SignupForm) -> Result<()> {
    let mut errors: Vec<&str> = Vec::new();

    if form.full_name.trim().is_empty() {
        errors.push("Full name is required.");
    }
    if !is_valid_email(form.email.trim()) {
        errors.push("Enter a valid email from a known provider.");
    }
    if country_for_code(&form.country_code).is_none() {
        errors.push("Unsupported country code.");
    }
    if !is_valid_phone(&form.country_code, form.phone_number.trim()) {
        errors.push("Enter a valid phone number.");
    }
    if form.occupation.trim().is_empty() {
        errors.push("Occupation is required.");
    }
    if !matches(NI_PATTERN, &form.ni_number) {
        errors.push("NI Number must be exactly 9 characters.");
    }
    if !is_valid_dob(&form.dob) {
        errors.push("Date of birth must be between 1900 and 2013.");
    }
    if let Some(problem) = validate_account_method(&form.account_method, form.account_method_other.as_deref()) {
        errors.push(problem);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TaxmateError::Validation(errors.join("\n")))
    }
}

fn map_profile(row: &Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        user_id: row.get(0)?,
        full_name: row.get(1)?,
        dob: row.get(2)?,
        ni_number: row.get(3)?,
        country: row.get(4)?,
        occupation: row.get(5)?,
        account_method: row.get(6)?,
        phone_number: row.get(7)?,
        start_date: row.get(8)?,
    })
}

/// Register an identity and its profile together.
pub fn create_user_with_profile(conn: &Connection, form: &SignupForm) -> Result<(User, Profile)> {
    validate_signup(form)?;
    let email = form.email.trim().to_lowercase();
    if find_user_by_email(conn, &email)?.is_some() {
        return Err(TaxmateError::Validation(format!(
            "An account for {email} already exists. Run `taxmate login {email}` instead."
        )));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
    };
    let profile = Profile {
        user_id: user.id.clone(),
        full_name: form.full_name.trim().to_string(),
        dob: form.dob.trim().to_string(),
        ni_number: form.ni_number.to_uppercase(),
        country: country_for_code(&form.country_code).unwrap_or_default().to_string(),
        occupation: form.occupation.trim().to_string(),
        account_method: form.resolved_account_method(),
        phone_number: format!("{}{}", form.country_code, form.phone_number.trim()),
        start_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
    };

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO users (id, email) VALUES (?1, ?2)",
        rusqlite::params![user.id, user.email],
    )?;
    tx.execute(
        "INSERT INTO profiles (id, full_name, dob, ni_number, country, occupation, account_method, \
         phone_number, start_date) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            profile.user_id,
            profile.full_name,
            profile.dob,
            profile.ni_number,
            profile.country,
            profile.occupation,
            profile.account_method,
            profile.phone_number,
            profile.start_date,
        ],
    )?;
    tx.commit()?;
    log::info!("registered {} as {}", user.email, user.id);
    Ok((user, profile))
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email FROM users WHERE email = ?1",
            [email.trim().to_lowercase()],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let user = conn
        .query_row("SELECT id, email FROM users WHERE id = ?1", [user_id], |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
            })
        })
        .optional()?;
    Ok(user)
}

pub fn get_profile(conn: &Connection, user_id: &str) -> Result<Option<Profile>> {
    let profile = conn
        .query_row(&format!("{SELECT_PROFILE} WHERE id = ?1"), [user_id], map_profile)
        .optional()?;
    Ok(profile)
}

pub fn update_profile(conn: &Connection, user_id: &str, update: &ProfileUpdate) -> Result<Profile> {
    let current = get_profile(conn, user_id)?.ok_or_else(|| TaxmateError::UnknownUser(user_id.to_string()))?;

    let full_name = match &update.full_name {
        Some(name) if name.trim().is_empty() => {
            return Err(TaxmateError::Validation("Full name is required.".to_string()))
        }
        Some(name) => name.trim().to_string(),
        None => current.full_name,
    };
    let occupation = match &update.occupation {
        Some(occ) if occ.trim().is_empty() => {
            return Err(TaxmateError::Validation("Occupation is required.".to_string()))
        }
        Some(occ) => occ.trim().to_string(),
        None => current.occupation,
    };
    let account_method = match &update.account_method {
        Some(method) if method.trim().is_empty() => {
            return Err(TaxmateError::Validation("Please select an accounting method.".to_string()))
        }
        Some(method) => method.trim().to_string(),
        None => current.account_method,
    };

    conn.execute(
        "UPDATE profiles SET full_name = ?1, occupation = ?2, account_method = ?3, \
         updated_at = datetime('now') WHERE id = ?4",
        rusqlite::params![full_name, occupation, account_method, user_id],
    )?;
    get_profile(conn, user_id)?.ok_or_else(|| TaxmateError::UnknownUser(user_id.to_string()))
}

pub fn mask_ni(ni_number: &str) -> String {
    mask(ni_number)
}
