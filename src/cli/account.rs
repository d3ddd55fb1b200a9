use colored::Colorize;
use dialoguer::{Input, Select};

use crate::cli::open_db;
use crate::error::{Result, TaxmateError};
use crate::profiles::{create_user_with_profile, SignupForm, ACCOUNT_METHODS};
use crate::session::{require_auth, sign_in, sign_out, FileSessionSource};

/// The flag value, or an interactive prompt when it was left off.
fn field(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| TaxmateError::Other(format!("{prompt}: {e}"))),
    }
}

fn method_field(value: Option<String>) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => {
            let idx = Select::new()
                .with_prompt("Accounting method")
                .items(ACCOUNT_METHODS)
                .default(0)
                .interact()
                .map_err(|e| TaxmateError::Other(format!("Accounting method: {e}")))?;
            Ok(ACCOUNT_METHODS[idx].to_string())
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn signup(
    name: Option<String>,
    email: Option<String>,
    country_code: String,
    phone: Option<String>,
    occupation: Option<String>,
    ni: Option<String>,
    dob: Option<String>,
    method: Option<String>,
    method_other: Option<String>,
) -> Result<()> {
    let conn = open_db()?;

    let full_name = field(name, "Full name")?;
    let email = field(email, "Email")?;
    let phone_number = field(phone, &format!("Phone number ({country_code})"))?;
    let occupation = field(occupation, "Occupation")?;
    let ni_number = field(ni, "NI number")?;
    let dob = field(dob, "Date of birth (YYYY-MM-DD)")?;
    let account_method = method_field(method)?;
    let account_method_other = if account_method.trim().eq_ignore_ascii_case("other") {
        Some(field(method_other, "Describe your accounting method")?)
    } else {
        method_other
    };

    let form = SignupForm {
        full_name,
        email,
        country_code,
        phone_number,
        occupation,
        ni_number,
        dob,
        account_method,
        account_method_other,
    };
    let (user, profile) = create_user_with_profile(&conn, &form)?;
    sign_in(&conn, &FileSessionSource::default(), &user.email)?;

    println!("{}", format!("Welcome, {}!", profile.full_name).green());
    println!("Signed in as {}", user.email);
    Ok(())
}

pub fn login(email: &str) -> Result<()> {
    let conn = open_db()?;
    let session = sign_in(&conn, &FileSessionSource::default(), email)?;
    println!("{}", format!("Signed in as {}", session.email).green());
    Ok(())
}

pub fn logout() -> Result<()> {
    if sign_out(&FileSessionSource::default())? {
        println!("Signed out.");
    } else {
        println!("{}", "Not signed in.".yellow());
    }
    Ok(())
}

pub fn whoami() -> Result<()> {
    let conn = open_db()?;
    let ctx = require_auth(&conn, &FileSessionSource::default())?;
    let name = ctx
        .profile
        .as_ref()
        .map(|p| p.full_name.as_str())
        .unwrap_or("(no profile)");
    println!("{} <{}>", name, ctx.session.email);
    println!("Since: {}", ctx.session.signed_in_at);
    Ok(())
}
