use colored::Colorize;

use crate::cli::portal;
use crate::error::Result;
use crate::models::Profile;
use crate::profiles::{mask_ni, update_profile, ProfileUpdate};

pub(crate) fn print_profile(profile: &Profile) {
    println!("Name:        {}", profile.full_name);
    println!("Occupation:  {}", profile.occupation);
    println!("Country:     {}", profile.country);
    println!("Phone:       {}", profile.phone_number);
    println!("NI number:   {}", mask_ni(&profile.ni_number));
    println!("Born:        {}", profile.dob);
    println!("Accounting:  {}", profile.account_method);
    println!("Member since {}", profile.start_date);
}

pub fn show() -> Result<()> {
    let p = portal()?;
    match &p.ctx.profile {
        Some(profile) => print_profile(profile),
        None => println!("{}", "No profile on record.".yellow()),
    }
    Ok(())
}

pub fn update(name: Option<String>, occupation: Option<String>, method: Option<String>) -> Result<()> {
    let p = portal()?;
    let update = ProfileUpdate {
        full_name: name,
        occupation,
        account_method: method,
    };
    if update.full_name.is_none() && update.occupation.is_none() && update.account_method.is_none() {
        println!("Nothing to update. Pass --name, --occupation or --method.");
        return Ok(());
    }
    let profile = update_profile(&p.conn, p.user_id(), &update)?;
    println!("{}", "Profile updated.".green());
    print_profile(&profile);
    Ok(())
}
