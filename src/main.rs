mod assistant;
mod categorizer;
mod changes;
mod cli;
mod db;
mod error;
mod export;
mod filings;
mod fmt;
mod importer;
mod models;
mod profiles;
mod session;
mod settings;
mod summary;
mod transactions;

use clap::{CommandFactory, Parser};

use cli::{Cli, Commands, ExportCommands, FilingCommands, ProfileCommands, TxnCommands};

fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        return;
    };

    let result = match command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Signup {
            name,
            email,
            country_code,
            phone,
            occupation,
            ni,
            dob,
            method,
            method_other,
        } => cli::account::signup(name, email, country_code, phone, occupation, ni, dob, method, method_other),
        Commands::Login { email } => cli::account::login(&email),
        Commands::Logout => cli::account::logout(),
        Commands::Whoami => cli::account::whoami(),
        Commands::Profile { command } => match command.unwrap_or(ProfileCommands::Show) {
            ProfileCommands::Show => cli::profile::show(),
            ProfileCommands::Update {
                name,
                occupation,
                method,
            } => cli::profile::update(name, occupation, method),
        },
        Commands::Dashboard => cli::dashboard::run(),
        Commands::Filing { command } => match command {
            FilingCommands::New {
                year,
                month,
                income,
                expenses,
            } => cli::filing::new(year, month, income, expenses),
            FilingCommands::List => cli::filing::list(),
            FilingCommands::Show { id } => cli::filing::show(id),
            FilingCommands::Submit { id } => cli::filing::submit(id),
        },
        Commands::Txn { command } => match command {
            TxnCommands::Add {
                amount,
                kind,
                date,
                category,
                description,
                receipt,
            } => cli::txn::add(amount, &kind, date, category, description, receipt),
            TxnCommands::List { filing } => cli::txn::list(filing),
            TxnCommands::Edit {
                id,
                category,
                amount,
                kind,
                description,
            } => cli::txn::edit(id, category, amount, kind, description),
            TxnCommands::Notes { id, text, clear } => cli::txn::notes(id, text, clear),
            TxnCommands::Delete { id, yes } => cli::txn::delete(id, yes),
        },
        Commands::Upload {
            files,
            filing,
            accept_all,
        } => cli::upload::run(&files, filing, accept_all),
        Commands::Summary {
            month,
            category,
            watch,
        } => cli::summary::run(month, category, watch),
        Commands::Tax { watch } => cli::tax::run(watch),
        Commands::Export { command } => match command {
            ExportCommands::Transactions { month, output } => cli::export::transactions(month, output),
            ExportCommands::Tax { output } => cli::export::tax(output),
        },
        Commands::Ask { message, prompts } => cli::ask::run(&message, prompts),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        log::debug!("command failed: {e:?}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
