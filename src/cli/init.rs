use std::path::PathBuf;

use crate::db::{get_connection, init_db, DB_FILE};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path, Settings};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    let defaults = Settings::default();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if settings.data_dir == defaults.data_dir {
        let chosen: String = dialoguer::Input::new()
            .with_prompt("Data directory")
            .default(settings.data_dir.clone())
            .interact_text()
            .unwrap_or_else(|_| settings.data_dir.clone());
        settings.data_dir = shellexpand_path(chosen.trim());
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(resolved.join("exports"))?;

    let conn = get_connection(&resolved.join(DB_FILE))?;
    init_db(&conn)?;
    log::debug!("schema ready in {}", resolved.display());

    println!("Initialized taxmate at {}", resolved.display());
    Ok(())
}
