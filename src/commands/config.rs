use std::path::Path;

use crate::app::App;
use crate::cli::ConfigAction;
use crate::config::Config;

pub fn handle(app: &mut App, config_path: &Path, action: ConfigAction) -> i32 {
    match action {
        ConfigAction::Show => {
            match serde_json::to_string_pretty(&app.config) {
                Ok(s) => println!("{s}"),
                Err(e) => {
                    eprintln!("{e}");
                    return 1;
                }
            }
            0
        }
        ConfigAction::Set { key, value } => {
            if let Err(e) = app.config.set(&key, &value) {
                eprintln!("{e}");
                return 1;
            }
            if let Err(e) = app.config.save(config_path) {
                eprintln!("{e}");
                return 1;
            }
            println!("{key} = {value}");
            0
        }
        ConfigAction::Reload => match Config::load(config_path) {
            Ok(reloaded) => {
                app.config = reloaded;
                println!("configuration reloaded");
                0
            }
            Err(e) => {
                eprintln!("{e}");
                1
            }
        },
    }
}
