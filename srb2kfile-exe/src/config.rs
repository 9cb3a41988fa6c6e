//! User configuration options.

use crate::{BASE_DIR, CLIOptions};
use dirs::config_dir;
use log::{info, warn};
use nanoserde::{DeRon, SerRon};
use std::{
    fs::{File, OpenOptions, create_dir_all},
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

const LOG_TAG: &str = "UserConfig";

fn get_cfg_file() -> io::Result<PathBuf> {
    let mut dir = config_dir().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{}: Couldn't find the user config dir", LOG_TAG),
        )
    })?;
    dir.push(BASE_DIR);
    if !dir.exists() {
        create_dir_all(&dir)?;
    }
    dir.push("user.ron");
    Ok(dir)
}

#[derive(Debug, Default, Clone, PartialEq, DeRon, SerRon)]
pub struct UserConfig {
    /// Package supplying the default palette
    pub base_file: String,
    /// Log level used when `--verbose` isn't given
    pub verbose: String,
}

impl UserConfig {
    /// Read the config from the user config dir, creating a default one if it
    /// is missing or can't be deserialised
    pub fn load() -> io::Result<Self> {
        Self::load_from(&get_cfg_file()?)
    }

    pub fn load_from(path: &Path) -> io::Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let mut buf = String::new();
        let read_len = file.read_to_string(&mut buf)?;
        if read_len != 0 {
            match UserConfig::deserialize_ron(&buf) {
                Ok(data) => {
                    info!(target: LOG_TAG, "Loaded user config file");
                    return Ok(data);
                }
                Err(e) => warn!("Could not deserialise {:?} ({}), recreating config", path, e),
            }
        }
        UserConfig::create_default(path)
    }

    fn create_default(path: &Path) -> io::Result<Self> {
        let config = UserConfig {
            verbose: log::LevelFilter::Warn.to_string(),
            ..UserConfig::default()
        };
        config.write_to(path)?;
        info!("Created default user config file {:?}", path);
        Ok(config)
    }

    pub fn write(&self) -> io::Result<()> {
        self.write_to(&get_cfg_file()?)
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.serialize_ron().as_bytes())
    }

    /// The stored log level, `Warn` if it doesn't parse
    pub fn log_level(&self) -> log::LevelFilter {
        self.verbose.parse().unwrap_or(log::LevelFilter::Warn)
    }

    /// Sync the CLI options and UserOptions with each other
    pub fn sync_cli(&mut self, cli: &mut CLIOptions) {
        info!("Checking CLI options");

        if !cli.base.is_empty() && cli.base != self.base_file {
            cli.base.clone_into(&mut self.base_file);
            info!("Base file changed to: {}", &cli.base);
        } else {
            self.base_file.clone_into(&mut cli.base);
        }

        if let Some(level) = cli.verbose {
            self.verbose = level.to_string();
        } else {
            cli.verbose = Some(self.log_level());
        }
    }
}
