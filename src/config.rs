use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind::NotFound;
use std::path::PathBuf;

use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use crate::AppError;

const CONFIG: &str = "config";
const USER: &str = "user";
const DEFAULT_CONFIG_DIR: &str = "/.crm/";

#[derive(Deserialize, Default, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub data_file: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub verify_host: bool,
    #[serde(default)]
    pub code_attempts: Option<u32>,
}

fn get_config_path(file: &str, dir: Option<&str>) -> Result<OsString, AppError> {
    let mut path = match dir {
        Some(path) => OsString::from(path),
        None => home::home_dir()
            .ok_or_else(|| AppError("Impossible to get your home dir!".to_owned()))?
            .into_os_string(),
    };

    path.push(DEFAULT_CONFIG_DIR.to_owned() + file);
    Ok(path)
}

fn get_config_file_or_write<T>(file: &str, dir: Option<&str>, value: T) -> Result<String, AppError>
where
    T: Sized + Serialize,
{
    let path = get_config_path(file, dir)?;
    match fs::read_to_string(&path) {
        Ok(data) => Ok(data),
        Err(error) if error.kind() == NotFound => {
            let data = serde_json::to_string(&value).map_err(|e| AppError(e.to_string()))?;
            if let Some(parent) = PathBuf::from(&path).parent() {
                fs::create_dir_all(parent).map_err(|e| AppError(format!("Couldn't create config dir: {e}")))?;
            }
            fs::write(&path, &data).map_err(|e| AppError(format!("Failed to write config file: {e}")))?;
            Ok(data)
        }
        Err(error) => Err(AppError(format!("Couldn't read config file: {error}"))),
    }
}

impl TryFrom<&ArgMatches> for Config {
    type Error = AppError;

    fn try_from(value: &ArgMatches) -> Result<Self, Self::Error> {
        let config_file = value.get_one::<String>(CONFIG).map_or("", String::as_str);

        let data = if config_file.is_empty() {
            get_config_file_or_write("config.json", None, Self::default())?
        } else {
            fs::read_to_string(shellexpand::tilde(config_file).to_string())
                .map_err(|e| AppError(format!("Unable to read config file {config_file}: {e}")))?
        };

        let mut config: Self =
            serde_json::from_str(&data).map_err(|e| AppError(format!("JSON does not have correct format: {e}")))?;

        if let Some(user) = value.get_one::<String>(USER) {
            config.user_id = Some(user.clone());
        }

        Ok(config)
    }
}

impl Config {
    /// The configured data file, `~/.crm/data.json` otherwise.
    pub fn data_path(&self) -> Result<PathBuf, AppError> {
        match self.data_file.as_deref().filter(|file| !file.is_empty()) {
            Some(file) => Ok(PathBuf::from(shellexpand::tilde(file).to_string())),
            None => get_config_path("data.json", None).map(PathBuf::from),
        }
    }

    /// Attempts the allocator may spend looking for a free code, at least one.
    pub fn code_attempts(&self) -> u32 {
        self.code_attempts.unwrap_or(crate::crm::allocator::DEFAULT_MAX_ATTEMPTS).max(1)
    }
}
