use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_DIRECTORY_URL: &str = "https://bmlt.virtual-na.org/main_server/client_interface/jsonp/?switcher=GetSearchResults&get_used_formats&lang_enum=en&data_field_key=location_postal_code_1,duration_time,start_time,time_zone,weekday_tinyint,service_body_bigint,longitude,latitude,location_province,location_municipality,location_street,location_info,location_neighborhood,formats,format_shared_id_list,meeting_name,location_sub_province,worldid_mixed,root_server_uri,id_bigint,venue_type,location_text,virtual_meeting_additional_info,virtual_meeting_link,phone_meeting_number,contact_name_1,contact_phone_1,contact_email_1,contact_name_2,contact_phone_2,contact_email_2,wheelchair&services[]=4&recursive=1&sort_keys=start_time&callback=";

const DEFAULT_LOOKUP_BASE_URL: &str = "https://www.timeapi.io";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub lookup: LookupConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Full search URL for the meeting directory endpoint.
    pub url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub base_url: String,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Path of the SQLite database file. `MEETINGS_DB_PATH` overrides.
    pub db_path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DIRECTORY_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LOOKUP_BASE_URL.to_string(),
            retry_attempts: 3,
            retry_delay_ms: 2000,
            timeout_seconds: 30,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            db_path: "meetings.db".to_string(),
        }
    }
}

impl LookupConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Config {
    /// Loads configuration from a TOML file, falling back to defaults
    /// when the file does not exist. `MEETINGS_DB_PATH` in the
    /// environment always wins over the file's sink path.
    pub fn load(config_path: &str) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let config_content = fs::read_to_string(config_path).map_err(|e| {
                EtlError::Config(format!("Failed to read config file '{config_path}': {e}"))
            })?;
            toml::from_str(&config_content)?
        } else {
            Config::default()
        };

        if let Ok(db_path) = env::var("MEETINGS_DB_PATH") {
            if !db_path.trim().is_empty() {
                config.sink.db_path = db_path;
            }
        }

        Ok(config)
    }
}
