use std::sync::OnceLock;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct AssistantSettings {
    /// Credential for the remote model; empty means "run local-only".
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    pub assistant: AssistantSettings,
}

impl AppSettings {
    fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("assistant.api_key", "")?
            .set_default(
                "assistant.endpoint",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("assistant.model", "gemini-2.0-flash")?
            .set_default("assistant.timeout_secs", 15i64)?
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

pub fn get() -> &'static AppSettings {
    static APPSETTINGS: OnceLock<AppSettings> = OnceLock::new();
    APPSETTINGS.get_or_init(|| AppSettings::new().expect("Settings defaults always deserialize."))
}
