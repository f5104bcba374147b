use crate::domain::rule::{Rule, RuleSet};
use crate::domain::time_window::TimeWindow;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com";
const DEFAULT_HOURLY_VARIABLE: &str = "temperature_2m";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub open_meteo: OpenMeteoSettings,
    #[serde(default)]
    pub defaults: DefaultSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenMeteoSettings {
    pub base_url: String,
    pub hourly_variable: String,
}

/// Initial time window and rules; omitted values use the built-in defaults.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DefaultSettings {
    pub time_window: Option<TimeWindow>,
    pub rules: Option<Vec<Rule>>,
}

impl DefaultSettings {
    pub fn time_window(&self) -> TimeWindow {
        self.time_window.unwrap_or_default()
    }

    pub fn rule_set(&self) -> RuleSet {
        self.rules
            .clone()
            .map(RuleSet::new)
            .unwrap_or_default()
    }
}

/// Load `config/dashboard.{toml,yaml,json}` if present, layered over defaults.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from("config/dashboard")
}

pub fn load_app_config_from(name: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .set_default("server.bind_addr", DEFAULT_BIND_ADDR)?
        .set_default("open_meteo.base_url", DEFAULT_ARCHIVE_URL)?
        .set_default("open_meteo.hourly_variable", DEFAULT_HOURLY_VARIABLE)?
        .add_source(config::File::with_name(name).required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}
