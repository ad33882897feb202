use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use config::{Config, ConfigError};
use serde::Deserialize;

use crate::fetch::TimeoutPolicy;
use crate::site::{SiteKind, SiteProfile, Source};

const DEFAULT_CONFIG_FILE: &str = "campaigns";
const ENV_PREFIX: &str = "CAMPAIGNS";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub site: SiteKind,
    pub output_dir: PathBuf,
    pub max_pages: Option<u32>,
    pub page_delay_ms: Option<u64>,
    pub detail_delay_ms: Option<u64>,
    pub timeout_secs: u64,
    pub timeout_step_secs: u64,
    pub max_timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    /// Also write a `.csv` next to every successful `.xlsx`.
    pub csv_copy: bool,
    /// Reference date for "days active"; the local clock when unset.
    pub today: Option<NaiveDate>,
    /// Replaces the site's built-in sources when non-empty.
    pub sources: Vec<Source>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            site: SiteKind::default(),
            output_dir: PathBuf::from("data"),
            max_pages: None,
            page_delay_ms: None,
            detail_delay_ms: None,
            timeout_secs: 30,
            timeout_step_secs: 15,
            max_timeout_secs: 60,
            max_attempts: 5,
            backoff_ms: 1000,
            csv_copy: true,
            today: None,
            sources: Vec::new(),
        }
    }
}

impl Settings {
    /// Defaults, then `campaigns.toml` (or `file`), then `CAMPAIGNS_*` env vars.
    pub fn load(file: Option<&Path>) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();
        builder = match file {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()
    }

    /// Site profile with configured overrides applied.
    pub fn profile(&self) -> SiteProfile {
        let mut profile = SiteProfile::for_kind(self.site);
        if let Some(n) = self.max_pages {
            profile.max_pages = n;
        }
        if let Some(ms) = self.page_delay_ms {
            profile.page_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.detail_delay_ms {
            profile.detail_delay = Duration::from_millis(ms);
        }
        if !self.sources.is_empty() {
            profile.sources = self.sources.clone();
        }
        profile
    }

    pub fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy {
            initial: Duration::from_secs(self.timeout_secs),
            step: Duration::from_secs(self.timeout_step_secs),
            ceiling: Duration::from_secs(self.max_timeout_secs),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn output_stem(&self, profile: &SiteProfile, table: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{}", profile.file_prefix, table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
site = "g2c"
max_pages = 3
page_delay_ms = 0
today = "2024-05-01"

[[sources]]
label = "featured"
url = "https://example.org/featured/"
paginated = false
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.site, SiteKind::G2c);
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.today, NaiveDate::from_ymd_opt(2024, 5, 1));

        let profile = settings.profile();
        assert_eq!(profile.max_pages, 3);
        assert_eq!(profile.page_delay, Duration::ZERO);
        assert_eq!(profile.sources.len(), 1);
        assert!(!profile.sources[0].paginated);
    }

    #[test]
    fn output_stem_uses_site_prefix() {
        let settings = Settings::default();
        let profile = settings.profile();
        assert_eq!(
            settings.output_stem(&profile, "campaigns_unique"),
            PathBuf::from("data/ray_of_hope_campaigns_unique")
        );
    }
}
