use std::{env, net::Ipv4Addr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context as _;

const DEFAULT_PLAYS_API_URL: &str = "https://legacy-api.kexp.org/play/";

/// Longest window we accept; duplicate detection is quadratic in the number of plays fetched.
pub const MAX_WINDOW_SECS: i64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// which port the app is listening on
    pub port: u16,

    /// which ipv4 interface the app is listening on
    pub interface_ipv4: Ipv4Addr,

    /// sqlx connection url for the comments database
    pub database_url: String,

    /// First page of the upstream recent plays feed.
    pub plays_api_url: String,

    /// Trailing window displayed on the index, in seconds.
    pub play_window_secs: i64,

    pub api_timeout: Duration,

    /// Maximum number of pages followed for a single fetch.
    pub max_pages: usize,

    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,

    /// Reload templates when they change on disk.
    pub watch_templates: bool,
}

fn parse_or<T>(value: Option<String>, default: T, name: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {name}: {value}")),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Builds the configuration out of a variable lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = lookup("PORT")
            .context("missing PORT variable")?
            .parse()
            .context("PORT isn't a u16 value")?;

        let interface_ipv4 = lookup("HOST")
            .context("missing HOST variable")?
            .parse()
            .context("HOST must be an ipv4 addr specification")?;

        let database_url = lookup("DATABASE_URL").context("missing DATABASE_URL variable")?;

        let plays_api_url =
            lookup("PLAYS_API_URL").unwrap_or_else(|| DEFAULT_PLAYS_API_URL.to_owned());
        reqwest::Url::parse(&plays_api_url).context("PLAYS_API_URL must be an absolute url")?;

        let play_window_secs: i64 = parse_or(lookup("PLAY_WINDOW_SECS"), 3600, "PLAY_WINDOW_SECS")?;
        if !(1..=MAX_WINDOW_SECS).contains(&play_window_secs) {
            anyhow::bail!("PLAY_WINDOW_SECS must be between 1 and {MAX_WINDOW_SECS}");
        }

        let api_timeout = Duration::from_secs(parse_or(
            lookup("API_TIMEOUT_SECS"),
            30,
            "API_TIMEOUT_SECS",
        )?);

        let max_pages: usize = parse_or(lookup("MAX_PAGES"), 50, "MAX_PAGES")?;
        if max_pages == 0 {
            anyhow::bail!("MAX_PAGES must be at least 1");
        }

        let templates_dir = PathBuf::from(
            lookup("TEMPLATES_DIR").unwrap_or_else(|| "templates".to_owned()),
        );
        let static_dir =
            PathBuf::from(lookup("STATIC_DIR").unwrap_or_else(|| "static".to_owned()));

        let watch_templates = parse_or(lookup("WATCH_TEMPLATES"), false, "WATCH_TEMPLATES")?;

        Ok(AppConfig {
            port,
            interface_ipv4,
            database_url,
            plays_api_url,
            play_window_secs,
            api_timeout,
            max_pages,
            templates_dir,
            static_dir,
            watch_templates,
        })
    }
}

pub fn parse_app_config() -> anyhow::Result<AppConfig> {
    // override environment variables with contents of .env file, unless they were already set
    // explicitly.
    dotenvy::dotenv().ok();

    AppConfig::from_lookup(|key| env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("PORT", "3000"),
        ("HOST", "127.0.0.1"),
        ("DATABASE_URL", "sqlite::memory:"),
    ];

    #[test]
    fn defaults_apply() {
        let config = AppConfig::from_lookup(lookup_from(REQUIRED)).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.interface_ipv4, Ipv4Addr::LOCALHOST);
        assert_eq!(config.plays_api_url, DEFAULT_PLAYS_API_URL);
        assert_eq!(config.play_window_secs, 3600);
        assert_eq!(config.api_timeout, Duration::from_secs(30));
        assert_eq!(config.max_pages, 50);
        assert_eq!(config.templates_dir, PathBuf::from("templates"));
        assert!(!config.watch_templates);
    }

    #[test]
    fn missing_port_is_reported() {
        let err = AppConfig::from_lookup(lookup_from(&[("HOST", "127.0.0.1")])).unwrap_err();
        assert_eq!(err.to_string(), "missing PORT variable");
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PLAYS_API_URL", "http://localhost:9999/play/"));
        vars.push(("PLAY_WINDOW_SECS", "600"));
        vars.push(("WATCH_TEMPLATES", "true"));
        let config = AppConfig::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.plays_api_url, "http://localhost:9999/play/");
        assert_eq!(config.play_window_secs, 600);
        assert!(config.watch_templates);
    }

    #[test]
    fn oversized_window_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PLAY_WINDOW_SECS", "604800"));
        assert!(AppConfig::from_lookup(lookup_from(&vars)).is_err());
    }

    #[test]
    fn relative_api_url_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PLAYS_API_URL", "/play/"));
        assert!(AppConfig::from_lookup(lookup_from(&vars)).is_err());
    }
}
