use std::path::PathBuf;

use chrono::Duration;
use services::attempt_ttl_from_env;
use tracker_core::model::{IdError, UserId};

const DEFAULT_DB_URL: &str = "sqlite://tracker.sqlite3";
const DEFAULT_USER: &str = "local";

/// Settings shared by every subcommand. Flags win over environment values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_url: String,
    pub user: UserId,
    /// `None` selects the bundled demo curriculum.
    pub curriculum: Option<PathBuf>,
    pub attempt_ttl: Duration,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns `IdError` when the resolved user id is blank.
    pub fn resolve(
        db: Option<String>,
        user: Option<String>,
        curriculum: Option<PathBuf>,
    ) -> Result<Self, IdError> {
        let db_url = db
            .or_else(|| env_value("TRACKER_DB_URL"))
            .map_or_else(|| DEFAULT_DB_URL.to_owned(), normalize_sqlite_url);
        let user = user
            .or_else(|| env_value("TRACKER_USER"))
            .unwrap_or_else(|| DEFAULT_USER.to_owned());
        let curriculum = curriculum.or_else(|| env_value("TRACKER_CURRICULUM").map(PathBuf::from));

        Ok(Self {
            db_url,
            user: UserId::new(user)?,
            curriculum,
            attempt_ttl: attempt_ttl_from_env(),
        })
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Turn a bare or relative path into an absolute `sqlite://` URL.
fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("sqlite://") || trimmed.starts_with("sqlite::memory:") {
        return trimmed.to_owned();
    }
    if trimmed.starts_with("sqlite:file:") {
        return trimmed.to_owned();
    }

    let path = PathBuf::from(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_urls_pass_through() {
        assert_eq!(
            normalize_sqlite_url("sqlite://data/t.db".into()),
            "sqlite://data/t.db"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
    }

    #[test]
    fn bare_paths_become_absolute() {
        let url = normalize_sqlite_url("/tmp/tracker.db".into());
        assert_eq!(url, "sqlite:///tmp/tracker.db");
        let relative = normalize_sqlite_url("sqlite:tracker.db".into());
        assert!(relative.starts_with("sqlite:///") || relative.starts_with("sqlite://"));
        assert!(relative.ends_with("tracker.db"));
    }

    #[test]
    fn flags_override_environment_defaults() {
        let config = AppConfig::resolve(
            Some("sqlite:///tmp/a.db".into()),
            Some("alice".into()),
            Some(PathBuf::from("c.json")),
        )
        .unwrap();
        assert_eq!(config.db_url, "sqlite:///tmp/a.db");
        assert_eq!(config.user.as_str(), "alice");
        assert_eq!(config.curriculum, Some(PathBuf::from("c.json")));
        assert!(AppConfig::resolve(None, Some("  ".into()), None).is_err());
    }
}
