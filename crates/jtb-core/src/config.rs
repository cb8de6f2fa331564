use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

use crate::{domain::UserId, errors::Error, Result};

const DEFAULT_AUTHORIZED_USERS_FILE: &str = "./data/authorized_users.json";

/// Typed configuration, read once at startup from the environment (and `.env`).
#[derive(Clone)]
pub struct Config {
    pub telegram_token: String,
    pub super_admin_id: UserId,
    /// `None` unless every Jenkins variable is set.
    pub jenkins: Option<JenkinsConfig>,
    pub authorized_users_file: PathBuf,
}

/// Jenkins connection settings for the `buildWithParameters` trigger.
#[derive(Clone)]
pub struct JenkinsConfig {
    pub url: String,
    pub user: String,
    pub token: String,
    pub job: String,
}

impl JenkinsConfig {
    pub fn trigger_url(&self) -> String {
        format!(
            "{}/job/{}/buildWithParameters",
            self.url.trim_end_matches('/'),
            self.job
        )
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    /// Build a config from an arbitrary variable lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let Some(telegram_token) = lookup("TELEGRAM_TOKEN").and_then(non_empty) else {
            return Err(Error::Config(
                "TELEGRAM_TOKEN environment variable is required".to_string(),
            ));
        };

        let Some(raw_admin) = lookup("SUPER_ADMIN_ID").and_then(non_empty) else {
            return Err(Error::Config(
                "SUPER_ADMIN_ID environment variable is required".to_string(),
            ));
        };
        let super_admin_id = raw_admin
            .trim()
            .parse::<i64>()
            .map(UserId)
            .map_err(|_| Error::Config(format!("SUPER_ADMIN_ID is not a number: {raw_admin}")))?;

        let jenkins = match (
            lookup("JENKINS_URL").and_then(non_empty),
            lookup("JENKINS_USER").and_then(non_empty),
            lookup("JENKINS_TOKEN").and_then(non_empty),
            lookup("JENKINS_JOB").and_then(non_empty),
        ) {
            (Some(url), Some(user), Some(token), Some(job)) => Some(JenkinsConfig {
                url: url.trim().to_string(),
                user,
                token,
                job: job.trim().to_string(),
            }),
            _ => None,
        };

        let authorized_users_file = PathBuf::from(
            lookup("AUTHORIZED_USERS_FILE")
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_AUTHORIZED_USERS_FILE.to_string()),
        );

        Ok(Self {
            telegram_token,
            super_admin_id,
            jenkins,
            authorized_users_file,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_token", &"<redacted>")
            .field("super_admin_id", &self.super_admin_id)
            .field("jenkins", &self.jenkins)
            .field("authorized_users_file", &self.authorized_users_file)
            .finish()
    }
}

impl fmt::Debug for JenkinsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JenkinsConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .field("job", &self.job)
            .finish()
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn requires_telegram_token() {
        let err = Config::from_lookup(lookup_from(&[("SUPER_ADMIN_ID", "1")])).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_TOKEN"));
    }

    #[test]
    fn requires_numeric_super_admin() {
        let err = Config::from_lookup(lookup_from(&[("TELEGRAM_TOKEN", "t")])).unwrap_err();
        assert!(err.to_string().contains("SUPER_ADMIN_ID"));

        let err = Config::from_lookup(lookup_from(&[
            ("TELEGRAM_TOKEN", "t"),
            ("SUPER_ADMIN_ID", "abc"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn jenkins_is_optional_but_all_or_nothing() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("TELEGRAM_TOKEN", "t"),
            ("SUPER_ADMIN_ID", " 42 "),
            ("JENKINS_URL", "http://ci"),
            ("JENKINS_USER", "bot"),
        ]))
        .unwrap();
        assert_eq!(cfg.super_admin_id, UserId(42));
        assert!(cfg.jenkins.is_none());
        assert_eq!(
            cfg.authorized_users_file,
            PathBuf::from(DEFAULT_AUTHORIZED_USERS_FILE)
        );
    }

    #[test]
    fn builds_trigger_url_without_double_slash() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("TELEGRAM_TOKEN", "t"),
            ("SUPER_ADMIN_ID", "1"),
            ("JENKINS_URL", "https://ci.example.com/"),
            ("JENKINS_USER", "bot"),
            ("JENKINS_TOKEN", "secret"),
            ("JENKINS_JOB", "deploy"),
            ("AUTHORIZED_USERS_FILE", "/var/lib/jtb/users.json"),
        ]))
        .unwrap();
        let jenkins = cfg.jenkins.as_ref().unwrap();
        assert_eq!(
            jenkins.trigger_url(),
            "https://ci.example.com/job/deploy/buildWithParameters"
        );
        assert_eq!(
            cfg.authorized_users_file,
            PathBuf::from("/var/lib/jtb/users.json")
        );
        assert!(!format!("{cfg:?}").contains("secret"));
    }

    #[test]
    fn parses_dotenv_lines() {
        let parsed = parse_dotenv(
            "# comment\n\nTELEGRAM_TOKEN=\"abc\"\nexport JENKINS_JOB='deploy'\nbroken line\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_TOKEN".to_string(), "abc".to_string()),
                ("JENKINS_JOB".to_string(), "deploy".to_string()),
            ]
        );
    }
}
