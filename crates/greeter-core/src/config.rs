use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    errors::Error,
    gate::GateConfig,
    template::{Template, TemplateValues},
    Result,
};

const DEFAULT_OPENING_HOURS: &str = "Mon-Sun: 11am-11pm";
const DEFAULT_FOOD_EMOJI: &str = "🍽️";
/// Upper bound for `COOLDOWN_HOURS`, roughly ten years.
const MAX_COOLDOWN_HOURS: u64 = 10 * 366 * 24;

/// Typed configuration for the responder.
#[derive(Clone, Debug)]
pub struct Config {
    // Messenger
    pub telegram_bot_token: String,

    // Welcome message
    pub template: Template,
    pub template_values: TemplateValues,

    // Admission gate
    pub cooldown: Duration,
    pub cooldown_on_send_failure: bool,
    pub dedup_capacity: u64,
    pub dedup_ttl: Duration,

    // Audit
    pub audit_log_path: Option<PathBuf>,
    pub audit_log_json: bool,
}

impl Config {
    /// Load from the process environment, after a best-effort `.env` pass.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars(&lookup);

        let telegram_bot_token = vars.required("TELEGRAM_BOT_TOKEN")?;

        let template_values = TemplateValues {
            menu_url: vars.required("MENU_URL")?,
            restaurant_name: vars.required("RESTAURANT_NAME")?,
            opening_hours: vars
                .non_empty("OPENING_HOURS")
                .unwrap_or_else(|| DEFAULT_OPENING_HOURS.to_string()),
            food_emoji: vars
                .non_empty("FOOD_EMOJI")
                .unwrap_or_else(|| DEFAULT_FOOD_EMOJI.to_string()),
        };

        let template = match vars.non_empty("WELCOME_TEMPLATE_FILE") {
            Some(path) => {
                let raw = fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("cannot read WELCOME_TEMPLATE_FILE {path}: {e}"))
                })?;
                Template::parse(raw)?
            }
            None => Template::default(),
        };

        let cooldown_hours = vars.u64("COOLDOWN_HOURS")?.unwrap_or(12);
        if cooldown_hours == 0 {
            return Err(Error::Config("COOLDOWN_HOURS must be positive".to_string()));
        }
        if cooldown_hours > MAX_COOLDOWN_HOURS {
            return Err(Error::Config(format!(
                "COOLDOWN_HOURS must be at most {MAX_COOLDOWN_HOURS}"
            )));
        }
        let cooldown = Duration::from_secs(cooldown_hours * 60 * 60);
        let cooldown_on_send_failure = vars.bool("COOLDOWN_ON_SEND_FAILURE").unwrap_or(false);

        let dedup_capacity = vars.u64("DEDUP_CAPACITY")?.unwrap_or(10_000);
        if dedup_capacity == 0 {
            return Err(Error::Config("DEDUP_CAPACITY must be positive".to_string()));
        }
        let dedup_ttl_secs = vars.u64("DEDUP_TTL_SECS")?.unwrap_or(24 * 60 * 60);
        if dedup_ttl_secs == 0 {
            return Err(Error::Config("DEDUP_TTL_SECS must be positive".to_string()));
        }
        let dedup_ttl = Duration::from_secs(dedup_ttl_secs);

        let audit_log_path = vars.non_empty("AUDIT_LOG_PATH").map(PathBuf::from);
        let audit_log_json = vars.bool("AUDIT_LOG_JSON").unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            template,
            template_values,
            cooldown,
            cooldown_on_send_failure,
            dedup_capacity,
            dedup_ttl,
            audit_log_path,
            audit_log_json,
        })
    }

    pub fn gate(&self) -> GateConfig {
        GateConfig {
            cooldown: self.cooldown,
            dedup_capacity: self.dedup_capacity,
            dedup_ttl: self.dedup_ttl,
        }
    }

    pub fn welcome_text(&self) -> String {
        self.template.render(&self.template_values)
    }
}

struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    fn non_empty(&self, key: &str) -> Option<String> {
        (self.0)(key).and_then(non_empty)
    }

    fn required(&self, key: &str) -> Result<String> {
        self.non_empty(key)
            .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.non_empty(key).map(|s| {
            matches!(
                s.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    fn u64(&self, key: &str) -> Result<Option<u64>> {
        let Some(raw) = self.non_empty(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{key} must be a non-negative integer: {e}")))
    }
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

        let key = k.trim();
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

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("MENU_URL", "https://x.test/m"),
        ("RESTAURANT_NAME", "Casa Test"),
    ];

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(cfg.cooldown, Duration::from_secs(12 * 3600));
        assert!(!cfg.cooldown_on_send_failure);
        assert_eq!(cfg.dedup_capacity, 10_000);
        assert_eq!(cfg.dedup_ttl, Duration::from_secs(86_400));
        assert_eq!(cfg.template_values.food_emoji, DEFAULT_FOOD_EMOJI);
        assert_eq!(cfg.template_values.opening_hours, DEFAULT_OPENING_HOURS);
        assert!(cfg.audit_log_path.is_none());
        assert!(cfg.welcome_text().contains("Casa Test"));
    }

    #[test]
    fn required_values_are_enforced() {
        let err = Config::from_lookup(lookup(&BASE[..2])).unwrap_err();
        assert!(err.to_string().contains("RESTAURANT_NAME"));

        let mut blank = BASE.to_vec();
        blank[0] = ("TELEGRAM_BOT_TOKEN", "   ");
        assert!(Config::from_lookup(lookup(&blank)).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("COOLDOWN_HOURS", "6"),
            ("COOLDOWN_ON_SEND_FAILURE", "yes"),
            ("DEDUP_CAPACITY", "50"),
            ("DEDUP_TTL_SECS", "600"),
            ("FOOD_EMOJI", "🍕"),
            ("AUDIT_LOG_PATH", "/tmp/greeter-audit.log"),
            ("AUDIT_LOG_JSON", "1"),
        ]);
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.cooldown, Duration::from_secs(6 * 3600));
        assert!(cfg.cooldown_on_send_failure);
        assert_eq!(cfg.gate().dedup_capacity, 50);
        assert_eq!(cfg.gate().dedup_ttl, Duration::from_secs(600));
        assert_eq!(cfg.template_values.food_emoji, "🍕");
        assert_eq!(
            cfg.audit_log_path,
            Some(PathBuf::from("/tmp/greeter-audit.log"))
        );
        assert!(cfg.audit_log_json);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        for (key, val) in [
            ("COOLDOWN_HOURS", "0"),
            ("COOLDOWN_HOURS", "twelve"),
            ("COOLDOWN_HOURS", "2562047788015"),
            ("DEDUP_CAPACITY", "0"),
            ("DEDUP_TTL_SECS", "-1"),
        ] {
            let mut pairs = BASE.to_vec();
            pairs.push((key, val));
            assert!(
                Config::from_lookup(lookup(&pairs)).is_err(),
                "{key}={val} should be rejected"
            );
        }
    }

    #[test]
    fn template_file_is_loaded_and_validated() {
        let path = std::env::temp_dir().join(format!("greeter-tpl-{}.txt", std::process::id()));

        let p = path.to_string_lossy().to_string();
        let mut pairs = BASE.to_vec();
        pairs.push(("WELCOME_TEMPLATE_FILE", p.as_str()));

        std::fs::write(&path, "{{FOOD_EMOJI}} {{RESTAURANT_NAME}}").unwrap();
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.welcome_text(), "🍽️ Casa Test");

        std::fs::write(&path, "{{UNKNOWN}}").unwrap();
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn dotenv_parsing_strips_quotes_and_comments() {
        let parsed = parse_dotenv(
            "# comment\nMENU_URL=\"https://x.test/m\"\n\nRESTAURANT_NAME = 'Casa Test'\nbroken\n=novalue\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("MENU_URL".to_string(), "https://x.test/m".to_string()),
                ("RESTAURANT_NAME".to_string(), "Casa Test".to_string()),
            ]
        );
    }
}
