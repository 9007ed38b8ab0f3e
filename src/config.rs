use anyhow::{Context, anyhow};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::pipeline::PipelineSettings;
use crate::pipeline::reader::MalformedRecordPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub mirror_database_url: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Pipeline
    pub data_dir: PathBuf,
    /// Kept as text, validated at the start of each run.
    pub min_fiscal_year: String,
    pub on_malformed_record: MalformedRecordPolicy,
    pub schedule: Option<Duration>,

    // Rate limiting
    pub rate_trigger_per_min: u32,

    pub summary_cache_ttl: Duration,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let schedule = match lookup("PIPELINE_SCHEDULE_SECS") {
            Some(raw) if !raw.trim().is_empty() => {
                let secs: u64 = parse("PIPELINE_SCHEDULE_SECS", &raw)?;
                if secs == 0 {
                    return Err(anyhow!("PIPELINE_SCHEDULE_SECS must be greater than zero"));
                }
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        let database_url = required("DATABASE_URL")?;
        let mirror_database_url = required("MIRROR_DATABASE_URL")?;
        // both sinks would replace the same summary table concurrently
        if database_url.trim() == mirror_database_url.trim() {
            return Err(anyhow!(
                "MIRROR_DATABASE_URL must point at a different database than DATABASE_URL"
            ));
        }

        Ok(Self {
            database_url,
            mirror_database_url,
            server_addr: or_default("SERVER_ADDR", "127.0.0.1:8080"),
            api_prefix: or_default("API_PREFIX", "/api"),

            data_dir: PathBuf::from(or_default("PAYROLL_DATA_DIR", "data")),
            min_fiscal_year: or_default("MIN_FISCAL_YEAR", "2021"),
            on_malformed_record: parse(
                "ON_MALFORMED_RECORD",
                &or_default("ON_MALFORMED_RECORD", "abort"),
            )?,
            schedule,

            rate_trigger_per_min: parse("RATE_TRIGGER_PER_MIN", &or_default("RATE_TRIGGER_PER_MIN", "6"))?,

            summary_cache_ttl: Duration::from_secs(parse(
                "SUMMARY_CACHE_TTL_SECS",
                &or_default("SUMMARY_CACHE_TTL_SECS", "300"),
            )?),
            log_dir: PathBuf::from(or_default("LOG_DIR", "logs")),
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            data_dir: self.data_dir.clone(),
            min_fiscal_year: Some(self.min_fiscal_year.clone()),
            on_malformed_record: self.on_malformed_record,
        }
    }
}

fn parse<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{key} has invalid value '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const URLS: [(&str, &str); 2] = [
        ("DATABASE_URL", "mysql://root@localhost/payroll"),
        ("MIRROR_DATABASE_URL", "mysql://root@localhost/warehouse"),
    ];

    #[test]
    fn defaults_apply() {
        let config = config(&URLS).unwrap();

        assert_eq!(config.server_addr, "127.0.0.1:8080");
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.min_fiscal_year, "2021");
        assert_eq!(config.on_malformed_record, MalformedRecordPolicy::Abort);
        assert_eq!(config.schedule, None);
        assert_eq!(config.rate_trigger_per_min, 6);
        assert_eq!(config.summary_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn database_urls_are_required() {
        let err = config(&URLS[..1]).unwrap_err();
        assert!(err.to_string().contains("MIRROR_DATABASE_URL"), "got: {err}");
    }

    #[test]
    fn mirror_must_differ_from_primary() {
        let err = config(&[
            ("DATABASE_URL", "mysql://root@localhost/payroll"),
            ("MIRROR_DATABASE_URL", "mysql://root@localhost/payroll"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("MIRROR_DATABASE_URL"), "got: {err}");
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = URLS.to_vec();
        vars.extend([
            ("ON_MALFORMED_RECORD", "Skip"),
            ("PIPELINE_SCHEDULE_SECS", "3600"),
            ("RATE_TRIGGER_PER_MIN", "2"),
        ]);

        let config = config(&vars).unwrap();

        assert_eq!(config.on_malformed_record, MalformedRecordPolicy::Skip);
        assert_eq!(config.schedule, Some(Duration::from_secs(3600)));
        assert_eq!(config.rate_trigger_per_min, 2);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut bad_policy = URLS.to_vec();
        bad_policy.push(("ON_MALFORMED_RECORD", "ignore"));
        assert!(config(&bad_policy).is_err());

        let mut zero_schedule = URLS.to_vec();
        zero_schedule.push(("PIPELINE_SCHEDULE_SECS", "0"));
        assert!(config(&zero_schedule).is_err());
    }

    #[test]
    fn min_fiscal_year_is_not_validated_at_startup() {
        let mut vars = URLS.to_vec();
        vars.push(("MIN_FISCAL_YEAR", "soon"));
        assert_eq!(config(&vars).unwrap().min_fiscal_year, "soon");
    }
}
