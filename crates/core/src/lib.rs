pub mod autoblog;
pub mod domain;
pub mod llm;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;
    use std::time::Duration;

    const DEFAULT_STORE_DIR: &str = "./data";
    const DEFAULT_ADMIN_ACCESS_CODE: &str = "963651";
    const DEFAULT_AUTOBLOG_CHECK_INTERVAL_SECS: u64 = 60;
    pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub gemini_api_key: Option<String>,
        pub gemini_base_url: String,
        pub gemini_model: String,
        /// `None` leaves the transport default in place.
        pub gemini_timeout: Option<Duration>,
        pub sentry_dsn: Option<String>,
        pub store_dir: PathBuf,
        pub admin_access_code: String,
        pub autoblog_check_interval_secs: u64,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|name| std::env::var(name).ok())
        }

        pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let non_empty = |name: &str| {
                var(name)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            };

            let autoblog_check_interval_secs =
                parse_secs(non_empty("AUTOBLOG_CHECK_INTERVAL_SECS"), "AUTOBLOG_CHECK_INTERVAL_SECS")?
                    .unwrap_or(DEFAULT_AUTOBLOG_CHECK_INTERVAL_SECS);
            let gemini_timeout =
                parse_secs(non_empty("GEMINI_TIMEOUT_SECS"), "GEMINI_TIMEOUT_SECS")?
                    .map(Duration::from_secs);

            Ok(Self {
                gemini_api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")),
                gemini_base_url: non_empty("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
                gemini_model: non_empty("GEMINI_MODEL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                gemini_timeout,
                sentry_dsn: non_empty("SENTRY_DSN"),
                store_dir: non_empty("TRADENEXUS_STORE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR)),
                admin_access_code: non_empty("ADMIN_ACCESS_CODE")
                    .unwrap_or_else(|| DEFAULT_ADMIN_ACCESS_CODE.to_string()),
                autoblog_check_interval_secs,
            })
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }
    }

    fn parse_secs(value: Option<String>, name: &str) -> anyhow::Result<Option<u64>> {
        let Some(s) = value else {
            return Ok(None);
        };
        let secs = s
            .parse::<u64>()
            .with_context(|| format!("invalid {name}: {s}"))?;
        anyhow::ensure!(secs >= 1, "{name} must be >= 1");
        Ok(Some(secs))
    }

}
