use rockstar_pipeline::WatcherConfig;

/// Server configuration loaded from environment variables.
///
/// Startup settings (bind address, CORS, timeout) have defaults suitable
/// for local development and fail fast on malformed values. Collaborator
/// credentials are kept as `Option`s and validated at call time: a missing
/// credential produces a 500 configuration error on the operations that
/// need it, never a crash at boot.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,

    /// ComfyDeploy bearer credential.
    pub comfy_api_key: Option<String>,
    /// ComfyDeploy API base URL.
    pub comfy_api_base: String,
    /// The deployed workflow runs are queued against.
    pub comfy_deployment_id: Option<String>,

    /// Email provider bearer credential.
    pub resend_api_key: Option<String>,
    /// Email provider API base URL.
    pub resend_api_base: String,
    /// RFC 5322 sender for notification emails.
    pub from_email: String,
    /// Admin copy recipient.
    pub admin_email: String,

    /// Shared secret for the reconciliation-sweep trigger.
    pub cron_secret: Option<String>,

    /// KV store REST endpoint.
    pub kv_rest_url: Option<String>,
    /// KV store REST token.
    pub kv_rest_token: Option<String>,

    /// Public base URL, linked from notification email footers.
    pub app_url: Option<String>,

    /// Interactive run-watcher pacing.
    pub watcher: WatcherConfig,
}

/// Default sender when `FROM_EMAIL` is not set.
const DEFAULT_FROM_EMAIL: &str = "School of Rock <rockstar@nube.media>";

/// Default admin copy recipient when `ADMIN_EMAIL` is not set.
const DEFAULT_ADMIN_EMAIL: &str = "fgalaz@mstudioprod.com";

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                          |
    /// |------------------------|----------------------------------|
    /// | `HOST`                 | `0.0.0.0`                        |
    /// | `PORT`                 | `3000`                           |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`          |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                             |
    /// | `COMFY_API_KEY`        | — (submit/status/sweep need it)  |
    /// | `COMFY_API_BASE`       | `https://api.comfydeploy.com`    |
    /// | `COMFY_DEPLOYMENT_ID`  | — (submit needs it)              |
    /// | `RESEND_API_KEY`       | — (notify/sweep need it)         |
    /// | `RESEND_API_BASE`      | `https://api.resend.com`         |
    /// | `FROM_EMAIL`           | the School of Rock sender        |
    /// | `ADMIN_EMAIL`          | the admin copy recipient         |
    /// | `CRON_SECRET`          | — (sweep trigger refuses without)|
    /// | `KV_REST_API_URL`      | — (in-memory fallback without)   |
    /// | `KV_REST_API_TOKEN`    | — (in-memory fallback without)   |
    /// | `APP_URL`              | —                                |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            comfy_api_key: non_empty_var("COMFY_API_KEY"),
            comfy_api_base: std::env::var("COMFY_API_BASE")
                .unwrap_or_else(|_| rockstar_comfy::api::DEFAULT_API_BASE.into()),
            comfy_deployment_id: non_empty_var("COMFY_DEPLOYMENT_ID"),
            resend_api_key: non_empty_var("RESEND_API_KEY"),
            resend_api_base: std::env::var("RESEND_API_BASE")
                .unwrap_or_else(|_| rockstar_mailer::resend::DEFAULT_API_BASE.into()),
            from_email: std::env::var("FROM_EMAIL").unwrap_or_else(|_| DEFAULT_FROM_EMAIL.into()),
            admin_email: std::env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.into()),
            cron_secret: non_empty_var("CRON_SECRET"),
            kv_rest_url: non_empty_var("KV_REST_API_URL"),
            kv_rest_token: non_empty_var("KV_REST_API_TOKEN"),
            app_url: non_empty_var("APP_URL").map(|url| url.trim_end_matches('/').to_string()),
            watcher: WatcherConfig::default(),
        }
    }
}

/// Read an env var, treating unset and blank the same way.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
