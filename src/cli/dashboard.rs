use anyhow::Result;
use clap::Parser;
use smarthome_dash::dashboard::start_dashboard;
use smarthome_dash::logging::{LogTarget, RotationPeriod, init_logging};
use smarthome_dash::settings::{DEFAULT_WEB_PORT, Settings};
use smarthome_dash::web::WebConfig;

#[derive(Parser, Debug)]
pub struct Params {
    /// Shelly Cloud server URL
    #[clap(long, env = "SHELLY_HOST")]
    shelly_host: Option<String>,
    /// Shelly Cloud authorization key
    #[clap(long, env = "SHELLY_AUTH_KEY")]
    shelly_key: Option<String>,
    /// Hostname or IP address of the Hue bridge
    #[clap(long, env = "HUE_BRIDGE")]
    hue_bridge: Option<String>,
    /// Hue bridge API user name
    #[clap(long, env = "HUE_USERNAME")]
    hue_user: Option<String>,
    /// Settings file (JSON). Command line values take precedence.
    #[clap(long)]
    settings: Option<String>,
    /// Poll interval in milliseconds
    #[clap(long)]
    poll_ms: Option<u64>,
    /// Port for the web UI
    #[clap(long)]
    web_port: Option<u16>,
    /// Disable the web UI
    #[clap(long, default_value_t = false)]
    no_web: bool,
    /// Directory with the dashboard's static assets
    #[clap(long, default_value = "static")]
    static_dir: String,
    /// Directory for rotating log files (if not set, logs to stdout)
    #[clap(long)]
    log_dir: Option<String>,
    /// Log rotation: minutely, hourly, daily or never
    #[clap(long, value_enum, ignore_case = true, default_value_t = RotationPeriod::Daily)]
    log_rotation: RotationPeriod,
    /// Number of log files to keep, 0 keeps all
    #[clap(long, default_value_t = 7)]
    max_log_files: usize,
    /// Also log to stdout when logging to files
    #[clap(long, default_value_t = false)]
    log_console: bool,
}

fn merge_settings(params: &Params, mut settings: Settings) -> Settings {
    if params.shelly_host.is_some() {
        settings.shelly_host = params.shelly_host.clone();
    }
    if params.shelly_key.is_some() {
        settings.shelly_auth_key = params.shelly_key.clone();
    }
    if params.hue_bridge.is_some() {
        settings.hue_bridge = params.hue_bridge.clone();
    }
    if params.hue_user.is_some() {
        settings.hue_username = params.hue_user.clone();
    }
    if let Some(poll_ms) = params.poll_ms {
        settings.poll_interval_ms = poll_ms;
    }
    if let Some(port) = params.web_port {
        settings.web_port = port;
    }
    if params.no_web {
        settings.web_enabled = false;
    }
    settings
}

#[tokio::main]
async fn main() -> Result<()> {
    let params = Params::parse();
    let _log_guard = init_logging(LogTarget::new(
        params.log_dir.clone(),
        params.log_rotation,
        params.max_log_files,
        params.log_console,
    ))?;

    let settings = match &params.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let settings = merge_settings(&params, settings);

    let web = WebConfig {
        port: if settings.web_port == 0 {
            DEFAULT_WEB_PORT
        } else {
            settings.web_port
        },
        enabled: settings.web_enabled,
        static_dir: params.static_dir.clone(),
    };

    start_dashboard(settings, web).await
}
