use agentmux::app::Application;
use agentmux::cli::Args;
use agentmux::config::{LogFormat, LoggingSettings, Settings};
use agentmux::context::AppContext;
use agentmux::core::error::AgentError;
use agentmux::display;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(args: Args) -> Result<(), AgentError> {
    let settings = Settings::load()?;
    init_logging(&settings.logging);

    let context = AppContext::from_settings(settings).await?;
    Application::new(args, context).run().await
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        display::display_error(&e);
        std::process::exit(1);
    }
}
