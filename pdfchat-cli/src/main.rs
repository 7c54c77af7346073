use clap::Parser;
use pdfchat_cli::Cli;
use pdfchat_telemetry::TelemetryConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    pdfchat_telemetry::init(
        &TelemetryConfig::new("pdfchat")
            .with_format(cli.log_format)
            .with_default_filter(cli.command.default_log_filter()),
    )?;

    pdfchat_cli::run(cli).await
}
