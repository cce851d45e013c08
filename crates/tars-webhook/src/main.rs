use anyhow::{anyhow, Result};
use tars_webhook::{cli, config::Config, tracing::setup_tracing, TarsWebhook};
use tokio::runtime;

fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Cannot install the default crypto provider"))?;

    let matches = cli::build_cli().get_matches();
    let config = Config::from_args(&matches)?;

    let runtime = runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async {
        setup_tracing(&config.log_level, &config.log_fmt, config.log_no_color)?;

        let webhook = TarsWebhook::new_from_config(config).await?;
        webhook.run().await
    })
}
