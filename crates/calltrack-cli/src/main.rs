use anyhow::Context;
use clap::Parser;
use serde_json::json;

use calltrack_service::{CallTrackingService, Config};

use settings::{Cli, OutputFormat};

mod settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt::init();

    let config = Config::get(cli.config.as_deref())?;
    let service = CallTrackingService::new(config)?;

    let mut failures = 0;
    for url in &cli.urls {
        match service.resolve(url).await {
            Ok(response) => {
                let rewrite = response.link_rewrite();
                match cli.format {
                    OutputFormat::Pretty => {
                        println!("{url}: {} ({})", rewrite.text, rewrite.href);
                    }
                    OutputFormat::Json => {
                        let line = json!({
                            "url": url,
                            "response": response,
                            "rewrite": rewrite,
                        });
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&line)
                                .context("failed to serialize output")?
                        );
                    }
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("{url}: {e}");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("failed to resolve {failures} of {} urls", cli.urls.len());
    }
    Ok(())
}
