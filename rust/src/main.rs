//! Entry point: one run, one summary notification, exit status mirrors the run.

use std::process::ExitCode;

use partner_rs::bot::Bot;
use partner_rs::config::{CredentialStore, Settings, BOT_URL_KEY};
use partner_rs::http::UreqTransport;
use partner_rs::notify::{DeliveryTarget, RunLog};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = match Settings::discover() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(error = %err, "settings could not be loaded");
            return ExitCode::FAILURE;
        }
    };

    let transport = UreqTransport::new();
    let mut log = RunLog::new(DeliveryTarget::from_setting(settings.get(BOT_URL_KEY).as_deref()));

    let succeeded = Bot::new(&transport, &settings, &mut log).run();
    let delivery = if succeeded {
        log.end("✅ run succeeded", false, &transport)
    } else {
        log.end("❌ run failed", true, &transport)
    };
    if let Err(err) = delivery {
        tracing::warn!(error = %err, "summary notification was not delivered");
    }

    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
