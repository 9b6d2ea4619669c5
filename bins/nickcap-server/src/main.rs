use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use nickcap_api::error::IntegrationError;
use nickcap_api::event::{MessageEvent, RawPayload};
use nickcap_api::hooks::{ChallengeSigner, EventSink, HookSet};
use nickcap_core::config::NickcapConfig;
use nickcap_core::integration::NicknameIntegration;
use nickcap_webhook::dispatch::Dispatcher;
use nickcap_webhook::normalize::GroupMessageHandler;

#[derive(Parser)]
#[command(name = "nickcap-server", about = "Webhook nickname-capture server")]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(long, default_value = "config.toml", env = "NICKCAP_CONFIG")]
    config: String,
}

/// Placeholder signer: echoes the challenge token with an empty signature.
/// Real deployments plug the platform's signer in here.
struct UnsignedEchoSigner;

impl ChallengeSigner for UnsignedEchoSigner {
    fn sign(&self, challenge: &RawPayload) -> Result<serde_json::Value, IntegrationError> {
        let token = challenge
            .get("plain_token")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| IntegrationError::signing("challenge missing plain_token"))?;
        tracing::warn!("validation challenge answered without a signature (no signer configured)");
        Ok(serde_json::json!({ "plain_token": token, "signature": "" }))
    }
}

/// Terminal sink: the end of the line in this deployment.
struct LogSink;

impl EventSink for LogSink {
    fn deliver(&self, event: MessageEvent) {
        tracing::info!(
            message_id = %event.message_id,
            user_id = %event.sender.user_id,
            nickname = %event.sender.nickname,
            content = %event.content,
            "event delivered"
        );
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!(config = %cli.config, "loading configuration");
    let config = match NickcapConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let hooks = Arc::new(HookSet::new());
    let mut integration = NicknameIntegration::new(&config);
    integration.install(&hooks);

    let dispatcher = Arc::new(Dispatcher::new(hooks.clone(), Arc::new(UnsignedEchoSigner)));
    dispatcher.register_handler(
        "group_at_message_create",
        Arc::new(GroupMessageHandler::new(
            hooks.clone(),
            config.platform.clone(),
            Arc::new(LogSink),
        )),
    );

    let shutdown = CancellationToken::new();
    let server = tokio::spawn(nickcap_webhook::run(
        config.api_port,
        dispatcher.clone(),
        shutdown.clone(),
    ));

    tracing::info!("nickcap-server started, press Ctrl+C to stop");

    // SIGHUP reinstalls the integration with freshly loaded settings.
    let mut sighup = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to register SIGHUP handler");
            std::process::exit(1);
        }
    };

    loop {
        tokio::select! {
            _ = sighup.recv() => {
                tracing::info!(config = %cli.config, "SIGHUP received, reloading integration");
                match NickcapConfig::load(&cli.config) {
                    Ok(new_config) => {
                        integration.teardown(&hooks);
                        integration = NicknameIntegration::new(&new_config);
                        integration.install(&hooks);
                        if new_config.api_port != config.api_port {
                            tracing::warn!("api_port change requires a restart, keeping old port");
                        }
                        tracing::info!("integration reloaded");
                    }
                    Err(e) => tracing::error!(error = %e, "reload failed (keeping old integration)"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down...");
                break;
            }
        }
    }

    integration.teardown(&hooks);
    shutdown.cancel();
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "webhook server error"),
        Err(e) => tracing::error!(error = %e, "webhook server task panicked"),
    }
}
