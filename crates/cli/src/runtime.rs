//! Startup glue for the bridge and worker processes.

use std::sync::Arc;

use {
    anyhow::{Context, Result},
    courier_broker::{Broker, MemoryBroker, NatsBroker, Publisher},
    courier_commands::{CommandRegistry, HandlerContext, LocaleBundle, load_commands},
    courier_config::CourierConfig,
    courier_discord::{Bridge, BridgeConfig, ClientOptions, DiscordClient},
    courier_storage::SqliteGuildSettingsStore,
    courier_worker::Dispatcher,
    secrecy::ExposeSecret,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

/// Connect to the configured NATS server.
pub async fn nats(config: &CourierConfig) -> Result<Arc<dyn Broker>> {
    let broker = NatsBroker::connect(&config.broker.url)
        .await
        .with_context(|| format!("cannot reach broker at {}", config.broker.url))?;
    Ok(Arc::new(broker))
}

async fn declare_queues(config: &CourierConfig, broker: &dyn Broker) -> Result<()> {
    for queue in [&config.broker.inbox_queue, &config.broker.reply_queue] {
        broker
            .declare(queue)
            .await
            .with_context(|| format!("cannot declare queue {queue}"))?;
    }
    Ok(())
}

/// Run the Discord bridge until cancelled or the gateway connection ends.
pub async fn run_bridge(
    config: &CourierConfig,
    broker: Arc<dyn Broker>,
    cancel: CancellationToken,
) -> Result<()> {
    let token = config
        .discord
        .usable_token()
        .context("DISCORD_APP_TOKEN not set")?;
    let descriptors = load_commands(&config.commands.dir)?;
    let commands = if config.discord.register_commands {
        descriptors.iter().map(|d| d.manifest()).collect()
    } else {
        Vec::new()
    };

    declare_queues(config, broker.as_ref()).await?;
    let deliveries = broker.consume(&config.broker.reply_queue).await?;

    let (client, events) = DiscordClient::build(token, ClientOptions {
        activity: config.discord.activity.clone(),
        commands,
    })
    .await?;
    let bridge = Bridge::new(
        BridgeConfig::from(&config.discord),
        client.gateway(),
        Publisher::new(Arc::clone(&broker), config.broker.inbox_queue.clone()),
    );

    let bridge_task = tokio::spawn(bridge.run(events, deliveries, cancel.clone()));
    let result = client.run(cancel.clone()).await;
    // The loop has nothing left to serve once the gateway is gone.
    cancel.cancel();
    bridge_task.await.context("bridge loop panicked")?;
    result.context("discord gateway failed")
}

/// Run the inbox worker until cancelled or the queue closes.
pub async fn run_worker(
    config: &CourierConfig,
    broker: Arc<dyn Broker>,
    cancel: CancellationToken,
) -> Result<()> {
    let pool = courier_storage::connect(&config.storage.database_url)
        .await
        .with_context(|| format!("cannot open database {}", config.storage.database_url))?;
    let registry = CommandRegistry::build(
        load_commands(&config.commands.dir)?,
        config.commands.handler_set,
    )?;
    let locales = LocaleBundle::load(&config.locales.dir, config.locales.default_locale.clone());
    if locales.is_empty() {
        warn!(dir = %config.locales.dir.display(), "no locales loaded, replies use built-in text");
    }
    if config.ai.enabled && !config.ai.api_key.expose_secret().is_empty() {
        info!(model = %config.ai.model, "completion backend configured");
    }

    declare_queues(config, broker.as_ref()).await?;
    let ctx = HandlerContext::new(
        Arc::new(SqliteGuildSettingsStore::new(pool)),
        Arc::new(locales),
        Publisher::new(Arc::clone(&broker), config.broker.reply_queue.clone()),
    );
    let deliveries = broker.consume(&config.broker.inbox_queue).await?;
    Dispatcher::new(Arc::new(registry), ctx)
        .run(deliveries, cancel)
        .await;
    Ok(())
}

/// Bridge and worker in one process over the in-memory broker.
pub async fn run_standalone(config: &CourierConfig, cancel: CancellationToken) -> Result<()> {
    let broker: Arc<dyn Broker> = Arc::new(MemoryBroker::new());
    info!("running bridge and worker in one process");
    let worker = run_worker(config, Arc::clone(&broker), cancel.clone());
    let bridge = async {
        let result = run_bridge(config, Arc::clone(&broker), cancel.clone()).await;
        // Without a bridge, the worker would wait forever.
        cancel.cancel();
        result
    };
    tokio::try_join!(bridge, worker)?;
    Ok(())
}
