use std::sync::Arc;

use anyhow::{Context, Result};
use aws_sdk_sqs::Client as SqsClient;
use backend_storage::queue::{MessageQueue, SqsQueue};
use datadog_tracing::axum::shutdown_signal;
use insight_worker::{
    callback::CallbackSender,
    dispatch::DispatchTable,
    gemini::GeminiClient,
    producer::QueueProducer,
    queue_processor::QueueProcessor,
    server,
    services::{DigestService, NoMetadata, VisionService},
    types::Environment,
};
use metrics_exporter_dogstatsd::DogStatsDBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Default `DogStatsD` port of the Datadog agent
const DOGSTATSD_PORT: u16 = 8125;

#[tokio::main]
async fn main() -> Result<()> {
    let env = Environment::from_env();

    // Datadog tracing for staging/production, plain logs for development
    // The guard must be kept alive for the duration of the program
    let tracer = match env {
        Environment::Production | Environment::Staging => Some(datadog_tracing::init()?),
        Environment::Development => {
            fmt().with_env_filter(EnvFilter::from_default_env()).init();
            None
        }
    };

    info!("Starting Insight Worker in {:?} environment", env);

    if let Some(dd_agent_host) = env.dd_agent_host() {
        DogStatsDBuilder::default()
            .with_remote_address(format!("{dd_agent_host}:{DOGSTATSD_PORT}"))?
            .install()
            .context("Failed to install DogStatsD recorder")?;

        info!("✅ Initialized DogStatsD metrics");
    }

    // Initialize analysis queue
    let queue_config = env.queue_config();
    let sqs_client = Arc::new(SqsClient::new(&env.aws_config().await));
    let queue: Arc<dyn MessageQueue> = Arc::new(SqsQueue::new(sqs_client, &queue_config));

    info!("✅ Initialized analysis queue {}", queue_config.queue_url);

    // Initialize handlers
    let generator = Arc::new(GeminiClient::new(env.gemini_config()));
    let dispatch = Arc::new(DispatchTable::new(
        Arc::new(VisionService::new(generator.clone(), Arc::new(NoMetadata))),
        Arc::new(DigestService::new(generator)),
        env.callback_urls(),
    ));
    let producer = Arc::new(QueueProducer::new(queue.clone()));

    // Single shutdown token for everything
    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down Insight Worker...");
        signal_token.cancel();
    });

    // Start queue processor
    let queue_processor_handle = {
        let processor = QueueProcessor::new(
            queue,
            dispatch,
            Arc::new(CallbackSender::new()),
            env.processor_config(),
            shutdown_token.clone(),
        );

        tokio::spawn(processor.start())
    };

    // Start HTTP server (blocks until shutdown)
    let server_result = server::start(env, producer, shutdown_token.clone()).await;

    // Stop the processor as well if the server failed
    shutdown_token.cancel();
    if let Err(e) = queue_processor_handle.await {
        error!(error = ?e, "Queue processor task failed");
    }

    // Ensure the tracer is properly shut down
    if let Some((_guard, tracer_shutdown)) = tracer {
        tracer_shutdown.shutdown();
    }

    info!("✅ Insight Worker shutdown complete");

    server_result
}
