use crate::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const DEFAULT_FILTER: &str = "watch_party=debug,tower_http=debug,axum::rejection=trace,warn";

/// Installs the global subscriber: JSON logs, plus Jaeger export when enabled.
pub async fn init_telemetry(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .json();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = Registry::default().with(env_filter).with(fmt_layer);

    #[cfg(feature = "telemetry")]
    let otel_layer = if config.enable_telemetry {
        let tracer = jaeger_tracer(&config.jaeger_endpoint)?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };
    #[cfg(feature = "telemetry")]
    let registry = registry.with(otel_layer);

    registry.try_init()?;

    match (config.enable_telemetry, cfg!(feature = "telemetry")) {
        (true, true) => {
            tracing::info!(endpoint = %config.jaeger_endpoint, "Telemetry initialized")
        }
        (true, false) => {
            tracing::warn!("ENABLE_TELEMETRY is set but the telemetry feature is not compiled in")
        }
        (false, _) => tracing::info!("Telemetry disabled"),
    }
    Ok(())
}

#[cfg(feature = "telemetry")]
fn jaeger_tracer(
    endpoint: &str,
) -> Result<opentelemetry::sdk::trace::Tracer, Box<dyn std::error::Error>> {
    use opentelemetry::sdk::propagation::TraceContextPropagator;
    use opentelemetry::sdk::{
        trace::{self, RandomIdGenerator, Sampler},
        Resource,
    };
    use opentelemetry::{global, KeyValue};

    global::set_text_map_propagator(TraceContextPropagator::new());

    let tracer = opentelemetry_jaeger::new_collector_pipeline()
        .with_service_name("watch-party")
        .with_endpoint(endpoint)
        .with_isahc()
        .with_trace_config(
            trace::config()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_max_events_per_span(64)
                .with_max_attributes_per_span(16)
                .with_resource(Resource::new(vec![
                    KeyValue::new("service.name", "watch-party"),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                ])),
        )
        .with_timeout(std::time::Duration::from_secs(2))
        .install_batch(opentelemetry::runtime::Tokio)?;
    Ok(tracer)
}

/// Flushes pending spans before exit.
#[cfg(feature = "telemetry")]
pub fn shutdown_telemetry(config: &Config) {
    if config.enable_telemetry {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

#[cfg(not(feature = "telemetry"))]
pub fn shutdown_telemetry(_config: &Config) {}
