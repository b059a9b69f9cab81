use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub poll: PollConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// Path the meeting platform posts webhooks to
    pub webhook_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Pause between poll loop ticks
    pub interval_ms: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    pub nats_url: String,
    /// Root of every gateway subject (`<prefix>.join`, `<prefix>.<stream_id>.transcript`, ...)
    pub subject_prefix: String,
    pub join_timeout_ms: u64,
}

impl TransportConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

impl Config {
    /// Load from an optional config file, then `RTMS__*` environment overrides
    ///
    /// e.g. `RTMS__SERVICE__HTTP__PORT=9000`, `RTMS__TRANSPORT__NATS_URL=nats://nats:4222`
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "rtms-coordinator")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 8080_i64)?
            .set_default("service.http.webhook_path", "/webhook")?
            .set_default("poll.interval_ms", 20_i64)?
            .set_default("transport.nats_url", "nats://localhost:4222")?
            .set_default("transport.subject_prefix", "rtms")?
            .set_default("transport.join_timeout_ms", 5000_i64)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("RTMS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
