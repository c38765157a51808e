//! HTTP client factory with retry/backoff, exposed for a future real
//! `BrokerClient` HTTP adapter. No such adapter ships in this core — the
//! in-memory `BrokerClient` is what `Application::build` wires by default
//! — but the retry/backoff policy mirrors spec.md §4.9/§7's broker retry
//! requirements, so the factory is carried as ambient infrastructure.

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;

pub struct HttpClientFactory;

impl HttpClientFactory {
    pub fn create_client() -> ClientWithMiddleware {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(5);

        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }
}
