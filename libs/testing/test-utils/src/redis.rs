//! Redis test container

use redis::Client;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

/// Redis 8 container removed on drop.
///
/// ```no_run
/// use test_utils::TestRedis;
///
/// # async fn example() {
/// let redis = TestRedis::new().await;
/// let url = redis.url();
/// # }
/// ```
pub struct TestRedis {
    #[allow(dead_code)]
    container: ContainerAsync<Redis>,
    host_port: u16,
    url: String,
}

impl TestRedis {
    pub async fn new() -> Self {
        let container = Redis::default()
            .with_tag("8-alpine")
            .start()
            .await
            .expect("Failed to start Redis container");

        let host_port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let url = format!("redis://127.0.0.1:{}", host_port);
        tracing::info!(port = host_port, "Test Redis ready (8-alpine)");

        Self {
            container,
            host_port,
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn host_port(&self) -> u16 {
        self.host_port
    }

    /// Raw client for assertions that bypass the code under test
    pub fn client(&self) -> Client {
        Client::open(self.url.as_str()).expect("valid test Redis URL")
    }

    /// Pause the container to simulate an unreachable backend
    pub async fn pause(&self) {
        self.container
            .pause()
            .await
            .expect("Failed to pause Redis container");
    }

    pub async fn unpause(&self) {
        self.container
            .unpause()
            .await
            .expect("Failed to unpause Redis container");
    }
}
