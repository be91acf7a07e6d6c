use std::time::Duration;

use reqwest::Client;

pub const USER_AGENT: &str = "ad-normalizer";

/// Outbound client shared by the ad-server and transcoder calls.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
}
