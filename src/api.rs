// API client module: a small blocking HTTP client that posts raw picture
// bytes to the prediction endpoint and hands back the response text.
// Requests are synchronous so uploads happen strictly one at a time.

use anyhow::{Context, Result};
use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use crate::config::Config;

/// Credential header sent with every request (names are case-insensitive).
pub const PREDICTION_KEY_HEADER: &str = "prediction-key";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Anything that can turn picture bytes into a prediction text.
/// The batch loop only depends on this, which keeps it testable without
/// a network.
pub trait Predict {
    fn predict(&self, picture: Vec<u8>) -> Result<String>;
}

/// Holds a reqwest blocking client preconfigured with the prediction key,
/// plus the endpoint every picture is posted to.
pub struct PredictionClient {
    client: Client,
    endpoint_url: String,
}

impl PredictionClient {
    /// Build a client from the loaded configuration. The key becomes a
    /// default header so it is identical on every request of the run; a
    /// key that cannot be a header value is rejected here.
    pub fn new(config: &Config) -> Result<Self> {
        let mut key = HeaderValue::from_str(&config.prediction_key)
            .context("Prediction key is not a valid header value")?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(PREDICTION_KEY_HEADER), key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(PredictionClient {
            client,
            endpoint_url: config.prediction_endpoint_url.clone(),
        })
    }
}

impl Predict for PredictionClient {
    /// POST the bytes as an octet stream and return the body text.
    /// A non-success status is an error carrying the status and body.
    fn predict(&self, picture: Vec<u8>) -> Result<String> {
        debug!("Posting {} bytes to {}", picture.len(), self.endpoint_url);
        let res = self
            .client
            .post(&self.endpoint_url)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(picture)
            .send()
            .context("Failed to send prediction request")?;

        let status = res.status();
        debug!("Prediction endpoint answered {}", status);
        if !status.is_success() {
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Prediction failed: {} - {}", status, txt);
        }
        res.text().context("Failed to read prediction response")
    }
}
