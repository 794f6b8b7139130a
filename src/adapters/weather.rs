//! Weather lookup against wttr.in.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::provider::http::shared_client;

pub const DEFAULT_BASE_URL: &str = "https://wttr.in";

/// Result of a weather lookup. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherOutcome {
    /// One-line human readable summary.
    Summary(String),
    Failed { error: String },
}

/// A weather capability: place name in, summary or failure out.
#[async_trait]
pub trait WeatherService: Send + Sync {
    async fn summary(&self, place: &str) -> WeatherOutcome;
}

/// Client for the wttr.in JSON API (`?format=j1`).
#[derive(Debug, Clone)]
pub struct WttrClient {
    base_url: String,
}

impl Default for WttrClient {
    fn default() -> Self {
        Self::new(None)
    }
}

impl WttrClient {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn url_for(&self, place: &str) -> Result<Url, String> {
        let mut url = Url::parse(&format!("{}/", self.base_url)).map_err(|e| e.to_string())?;
        url.path_segments_mut()
            .map_err(|_| format!("weather base url cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .push(place);
        url.query_pairs_mut().append_pair("format", "j1");
        Ok(url)
    }

    async fn fetch(&self, place: &str) -> Result<WeatherOutcome, reqwest::Error> {
        let url = match self.url_for(place) {
            Ok(url) => url,
            Err(error) => return Ok(WeatherOutcome::Failed { error }),
        };
        debug!(%url, "fetching weather");

        let resp = shared_client().get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Ok(WeatherOutcome::Failed {
                error: format!("weather fetch failed: {}", status.as_u16()),
            });
        }
        let body: Value = resp.json().await?;
        Ok(WeatherOutcome::Summary(summarize(&body)))
    }
}

#[async_trait]
impl WeatherService for WttrClient {
    async fn summary(&self, place: &str) -> WeatherOutcome {
        match self.fetch(place).await {
            Ok(outcome) => {
                if let WeatherOutcome::Failed { error } = &outcome {
                    warn!(place, %error, "weather lookup failed");
                }
                outcome
            }
            Err(e) => {
                warn!(place, error = %e, "weather lookup failed");
                WeatherOutcome::Failed { error: e.to_string() }
            }
        }
    }
}

#[derive(Deserialize)]
struct WttrReport {
    #[serde(default)]
    current_condition: Vec<CurrentCondition>,
}

#[derive(Deserialize)]
struct CurrentCondition {
    #[serde(rename = "temp_C")]
    temp_c: Option<String>,
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<Described>,
}

#[derive(Deserialize)]
struct Described {
    value: Option<String>,
}

/// `"<temp>°C - <description>"`, or the raw JSON when the expected shape is
/// missing.
fn summarize(body: &Value) -> String {
    let current = serde_json::from_value::<WttrReport>(body.clone())
        .ok()
        .and_then(|r| r.current_condition.into_iter().next());

    match current {
        Some(CurrentCondition {
            temp_c: Some(temp),
            weather_desc,
        }) if !temp.is_empty() => {
            let desc = weather_desc
                .into_iter()
                .next()
                .and_then(|d| d.value)
                .unwrap_or_default();
            format!("{temp}°C - {desc}")
        }
        _ => body.to_string(),
    }
}
