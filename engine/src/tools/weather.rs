//! Weather lookup tool backed by wttr.in's JSON format.

use async_trait::async_trait;
use reqwest::Client;
use sdk::types::{ToolError, ToolInput, ToolOutput, ToolSpec};
use serde::Deserialize;
use tracing::info;

use super::Tool;

pub struct WeatherTool {
    client: Client,
    base_url: String,
}

impl WeatherTool {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: super::http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "weather_info",
            "Fetches the current weather for a given city.",
            &[("city", "string", "The city to get weather information for.")],
        )
    }

    async fn invoke(&self, input: &ToolInput) -> Result<ToolOutput, ToolError> {
        let city = input.param_str("city")?;
        let city = city.trim();
        if city.is_empty() {
            return Err(ToolError::InvalidParameter(
                "city must not be empty".to_string(),
            ));
        }

        info!("Weather lookup: {}", city);
        let url = format!("{}/{}", self.base_url, urlencoding::encode(city));
        let response = self
            .client
            .get(&url)
            .query(&[("format", "j1")])
            .send()
            .await
            .map_err(|e| ToolError::Upstream(format!("weather request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(super::upstream_error("wttr.in", response).await);
        }

        let report: WeatherReport = response
            .json()
            .await
            .map_err(|e| ToolError::Upstream(format!("invalid weather response: {}", e)))?;

        let current = report
            .current_condition
            .into_iter()
            .next()
            .ok_or_else(|| ToolError::Upstream(format!("no weather data for {}", city)))?;

        let description = current
            .weather_desc
            .first()
            .map(|d| d.value.trim().to_lowercase())
            .unwrap_or_else(|| "unknown conditions".to_string());

        Ok(ToolOutput::text(format!(
            "Weather in {}: {}°C, {}",
            city, current.temp_c, description
        )))
    }
}

#[derive(Debug, Deserialize)]
struct WeatherReport {
    #[serde(default)]
    current_condition: Vec<CurrentCondition>,
}

#[derive(Debug, Deserialize)]
struct CurrentCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<DescValue>,
}

#[derive(Debug, Deserialize)]
struct DescValue {
    value: String,
}
