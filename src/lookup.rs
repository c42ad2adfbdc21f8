use crate::config::LookupConfig;
use crate::error::{EtlError, Result};
use crate::retry::{retry, Delay, RetryPolicy, TokioDelay};
use crate::types::{CoordinateResponse, TimeZoneResponse};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Resolution of UTC offsets and timezone identifiers against an
/// external lookup service.
#[async_trait]
pub trait TimeLookup: Send + Sync {
    /// Resolves a timezone identifier to its current UTC offset in
    /// fractional hours, rounded to two decimals.
    async fn offset_by_timezone(&self, time_zone: &str) -> Result<f64>;

    /// Resolves geographic coordinates to a timezone identifier.
    /// `Ok(None)` means the service answered but had no zone for the
    /// point; that is a resolved result, not a transient failure.
    async fn timezone_by_coordinates(
        &self,
        latitude: &str,
        longitude: &str,
    ) -> Result<Option<String>>;
}

/// timeapi.io-backed implementation. HTTP send and status check run
/// under the retry policy; response parsing happens outside it.
pub struct TimeApiClient {
    client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
    delay: Arc<dyn Delay>,
}

impl TimeApiClient {
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy {
                attempts: config.retry_attempts,
                delay: config.retry_delay(),
            },
            delay: Arc::new(TokioDelay),
        })
    }

    /// Swaps the inter-attempt wait, for tests that must not sleep.
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    async fn get_with_retry(&self, url: &str) -> Result<String> {
        retry(&self.policy, self.delay.as_ref(), || self.try_get(url)).await
    }

    async fn try_get(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::LookupStatus {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl TimeLookup for TimeApiClient {
    #[instrument(skip(self))]
    async fn offset_by_timezone(&self, time_zone: &str) -> Result<f64> {
        let url = format!("{}/api/TimeZone/zone?timeZone={}", self.base_url, time_zone);
        let body = self.get_with_retry(&url).await?;
        let offset = parse_offset_response(&body, time_zone)?;
        debug!(time_zone, offset, "Resolved UTC offset");
        Ok(offset)
    }

    #[instrument(skip(self))]
    async fn timezone_by_coordinates(
        &self,
        latitude: &str,
        longitude: &str,
    ) -> Result<Option<String>> {
        let url = format!(
            "{}/api/TimeZone/coordinate?latitude={}&longitude={}",
            self.base_url, latitude, longitude
        );
        let body = self.get_with_retry(&url).await?;
        let time_zone = parse_coordinate_response(&body)?;
        debug!(latitude, longitude, ?time_zone, "Resolved timezone by coordinates");
        Ok(time_zone)
    }
}

/// An absent `currentUtcOffset` means the zone was not resolvable; a
/// present one with zero seconds is genuinely UTC.
fn parse_offset_response(body: &str, time_zone: &str) -> Result<f64> {
    let response: TimeZoneResponse = serde_json::from_str(body)?;
    match response.current_utc_offset {
        Some(offset) => Ok(round_to_hundredths(f64::from(offset.seconds) / 3600.0)),
        None => Err(EtlError::OffsetUnavailable {
            time_zone: time_zone.to_string(),
        }),
    }
}

fn parse_coordinate_response(body: &str) -> Result<Option<String>> {
    let response: CoordinateResponse = serde_json::from_str(body)?;
    Ok(response.time_zone.filter(|tz| !tz.is_empty()))
}

/// Offsets are reported to two decimal places of fractional hours.
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_response_with_seconds_resolves_fractional_hours() {
        let body = r#"{"timeZone":"Europe/Amsterdam","currentUtcOffset":{"seconds":3600,"milliseconds":3600000,"ticks":36000000000,"nanoseconds":3600000000000}}"#;
        assert_eq!(parse_offset_response(body, "Europe/Amsterdam").unwrap(), 1.0);
    }

    #[test]
    fn sub_hour_offsets_keep_their_precision() {
        let body = r#"{"timeZone":"Asia/Kathmandu","currentUtcOffset":{"seconds":20700}}"#;
        assert_eq!(parse_offset_response(body, "Asia/Kathmandu").unwrap(), 5.75);

        let body = r#"{"timeZone":"Asia/Kolkata","currentUtcOffset":{"seconds":19800}}"#;
        assert_eq!(parse_offset_response(body, "Asia/Kolkata").unwrap(), 5.5);
    }

    #[test]
    fn negative_offsets_resolve() {
        let body = r#"{"timeZone":"America/New_York","currentUtcOffset":{"seconds":-18000}}"#;
        assert_eq!(parse_offset_response(body, "America/New_York").unwrap(), -5.0);
    }

    #[test]
    fn zero_seconds_with_offset_present_is_valid_utc() {
        let body = r#"{"timeZone":"Etc/UTC","currentUtcOffset":{"seconds":0}}"#;
        assert_eq!(parse_offset_response(body, "Etc/UTC").unwrap(), 0.0);
    }

    #[test]
    fn missing_offset_is_unavailable_not_zero() {
        let body = r#"{"timeZone":"Etc/UTC"}"#;
        match parse_offset_response(body, "Etc/UTC") {
            Err(EtlError::OffsetUnavailable { time_zone }) => assert_eq!(time_zone, "Etc/UTC"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn coordinate_response_yields_zone_or_none() {
        let body = r#"{"timeZone":"Europe/Amsterdam"}"#;
        assert_eq!(
            parse_coordinate_response(body).unwrap(),
            Some("Europe/Amsterdam".to_string())
        );

        assert_eq!(parse_coordinate_response(r#"{}"#).unwrap(), None);
        assert_eq!(parse_coordinate_response(r#"{"timeZone":""}"#).unwrap(), None);
    }
}
