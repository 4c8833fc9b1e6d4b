//! Per-endpoint collection: fetch, decode, parse, compute, publish.

use chrono::{Local, NaiveDateTime};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::UrlConfig;
use crate::error::CollectError;
use crate::store::{MetricStore, SENTINEL};

/// Timestamp layout of the `DateLimit` field. The value carries no timezone
/// and is interpreted in the process's local time.
const DATE_LIMIT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const HOURS_PER_DAY: f64 = 24.0;

/// Response shape of the entitlement endpoints.
///
/// Every field is optional at the decode layer, matching servers that omit
/// fields instead of sending empty ones. Only `data.DateLimit` participates
/// in computation; the rest is diagnostic.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiResponse {
    pub status: i64,
    pub message: Value,
    pub data: ResponseData,
    pub error: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResponseData {
    #[serde(rename = "AuthorizerDate")]
    pub authorizer_date: String,
    #[serde(rename = "DateLimit")]
    pub date_limit: String,
}

/// Polls one endpoint and publishes exactly one value for it.
///
/// Never fails outward: any error along the fetch-decode-parse path
/// publishes the sentinel and is reported through the log, so one bad
/// endpoint cannot disturb the rest of the cycle.
pub fn collect(client: &Client, endpoint: &UrlConfig, store: &MetricStore) {
    let key = endpoint.metric_key();
    match poll(client, endpoint) {
        Ok(days) => {
            debug!(url = %endpoint.url, label = %endpoint.label, days, "poll succeeded");
            store.set(&key, days);
        }
        Err(err) => {
            warn!(url = %endpoint.url, label = %endpoint.label, error = %err, "poll failed");
            store.set(&key, SENTINEL);
        }
    }
}

/// The fallible part of a poll, short-circuiting at the first failure.
fn poll(client: &Client, endpoint: &UrlConfig) -> Result<f64, CollectError> {
    // The remote contract is a POST with an empty body.
    let body = client
        .post(&endpoint.url)
        .send()
        .and_then(|response| response.text())
        .map_err(|source| CollectError::Transport {
            url: endpoint.url.clone(),
            source,
        })?;

    let response: ApiResponse =
        serde_json::from_str(&body).map_err(|source| CollectError::MalformedBody {
            url: endpoint.url.clone(),
            source,
        })?;

    let date_limit = response.data.date_limit;
    if date_limit.is_empty() {
        return Err(CollectError::MissingDateLimit {
            url: endpoint.url.clone(),
        });
    }

    let expiry = NaiveDateTime::parse_from_str(&date_limit, DATE_LIMIT_FORMAT).map_err(
        |source| CollectError::UnparseableDate {
            url: endpoint.url.clone(),
            value: date_limit.clone(),
            source,
        },
    )?;

    Ok(round_to(days_until(expiry), 2))
}

/// Signed days between now and `expiry`; negative means already expired.
fn days_until(expiry: NaiveDateTime) -> f64 {
    let now = Local::now().naive_local();
    (expiry - now).num_seconds() as f64 / (HOURS_PER_DAY * 3600.0)
}

/// Rounds to `precision` decimal places, halves away from zero.
fn round_to(value: f64, precision: i32) -> f64 {
    let scale = 10f64.powi(precision);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, DATE_LIMIT_FORMAT).unwrap()
    }

    #[test]
    fn round_halves_away_from_zero() {
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(round_to(-0.125, 2), -0.13);
    }

    #[test]
    fn round_at_an_unrepresentable_half() {
        // 1.005 sits just below the halfway point in binary, so it rounds
        // down. Pinned so the policy cannot drift silently.
        assert_eq!(round_to(1.005, 2), 1.0);
    }

    #[test]
    fn round_keeps_two_decimals() {
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(-7.894, 2), -7.89);
        assert_eq!(round_to(3.0, 2), 3.0);
    }

    #[test]
    fn far_future_date_is_large_and_positive() {
        let days = days_until(parse("2099-01-01 00:00:00"));
        assert!(days > 20_000.0, "got {}", days);
    }

    #[test]
    fn past_date_is_negative() {
        let days = days_until(parse("2000-01-01 00:00:00"));
        assert!(days < 0.0, "got {}", days);
    }

    #[test]
    fn current_instant_is_roughly_zero() {
        let now = Local::now().naive_local();
        let days = round_to(days_until(now), 2);
        assert!(days.abs() < 0.01, "got {}", days);
    }

    #[test]
    fn decodes_full_payload() {
        let body = r#"
            {
                "status": 200,
                "message": "ok",
                "data": {
                    "AuthorizerDate": "2024-06-01 00:00:00",
                    "DateLimit": "2099-01-01 00:00:00"
                },
                "error": null
            }
        "#;

        let response: ApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.data.date_limit, "2099-01-01 00:00:00");
        assert_eq!(response.data.authorizer_date, "2024-06-01 00:00:00");
    }

    #[test]
    fn decodes_payload_with_missing_fields() {
        // Servers in the wild omit the data object entirely; that decodes
        // to an empty DateLimit, not a decode failure.
        let response: ApiResponse = serde_json::from_str(r#"{"status": 500}"#).unwrap();
        assert_eq!(response.status, 500);
        assert!(response.data.date_limit.is_empty());
    }

    #[test]
    fn message_and_error_fields_are_opaque() {
        let body = r#"
            {
                "message": {"nested": [1, 2, 3]},
                "error": "entitlement lookup failed",
                "data": {"DateLimit": "2030-05-05 12:00:00"}
            }
        "#;

        let response: ApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.data.date_limit, "2030-05-05 12:00:00");
    }

    #[test]
    fn rejects_dates_off_the_layout() {
        assert!(NaiveDateTime::parse_from_str("2099-01-01", DATE_LIMIT_FORMAT).is_err());
        assert!(NaiveDateTime::parse_from_str("2099-41-99 99:99:99", DATE_LIMIT_FORMAT).is_err());
        assert!(
            NaiveDateTime::parse_from_str("2099-01-01T00:00:00Z", DATE_LIMIT_FORMAT).is_err()
        );
    }
}
