//! HTTP health probe for the streaming service.
//!
//! Once per session, three sequential status queries run against the same
//! base the stream comes from: `/check` for the service banner, `/islive` for
//! the liveness flag, `/defaultmea` for the default-source descriptor. The
//! probe runs concurrently with streaming; whether an offline report ends the
//! session is the coordinator's decision, driven by
//! [`OfflinePolicy`](crate::config::OfflinePolicy).

use serde_json::Value;
use tracing::info;

use crate::config::CaptureConfig;
use crate::error::{MeaError, MeaResult};

/// What the status endpoints reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Service banner from `/check`.
    pub banner: String,
    /// Liveness flag from `/islive`.
    pub live: bool,
    /// Default source name from `/defaultmea`, when the descriptor holds one.
    pub default_source: Option<String>,
}

/// Sequential status prober.
pub struct HealthProbe {
    base_url: String,
    client: reqwest::Client,
}

impl HealthProbe {
    /// Creates a probe for the configured service base.
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Runs the three status queries in order.
    ///
    /// Network failure on any query is `Transport`; a false liveness flag is
    /// `ServiceUnavailable`.
    pub async fn check(&self) -> MeaResult<ServiceStatus> {
        let banner = self.fetch("/check").await?;
        let live = parse_live(&self.fetch("/islive").await?);
        if !live {
            return Err(MeaError::ServiceUnavailable(format!("{banner} - Offline")));
        }

        let descriptor = self.fetch("/defaultmea").await?;
        let default_source = serde_json::from_str::<Value>(&descriptor)
            .ok()
            .as_ref()
            .and_then(second_to_last);

        info!(
            banner = %banner,
            default_source = default_source.as_deref().unwrap_or("unknown"),
            "service is live"
        );
        Ok(ServiceStatus {
            banner,
            live,
            default_source,
        })
    }

    async fn fetch(&self, endpoint: &str) -> MeaResult<String> {
        let url = format!("{}{endpoint}", self.base_url);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// `/islive` answers either a JSON bool or plain text.
fn parse_live(body: &str) -> bool {
    match serde_json::from_str::<bool>(body.trim()) {
        Ok(live) => live,
        Err(_) => body.trim().eq_ignore_ascii_case("true"),
    }
}

/// The descriptor array's second-to-last element names the default source.
fn second_to_last(descriptor: &Value) -> Option<String> {
    let items = descriptor.as_array()?;
    let index = items.len().checked_sub(2)?;
    match items.get(index)? {
        Value::String(name) => Some(name.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_and_text_liveness() {
        assert!(parse_live("true"));
        assert!(parse_live(" True\n"));
        assert!(!parse_live("false"));
        assert!(!parse_live("offline"));
    }

    #[test]
    fn default_source_is_second_to_last() {
        let descriptor = json!(["a", "b", "MEA-2", 7]);
        assert_eq!(second_to_last(&descriptor).unwrap(), "MEA-2");
    }

    #[test]
    fn short_descriptor_has_no_default_source() {
        assert!(second_to_last(&json!(["only"])).is_none());
        assert!(second_to_last(&json!({})).is_none());
    }
}
