// Inbound message contract from the settings surface

use crate::config::{AutoRefreshConfig, Config, SettingsUpdate, Thresholds};
use crate::filtering::ProcessingStats;
use serde::{Deserialize, Serialize};

/// Messages the settings surface sends to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundMessage {
    /// Thresholds and flags changed
    SettingsUpdated { data: SettingsUpdate },
    /// Report current configuration and last pass stats
    GetStatus,
    /// Unhide everything the engine hid
    ShowAllHidden,
}

/// Reply to an inbound message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageResponse {
    Status(StatusReport),
    Ack { success: bool },
}

impl MessageResponse {
    pub fn ok() -> Self {
        MessageResponse::Ack { success: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdsReport {
    pub minimum_spent: f64,
    pub proposals_min: u32,
    pub proposals_max: u32,
}

impl From<&Thresholds> for ThresholdsReport {
    fn from(t: &Thresholds) -> Self {
        Self {
            minimum_spent: t.minimum_spent,
            proposals_min: t.proposals_min,
            proposals_max: t.proposals_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRefreshReport {
    pub enabled: bool,
    pub refresh_interval_ms: u64,
}

impl From<&AutoRefreshConfig> for AutoRefreshReport {
    fn from(a: &AutoRefreshConfig) -> Self {
        Self {
            enabled: a.enabled,
            refresh_interval_ms: a.refresh_interval_ms,
        }
    }
}

/// `GET_STATUS` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub filtering_enabled: bool,
    pub thresholds: ThresholdsReport,
    pub auto_refresh: AutoRefreshReport,
    pub last_processing_ms: f64,
    pub last_hidden_count: usize,
    pub last_visible_count: usize,
    pub is_processing: bool,
}

impl StatusReport {
    pub fn new(config: &Config, stats: &ProcessingStats, is_processing: bool) -> Self {
        Self {
            filtering_enabled: config.filtering_enabled,
            thresholds: ThresholdsReport::from(&config.thresholds),
            auto_refresh: AutoRefreshReport::from(&config.auto_refresh),
            last_processing_ms: stats.last_duration_ms,
            last_hidden_count: stats.last_hidden_count,
            last_visible_count: stats.last_visible_count,
            is_processing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings_updated() {
        let msg: InboundMessage = serde_json::from_str(
            r#"{"type":"SETTINGS_UPDATED","data":{"minimumSpent":500,"proposalsMin":0,"proposalsMax":15,"autoRefreshEnabled":false}}"#,
        )
        .unwrap();

        match msg {
            InboundMessage::SettingsUpdated { data } => {
                assert_eq!(data.minimum_spent, 500.0);
                assert_eq!(data.proposals_max, 15);
                assert_eq!(data.filtering_enabled, None);
                assert_eq!(data.auto_refresh_enabled, Some(false));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_parse_bare_messages() {
        let status: InboundMessage = serde_json::from_str(r#"{"type":"GET_STATUS"}"#).unwrap();
        assert_eq!(status, InboundMessage::GetStatus);

        let show: InboundMessage = serde_json::from_str(r#"{"type":"SHOW_ALL_HIDDEN"}"#).unwrap();
        assert_eq!(show, InboundMessage::ShowAllHidden);

        assert!(serde_json::from_str::<InboundMessage>(r#"{"type":"PING"}"#).is_err());
    }

    #[test]
    fn test_status_wire_shape() {
        let stats = ProcessingStats {
            last_duration_ms: 1.5,
            last_hidden_count: 1,
            last_visible_count: 2,
        };
        let report = StatusReport::new(&Config::default(), &stats, false);
        let value = serde_json::to_value(MessageResponse::Status(report)).unwrap();

        assert_eq!(value["filteringEnabled"], true);
        assert_eq!(value["thresholds"]["minimumSpent"], 1.0);
        assert_eq!(value["thresholds"]["proposalsMax"], 100);
        assert_eq!(value["autoRefresh"]["refreshIntervalMs"], 60_000);
        assert_eq!(value["lastHiddenCount"], 1);
        assert_eq!(value["isProcessing"], false);
    }

    #[test]
    fn test_ack_wire_shape() {
        let value = serde_json::to_value(MessageResponse::ok()).unwrap();
        assert_eq!(value, serde_json::json!({ "success": true }));
    }
}
