//! Uplink configuration.

use serde::Deserialize;

/// MQTT uplink configuration.
///
/// `broker_host` and `device_name` are optional on purpose: messaging
/// is optional infrastructure for an OwlCam device, and a config
/// missing either field runs the uplink in disabled mode, where every
/// send is skipped. [`UplinkConfig::messaging_enabled`] makes that
/// check explicit so call sites can log which mode they got.
#[derive(Debug, Clone, Deserialize)]
pub struct UplinkConfig {
    /// Broker hostname or IP address. `None` disables messaging.
    #[serde(default)]
    pub broker_host: Option<String>,

    /// Broker port.
    #[serde(default = "default_port")]
    pub broker_port: u16,

    /// Device name, also used as the MQTT client id. `None` disables
    /// messaging.
    #[serde(default)]
    pub device_name: Option<String>,

    /// Maximum number of undelivered messages buffered for retry.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// MQTT keep-alive interval in seconds.
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u16,

    /// Upper bound on a single publish attempt, in seconds.
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_secs: u64,

    /// Pause between reconnection attempts after a transport error.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// Topic filters re-subscribed on every successful connection.
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

fn default_port() -> u16 {
    1883
}

fn default_queue_capacity() -> usize {
    100
}

fn default_keepalive() -> u16 {
    30
}

fn default_publish_timeout() -> u64 {
    5
}

fn default_reconnect_delay() -> u64 {
    5
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            broker_host: None,
            broker_port: default_port(),
            device_name: None,
            queue_capacity: default_queue_capacity(),
            keepalive_secs: default_keepalive(),
            publish_timeout_secs: default_publish_timeout(),
            reconnect_delay_secs: default_reconnect_delay(),
            subscriptions: Vec::new(),
        }
    }
}

impl UplinkConfig {
    /// Whether a broker connection can be attempted at all.
    ///
    /// Both the broker address and the device name must be present.
    /// Anything less means the device runs with messaging disabled.
    pub fn messaging_enabled(&self) -> bool {
        self.broker_host.as_deref().is_some_and(|h| !h.is_empty())
            && self.device_name.as_deref().is_some_and(|d| !d.is_empty())
    }

    /// Build a config from the process environment.
    ///
    /// Reads `MQTT_BROKER_IP`, `MQTT_DEVICE_NAME` and optionally
    /// `MQTT_BROKER_PORT`. Missing variables leave messaging disabled
    /// rather than failing.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// Backend of [`UplinkConfig::from_env`], separated so tests can
    /// supply variables without touching the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let broker_port = lookup("MQTT_BROKER_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or_else(default_port);

        Self {
            broker_host: lookup("MQTT_BROKER_IP"),
            device_name: lookup("MQTT_DEVICE_NAME"),
            broker_port,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_messaging_disabled() {
        let config = UplinkConfig::default();
        assert!(!config.messaging_enabled());
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.keepalive_secs, 30);
        assert_eq!(config.reconnect_delay_secs, 5);
        assert!(config.subscriptions.is_empty());
    }

    #[test]
    fn messaging_enabled_needs_host_and_name() {
        let mut config = UplinkConfig {
            broker_host: Some("10.0.0.5".into()),
            ..UplinkConfig::default()
        };
        assert!(!config.messaging_enabled());

        config.device_name = Some("owlcam-dock-01".into());
        assert!(config.messaging_enabled());

        config.broker_host = Some(String::new());
        assert!(!config.messaging_enabled());
    }

    #[test]
    fn from_lookup_reads_broker_variables() {
        let config = UplinkConfig::from_lookup(|key| match key {
            "MQTT_BROKER_IP" => Some("192.168.1.20".into()),
            "MQTT_DEVICE_NAME" => Some("owlcam-gate".into()),
            "MQTT_BROKER_PORT" => Some("8883".into()),
            _ => None,
        });

        assert!(config.messaging_enabled());
        assert_eq!(config.broker_host.as_deref(), Some("192.168.1.20"));
        assert_eq!(config.device_name.as_deref(), Some("owlcam-gate"));
        assert_eq!(config.broker_port, 8883);
    }

    #[test]
    fn from_lookup_defaults_when_unset() {
        let config = UplinkConfig::from_lookup(|_| None);
        assert!(!config.messaging_enabled());
        assert_eq!(config.broker_port, 1883);
    }

    #[test]
    fn from_lookup_ignores_bad_port() {
        let config = UplinkConfig::from_lookup(|key| match key {
            "MQTT_BROKER_PORT" => Some("not-a-port".into()),
            _ => None,
        });
        assert_eq!(config.broker_port, 1883);
    }
}
