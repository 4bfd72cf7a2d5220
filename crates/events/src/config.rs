//! Notifier configuration.
//!
//! Loaded once when a [`Notifier`](crate::Notifier) is built and never
//! changed afterwards; reconfiguring means building a new notifier.

use std::str::FromStr;
use std::time::Duration;

use crate::backoff::{Backoff, DEFAULT_RETRY_BACKOFF, DEFAULT_RETRY_MAX_BACKOFF};
use crate::error::NotifyError;
use crate::transport::Topology;

// ---------------------------------------------------------------------------
// StrategyKind
// ---------------------------------------------------------------------------

/// The closed set of notification strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Noop,
    Log,
    DurableBroker,
    TopicBroker,
}

/// Accepted identifiers for each strategy, including legacy aliases.
const STRATEGY_NAMES: &[(&str, StrategyKind)] = &[
    ("noop", StrategyKind::Noop),
    ("logging", StrategyKind::Log),
    ("log", StrategyKind::Log),
    ("amqp", StrategyKind::DurableBroker),
    ("rabbit", StrategyKind::DurableBroker),
    ("topic", StrategyKind::TopicBroker),
    ("qpid", StrategyKind::TopicBroker),
];

impl StrategyKind {
    /// Canonical identifier.
    pub fn name(self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Log => "logging",
            Self::DurableBroker => "amqp",
            Self::TopicBroker => "topic",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        STRATEGY_NAMES
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| NotifyError::InvalidStrategy(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// BrokerConfig
// ---------------------------------------------------------------------------

/// Durable broker endpoint, topology and retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
    pub use_tls: bool,
    /// Topic exchange the notifications are published to.
    pub exchange: String,
    /// Routing-key prefix; keys are `<topic>.<priority>`.
    pub topic: String,
    pub durable_queues: bool,
    pub backoff: Backoff,
}

impl BrokerConfig {
    pub fn topology(&self) -> Topology {
        Topology {
            exchange: self.exchange.clone(),
            topic: self.topic.clone(),
            durable_queues: self.durable_queues,
        }
    }

    /// AMQP URI for this endpoint. The vhost is percent-encoded so the
    /// default `/` becomes `%2f`.
    pub fn uri(&self) -> String {
        let scheme = if self.use_tls { "amqps" } else { "amqp" };
        let vhost = self.vhost.replace('%', "%25").replace('/', "%2f");
        format!(
            "{scheme}://{}:{}@{}:{}/{vhost}",
            self.user, self.password, self.host, self.port
        )
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5672,
            user: "guest".into(),
            password: "guest".into(),
            vhost: "/".into(),
            use_tls: false,
            exchange: "beacon".into(),
            topic: "notifications".into(),
            durable_queues: false,
            backoff: Backoff::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// TopicConfig
// ---------------------------------------------------------------------------

/// Topic broker addressing. The endpoint is shared with [`BrokerConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConfig {
    /// Address namespace: `<namespace>/notifications.<priority>`.
    pub namespace: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            namespace: "beacon".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// NotifierConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    pub strategy: StrategyKind,
    /// Stamped into every envelope.
    pub publisher_id: String,
    pub broker: BrokerConfig,
    pub topic: TopicConfig,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Log,
            publisher_id: "beacon".into(),
            broker: BrokerConfig::default(),
            topic: TopicConfig::default(),
        }
    }
}

impl NotifierConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                 | Default         |
    /// |--------------------------|-----------------|
    /// | `NOTIFIER_STRATEGY`      | `logging`       |
    /// | `NOTIFIER_PUBLISHER_ID`  | `beacon`        |
    /// | `AMQP_HOST`              | `localhost`     |
    /// | `AMQP_PORT`              | `5672`          |
    /// | `AMQP_USER`              | `guest`         |
    /// | `AMQP_PASSWORD`          | `guest`         |
    /// | `AMQP_VHOST`             | `/`             |
    /// | `AMQP_USE_TLS`           | `false`         |
    /// | `AMQP_EXCHANGE`          | `beacon`        |
    /// | `NOTIFICATION_TOPIC`     | `notifications` |
    /// | `AMQP_DURABLE_QUEUES`    | `false`         |
    /// | `AMQP_RETRY_BACKOFF`     | `1` (seconds)   |
    /// | `AMQP_RETRY_MAX_BACKOFF` | `30` (seconds, `0`/`none` = no cap) |
    /// | `AMQP_MAX_RETRIES`       | `0` (unbounded) |
    /// | `TOPIC_NAMESPACE`        | `beacon`        |
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, NotifyError> {
        let defaults = Self::default();
        let broker_defaults = defaults.broker;

        let strategy = match lookup("NOTIFIER_STRATEGY") {
            Some(name) => name.parse::<StrategyKind>()?,
            None => defaults.strategy,
        };

        let retry_backoff = parse_var(&lookup, "AMQP_RETRY_BACKOFF")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RETRY_BACKOFF);

        let retry_max_backoff = match lookup("AMQP_RETRY_MAX_BACKOFF") {
            None => Some(DEFAULT_RETRY_MAX_BACKOFF),
            Some(v) if v.eq_ignore_ascii_case("none") => None,
            Some(v) => match parse_value::<u64>("AMQP_RETRY_MAX_BACKOFF", &v)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        };

        let max_retries = match parse_var::<u32>(&lookup, "AMQP_MAX_RETRIES")? {
            None | Some(0) => None,
            Some(n) => Some(n),
        };

        let broker = BrokerConfig {
            host: lookup("AMQP_HOST").unwrap_or(broker_defaults.host),
            port: parse_var(&lookup, "AMQP_PORT")?.unwrap_or(broker_defaults.port),
            user: lookup("AMQP_USER").unwrap_or(broker_defaults.user),
            password: lookup("AMQP_PASSWORD").unwrap_or(broker_defaults.password),
            vhost: lookup("AMQP_VHOST").unwrap_or(broker_defaults.vhost),
            use_tls: parse_bool(&lookup, "AMQP_USE_TLS")?.unwrap_or(broker_defaults.use_tls),
            exchange: lookup("AMQP_EXCHANGE").unwrap_or(broker_defaults.exchange),
            topic: lookup("NOTIFICATION_TOPIC").unwrap_or(broker_defaults.topic),
            durable_queues: parse_bool(&lookup, "AMQP_DURABLE_QUEUES")?
                .unwrap_or(broker_defaults.durable_queues),
            backoff: Backoff {
                retry_backoff,
                retry_max_backoff,
                max_retries,
            },
        };

        Ok(Self {
            strategy,
            publisher_id: lookup("NOTIFIER_PUBLISHER_ID").unwrap_or(defaults.publisher_id),
            broker,
            topic: TopicConfig {
                namespace: lookup("TOPIC_NAMESPACE").unwrap_or(defaults.topic.namespace),
            },
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, NotifyError> {
    lookup(var).map(|v| parse_value(var, &v)).transpose()
}

fn parse_value<T: FromStr>(var: &'static str, value: &str) -> Result<T, NotifyError> {
    value.trim().parse().map_err(|_| NotifyError::Config {
        var,
        value: value.to_string(),
    })
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<bool>, NotifyError> {
    lookup(var)
        .map(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(NotifyError::Config { var, value: v }),
        })
        .transpose()
}
