//! End-to-end behaviour of the notifier facade over scripted transports.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use beacon_events::testing::{ScriptedBroker, ScriptedTopicBroker};
use beacon_events::transport::TopicAddress;
use beacon_events::{
    Backoff, Notifier, NotifierConfig, Notify, NotifyError, Priority, Strategy, StrategyKind,
    TransportError, Transports,
};
use serde_json::json;

fn durable_config(max_retries: Option<u32>) -> NotifierConfig {
    let mut config = NotifierConfig {
        strategy: StrategyKind::DurableBroker,
        ..NotifierConfig::default()
    };
    config.broker.topic = "fake_topic".into();
    config.broker.backoff = Backoff {
        retry_backoff: Duration::ZERO,
        retry_max_backoff: None,
        max_retries,
    };
    config
}

async fn durable_notifier(script: &ScriptedBroker, config: &NotifierConfig) -> Notifier {
    Notifier::from_config(
        config,
        Transports::default().with_broker(Arc::new(script.clone())),
    )
    .await
    .expect("notifier should build")
}

fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |var| {
        pairs
            .iter()
            .find(|(k, _)| *k == var)
            .map(|(_, v)| v.to_string())
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn unknown_strategy_is_rejected() {
    let err = NotifierConfig::from_lookup(lookup(&[("NOTIFIER_STRATEGY", "invalid_notifier")]))
        .unwrap_err();
    assert_matches!(err, NotifyError::InvalidStrategy(name) if name == "invalid_notifier");
}

#[tokio::test]
async fn noop_and_log_strategies_accept_every_priority() {
    const NOOP: &[(&str, &str)] = &[("NOTIFIER_STRATEGY", "noop")];
    const LOG: &[(&str, &str)] = &[("NOTIFIER_STRATEGY", "logging")];

    for vars in [NOOP, LOG] {
        let config = NotifierConfig::from_lookup(lookup(vars)).unwrap();
        let notifier = Notifier::from_config(&config, Transports::default())
            .await
            .unwrap();

        notifier.info("test_event", json!("test_message")).await.unwrap();
        notifier.warn("test_event", json!("test_message")).await.unwrap();
        notifier.error("test_event", json!("test_message")).await.unwrap();
    }
}

#[tokio::test]
async fn unknown_connect_error_fails_construction() {
    let script = ScriptedBroker::new();
    script.fail_connect(TransportError::Other("meow".into()));

    let err = Notifier::from_config(
        &durable_config(None),
        Transports::default().with_broker(Arc::new(script.clone())),
    )
    .await
    .unwrap_err();

    assert_matches!(err, NotifyError::Transport(TransportError::Other(msg)) if msg == "meow");
    assert_eq!(script.connect_calls(), 1);
}

#[tokio::test]
async fn recoverable_connect_error_is_retried_on_first_send() {
    for err in [
        TransportError::Connection("refused".into()),
        TransportError::Other("foo timeout foo".into()),
    ] {
        let script = ScriptedBroker::new();
        script.fail_connect(err);
        let notifier = durable_notifier(&script, &durable_config(None)).await;

        notifier.info("test_event", json!("test_message")).await.unwrap();

        assert_eq!(script.connect_calls(), 2);
        assert_eq!(script.published().len(), 1);
    }
}

// ---------------------------------------------------------------------------
// Durable broker delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn routing_key_follows_priority() {
    let script = ScriptedBroker::new();
    let notifier = durable_notifier(&script, &durable_config(None)).await;

    notifier.info("test_event", json!("test_message")).await.unwrap();
    notifier.warn("test_event", json!("test_message")).await.unwrap();
    notifier.error("test_event", json!("test_message")).await.unwrap();

    let keys: Vec<_> = script
        .published()
        .into_iter()
        .map(|p| (p.routing_key, p.body["priority"].as_str().map(str::to_string)))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("fake_topic.info".to_string(), Some("INFO".to_string())),
            ("fake_topic.warn".to_string(), Some("WARN".to_string())),
            ("fake_topic.error".to_string(), Some("ERROR".to_string())),
        ]
    );
    assert!(script
        .published()
        .iter()
        .all(|p| p.content_type == "application/json" && p.exchange == "beacon"));
}

#[tokio::test]
async fn unknown_publish_error_propagates() {
    let script = ScriptedBroker::new();
    let notifier = durable_notifier(&script, &durable_config(None)).await;
    script.fail_publish(TransportError::Other("meow".into()));

    let err = notifier
        .error("test_event", json!("test_message"))
        .await
        .unwrap_err();

    assert_matches!(err, NotifyError::Transport(_));
}

#[tokio::test]
async fn timeout_on_publish_reconnects_and_resends() {
    let script = ScriptedBroker::new();
    let notifier = durable_notifier(&script, &durable_config(None)).await;
    script.fail_publish(TransportError::Other("foo timeout foo".into()));

    notifier.error("test_event", json!("test_message")).await.unwrap();

    assert_eq!(script.publish_calls(), 2);
    assert_eq!(script.connect_calls(), 2);
}

#[tokio::test]
async fn exhausted_retries_are_logged_not_raised() {
    let script = ScriptedBroker::new();
    let notifier = durable_notifier(&script, &durable_config(Some(2))).await;
    script.fail_publish(TransportError::Connection("reset".into()));
    script.fail_connects_forever(TransportError::Connection("refused".into()));

    notifier.warn("test_event", json!("test_message")).await.unwrap();

    // The failed publish spends one attempt, so the reconnect gives up
    // after a single connect.
    assert_eq!(script.connect_calls(), 2);
    assert!(script.published().is_empty());

    let Strategy::DurableBroker(broker) = notifier.strategy() else {
        panic!("expected the durable broker strategy");
    };
    assert!(!broker.is_connected().await);
}

// ---------------------------------------------------------------------------
// Topic broker delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn topic_broker_sends_to_namespaced_address() {
    let script = ScriptedTopicBroker::new();
    let mut config = NotifierConfig {
        strategy: StrategyKind::TopicBroker,
        ..NotifierConfig::default()
    };
    config.topic.namespace = "glance".into();
    let notifier = Notifier::from_config(
        &config,
        Transports::default().with_topic(Arc::new(script.clone())),
    )
    .await
    .unwrap();

    notifier.info("test_event", json!("test_message")).await.unwrap();
    notifier.error("test_event", json!("test_message")).await.unwrap();

    assert_eq!(
        script.addresses(),
        vec![
            TopicAddress::new("glance", Priority::Info),
            TopicAddress::new("glance", Priority::Error),
        ]
    );
    assert_eq!(script.open_calls(), 2);
    assert_eq!(script.close_calls(), 2);
}

#[tokio::test]
async fn topic_broker_open_failure_propagates() {
    let script = ScriptedTopicBroker::new();
    script.fail_open(TransportError::Connection("refused".into()));
    let config = NotifierConfig {
        strategy: StrategyKind::TopicBroker,
        ..NotifierConfig::default()
    };
    let notifier = Notifier::from_config(
        &config,
        Transports::default().with_topic(Arc::new(script.clone())),
    )
    .await
    .unwrap();

    let err = notifier
        .warn("test_event", json!("test_message"))
        .await
        .unwrap_err();

    assert_matches!(err, NotifyError::Transport(TransportError::Connection(_)));
    assert_eq!(script.close_calls(), 0);
}
