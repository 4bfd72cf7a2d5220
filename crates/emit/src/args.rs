//! Command-line interface.
//!
//! ```text
//! beacon-emit emit <info|warn|error> <event_type> [payload]
//! beacon-emit demo
//! ```
//!
//! The payload is parsed as JSON; anything that is not valid JSON is sent
//! as a plain string.

use std::convert::Infallible;

use beacon_events::{NotifyError, Priority};
use clap::{Parser, Subcommand};
use serde_json::Value;

/// Publish notifications on the configured transport.
#[derive(Debug, Parser)]
#[command(name = "beacon-emit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Emit a single notification.
    Emit {
        /// Severity: info, warn or error (case-insensitive)
        #[arg(value_parser = parse_priority)]
        priority: Priority,

        /// Dotted event type, e.g. `image.update`
        event_type: String,

        /// JSON payload; anything else is sent as a string
        #[arg(value_parser = parse_payload, default_value = "null")]
        payload: Value,
    },

    /// Run an image and task lifecycle through the event proxies.
    Demo,
}

fn parse_priority(raw: &str) -> Result<Priority, NotifyError> {
    raw.parse()
}

fn parse_payload(raw: &str) -> Result<Value, Infallible> {
    Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use serde_json::json;

    use super::*;

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        let argv = std::iter::once("beacon-emit").chain(args.iter().copied());
        Cli::try_parse_from(argv).map(|cli| cli.command)
    }

    #[test]
    fn parses_json_payload() {
        let cmd = parse(&["emit", "warn", "image.update", r#"{"id": "img-1"}"#]).unwrap();
        assert_eq!(
            cmd,
            Command::Emit {
                priority: Priority::Warn,
                event_type: "image.update".into(),
                payload: json!({"id": "img-1"}),
            }
        );
    }

    #[test]
    fn non_json_payload_is_a_string() {
        let cmd = parse(&["emit", "info", "test_event", "test_message"]).unwrap();
        assert_matches!(cmd, Command::Emit { payload, .. } if payload == json!("test_message"));
    }

    #[test]
    fn payload_is_optional() {
        let cmd = parse(&["emit", "ERROR", "test_event"]).unwrap();
        assert_matches!(
            cmd,
            Command::Emit { priority: Priority::Error, payload: Value::Null, .. }
        );
    }

    #[test]
    fn demo_takes_no_arguments() {
        assert_eq!(parse(&["demo"]).unwrap(), Command::Demo);
        assert!(parse(&["demo", "extra"]).is_err());
    }

    #[test]
    fn rejects_unknown_priority_and_missing_event() {
        assert_matches!(
            parse(&["emit", "debug", "test_event"]),
            Err(e) if e.kind() == ErrorKind::ValueValidation
        );
        assert_matches!(
            parse(&["emit", "info"]),
            Err(e) if e.kind() == ErrorKind::MissingRequiredArgument
        );
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
