//! Human-readable error descriptions and structured JSON error formatting.

use bimeter_core::error::{BuildError, CoreError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    // Datapoint CSV header special-case
    if lower.contains("datapoint csv must have headers") {
        return "Invalid headers in datapoint CSV. Expected 'dp,field,divisor'.".to_string();
    }

    // Typed matches
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::EmptyTable => {
                "What happened: The datapoint table is empty.\nLikely causes: The datapoint CSV has a header but no rows.\nHow to fix: Add rows (dp,field,divisor) or drop --datapoints to use the built-in table.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in [defaults].\nHow to fix: Edit the config file, then rerun `bimeter check-config`."
            ),
            BuildError::InvalidDevice { device, reason } => format!(
                "What happened: Invalid options for device {device} ({reason}).\nLikely causes: Out-of-range override in [devices.\"{device}\"].\nHow to fix: Fix or remove that override, then rerun `bimeter check-config`."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CoreError>() {
        return match ce {
            CoreError::Config(msg) => format!(
                "What happened: Configuration could not be loaded ({msg}).\nLikely causes: Missing file, TOML syntax error, or a value outside its allowed range.\nHow to fix: Fix the file named above and rerun `bimeter check-config`."
            ),
            CoreError::Input(msg) => format!(
                "What happened: The capture could not be read ({msg}).\nLikely causes: A line is not a JSON object with device, dp (a non-negative integer), value and optional seq (0..=65535).\nHow to fix: Correct or remove the offending line and replay again."
            ),
            CoreError::Transport(msg) => format!(
                "What happened: Reading messages failed ({msg}).\nLikely causes: The input stream was closed or is not readable.\nHow to fix: Check the input path and permissions."
            ),
            CoreError::Publish(msg) => format!(
                "What happened: Writing records failed ({msg}).\nLikely causes: stdout was closed (e.g. a pipe consumer exited).\nHow to fix: Keep the downstream consumer running for the whole replay."
            ),
        };
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 config, 4 input, 5 I/O on the stream, 1 otherwise.
/// Usage errors exit with clap's 2.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<CoreError>() {
        Some(CoreError::Config(_)) => 3,
        Some(CoreError::Input(_)) => 4,
        Some(CoreError::Transport(_) | CoreError::Publish(_)) => 5,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    match err.downcast_ref::<CoreError>() {
        Some(CoreError::Config(_)) => "Config",
        Some(CoreError::Input(_)) => "Input",
        Some(CoreError::Transport(_)) => "Transport",
        Some(CoreError::Publish(_)) => "Publish",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn typed_errors_survive_context() {
        let err: eyre::Result<()> = Err(eyre::Report::new(CoreError::Input("line 4: eof".into())));
        let err = err.wrap_err("receiving message 9").unwrap_err();
        assert_eq!(exit_code_for_error(&err), 4);
        assert!(humanize(&err).contains("line 4: eof"));
    }

    #[test]
    fn build_errors_are_config_errors() {
        let err = eyre::Report::new(BuildError::InvalidDevice {
            device: "m1".into(),
            reason: "direction reverse_code must be 0 or 1",
        });
        assert_eq!(exit_code_for_error(&err), 3);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Config");
        assert!(v["message"].as_str().unwrap().contains("m1"));
    }

    #[test]
    fn untyped_errors_fall_back() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("Original: boom"));
    }
}
