use std::{path::PathBuf, time::Duration};

use clap::Args;
use tokio::{
    fs::File,
    io::{self, AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::watch,
};
use tracing::warn;
use trellis::{
    checkout::{CheckoutSnapshot, MonitorConfig, MonitorOutput, ReconciliationMonitor, Render},
    discounts::normalize::parse_amount,
};
use trellis_app::checkout;

use super::Output;

#[derive(Debug, Args)]
pub(crate) struct MonitorArgs {
    /// JSON-lines file of checkout snapshots; reads stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// How long to wait once for automatic discounts, in milliseconds
    #[arg(long, env = "TRELLIS_RECHECK_AFTER_MS", default_value_t = 2_000)]
    recheck_after_ms: u64,

    /// Shortfalls above this amount are errors rather than warnings
    #[arg(long, env = "TRELLIS_ERROR_THRESHOLD", default_value = "1")]
    error_threshold: String,
}

pub(crate) async fn run(args: MonitorArgs, output: Output) -> Result<(), String> {
    let config = MonitorConfig {
        recheck_after: Duration::from_millis(args.recheck_after_ms),
        error_threshold: parse_amount("error_threshold", &args.error_threshold)
            .map_err(|error| error.to_string())?,
    };

    let sink = move |step: MonitorOutput| output.step(&step);

    match args.input {
        Some(path) => {
            let file = File::open(&path)
                .await
                .map_err(|error| format!("failed to open {}: {error}", path.display()))?;

            feed(BufReader::new(file), config, sink).await?;
        }
        None => {
            feed(BufReader::new(io::stdin()), config, sink).await?;
        }
    }

    Ok(())
}

/// Publish every snapshot line to a monitor and wait for it to finish.
///
/// Snapshots that arrive faster than the monitor observes them are coalesced; only the latest
/// cart matters.
async fn feed<R, S>(
    reader: R,
    config: MonitorConfig,
    sink: S,
) -> Result<Option<ReconciliationMonitor>, String>
where
    R: AsyncBufRead + Unpin,
    S: FnMut(MonitorOutput) + Send + 'static,
{
    let mut lines = reader.lines();
    let mut number = 0_usize;

    let first = loop {
        match next_snapshot(&mut lines, &mut number).await? {
            Some(snapshot) => break snapshot,
            None => return Ok(None),
        }
    };

    let (sender, receiver) = watch::channel(first);
    let driver = tokio::spawn(checkout::watch(receiver, config, sink));

    while let Some(snapshot) = next_snapshot(&mut lines, &mut number).await? {
        if sender.send(snapshot).is_err() {
            break;
        }
    }

    drop(sender);

    driver
        .await
        .map(Some)
        .map_err(|error| format!("monitor stopped unexpectedly: {error}"))
}

async fn next_snapshot<R>(
    lines: &mut io::Lines<R>,
    number: &mut usize,
) -> Result<Option<CheckoutSnapshot>, String>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|error| format!("failed to read snapshots: {error}"))?
    {
        *number += 1;

        if line.trim().is_empty() {
            continue;
        }

        return serde_json::from_str(&line)
            .map(Some)
            .map_err(|error| format!("line {number}: invalid checkout snapshot: {error}"));
    }

    Ok(None)
}

impl Output {
    fn step(self, step: &MonitorOutput) {
        if !self.json {
            println!("{}", describe(step));
            return;
        }

        match serde_json::to_string(step) {
            Ok(line) => println!("{line}"),
            Err(error) => warn!(error = %error, "failed to serialize monitor output"),
        }
    }
}

fn describe(step: &MonitorOutput) -> String {
    let state = format!("{:?}", step.state);

    match &step.render {
        Render::Nothing => state,
        Render::Notice { text } => format!("{state}: {text}"),
        Render::Breakdown {
            lines,
            total_savings,
            automatic,
        } => {
            let applied: Vec<String> = lines
                .iter()
                .map(|line| format!("{} {}", line.title, line.amount))
                .collect();

            let delivery = if *automatic { "automatic" } else { "code" };

            format!(
                "{state}: {} ({delivery}), saving {total_savings}",
                applied.join(", ")
            )
        }
        Render::Warning { severity, message } => format!("{state} [{severity:?}]: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use testresult::TestResult;
    use trellis::checkout::MonitorState;

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<MonitorState>>>, impl FnMut(MonitorOutput) + Send + 'static) {
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink_states = states.clone();

        let sink = move |step: MonitorOutput| {
            if let Ok(mut states) = sink_states.lock() {
                states.push(step.state);
            }
        };

        (states, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn an_undiscounted_cart_is_rechecked_once() -> TestResult {
        let input = concat!(
            "\n",
            r#"{"subtotalAmount":100,"totalAmount":100,"currencyCode":"AED"}"#,
            "\n"
        );

        let (states, sink) = recorder();

        let monitor = feed(input.as_bytes(), MonitorConfig::default(), sink)
            .await?
            .ok_or("expected a monitor")?;

        assert_eq!(monitor.state(), MonitorState::NoDiscount);
        assert_eq!(
            *states.lock().map_err(|error| error.to_string())?,
            vec![MonitorState::WaitingAuto, MonitorState::NoDiscount]
        );

        Ok(())
    }

    #[tokio::test]
    async fn empty_input_starts_nothing() -> TestResult {
        let (states, sink) = recorder();

        let monitor = feed(&b"\n\n"[..], MonitorConfig::default(), sink).await?;

        assert!(monitor.is_none());
        assert!(states.lock().map_err(|error| error.to_string())?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn malformed_lines_name_their_position() {
        let (_, sink) = recorder();

        let result = feed(&b"\nnot json\n"[..], MonitorConfig::default(), sink).await;

        assert!(matches!(result, Err(message) if message.starts_with("line 2:")));
    }
}
