//! Drives a [`ReconciliationMonitor`] over a stream of checkout snapshots.

use tokio::{
    sync::watch,
    time::{Instant, sleep},
};
use tracing::debug;
use trellis::checkout::{
    AutoApplyWindow, CheckoutSnapshot, MonitorConfig, MonitorOutput, ReconciliationMonitor,
};

/// Feed every snapshot change to a fresh monitor and pass each output to `sink`.
///
/// The only timer is the monitor's one-shot recheck: it is armed when the monitor asks for it
/// and disarmed as soon as the auto-apply window closes. Returns the monitor once the sender is
/// dropped and no recheck is pending.
pub async fn watch<S>(
    mut snapshots: watch::Receiver<CheckoutSnapshot>,
    config: MonitorConfig,
    mut sink: S,
) -> ReconciliationMonitor
where
    S: FnMut(MonitorOutput) + Send,
{
    let mut monitor = ReconciliationMonitor::new(config);

    let recheck = sleep(config.recheck_after);
    tokio::pin!(recheck);

    let mut armed = false;
    let mut closed = false;

    let first = snapshots.borrow_and_update().clone();
    let output = monitor.observe(&first);

    if let Some(delay) = output.schedule {
        recheck.as_mut().reset(Instant::now() + delay);
        armed = true;
    }

    sink(output);

    while !closed || armed {
        let output = tokio::select! {
            changed = snapshots.changed(), if !closed => {
                if changed.is_err() {
                    debug!("snapshot stream closed");
                    closed = true;
                    continue;
                }

                let snapshot = snapshots.borrow_and_update().clone();

                monitor.observe(&snapshot)
            }
            () = &mut recheck, if armed => {
                armed = false;

                let snapshot = snapshots.borrow().clone();

                debug!("auto-apply recheck elapsed");

                monitor.recheck_elapsed(&snapshot)
            }
        };

        if let Some(delay) = output.schedule {
            recheck.as_mut().reset(Instant::now() + delay);
            armed = true;
        } else if armed && monitor.window() != AutoApplyWindow::Open {
            armed = false;
        }

        sink(output);
    }

    monitor
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;
    use testresult::TestResult;
    use tokio::sync::mpsc;
    use trellis::checkout::{DiscountAllocation, MonitorState};

    use super::*;

    fn cart(subtotal: i64, total: i64, discount: Option<i64>) -> CheckoutSnapshot {
        CheckoutSnapshot {
            subtotal_amount: Decimal::new(subtotal, 0),
            total_amount: Decimal::new(total, 0),
            discount_allocations: discount
                .map(|amount| DiscountAllocation {
                    title: Some("Spring".to_string()),
                    discounted_amount: Decimal::new(amount, 0),
                    target_type: Some("automatic".to_string()),
                })
                .into_iter()
                .collect(),
            ..CheckoutSnapshot::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_automatic_discounts_once_per_session() -> TestResult {
        let (tx, rx) = watch::channel(CheckoutSnapshot::default());
        let (outputs, mut received) = mpsc::unbounded_channel();

        let driver = tokio::spawn(watch(rx, MonitorConfig::default(), move |output| {
            let _ = outputs.send(output);
        }));

        let checking = received.recv().await.ok_or("driver stopped")?;
        assert_eq!(checking.state, MonitorState::Checking);

        tx.send(cart(100, 100, None))?;

        let waiting = received.recv().await.ok_or("driver stopped")?;
        assert_eq!(waiting.state, MonitorState::WaitingAuto);
        assert_eq!(waiting.schedule, Some(Duration::from_secs(2)));

        let started = Instant::now();
        let recheck = received.recv().await.ok_or("driver stopped")?;

        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(recheck.state, MonitorState::NoDiscount);
        assert_eq!(recheck.schedule, None);

        tx.send(cart(120, 120, None))?;

        let again = received.recv().await.ok_or("driver stopped")?;
        assert_eq!(again.state, MonitorState::NoDiscount);
        assert_eq!(again.schedule, None);

        drop(tx);

        let monitor = driver.await?;

        assert_eq!(monitor.window(), AutoApplyWindow::Spent);
        assert!(received.recv().await.is_none());

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn an_applied_discount_disarms_the_recheck() -> TestResult {
        let (tx, rx) = watch::channel(cart(100, 100, None));
        let (outputs, mut received) = mpsc::unbounded_channel();

        let driver = tokio::spawn(watch(rx, MonitorConfig::default(), move |output| {
            let _ = outputs.send(output);
        }));

        let waiting = received.recv().await.ok_or("driver stopped")?;
        assert_eq!(waiting.state, MonitorState::WaitingAuto);

        tx.send(cart(100, 90, Some(10)))?;

        let applied = received.recv().await.ok_or("driver stopped")?;
        assert_eq!(applied.state, MonitorState::Applied);

        drop(tx);

        driver.await?;

        let mut rest = Vec::new();

        while let Some(output) = received.recv().await {
            rest.push(output.state);
        }

        assert!(rest.is_empty(), "unexpected outputs after close: {rest:?}");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn a_pending_recheck_outlives_the_stream() -> TestResult {
        let (tx, rx) = watch::channel(cart(100, 100, None));
        let (outputs, mut received) = mpsc::unbounded_channel();

        drop(tx);

        let monitor = watch(rx, MonitorConfig::default(), move |output| {
            let _ = outputs.send(output);
        })
        .await;

        let states: Vec<_> = std::iter::from_fn(|| received.try_recv().ok())
            .map(|output| output.state)
            .collect();

        assert_eq!(
            states,
            vec![MonitorState::WaitingAuto, MonitorState::NoDiscount]
        );
        assert_eq!(monitor.state(), MonitorState::NoDiscount);

        Ok(())
    }
}
