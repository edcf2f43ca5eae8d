//! The event pump: applies watch events to the host and schedules
//! debounced analyses.
//!
//! Every event that changes the file map pushes the deadline
//! `debounce_ms` into the future, so a burst of saves yields one pass. A
//! deadline that expires before `start()` finished is held and fires as soon
//! as the monitor is running. Cancelling the pump drops a pending deadline.

use std::sync::Arc;

use sa_ts_parser::{LanguageService, RouteExtractor};
use sa_watcher::WatchEvent;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::monitor::Shared;

pub(crate) async fn run<S, E>(
    shared: Arc<Shared<S, E>>,
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
    cancel: CancellationToken,
) where
    S: LanguageService + 'static,
    E: RouteExtractor + 'static,
{
    let debounce = shared.config.debounce();
    let mut running = shared.subscribe_running();
    let mut deadline: Option<Instant> = None;
    let mut held = false;
    let mut events_open = true;

    debug!(debounce_ms = debounce.as_millis(), "Event pump started");

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                if deadline.is_some() || held {
                    debug!("Dropping pending analysis");
                }
                break;
            }

            event = events.recv(), if events_open => {
                let Some(event) = event else {
                    debug!("Watch event stream ended");
                    events_open = false;
                    continue;
                };
                trace!(kind = event.kind(), file = %event.file_name(), "Watch event");
                if shared.host.apply(event) && shared.auto_create_result() {
                    deadline = Some(Instant::now() + debounce);
                }
            }

            () = sleep_until(deadline) => {
                deadline = None;
                if shared.is_running() {
                    update(&shared).await;
                } else {
                    trace!("Monitor not running yet, holding analysis");
                    held = true;
                }
            }

            changed = running.changed(), if held => {
                if changed.is_err() {
                    break;
                }
                if *running.borrow_and_update() {
                    held = false;
                    update(&shared).await;
                }
            }
        }
    }

    debug!("Event pump ended");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn update<S, E>(shared: &Arc<Shared<S, E>>)
where
    S: LanguageService + 'static,
    E: RouteExtractor + 'static,
{
    let started = Instant::now();
    let task_shared = Arc::clone(shared);
    let outcome = tokio::task::spawn_blocking(move || task_shared.update_routes_result()).await;

    match outcome {
        Ok(Ok(result)) => debug!(
            root = %result.root_id(),
            resources = result.resource_manager().len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Routes result updated"
        ),
        Ok(Err(err)) => error!(
            error = %err,
            elapsed_ms = started.elapsed().as_millis(),
            "Error while updating routes result"
        ),
        Err(err) => error!(error = %err, "Analysis task failed"),
    }
}
