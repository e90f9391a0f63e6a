//! Host loop: polls the frame source and drives the session

use camera_capture::FrameSource;
use dms::{Session, SessionSummary, TickReport};
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Where per-tick status ends up (a window, a terminal, a test)
pub trait StatusView {
    fn render(&mut self, report: &TickReport);
}

/// Logs the status line whenever it changes
#[derive(Debug, Default)]
pub struct ConsoleView {
    last_line: Option<String>,
}

impl StatusView for ConsoleView {
    fn render(&mut self, report: &TickReport) {
        let line = report.to_string();
        if self.last_line.as_deref() != Some(line.as_str()) {
            info!(target: "focuspal::status", "{}", line);
            self.last_line = Some(line);
        }
    }
}

/// Tick the session once per poll interval until the source runs dry or
/// `shutdown` resolves, then stop it.
pub async fn run_until<S, V, F>(
    mut source: S,
    mut session: Session,
    view: &mut V,
    poll: Duration,
    shutdown: F,
) -> SessionSummary
where
    S: FrameSource,
    V: StatusView + ?Sized,
    F: Future<Output = ()>,
{
    let mut interval = time::interval(poll);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            _ = interval.tick() => {}
        }

        if source.is_exhausted() {
            info!("Frame source exhausted");
            break;
        }

        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame acquisition failed: {}", e);
                None
            }
        };

        if let Some(report) = session.tick(frame.as_ref(), Instant::now().into_std()) {
            view.render(&report);
        }
    }

    session.stop(Instant::now().into_std())
}
