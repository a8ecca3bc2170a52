// Single-task host event loop driving one orchestrator
//
// Page handles are not thread-safe, so everything stays on the task that
// awaits `EventLoop::run`. Host events arrive over a bounded channel;
// between events the loop sleeps until the orchestrator's next timer.

use crate::config::{Config, ConfigValidator, SettingsFile};
use crate::dom::{DomSurface, MutationRecord, PageControl};
use crate::error::{Result, SiftError};
use crate::navigation::NavigationSignal;
use crate::orchestrator::{FilterOrchestrator, InboundMessage, MessageResponse};
use crate::schedule::{Clock, TokioClock};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Bound on queued host events
const EVENT_CAPACITY: usize = 64;

/// Host-side page edit. Returns the structural changes it made.
pub type PageEdit<D> = Box<dyn FnOnce(&mut D) -> Vec<MutationRecord<<D as DomSurface>::Handle>>>;

/// Everything the host can deliver to the loop
pub enum HostEvent<D: DomSurface> {
    /// Message from the settings surface, answered on `reply`
    Message {
        message: InboundMessage,
        reply: oneshot::Sender<MessageResponse>,
    },
    /// Mutate the page, then report its changes to the orchestrator
    EditPage {
        edit: PageEdit<D>,
        reply: oneshot::Sender<()>,
    },
    /// History or link-click signal
    Navigation(NavigationSignal),
    /// Tear down and leave the loop
    Shutdown,
}

/// Owns the orchestrator while the loop runs
pub struct EventLoop<D: DomSurface + PageControl> {
    orchestrator: FilterOrchestrator<D, TokioClock>,
    clock: TokioClock,
    events: mpsc::Receiver<HostEvent<D>>,
}

/// Cloneable sender side of an `EventLoop`
pub struct EventLoopHandle<D: DomSurface> {
    tx: mpsc::Sender<HostEvent<D>>,
}

impl<D: DomSurface> Clone for EventLoopHandle<D> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Load stored settings, build the orchestrator and bootstrap it
pub async fn start<D>(
    mut config: Config,
    settings_file: &SettingsFile,
    page: D,
) -> Result<(EventLoop<D>, EventLoopHandle<D>)>
where
    D: DomSurface + PageControl,
{
    let stored = settings_file.load().await;
    config.apply_stored_settings(&stored);
    ConfigValidator::validate(&config)?;

    let clock = TokioClock::new();
    let mut orchestrator = FilterOrchestrator::new(config, page, clock);
    orchestrator.bootstrap();

    Ok(EventLoop::new(orchestrator, clock))
}

impl<D: DomSurface + PageControl> EventLoop<D> {
    /// `clock` must be the clock the orchestrator schedules against
    pub fn new(
        orchestrator: FilterOrchestrator<D, TokioClock>,
        clock: TokioClock,
    ) -> (Self, EventLoopHandle<D>) {
        let (tx, events) = mpsc::channel(EVENT_CAPACITY);
        (
            Self {
                orchestrator,
                clock,
                events,
            },
            EventLoopHandle { tx },
        )
    }

    /// Run until a shutdown event arrives or every handle is dropped.
    /// Returns the shut-down orchestrator.
    pub async fn run(mut self) -> FilterOrchestrator<D, TokioClock> {
        tracing::info!("Event loop started");

        loop {
            let deadline = self
                .orchestrator
                .next_deadline()
                .map(|offset| self.clock.instant_at(offset));

            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        Some(HostEvent::Shutdown) | None => break,
                        Some(event) => self.dispatch(event),
                    }
                }

                _ = sleep_until(deadline) => {
                    let fired = self.orchestrator.run_due_timers();
                    tracing::trace!("Fired {} timers at {:?}", fired, self.clock.now());
                }
            }
        }

        self.orchestrator.shutdown();
        tracing::info!("Event loop stopped");
        self.orchestrator
    }

    fn dispatch(&mut self, event: HostEvent<D>) {
        match event {
            HostEvent::Message { message, reply } => {
                let response = self.orchestrator.handle_message(message);
                if reply.send(response).is_err() {
                    tracing::debug!("Message sender went away before the reply");
                }
            }
            HostEvent::EditPage { edit, reply } => {
                let records = edit(self.orchestrator.dom_mut());
                self.orchestrator.on_mutation(&records);
                if reply.send(()).is_err() {
                    tracing::debug!("Page edit sender went away before the reply");
                }
            }
            HostEvent::Navigation(signal) => {
                self.orchestrator.on_navigation(&signal);
            }
            HostEvent::Shutdown => {}
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl<D: DomSurface> EventLoopHandle<D> {
    /// Deliver an inbound message and wait for its response
    pub async fn send_message(&self, message: InboundMessage) -> Result<MessageResponse> {
        let (reply, response) = oneshot::channel();
        self.send(HostEvent::Message { message, reply }).await?;
        response
            .await
            .map_err(|_| SiftError::Runtime("Event loop dropped the reply".to_string()))
    }

    /// Apply `edit` to the page on the loop and wait until the orchestrator
    /// has seen its changes
    pub async fn edit_page<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut D) -> Vec<MutationRecord<D::Handle>> + 'static,
    {
        let (reply, done) = oneshot::channel();
        self.send(HostEvent::EditPage {
            edit: Box::new(edit),
            reply,
        })
        .await?;
        done.await
            .map_err(|_| SiftError::Runtime("Event loop dropped the page edit".to_string()))
    }

    pub async fn navigate(&self, signal: NavigationSignal) -> Result<()> {
        self.send(HostEvent::Navigation(signal)).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(HostEvent::Shutdown).await
    }

    async fn send(&self, event: HostEvent<D>) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| SiftError::Runtime("Event loop channel closed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlPage;
    use std::time::Duration;

    const LISTING: &str = "https://www.upwork.com/nx/find-work/";
    const LIST: &str = r#"div[data-test="job-tile-list"]"#;

    fn page() -> HtmlPage {
        HtmlPage::parse(
            r#"<html><head><title>Find work</title></head><body><div data-test="job-tile-list">
                <section><small data-test="client-spendings">$0 spent</small></section>
                <section><small data-test="client-spendings">$1k+ spent</small></section>
            </div></body></html>"#,
            LISTING,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_is_filtered_after_debounce() {
        let clock = TokioClock::new();
        let mut orchestrator = FilterOrchestrator::new(Config::default(), page(), clock);
        orchestrator.initialize();
        let (event_loop, handle) = EventLoop::new(orchestrator, clock);

        let client = async move {
            handle
                .edit_page(|page: &mut HtmlPage| {
                    let list = page.query(LIST).unwrap();
                    page.append_html(
                        list,
                        r#"<section><small data-test="client-spendings">$0 spent</small></section>"#,
                    )
                    .into_iter()
                    .collect()
                })
                .await
                .unwrap();

            tokio::time::sleep(Duration::from_millis(299)).await;
            let before = handle.send_message(InboundMessage::GetStatus).await.unwrap();

            tokio::time::sleep(Duration::from_millis(2)).await;
            let after = handle.send_message(InboundMessage::GetStatus).await.unwrap();

            handle.shutdown().await.unwrap();
            (before, after)
        };

        let (orchestrator, (before, after)) = tokio::join!(event_loop.run(), client);

        let hidden = |response: MessageResponse| match response {
            MessageResponse::Status(report) => report.last_hidden_count,
            other => panic!("unexpected response {:?}", other),
        };
        assert_eq!(hidden(before), 1);
        assert_eq!(hidden(after), 2);
        assert_eq!(orchestrator.pending_timers(), 0);
        assert_eq!(orchestrator.hidden_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_edit_still_applies() {
        let clock = TokioClock::new();
        let mut orchestrator = FilterOrchestrator::new(Config::default(), page(), clock);
        orchestrator.initialize();
        let (event_loop, handle) = EventLoop::new(orchestrator, clock);

        let client = async move {
            let (reply, done) = oneshot::channel();
            drop(done);
            let edit: PageEdit<HtmlPage> = Box::new(|page: &mut HtmlPage| {
                let list = page.query(LIST).unwrap();
                page.append_html(
                    list,
                    r#"<section><small data-test="client-spendings">$0 spent</small></section>"#,
                )
                .into_iter()
                .collect()
            });
            handle
                .send(HostEvent::EditPage { edit, reply })
                .await
                .unwrap();

            tokio::time::sleep(Duration::from_millis(400)).await;
            let status = handle.send_message(InboundMessage::GetStatus).await.unwrap();
            handle.shutdown().await.unwrap();
            status
        };

        let (_, status) = tokio::join!(event_loop.run(), client);
        match status {
            MessageResponse::Status(report) => assert_eq!(report.last_hidden_count, 2),
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_stops_loop() {
        let clock = TokioClock::new();
        let orchestrator = FilterOrchestrator::new(Config::default(), page(), clock);
        let (event_loop, handle) = EventLoop::new(orchestrator, clock);
        drop(handle);

        let orchestrator = event_loop.run().await;
        assert!(!orchestrator.is_initialized());
    }
}
