//! SearchSession - event loop driving a search coordinator
//!
//! The session task is the only owner of its [`SearchCoordinator`]. User input
//! arrives as [`SearchEvent`]s; backend calls run concurrently and report back
//! into the same loop together with their tickets, so a late answer can never
//! overwrite a newer one. Every state change is published as a
//! [`SearchView`] snapshot on a watch channel.

use super::coordinator::{DeepTicket, ListTicket};
use super::{SearchCoordinator, SearchMode, SearchView};
use crate::api::FormulaStore;
use crate::config::SearchConfig;
use crate::error::{FormularyError, Result};
use crate::models::{FormulaRecord, MatchResult, NewFormula};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

const EVENT_QUEUE: usize = 64;

/// Input to a running search session
#[derive(Debug)]
pub enum SearchEvent {
    /// The query text changed
    Edit(String),

    SetMode(SearchMode),

    /// Reload the full formula list
    Refresh,

    /// Create a formula; the outcome is sent back once the backend answered
    Create(NewFormula, oneshot::Sender<Result<()>>),

    Shutdown,
}

enum Completion {
    List(ListTicket, Result<Vec<FormulaRecord>>),
    Deep(DeepTicket, Result<Vec<MatchResult>>),
    Created(Result<()>, oneshot::Sender<Result<()>>),
}

fn closed() -> FormularyError {
    FormularyError::Generic("search session closed".to_string())
}

/// Cloneable front-end to a running [`SearchSession`]
#[derive(Debug, Clone)]
pub struct SearchHandle {
    events: mpsc::Sender<SearchEvent>,
    view: watch::Receiver<SearchView>,
}

impl SearchHandle {
    pub async fn edit(&self, term: impl Into<String>) -> Result<()> {
        self.send(SearchEvent::Edit(term.into())).await
    }

    pub async fn set_mode(&self, mode: SearchMode) -> Result<()> {
        self.send(SearchEvent::SetMode(mode)).await
    }

    pub async fn refresh(&self) -> Result<()> {
        self.send(SearchEvent::Refresh).await
    }

    /// Create a formula and wait for the backend's verdict
    ///
    /// On success the session invalidates its caches and reloads the list in
    /// the background.
    pub async fn create(&self, formula: NewFormula) -> Result<()> {
        let (reply, outcome) = oneshot::channel();
        self.send(SearchEvent::Create(formula, reply)).await?;
        outcome.await.map_err(|_| closed())?
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(SearchEvent::Shutdown).await
    }

    /// Latest published snapshot
    pub fn view(&self) -> SearchView {
        self.view.borrow().clone()
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Result<SearchView>
    where
        F: FnMut(&SearchView) -> bool,
    {
        let view = self
            .view
            .wait_for(|view| predicate(view))
            .await
            .map_err(|_| closed())?;
        Ok(view.clone())
    }

    /// Wait for the next published snapshot
    pub async fn changed(&mut self) -> Result<SearchView> {
        self.view.changed().await.map_err(|_| closed())?;
        Ok(self.view.borrow_and_update().clone())
    }

    async fn send(&self, event: SearchEvent) -> Result<()> {
        self.events.send(event).await.map_err(|_| closed())
    }
}

/// Event loop owning a coordinator and a formula store
pub struct SearchSession<S: FormulaStore + 'static> {
    coordinator: SearchCoordinator,
    store: Arc<S>,
    debounce: Duration,
    events: mpsc::Receiver<SearchEvent>,
    view: watch::Sender<SearchView>,
    pending: FuturesUnordered<BoxFuture<'static, Completion>>,
    deep_deadline: Option<Instant>,
}

impl<S: FormulaStore + 'static> SearchSession<S> {
    pub fn new(store: Arc<S>, config: &SearchConfig) -> (Self, SearchHandle) {
        let coordinator = SearchCoordinator::new(config);
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        let (view_tx, view_rx) = watch::channel(coordinator.view());

        let session = Self {
            coordinator,
            store,
            debounce: config.debounce(),
            events: events_rx,
            view: view_tx,
            pending: FuturesUnordered::new(),
            deep_deadline: None,
        };
        let handle = SearchHandle {
            events: events_tx,
            view: view_rx,
        };
        (session, handle)
    }

    /// Start a session on the tokio runtime
    pub fn spawn(store: Arc<S>, config: &SearchConfig) -> (SearchHandle, JoinHandle<()>) {
        let (session, handle) = Self::new(store, config);
        (handle, tokio::spawn(session.run()))
    }

    /// Process events until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        log::debug!("Search session started");
        if self.coordinator.needs_list_load() {
            self.load_list();
        }
        self.dispatch_deep();
        self.publish();

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    None | Some(SearchEvent::Shutdown) => break,
                    Some(event) => self.handle_event(event),
                },
                Some(done) = self.pending.next(), if !self.pending.is_empty() => {
                    self.complete(done);
                }
                _ = wait_until(self.deep_deadline) => {
                    self.deep_deadline = None;
                    self.dispatch_deep();
                }
            }
            self.publish();
        }

        log::debug!(
            "Search session stopped with {} requests in flight",
            self.pending.len()
        );
    }

    fn handle_event(&mut self, event: SearchEvent) {
        match event {
            SearchEvent::Edit(term) => {
                if self.coordinator.set_search_term(term) && self.coordinator.needs_deep_query() {
                    self.deep_deadline = Some(Instant::now() + self.debounce);
                }
            }
            SearchEvent::SetMode(mode) => {
                if self.coordinator.set_mode(mode) {
                    self.deep_deadline = None;
                    self.dispatch_deep();
                }
            }
            SearchEvent::Refresh => self.load_list(),
            SearchEvent::Create(formula, reply) => {
                if let Err(e) = formula.validate() {
                    let _ = reply.send(Err(e));
                    return;
                }
                let store = Arc::clone(&self.store);
                self.pending.push(
                    async move {
                        let result = store.create_formula(&formula).await;
                        if result.is_ok() {
                            log::info!("Created formula '{}'", formula.name);
                        }
                        Completion::Created(result, reply)
                    }
                    .boxed(),
                );
            }
            SearchEvent::Shutdown => {}
        }
    }

    fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::List(ticket, result) => {
                self.coordinator.apply_list_response(ticket, result);
            }
            Completion::Deep(ticket, result) => {
                self.coordinator.apply_deep_response(ticket, result);
            }
            Completion::Created(result, reply) => {
                if result.is_ok() {
                    self.coordinator.invalidate();
                    self.load_list();
                    self.dispatch_deep();
                }
                // The caller may have stopped waiting.
                let _ = reply.send(result);
            }
        }
    }

    fn load_list(&mut self) {
        let ticket = self.coordinator.begin_list_load();
        let store = Arc::clone(&self.store);
        self.pending.push(
            async move {
                let result = store.list_formulas().await;
                Completion::List(ticket, result)
            }
            .boxed(),
        );
    }

    fn dispatch_deep(&mut self) {
        let Some(ticket) = self.coordinator.begin_deep_query() else {
            return;
        };
        log::debug!("Deep query #{} for '{}'", ticket.seq(), ticket.term());
        let store = Arc::clone(&self.store);
        let query = ticket.query();
        self.pending.push(
            async move {
                let result = store.compare_indexes(&query).await;
                Completion::Deep(ticket, result)
            }
            .boxed(),
        );
    }

    fn publish(&self) {
        let mut view = self.coordinator.view();
        // A debounced query counts as loading until it has been answered.
        if self.deep_deadline.is_some() && self.coordinator.needs_deep_query() {
            view.loading = true;
        }
        self.view.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
