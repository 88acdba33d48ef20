// src/session/driver.rs

//! Runs a [`QuizSession`] on its own task.
//!
//! Timer ticks, user commands and submission results are all funneled into one
//! `select!` loop, so the state machine only ever sees one event at a time.

use std::{future::pending, sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{Instant, Interval, interval_at},
};

use super::{
    backend::{BackendError, QuizBackend},
    engine::{PendingSubmission, QuizSession, SessionError, SessionPhase, SubmitTrigger, TickOutcome},
    view::SessionView,
};
use crate::models::attempt::TestAttempt;

const TICK: Duration = Duration::from_secs(1);

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    Select(usize, Reply<()>),
    Next(Reply<usize>),
    Previous(Reply<usize>),
    Submit(Reply<()>),
}

/// Owner side of a running session.
///
/// Dropping the handle (or calling [`SessionHandle::abandon`]) stops the task
/// and its timer. Nothing is recorded for an abandoned session.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<()>,
}

/// Loads `test_id` from `backend` and starts the countdown on a new task.
pub fn spawn_session<B>(backend: Arc<B>, test_id: i64) -> SessionHandle
where
    B: QuizBackend + ?Sized + 'static,
{
    let (commands, command_rx) = mpsc::channel(16);
    let (view_tx, view) = watch::channel(SessionView::empty(SessionPhase::Loading));
    let task = tokio::spawn(run(backend, test_id, command_rx, view_tx));

    SessionHandle {
        commands,
        view,
        task,
    }
}

impl SessionHandle {
    pub async fn select_answer(&self, option: usize) -> Result<(), SessionError> {
        self.request(|tx| Command::Select(option, tx)).await
    }

    pub async fn next(&self) -> Result<usize, SessionError> {
        self.request(Command::Next).await
    }

    pub async fn previous(&self) -> Result<usize, SessionError> {
        self.request(Command::Previous).await
    }

    /// Starts a manual submission. Resolves once the latch is claimed; watch
    /// the view for the outcome.
    pub async fn submit(&self) -> Result<(), SessionError> {
        self.request(Command::Submit).await
    }

    /// Latest published snapshot.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Waits until a snapshot satisfies `pred`.
    pub async fn wait_for<F>(&mut self, pred: F) -> Result<SessionView, SessionError>
    where
        F: FnMut(&SessionView) -> bool,
    {
        self.view
            .wait_for(pred)
            .await
            .map(|v| v.clone())
            .map_err(|_| SessionError::Inactive)
    }

    /// Discards the session.
    pub fn abandon(self) {}

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| SessionError::Inactive)?;
        rx.await.map_err(|_| SessionError::Inactive)?
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<B>(
    backend: Arc<B>,
    test_id: i64,
    mut commands: mpsc::Receiver<Command>,
    view_tx: watch::Sender<SessionView>,
) where
    B: QuizBackend + ?Sized + 'static,
{
    let mut session = match load(backend.as_ref(), test_id).await {
        Ok(session) => session,
        Err(phase) => {
            view_tx.send_replace(SessionView::empty(phase));
            // Keep answering commands until the handle goes away.
            while let Some(command) = commands.recv().await {
                reject(command, SessionError::Inactive);
            }
            return;
        }
    };
    view_tx.send_replace(session.view());

    let mut ticker = Some(interval_at(Instant::now() + TICK, TICK));
    let (done_tx, mut done_rx) = mpsc::channel::<Result<TestAttempt, BackendError>>(1);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                if let Some(pending) = apply(&mut session, command) {
                    record(backend.clone(), pending, done_tx.clone());
                }
            }
            _ = next_tick(&mut ticker) => match session.tick() {
                TickOutcome::Stopped => ticker = None,
                TickOutcome::Running { .. } => {}
                TickOutcome::Expired(pending) => {
                    tracing::info!(mock_test_id = test_id, "Time is up, submitting");
                    record(backend.clone(), pending, done_tx.clone());
                }
            },
            Some(result) = done_rx.recv() => {
                if let Err(err) = session.finish_submission(result) {
                    tracing::error!("Submission result without submission: {}", err);
                }
                if session.is_completed() {
                    ticker = None;
                }
            }
        }
        view_tx.send_replace(session.view());
    }

    tracing::debug!(mock_test_id = test_id, "Session closed");
}

async fn load<B>(backend: &B, test_id: i64) -> Result<QuizSession, SessionPhase>
where
    B: QuizBackend + ?Sized,
{
    let (test, questions) =
        tokio::try_join!(backend.fetch_test(test_id), backend.fetch_questions(test_id))
            .map_err(|err| {
                tracing::warn!(mock_test_id = test_id, "Failed to load test: {}", err);
                match err {
                    BackendError::NotFound(_) => SessionPhase::NotFound,
                    BackendError::Unauthorized => SessionPhase::Unauthorized,
                    _ => SessionPhase::Unavailable,
                }
            })?;

    QuizSession::start(test, questions).map_err(|err| {
        tracing::warn!(mock_test_id = test_id, "Cannot start test: {}", err);
        match err {
            SessionError::NotFound => SessionPhase::NotFound,
            _ => SessionPhase::Unavailable,
        }
    })
}

/// Applies a user command. Returns a submission to record when the command
/// claimed the latch.
fn apply(session: &mut QuizSession, command: Command) -> Option<PendingSubmission> {
    match command {
        Command::Select(option, reply) => {
            let _ = reply.send(session.select_answer(option));
            None
        }
        Command::Next(reply) => {
            let _ = reply.send(session.go_to_next());
            None
        }
        Command::Previous(reply) => {
            let _ = reply.send(session.go_to_previous());
            None
        }
        Command::Submit(reply) => match session.begin_submission(SubmitTrigger::Manual) {
            Ok(pending) => {
                let _ = reply.send(Ok(()));
                Some(pending)
            }
            Err(err) => {
                let _ = reply.send(Err(err));
                None
            }
        },
    }
}

fn reject(command: Command, err: SessionError) {
    match command {
        Command::Select(_, reply) | Command::Submit(reply) => {
            let _ = reply.send(Err(err));
        }
        Command::Next(reply) | Command::Previous(reply) => {
            let _ = reply.send(Err(err));
        }
    }
}

/// Sends the attempt off without blocking the loop.
fn record<B>(
    backend: Arc<B>,
    pending: PendingSubmission,
    done: mpsc::Sender<Result<TestAttempt, BackendError>>,
) where
    B: QuizBackend + ?Sized + 'static,
{
    tokio::spawn(async move {
        let result = backend.record_attempt(pending.request).await;
        let _ = done.send(result).await;
    });
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending::<()>().await,
    }
}
