use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::SessionPolicy;
use crate::dto::backend_dto::SubmitResultRequest;
use crate::dto::session_dto::{AnswerRequest, SessionView};
use crate::error::{Error, Result};
use crate::models::ids::{AnswerId, EmployeeId, QuestionId, TestId};
use crate::services::backend_service::TestsApi;
use crate::services::loader_service::LoaderService;
use crate::services::notification_service::NotificationService;
use crate::services::result_service::{ResultReport, ResultReporter};
use crate::session::{Session, SubmitTrigger, TickOutcome};

type Registry = HashMap<Uuid, Session>;

/// Registry of live sessions and the workflows that span the tests backend.
///
/// The registry lock is never held across an `.await`: a submission is moved to
/// `Submitting` under the lock, delivered without it, and the outcome applied after
/// re-locking.
#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<Mutex<Registry>>,
    loader: LoaderService,
    reporter: ResultReporter,
    notifier: NotificationService,
    policy: SessionPolicy,
    retention: Duration,
    idle_timeout: Duration,
}

impl SessionService {
    pub fn new(
        api: Arc<dyn TestsApi>,
        policy: SessionPolicy,
        notify_on_result: bool,
        retention: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            loader: LoaderService::new(Arc::clone(&api)),
            reporter: ResultReporter::new(Arc::clone(&api)),
            notifier: NotificationService::new(api, notify_on_result),
            policy,
            retention,
            idle_timeout,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Registry>> {
        self.sessions
            .lock()
            .map_err(|_| Error::Internal("Session registry lock poisoned".to_string()))
    }

    fn with_session<T>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let mut sessions = self.lock()?;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Session {} not found", id)))?;
        f(session)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Loads the test and registers a `NotStarted` session. Nothing is registered when
    /// loading fails.
    pub async fn create_session(&self, test_id: TestId, employee_id: EmployeeId) -> Result<SessionView> {
        let loaded = self.loader.load_for_attempt(test_id, employee_id).await?;
        let session = Session::new(loaded.test, employee_id, loaded.attempt_number, self.policy);
        let view = SessionView::from(&session);

        tracing::info!(session_id = %view.id, %test_id, %employee_id, attempt = view.attempt_number, "Session created");
        self.lock()?.insert(view.id, session);
        Ok(view)
    }

    pub fn view(&self, id: Uuid) -> Result<SessionView> {
        self.with_session(id, |s| Ok(SessionView::from(&*s)))
    }

    pub fn start(&self, id: Uuid) -> Result<SessionView> {
        self.with_session(id, |s| {
            s.start()?;
            Ok(SessionView::from(&*s))
        })
    }

    pub fn answer(&self, id: Uuid, req: &AnswerRequest) -> Result<SessionView> {
        let question = QuestionId(req.question_id);
        self.with_session(id, |s| {
            match (req.answer_id, req.text.as_deref()) {
                (Some(answer), _) => s.select(question, AnswerId(answer))?,
                (None, Some(text)) => s.set_text(question, text)?,
                (None, None) => {
                    return Err(Error::BadRequest(
                        "Provide exactly one of answer_id or text".to_string(),
                    ))
                }
            };
            Ok(SessionView::from(&*s))
        })
    }

    pub fn next(&self, id: Uuid) -> Result<SessionView> {
        self.with_session(id, |s| {
            s.next()?;
            Ok(SessionView::from(&*s))
        })
    }

    pub fn previous(&self, id: Uuid) -> Result<SessionView> {
        self.with_session(id, |s| {
            s.previous()?;
            Ok(SessionView::from(&*s))
        })
    }

    pub fn cancel(&self, id: Uuid) -> Result<SessionView> {
        self.with_session(id, |s| {
            s.cancel()?;
            tracing::info!(session_id = %id, "Session cancelled");
            Ok(SessionView::from(&*s))
        })
    }

    /// Explicit submission by the employee; also the retry after a failed delivery.
    pub async fn submit(&self, id: Uuid) -> Result<ResultReport> {
        let request = self.with_session(id, |s| Ok(s.begin_submit(SubmitTrigger::User)?))?;
        self.deliver(id, request).await
    }

    pub fn result(&self, id: Uuid) -> Result<ResultReport> {
        self.with_session(id, |s| {
            s.report().cloned().ok_or_else(|| {
                Error::Conflict(format!("No result yet: the session is {}", s.state()))
            })
        })
    }

    async fn deliver(&self, id: Uuid, request: SubmitResultRequest) -> Result<ResultReport> {
        match self.reporter.submit(&request).await {
            Ok(persisted) => {
                let report = self.with_session(id, |s| Ok(s.complete(persisted)?.clone()))?;
                tracing::info!(session_id = %id, summary = %report.summary(), "Session completed");
                self.notifier.notify_result(&report).await;
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Result submission failed, keeping result for retry");
                self.with_session(id, |s| Ok(s.fail_submission(e.to_string())?))?;
                Err(e)
            }
        }
    }

    /// Advances every session by one second and spawns deliveries for sessions whose
    /// timers ran out.
    pub fn tick_all(&self) -> Result<Vec<JoinHandle<()>>> {
        let due: Vec<(Uuid, SubmitResultRequest)> = {
            let mut sessions = self.lock()?;
            sessions
                .iter_mut()
                .filter_map(|(id, s)| match s.tick() {
                    TickOutcome::Submit(request) => Some((*id, request)),
                    _ => None,
                })
                .collect()
        };

        Ok(due
            .into_iter()
            .map(|(id, request)| {
                let service = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = service.deliver(id, request).await {
                        tracing::error!(session_id = %id, error = %e, "Automatic submission failed");
                    }
                })
            })
            .collect())
    }

    /// Cancels sessions left idle past the idle timeout, then drops completed and
    /// cancelled sessions older than the retention period.
    pub fn evict_finished(&self, now: DateTime<Utc>) -> Result<usize> {
        let retention = chrono::Duration::from_std(self.retention)
            .map_err(|e| Error::Internal(format!("Invalid retention period: {}", e)))?;
        let idle_timeout = chrono::Duration::from_std(self.idle_timeout)
            .map_err(|e| Error::Internal(format!("Invalid idle timeout: {}", e)))?;
        let mut sessions = self.lock()?;

        for (id, s) in sessions.iter_mut() {
            if s.is_idle(now, idle_timeout) && s.cancel().is_ok() {
                tracing::info!(session_id = %id, state = %s.state(), "Cancelled abandoned session");
            }
        }

        let before = sessions.len();
        sessions.retain(|_, s| match s.finished_at() {
            Some(finished) if s.is_finished() => finished + retention > now,
            _ => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted finished sessions");
        }
        Ok(evicted)
    }
}
