//! A queue of calls with controllable start and a drain notification.
//!
//! [`ServiceQueue`] owns every task it creates. A task is either queued (not
//! started) or in flight; it leaves the queue when its session call returns or
//! when it is cancelled. All bookkeeping lives behind one mutex, and callbacks
//! run after the lock is released, so a callback may use the queue again.

use crate::mapping::{Deserializable, RelationPolicy};
use crate::session::{HttpSession, Request, Session};
use crate::{Call, Configuration, RawResponse, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::AbortHandle;

type ResultCallback = Box<dyn FnOnce(Result<RawResponse>) + Send>;
type DrainedCallback = Box<dyn FnOnce() + Send>;

/// Identifies a task created by [`ServiceQueue::enqueue`].
///
/// Handles are never reused by the queue that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(u64);

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

struct PendingTask {
    call: Call,
    request: Request,
    started: bool,
    on_result: ResultCallback,
    abort: Option<AbortHandle>,
}

#[derive(Default)]
struct QueueState {
    /// Keyed by handle; handles increase, so iteration follows insertion order.
    tasks: BTreeMap<TaskHandle, PendingTask>,
    /// Number of tasks with `started == true`.
    outstanding: usize,
    next_id: u64,
    on_drained: Option<DrainedCallback>,
}

struct QueueInner<S> {
    configuration: Configuration,
    session: S,
    policy: RelationPolicy,
    state: Mutex<QueueState>,
}

/// Runs calls through a [`Session`], tracks outstanding work and reports when
/// everything it started has finished.
///
/// Tasks are spawned on the current Tokio runtime when they start.
///
/// # Examples
///
/// ```no_run
/// use tether::{Call, Configuration, ServiceQueue};
/// use tether::stub::StubSession;
///
/// # async fn example() -> Result<(), tether::Error> {
/// let queue = ServiceQueue::builder(Configuration::new("http://api.test"))
///     .on_drained(|| println!("all calls done"))
///     .build(StubSession::new());
///
/// let first = queue.enqueue(Call::new("products"), false, |result| {
///     println!("products: {:?}", result.map(|r| r.status));
/// })?;
/// queue.enqueue(Call::new("users"), false, |_| {})?;
///
/// queue.resume(first);
/// queue.resume_all();
/// # Ok(())
/// # }
/// ```
pub struct ServiceQueue<S: Session> {
    inner: Arc<QueueInner<S>>,
}

impl<S: Session> Clone for ServiceQueue<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ServiceQueue<HttpSession> {
    /// Creates a [`ServiceQueueBuilder`] for the given configuration.
    ///
    /// The builder accepts any session in [`build`](ServiceQueueBuilder::build).
    pub fn builder(configuration: Configuration) -> ServiceQueueBuilder {
        ServiceQueueBuilder::new(configuration)
    }
}

impl<S: Session> ServiceQueue<S> {
    /// Creates a queue without a drain callback.
    pub fn new(configuration: Configuration, session: S) -> Self {
        ServiceQueueBuilder::new(configuration).build(session)
    }

    /// The configuration calls are resolved against.
    pub fn configuration(&self) -> &Configuration {
        &self.inner.configuration
    }

    /// The session executing the calls.
    pub fn session(&self) -> &S {
        &self.inner.session
    }

    /// The relation policy used by the typed `perform*` methods.
    pub fn policy(&self) -> RelationPolicy {
        self.inner.policy
    }

    /// Adds a call to the queue.
    ///
    /// With `auto_start` the call is executed immediately; otherwise it waits for
    /// [`resume`](Self::resume) or [`resume_all`](Self::resume_all). `on_result`
    /// runs exactly once when the session returns, unless the task is cancelled
    /// first, in which case it never runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) if the call does not
    /// resolve against the configuration; nothing is queued in that case.
    ///
    /// # Panics
    ///
    /// Starting a task outside a Tokio runtime panics.
    pub fn enqueue<F>(&self, call: Call, auto_start: bool, on_result: F) -> Result<TaskHandle>
    where
        F: FnOnce(Result<RawResponse>) + Send + 'static,
    {
        let request = call.request(&self.inner.configuration)?;

        let mut state = self.inner.lock();
        let handle = TaskHandle(state.next_id);
        state.next_id += 1;

        tracing::debug!(
            task = %handle,
            method = %call.method,
            path = %call.path,
            auto_start = auto_start,
            "Task enqueued"
        );

        state.tasks.insert(
            handle,
            PendingTask {
                call,
                request,
                started: false,
                on_result: Box::new(on_result),
                abort: None,
            },
        );

        if auto_start {
            self.start_locked(&mut state, handle);
        }

        Ok(handle)
    }

    /// Adds a call whose response is decoded into a single model.
    ///
    /// See [`RawResponse::model`] for the conversion rules.
    pub fn perform<T, F>(&self, call: Call, auto_start: bool, on_result: F) -> Result<TaskHandle>
    where
        T: Deserializable,
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let policy = self.inner.policy;
        let converting = call.clone();
        self.enqueue(call, auto_start, move |result| {
            on_result(result.and_then(|raw| raw.model(&converting, policy)))
        })
    }

    /// Adds a call whose response is decoded into a collection of models.
    ///
    /// See [`RawResponse::models`] for the conversion rules.
    pub fn perform_collection<T, F>(
        &self,
        call: Call,
        auto_start: bool,
        on_result: F,
    ) -> Result<TaskHandle>
    where
        T: Deserializable,
        F: FnOnce(Result<Vec<T>>) + Send + 'static,
    {
        let policy = self.inner.policy;
        let converting = call.clone();
        self.enqueue(call, auto_start, move |result| {
            on_result(result.and_then(|raw| raw.models(&converting, policy)))
        })
    }

    /// Adds a call that expects no response data.
    ///
    /// Any accepted status is success, whatever the body.
    pub fn perform_write<F>(&self, call: Call, auto_start: bool, on_result: F) -> Result<TaskHandle>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let checking = call.clone();
        self.enqueue(call, auto_start, move |result| {
            on_result(result.and_then(|raw| raw.no_data(&checking)))
        })
    }

    /// Starts a queued task.
    ///
    /// Returns `false` if the task is already started, finished, cancelled or
    /// unknown.
    pub fn resume(&self, handle: TaskHandle) -> bool {
        let mut state = self.inner.lock();
        self.start_locked(&mut state, handle)
    }

    /// Starts every queued task in the order it was enqueued.
    ///
    /// Returns the number of tasks started. Completion order depends on the
    /// session and is not guaranteed.
    pub fn resume_all(&self) -> usize {
        let mut state = self.inner.lock();
        let waiting: Vec<TaskHandle> = state
            .tasks
            .iter()
            .filter(|(_, task)| !task.started)
            .map(|(handle, _)| *handle)
            .collect();

        for handle in &waiting {
            self.start_locked(&mut state, *handle);
        }
        waiting.len()
    }

    /// Removes a task without running its callback.
    ///
    /// An in-flight task is aborted. Returns `false` if the handle is not queued.
    pub fn cancel(&self, handle: TaskHandle) -> bool {
        let task = {
            let mut state = self.inner.lock();
            let Some(task) = state.tasks.remove(&handle) else {
                return false;
            };
            if task.started {
                state.outstanding -= 1;
            }
            task
        };

        if let Some(abort) = &task.abort {
            abort.abort();
        }

        tracing::debug!(
            task = %handle,
            path = %task.call.path,
            started = task.started,
            "Task cancelled"
        );
        true
    }

    /// Cancels every task, queued or in flight.
    ///
    /// No callbacks run, including the drain callback. Returns the number of
    /// tasks removed.
    pub fn invalidate_and_cancel(&self) -> usize {
        let tasks = {
            let mut state = self.inner.lock();
            state.outstanding = 0;
            std::mem::take(&mut state.tasks)
        };

        for task in tasks.values() {
            if let Some(abort) = &task.abort {
                abort.abort();
            }
        }

        tracing::debug!(cancelled = tasks.len(), "Queue invalidated");
        tasks.len()
    }

    /// Returns `true` while any task is in flight or still waiting to start.
    pub fn has_outstanding_tasks(&self) -> bool {
        let state = self.inner.lock();
        state.outstanding > 0 || state.tasks.values().any(|task| !task.started)
    }

    /// Number of tasks currently in flight.
    pub fn outstanding_count(&self) -> usize {
        self.inner.lock().outstanding
    }

    /// Handles of every task still in the queue, in insertion order.
    pub fn queued(&self) -> Vec<TaskHandle> {
        self.inner.lock().tasks.keys().copied().collect()
    }

    /// Whether the task has started, or `None` if it is no longer queued.
    pub fn is_started(&self, handle: TaskHandle) -> Option<bool> {
        self.inner.lock().tasks.get(&handle).map(|task| task.started)
    }

    fn start_locked(&self, state: &mut QueueState, handle: TaskHandle) -> bool {
        let Some(task) = state.tasks.get_mut(&handle) else {
            return false;
        };
        if task.started {
            return false;
        }

        task.started = true;
        let request = task.request.clone();
        let inner = Arc::clone(&self.inner);
        let join = tokio::spawn(async move {
            let result = inner.session.execute(request).await;
            inner.complete(handle, result);
        });
        task.abort = Some(join.abort_handle());

        tracing::debug!(task = %handle, path = %task.call.path, "Task started");

        state.outstanding += 1;
        true
    }
}

impl<S> QueueInner<S> {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn complete(&self, handle: TaskHandle, result: Result<RawResponse>) {
        let (on_result, on_drained) = {
            let mut state = self.lock();
            let Some(task) = state.tasks.remove(&handle) else {
                tracing::debug!(task = %handle, "Dropping result of cancelled task");
                return;
            };
            state.outstanding -= 1;

            tracing::debug!(
                task = %handle,
                path = %task.call.path,
                success = result.is_ok(),
                remaining = state.tasks.len(),
                "Task completed"
            );

            let on_drained = if state.tasks.is_empty() {
                state.on_drained.take()
            } else {
                None
            };
            (task.on_result, on_drained)
        };

        on_result(result);

        if let Some(on_drained) = on_drained {
            tracing::debug!("Queue drained");
            on_drained();
        }
    }
}

/// Builder for a [`ServiceQueue`].
pub struct ServiceQueueBuilder {
    configuration: Configuration,
    policy: RelationPolicy,
    on_drained: Option<DrainedCallback>,
}

impl ServiceQueueBuilder {
    /// Creates a builder with the default relation policy and no drain callback.
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            policy: RelationPolicy::default(),
            on_drained: None,
        }
    }

    /// Sets the relation policy for the typed `perform*` methods.
    pub fn policy(mut self, policy: RelationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the callback that runs once, when the last task of the queue
    /// completes.
    ///
    /// It runs after that task's own callback. A queue that never starts a task,
    /// or whose tasks are all cancelled, never runs it.
    pub fn on_drained<F>(mut self, on_drained: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_drained = Some(Box::new(on_drained));
        self
    }

    /// Builds the queue around `session`.
    pub fn build<S: Session>(self, session: S) -> ServiceQueue<S> {
        ServiceQueue {
            inner: Arc::new(QueueInner {
                configuration: self.configuration,
                session,
                policy: self.policy,
                state: Mutex::new(QueueState {
                    on_drained: self.on_drained,
                    ..QueueState::default()
                }),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubSession;
    use crate::Error;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn config() -> Configuration {
        Configuration::new("http://api.test")
    }

    fn gated_session() -> StubSession {
        let session = StubSession::new().gated();
        session.stub("mock", 200, json!({ "uuid": "mock" }));
        session
    }

    /// Yields until the queue reaches the given state or a second passes.
    async fn settle(queue: &ServiceQueue<StubSession>, outstanding: bool) {
        for _ in 0..100 {
            if queue.has_outstanding_tasks() == outstanding {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("queue did not settle to outstanding = {}", outstanding);
    }

    #[tokio::test]
    async fn test_deferred_tasks_do_not_run() {
        let session = gated_session();
        let queue = ServiceQueue::new(config(), session.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let calls = calls.clone();
            handles.push(
                queue
                    .enqueue(Call::new("mock"), false, move |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap(),
            );
        }
        session.release(3);

        assert!(queue.has_outstanding_tasks());
        assert_eq!(queue.outstanding_count(), 0);
        assert_eq!(queue.queued(), handles);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(session.requests().is_empty());
        assert!(queue.has_outstanding_tasks());
    }

    #[tokio::test]
    async fn test_auto_start_completes() {
        let session = StubSession::new();
        session.stub("mock", 200, json!({ "uuid": "mock" }));
        let queue = ServiceQueue::new(config(), session);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let checker = queue.clone();
        queue
            .enqueue(Call::new("mock"), true, move |result| {
                tx.send((result.map(|r| r.status.as_u16()).ok(), checker.has_outstanding_tasks()))
                    .unwrap();
            })
            .unwrap();

        let (status, outstanding) = rx.recv().await.unwrap();
        assert_eq!(status, Some(200));
        assert!(!outstanding);
    }

    #[tokio::test]
    async fn test_resume_one() {
        let session = gated_session();
        let queue = ServiceQueue::new(config(), session.clone());

        let task1 = queue.enqueue(Call::new("mock"), false, |_| {}).unwrap();
        let task2 = queue.enqueue(Call::new("mock"), true, |_| {}).unwrap();
        let task3 = queue.enqueue(Call::new("mock"), false, |_| {}).unwrap();

        assert_eq!(queue.outstanding_count(), 1);
        assert!(queue.resume(task3));
        assert!(!queue.resume(task3));
        assert_eq!(queue.outstanding_count(), 2);
        assert_eq!(queue.is_started(task1), Some(false));

        session.release(2);
        for _ in 0..100 {
            if queue.queued() == vec![task1] {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(queue.queued(), vec![task1]);
        assert_eq!(queue.is_started(task2), None);
        assert_eq!(queue.outstanding_count(), 0);
        assert!(queue.has_outstanding_tasks());
    }

    #[tokio::test]
    async fn test_resume_all_fires_drained_once() {
        let session = gated_session();
        let drained = Arc::new(AtomicUsize::new(0));
        let counter = drained.clone();
        let queue = ServiceQueue::builder(config())
            .on_drained(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build(session.clone());

        let completed = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let completed = completed.clone();
            let drained = drained.clone();
            queue
                .enqueue(Call::new("mock"), false, move |_| {
                    // Drained only fires after the last task's own callback.
                    assert_eq!(drained.load(Ordering::SeqCst), 0);
                    completed.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        assert_eq!(queue.resume_all(), 3);
        assert_eq!(queue.resume_all(), 0);
        assert_eq!(queue.outstanding_count(), 3);
        assert_eq!(drained.load(Ordering::SeqCst), 0);

        session.release(3);
        settle(&queue, false).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(completed.load(Ordering::SeqCst), 3);
        assert_eq!(drained.load(Ordering::SeqCst), 1);
        assert_eq!(session.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_partial_completion_does_not_drain() {
        let session = gated_session();
        let drained = Arc::new(AtomicUsize::new(0));
        let counter = drained.clone();
        let queue = ServiceQueue::builder(config())
            .on_drained(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build(session.clone());

        queue.enqueue(Call::new("mock"), false, |_| {}).unwrap();
        queue.enqueue(Call::new("mock"), true, |_| {}).unwrap();
        let task3 = queue.enqueue(Call::new("mock"), false, |_| {}).unwrap();
        queue.resume(task3);

        session.release(2);
        for _ in 0..100 {
            if queue.outstanding_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(queue.outstanding_count(), 0);
        assert!(queue.has_outstanding_tasks());
        assert_eq!(drained.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_never_started_never_drains() {
        let drained = Arc::new(AtomicUsize::new(0));
        let counter = drained.clone();
        let queue = ServiceQueue::builder(config())
            .on_drained(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build(StubSession::new());

        let task = queue.enqueue(Call::new("mock"), false, |_| {}).unwrap();
        assert!(queue.cancel(task));
        assert!(!queue.cancel(task));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!queue.has_outstanding_tasks());
        assert_eq!(drained.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_unstarted_task() {
        let session = gated_session();
        let queue = ServiceQueue::new(config(), session.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let running = queue
            .enqueue(Call::new("mock"), true, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let counter = calls.clone();
        let waiting = queue
            .enqueue(Call::new("mock"), false, move |_| {
                counter.fetch_add(100, Ordering::SeqCst);
            })
            .unwrap();

        assert!(queue.cancel(waiting));
        assert_eq!(queue.outstanding_count(), 1);
        assert!(!queue.resume(waiting));
        assert_eq!(queue.queued(), vec![running]);

        session.release(1);
        settle(&queue, false).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_started_task() {
        let session = gated_session();
        let queue = ServiceQueue::new(config(), session.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let task = queue
            .enqueue(Call::new("mock"), true, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(queue.outstanding_count(), 1);

        assert!(queue.cancel(task));
        assert_eq!(queue.outstanding_count(), 0);
        assert!(!queue.has_outstanding_tasks());

        session.release(1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(queue.outstanding_count(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_and_cancel() {
        let session = gated_session();
        let drained = Arc::new(AtomicUsize::new(0));
        let counter = drained.clone();
        let queue = ServiceQueue::builder(config())
            .on_drained(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build(session.clone());

        queue.enqueue(Call::new("mock"), false, |_| {}).unwrap();
        queue.enqueue(Call::new("mock"), true, |_| {}).unwrap();
        queue.enqueue(Call::new("mock"), false, |_| {}).unwrap();
        assert!(queue.has_outstanding_tasks());

        assert_eq!(queue.invalidate_and_cancel(), 3);
        assert!(!queue.has_outstanding_tasks());
        assert!(queue.queued().is_empty());

        session.release(3);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(drained.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelling_last_running_task_does_not_drain() {
        let session = gated_session();
        let drained = Arc::new(AtomicUsize::new(0));
        let counter = drained.clone();
        let queue = ServiceQueue::builder(config())
            .on_drained(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build(session.clone());

        queue.enqueue(Call::new("mock"), true, |_| {}).unwrap();
        queue.enqueue(Call::new("mock"), true, |_| {}).unwrap();

        session.release(1);
        for _ in 0..100 {
            if queue.outstanding_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(queue.outstanding_count(), 1);

        let remaining = queue.queued();
        assert_eq!(remaining.len(), 1);
        assert!(queue.cancel(remaining[0]));

        session.release(1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!queue.has_outstanding_tasks());
        assert_eq!(drained.load(Ordering::SeqCst), 0);
    }

    /// Reads the queue when dropped.
    struct ReadOnDrop {
        queue: ServiceQueue<StubSession>,
        outstanding: Arc<AtomicUsize>,
    }

    impl Drop for ReadOnDrop {
        fn drop(&mut self) {
            self.outstanding
                .store(self.queue.outstanding_count(), Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_cancelled_callbacks_drop_outside_lock() {
        let session = gated_session();
        let queue = ServiceQueue::new(config(), session.clone());
        let outstanding = Arc::new(AtomicUsize::new(usize::MAX));

        let guard = ReadOnDrop {
            queue: queue.clone(),
            outstanding: outstanding.clone(),
        };
        let task = queue
            .enqueue(Call::new("mock"), true, move |_| drop(guard))
            .unwrap();
        assert!(queue.cancel(task));
        assert_eq!(outstanding.load(Ordering::SeqCst), 0);

        outstanding.store(usize::MAX, Ordering::SeqCst);
        let guard = ReadOnDrop {
            queue: queue.clone(),
            outstanding: outstanding.clone(),
        };
        queue
            .enqueue(Call::new("mock"), true, move |_| drop(guard))
            .unwrap();
        assert_eq!(queue.invalidate_and_cancel(), 1);
        assert_eq!(outstanding.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_is_not_queued() {
        let queue = ServiceQueue::new(Configuration::new("not a url"), StubSession::new());
        let result = queue.enqueue(Call::new("mock"), true, |_| {});
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
        assert!(!queue.has_outstanding_tasks());
    }

    #[tokio::test]
    async fn test_callback_can_enqueue() {
        let session = StubSession::new();
        session.stub("first", 200, json!({}));
        session.stub("second", 200, json!({}));
        let queue = ServiceQueue::new(config(), session.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let chained = queue.clone();
        queue
            .enqueue(Call::new("first"), true, move |_| {
                chained
                    .enqueue(Call::new("second"), true, move |result| {
                        tx.send(result.is_ok()).unwrap();
                    })
                    .unwrap();
            })
            .unwrap();

        assert!(rx.recv().await.unwrap());
        let paths: Vec<String> = session.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["first", "second"]);
    }
}
