//! Typed calls on top of a [`ServiceQueue`].
//!
//! [`Service`] runs each call through its queue, waits for the result and turns
//! the response into models.

use crate::mapping::{Deserializable, Linkable, RelationPolicy, Updatable};
use crate::session::{HttpSession, Session};
use crate::{Call, Configuration, Error, RawResponse, Result, ServiceQueue};
use serde_json::Value;
use tokio::sync::oneshot;

/// Performs calls and converts their responses into models.
///
/// The service is explicitly constructed and cheap to clone; clones share the
/// same queue.
///
/// # Examples
///
/// ```no_run
/// use tether::mapping::{Deserializable, Mapper};
/// use tether::{Call, Configuration, MappingError, Service};
///
/// struct Post {
///     id: u64,
///     title: Option<String>,
/// }
///
/// impl Deserializable for Post {
///     fn from_json(map: &Mapper<'_>) -> Result<Self, MappingError> {
///         Ok(Post {
///             id: map.required("id")?,
///             title: map.optional("title")?,
///         })
///     }
/// }
///
/// # async fn example() -> Result<(), tether::Error> {
/// let service = Service::new(Configuration::new("https://jsonplaceholder.typicode.com"))?;
///
/// let post: Post = service.fetch_one(Call::new("posts/1")).await?;
/// let posts: Vec<Post> = service.fetch_many(Call::new("posts")).await?;
/// println!("{} {:?}, {} posts", post.id, post.title, posts.len());
/// # Ok(())
/// # }
/// ```
pub struct Service<S: Session = HttpSession> {
    queue: ServiceQueue<S>,
}

impl<S: Session> Clone for Service<S> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl Service<HttpSession> {
    /// Creates a service that talks HTTP through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the HTTP client cannot be built.
    pub fn new(configuration: Configuration) -> Result<Self> {
        Ok(Self::with_session(configuration, HttpSession::new()?))
    }
}

impl<S: Session> Service<S> {
    /// Creates a service around any session.
    pub fn with_session(configuration: Configuration, session: S) -> Self {
        Self::from_queue(ServiceQueue::new(configuration, session))
    }

    /// Creates a service around an existing queue.
    ///
    /// The queue's relation policy applies to every conversion.
    pub fn from_queue(queue: ServiceQueue<S>) -> Self {
        Self { queue }
    }

    /// The queue the service runs its calls on.
    pub fn queue(&self) -> &ServiceQueue<S> {
        &self.queue
    }

    fn policy(&self) -> RelationPolicy {
        self.queue.policy()
    }

    /// Performs the call and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the task is cancelled through the queue
    /// before it completes, or the transport error.
    pub async fn perform(&self, call: &Call) -> Result<RawResponse> {
        let (tx, rx) = oneshot::channel();
        self.queue.enqueue(call.clone(), true, move |result| {
            let _ = tx.send(result);
        })?;

        rx.await.map_err(|_| Error::Cancelled)?
    }

    /// Performs the call and returns the decoded JSON.
    pub async fn fetch_json(&self, call: Call) -> Result<Value> {
        self.perform(&call).await?.json(&call)
    }

    /// Performs the call and converts its root node into a model.
    ///
    /// # Errors
    ///
    /// Besides transport and decoding errors, returns
    /// [`Error::NoModelForNode`] if the root node is not an object and
    /// [`Error::Mapping`] if the conversion fails.
    pub async fn fetch_one<T: Deserializable>(&self, call: Call) -> Result<T> {
        self.perform(&call).await?.model(&call, self.policy())
    }

    /// Performs the call and converts every element of its root node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoModelForNode`] if the root node is not an array of
    /// objects. The first element that fails to convert aborts the result.
    pub async fn fetch_many<T: Deserializable>(&self, call: Call) -> Result<Vec<T>> {
        self.perform(&call).await?.models(&call, self.policy())
    }

    /// Performs the call and applies its root node to an existing model.
    pub async fn update_one<T: Updatable>(&self, call: Call, target: &mut T) -> Result<()> {
        self.perform(&call)
            .await?
            .update(&call, target, self.policy())
    }

    /// Performs the call and reconciles an existing collection with its root node.
    ///
    /// Elements keep their identity when their key is still present.
    pub async fn update_many<T>(&self, call: Call, target: &mut Vec<T>) -> Result<()>
    where
        T: Deserializable + Updatable + Linkable,
    {
        self.perform(&call)
            .await?
            .reconcile(&call, target, self.policy())
    }

    /// Performs a call that expects no response data.
    ///
    /// Any accepted status is success, including one with an empty body.
    pub async fn write(&self, call: Call) -> Result<()> {
        self.perform(&call).await?.no_data(&call)
    }
}
