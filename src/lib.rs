//! # Tether - HTTP calls mapped onto typed models
//!
//! Tether sends declarative [`Call`]s through a [`ServiceQueue`], which controls
//! when each call starts and reports when all of them are done, and maps the JSON
//! responses onto models through the [`mapping`] traits. Existing models are
//! updated in place, and to-many relations are reconciled by identity so that
//! unchanged elements keep their identity.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tether::mapping::{Deserializable, Linkable, Mapper, Updatable};
//! use tether::{Call, Configuration, MappingError, Service};
//!
//! struct Product {
//!     uuid: String,
//!     price: Option<f64>,
//! }
//!
//! impl Deserializable for Product {
//!     fn from_json(map: &Mapper<'_>) -> Result<Self, MappingError> {
//!         let mut product = Product { uuid: map.required("uuid")?, price: None };
//!         product.update_from(map)?;
//!         Ok(product)
//!     }
//! }
//!
//! impl Updatable for Product {
//!     fn update_from(&mut self, map: &Mapper<'_>) -> Result<(), MappingError> {
//!         map.field("price", &mut self.price)
//!     }
//! }
//!
//! impl Linkable for Product {
//!     type Key = String;
//!     const KEY: &'static str = "uuid";
//!
//!     fn identity_key(&self) -> String {
//!         self.uuid.clone()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tether::Error> {
//!     let service = Service::new(Configuration::new("https://api.example.com"))?;
//!
//!     // Fetch a collection nested under a root node
//!     let call = Call::new("products").root_node("results");
//!     let mut products: Vec<Product> = service.fetch_many(call.clone()).await?;
//!
//!     // Later: refresh in place, keeping unchanged products
//!     service.update_many(call, &mut products).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Queueing
//!
//! ```no_run
//! use tether::{Call, Configuration, ServiceQueue};
//! use tether::session::HttpSession;
//!
//! # async fn example() -> Result<(), tether::Error> {
//! let queue = ServiceQueue::builder(Configuration::new("https://api.example.com"))
//!     .on_drained(|| println!("everything finished"))
//!     .build(HttpSession::new()?);
//!
//! queue.perform_write(Call::new("ping"), false, |result| {
//!     println!("ping: {:?}", result.is_ok());
//! })?;
//! queue.resume_all();
//! # Ok(())
//! # }
//! ```

mod call;
mod config;
mod error;
pub mod mapping;
mod queue;
mod response;
mod service;
pub mod session;
pub mod stub;

pub use call::{Call, JsonNode};
pub use config::{Configuration, DEFAULT_TIMEOUT};
pub use error::{Error, MappingError, Result};
pub use queue::{ServiceQueue, ServiceQueueBuilder, TaskHandle};
pub use response::RawResponse;
pub use service::Service;
