//! # wirebox
//!
//! Runtime dependency-injection container: register constructor functions,
//! resolve object graphs on demand.
//!
//! ## Features
//!
//! - **Lazy**: constructors run on first resolution, never at registration
//! - **Memoized**: singleton by default, fresh instances via prototypes
//! - **Grouped**: register a type under the traits it implements and
//!   resolve every implementation as one ordered collection
//! - **Structural**: injectable records resolve field-by-field, no
//!   constructor boilerplate
//! - **Ordered teardown**: cleanup thunks run in reverse construction order
//! - **Cycle-checked**: a cyclic graph fails before any constructor runs
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use wirebox::Container;
//!
//! #[derive(Default)]
//! struct ServeMux;
//!
//! struct Server {
//! 	mux: Arc<ServeMux>,
//! }
//!
//! # fn main() -> wirebox::DiResult<()> {
//! let container = Container::new();
//! container.provide(|| ServeMux::default())?;
//! container.provide(|mux: Arc<ServeMux>| Server { mux })?;
//!
//! let server: Arc<Server> = container.resolve()?;
//! let mux: Arc<ServeMux> = container.resolve()?;
//! assert!(Arc::ptr_eq(&server.mux, &mux));
//! # Ok(())
//! # }
//! ```
//!
//! ## Interfaces and groups
//!
//! A provider can be re-keyed under trait objects it implements. A single
//! implementation resolves as `Arc<dyn Trait>`; several implementations
//! make the scalar lookup ambiguous while `Vec<Arc<dyn Trait>>` collects
//! all of them in registration order.
//!
//! ```
//! use std::sync::Arc;
//! use wirebox::{Container, ProvideOptions};
//!
//! trait Closer: Send + Sync {}
//!
//! #[derive(Default)]
//! struct Server;
//! impl Closer for Server {}
//!
//! #[derive(Default)]
//! struct File;
//! impl Closer for File {}
//!
//! # fn main() -> wirebox::DiResult<()> {
//! let container = Container::new();
//! container.provide_with(
//! 	|| Server::default(),
//! 	ProvideOptions::new().implements::<dyn Closer>(|server| server),
//! )?;
//! container.provide_with(
//! 	|| File::default(),
//! 	ProvideOptions::new().implements::<dyn Closer>(|file| file),
//! )?;
//!
//! let closers: Vec<Arc<dyn Closer>> = container.resolve()?;
//! assert_eq!(closers.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Cleanup
//!
//! Constructors wrapped in [`with_cleanup`] return their value together
//! with a teardown thunk. [`Container::cleanup`] runs the recorded thunks
//! in reverse construction order, so every value is torn down before its
//! dependencies.
//!
//! ## Concurrency
//!
//! The container is single-threaded cooperative: each operation holds the
//! internal lock for its full duration and operations must not be
//! re-entered from inside user constructors. Constructors receive their
//! dependencies as parameters instead of calling back into the container.

mod container;
mod dependency;
mod error;
mod graph;
mod injectable;
mod node;
mod provider;
mod registry;

pub use container::{Container, ProvideOptions};
pub use dependency::{Dependency, Request, ResolveContext, Tag};
pub use error::{BoxError, DiError, DiResult};
pub use node::{CleanupFn, Tags};
pub use provider::{
	fallible, fallible_with_cleanup, with_cleanup, Constructor, Fallible, FallibleWithCleanup,
	Invocation, InvokeOutcome, WithCleanup,
};
