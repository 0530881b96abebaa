//! Container error taxonomy.
//!
//! Signature-shape errors of the resolution engine are unrepresentable at
//! runtime: constructors, invocations and resolve targets are classified by
//! the type system (see [`crate::Constructor`] and [`crate::Dependency`]).
//! What remains are registration conflicts, failed lookups, graph cycles and
//! errors produced by user constructors.

use thiserror::Error;

/// Boxed error returned by fallible constructors and invocations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience alias for container results.
pub type DiResult<T> = std::result::Result<T, DiError>;

/// Errors raised by registration, lookup and value materialization.
///
/// The display shapes are stable and asserted by the test suite.
#[derive(Debug, Error)]
pub enum DiError {
	/// A constructor or value node is already registered under this
	/// `(type, name)` key.
	#[error("{label} already exists in dependency graph")]
	AlreadyExists {
		/// Label of the conflicting node.
		label: String,
	},

	/// The requested type has no node in the container.
	#[error("type {type_name} not exists in container")]
	TypeNotFound {
		/// Display name of the requested type.
		type_name: String,
	},

	/// A node's dependency is missing from the container.
	#[error("{label}: dependency {dependency} not exists in container")]
	DependencyNotFound {
		/// Label of the node whose dependency walk failed.
		label: String,
		/// Display name of the missing dependency.
		dependency: String,
	},

	/// Two or more concrete providers claim the same interface key; only
	/// the group remains resolvable.
	#[error("{interface}: have several implementations")]
	SeveralImplementations {
		/// Display name of the ambiguous interface.
		interface: String,
	},

	/// The dependency graph reachable from the requested node is cyclic.
	#[error("cycle detected")]
	CycleDetected,

	/// A constructor producing a cleanup was registered as a prototype.
	#[error("{label}: cleanup not supported with prototype providers")]
	PrototypeCleanup {
		/// Label of the rejected node.
		label: String,
	},

	/// A user constructor returned an error; wrapped once with the failing
	/// node's label.
	#[error("{label}: {source}")]
	Build {
		/// Label of the failing node.
		label: String,
		/// The constructor's error.
		#[source]
		source: BoxError,
	},

	/// An invocation returned an error; passed through unchanged.
	#[error("{source}")]
	Invocation {
		/// The invocation's error.
		#[source]
		source: BoxError,
	},

	/// An iteration callback returned an error.
	#[error("{group} with index {index} failed: {source}")]
	IterationFailed {
		/// Label of the iterated group.
		group: String,
		/// Index of the failing member.
		index: usize,
		/// The callback's error.
		#[source]
		source: BoxError,
	},

	/// A stored value did not downcast to the requested type. Indicates a
	/// corrupted registry and is not produced during normal operation.
	#[error("{type_name}: container type mismatch")]
	TypeMismatch {
		/// Display name of the requested type.
		type_name: String,
	},

	/// The container was dropped while one of its values was being built.
	#[error("container is gone")]
	ContainerDropped,
}
