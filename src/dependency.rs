//! Dependency lookups: how parameter and field types map onto node requests.
//!
//! Every constructor parameter, invocation parameter and injectable-record
//! field is a [`Dependency`]: it declares the node lookups it performs (for
//! graph preparation) and knows how to pull its value out of the registry at
//! build time. Provided implementations:
//!
//! - `Arc<T>`: exact lookup of the node for `T` (`T` may be a trait
//!   object);
//! - `Option<D>`: same lookups marked optional; absence yields `None`;
//! - `Vec<Arc<dyn I>>`: exact node for the collection type first, then the
//!   group registered for `I`.
//!
//! Record types generated by the `injectable!` macro implement the trait
//! by flattening their field lookups.

use std::any::type_name;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::node::{Built, Key};
use crate::registry::Registry;

/// Name qualifier applied to a lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tag<'a> {
	name: Option<&'a str>,
}

impl<'a> Tag<'a> {
	/// A lookup qualified by `name`.
	pub fn named(name: &'a str) -> Self {
		Self { name: Some(name) }
	}

	/// The qualifier; empty when unnamed.
	pub fn name(&self) -> &str {
		self.name.unwrap_or("")
	}
}

/// A single node lookup requested by a parameter or record field.
#[derive(Debug, Clone)]
pub struct Request {
	pub(crate) key: Key,
	pub(crate) group: Option<Key>,
	pub(crate) type_name: &'static str,
	pub(crate) optional: bool,
	pub(crate) owner: Option<&'static str>,
}

impl Request {
	/// Exact lookup of the node for `T`.
	pub fn single<T: ?Sized + 'static>(tag: Tag<'_>) -> Self {
		Self {
			key: Key::node_of::<T>(tag.name()),
			group: None,
			type_name: type_name::<T>(),
			optional: false,
			owner: None,
		}
	}

	/// Collection lookup: the exact node for `C` first, falling back to the
	/// group registered for the element interface `E`.
	pub fn collection<C: 'static, E: ?Sized + 'static>(tag: Tag<'_>) -> Self {
		Self {
			key: Key::node_of::<C>(tag.name()),
			group: Some(Key::group_of::<E>()),
			type_name: type_name::<C>(),
			optional: false,
			owner: None,
		}
	}

	/// Marks the lookup optional: absence is not an error.
	pub fn optional(mut self) -> Self {
		self.optional = true;
		self
	}

	/// Attributes the lookup to the record that performs it, for error
	/// reporting. Keeps an already-set owner (the innermost record wins).
	pub fn owned_by(mut self, owner: &'static str) -> Self {
		self.owner.get_or_insert(owner);
		self
	}

	/// Display name of the requested type.
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Whether absence of this lookup is tolerated.
	pub fn is_optional(&self) -> bool {
		self.optional
	}
}

/// Registry access handed to [`Dependency::resolve`].
pub struct ResolveContext<'a> {
	pub(crate) registry: &'a mut Registry,
}

impl<'a> ResolveContext<'a> {
	pub(crate) fn new(registry: &'a mut Registry) -> Self {
		Self { registry }
	}

	/// Resolves a dependency with the default (unnamed) tag.
	pub fn resolve<D: Dependency>(&mut self) -> DiResult<D> {
		D::resolve(self, Tag::default())
	}

	/// Resolves a dependency under a name qualifier.
	pub fn resolve_tagged<D: Dependency>(&mut self, tag: Tag<'_>) -> DiResult<D> {
		D::resolve(self, tag)
	}
}

/// A value the container knows how to look up and extract.
pub trait Dependency: Sized + Send + Sync + 'static {
	/// Node lookups this dependency performs, for graph preparation. Never
	/// builds anything.
	fn requests(tag: Tag<'_>) -> Vec<Request>;

	/// Pulls the value out of the registry, building nodes as needed.
	fn resolve(cx: &mut ResolveContext<'_>, tag: Tag<'_>) -> DiResult<Self>;
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for Arc<T> {
	fn requests(tag: Tag<'_>) -> Vec<Request> {
		vec![Request::single::<T>(tag)]
	}

	fn resolve(cx: &mut ResolveContext<'_>, tag: Tag<'_>) -> DiResult<Self> {
		let built = cx.registry.build_request(&Request::single::<T>(tag))?;
		extract::<Self>(&built)
	}
}

impl<D: Dependency> Dependency for Option<D> {
	fn requests(tag: Tag<'_>) -> Vec<Request> {
		D::requests(tag).into_iter().map(Request::optional).collect()
	}

	fn resolve(cx: &mut ResolveContext<'_>, tag: Tag<'_>) -> DiResult<Self> {
		match D::resolve(cx, tag) {
			Ok(value) => Ok(Some(value)),
			Err(DiError::TypeNotFound { .. } | DiError::DependencyNotFound { .. }) => Ok(None),
			Err(err) => Err(err),
		}
	}
}

impl<I: ?Sized + Send + Sync + 'static> Dependency for Vec<Arc<I>> {
	fn requests(tag: Tag<'_>) -> Vec<Request> {
		vec![Request::collection::<Self, I>(tag)]
	}

	fn resolve(cx: &mut ResolveContext<'_>, tag: Tag<'_>) -> DiResult<Self> {
		let built = cx.registry.build_request(&Request::collection::<Self, I>(tag))?;
		extract::<Arc<Self>>(&built).map(|collection| (*collection).clone())
	}
}

/// Clones the typed payload out of a built value. The payload of every
/// node is `Arc<R>` for its result type `R`, unsized `R` included.
pub(crate) fn extract<T: Clone + 'static>(built: &Built) -> DiResult<T> {
	built
		.downcast_ref::<T>()
		.cloned()
		.ok_or_else(|| DiError::TypeMismatch {
			type_name: type_name::<T>().to_string(),
		})
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Leaf;
	trait Port: Send + Sync {}

	#[test]
	fn single_request_uses_tag_name() {
		let unnamed = Request::single::<Leaf>(Tag::default());
		let named = Request::single::<Leaf>(Tag::named("primary"));
		assert_ne!(unnamed.key, named.key);
		assert!(unnamed.group.is_none());
		assert!(!unnamed.is_optional());
	}

	#[test]
	fn collection_request_carries_group_fallback() {
		let request = Request::collection::<Vec<Arc<dyn Port>>, dyn Port>(Tag::default());
		assert_eq!(request.group.as_ref(), Some(&Key::group_of::<dyn Port>()));
	}

	#[test]
	fn option_marks_requests_optional() {
		let requests = <Option<Arc<Leaf>>>::requests(Tag::default());
		assert_eq!(requests.len(), 1);
		assert!(requests[0].is_optional());
	}

	#[test]
	fn owner_is_not_overwritten() {
		let request = Request::single::<Leaf>(Tag::default())
			.owned_by("inner")
			.owned_by("outer");
		assert_eq!(request.owner, Some("inner"));
	}
}
