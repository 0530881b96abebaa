//! Schema nodes: keys, tags and the compiler variants that build values.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use crate::container::Container;
use crate::dependency::{Request, ResolveContext};
use crate::error::DiResult;

/// Type-erased built value.
///
/// The payload is `Arc<T>` for concrete nodes, `Arc<dyn I>` for interface
/// views and `Vec<Arc<dyn I>>` for groups, so sized and unsized targets
/// extract uniformly via `downcast_ref::<Arc<T>>()`.
pub(crate) type Built = Arc<dyn Any + Send + Sync>;

/// Cleanup thunk returned alongside a constructed value; invoked by
/// [`Container::cleanup`](crate::Container::cleanup) in reverse
/// materialization order.
pub type CleanupFn = Box<dyn FnOnce() + Send>;

/// Turns a concrete built value into its interface view.
pub(crate) type Cast = Arc<dyn Fn(&Built) -> DiResult<Built> + Send + Sync>;

/// Assembles group member values into the typed collection.
pub(crate) type Collect = Arc<dyn Fn(Vec<Built>) -> DiResult<Built> + Send + Sync>;

/// Builds a constructor node's value, resolving its dependencies through
/// the registry. The second argument is the node label used to wrap
/// constructor errors.
pub(crate) type BuildClosure =
	Arc<dyn Fn(&mut ResolveContext<'_>, &str) -> DiResult<(Built, Option<CleanupFn>)> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum KeyKind {
	Node,
	Group,
}

/// Registry key: `(type, name)` plus the node/group discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Key {
	type_id: TypeId,
	name: Box<str>,
	kind: KeyKind,
}

impl Key {
	pub(crate) fn node_of<T: ?Sized + 'static>(name: &str) -> Self {
		Self {
			type_id: TypeId::of::<T>(),
			name: name.into(),
			kind: KeyKind::Node,
		}
	}

	pub(crate) fn from_id(type_id: TypeId, name: &str) -> Self {
		Self {
			type_id,
			name: name.into(),
			kind: KeyKind::Node,
		}
	}

	/// Group keys are unnamed: named interface views still join the unnamed
	/// group for their interface.
	pub(crate) fn group_of<T: ?Sized + 'static>() -> Self {
		Self {
			type_id: TypeId::of::<T>(),
			name: Box::from(""),
			kind: KeyKind::Group,
		}
	}
}

/// String metadata attached to a node.
///
/// The key `"name"` is reserved: it qualifies lookups of the node. All other
/// tags pass through unchanged and are visible to
/// [`Container::iterate`](crate::Container::iterate) callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
	/// The reserved tag key holding the node's name qualifier.
	pub const NAME: &'static str = "name";

	/// Looks up a tag value.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(String::as_str)
	}

	/// The node's name qualifier; empty for unnamed nodes.
	pub fn name(&self) -> &str {
		self.get(Self::NAME).unwrap_or("")
	}

	/// Iterates tags in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Number of tags, the reserved `name` included.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether no tags are set.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub(crate) fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.0.insert(key.into(), value.into());
	}
}

/// A group member: the concrete node to build plus the cast into the
/// group's element type. Members reference concretes by key, never by the
/// interface-view node, so stub replacement does not affect the group.
#[derive(Clone)]
pub(crate) struct GroupMember {
	pub(crate) key: Key,
	pub(crate) cast: Cast,
}

/// Build strategy of a node.
pub(crate) enum Compiler {
	/// Wraps a user constructor; `requests` is the static dependency list
	/// used by the graph walk.
	Constructor {
		build: BuildClosure,
		requests: Vec<Request>,
	},
	/// A pre-built value; never fails, never has cleanup or dependencies.
	Value(Built),
	/// Re-keys a concrete node under an interface it implements; shares the
	/// concrete's cached value.
	InterfaceView { target: Key, cast: Cast },
	/// Ordered collection of every member registered under one interface.
	/// Materializes fresh on every build; members memoize individually.
	Group {
		members: Vec<GroupMember>,
		collect: Collect,
	},
	/// Installed when a second concrete claims an interface key; building
	/// through it fails deterministically.
	Stub,
	/// Self-provision of the container.
	ContainerRef(Weak<Container>),
}

/// A single buildable entity in the registry.
pub(crate) struct Node {
	pub(crate) type_name: &'static str,
	pub(crate) tags: Tags,
	pub(crate) prototype: bool,
	pub(crate) cache: Option<Built>,
	pub(crate) compiler: Compiler,
}

impl Node {
	pub(crate) fn label(&self) -> String {
		label_for(self.type_name, self.tags.name())
	}
}

/// Node label used in error messages: `type` or `type[name]`.
pub(crate) fn label_for(type_name: &str, name: &str) -> String {
	if name.is_empty() {
		type_name.to_string()
	} else {
		format!("{type_name}[{name}]")
	}
}
