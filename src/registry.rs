//! The schema: node records, group membership and the cleanup list.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::container::Container;
use crate::dependency::{Request, ResolveContext};
use crate::error::{DiError, DiResult};
use crate::node::{
	BuildClosure, Built, Cast, CleanupFn, Collect, Compiler, GroupMember, Key, Node, Tags,
};

/// Sole owner of node records, cached values and the cleanup list.
/// Interface views and groups reference other nodes by key, never by
/// pointer, so shared structure never turns into shared ownership.
pub(crate) struct Registry {
	nodes: HashMap<Key, Node>,
	// Mutex-wrapped so cleanup thunks only need Send, not Sync.
	cleanups: Mutex<Vec<CleanupFn>>,
}

impl Registry {
	pub(crate) fn new() -> Self {
		Self {
			nodes: HashMap::new(),
			cleanups: Mutex::new(Vec::new()),
		}
	}

	pub(crate) fn node(&self, key: &Key) -> Option<&Node> {
		self.nodes.get(key)
	}

	pub(crate) fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Registers the container's own node. Runs before any user
	/// registration, so the key cannot be taken.
	pub(crate) fn register_container(&mut self, container: Weak<Container>) {
		let node = Node {
			type_name: std::any::type_name::<Container>(),
			tags: Tags::default(),
			prototype: false,
			cache: None,
			compiler: Compiler::ContainerRef(container),
		};
		self.nodes.insert(Key::node_of::<Container>(""), node);
	}

	/// Inserts a constructor or value node. At most one may exist per
	/// `(type, name)` key.
	pub(crate) fn register(&mut self, key: Key, node: Node) -> DiResult<()> {
		if self.nodes.contains_key(&key) {
			return Err(DiError::AlreadyExists { label: node.label() });
		}
		debug!(node = %node.label(), "registered");
		self.nodes.insert(key, node);
		Ok(())
	}

	/// Inserts an interface view. A second non-stub claim on the same
	/// `(interface, name)` key replaces the view with a stub; the concrete
	/// originals remain reachable through the group.
	pub(crate) fn register_view(&mut self, key: Key, view: Node) {
		match self.nodes.get(&key) {
			None => {
				debug!(interface = %view.label(), "registered interface view");
				self.nodes.insert(key, view);
			}
			Some(existing) if matches!(existing.compiler, Compiler::Stub) => {}
			Some(_) => {
				debug!(interface = view.type_name, "second implementation, installing stub");
				let stub = Node {
					type_name: view.type_name,
					tags: view.tags,
					prototype: false,
					cache: None,
					compiler: Compiler::Stub,
				};
				self.nodes.insert(key, stub);
			}
		}
	}

	/// Appends a member to the interface's group, creating the group node
	/// on first use. Membership is append-only in registration order.
	pub(crate) fn register_group_member(
		&mut self,
		key: Key,
		interface_name: &'static str,
		member: GroupMember,
		collect: Collect,
	) {
		match self.nodes.get_mut(&key) {
			Some(node) => {
				if let Compiler::Group { members, .. } = &mut node.compiler {
					members.push(member);
				}
			}
			None => {
				self.nodes.insert(
					key,
					Node {
						type_name: interface_name,
						tags: Tags::default(),
						prototype: false,
						cache: None,
						compiler: Compiler::Group {
							members: vec![member],
							collect,
						},
					},
				);
			}
		}
	}

	/// Exact lookup by the request's `(type, name)` key, falling back to
	/// the group node for collection requests. Hitting a stub fails with
	/// the ambiguity error.
	pub(crate) fn find_request(&self, request: &Request) -> DiResult<Key> {
		if let Some(node) = self.nodes.get(&request.key) {
			if matches!(node.compiler, Compiler::Stub) {
				return Err(DiError::SeveralImplementations {
					interface: node.type_name.to_string(),
				});
			}
			return Ok(request.key.clone());
		}
		if let Some(group) = &request.group {
			if self.nodes.contains_key(group) {
				return Ok(group.clone());
			}
		}
		Err(DiError::TypeNotFound {
			type_name: request.type_name.to_string(),
		})
	}

	pub(crate) fn build_request(&mut self, request: &Request) -> DiResult<Built> {
		let key = self.find_request(request)?;
		self.build(&key)
	}

	/// Materializes the node's value, pulling dependencies as needed.
	/// Memoization lives here; prototype nodes skip the cache write and
	/// rebuild on every call.
	pub(crate) fn build(&mut self, key: &Key) -> DiResult<Built> {
		enum Plan {
			Ctor(BuildClosure),
			Value(Built),
			View { target: Key, cast: Cast },
			Group { members: Vec<GroupMember>, collect: Collect },
			Stub(&'static str),
			ContainerRef(Weak<Container>),
		}

		let (label, prototype, plan) = {
			let Some(node) = self.nodes.get(key) else {
				return Err(DiError::TypeNotFound {
					type_name: "<unregistered node>".to_string(),
				});
			};
			if !node.prototype {
				if let Some(cached) = &node.cache {
					trace!(node = %node.label(), "cache hit");
					return Ok(cached.clone());
				}
			}
			let plan = match &node.compiler {
				Compiler::Constructor { build, .. } => Plan::Ctor(build.clone()),
				Compiler::Value(value) => Plan::Value(value.clone()),
				Compiler::InterfaceView { target, cast } => Plan::View {
					target: target.clone(),
					cast: cast.clone(),
				},
				Compiler::Group { members, collect } => Plan::Group {
					members: members.clone(),
					collect: collect.clone(),
				},
				Compiler::Stub => Plan::Stub(node.type_name),
				Compiler::ContainerRef(weak) => Plan::ContainerRef(weak.clone()),
			};
			(node.label(), node.prototype, plan)
		};

		let built = match plan {
			Plan::Value(value) => value,
			Plan::Stub(interface) => {
				return Err(DiError::SeveralImplementations {
					interface: interface.to_string(),
				});
			}
			Plan::ContainerRef(weak) => {
				let container = weak.upgrade().ok_or(DiError::ContainerDropped)?;
				// Not cached: a cached self-reference would keep the
				// container alive forever.
				return Ok(Arc::new(container) as Built);
			}
			Plan::Ctor(build) => {
				trace!(node = %label, "building");
				let (value, cleanup) = build(&mut ResolveContext::new(self), &label)?;
				if let Some(cleanup) = cleanup {
					self.cleanups.lock().push(cleanup);
				}
				value
			}
			Plan::View { target, cast } => {
				let concrete = self.build(&target)?;
				cast(&concrete)?
			}
			Plan::Group { members, collect } => {
				let mut values = Vec::with_capacity(members.len());
				for member in &members {
					let concrete = self.build(&member.key)?;
					values.push((member.cast)(&concrete)?);
				}
				// Not cached: members memoize themselves, and a cached
				// collection would freeze prototype members.
				return collect(values);
			}
		};

		if !prototype {
			if let Some(node) = self.nodes.get_mut(key) {
				node.cache = Some(built.clone());
			}
		}
		Ok(built)
	}

	/// Hands out the recorded cleanups in materialization order; the
	/// container drains them in reverse.
	pub(crate) fn take_cleanups(&mut self) -> Vec<CleanupFn> {
		std::mem::take(&mut *self.cleanups.lock())
	}
}
