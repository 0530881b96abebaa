//! The container: registration surface, resolution, invocation and cleanup.

use std::any::{type_name, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use crate::dependency::{extract, Dependency, ResolveContext, Tag};
use crate::error::{BoxError, DiError, DiResult};
use crate::graph::prepare;
use crate::node::{
	label_for, Built, Cast, CleanupFn, Collect, Compiler, GroupMember, Key, Node, Tags,
};
use crate::provider::{Constructor, Invocation};
use crate::registry::Registry;

/// Registration options for a provider of `T`: a name qualifier, interface
/// views, the prototype flag and free-form tags.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use wirebox::{Container, ProvideOptions};
///
/// trait Handler: Send + Sync {}
///
/// #[derive(Default)]
/// struct ServeMux;
/// impl Handler for ServeMux {}
///
/// # fn main() -> wirebox::DiResult<()> {
/// let container = Container::new();
/// container.provide_with(
/// 	|| ServeMux::default(),
/// 	ProvideOptions::new()
/// 		.named("primary")
/// 		.implements::<dyn Handler>(|mux| mux),
/// )?;
///
/// let handler: Arc<dyn Handler> = container.resolve_named("primary")?;
/// # let _ = handler;
/// # Ok(())
/// # }
/// ```
pub struct ProvideOptions<T> {
	name: Option<String>,
	prototype: bool,
	tags: Vec<(String, String)>,
	interfaces: Vec<InterfaceBinding>,
	_provides: PhantomData<fn() -> T>,
}

pub(crate) struct InterfaceBinding {
	interface_id: TypeId,
	interface_name: &'static str,
	group_key: Key,
	cast: Cast,
	collect: Collect,
}

impl<T: Send + Sync + 'static> ProvideOptions<T> {
	/// Empty options: unnamed, memoized, no interfaces, no tags.
	pub fn new() -> Self {
		Self {
			name: None,
			prototype: false,
			tags: Vec::new(),
			interfaces: Vec::new(),
			_provides: PhantomData,
		}
	}

	/// Qualifies the node by name. Named nodes are only found by
	/// [`Container::resolve_named`] and name-tagged record fields.
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Rebuilds the value on every resolution instead of memoizing it.
	/// Prototype providers cannot have cleanups.
	pub fn prototype(mut self) -> Self {
		self.prototype = true;
		self
	}

	/// Attaches a free-form tag, visible to [`Container::iterate`]
	/// callbacks.
	pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.tags.push((key.into(), value.into()));
		self
	}

	/// Additionally registers the node under the interface `I`, which the
	/// provided type implements. The coercion is captured at the call site:
	///
	/// ```
	/// # use std::sync::Arc;
	/// # use wirebox::ProvideOptions;
	/// # trait Closer: Send + Sync {}
	/// # struct File;
	/// # impl Closer for File {}
	/// let options = ProvideOptions::<File>::new().implements::<dyn Closer>(|file| file);
	/// ```
	///
	/// The first provider registered under `I` is resolvable as
	/// `Arc<dyn I>`; a second one makes the scalar lookup ambiguous while
	/// `Vec<Arc<dyn I>>` keeps collecting every implementation in
	/// registration order.
	pub fn implements<I>(mut self, cast: fn(Arc<T>) -> Arc<I>) -> Self
	where
		I: ?Sized + Send + Sync + 'static,
	{
		let cast_built: Cast = Arc::new(move |built: &Built| {
			let concrete = extract::<Arc<T>>(built)?;
			Ok(Arc::new(cast(concrete)) as Built)
		});
		let collect: Collect = Arc::new(|views: Vec<Built>| {
			let mut group = Vec::with_capacity(views.len());
			for view in &views {
				group.push(extract::<Arc<I>>(view)?);
			}
			Ok(Arc::new(Arc::new(group)) as Built)
		});
		self.interfaces.push(InterfaceBinding {
			interface_id: TypeId::of::<I>(),
			interface_name: type_name::<I>(),
			group_key: Key::group_of::<I>(),
			cast: cast_built,
			collect,
		});
		self
	}
}

impl<T: Send + Sync + 'static> Default for ProvideOptions<T> {
	fn default() -> Self {
		Self::new()
	}
}

/// Runtime dependency-injection container.
///
/// Nodes are registered with [`provide`](Container::provide) and friends,
/// and materialized lazily on first [`resolve`](Container::resolve).
/// Resolution is single-threaded cooperative: operations take the internal
/// lock for their full duration and must not be re-entered from user
/// constructors. Constructors receive their dependencies as parameters
/// instead of calling back into the container.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use wirebox::Container;
///
/// #[derive(Default)]
/// struct ServeMux;
///
/// struct Server {
/// 	mux: Arc<ServeMux>,
/// }
///
/// # fn main() -> wirebox::DiResult<()> {
/// let container = Container::new();
/// container.provide(|| ServeMux::default())?;
/// container.provide(|mux: Arc<ServeMux>| Server { mux })?;
///
/// let server: Arc<Server> = container.resolve()?;
/// let mux: Arc<ServeMux> = container.resolve()?;
/// assert!(Arc::ptr_eq(&server.mux, &mux));
/// # Ok(())
/// # }
/// ```
pub struct Container {
	registry: RwLock<Registry>,
}

impl Container {
	/// Creates an empty container. The container provides itself: resolving
	/// `Arc<Container>` yields this same instance.
	pub fn new() -> Arc<Self> {
		let container = Arc::new_cyclic(|weak: &Weak<Container>| {
			let mut registry = Registry::new();
			registry.register_container(weak.clone());
			Container {
				registry: RwLock::new(registry),
			}
		});
		debug!("container created");
		container
	}

	/// Registers a constructor for its result type. The constructor runs
	/// lazily, on first resolution of the type.
	///
	/// Fallible and cleanup-producing constructors are registered by
	/// wrapping them in [`fallible`](crate::fallible),
	/// [`with_cleanup`](crate::with_cleanup) or
	/// [`fallible_with_cleanup`](crate::fallible_with_cleanup).
	pub fn provide<Deps, F>(&self, ctor: F) -> DiResult<()>
	where
		F: Constructor<Deps>,
	{
		self.provide_with(ctor, ProvideOptions::new())
	}

	/// Registers a constructor with options.
	pub fn provide_with<Deps, F>(
		&self,
		ctor: F,
		options: ProvideOptions<<F as Constructor<Deps>>::Output>,
	) -> DiResult<()>
	where
		F: Constructor<Deps>,
	{
		let type_name = type_name::<F::Output>();
		let name = options.name.clone().unwrap_or_default();
		if options.prototype && F::HAS_CLEANUP {
			return Err(DiError::PrototypeCleanup {
				label: label_for(type_name, &name),
			});
		}
		let build = Arc::new(
			move |cx: &mut ResolveContext<'_>,
			      label: &str|
			      -> DiResult<(Built, Option<CleanupFn>)> {
				let (value, cleanup) = ctor.construct(cx, label)?;
				Ok((Arc::new(Arc::new(value)) as Built, cleanup))
			},
		);
		let compiler = Compiler::Constructor {
			build,
			requests: F::requests(),
		};
		self.register_node::<F::Output>(type_name, compiler, options)
	}

	/// Registers a pre-built value as is. Value nodes never fail and have
	/// no cleanup.
	pub fn provide_value<T: Send + Sync + 'static>(&self, value: T) -> DiResult<()> {
		self.provide_value_with(value, ProvideOptions::new())
	}

	/// Registers a pre-built value with options.
	pub fn provide_value_with<T: Send + Sync + 'static>(
		&self,
		value: T,
		options: ProvideOptions<T>,
	) -> DiResult<()> {
		let compiler = Compiler::Value(Arc::new(Arc::new(value)) as Built);
		self.register_node::<T>(type_name::<T>(), compiler, options)
	}

	/// Registers an injectable record as a node of its own type, built by
	/// resolving its fields. Unlike plain structural resolution this
	/// memoizes the record, so `Arc<D>` resolutions are pointer-identical.
	pub fn provide_injectable<D: Dependency>(&self) -> DiResult<()> {
		self.provide_injectable_with::<D>(ProvideOptions::new())
	}

	/// Registers an injectable record with options.
	pub fn provide_injectable_with<D: Dependency>(
		&self,
		options: ProvideOptions<D>,
	) -> DiResult<()> {
		let build = Arc::new(
			move |cx: &mut ResolveContext<'_>,
			      _label: &str|
			      -> DiResult<(Built, Option<CleanupFn>)> {
				let value = D::resolve(cx, Tag::default())?;
				Ok((Arc::new(Arc::new(value)) as Built, None))
			},
		);
		let compiler = Compiler::Constructor {
			build,
			requests: D::requests(Tag::default()),
		};
		self.register_node::<D>(type_name::<D>(), compiler, options)
	}

	fn register_node<T: 'static>(
		&self,
		type_name: &'static str,
		compiler: Compiler,
		options: ProvideOptions<T>,
	) -> DiResult<()> {
		let name = options.name.unwrap_or_default();
		let mut tags = Tags::default();
		for (key, value) in options.tags {
			tags.insert(key, value);
		}
		if !name.is_empty() {
			tags.insert(Tags::NAME, name.clone());
		}
		let key = Key::node_of::<T>(&name);
		let node = Node {
			type_name,
			tags: tags.clone(),
			prototype: options.prototype,
			cache: None,
			compiler,
		};
		let mut registry = self.registry.write();
		registry.register(key.clone(), node)?;
		for binding in options.interfaces {
			let view = Node {
				type_name: binding.interface_name,
				tags: tags.clone(),
				prototype: options.prototype,
				cache: None,
				compiler: Compiler::InterfaceView {
					target: key.clone(),
					cast: binding.cast.clone(),
				},
			};
			registry.register_view(Key::from_id(binding.interface_id, &name), view);
			registry.register_group_member(
				binding.group_key,
				binding.interface_name,
				GroupMember {
					key: key.clone(),
					cast: binding.cast,
				},
				binding.collect,
			);
		}
		Ok(())
	}

	/// Resolves a dependency: `Arc<T>`, `Option<…>`, `Vec<Arc<dyn I>>` or
	/// an injectable record. The dependency graph is prepared (existence
	/// and cycle checks) before any constructor runs.
	pub fn resolve<D: Dependency>(&self) -> DiResult<D> {
		self.resolve_tagged(Tag::default())
	}

	/// Resolves a dependency registered under a name.
	pub fn resolve_named<D: Dependency>(&self, name: &str) -> DiResult<D> {
		self.resolve_tagged(Tag::named(name))
	}

	fn resolve_tagged<D: Dependency>(&self, tag: Tag<'_>) -> DiResult<D> {
		let mut registry = self.registry.write();
		for request in D::requests(tag) {
			match registry.find_request(&request) {
				Ok(key) => prepare(&registry, &key)?,
				Err(DiError::TypeNotFound { .. }) if request.is_optional() => {}
				Err(DiError::TypeNotFound { type_name }) => {
					return Err(match request.owner {
						Some(owner) => DiError::DependencyNotFound {
							label: owner.to_string(),
							dependency: type_name,
						},
						None => DiError::TypeNotFound { type_name },
					});
				}
				Err(err) => return Err(err),
			}
		}
		D::resolve(&mut ResolveContext::new(&mut registry), tag)
	}

	/// Resolves the function's parameters and calls it. The function's own
	/// error is returned unchanged.
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use wirebox::Container;
	///
	/// #[derive(Default)]
	/// struct ServeMux;
	///
	/// # fn main() -> wirebox::DiResult<()> {
	/// let container = Container::new();
	/// container.provide(|| ServeMux::default())?;
	/// container.invoke(|mux: Arc<ServeMux>| {
	/// 	// wire the mux into the application
	/// 	# let _ = mux;
	/// })?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn invoke<Deps, F>(&self, invocation: F) -> DiResult<()>
	where
		F: Invocation<Deps>,
	{
		let mut registry = self.registry.write();
		for request in F::requests() {
			match registry.find_request(&request) {
				Ok(key) => prepare(&registry, &key)?,
				Err(DiError::TypeNotFound { .. }) if request.is_optional() => {}
				Err(err) => return Err(err),
			}
		}
		invocation.invoke(&mut ResolveContext::new(&mut registry))
	}

	/// Whether the dependency can be resolved, without building anything.
	/// Runs the same graph preparation as [`resolve`](Container::resolve),
	/// so a type whose graph is cyclic or missing a required dependency
	/// reports `false`.
	pub fn has<D: Dependency>(&self) -> bool {
		self.has_tagged::<D>(Tag::default())
	}

	/// [`has`](Container::has) under a name qualifier.
	pub fn has_named<D: Dependency>(&self, name: &str) -> bool {
		self.has_tagged::<D>(Tag::named(name))
	}

	fn has_tagged<D: Dependency>(&self, tag: Tag<'_>) -> bool {
		let registry = self.registry.read();
		D::requests(tag)
			.into_iter()
			.all(|request| match registry.find_request(&request) {
				Ok(key) => prepare(&registry, &key).is_ok(),
				Err(_) => request.is_optional(),
			})
	}

	/// Iterates the group registered for the interface `I`, in registration
	/// order. The callback receives each member's tags and a lazy loader;
	/// members are only built when their loader is called.
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use wirebox::{Container, ProvideOptions};
	///
	/// trait Closer: Send + Sync {}
	///
	/// #[derive(Default)]
	/// struct File;
	/// impl Closer for File {}
	///
	/// # fn main() -> wirebox::DiResult<()> {
	/// let container = Container::new();
	/// container.provide_with(
	/// 	|| File::default(),
	/// 	ProvideOptions::new().implements::<dyn Closer>(|file| file),
	/// )?;
	///
	/// let mut seen = 0;
	/// container.iterate::<dyn Closer, _>(|_tags, load| {
	/// 	let _closer: Arc<dyn Closer> = load()?;
	/// 	seen += 1;
	/// 	Ok(())
	/// })?;
	/// assert_eq!(seen, 1);
	/// # Ok(())
	/// # }
	/// ```
	pub fn iterate<I, F>(&self, mut visit: F) -> DiResult<()>
	where
		I: ?Sized + Send + Sync + 'static,
		F: FnMut(&Tags, &mut dyn FnMut() -> DiResult<Arc<I>>) -> Result<(), BoxError>,
	{
		let mut registry = self.registry.write();
		let group_key = Key::group_of::<I>();
		let (group_label, members) = match registry.node(&group_key) {
			Some(node) => match &node.compiler {
				Compiler::Group { members, .. } => (node.label(), members.clone()),
				_ => {
					return Err(DiError::TypeNotFound {
						type_name: type_name::<I>().to_string(),
					});
				}
			},
			None => {
				return Err(DiError::TypeNotFound {
					type_name: type_name::<I>().to_string(),
				});
			}
		};
		prepare(&registry, &group_key)?;
		for (index, member) in members.into_iter().enumerate() {
			let tags = registry
				.node(&member.key)
				.map(|node| node.tags.clone())
				.unwrap_or_default();
			let mut load = || -> DiResult<Arc<I>> {
				let concrete = registry.build(&member.key)?;
				let view = (member.cast)(&concrete)?;
				extract::<Arc<I>>(&view)
			};
			visit(&tags, &mut load).map_err(|source| DiError::IterationFailed {
				group: group_label.clone(),
				index,
				source,
			})?;
		}
		Ok(())
	}

	/// Runs recorded cleanups in reverse materialization order. The
	/// container is spent afterwards; further resolutions are unsupported.
	pub fn cleanup(&self) {
		let cleanups = self.registry.write().take_cleanups();
		debug!(count = cleanups.len(), "running cleanups");
		for cleanup in cleanups.into_iter().rev() {
			cleanup();
		}
	}
}

impl fmt::Debug for Container {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Container")
			.field("nodes", &self.registry.read().len())
			.finish_non_exhaustive()
	}
}
