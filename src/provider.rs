//! Constructor and invocation signatures accepted by the container.
//!
//! A constructor is any `Fn(D1, …, Dn) -> R` (up to eight parameters) whose
//! parameter types implement [`Dependency`]. The three non-plain result
//! shapes are selected by wrapping the closure in an adapter, keeping the
//! shapes structurally disjoint:
//!
//! | shape | registration |
//! |---|---|
//! | `Fn(…) -> R` | `provide(ctor)` |
//! | `Fn(…) -> Result<R, E>` | `provide(fallible(ctor))` |
//! | `Fn(…) -> (R, impl FnOnce())` | `provide(with_cleanup(ctor))` |
//! | `Fn(…) -> Result<(R, impl FnOnce()), E>` | `provide(fallible_with_cleanup(ctor))` |
//!
//! An invocation is any `Fn(D1, …, Dn)` returning `()` or `Result<(), E>`;
//! anything else is rejected by the type system.

use crate::dependency::{Dependency, Request, ResolveContext, Tag};
use crate::error::{BoxError, DiError, DiResult};
use crate::node::CleanupFn;

/// A function the container can register as a node for its result type.
///
/// Implemented for closures over [`Dependency`] parameters; see the module
/// docs for the accepted result shapes. `Deps` is inferred from the closure
/// signature.
pub trait Constructor<Deps>: Send + Sync + 'static {
	/// The type this constructor provides.
	type Output: Send + Sync + 'static;

	/// Whether the signature admits a cleanup thunk. Checked against the
	/// prototype option at registration.
	const HAS_CLEANUP: bool;

	/// Node lookups of the parameter list, in parameter order.
	fn requests() -> Vec<Request>;

	/// Resolves the parameters and runs the constructor. A constructor
	/// error is wrapped once with `label`.
	fn construct(
		&self,
		cx: &mut ResolveContext<'_>,
		label: &str,
	) -> DiResult<(Self::Output, Option<CleanupFn>)>;
}

/// Marks a constructor returning `Result<R, E>`.
pub struct Fallible<F>(F);

/// Marks a constructor returning `(R, cleanup)`.
pub struct WithCleanup<F>(F);

/// Marks a constructor returning `Result<(R, cleanup), E>`.
pub struct FallibleWithCleanup<F>(F);

/// Registers a constructor that may fail: `Fn(…) -> Result<R, E>`.
pub fn fallible<F>(ctor: F) -> Fallible<F> {
	Fallible(ctor)
}

/// Registers a constructor returning its value together with a cleanup
/// thunk: `Fn(…) -> (R, impl FnOnce())`.
pub fn with_cleanup<F>(ctor: F) -> WithCleanup<F> {
	WithCleanup(ctor)
}

/// Combines [`fallible`] and [`with_cleanup`]:
/// `Fn(…) -> Result<(R, impl FnOnce()), E>`. When the constructor fails the
/// cleanup is discarded, not recorded.
pub fn fallible_with_cleanup<F>(ctor: F) -> FallibleWithCleanup<F> {
	FallibleWithCleanup(ctor)
}

/// Result shape of an invocation: `()` or `Result<(), E>`.
pub trait InvokeOutcome {
	/// Normalizes the outcome.
	fn into_result(self) -> Result<(), BoxError>;
}

impl InvokeOutcome for () {
	fn into_result(self) -> Result<(), BoxError> {
		Ok(())
	}
}

impl<E: Into<BoxError>> InvokeOutcome for Result<(), E> {
	fn into_result(self) -> Result<(), BoxError> {
		self.map_err(Into::into)
	}
}

/// A function the container can call once with resolved dependencies.
pub trait Invocation<Deps> {
	/// Node lookups of the parameter list, in parameter order.
	fn requests() -> Vec<Request>;

	/// Resolves the parameters and calls the function. The function's own
	/// error passes through unchanged.
	fn invoke(self, cx: &mut ResolveContext<'_>) -> DiResult<()>;
}

macro_rules! impl_callables {
	($($dep:ident),*) => {
		impl<Fun, $($dep,)* R> Constructor<($($dep,)*)> for Fun
		where
			Fun: Fn($($dep),*) -> R + Send + Sync + 'static,
			$($dep: Dependency,)*
			R: Send + Sync + 'static,
		{
			type Output = R;
			const HAS_CLEANUP: bool = false;

			#[allow(unused_mut)]
			fn requests() -> Vec<Request> {
				let mut requests = Vec::new();
				$(requests.extend($dep::requests(Tag::default()));)*
				requests
			}

			#[allow(non_snake_case, unused_variables)]
			fn construct(
				&self,
				cx: &mut ResolveContext<'_>,
				_label: &str,
			) -> DiResult<(R, Option<CleanupFn>)> {
				$(let $dep = $dep::resolve(cx, Tag::default())?;)*
				Ok(((self)($($dep),*), None))
			}
		}

		impl<Fun, $($dep,)* R, E> Constructor<($($dep,)*)> for Fallible<Fun>
		where
			Fun: Fn($($dep),*) -> Result<R, E> + Send + Sync + 'static,
			$($dep: Dependency,)*
			R: Send + Sync + 'static,
			E: Into<BoxError>,
		{
			type Output = R;
			const HAS_CLEANUP: bool = false;

			#[allow(unused_mut)]
			fn requests() -> Vec<Request> {
				let mut requests = Vec::new();
				$(requests.extend($dep::requests(Tag::default()));)*
				requests
			}

			#[allow(non_snake_case, unused_variables)]
			fn construct(
				&self,
				cx: &mut ResolveContext<'_>,
				label: &str,
			) -> DiResult<(R, Option<CleanupFn>)> {
				$(let $dep = $dep::resolve(cx, Tag::default())?;)*
				match (self.0)($($dep),*) {
					Ok(value) => Ok((value, None)),
					Err(err) => Err(DiError::Build {
						label: label.to_string(),
						source: err.into(),
					}),
				}
			}
		}

		impl<Fun, $($dep,)* R, C> Constructor<($($dep,)*)> for WithCleanup<Fun>
		where
			Fun: Fn($($dep),*) -> (R, C) + Send + Sync + 'static,
			$($dep: Dependency,)*
			R: Send + Sync + 'static,
			C: FnOnce() + Send + 'static,
		{
			type Output = R;
			const HAS_CLEANUP: bool = true;

			#[allow(unused_mut)]
			fn requests() -> Vec<Request> {
				let mut requests = Vec::new();
				$(requests.extend($dep::requests(Tag::default()));)*
				requests
			}

			#[allow(non_snake_case, unused_variables)]
			fn construct(
				&self,
				cx: &mut ResolveContext<'_>,
				_label: &str,
			) -> DiResult<(R, Option<CleanupFn>)> {
				$(let $dep = $dep::resolve(cx, Tag::default())?;)*
				let (value, cleanup) = (self.0)($($dep),*);
				Ok((value, Some(Box::new(cleanup))))
			}
		}

		impl<Fun, $($dep,)* R, C, E> Constructor<($($dep,)*)> for FallibleWithCleanup<Fun>
		where
			Fun: Fn($($dep),*) -> Result<(R, C), E> + Send + Sync + 'static,
			$($dep: Dependency,)*
			R: Send + Sync + 'static,
			C: FnOnce() + Send + 'static,
			E: Into<BoxError>,
		{
			type Output = R;
			const HAS_CLEANUP: bool = true;

			#[allow(unused_mut)]
			fn requests() -> Vec<Request> {
				let mut requests = Vec::new();
				$(requests.extend($dep::requests(Tag::default()));)*
				requests
			}

			#[allow(non_snake_case, unused_variables)]
			fn construct(
				&self,
				cx: &mut ResolveContext<'_>,
				label: &str,
			) -> DiResult<(R, Option<CleanupFn>)> {
				$(let $dep = $dep::resolve(cx, Tag::default())?;)*
				match (self.0)($($dep),*) {
					Ok((value, cleanup)) => Ok((value, Some(Box::new(cleanup)))),
					Err(err) => Err(DiError::Build {
						label: label.to_string(),
						source: err.into(),
					}),
				}
			}
		}

		impl<Fun, $($dep,)* O> Invocation<($($dep,)*)> for Fun
		where
			Fun: FnOnce($($dep),*) -> O,
			$($dep: Dependency,)*
			O: InvokeOutcome,
		{
			#[allow(unused_mut)]
			fn requests() -> Vec<Request> {
				let mut requests = Vec::new();
				$(requests.extend($dep::requests(Tag::default()));)*
				requests
			}

			#[allow(non_snake_case, unused_variables)]
			fn invoke(self, cx: &mut ResolveContext<'_>) -> DiResult<()> {
				$(let $dep = $dep::resolve(cx, Tag::default())?;)*
				(self)($($dep),*)
					.into_result()
					.map_err(|source| DiError::Invocation { source })
			}
		}
	};
}

impl_callables!();
impl_callables!(D1);
impl_callables!(D1, D2);
impl_callables!(D1, D2, D3);
impl_callables!(D1, D2, D3, D4);
impl_callables!(D1, D2, D3, D4, D5);
impl_callables!(D1, D2, D3, D4, D5, D6);
impl_callables!(D1, D2, D3, D4, D5, D6, D7);
impl_callables!(D1, D2, D3, D4, D5, D6, D7, D8);
