//! Structural injection of record types; the exported surface is the
//! `injectable!` macro.

/// Declares an injectable record: a struct implementing
/// [`Dependency`](crate::Dependency) by resolving each field from the
/// container.
///
/// The record is never registered as a node by itself: wherever it appears
/// (as a constructor parameter, an invocation parameter or a direct
/// `resolve` target) its fields are looked up inline, recursively for
/// nested records.
///
/// Field grammar:
///
/// - a plain field of type `Arc<T>` is a required unnamed lookup;
/// - `#[inject(name = "…")]` qualifies the field's lookup by name;
/// - `Option<…>` fields are optional: absence leaves them `None`;
/// - `Vec<Arc<dyn I>>` fields collect the group registered for `I`;
/// - `#[inject(default)]` fields are not injected at all and are filled
///   with `Default::default()`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use wirebox::{injectable, Container};
///
/// #[derive(Default)]
/// struct ServeMux;
///
/// injectable! {
/// 	struct ServerParts {
/// 		mux: Arc<ServeMux>,
/// 		#[inject(name = "admin")]
/// 		admin: Option<Arc<ServeMux>>,
/// 	}
/// }
///
/// # fn main() -> wirebox::DiResult<()> {
/// let container = Container::new();
/// container.provide(|| ServeMux::default())?;
///
/// let parts: ServerParts = container.resolve()?;
/// assert!(parts.admin.is_none());
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! injectable {
	(
		$(#[$meta:meta])*
		$vis:vis struct $name:ident {
			$(
				$(#[inject($($field_mod:tt)+)])?
				$field_vis:vis $field:ident : $field_ty:ty
			),+ $(,)?
		}
	) => {
		$(#[$meta])*
		$vis struct $name {
			$($field_vis $field: $field_ty,)+
		}

		impl $crate::Dependency for $name {
			#[allow(unused_mut)]
			fn requests(_tag: $crate::Tag<'_>) -> ::std::vec::Vec<$crate::Request> {
				let mut requests = ::std::vec::Vec::new();
				$($crate::__injectable_requests!(requests, $field_ty, $($($field_mod)+)?);)+
				requests
					.into_iter()
					.map(|request| request.owned_by(::std::any::type_name::<Self>()))
					.collect()
			}

			fn resolve(
				cx: &mut $crate::ResolveContext<'_>,
				_tag: $crate::Tag<'_>,
			) -> $crate::DiResult<Self> {
				::std::result::Result::Ok(Self {
					$($field: $crate::__injectable_field!(cx, $field_ty, $($($field_mod)+)?),)+
				})
			}
		}
	};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __injectable_requests {
	($requests:ident, $field_ty:ty,) => {
		$requests.extend(<$field_ty as $crate::Dependency>::requests($crate::Tag::default()));
	};
	($requests:ident, $field_ty:ty, name = $name:literal) => {
		$requests.extend(<$field_ty as $crate::Dependency>::requests($crate::Tag::named($name)));
	};
	($requests:ident, $field_ty:ty, default) => {};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __injectable_field {
	($cx:ident, $field_ty:ty,) => {
		<$field_ty as $crate::Dependency>::resolve($cx, $crate::Tag::default())?
	};
	($cx:ident, $field_ty:ty, name = $name:literal) => {
		<$field_ty as $crate::Dependency>::resolve($cx, $crate::Tag::named($name))?
	};
	($cx:ident, $field_ty:ty, default) => {
		::std::default::Default::default()
	};
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use crate::{Container, Dependency, Tag};

	#[derive(Default)]
	struct Leaf;

	injectable! {
		struct Record {
			leaf: Arc<Leaf>,
			#[inject(name = "backup")]
			backup: Option<Arc<Leaf>>,
			#[inject(default)]
			note: String,
		}
	}

	#[test]
	fn requests_skip_default_fields() {
		let requests = Record::requests(Tag::default());
		assert_eq!(requests.len(), 2);
		assert!(!requests[0].is_optional());
		assert!(requests[1].is_optional());
	}

	#[test]
	fn record_resolves_structurally() {
		let container = Container::new();
		container.provide(|| Leaf).unwrap();

		let record: Record = container.resolve().unwrap();
		let leaf: Arc<Leaf> = container.resolve().unwrap();
		assert!(Arc::ptr_eq(&record.leaf, &leaf));
		assert!(record.backup.is_none());
		assert_eq!(record.note, "");
	}
}
