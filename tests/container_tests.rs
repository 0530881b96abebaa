//! Registration and resolution basics: singletons, prototypes, names,
//! values, invocations and self-resolution.

use std::any::type_name;
use std::sync::Arc;

use rstest::rstest;
use wirebox::{fallible, Container, DiError, ProvideOptions};

#[derive(Debug, Default)]
struct ServeMux;

#[derive(Debug)]
struct Server {
	mux: Arc<ServeMux>,
}

#[derive(Debug, PartialEq)]
struct Config {
	port: u16,
}

#[rstest]
fn resolve_returns_same_singleton() {
	let container = Container::new();
	container.provide(|| ServeMux::default()).unwrap();

	let first: Arc<ServeMux> = container.resolve().unwrap();
	let second: Arc<ServeMux> = container.resolve().unwrap();

	assert!(Arc::ptr_eq(&first, &second));
}

#[rstest]
fn constructor_arguments_are_resolved() {
	let container = Container::new();
	container.provide(|| ServeMux::default()).unwrap();
	container.provide(|mux: Arc<ServeMux>| Server { mux }).unwrap();

	let server: Arc<Server> = container.resolve().unwrap();
	let mux: Arc<ServeMux> = container.resolve().unwrap();

	assert!(Arc::ptr_eq(&server.mux, &mux));
}

#[rstest]
fn prototype_resolves_fresh_instance() {
	let container = Container::new();
	container
		.provide_with(|| ServeMux::default(), ProvideOptions::new().prototype())
		.unwrap();

	let first: Arc<ServeMux> = container.resolve().unwrap();
	let second: Arc<ServeMux> = container.resolve().unwrap();

	assert!(!Arc::ptr_eq(&first, &second));
}

#[rstest]
fn named_provider_is_not_found_without_name() {
	let container = Container::new();
	container
		.provide_with(|| ServeMux::default(), ProvideOptions::new().named("admin"))
		.unwrap();

	let err = container.resolve::<Arc<ServeMux>>().unwrap_err();
	assert_eq!(
		err.to_string(),
		format!("type {} not exists in container", type_name::<ServeMux>())
	);

	let named: Arc<ServeMux> = container.resolve_named("admin").unwrap();
	let again: Arc<ServeMux> = container.resolve_named("admin").unwrap();
	assert!(Arc::ptr_eq(&named, &again));
}

#[rstest]
fn value_provider_resolves_as_is() {
	let container = Container::new();
	container.provide_value(Config { port: 8080 }).unwrap();

	let config: Arc<Config> = container.resolve().unwrap();
	let again: Arc<Config> = container.resolve().unwrap();

	assert_eq!(config.port, 8080);
	assert!(Arc::ptr_eq(&config, &again));
}

#[rstest]
fn duplicate_provider_is_rejected() {
	let container = Container::new();
	container.provide(|| ServeMux::default()).unwrap();

	let err = container.provide(|| ServeMux::default()).unwrap_err();

	assert_eq!(
		err.to_string(),
		format!(
			"{} already exists in dependency graph",
			type_name::<ServeMux>()
		)
	);
}

#[rstest]
fn named_and_unnamed_providers_coexist() {
	let container = Container::new();
	container.provide(|| ServeMux::default()).unwrap();
	container
		.provide_with(|| ServeMux::default(), ProvideOptions::new().named("admin"))
		.unwrap();

	let unnamed: Arc<ServeMux> = container.resolve().unwrap();
	let named: Arc<ServeMux> = container.resolve_named("admin").unwrap();
	assert!(!Arc::ptr_eq(&unnamed, &named));
}

#[rstest]
fn missing_dependency_is_reported() {
	let container = Container::new();
	container.provide(|count: Arc<u32>| i64::from(*count)).unwrap();

	let err = container.resolve::<Arc<i64>>().unwrap_err();

	assert_eq!(err.to_string(), "i64: dependency u32 not exists in container");
}

#[rstest]
fn constructor_error_is_wrapped_with_node_label() {
	let container = Container::new();
	container
		.provide(fallible(|| {
			Err::<Server, String>("server build failed".to_string())
		}))
		.unwrap();

	let err = container.resolve::<Arc<Server>>().unwrap_err();

	assert!(matches!(err, DiError::Build { .. }));
	assert_eq!(
		err.to_string(),
		format!("{}: server build failed", type_name::<Server>())
	);
}

#[rstest]
fn fallible_constructor_succeeds() {
	let container = Container::new();
	container
		.provide(fallible(|| Ok::<_, String>(ServeMux::default())))
		.unwrap();

	assert!(container.resolve::<Arc<ServeMux>>().is_ok());
}

#[rstest]
fn optional_dependency_absent_is_none() {
	let container = Container::new();

	let server: Option<Arc<Server>> = container.resolve().unwrap();
	assert!(server.is_none());
}

#[rstest]
fn optional_dependency_present_is_some() {
	let container = Container::new();
	container.provide(|| ServeMux::default()).unwrap();

	let mux: Option<Arc<ServeMux>> = container.resolve().unwrap();
	let direct: Arc<ServeMux> = container.resolve().unwrap();

	assert!(Arc::ptr_eq(&mux.unwrap(), &direct));
}

#[rstest]
fn invoke_calls_function_with_dependencies() {
	let container = Container::new();
	container.provide(|| ServeMux::default()).unwrap();
	let mux: Arc<ServeMux> = container.resolve().unwrap();

	let mut seen = None;
	container
		.invoke(|resolved: Arc<ServeMux>| {
			seen = Some(resolved);
		})
		.unwrap();

	assert!(Arc::ptr_eq(&seen.unwrap(), &mux));
}

#[rstest]
fn invoke_error_passes_through_unchanged() {
	let container = Container::new();

	let err = container
		.invoke(|| Err::<(), String>("invoke error".to_string()))
		.unwrap_err();

	assert_eq!(err.to_string(), "invoke error");
}

#[rstest]
fn invoke_with_missing_dependency_fails() {
	let container = Container::new();

	let err = container.invoke(|_server: Arc<Server>| {}).unwrap_err();

	assert_eq!(
		err.to_string(),
		format!("type {} not exists in container", type_name::<Server>())
	);
}

#[rstest]
fn has_reflects_registration() {
	let container = Container::new();
	assert!(!container.has::<Arc<ServeMux>>());

	container.provide(|| ServeMux::default()).unwrap();
	assert!(container.has::<Arc<ServeMux>>());
	assert!(!container.has::<Arc<Server>>());
}

#[rstest]
fn has_named_requires_matching_name() {
	let container = Container::new();
	container
		.provide_with(|| ServeMux::default(), ProvideOptions::new().named("admin"))
		.unwrap();

	assert!(container.has_named::<Arc<ServeMux>>("admin"));
	assert!(!container.has::<Arc<ServeMux>>());
}

#[rstest]
fn container_resolves_itself() {
	let container = Container::new();

	let resolved: Arc<Container> = container.resolve().unwrap();

	assert!(Arc::ptr_eq(&resolved, &container));
}

#[rstest]
fn container_can_be_a_dependency() {
	struct Held {
		container: Arc<Container>,
	}

	let container = Container::new();
	container
		.provide(|c: Arc<Container>| Held { container: c })
		.unwrap();

	let held: Arc<Held> = container.resolve().unwrap();
	assert!(Arc::ptr_eq(&held.container, &container));
}
