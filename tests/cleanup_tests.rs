//! Cleanup recording and reverse-order teardown.

use std::any::type_name;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rstest::rstest;
use wirebox::{fallible_with_cleanup, with_cleanup, Container, ProvideOptions};

trait Handler: Send + Sync {}

#[derive(Default)]
struct ServeMux;

impl Handler for ServeMux {}

struct Server {
	_handler: Arc<dyn Handler>,
}

#[derive(Debug, Default)]
struct File;

type Log = Arc<Mutex<Vec<&'static str>>>;

#[rstest]
fn cleanup_runs_recorded_thunk() {
	let cleaned = Arc::new(AtomicBool::new(false));
	let flag = cleaned.clone();

	let container = Container::new();
	container
		.provide(with_cleanup(move || {
			let flag = flag.clone();
			(File::default(), move || flag.store(true, Ordering::SeqCst))
		}))
		.unwrap();

	container.resolve::<Arc<File>>().unwrap();
	assert!(!cleaned.load(Ordering::SeqCst));

	container.cleanup();
	assert!(cleaned.load(Ordering::SeqCst));
}

#[rstest]
fn cleanup_order_reverses_construction_order() {
	let log: Log = Arc::new(Mutex::new(Vec::new()));

	let container = Container::new();
	let server_log = log.clone();
	container
		.provide(with_cleanup(move |handler: Arc<dyn Handler>| {
			let log = server_log.clone();
			(Server { _handler: handler }, move || {
				log.lock().unwrap().push("server")
			})
		}))
		.unwrap();
	let mux_log = log.clone();
	container
		.provide_with(
			with_cleanup(move || {
				let log = mux_log.clone();
				(ServeMux::default(), move || log.lock().unwrap().push("mux"))
			}),
			ProvideOptions::new().implements::<dyn Handler>(|mux| mux),
		)
		.unwrap();

	container.resolve::<Arc<Server>>().unwrap();
	container.cleanup();

	assert_eq!(*log.lock().unwrap(), vec!["server", "mux"]);
}

#[rstest]
fn cleanup_is_recorded_only_for_materialized_nodes() {
	let log: Log = Arc::new(Mutex::new(Vec::new()));

	let container = Container::new();
	let file_log = log.clone();
	container
		.provide(with_cleanup(move || {
			let log = file_log.clone();
			(File::default(), move || log.lock().unwrap().push("file"))
		}))
		.unwrap();
	let mux_log = log.clone();
	container
		.provide(with_cleanup(move || {
			let log = mux_log.clone();
			(ServeMux::default(), move || log.lock().unwrap().push("mux"))
		}))
		.unwrap();

	container.resolve::<Arc<File>>().unwrap();
	container.cleanup();

	assert_eq!(*log.lock().unwrap(), vec!["file"]);
}

#[rstest]
fn prototype_with_cleanup_is_rejected() {
	let container = Container::new();

	let err = container
		.provide_with(
			with_cleanup(|| (File::default(), || {})),
			ProvideOptions::new().prototype(),
		)
		.unwrap_err();

	assert_eq!(
		err.to_string(),
		format!(
			"{}: cleanup not supported with prototype providers",
			type_name::<File>()
		)
	);
}

#[rstest]
fn failed_constructor_discards_its_cleanup() {
	let cleaned = Arc::new(AtomicBool::new(false));
	let flag = cleaned.clone();

	let container = Container::new();
	container
		.provide(fallible_with_cleanup(move || {
			let flag = flag.clone();
			let cleanup = move || flag.store(true, Ordering::SeqCst);
			let result: Result<File, String> = Err("disk is gone".to_string());
			result.map(|file| (file, cleanup))
		}))
		.unwrap();

	let err = container.resolve::<Arc<File>>().unwrap_err();
	assert_eq!(
		err.to_string(),
		format!("{}: disk is gone", type_name::<File>())
	);

	container.cleanup();
	assert!(!cleaned.load(Ordering::SeqCst));
}

#[rstest]
fn successful_fallible_constructor_records_cleanup() {
	let cleaned = Arc::new(AtomicBool::new(false));
	let flag = cleaned.clone();

	let container = Container::new();
	container
		.provide(fallible_with_cleanup(move || {
			let flag = flag.clone();
			let cleanup = move || flag.store(true, Ordering::SeqCst);
			let result: Result<File, String> = Ok(File::default());
			result.map(|file| (file, cleanup))
		}))
		.unwrap();

	container.resolve::<Arc<File>>().unwrap();
	container.cleanup();

	assert!(cleaned.load(Ordering::SeqCst));
}

#[rstest]
fn cleanup_runs_each_thunk_once() {
	let log: Log = Arc::new(Mutex::new(Vec::new()));

	let container = Container::new();
	let file_log = log.clone();
	container
		.provide(with_cleanup(move || {
			let log = file_log.clone();
			(File::default(), move || log.lock().unwrap().push("file"))
		}))
		.unwrap();

	container.resolve::<Arc<File>>().unwrap();
	container.cleanup();
	container.cleanup();

	assert_eq!(*log.lock().unwrap(), vec!["file"]);
}
