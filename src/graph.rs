//! Dependency-graph preparation: existence checks and cycle detection.

use std::collections::HashMap;

use crate::error::{DiError, DiResult};
use crate::node::{Compiler, Key};
use crate::registry::Registry;

#[derive(Clone, Copy, PartialEq)]
enum Color {
	Gray,
	Black,
}

/// Walks the graph rooted at `key`, verifying every reachable required
/// dependency exists and no cycle is reachable. Idempotent; never invokes a
/// constructor. The color map is scoped to this call.
pub(crate) fn prepare(registry: &Registry, key: &Key) -> DiResult<()> {
	let mut colors = HashMap::new();
	visit(registry, key, &mut colors)
}

fn visit(registry: &Registry, key: &Key, colors: &mut HashMap<Key, Color>) -> DiResult<()> {
	match colors.get(key) {
		Some(Color::Gray) => return Err(DiError::CycleDetected),
		Some(Color::Black) => return Ok(()),
		None => {}
	}
	colors.insert(key.clone(), Color::Gray);
	for dep in edges(registry, key)? {
		visit(registry, &dep, colors)?;
	}
	colors.insert(key.clone(), Color::Black);
	Ok(())
}

fn edges(registry: &Registry, key: &Key) -> DiResult<Vec<Key>> {
	let Some(node) = registry.node(key) else {
		return Ok(Vec::new());
	};
	match &node.compiler {
		Compiler::Constructor { requests, .. } => {
			let mut deps = Vec::with_capacity(requests.len());
			for request in requests {
				match registry.find_request(request) {
					Ok(dep) => deps.push(dep),
					Err(DiError::TypeNotFound { .. }) if request.is_optional() => {}
					Err(DiError::TypeNotFound { .. }) => {
						return Err(DiError::DependencyNotFound {
							label: node.label(),
							dependency: request.type_name().to_string(),
						});
					}
					Err(err) => return Err(err),
				}
			}
			Ok(deps)
		}
		Compiler::InterfaceView { target, .. } => Ok(vec![target.clone()]),
		Compiler::Group { members, .. } => Ok(members.iter().map(|m| m.key.clone()).collect()),
		Compiler::Value(_) | Compiler::Stub | Compiler::ContainerRef(_) => Ok(Vec::new()),
	}
}
