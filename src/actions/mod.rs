//! Action pipelines.
//!
//! Each pipeline is a free function running a fixed sequence of
//! [`ResourceController`](crate::traits::ResourceController) steps over one
//! [`ResourceContext`](crate::context::ResourceContext). The first failing
//! step aborts the rest.

pub mod count;
pub mod destroy;
pub mod index;
pub mod nested;
pub mod show;
pub mod store;
pub mod update;

pub use count::count;
pub use destroy::destroy;
pub use index::index;
pub use show::show;
pub use store::store;
pub use update::update;

use crate::errors::ApiError;
use crate::request::Input;
use crate::traits::AssignAttributes;
use crate::validation::ValidationErrors;

/// Keys of `input` that will be assigned, in input order.
///
/// Validated input assigns every key. Raw input assigns keys that are also
/// in `allowed`, or every key when `allowed` is `None`.
#[must_use]
pub fn assignable_keys<'a>(input: &'a Input, allowed: Option<&[&str]>) -> Vec<&'a str> {
    let keys = input.values().keys().map(String::as_str);
    match (input, allowed) {
        (Input::Raw(_), Some(allowed)) => keys.filter(|key| allowed.contains(key)).collect(),
        _ => keys.collect(),
    }
}

/// Copies permitted input attributes onto `model`.
///
/// Returns the names that were assigned. Keys the model does not know are
/// skipped.
///
/// # Errors
///
/// `ValidationFailed` listing every attribute whose value has the wrong type.
pub fn assign_attributes<A: AssignAttributes>(
    model: &mut A,
    input: &Input,
    allowed: Option<&[&str]>,
) -> Result<Vec<String>, ApiError> {
    let mut errors = ValidationErrors::new();
    let mut assigned = Vec::new();

    for key in assignable_keys(input, allowed) {
        let Some(value) = input.values().get(key) else {
            continue;
        };
        match model.set_attribute(key, value) {
            Ok(true) => assigned.push(key.to_string()),
            Ok(false) => tracing::debug!(attribute = key, "skipping unknown attribute"),
            Err(error) => errors.add(error),
        }
    }

    errors.result()?;
    Ok(assigned)
}
