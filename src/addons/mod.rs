//! Reference addon set.

pub mod cross_reference;

use std::sync::Arc;

use crate::addon::Addon;

/// The registrable reference addons, disabled by default (an operator opts
/// in via configuration, same as the Python source's addon loader).
pub fn reference_set() -> Vec<Arc<dyn Addon>> {
    vec![Arc::new(cross_reference::CrossReferenceAddon)]
}
