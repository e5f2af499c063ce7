//! Paths command handler.

use fdl_core::ResolvedPaths;

/// Print every resolved location.
pub fn execute(paths: &ResolvedPaths) {
    println!("{paths}");
}
