// ABOUTME: Configuration and constants for the Basil engine
// Version info, evaluation limits, and module resolution settings live here.

pub const VERSION: &str = "0.4.0";

/// Maximum call depth before evaluation aborts with a state error.
pub const MAX_CALL_DEPTH: usize = 512;

/// Maximum number of loop iterations collected into a single result array.
pub const MAX_COLLECTED_RESULTS: usize = 1_000_000;

/// Primary extension for script files.
pub const SCRIPT_EXTENSION: &str = "sl";

/// Extension for partials; resolved identically to scripts.
pub const PARTIAL_EXTENSION: &str = "slp";

/// Reserved dictionary key marking a typed dictionary.
pub const TYPE_MARKER: &str = "__type";

/// Reserved exports key set by `export default = ...`.
pub const DEFAULT_EXPORT: &str = "__default";

/// Name bound to the receiver inside a method body.
pub const RECEIVER_NAME: &str = "self";

/// Key under which component children are passed.
pub const CONTENTS_KEY: &str = "contents";

/// HTML elements that must be written self-closing.
pub const SINGLETON_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
    "param", "source", "track", "wbr",
];

pub fn is_singleton_element(name: &str) -> bool {
    SINGLETON_ELEMENTS.contains(&name)
}
