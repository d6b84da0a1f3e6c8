// Submodules for separation of concerns
mod descriptor;
mod eval;
mod parse;
mod types;

// Public API re-exports
pub use descriptor::QueryDescriptor;
pub use eval::{compare_bson, eval_filter};
pub use parse::{parse_filter_doc, parse_filter_json};
pub use types::{CmpOp, CursorOptions, DEFAULT_MAX_AWAIT, Filter};
