// Identifier reconciliation
//
// Attaches canonical HOUSE_NUMBER identifiers to extracted tables using the
// vendor column rules and the reference lookups built once per run.

pub mod core;
pub mod dash;
pub mod models;
pub mod reference;

pub use self::core::reconcile_table;
pub use dash::{normalize_dash, swap_dash};
pub use models::{MatchBranch, MatchSource, MatchStats, ReconciledTable};
pub use reference::{ReferenceLookups, ReferenceMap, ReferenceRecord};
