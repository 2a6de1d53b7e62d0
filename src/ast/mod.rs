//! The Gwen spec node model (spec.md §3, "AST & status model" §4.A).
//!
//! Nodes are immutable value types with `withX` copy-constructors; the
//! Normaliser and Step engine never mutate a node in place, they produce new
//! values carrying updated `evalStatus`/`attachments`/`nested` steps.

pub mod node;
pub mod status;
pub mod table;
pub mod tag;

pub use node::{
    new_node_id, node_path_segment, occurrence_index, param_names, Attachment,
    Background, DocString, Examples, ExamplesRow, Feature, NodeId, NodeType,
    Rule, Scenario, SourceRef, Spec, Step, StepDef,
};
pub use status::EvalStatus;
pub use table::{DataTable, RawTable, Record, TableRow};
pub use tag::{DataTableAnnotation, Reserved, Tag, TableHeader};
