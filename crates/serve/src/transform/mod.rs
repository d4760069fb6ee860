//! Bidirectional mapping between client block descriptors and the upstream
//! block schema. Both directions are total: malformed input degrades to empty
//! content and unknown types are filtered (outbound) or flagged (inbound).

pub mod inbound;
pub mod outbound;

pub use inbound::{extract, extract_content, render_block, to_descriptor, to_descriptors, Extracted};
pub use outbound::{build_block, to_upstream_block, to_upstream_blocks};
