//! The validation engine.
//!
//! Runs the document-level rules, then every part rule against every
//! part it applies to. A (rule, part) pair fires at most once per run.
//! Validation is pure: it reads the document and schema and returns a
//! fresh message bag, so running it twice yields identical results.

use crate::document::Document;
use crate::part::PartId;
use crate::rules::validate::{document_rules, part_rules};
use grapnel_core::MessageBag;
use grapnel_schema::Schema;
use rustc_hash::FxHashSet;
use tracing::debug;

/// Read-only context threaded through validation rules.
pub(crate) struct ValidateCtx<'a> {
    pub(crate) doc: &'a Document,
    pub(crate) schema: &'a Schema,
    pub(crate) messages: MessageBag,
}

/// Validates a constructed document against the schema.
///
/// Returns only the messages found by this run; construction messages
/// stay in [`Document::messages`].
pub fn validate(document: &Document, schema: &Schema) -> MessageBag {
    let mut cx = ValidateCtx {
        doc: document,
        schema,
        messages: MessageBag::new(),
    };
    let mut completed: FxHashSet<(&'static str, PartId)> = FxHashSet::default();

    for rule in document_rules() {
        rule.check_document(&mut cx);
    }
    for (id, part) in document.parts.iter() {
        for rule in part_rules() {
            if rule.applies(part) && completed.insert((rule.id(), id)) {
                rule.check(&mut cx, id);
            }
        }
    }

    debug!(messages = cx.messages.len(), "document validated");
    cx.messages
}
