//! The grapnel engine facade.
//!
//! Wires the pipeline end to end: parse the query text into a syntax
//! tree, construct and validate a document against the schema, then
//! generate an executable operation. A document carrying any error
//! message never reaches planning.

use std::sync::Arc;

use grapnel_core::{MessageBag, SourceText};
use grapnel_document::{validate, BuildError, BuildOptions, DocumentBuilder};
use grapnel_plan::{generate, ExecutableOperation, PlanError, Variables};
use grapnel_schema::Schema;
use grapnel_syntax::SyntaxError;
use thiserror::Error;
use tracing::debug;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Maximum selection set nesting before construction aborts.
    pub max_depth: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_depth: BuildOptions::default().max_depth,
        }
    }
}

/// A failure at any pipeline stage.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("document failed validation with {} error(s)", .0.error_count())]
    Invalid(MessageBag),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// The query processing pipeline, bound to one schema.
pub struct Engine {
    schema: Arc<Schema>,
    options: EngineOptions,
}

impl Engine {
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            options: EngineOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Runs the full pipeline on a query.
    ///
    /// Construction and validation messages are merged; if any of them
    /// is an error the whole bag comes back as [`EngineError::Invalid`]
    /// and nothing is planned.
    pub async fn process(
        &self,
        query: &str,
        operation_name: Option<&str>,
        variables: &Variables,
    ) -> Result<ExecutableOperation, EngineError> {
        let source = SourceText::new(query);
        let tree = grapnel_syntax::parse(&source)?;
        debug!("query parsed");

        let mut document = DocumentBuilder::new(&self.schema)
            .with_options(BuildOptions {
                max_depth: self.options.max_depth,
            })
            .build(&source, &tree)?;

        let findings = validate(&document, &self.schema);
        document.messages.merge(findings);
        debug!(messages = document.messages.len(), "document checked");

        if document.messages.has_errors() {
            return Err(EngineError::Invalid(document.messages));
        }

        let plan = generate(&document, operation_name, &self.schema, variables).await?;
        debug!(fields = plan.selections.len(), "plan generated");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grapnel_schema::SchemaBuilder;

    #[test]
    fn test_default_options_track_build_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.max_depth, BuildOptions::default().max_depth);
    }

    #[test]
    fn test_engine_exposes_its_schema() {
        let schema = Arc::new(SchemaBuilder::new().query_type("Query").build());
        let engine = Engine::new(schema);
        assert_eq!(
            engine.schema().root_type(grapnel_schema::OperationKind::Query),
            Some("Query")
        );
    }
}
