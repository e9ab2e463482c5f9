//! Pre-execution limits on operation shape
//!
//! Operations nesting deeper than [MAX_DEPTH] or whose estimated cost exceeds
//! [MAX_COMPLEXITY] are rejected during validation, before any resolver runs,
//! for queries, mutations, and subscription establishment alike. Cost is the
//! per-field weight accumulated over the selection tree; list-returning
//! fields weight their subtree by [LIST_FANOUT].

use std::sync::Arc;

use async_graphql::extensions::{Extension, ExtensionContext, ExtensionFactory, NextValidation};
use async_graphql::{ServerError, ValidationResult};

/// Maximum selection nesting depth
pub const MAX_DEPTH: usize = 5;

/// Maximum estimated execution cost
pub const MAX_COMPLEXITY: usize = 1000;

/// Expected multiplicity of list-returning fields for cost estimation
pub const LIST_FANOUT: usize = 10;

/// Extension that logs the computed cost and depth of every operation that
/// passes validation, and the rejection reason of every one that does not.
pub struct ValidationMetrics;

impl ExtensionFactory for ValidationMetrics {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(ValidationMetricsExtension)
    }
}

struct ValidationMetricsExtension;

#[async_trait::async_trait]
impl Extension for ValidationMetricsExtension {
    async fn validation(
        &self,
        ctx: &ExtensionContext<'_>,
        next: NextValidation<'_>,
    ) -> Result<ValidationResult, Vec<ServerError>> {
        match next.run(ctx).await {
            Ok(result) => {
                tracing::info!(
                    complexity = result.complexity,
                    depth = result.depth,
                    "operation validated"
                );
                Ok(result)
            }
            Err(errors) => {
                for error in &errors {
                    tracing::warn!(message = %error.message, "operation rejected");
                }
                Err(errors)
            }
        }
    }
}
