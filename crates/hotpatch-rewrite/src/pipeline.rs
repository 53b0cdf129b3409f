use hotpatch_config::RewriteConfig;
use hotpatch_syntax::{parse_csharp, SyntaxNode};
use rowan::GreenNode;
use serde::Serialize;

use crate::{
    AppliedRewrite, ReturnTypeRewriter, RewriteError, SelfReferenceRewriter,
    StaticFieldAccessRewriter,
};

/// Result of running one pass, or a whole pipeline, over a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub green: GreenNode,
    pub rewrites: Vec<AppliedRewrite>,
}

impl RewriteOutcome {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn text(&self) -> String {
        self.syntax().to_string()
    }

    pub fn is_unchanged(&self) -> bool {
        self.rewrites.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Pass {
    StaticFieldAccess,
    SelfReference,
    ReturnType,
}

impl Pass {
    /// Every pass, in the order the default pipeline runs them.
    pub const ALL: [Pass; 3] = [Pass::StaticFieldAccess, Pass::SelfReference, Pass::ReturnType];

    pub fn name(self) -> &'static str {
        match self {
            Pass::StaticFieldAccess => "StaticFieldAccessRewriter",
            Pass::SelfReference => "SelfReferenceRewriter",
            Pass::ReturnType => "ReturnTypeRewriter",
        }
    }

    pub fn run(
        self,
        root: &SyntaxNode,
        config: &RewriteConfig,
    ) -> Result<RewriteOutcome, RewriteError> {
        match self {
            Pass::StaticFieldAccess => StaticFieldAccessRewriter::new(config).run(root),
            Pass::SelfReference => SelfReferenceRewriter::new(config).run(root),
            Pass::ReturnType => ReturnTypeRewriter::new(config).run(root),
        }
    }
}

/// Runs passes in sequence; each one consumes the tree the previous one produced.
#[derive(Debug, Clone)]
pub struct RewritePipeline {
    config: RewriteConfig,
    passes: Vec<Pass>,
}

impl RewritePipeline {
    /// All passes. The return-type pass is a no-op unless `cast_same_typed_returns` is set.
    pub fn new(config: RewriteConfig) -> Self {
        Self::with_passes(config, Pass::ALL.to_vec())
    }

    pub fn with_passes(config: RewriteConfig, passes: Vec<Pass>) -> Self {
        Self { config, passes }
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn run(&self, root: &SyntaxNode) -> Result<RewriteOutcome, RewriteError> {
        let mut green = root.green().into_owned();
        let mut rewrites = Vec::new();
        for pass in &self.passes {
            let _span = tracing::debug_span!("pass", name = pass.name()).entered();
            let outcome = pass.run(&SyntaxNode::new_root(green), &self.config)?;
            green = outcome.green;
            rewrites.extend(outcome.rewrites);
        }
        Ok(RewriteOutcome { green, rewrites })
    }
}

/// Parses `source` and runs the full pipeline over it.
///
/// Sources with parse errors are refused rather than partially rewritten.
pub fn rewrite_source(
    source: &str,
    config: &RewriteConfig,
) -> Result<RewriteOutcome, RewriteError> {
    let _span = tracing::info_span!("rewrite_source", bytes = source.len()).entered();

    let parse = parse_csharp(source);
    if !parse.errors.is_empty() {
        tracing::warn!(
            target: "hotpatch.rewrite",
            errors = parse.errors.len(),
            first = %parse.errors[0],
            "source has parse errors; not rewriting"
        );
        return Err(RewriteError::InvalidInput {
            errors: parse.errors,
        });
    }

    let outcome = RewritePipeline::new(config.clone()).run(&parse.syntax())?;
    tracing::info!(
        target: "hotpatch.rewrite",
        rewrites = outcome.rewrites.len(),
        "rewrote source"
    );
    Ok(outcome)
}
