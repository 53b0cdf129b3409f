//! Source rewriting for hot-patching compiled C# types.
//!
//! When a class is recompiled and swapped into a running program, code in the new build must
//! keep talking to the type identity the live instances and shared static state belong to.
//! The passes here find the few source patterns that would bind to the freshly compiled type
//! instead and rewrite exactly those:
//!
//! - [`StaticFieldAccessRewriter`]: bare references to non-private static fields become
//!   `Type.Field`.
//! - [`SelfReferenceRewriter`]: `this` passed, assigned, returned, or used as the receiver of an
//!   inherited call is cast through `object`.
//! - [`ReturnTypeRewriter`]: optionally casts values returned from methods whose return type is
//!   the enclosing type.
//!
//! Everything else in the tree is left alone, formatting included. [`RewritePipeline`] runs the
//! passes in order over one file.

mod annotator;
mod error;
mod passes;
mod pipeline;
mod rewriter;
mod rule;
mod scope_map;

pub use annotator::{
    cast_through_text, synthesize_expression, with_trivia_from, RewriteAnnotator,
};
pub use error::RewriteError;
pub use passes::{ReturnTypeRewriter, SelfReferenceRewriter, StaticFieldAccessRewriter};
pub use pipeline::{rewrite_source, Pass, RewriteOutcome, RewritePipeline};
pub use rewriter::{rewrite_tree, SyntaxRewriter};
pub use rule::{AppliedRewrite, RewriteRule};
pub use scope_map::ScopeMap;

pub use hotpatch_config::{FieldVisibility, RewriteConfig};
