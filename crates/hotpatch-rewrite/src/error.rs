use hotpatch_syntax::ParseError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    /// The source did not parse cleanly. Rewriting a partial tree would hand the compiler a
    /// half-patched file.
    #[error("refusing to rewrite source with {} parse error(s)", .errors.len())]
    InvalidInput { errors: Vec<ParseError> },

    /// A replacement built from a text template failed to parse.
    #[error("synthesised expression `{template}` does not parse: {message}")]
    Synthesis { template: String, message: String },
}
