use hotpatch_syntax::TextRange;
use serde::Serialize;

/// Identity of a rewrite: which pass fired and which of its rules matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RewriteRule {
    /// `Count` -> `Foo.Count`
    BareStaticField,
    /// `Log(this)` -> `Log((Foo)(object)this)`
    ThisArgument,
    /// `owner = this` -> `owner = (Foo)(object)this`
    ThisAssignmentValue,
    /// `this.BaseMethod()` -> `((Foo)(object)this).BaseMethod()`
    ThisInvocationReceiver,
    /// `return this;` -> `return (Foo)(object)this;`
    ThisReturnValue,
    /// `return other;` -> `return (Foo)(object)other;` in a method returning `Foo`
    SameTypedReturn,
}

impl RewriteRule {
    pub fn pass_name(self) -> &'static str {
        match self {
            RewriteRule::BareStaticField => "StaticFieldAccessRewriter",
            RewriteRule::ThisArgument
            | RewriteRule::ThisAssignmentValue
            | RewriteRule::ThisInvocationReceiver
            | RewriteRule::ThisReturnValue => "SelfReferenceRewriter",
            RewriteRule::SameTypedReturn => "ReturnTypeRewriter",
        }
    }

    pub fn rule_name(self) -> &'static str {
        match self {
            RewriteRule::BareStaticField => "BareIdentifier",
            RewriteRule::ThisArgument => "Argument",
            RewriteRule::ThisAssignmentValue => "AssignmentValue",
            RewriteRule::ThisInvocationReceiver => "InvocationReceiver",
            RewriteRule::ThisReturnValue => "ReturnValue",
            RewriteRule::SameTypedReturn => "ReturnValue",
        }
    }

    /// The block comment attached to rewritten nodes: `/*Pass:Rule*/`.
    pub fn comment(self) -> String {
        format!("/*{}:{}*/", self.pass_name(), self.rule_name())
    }
}

/// One replacement made by a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRewrite {
    pub rule: RewriteRule,
    /// Range of the replaced node, trivia excluded, in the tree the pass consumed.
    pub range: TextRange,
    pub original: String,
    pub replacement: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_name_pass_and_rule() {
        assert_eq!(
            RewriteRule::BareStaticField.comment(),
            "/*StaticFieldAccessRewriter:BareIdentifier*/"
        );
        assert_eq!(
            RewriteRule::ThisInvocationReceiver.comment(),
            "/*SelfReferenceRewriter:InvocationReceiver*/"
        );
        assert_eq!(
            RewriteRule::SameTypedReturn.comment(),
            "/*ReturnTypeRewriter:ReturnValue*/"
        );
    }
}
