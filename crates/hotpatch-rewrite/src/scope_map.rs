use std::collections::{HashMap, HashSet};

use hotpatch_config::FieldVisibility;
use hotpatch_syntax::{FieldDeclaration, TypeDeclaration};

/// Qualifying static field names per type declaration.
///
/// The flat `all` set is the union over every type and lets lookups reject most identifiers
/// without resolving their enclosing type.
#[derive(Debug, Default)]
pub struct ScopeMap {
    by_type: HashMap<TypeDeclaration, HashSet<String>>,
    all: HashSet<String>,
}

impl ScopeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every qualifying field declared directly in `decl`'s body.
    ///
    /// Returns the number of names added.
    pub fn register_type(&mut self, decl: &TypeDeclaration, visibility: FieldVisibility) -> usize {
        let Some(body) = decl.body() else {
            return 0;
        };
        let mut added = 0;
        for field in body.fields() {
            if !qualifies(&field, visibility) {
                continue;
            }
            for name in field.names() {
                if self.insert(decl, name) {
                    added += 1;
                }
            }
        }
        added
    }

    pub fn insert(&mut self, decl: &TypeDeclaration, name: String) -> bool {
        self.all.insert(name.clone());
        self.by_type.entry(decl.clone()).or_default().insert(name)
    }

    /// Fast rejection: `false` means no type anywhere declares a qualifying field `name`.
    pub fn might_qualify(&self, name: &str) -> bool {
        self.all.contains(name)
    }

    pub fn qualifies(&self, decl: &TypeDeclaration, name: &str) -> bool {
        self.by_type
            .get(decl)
            .is_some_and(|names| names.contains(name))
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// Whether `field` is static and, under `visibility`, not private.
pub fn qualifies(field: &FieldDeclaration, visibility: FieldVisibility) -> bool {
    if !field.is_static() {
        return false;
    }
    let private = match visibility {
        FieldVisibility::ExplicitPrivateOnly => field.is_explicitly_private(),
        FieldVisibility::ImplicitPrivate => {
            field.is_explicitly_private() || !field.has_access_modifier()
        }
    };
    !private
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotpatch_syntax::{parse_csharp, AstNode, CompilationUnit};

    fn types(src: &str) -> Vec<TypeDeclaration> {
        let parse = parse_csharp(src);
        assert!(parse.errors.is_empty(), "{:?}", parse.errors);
        CompilationUnit::cast(parse.syntax())
            .unwrap()
            .type_declarations()
            .collect()
    }

    const SRC: &str = "
class Foo {
    public static int A, B;
    static int C;
    private static int D;
    protected static int E;
    const int F = 1;
    public int G;
}
class Bar {
    internal static int A;
}
";

    #[test]
    fn explicit_private_only_policy() {
        let decls = types(SRC);
        let mut map = ScopeMap::new();
        assert_eq!(map.register_type(&decls[0], FieldVisibility::ExplicitPrivateOnly), 4);

        for name in ["A", "B", "C", "E"] {
            assert!(map.qualifies(&decls[0], name), "{name}");
        }
        for name in ["D", "F", "G"] {
            assert!(!map.qualifies(&decls[0], name), "{name}");
            assert!(!map.might_qualify(name), "{name}");
        }
        assert!(!map.qualifies(&decls[1], "A"));
    }

    #[test]
    fn implicit_private_policy() {
        let decls = types(SRC);
        let mut map = ScopeMap::new();
        map.register_type(&decls[0], FieldVisibility::ImplicitPrivate);
        map.register_type(&decls[1], FieldVisibility::ImplicitPrivate);

        assert!(map.qualifies(&decls[0], "A"));
        assert!(!map.qualifies(&decls[0], "C"));
        assert!(map.qualifies(&decls[0], "E"));
        assert!(map.qualifies(&decls[1], "A"));
        assert!(!map.might_qualify("C"));
    }

    #[test]
    fn nested_type_fields_belong_to_the_nested_type() {
        let decls = types("class Outer { class Inner { public static int X; } }");
        let mut map = ScopeMap::new();
        for decl in &decls {
            map.register_type(decl, FieldVisibility::ExplicitPrivateOnly);
        }
        assert!(!map.qualifies(&decls[0], "X"));
        assert!(map.qualifies(&decls[1], "X"));
        assert!(!map.is_empty());
    }
}
