//! Append-only registry of declared objects, relations and scopes
//!
//! Bindings are never retracted or replaced. Redeclaring a name logs a
//! warning and leaves the first definition in place.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::builder::RelationLookup;
use crate::logic::{RelationFn, RelationId};

/// A named constant of the story world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSymbol {
    pub name: String,
    pub meaning: String,
}

/// A declared relation with its fixed parameter list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSymbol {
    pub name: String,
    pub params: Vec<String>,
    pub meaning: String,
    pub function: RelationFn,
}

impl RelationSymbol {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A named partition of formulas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSymbol {
    pub name: String,
    pub meaning: String,
}

/// Outcome of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declared {
    /// The name is new and now bound
    Added,
    /// The name was already bound; the first binding is kept
    Redeclared,
}

impl Declared {
    pub fn is_redeclared(&self) -> bool {
        matches!(self, Declared::Redeclared)
    }
}

/// Declarations accumulated by one session
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    objects: IndexMap<String, ObjectSymbol>,
    relations: IndexMap<String, RelationSymbol>,
    scopes: IndexMap<String, ScopeSymbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_object(&mut self, name: &str, meaning: &str) -> Declared {
        if let Some(existing) = self.objects.get(name) {
            warn!(object = name, first = %existing.meaning, "object redeclared, keeping first definition");
            return Declared::Redeclared;
        }
        debug!(object = name, "declared object");
        self.objects.insert(
            name.to_string(),
            ObjectSymbol { name: name.to_string(), meaning: meaning.to_string() },
        );
        Declared::Added
    }

    /// Declare a relation and return its handle.
    ///
    /// A redeclaration returns the handle of the first definition, whatever
    /// parameter list it was given this time.
    pub fn declare_relation(&mut self, name: &str, params: &[String], meaning: &str) -> (RelationFn, Declared) {
        if let Some(existing) = self.relations.get(name) {
            if existing.arity() != params.len() {
                warn!(
                    relation = name,
                    arity = existing.arity(),
                    attempted = params.len(),
                    "relation redeclared with a different arity, keeping first definition"
                );
            } else {
                warn!(relation = name, "relation redeclared, keeping first definition");
            }
            return (existing.function.clone(), Declared::Redeclared);
        }
        let id = RelationId(self.relations.len() as u32);
        let function = RelationFn::new(id, name, params.len());
        debug!(relation = name, arity = params.len(), "declared relation");
        self.relations.insert(
            name.to_string(),
            RelationSymbol {
                name: name.to_string(),
                params: params.to_vec(),
                meaning: meaning.to_string(),
                function: function.clone(),
            },
        );
        (function, Declared::Added)
    }

    pub fn declare_scope(&mut self, name: &str, meaning: &str) -> Declared {
        if self.scopes.contains_key(name) {
            warn!(scope = name, "scope redeclared, keeping first definition");
            return Declared::Redeclared;
        }
        debug!(scope = name, "declared scope");
        self.scopes.insert(
            name.to_string(),
            ScopeSymbol { name: name.to_string(), meaning: meaning.to_string() },
        );
        Declared::Added
    }

    /// Look up a relation handle by name
    pub fn resolve_relation(&self, name: &str) -> Option<RelationFn> {
        self.relations.get(name).map(|r| r.function.clone())
    }

    pub fn relation(&self, name: &str) -> Option<&RelationSymbol> {
        self.relations.get(name)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectSymbol> {
        self.objects.get(name)
    }

    pub fn scope(&self, name: &str) -> Option<&ScopeSymbol> {
        self.scopes.get(name)
    }

    pub fn has_scope(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    /// Promote an object to a scope of the same name.
    ///
    /// Returns false when no such object exists.
    pub fn adopt_object_as_scope(&mut self, name: &str) -> bool {
        let Some(object) = self.objects.get(name) else {
            return false;
        };
        if !self.scopes.contains_key(name) {
            warn!(scope = name, "scope not declared, adopting object of the same name");
            let scope = ScopeSymbol { name: object.name.clone(), meaning: object.meaning.clone() };
            self.scopes.insert(name.to_string(), scope);
        }
        true
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectSymbol> {
        self.objects.values()
    }

    pub fn relations(&self) -> impl Iterator<Item = &RelationSymbol> {
        self.relations.values()
    }

    pub fn scopes(&self) -> impl Iterator<Item = &ScopeSymbol> {
        self.scopes.values()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Objects and relations as `name: meaning` / `name(params): meaning`
    /// lines, for logs and correction prompts
    pub fn declarations_text(&self) -> String {
        let mut out = String::new();
        if !self.objects.is_empty() {
            out.push_str("Objects:\n");
            for object in self.objects.values() {
                out.push_str(&format!("{}: {}\n", object.name, object.meaning));
            }
        }
        if !self.relations.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("Relations:\n");
            for relation in self.relations.values() {
                out.push_str(&format!(
                    "{}({}): {}\n",
                    relation.name,
                    relation.params.join(", "),
                    relation.meaning
                ));
            }
        }
        out
    }

    pub fn scopes_text(&self) -> String {
        self.scopes
            .values()
            .map(|s| format!("{}: {}\n", s.name, s.meaning))
            .collect()
    }
}

impl RelationLookup for SymbolTable {
    fn lookup_relation(&self, name: &str) -> Option<RelationFn> {
        self.resolve_relation(name)
    }

    fn relation_params(&self, name: &str) -> Option<Vec<String>> {
        self.relations.get(name).map(|r| r.params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_declare_and_resolve() {
        let mut table = SymbolTable::new();
        let (rel, outcome) = table.declare_relation("locates_in", &params(&["a", "b"]), "a is located in b");
        assert_eq!(outcome, Declared::Added);
        assert_eq!(rel.arity(), 2);
        assert_eq!(table.resolve_relation("locates_in"), Some(rel));
        assert_eq!(table.resolve_relation("teleports"), None);
    }

    #[test]
    fn test_redeclaration_keeps_first_binding() {
        let mut table = SymbolTable::new();
        let (first, _) = table.declare_relation("owns", &params(&["a", "b"]), "a owns b");
        let (second, outcome) = table.declare_relation("owns", &params(&["a"]), "something else");
        assert!(outcome.is_redeclared());
        assert_eq!(first, second);
        assert_eq!(table.relation("owns").unwrap().arity(), 2);
        assert_eq!(table.relation("owns").unwrap().meaning, "a owns b");

        assert_eq!(table.declare_object("aleph", "a dog"), Declared::Added);
        assert_eq!(table.declare_object("aleph", "a cat"), Declared::Redeclared);
        assert_eq!(table.object("aleph").unwrap().meaning, "a dog");
        assert_eq!(table.object_count(), 1);
    }

    #[test]
    fn test_relation_ids_are_distinct() {
        let mut table = SymbolTable::new();
        let (a, _) = table.declare_relation("a", &params(&["x"]), "");
        let (b, _) = table.declare_relation("b", &params(&["x"]), "");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_scope_adoption() {
        let mut table = SymbolTable::new();
        table.declare_object("alice", "the protagonist");
        assert!(!table.has_scope("alice"));
        assert!(table.adopt_object_as_scope("alice"));
        assert!(table.has_scope("alice"));
        assert_eq!(table.scope("alice").unwrap().meaning, "the protagonist");
        assert!(!table.adopt_object_as_scope("bob"));
    }

    #[test]
    fn test_rendering() {
        let mut table = SymbolTable::new();
        assert_eq!(table.declarations_text(), "");
        table.declare_object("aleph", "a dog");
        table.declare_relation("locates_in", &params(&["a", "b"]), "a is located in b");
        table.declare_scope("dream", "what aleph dreams");
        assert_eq!(
            table.declarations_text(),
            "Objects:\naleph: a dog\n\nRelations:\nlocates_in(a, b): a is located in b\n"
        );
        assert_eq!(table.scopes_text(), "dream: what aleph dreams\n");
    }

    #[test]
    fn test_declaration_order_preserved() {
        let mut table = SymbolTable::new();
        for name in ["zeta", "alpha", "mid"] {
            table.declare_scope(name, "");
        }
        let names: Vec<_> = table.scopes().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }
}
