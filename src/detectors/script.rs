//! Script feature detector
//!
//! Two complementary passes:
//! 1. Textual patterns catch feature names inside string literals, e.g. a
//!    `:has(` selector passed to `querySelector`. These are not call shapes.
//! 2. A tree-sitter syntax tree is walked for call expressions whose callee
//!    is exactly `<global>.<member>` and matches the call-shape table, e.g.
//!    `document.startViewTransition(...)`. Requiring the qualified shape
//!    keeps `router.startViewTransition()` or a bare `timeout()` from
//!    matching.
//!
//! Sources that do not parse cleanly skip pass 2 only.

use super::base::{DetectorError, FeatureDetector, FeatureSet, ScriptDialect};
use super::style::PatternSet;
use crate::registry::{CallShape, FeatureRegistry};
use tracing::debug;
use tree_sitter::{Language, Node, Parser, Tree};

pub struct ScriptDetector {
    dialect: ScriptDialect,
    text: PatternSet,
    call_shapes: Vec<CallShape>,
}

impl ScriptDetector {
    pub fn new(registry: &FeatureRegistry, dialect: ScriptDialect) -> Result<Self, DetectorError> {
        Ok(Self::from_parts(
            dialect,
            PatternSet::compile(registry.script_patterns())?,
            registry.call_shapes().to_vec(),
        ))
    }

    pub(crate) fn from_parts(
        dialect: ScriptDialect,
        text: PatternSet,
        call_shapes: Vec<CallShape>,
    ) -> Self {
        Self {
            dialect,
            text,
            call_shapes,
        }
    }

    pub fn dialect(&self) -> ScriptDialect {
        self.dialect
    }

    fn language(&self) -> Language {
        match self.dialect {
            ScriptDialect::JavaScript | ScriptDialect::Jsx => tree_sitter_javascript::LANGUAGE.into(),
            ScriptDialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            ScriptDialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Build a syntax tree, or `None` if the source has syntax errors
    fn parse(&self, content: &str) -> Option<Tree> {
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&self.language()) {
            debug!("Failed to set {:?} grammar: {}", self.dialect, e);
            return None;
        }
        let tree = parser.parse(content, None)?;
        if tree.root_node().has_error() {
            return None;
        }
        Some(tree)
    }
}

impl FeatureDetector for ScriptDetector {
    fn name(&self) -> &'static str {
        "script"
    }

    fn detect(&self, content: &str) -> FeatureSet {
        let mut hits = FeatureSet::new();
        self.text.scan_into(content, &mut hits);

        match self.parse(content) {
            Some(tree) => {
                let mut visitor = CallShapeVisitor {
                    shapes: &self.call_shapes,
                    hits: &mut hits,
                };
                walk_tree(&tree, content.as_bytes(), &mut visitor);
            }
            None => debug!(
                "Skipping call-shape matching: {:?} source does not parse",
                self.dialect()
            ),
        }

        hits
    }
}

/// Receives every node of a syntax tree in pre-order
pub(crate) trait SyntaxVisitor {
    fn visit(&mut self, node: &Node, source: &[u8]);
}

/// Pre-order walk with a cursor (no recursion, so deep trees are fine)
pub(crate) fn walk_tree<V: SyntaxVisitor>(tree: &Tree, source: &[u8], visitor: &mut V) {
    let mut cursor = tree.walk();
    loop {
        visitor.visit(&cursor.node(), source);
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

struct CallShapeVisitor<'a> {
    shapes: &'a [CallShape],
    hits: &'a mut FeatureSet,
}

impl SyntaxVisitor for CallShapeVisitor<'_> {
    fn visit(&mut self, node: &Node, source: &[u8]) {
        if node.kind() != "call_expression" {
            return;
        }
        let Some((object, member)) = node
            .child_by_field_name("function")
            .and_then(|callee| qualified_callee(&callee, source))
        else {
            return;
        };
        for shape in self.shapes {
            if shape.object == object && shape.member == member {
                self.hits.insert(shape.feature.clone());
            }
        }
    }
}

/// `(object, member)` for a callee of the form `identifier.property`
fn qualified_callee<'s>(callee: &Node, source: &'s [u8]) -> Option<(&'s str, &'s str)> {
    if callee.kind() != "member_expression" {
        return None;
    }
    let object = callee.child_by_field_name("object")?;
    let property = callee.child_by_field_name("property")?;
    if object.kind() != "identifier" || property.kind() != "property_identifier" {
        return None;
    }
    Some((object.utf8_text(source).ok()?, property.utf8_text(source).ok()?))
}
