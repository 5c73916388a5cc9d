//! Validate element trees against a [`Schema`].

use std::collections::BTreeMap;

use crate::document::{Document, Element};
use crate::error::{MvnxError, Result};
use crate::schema::{AttributeRule, ElementSchema, Schema};

// Text quoted in violation messages is cut to this many characters.
const QUOTE_LIMIT: usize = 40;

impl Schema {
    /// Check a document, returning `true` if it satisfies the schema.
    pub fn is_valid(&self, document: &Document) -> bool {
        self.violations(document).is_empty()
    }

    /// Check a document, failing with [`MvnxError::SchemaValidation`] if it does not
    /// satisfy the schema.
    pub fn assert_valid(&self, document: &Document) -> Result<()> {
        let violations = self.violations(document);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(MvnxError::SchemaValidation { violations })
        }
    }

    /// Every violation in the document, in document order.
    pub fn violations(&self, document: &Document) -> Vec<String> {
        let root = document.root();
        let path = format!("/{}", root.local_name());
        let mut violations = Vec::new();
        if root.local_name() != self.root {
            violations.push(format!(
                "{}: expected root element <{}>",
                path, self.root
            ));
            return violations;
        }
        check_element(root, &self.element, &path, &mut violations);
        violations
    }
}

fn check_element(element: &Element, schema: &ElementSchema, path: &str, out: &mut Vec<String>) {
    for (name, rule) in &schema.attributes {
        match element.attribute(name) {
            Some(value) => check_value(value, rule, &format!("{}@{}", path, name), out),
            None if rule.required => out.push(format!("{}: missing attribute {}", path, name)),
            None => {}
        }
    }
    if !schema.open {
        for (key, _) in element.attributes() {
            let local = key.rsplit(':').next().unwrap_or(key);
            if is_namespace_declaration(key) || schema.attributes.contains_key(local) {
                continue;
            }
            out.push(format!("{}: unexpected attribute {}", path, key));
        }
    }

    match (&schema.text, element.text()) {
        (Some(rule), Some(text)) => check_value(text, rule, &format!("{}/text()", path), out),
        (Some(rule), None) if rule.required => out.push(format!("{}: missing text", path)),
        _ => {}
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for child in element.children() {
        let name = child.local_name();
        let position = counts.entry(name).or_insert(0);
        let child_path = format!("{}/{}[{}]", path, name, position);
        *position += 1;

        match schema.children.get(name) {
            Some(rule) => check_element(child, &rule.schema, &child_path, out),
            None if !schema.open => out.push(format!("{}: unexpected element", child_path)),
            None => {}
        }
    }

    for (name, rule) in &schema.children {
        let found = counts.get(name.as_str()).copied().unwrap_or(0);
        if found < rule.min_occurs {
            out.push(format!(
                "{}: expected at least {} <{}>, found {}",
                path, rule.min_occurs, name, found
            ));
        }
        if let Some(max) = rule.max_occurs {
            if found > max {
                out.push(format!(
                    "{}: expected at most {} <{}>, found {}",
                    path, max, name, found
                ));
            }
        }
    }
}

fn check_value(value: &str, rule: &AttributeRule, path: &str, out: &mut Vec<String>) {
    if value.is_empty() {
        if !rule.allow_empty && rule.kind.is_some() {
            out.push(format!("{}: empty value", path));
        }
        return;
    }
    if let Some(kind) = rule.kind {
        if !kind.matches(value) {
            out.push(format!(
                "{}: expected {}, found {:?}",
                path,
                kind.as_str(),
                quote(value)
            ));
        }
    }
}

fn is_namespace_declaration(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:") || key.starts_with("xsi:")
}

fn quote(value: &str) -> String {
    match value.char_indices().nth(QUOTE_LIMIT) {
        Some((end, _)) => format!("{}...", &value[..end]),
        None => value.to_string(),
    }
}
