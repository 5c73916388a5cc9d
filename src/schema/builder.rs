//! Schema inference from sample documents
//!
//! Accumulates statistics over every element seen at each position of the tree and
//! builds the final [`Schema`] once at the end, instead of building one schema per
//! sample and merging them.

use std::collections::{BTreeMap, BTreeSet};

use crate::document::{Document, Element};
use crate::schema::{AttributeRule, ChildRule, ElementSchema, Schema, ValueKind};

/// Statistics about the values seen for one attribute or for element text
#[derive(Debug, Default)]
struct ValueStats {
    kind: Option<ValueKind>,
    saw_empty: bool,
    count: usize,
}

impl ValueStats {
    fn add(&mut self, value: &str) {
        self.count += 1;
        match ValueKind::detect(value) {
            Some(kind) => {
                self.kind = Some(match self.kind {
                    Some(existing) => existing.unify(kind),
                    None => kind,
                });
            }
            None => self.saw_empty = true,
        }
    }

    fn build(&self, required: bool) -> AttributeRule {
        AttributeRule {
            kind: self.kind,
            required,
            allow_empty: self.saw_empty,
        }
    }
}

/// Accumulates statistics for every element sharing one path in the tree
#[derive(Debug, Default)]
struct ElementBuilder {
    sample_count: usize,
    attributes: BTreeMap<String, ValueStats>,
    // Names present on every sample so far; `None` before the first sample
    always_present: Option<BTreeSet<String>>,
    text: ValueStats,
    children: BTreeMap<String, ChildStats>,
}

#[derive(Debug, Default)]
struct ChildStats {
    min: Option<usize>,
    max: usize,
    builder: ElementBuilder,
}

impl ElementBuilder {
    fn add_element(&mut self, element: &Element) {
        self.sample_count += 1;

        let mut current_keys = BTreeSet::new();
        for (key, value) in element.attributes() {
            if key == "xmlns" || key.starts_with("xmlns:") || key.starts_with("xsi:") {
                continue;
            }
            let local = key.rsplit(':').next().unwrap_or(key).to_string();
            self.attributes.entry(local.clone()).or_default().add(value);
            current_keys.insert(local);
        }
        self.always_present = Some(match self.always_present.take() {
            None => current_keys,
            Some(req) => req.intersection(&current_keys).cloned().collect(),
        });

        if let Some(text) = element.text() {
            self.text.add(text);
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for child in element.children() {
            *counts.entry(child.local_name()).or_insert(0) += 1;
            // First sample of a new child name: earlier parents had none of it
            let earlier_samples = self.sample_count - 1;
            let stats = self
                .children
                .entry(child.local_name().to_string())
                .or_insert_with(|| ChildStats {
                    min: if earlier_samples > 0 { Some(0) } else { None },
                    ..ChildStats::default()
                });
            stats.builder.add_element(child);
        }

        for (name, stats) in self.children.iter_mut() {
            let found = counts.get(name.as_str()).copied().unwrap_or(0);
            stats.min = Some(stats.min.map_or(found, |m| m.min(found)));
            stats.max = stats.max.max(found);
        }
    }

    fn build(self) -> ElementSchema {
        let required = self.always_present.unwrap_or_default();
        let attributes = self
            .attributes
            .iter()
            .map(|(name, stats)| (name.clone(), stats.build(required.contains(name))))
            .collect();

        let text = if self.text.count > 0 {
            Some(self.text.build(self.text.count == self.sample_count))
        } else {
            None
        };

        let children = self
            .children
            .into_iter()
            .map(|(name, stats)| {
                let rule = ChildRule {
                    min_occurs: stats.min.unwrap_or(0),
                    max_occurs: if stats.max <= 1 { Some(stats.max) } else { None },
                    schema: stats.builder.build(),
                };
                (name, rule)
            })
            .collect();

        ElementSchema {
            attributes,
            children,
            text,
            open: false,
        }
    }
}

/// Infers a [`Schema`] from one or more known-good documents.
///
/// Attributes present on every sample element become required, child occurrence
/// bounds are the observed minimum and maximum (a maximum above one is left
/// unbounded), and value kinds are unified across samples.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    root: Option<String>,
    root_builder: ElementBuilder,
}

impl SchemaBuilder {
    /// Create a new empty schema builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, accumulating statistics.
    ///
    /// Documents with a different root element than the first one are ignored.
    pub fn add_document(&mut self, document: &Document) {
        let root = document.root();
        match &self.root {
            Some(name) if name != root.local_name() => {
                tracing::warn!(
                    expected = name.as_str(),
                    found = root.local_name(),
                    "skipping sample with a different root element"
                );
                return;
            }
            Some(_) => {}
            None => self.root = Some(root.local_name().to_string()),
        }
        self.root_builder.add_element(root);
    }

    /// Number of documents accumulated so far.
    pub fn sample_count(&self) -> usize {
        self.root_builder.sample_count
    }

    /// Build the final schema from accumulated statistics.
    pub fn build(self) -> Schema {
        Schema {
            root: self.root.unwrap_or_else(|| "mvnx".to_string()),
            element: self.root_builder.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(xml: &str) -> Document {
        Document::parse_str(xml, None).unwrap()
    }

    #[test]
    fn test_required_attributes_are_intersection() {
        let mut builder = SchemaBuilder::new();
        builder.add_document(&doc(r#"<mvnx version="4" build="a"/>"#));
        builder.add_document(&doc(r#"<mvnx version="3"/>"#));
        let schema = builder.build();

        assert_eq!(schema.root, "mvnx");
        let version = &schema.element.attributes["version"];
        assert!(version.required);
        assert_eq!(version.kind, Some(ValueKind::Integer));
        assert!(!schema.element.attributes["build"].required);
    }

    #[test]
    fn test_child_bounds_and_text_kinds() {
        let mut builder = SchemaBuilder::new();
        builder.add_document(&doc(
            r#"<frames><frame ms="0" index=""><position>1 2 3</position></frame><frame ms="8" index="0"><position>4 5 6</position></frame></frames>"#,
        ));
        let schema = builder.build();

        let frame = &schema.element.children["frame"];
        assert_eq!(frame.min_occurs, 2);
        assert_eq!(frame.max_occurs, None);

        let index = &frame.schema.attributes["index"];
        assert_eq!(index.kind, Some(ValueKind::Integer));
        assert!(index.allow_empty);

        let position = &frame.schema.children["position"];
        assert_eq!(position.min_occurs, 1);
        assert_eq!(position.max_occurs, Some(1));
        let text = position.schema.text.as_ref().unwrap();
        assert_eq!(text.kind, Some(ValueKind::FloatVector));
        assert!(text.required);
    }

    #[test]
    fn test_child_missing_from_some_parents_is_optional() {
        let mut builder = SchemaBuilder::new();
        builder.add_document(&doc(
            r#"<frames><frame/><frame><contacts>1 0</contacts></frame><frame/></frames>"#,
        ));
        let schema = builder.build();

        let contacts = &schema.element.children["frame"].schema.children["contacts"];
        assert_eq!(contacts.min_occurs, 0);
        assert_eq!(contacts.max_occurs, Some(1));
    }

    #[test]
    fn test_inferred_schema_accepts_its_samples() {
        let samples = [
            r#"<mvnx version="4"><subject frameRate="60"><frames segmentCount="2"><frame ms="0" tc="00:00:00:00"><position>0 0 0</position></frame></frames></subject></mvnx>"#,
            r#"<mvnx version="4"><subject frameRate="120"><frames segmentCount="3"><frame ms="8" tc="00:00:00:01"><position>0.5 0 1</position></frame><frame ms="16" tc="00:00:00:02"><position>1</position></frame></frames></subject></mvnx>"#,
        ];
        let mut builder = SchemaBuilder::new();
        for s in &samples {
            builder.add_document(&doc(s));
        }
        assert_eq!(builder.sample_count(), 2);
        let schema = builder.build();

        for s in &samples {
            assert!(schema.is_valid(&doc(s)), "{:?}", schema.violations(&doc(s)));
        }
        assert!(!schema.is_valid(&doc(r#"<mvnx version="4"><subject frameRate="60"/></mvnx>"#)));
    }
}
