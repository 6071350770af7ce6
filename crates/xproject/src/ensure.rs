//! Walks an element path below the root element, creating what is missing.

use tracing::debug;
use xproject_dom::{Document, Node};

use crate::error::ProjectionError;

/// Returns the element addressed by `segments`, creating elements on the
/// way. Starts at the root element (created from the first segment when
/// the document has none). A segment equal to the current element's name
/// is consumed without moving; otherwise the first descendant with that
/// name in document order is entered, or a new child is appended.
pub fn ensure_element(document: &Document, segments: &[String]) -> Result<Node, ProjectionError> {
    let mut current = match document.root_element() {
        Some(root) => root,
        None => {
            let first = segments.first().ok_or_else(|| {
                ProjectionError::ArgumentShape("document has no root element".to_string())
            })?;
            debug!(element = %first, "creating root element");
            let root = document.create_element(first)?;
            document.set_root_element(&root)?
        }
    };
    for segment in segments {
        if current.name().as_deref() == Some(segment.as_str()) {
            continue;
        }
        current = match current.descendants_named(segment).into_iter().next() {
            Some(found) => found,
            None => {
                debug!(element = %segment, "creating element");
                let created = document.create_element(segment)?;
                current.append_child(&created)?
            }
        };
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(path: &str) -> Vec<String> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_creates_root_and_children() {
        let doc = Document::new();
        let leaf = ensure_element(&doc, &segments("/root/child")).unwrap();
        assert_eq!(leaf.name().as_deref(), Some("child"));
        assert_eq!(doc.to_xml().unwrap(), "<root><child/></root>");
    }

    #[test]
    fn test_reuses_existing_elements() {
        let doc = Document::parse("<root><child>x</child></root>").unwrap();
        let leaf = ensure_element(&doc, &segments("/root/child")).unwrap();
        assert_eq!(leaf.text_content(), "x");
        assert_eq!(doc.root_element().unwrap().child_elements().len(), 1);
    }

    #[test]
    fn test_first_descendant_wins() {
        let doc = Document::parse("<root><a><target id=\"1\"/></a><target id=\"2\"/></root>").unwrap();
        let found = ensure_element(&doc, &segments("/root/target")).unwrap();
        assert_eq!(found.attribute("id").as_deref(), Some("1"));
    }

    #[test]
    fn test_repeated_name_is_consumed_in_place() {
        let doc = Document::parse("<root/>").unwrap();
        ensure_element(&doc, &segments("/root/root/x")).unwrap();
        assert_eq!(doc.to_xml().unwrap(), "<root><x/></root>");
    }

    #[test]
    fn test_foreign_root_keeps_existing_root() {
        let doc = Document::parse("<a/>").unwrap();
        ensure_element(&doc, &segments("/b/c")).unwrap();
        assert_eq!(doc.to_xml().unwrap(), "<a><b><c/></b></a>");
    }

    #[test]
    fn test_empty_path_needs_root() {
        assert!(matches!(
            ensure_element(&Document::new(), &[]),
            Err(ProjectionError::ArgumentShape(_))
        ));
        let doc = Document::parse("<r/>").unwrap();
        assert_eq!(ensure_element(&doc, &[]).unwrap(), doc.root_element().unwrap());
    }
}
