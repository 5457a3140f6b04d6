//! Fragment-path resolution for `$ref` targets.
//!
//! A reference is a slash-separated path into the schema document. A leading
//! `#` (or an empty segment) resets the cursor to the document root; every
//! other segment selects a key in the current map. No escaping conventions
//! apply, so a segment containing `/` cannot be addressed.

use crate::diag::Diagnostics;
use crate::node::{Kind, NodeRef};

/// Walk `path` from `root`, returning the addressed node or a diagnostic
/// naming the segment that failed and the sub-path traversed to that point.
pub fn locate<'a>(root: NodeRef<'a>, path: &str) -> Result<NodeRef<'a>, Diagnostics> {
    let mut node = root;
    let mut offset = 0usize;
    for segment in path.split('/') {
        let end = offset + segment.len();
        if segment.is_empty() || segment == "#" {
            node = root;
        } else if node.kind() == Kind::Map {
            let next = node.get(segment);
            if !next.is_defined() {
                let mut erratum = Diagnostics::new();
                erratum.error(format!(
                    "\"{}\" is not in the map \"{}\" at line {}.",
                    segment,
                    &path[..end],
                    node.line()
                ));
                return Err(erratum);
            }
            node = next;
        } else {
            let mut erratum = Diagnostics::new();
            erratum.error(format!("\"{}\" is not a map.", &path[..end]));
            return Err(erratum);
        }
        offset = end + 1;
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Document;

    const SCHEMA: &str = "\
definitions:
  Coord:
    type: object
    properties:
      x: {type: number}
";

    #[test]
    fn resolves_fragment_paths() {
        let doc = Document::parse(SCHEMA).unwrap();
        let node = locate(doc.root(), "#/definitions/Coord").unwrap();
        assert_eq!(node.kind(), Kind::Map);
        assert_eq!(node.get("type").scalar(), "object");
    }

    #[test]
    fn hash_resets_to_root() {
        let doc = Document::parse(SCHEMA).unwrap();
        let node = locate(doc.root(), "#/definitions/#/definitions/Coord").unwrap();
        assert_eq!(node.get("type").scalar(), "object");
    }

    #[test]
    fn missing_key_names_segment_and_prefix() {
        let doc = Document::parse(SCHEMA).unwrap();
        let err = locate(doc.root(), "#/definitions/Nope").unwrap_err();
        let text = &err.iter().next().unwrap().text;
        assert!(text.contains("\"Nope\""), "{text}");
        assert!(text.contains("#/definitions/Nope"), "{text}");
    }

    #[test]
    fn descending_through_a_scalar_fails() {
        let doc = Document::parse(SCHEMA).unwrap();
        let err = locate(doc.root(), "#/definitions/Coord/type/deeper").unwrap_err();
        let text = &err.iter().next().unwrap().text;
        assert!(text.contains("is not a map"), "{text}");
        assert!(!err.is_ok());
    }
}
