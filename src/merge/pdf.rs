//! Page-level PDF concatenation with lopdf.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, warn};

use super::MergeError;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Bound on `Parent` hops, guards against cyclic page trees.
const MAX_PAGE_TREE_DEPTH: usize = 64;

/// Dictionary types rebuilt for the output document.
const STRUCTURAL_TYPES: [&[u8]; 4] = [b"Catalog", b"Pages", b"Outlines", b"Outline"];

/// Concatenates every page of every readable input, in order, into `output`.
///
/// Inputs that fail to load, are encrypted or have no pages are skipped with
/// a warning. Returns the number of inputs appended; when that is zero no
/// output file is written.
///
/// # Errors
///
/// Returns [`MergeError::Io`] only when the output cannot be written.
pub fn merge_pdfs(inputs: &[PathBuf], output: &Path) -> Result<usize, MergeError> {
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut next_id: u32 = 1;
    let mut appended = 0usize;

    for input in inputs {
        let mut doc = match Document::load(input) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %input.display(), error = %e, "skipping unreadable PDF");
                continue;
            }
        };
        if doc.is_encrypted() {
            warn!(path = %input.display(), "skipping encrypted PDF");
            continue;
        }
        if doc.get_pages().is_empty() {
            warn!(path = %input.display(), "skipping PDF without pages");
            continue;
        }

        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &pages {
            flatten_inherited_attributes(&mut doc, page_id);
        }

        for (id, object) in std::mem::take(&mut doc.objects) {
            if !is_structural(&object) {
                objects.insert(id, object);
            }
        }
        debug!(path = %input.display(), pages = pages.len(), "appended");
        page_ids.extend(pages);
        appended += 1;
    }

    if appended == 0 {
        debug!(output = %output.display(), "nothing to merge, no output written");
        return Ok(0);
    }

    let mut document = build_document(objects, &page_ids, next_id);
    write_document(&mut document, output)?;
    debug!(output = %output.display(), inputs = appended, pages = page_ids.len(), "merged PDF written");
    Ok(appended)
}

fn build_document(
    objects: BTreeMap<ObjectId, Object>,
    page_ids: &[ObjectId],
    next_id: u32,
) -> Document {
    let mut document = Document::with_version("1.5");
    document.objects = objects;
    document.max_id = next_id;

    let pages_id = document.new_object_id();
    for &page_id in page_ids {
        if let Ok(page) = document
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
        {
            page.set("Parent", pages_id);
        }
    }

    let kids: Vec<Object> = page_ids.iter().copied().map(Object::Reference).collect();
    let count = i64::try_from(page_ids.len()).unwrap_or(i64::MAX);
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    document.renumber_objects();
    document.compress();
    document
}

fn write_document(document: &mut Document, output: &Path) -> Result<(), MergeError> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MergeError::io(parent, e))?;
    }
    let mut buffer = Vec::new();
    document
        .save_to(&mut buffer)
        .map_err(|e| MergeError::io(output, std::io::Error::other(e.to_string())))?;
    std::fs::write(output, buffer).map_err(|e| MergeError::io(output, e))
}

fn is_structural(object: &Object) -> bool {
    object
        .as_dict()
        .and_then(|dict| dict.get(b"Type"))
        .and_then(Object::as_name)
        .is_ok_and(|name| STRUCTURAL_TYPES.iter().any(|kind| *kind == name))
}

/// Copies inherited page attributes onto the page itself, since the page
/// tree they came from is dropped.
fn flatten_inherited_attributes(doc: &mut Document, page_id: ObjectId) {
    let inherited: Vec<(&[u8], Object)> = {
        let Ok(page) = doc.get_dictionary(page_id) else {
            return;
        };
        INHERITABLE_ATTRIBUTES
            .iter()
            .filter(|key| !page.has(key))
            .filter_map(|&key| find_inherited(doc, page, key).map(|value| (key, value)))
            .collect()
    };
    if inherited.is_empty() {
        return;
    }
    if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
}

fn find_inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::pdf::{page_count, write_blank_pdf};
    use tempfile::TempDir;

    #[test]
    fn test_merge_two_single_page_pdfs() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        write_blank_pdf(&a, 1);
        write_blank_pdf(&b, 1);
        let out = dir.path().join("out").join("merged.pdf");

        let appended = merge_pdfs(&[a, b], &out).unwrap();

        assert_eq!(appended, 2);
        assert_eq!(page_count(&out), 2);
    }

    #[test]
    fn test_merge_preserves_page_totals_across_inputs() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        write_blank_pdf(&a, 3);
        write_blank_pdf(&b, 2);
        let out = dir.path().join("merged.pdf");

        assert_eq!(merge_pdfs(&[a, b], &out).unwrap(), 2);
        assert_eq!(page_count(&out), 5);
    }

    #[test]
    fn test_merge_skips_invalid_inputs() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.pdf");
        let bad = dir.path().join("bad.pdf");
        write_blank_pdf(&good, 1);
        std::fs::write(&bad, b"this is not a pdf").unwrap();
        let missing = dir.path().join("missing.pdf");
        let out = dir.path().join("merged.pdf");

        let appended = merge_pdfs(&[bad, good, missing], &out).unwrap();

        assert_eq!(appended, 1);
        assert_eq!(page_count(&out), 1);
    }

    #[test]
    fn test_merge_with_no_valid_inputs_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.pdf");
        std::fs::write(&bad, b"%PDF-garbage").unwrap();
        let out = dir.path().join("merged.pdf");

        assert_eq!(merge_pdfs(&[bad], &out).unwrap(), 0);
        assert_eq!(merge_pdfs(&[], &out).unwrap(), 0);
        assert!(!out.exists());
    }

    #[test]
    fn test_is_structural_detects_catalog_and_pages() {
        let catalog = Object::Dictionary(dictionary! { "Type" => "Catalog" });
        let pages = Object::Dictionary(dictionary! { "Type" => "Pages" });
        let page = Object::Dictionary(dictionary! { "Type" => "Page" });
        assert!(is_structural(&catalog));
        assert!(is_structural(&pages));
        assert!(!is_structural(&page));
        assert!(!is_structural(&Object::Integer(1)));
    }
}
