// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-page extraction — copy one page and everything it references from a
// loaded `lopdf::Document` into a fresh single-page document.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use payseal_core::error::PaysealError;
use tracing::warn;

/// Page attributes a page may inherit from its ancestors in the page tree
/// (PDF 32000-1 §7.7.3.4).
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed page trees whose /Parent chain loops.
const MAX_TREE_DEPTH: usize = 64;

/// Build a standalone document containing only `page_id` from `source`.
///
/// The source is only borrowed; nothing in it is modified.
pub fn single_page_document(
    source: &Document,
    page_id: ObjectId,
) -> Result<Document, PaysealError> {
    let mut target = Document::with_version(source.version.clone());
    let pages_id = target.new_object_id();

    let new_page_id = clone_page_into(source, &mut target, page_id, pages_id)?;

    target.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(new_page_id)],
            "Count" => 1_i64,
        }),
    );
    let catalog_id = target.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    target.trailer.set("Root", Object::Reference(catalog_id));

    Ok(target)
}

/// Clone a page dictionary (and its referenced resources) from `source` into
/// `target` under the page tree node `pages_id`, returning the new page id.
///
/// Inheritable attributes missing on the page itself are resolved through the
/// source page tree and written onto the copy.
fn clone_page_into(
    source: &Document,
    target: &mut Document,
    page_id: ObjectId,
    pages_id: ObjectId,
) -> Result<ObjectId, PaysealError> {
    let page = source.get_dictionary(page_id).map_err(|err| {
        PaysealError::Document(format!("cannot read page object {page_id:?}: {err}"))
    })?;

    // Reserve the page's id first so back-references (e.g. annotation /P)
    // resolve to the copy instead of recursing.
    let new_page_id = target.new_object_id();
    let mut memo = BTreeMap::new();
    memo.insert(page_id, new_page_id);

    let mut cloned = clone_dictionary(source, target, page, &mut memo)?;

    for key in INHERITABLE {
        if cloned.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(source, page, key) {
            let value = deep_clone_object(source, target, value, &mut memo)?;
            cloned.set(key.to_vec(), value);
        }
    }

    cloned.set("Parent", Object::Reference(pages_id));
    target
        .objects
        .insert(new_page_id, Object::Dictionary(cloned));

    Ok(new_page_id)
}

/// Walk the /Parent chain looking for `key`.
fn inherited_attribute<'a>(
    source: &'a Document,
    page: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = source.get_dictionary(parent_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
    }
    None
}

/// Clone a dictionary entry by entry, skipping /Parent (patched by callers,
/// and following it would drag in the whole source page tree).
fn clone_dictionary(
    source: &Document,
    target: &mut Document,
    dict: &Dictionary,
    memo: &mut BTreeMap<ObjectId, ObjectId>,
) -> Result<Dictionary, PaysealError> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        if key == b"Parent" {
            continue;
        }
        let cloned_value = deep_clone_object(source, target, value, memo)?;
        new_dict.set(key.clone(), cloned_value);
    }
    Ok(new_dict)
}

/// Deep-clone one object, resolving references into `target`.
///
/// Every source object is copied at most once; `memo` maps source ids to
/// their copies, which also makes reference cycles terminate.
fn deep_clone_object(
    source: &Document,
    target: &mut Document,
    object: &Object,
    memo: &mut BTreeMap<ObjectId, ObjectId>,
) -> Result<Object, PaysealError> {
    match object {
        Object::Dictionary(dict) => Ok(Object::Dictionary(clone_dictionary(
            source, target, dict, memo,
        )?)),
        Object::Array(items) => {
            let mut new_items = Vec::with_capacity(items.len());
            for item in items {
                new_items.push(deep_clone_object(source, target, item, memo)?);
            }
            Ok(Object::Array(new_items))
        }
        Object::Reference(ref_id) => {
            if let Some(existing) = memo.get(ref_id) {
                return Ok(Object::Reference(*existing));
            }
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    let new_id = target.new_object_id();
                    memo.insert(*ref_id, new_id);
                    let cloned = deep_clone_object(source, target, referenced, memo)?;
                    target.objects.insert(new_id, cloned);
                    Ok(Object::Reference(new_id))
                }
                Err(err) => {
                    warn!(?ref_id, %err, "cannot resolve reference, using Null");
                    Ok(Object::Null)
                }
            }
        }
        Object::Stream(stream) => {
            let mut new_stream = stream.clone();
            new_stream.dict = clone_dictionary(source, target, &stream.dict, memo)?;
            Ok(Object::Stream(new_stream))
        }
        // Booleans, numbers, strings, names and null carry no references.
        other => Ok(other.clone()),
    }
}
