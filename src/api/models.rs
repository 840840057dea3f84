//! Canvas resources consumed by the sync pipeline.
//!
//! Only the fields the tool actually reads are modelled; everything else in
//! the API payloads is ignored during deserialization.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::download::sanitize_filename;

/// Module item type that references a course file.
pub const FILE_ITEM_TYPE: &str = "File";

/// Workflow state of a published course.
const AVAILABLE_STATE: &str = "available";

/// A course visible to the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Canvas course id.
    pub id: u64,
    /// Course display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Enrollment term, when the API includes it.
    #[serde(default)]
    pub term: Option<Term>,
    /// Canvas workflow state (`available`, `unpublished`, ...).
    #[serde(default)]
    pub workflow_state: Option<String>,
}

/// Enrollment term attached to a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    #[serde(default)]
    pub name: Option<String>,
}

impl Course {
    /// Returns the course name, falling back to `course-<id>`.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .map_or_else(|| format!("course-{}", self.id), str::to_string)
    }

    /// Returns the term name or an empty string.
    #[must_use]
    pub fn term_name(&self) -> &str {
        self.term
            .as_ref()
            .and_then(|term| term.name.as_deref())
            .unwrap_or("")
    }

    /// Whether the course is published.
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.workflow_state.as_deref() == Some(AVAILABLE_STATE)
    }
}

/// A named, ordered grouping of course content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Canvas module id.
    pub id: u64,
    /// Module name.
    #[serde(default)]
    pub name: Option<String>,
    /// 1-based position within the course.
    #[serde(default)]
    pub position: Option<i64>,
    /// Embedded items. `None` when the API omitted them (large modules).
    #[serde(default)]
    pub items: Option<Vec<ModuleItem>>,
}

impl Module {
    /// Sanitized directory name for this module's files.
    ///
    /// Both the download coordinator and the merge engine derive module
    /// directories from this, so the two always agree.
    #[must_use]
    pub fn dir_name(&self) -> String {
        let raw = self
            .name
            .clone()
            .unwrap_or_else(|| format!("module-{}", self.id));
        let sanitized = sanitize_filename(&raw);
        if sanitized.is_empty() {
            format!("module-{}", self.id)
        } else {
            sanitized
        }
    }

    /// Items embedded in the module (empty when absent).
    #[must_use]
    pub fn items(&self) -> &[ModuleItem] {
        self.items.as_deref().unwrap_or_default()
    }

    /// Merge ordering: `(position, name)` ascending.
    #[must_use]
    pub fn merge_order(&self, other: &Self) -> Ordering {
        (self.position.unwrap_or(0), self.name.as_deref().unwrap_or(""))
            .cmp(&(other.position.unwrap_or(0), other.name.as_deref().unwrap_or("")))
    }
}

/// A single entry within a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleItem {
    /// Canvas module item id.
    pub id: u64,
    /// Item type (`File`, `Page`, `Assignment`, ...).
    #[serde(rename = "type")]
    pub item_type: String,
    /// Id of the referenced content (the file id for `File` items).
    #[serde(default)]
    pub content_id: Option<u64>,
    /// Item title as shown in the module.
    #[serde(default)]
    pub title: Option<String>,
    /// 1-based position within the module.
    #[serde(default)]
    pub position: Option<i64>,
}

impl ModuleItem {
    /// Whether the item references a course file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.item_type == FILE_ITEM_TYPE
    }

    /// Ordering within a module: `(position, title)` ascending.
    #[must_use]
    pub fn merge_order(&self, other: &Self) -> Ordering {
        (self.position.unwrap_or(0), self.title.as_deref().unwrap_or(""))
            .cmp(&(other.position.unwrap_or(0), other.title.as_deref().unwrap_or("")))
    }
}

/// File metadata resolved for a `File` module item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Canvas file id.
    pub id: u64,
    /// Name shown to users; used as the on-disk filename.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Pre-signed download URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// Last modification timestamp; the change-detection key.
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl FileInfo {
    /// Sanitized on-disk filename, falling back to the file id.
    #[must_use]
    pub fn file_name(&self) -> String {
        let raw = self
            .display_name
            .clone()
            .unwrap_or_else(|| self.id.to_string());
        let sanitized = sanitize_filename(&raw);
        if sanitized.is_empty() {
            self.id.to_string()
        } else {
            sanitized
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_module_deserializes_embedded_items() {
        let json = r#"{
            "id": 7,
            "name": "Week 1",
            "position": 1,
            "items_url": "https://canvas.test/api/v1/courses/1/modules/7/items",
            "items": [
                {"id": 70, "type": "File", "content_id": 700, "title": "Slides", "position": 1},
                {"id": 71, "type": "Page", "title": "Intro", "position": 2}
            ]
        }"#;
        let module: Module = serde_json::from_str(json).unwrap();
        assert_eq!(module.items().len(), 2);
        assert!(module.items()[0].is_file());
        assert!(!module.items()[1].is_file());
        assert_eq!(module.items()[1].content_id, None);
    }

    #[test]
    fn test_module_without_items_field_is_none() {
        let module: Module = serde_json::from_str(r#"{"id": 3, "name": "Big"}"#).unwrap();
        assert!(module.items.is_none());
        assert!(module.items().is_empty());
    }

    #[test]
    fn test_module_dir_name_sanitizes_and_falls_back() {
        let named: Module = serde_json::from_str(r#"{"id": 1, "name": "Week 1 / Intro"}"#).unwrap();
        assert_eq!(named.dir_name(), "Week 1 - Intro");

        let unnamed: Module = serde_json::from_str(r#"{"id": 9}"#).unwrap();
        assert_eq!(unnamed.dir_name(), "module-9");

        let blank: Module = serde_json::from_str(r#"{"id": 4, "name": "\u0001 "}"#).unwrap();
        assert_eq!(blank.dir_name(), "module-4");
    }

    #[test]
    fn test_module_merge_order_uses_position_then_name() {
        let a: Module = serde_json::from_str(r#"{"id": 1, "name": "B", "position": 1}"#).unwrap();
        let b: Module = serde_json::from_str(r#"{"id": 2, "name": "A", "position": 2}"#).unwrap();
        let c: Module = serde_json::from_str(r#"{"id": 3, "name": "A", "position": 1}"#).unwrap();
        let mut modules = vec![a, b, c];
        modules.sort_by(Module::merge_order);
        let ids: Vec<u64> = modules.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_course_helpers() {
        let course: Course = serde_json::from_str(
            r#"{"id": 12, "name": "Algebra", "term": {"name": "Fall"}, "workflow_state": "available"}"#,
        )
        .unwrap();
        assert_eq!(course.display_name(), "Algebra");
        assert_eq!(course.term_name(), "Fall");
        assert!(course.is_published());

        let bare: Course = serde_json::from_str(r#"{"id": 5}"#).unwrap();
        assert_eq!(bare.display_name(), "course-5");
        assert_eq!(bare.term_name(), "");
        assert!(!bare.is_published());
    }

    #[test]
    fn test_file_info_file_name_falls_back_to_id() {
        let info: FileInfo = serde_json::from_str(r#"{"id": 42, "url": null}"#).unwrap();
        assert_eq!(info.file_name(), "42");
    }
}
