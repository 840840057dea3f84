//! Sync a course from a mock server, then merge the downloaded PDFs.

use std::path::Path;

use canvas_dl_core::{
    CanvasClient, CourseSync, FileFilter, HttpClient, MergeScope, merge_pdfs, run_merges,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;

use support::pdf::{page_count, write_blank_pdf};
use support::socket_guard::start_mock_server_or_skip;

fn pdf_bytes(scratch: &Path, name: &str, pages: usize) -> Vec<u8> {
    let path = scratch.join(name);
    write_blank_pdf(&path, pages);
    std::fs::read(path).unwrap()
}

async fn mount_file(server: &MockServer, id: u64, name: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/files/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "display_name": name,
            "url": format!("{}/dl/{id}", server.uri()),
            "updated_at": "2024-05-01T08:00:00Z"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/dl/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_synced_course_merges_per_module_and_course() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let scratch = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/courses/3/modules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 2,
                "name": "Part B",
                "position": 2,
                "items": [{"id": 20, "type": "File", "content_id": 203, "title": "Summary", "position": 1}]
            },
            {
                "id": 1,
                "name": "Part A",
                "position": 1,
                "items": [
                    {"id": 10, "type": "File", "content_id": 102, "title": "Slides", "position": 1},
                    {"id": 11, "type": "File", "content_id": 101, "title": "Appendix", "position": 2},
                    {"id": 12, "type": "File", "content_id": 104, "title": "Code", "position": 3}
                ]
            }
        ])))
        .mount(&server)
        .await;
    mount_file(&server, 101, "Appendix.pdf", pdf_bytes(scratch.path(), "a.pdf", 1)).await;
    mount_file(&server, 102, "Slides.pdf", pdf_bytes(scratch.path(), "s.pdf", 2)).await;
    mount_file(&server, 203, "Summary.pdf", pdf_bytes(scratch.path(), "m.pdf", 3)).await;
    mount_file(&server, 104, "Code.py", b"print('hi')\n".to_vec()).await;

    let api = CanvasClient::new(&format!("{}/api/v1", server.uri()), "token").unwrap();
    let sync = CourseSync::new(api, HttpClient::new().unwrap(), 3).unwrap();
    let course_dir = scratch.path().join("Course");

    let report = sync
        .run(3, &course_dir, &FileFilter::default())
        .await
        .unwrap();
    assert_eq!(report.downloaded.len(), 4);

    let outputs = run_merges(&course_dir, &report.modules, MergeScope::Both).unwrap();
    let part_a = course_dir.join("Part A.merged.pdf");
    let part_b = course_dir.join("Part B.merged.pdf");
    let course = course_dir.join("course.merged.pdf");
    assert_eq!(outputs, vec![part_a.clone(), part_b.clone(), course.clone()]);

    assert_eq!(page_count(&part_a), 3);
    assert_eq!(page_count(&part_b), 3);
    assert_eq!(page_count(&course), 6);
}

#[test]
fn test_merge_skips_corrupt_inputs() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.pdf");
    let bad = dir.path().join("bad.pdf");
    write_blank_pdf(&good, 2);
    std::fs::write(&bad, b"%PDF-1.5 truncated").unwrap();
    let output = dir.path().join("out").join("merged.pdf");

    let appended = merge_pdfs(&[bad, good], &output).unwrap();

    assert_eq!(appended, 1);
    assert_eq!(page_count(&output), 2);
}

#[test]
fn test_merge_scope_none_writes_nothing() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("Week 1")).unwrap();
    write_blank_pdf(&dir.path().join("Week 1").join("a.pdf"), 1);
    let modules = vec![
        serde_json::from_value(json!({"id": 1, "name": "Week 1", "items": []})).unwrap(),
    ];

    let outputs = run_merges(dir.path(), &modules, MergeScope::None).unwrap();

    assert!(outputs.is_empty());
    assert!(!dir.path().join("course.merged.pdf").exists());
}
