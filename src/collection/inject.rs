use std::path::Path;

use tracing::debug;

use super::model::{BodyMode, Collection, FileRef, FileSource, Item, Request};

/// Form field that carries the uploaded package.
pub const PACKAGE_FIELD: &str = "package";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionReport {
    pub requests_visited: usize,
    pub form_fields_rewritten: usize,
    pub file_bodies_rewritten: usize,
}

impl InjectionReport {
    pub fn rewritten(&self) -> usize {
        self.form_fields_rewritten + self.file_bodies_rewritten
    }
}

/// Points every upload in the collection at `fixture`.
///
/// POST requests with a `formdata` body get their `package` file fields
/// rewritten; any other request whose body mode is `file` gets its body file
/// replaced. Everything else is left as is, so applying this twice is the same
/// as applying it once.
pub fn inject_fixture(collection: &mut Collection, fixture: &Path) -> InjectionReport {
    let fixture = fixture.to_string_lossy().into_owned();
    let mut report = InjectionReport::default();
    let mut stack: Vec<&mut Item> = collection.item.iter_mut().rev().collect();

    while let Some(node) = stack.pop() {
        let Item {
            item: children,
            request,
            ..
        } = node;

        if let Some(children) = children {
            stack.extend(children.iter_mut().rev());
            continue;
        }

        if let Some(request) = request {
            report.requests_visited += 1;
            inject_request(request, &fixture, &mut report);
        }
    }

    debug!(
        requests = report.requests_visited,
        form_fields = report.form_fields_rewritten,
        file_bodies = report.file_bodies_rewritten,
        "fixture injected"
    );
    report
}

fn inject_request(request: &mut Request, fixture: &str, report: &mut InjectionReport) {
    let is_post = request.method.eq_ignore_ascii_case("POST");
    let Some(body) = request.body.as_mut() else {
        return;
    };

    match body.mode() {
        Some(BodyMode::Formdata) if is_post => {
            for field in body.formdata.iter_mut().flatten() {
                if field.key == PACKAGE_FIELD && field.is_file() {
                    field.src = Some(FileSource::Single(fixture.to_string()));
                    report.form_fields_rewritten += 1;
                }
            }
        }
        Some(BodyMode::File) => {
            body.file.get_or_insert_with(FileRef::default).src = Some(fixture.to_string());
            report.file_bodies_rewritten += 1;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    const FIXTURE: &str = "/abs/test-files/test-package.zip";

    fn collection(value: Value) -> Collection {
        serde_json::from_value(value).unwrap()
    }

    fn upload(name: &str) -> Value {
        json!({
            "name": name,
            "request": {
                "method": "POST",
                "url": "{{HOST}}/packages",
                "body": {"mode": "formdata", "formdata": [
                    {"key": "name", "type": "text", "value": "demo"},
                    {"key": "package", "type": "file", "src": "placeholder"}
                ]}
            }
        })
    }

    #[test]
    fn rewrites_package_form_field() {
        let mut coll = collection(json!({"item": [upload("upload")]}));

        let report = inject_fixture(&mut coll, Path::new(FIXTURE));

        let written = serde_json::to_value(&coll).unwrap();
        assert_eq!(
            written["item"][0]["request"]["body"]["formdata"][1]["src"],
            json!(FIXTURE)
        );
        assert_eq!(
            written["item"][0]["request"]["body"]["formdata"][0],
            json!({"key": "name", "type": "text", "value": "demo"})
        );
        assert_eq!(report.form_fields_rewritten, 1);
        assert_eq!(report.file_bodies_rewritten, 0);
    }

    #[test]
    fn visits_every_leaf_of_nested_folders() {
        let mut coll = collection(json!({"item": [
            upload("top"),
            {"name": "a", "item": [
                {"name": "b", "item": [
                    {"name": "c", "item": [upload("deep")]}
                ]},
                upload("mid"),
                {"name": "get", "request": {"method": "GET", "url": "{{HOST}}/x"}}
            ]},
            {"name": "empty", "item": []}
        ]}));

        let report = inject_fixture(&mut coll, Path::new(FIXTURE));

        assert_eq!(report.requests_visited, 4);
        assert_eq!(report.form_fields_rewritten, 3);
        let written = serde_json::to_value(&coll).unwrap();
        assert_eq!(
            written["item"][1]["item"][0]["item"][0]["item"][0]["request"]["body"]["formdata"][1]
                ["src"],
            json!(FIXTURE)
        );
    }

    #[test]
    fn replaces_file_body_regardless_of_method() {
        let mut coll = collection(json!({"item": [
            {"name": "put", "request": {
                "method": "PUT",
                "url": "{{HOST}}/raw",
                "body": {"mode": "file", "file": {"src": "old.zip"}}
            }},
            {"name": "post-missing-file", "request": {
                "method": "POST",
                "url": "{{HOST}}/raw",
                "body": {"mode": "file"}
            }}
        ]}));

        let report = inject_fixture(&mut coll, Path::new(FIXTURE));

        let written = serde_json::to_value(&coll).unwrap();
        assert_eq!(written["item"][0]["request"]["body"]["file"]["src"], json!(FIXTURE));
        assert_eq!(written["item"][1]["request"]["body"]["file"]["src"], json!(FIXTURE));
        assert_eq!(report.file_bodies_rewritten, 2);
    }

    #[test]
    fn leaves_non_matching_shapes_untouched() {
        let source = json!({"item": [
            {"name": "put-form", "request": {
                "method": "PUT",
                "url": "{{HOST}}/p",
                "body": {"mode": "formdata", "formdata": [
                    {"key": "package", "type": "file", "src": "keep.zip"}
                ]}
            }},
            {"name": "other-key", "request": {
                "method": "POST",
                "url": "{{HOST}}/p",
                "body": {"mode": "formdata", "formdata": [
                    {"key": "archive", "type": "file", "src": "keep.zip"},
                    {"key": "package", "type": "text", "value": "name"}
                ]}
            }},
            {"name": "raw", "request": {
                "method": "POST",
                "url": "{{HOST}}/p",
                "body": {"mode": "raw", "raw": "{}"}
            }},
            {"name": "no-body", "request": {"method": "DELETE", "url": "{{HOST}}/p"}}
        ]});
        let mut coll = collection(source.clone());

        let report = inject_fixture(&mut coll, Path::new(FIXTURE));

        assert_eq!(report.rewritten(), 0);
        assert_eq!(report.requests_visited, 4);
        assert_eq!(serde_json::to_value(&coll).unwrap(), source);
    }

    #[test]
    fn lowercase_post_is_still_an_upload() {
        let mut coll = collection(json!({"item": [{
            "name": "upload",
            "request": {
                "method": "post",
                "url": "{{HOST}}/packages",
                "body": {"mode": "formdata", "formdata": [
                    {"key": "package", "type": "file", "src": ["a.zip", "b.zip"]}
                ]}
            }
        }]}));

        inject_fixture(&mut coll, Path::new(FIXTURE));

        let written = serde_json::to_value(&coll).unwrap();
        assert_eq!(
            written["item"][0]["request"]["body"]["formdata"][0]["src"],
            json!(FIXTURE)
        );
    }

    #[test]
    fn injection_is_idempotent() {
        let mut once = collection(json!({"item": [
            upload("a"),
            {"name": "f", "item": [upload("b")]}
        ]}));
        inject_fixture(&mut once, Path::new(FIXTURE));
        let after_once = serde_json::to_value(&once).unwrap();

        inject_fixture(&mut once, Path::new(FIXTURE));
        let after_twice = serde_json::to_value(&once).unwrap();

        assert_eq!(after_once, after_twice);
    }

    #[test]
    fn empty_collection_is_a_no_op() {
        let mut coll = Collection::default();
        let report = inject_fixture(&mut coll, Path::new(FIXTURE));
        assert_eq!(report, InjectionReport::default());
    }
}
