//! CLI tests for dashreport: exit codes, JSON payloads and a full render.

use assert_cmd::Command;
use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// A dashreport command isolated from the caller's configuration.
fn dashreport(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dashreport").expect("dashreport binary should exist");
    cmd.env_remove("DASHREPORT_CONFIG")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", home)
        .env("DASHREPORT_LOG", "warn");
    cmd
}

fn write_template(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..2)
        .map(|_| {
            let body = Content { operations: vec![] };
            let contents = doc.add_object(Stream::new(Dictionary::new(), body.encode().unwrap()));
            Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => contents,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Integer(842)],
            }))
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => Object::Integer(2) }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);
    doc.save(path).unwrap();
}

fn panel(title: &str) -> serde_json::Value {
    serde_json::json!({
        "classes": ["grid-cell"],
        "children": [{
            "classes": ["dashboard-panel"],
            "attrs": { "data-title": title },
            "children": [{
                "classes": ["panel-body"],
                "children": [{
                    "tag": "canvas",
                    "classes": ["vis-bar"],
                    "canvas": { "width": 16, "height": 8, "rgba": [20, 120, 200, 255] }
                }]
            }]
        }]
    })
}

fn write_view(path: &Path, panels: &[serde_json::Value]) {
    let mut children = vec![
        serde_json::json!({ "tag": "h1", "classes": ["dashboard-title"], "text": "Ops" }),
        serde_json::json!({ "classes": ["time-range-picker"], "text": "Last 7 days" }),
    ];
    children.extend(panels.iter().cloned());
    let view = serde_json::json!({
        "tag": "body",
        "children": [{
            "classes": ["dashboard-container"],
            "attrs": { "data-tenant": "Acme" },
            "children": children
        }]
    });
    std::fs::write(path, serde_json::to_vec(&view).unwrap()).unwrap();
}

#[test]
fn version_prints_name() {
    let home = TempDir::new().unwrap();
    dashreport(home.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("dashreport "));
}

#[test]
fn unknown_command_fails() {
    let home = TempDir::new().unwrap();
    dashreport(home.path())
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn plan_for_five_panels() {
    let home = TempDir::new().unwrap();
    let output = dashreport(home.path())
        .args(["plan", "--panels", "5", "--organization", "Acme"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["total_pages"], 6);
    assert_eq!(plan["footers"].as_array().unwrap().len(), 7);
    assert_eq!(plan["footers"][2]["text"], "Acme · Page 2 of 6");
    assert_eq!(plan["page_breaks"], serde_json::json!([1, 3]));
}

#[test]
fn check_config_reports_source() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("custom.toml");
    std::fs::write(&config, "organization = \"Acme\"\ncapture_scale = 2.0\n").unwrap();

    let output = dashreport(home.path())
        .args(["check-config", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());
    let resolved: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(resolved["source"], "cli_argument");
    assert_eq!(resolved["config"]["organization"], "Acme");
    assert_eq!(resolved["config"]["capture_scale"], 2.0);
}

#[test]
fn check_config_defaults_without_file() {
    let home = TempDir::new().unwrap();
    dashreport(home.path())
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"builtin_default\""));
}

#[test]
fn invalid_config_exits_11() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    std::fs::write(&config, "capture_scale = -1.0\n").unwrap();

    dashreport(home.path())
        .args(["check-config", "--config"])
        .arg(&config)
        .assert()
        .code(11)
        .stderr(predicate::str::contains("ERR_CONFIG"));

    dashreport(home.path())
        .env("DASHREPORT_CONFIG", home.path().join("missing.toml"))
        .arg("check-config")
        .assert()
        .code(11);
}

#[test]
fn render_writes_report() {
    let dir = TempDir::new().unwrap();
    let view = dir.path().join("view.json");
    let template = dir.path().join("template.pdf");
    let output = dir.path().join("report.pdf");
    let entries = dir.path().join("entries.json");
    write_view(&view, &[panel("Requests"), panel("Errors")]);
    write_template(&template);

    let result = dashreport(dir.path())
        .args(["render", "--no-toc", "--progress", "jsonl", "--view"])
        .arg(&view)
        .arg("--template")
        .arg(&template)
        .arg("--output")
        .arg(&output)
        .arg("--dump-entries")
        .arg(&entries)
        .output()
        .unwrap();
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let summary: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    assert!(summary["pdf_bytes"].as_u64().unwrap() > 0);
    assert!(String::from_utf8_lossy(&result.stderr).contains("modal_shown"));

    // Cover + one content page holding both panels + back page.
    let pdf = Document::load(&output).unwrap();
    assert_eq!(pdf.get_pages().len(), 3);

    let dumped: serde_json::Value = serde_json::from_slice(&std::fs::read(&entries).unwrap()).unwrap();
    let kinds: Vec<&str> = dumped
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"Visualization"));
    assert!(kinds.contains(&"visualizationTitle"));
}

#[test]
fn render_without_panels_exits_12() {
    let dir = TempDir::new().unwrap();
    let view = dir.path().join("view.json");
    let template = dir.path().join("template.pdf");
    write_view(&view, &[]);
    write_template(&template);

    dashreport(dir.path())
        .args(["render", "--progress", "none", "--view"])
        .arg(&view)
        .arg("--template")
        .arg(&template)
        .arg("--output")
        .arg(dir.path().join("report.pdf"))
        .assert()
        .code(12)
        .stderr(predicate::str::contains("no valid panels"));
    assert!(!dir.path().join("report.pdf").exists());
}
