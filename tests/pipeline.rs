//! Integration tests for the task pipeline

mod common;

use common::{site, Project};
use sprocket::error::{ExecutionError, SprocketError};
use sprocket::runner::{execute, TaskKind, TaskName};
use sprocket::tasks::revision::Manifest;
use sprocket::watch::{self, WatchTable};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

fn manifest(project: &Project) -> Manifest {
    Manifest::load(&project.root().join("build/rev-manifest.json"))
        .unwrap()
        .expect("manifest written")
}

#[test]
fn test_build_empty_project() {
    let project = Project::new();
    let report = execute(TaskName::Build, &project.context()).unwrap();

    assert!(report.is_success());
    assert!(manifest(&project).is_empty());
    // the grid partial is generated before the build
    assert!(project.exists("src/style/utils/smart-grid.scss"));
}

#[test]
fn test_html_includes_are_expanded() {
    let project = site();
    execute(TaskName::Leaf(TaskKind::Html), &project.context()).unwrap();

    let page = project.read("build/index.html");
    assert!(page.contains("<header>Welcome</header>"));
    assert!(!page.contains("@@include"));
    // partials are not pages of their own
    assert!(!project.exists("build/partials/header.html"));
}

#[test]
fn test_scripts_are_bundled_into_one_file() {
    let project = site();
    execute(TaskName::Leaf(TaskKind::Script), &project.context()).unwrap();

    assert_eq!(project.list("build/js"), vec!["main.js", "main.js.map"]);
    let bundle = project.read("build/js/main.js");
    assert!(bundle.contains("hello"));
    assert!(bundle.contains("console.log"));
    assert!(bundle.ends_with("//# sourceMappingURL=main.js.map\n"));
}

#[test]
fn test_build_revisions_and_rewrites_references() {
    let project = site();
    execute(TaskName::Build, &project.context()).unwrap();

    let manifest = manifest(&project);
    assert_eq!(manifest.len(), 2);
    let css = manifest.get("css/main.css").unwrap().to_string();
    let js = manifest.get("js/main.js").unwrap().to_string();
    assert!(css.starts_with("css/main-") && css.ends_with(".css"));
    assert!(js.starts_with("js/main-") && js.ends_with(".js"));

    assert!(project.exists(&format!("build/{}", css)));
    assert!(!project.exists("build/css/main.css"));
    assert!(project.exists("build/fonts/sans/regular.woff2"));

    let page = project.read("build/index.html");
    assert!(page.contains(&format!("href=\"{}\"", css)));
    assert!(page.contains(&format!("src=\"{}\"", js)));
}

#[test]
fn test_build_is_reproducible() {
    let project = site();
    let ctx = project.context();

    execute(TaskName::Build, &ctx).unwrap();
    let first_files = project.list("build");
    let first_manifest = project.read("build/rev-manifest.json");
    let first_page = project.read("build/index.html");

    execute(TaskName::Build, &ctx).unwrap();
    assert_eq!(project.list("build"), first_files);
    assert_eq!(project.read("build/rev-manifest.json"), first_manifest);
    assert_eq!(project.read("build/index.html"), first_page);
}

#[test]
fn test_rewrite_is_idempotent() {
    let project = site();
    let ctx = project.context();
    execute(TaskName::Build, &ctx).unwrap();
    let page = project.read("build/index.html");

    execute(TaskName::Leaf(TaskKind::RevisionReplace), &ctx).unwrap();
    assert_eq!(project.read("build/index.html"), page);
}

#[test]
fn test_failed_style_skips_revision() {
    let project = site();
    project.write("src/style/main.scss", "body { color: $missing; }\n");

    let err = execute(TaskName::Build, &project.context()).unwrap_err();
    assert!(matches!(
        err,
        SprocketError::Execution(ExecutionError::TasksFailed {
            failed: 1,
            skipped: 2
        })
    ));

    // sibling transforms still ran
    assert!(project.exists("build/index.html"));
    assert!(project.exists("build/js/main.js"));
    assert!(!project.exists("build/rev-manifest.json"));
}

#[test]
fn test_style_change_routes_only_to_style() {
    let project = site();
    let table = WatchTable::from_paths(&project.config().paths).unwrap();

    assert_eq!(
        table.tasks_for(Path::new("src/style/utils/_vars.scss")),
        vec![TaskKind::Style]
    );
    assert_eq!(
        table.tasks_for(Path::new("src/partials/header.html")),
        vec![TaskKind::Html]
    );
}

#[test]
fn test_watch_rebuilds_changed_style() {
    let project = site();
    let ctx = project.context();
    let watcher_ctx = ctx.clone();
    let handle = thread::spawn(move || watch::watch(&watcher_ctx));

    // give the watcher time to register
    thread::sleep(Duration::from_millis(500));
    project.write("src/style/utils/_vars.scss", "$text: #444;\n");

    let deadline = Instant::now() + Duration::from_secs(10);
    while !project.exists("build/css/main.css") && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
    }

    ctx.request_shutdown();
    handle.join().unwrap().unwrap();

    assert!(project.read("build/css/main.css").contains("#444"));
    // only the style transform ran
    assert!(!project.exists("build/js/main.js"));
    assert!(!project.exists("build/index.html"));
}

#[test]
fn test_bundle_keeps_page_globals() {
    let project = Project::new();
    project.write(
        "src/js/menu.js",
        "function openMenu() { document.body.classList.add('open'); }\n",
    );
    project.write("src/js/site.js", "var siteName = 'acme';\n");
    execute(TaskName::Leaf(TaskKind::Script), &project.context()).unwrap();

    let bundle = project.read("build/js/main.js");
    assert!(bundle.contains("openMenu"), "{}", bundle);
    assert!(bundle.contains("siteName"), "{}", bundle);
}
