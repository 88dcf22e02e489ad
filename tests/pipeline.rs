//! End-to-end runs of the post-build pipeline against a scratch project.
//!
//! Each test lays out a project the way the renderer leaves it (a source
//! tree, a build tree and optionally `sitepress.toml`), then drives the
//! public API the same way the CLI does: load config, discover resources,
//! run the pipeline.

use sitepress::config;
use sitepress::convert::ConversionStatus;
use sitepress::pipeline::{PipelineEvent, PostBuildPipeline};
use sitepress::resources;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

const TEMPLATES: &str = "wp/wp-content/themes/portfolio/templates";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn files(root: &Path) -> Vec<String> {
    let mut out: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    out.sort();
    out
}

fn dirs(root: &Path) -> Vec<String> {
    let mut out: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_dir())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    out.sort();
    out
}

/// A rendered portfolio site: two pages, a feed, a theme and a legacy form.
fn rendered_project(tmp: &TempDir) {
    let root = tmp.path();
    write(root, "source/wp/index.php", "<?php get_header(); ?>");
    write(root, "source/wp/wp-content/themes/portfolio/style.css", "body {}");
    write(root, "source/legacy/contact.php", "<?php mail(); ?>");
    write(root, "source/index.html.slim", "h1 Home");

    write(root, "build/index.html", "<h1>Home</h1>");
    write(root, "build/about/index.html", "<h1>About</h1>");
    write(root, "build/feed.xml", "<rss/>");
    fs::create_dir_all(root.join("build/javascripts/vendor")).unwrap();
}

fn run(project: &Path) -> sitepress::pipeline::PipelineReport {
    let site_config = config::load_config(project).unwrap();
    let pipeline = PostBuildPipeline::for_project(site_config, project);
    let found = resources::discover(pipeline.build_root(), &pipeline.ignored_assets()).unwrap();
    pipeline.run(&found, None).unwrap()
}

#[test]
fn default_project_is_transformed_into_theme() {
    let tmp = TempDir::new().unwrap();
    rendered_project(&tmp);

    let report = run(tmp.path());

    let build = tmp.path().join("build");
    assert_eq!(
        files(&build),
        vec![
            "feed.xml".to_string(),
            "legacy/contact.php".to_string(),
            "wp/index.php".to_string(),
            "wp/wp-content/themes/portfolio/style.css".to_string(),
            format!("{TEMPLATES}/about/index.twig"),
            format!("{TEMPLATES}/index.twig"),
        ]
    );
    assert_eq!(report.reconciled.subtree_files, 2);
    assert_eq!(report.reconciled.scattered_files, 1);
    assert_eq!(report.moved_count(), 2);

    // about/ and javascripts/vendor/ were emptied or empty; both are gone.
    assert!(!build.join("about").exists());
    assert!(!build.join("javascripts").exists());
}

#[test]
fn templates_keep_rendered_content() {
    let tmp = TempDir::new().unwrap();
    rendered_project(&tmp);

    run(tmp.path());

    let template = tmp
        .path()
        .join("build")
        .join(TEMPLATES)
        .join("about/index.twig");
    assert_eq!(fs::read_to_string(template).unwrap(), "<h1>About</h1>");
}

#[test]
fn no_html_remains_and_no_empty_directory_survives() {
    let tmp = TempDir::new().unwrap();
    rendered_project(&tmp);

    run(tmp.path());

    let build = tmp.path().join("build");
    assert!(files(&build).iter().all(|f| !f.ends_with(".html")));
    for dir in dirs(&build) {
        let path = build.join(&dir);
        let protected = dir == "wp" || dir.ends_with(".git");
        let empty = fs::read_dir(&path).unwrap().next().is_none();
        assert!(protected || !empty, "empty directory survived: {dir}");
    }
}

#[test]
fn second_run_changes_nothing() {
    let tmp = TempDir::new().unwrap();
    rendered_project(&tmp);
    run(tmp.path());
    let build = tmp.path().join("build");
    let before = files(&build);

    let report = run(tmp.path());

    assert_eq!(files(&build), before);
    assert_eq!(report.moved_count(), 0);
    assert_eq!(report.pruned.removed, 0);
}

#[test]
fn project_config_changes_theme_and_protection() {
    let tmp = TempDir::new().unwrap();
    rendered_project(&tmp);
    fs::create_dir_all(tmp.path().join("build/keep/me")).unwrap();
    write(
        tmp.path(),
        "sitepress.toml",
        r#"
[theme]
name = "studio"
template_extension = "html.twig"

[prune]
protected = ["keep"]
"#,
    );

    run(tmp.path());

    let build = tmp.path().join("build");
    assert!(
        build
            .join("wp/wp-content/themes/studio/templates/index.html.twig")
            .is_file()
    );
    assert!(build.join("keep/me").is_dir());
    assert!(!build.join("javascripts").exists());
}

#[test]
fn events_arrive_in_step_order() {
    let tmp = TempDir::new().unwrap();
    rendered_project(&tmp);
    let site_config = config::load_config(tmp.path()).unwrap();
    let pipeline = PostBuildPipeline::for_project(site_config, tmp.path());
    let found = resources::discover(pipeline.build_root(), &pipeline.ignored_assets()).unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    pipeline.run(&found, Some(tx)).unwrap();
    let events: Vec<PipelineEvent> = rx.iter().collect();

    assert!(matches!(events.first(), Some(PipelineEvent::Reconciled(_))));
    assert!(matches!(events.last(), Some(PipelineEvent::Pruned(_))));
    let converted: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Converted {
                resource, status, ..
            } => Some((resource.as_str(), *status)),
            _ => None,
        })
        .collect();
    assert_eq!(
        converted,
        vec![
            ("about/index.html", ConversionStatus::Moved),
            ("index.html", ConversionStatus::Moved),
        ]
    );
}

#[test]
fn missing_build_tree_is_reported() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "source/wp/index.php", "x");

    let site_config = config::load_config(tmp.path()).unwrap();
    let pipeline = PostBuildPipeline::for_project(site_config, tmp.path());
    let result = resources::discover(pipeline.build_root(), &pipeline.ignored_assets());

    assert!(matches!(
        result,
        Err(resources::DiscoverError::MissingBuildTree(_))
    ));
}
