//! Post-build pipeline orchestration.
//!
//! Runs the three post-build steps in a fixed order against one build tree:
//!
//! ```text
//! 1. Reconcile   source/ → build/   (copy skipped assets back in)
//! 2. Convert     build/*.html → <template root>/*.twig
//! 3. Prune       build/ empty directories removed
//! ```
//!
//! The order matters. Conversion empties directories that pruning then
//! removes, and reconciliation fills directories that pruning must then
//! leave alone. A failure in step 1 or 2 stops the run: the build tree is
//! not fit for deployment. Step 3 never fails; it reports what it skipped.
//!
//! Progress is reported through an optional [`PipelineEvent`] channel, the
//! same way the CLI receives per-stage output from every long-running step.

use crate::config::SiteConfig;
use crate::convert::{self, Conversion, ConversionStatus, ConvertError, TemplateLayout};
use crate::prune::{self, PruneReport};
use crate::reconcile::{self, ReconcileError, ReconcileReport};
use crate::types::{IgnoredAssets, SiteResource};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Asset reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
    #[error("Template conversion failed: {0}")]
    Convert(#[from] ConvertError),
}

/// Progress reported while the pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Reconciled(ReconcileReport),
    Converted {
        resource: String,
        destination: PathBuf,
        status: ConversionStatus,
    },
    Pruned(PruneReport),
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub reconciled: ReconcileReport,
    pub conversions: Vec<Conversion>,
    pub pruned: PruneReport,
}

impl PipelineReport {
    pub fn moved_count(&self) -> usize {
        self.conversions
            .iter()
            .filter(|c| c.status == ConversionStatus::Moved)
            .count()
    }
}

/// The configured post-build pipeline for one source/build tree pair.
#[derive(Debug, Clone)]
pub struct PostBuildPipeline {
    config: SiteConfig,
    source_root: PathBuf,
    build_root: PathBuf,
}

impl PostBuildPipeline {
    pub fn new(config: SiteConfig, source_root: &Path, build_root: &Path) -> Self {
        Self {
            config,
            source_root: source_root.to_path_buf(),
            build_root: build_root.to_path_buf(),
        }
    }

    /// Pipeline rooted at `<project>/<source_dir>` and `<project>/<build_dir>`.
    pub fn for_project(config: SiteConfig, project_root: &Path) -> Self {
        let source_root = config.source_path(project_root);
        let build_root = config.build_path(project_root);
        Self {
            config,
            source_root,
            build_root,
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    pub fn ignored_assets(&self) -> IgnoredAssets {
        IgnoredAssets::from_config(&self.config)
    }

    pub fn template_layout(&self) -> TemplateLayout {
        TemplateLayout::from_config(&self.config, &self.build_root)
    }

    /// Step 1: copy skipped assets from the source tree.
    pub fn reconcile(&self) -> Result<ReconcileReport, ReconcileError> {
        reconcile::reconcile(&self.source_root, &self.build_root, &self.ignored_assets())
    }

    /// Step 2: move HTML resources under the template root.
    pub fn convert(&self, resources: &[SiteResource]) -> Result<Vec<Conversion>, ConvertError> {
        convert::convert_all(resources, &self.build_root, &self.template_layout())
    }

    /// Step 3: remove empty, unprotected directories.
    pub fn prune(&self) -> PruneReport {
        prune::prune(&self.build_root, &self.config.prune.protected)
    }

    /// Run all three steps in order.
    pub fn run(
        &self,
        resources: &[SiteResource],
        events: Option<Sender<PipelineEvent>>,
    ) -> Result<PipelineReport, PipelineError> {
        let emit = |event: PipelineEvent| {
            if let Some(tx) = &events {
                // A dropped receiver only means nobody is watching.
                let _ = tx.send(event);
            }
        };

        info!(
            source = %self.source_root.display(),
            build = %self.build_root.display(),
            resources = resources.len(),
            "post-build pipeline started"
        );

        let reconciled = self.reconcile()?;
        emit(PipelineEvent::Reconciled(reconciled));

        let conversions = self.convert(resources)?;
        for c in &conversions {
            emit(PipelineEvent::Converted {
                resource: c.resource.clone(),
                destination: c.destination.clone(),
                status: c.status,
            });
        }

        let pruned = self.prune();
        emit(PipelineEvent::Pruned(pruned));

        info!(
            converted = conversions.len(),
            pruned = pruned.removed,
            skipped = pruned.skipped,
            "post-build pipeline finished"
        );
        Ok(PipelineReport {
            reconciled,
            conversions,
            pruned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::sync::mpsc;
    use tempfile::TempDir;

    const TEMPLATES: &str = "wp/wp-content/themes/portfolio/templates";

    fn site(tmp: &TempDir) -> (PostBuildPipeline, PathBuf, PathBuf) {
        let (source, build) = source_and_build(tmp);
        let pipeline = PostBuildPipeline::for_project(SiteConfig::default(), tmp.path());
        (pipeline, source, build)
    }

    #[test]
    fn for_project_resolves_roots() {
        let pipeline = PostBuildPipeline::for_project(SiteConfig::default(), Path::new("/p"));
        assert_eq!(pipeline.source_root(), Path::new("/p/source"));
        assert_eq!(pipeline.build_root(), Path::new("/p/build"));
        assert_eq!(
            pipeline.template_layout().root,
            PathBuf::from(format!("/p/build/{TEMPLATES}"))
        );
    }

    #[test]
    fn runs_all_steps_in_order() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, source, build) = site(&tmp);
        write_file(&source, "wp/index.php", "<?php");
        write_file(&source, "legacy/contact.php", "<?php mail();");
        write_file(&build, "index.html", "home");
        write_file(&build, "about/index.html", "about");
        write_file(&build, "sitemap.xml", "<urlset/>");
        let resources = vec![
            SiteResource::new("about/index.html"),
            SiteResource::new("index.html"),
            SiteResource::new("sitemap.xml"),
        ];

        let report = pipeline.run(&resources, None).unwrap();

        assert_eq!(report.reconciled.subtree_files, 1);
        assert_eq!(report.reconciled.scattered_files, 1);
        assert_eq!(report.moved_count(), 2);
        // about/ emptied by conversion, then pruned
        assert_eq!(report.pruned.removed, 1);
        assert_eq!(
            files_under(&build),
            vec![
                "legacy/contact.php".to_string(),
                "sitemap.xml".to_string(),
                "wp/index.php".to_string(),
                format!("{TEMPLATES}/about/index.twig"),
                format!("{TEMPLATES}/index.twig"),
            ]
        );
    }

    #[test]
    fn reconciled_empty_directories_survive_pruning() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, source, build) = site(&tmp);
        make_dir(&source, "wp/wp-content/uploads");

        pipeline.run(&[], None).unwrap();

        assert!(build.join("wp/wp-content/uploads").is_dir());
    }

    #[test]
    fn second_run_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, source, build) = site(&tmp);
        write_file(&source, "wp/index.php", "<?php");
        write_file(&build, "works/detail.html", "work");
        let resources = vec![SiteResource::new("works/detail.html")];

        pipeline.run(&resources, None).unwrap();
        let after_first = snapshot_tree(&build);
        let second = pipeline.run(&resources, None).unwrap();

        assert_eq!(snapshot_tree(&build), after_first);
        assert_eq!(second.moved_count(), 0);
        assert_eq!(second.pruned, PruneReport::default());
    }

    #[test]
    fn conversion_failure_stops_before_pruning() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _, build) = site(&tmp);
        make_dir(&build, "empty");

        let result = pipeline.run(&[SiteResource::new("ghost.html")], None);

        assert!(matches!(result, Err(PipelineError::Convert(_))));
        assert!(build.join("empty").is_dir());
    }

    #[test]
    fn emits_events_per_step() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _, build) = site(&tmp);
        write_file(&build, "index.html", "home");
        let (tx, rx) = mpsc::channel();

        pipeline
            .run(&[SiteResource::new("index.html")], Some(tx))
            .unwrap();
        let events: Vec<PipelineEvent> = rx.iter().collect();

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], PipelineEvent::Reconciled(_)));
        assert!(matches!(
            &events[1],
            PipelineEvent::Converted { resource, status: ConversionStatus::Moved, .. }
                if resource == "index.html"
        ));
        assert!(matches!(events[2], PipelineEvent::Pruned(_)));
    }

    #[test]
    fn dropped_receiver_does_not_fail_run() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _, _) = site(&tmp);
        let (tx, rx) = mpsc::channel();
        drop(rx);

        assert!(pipeline.run(&[], Some(tx)).is_ok());
    }
}
