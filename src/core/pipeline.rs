use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use crate::config::StoreConfig;
use crate::core::build::ProjectBuilder;
use crate::core::manifest::{slugify, ExerciseRecord, ManifestStore};
use crate::core::publish::Publisher;
use crate::core::rewrite::rewrite_entry_html;
use crate::core::stage::ArchiveStager;
use crate::error::Result;

/// Outcome of a completed publish run.
#[derive(Debug)]
pub struct PublishReport {
    pub record: ExerciseRecord,
    pub target: PathBuf,
    /// The dependency install step failed; the build proceeded anyway.
    pub install_warning: bool,
}

/// The linear publish pipeline: stage → build → rewrite → publish → merge.
/// Each stage fully completes before the next starts; a fatal error stops
/// the run and removes the scratch directory.
pub struct PublishPipeline {
    config: StoreConfig,
}

impl PublishPipeline {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, archive: &Path) -> Result<PublishReport> {
        let stager = ArchiveStager::new(self.config.scratch_dir());

        println!("📦 {} {}", "Staging".cyan(), archive.display());
        let staged = stager.stage(archive)?;

        let result = self.run_staged(archive, &staged.root);

        // Scratch state is removed on success and on every fatal error past
        // staging.
        match result {
            Ok(report) => {
                stager.cleanup()?;
                Ok(report)
            }
            Err(e) => {
                let _ = stager.cleanup();
                Err(e)
            }
        }
    }

    fn run_staged(&self, archive: &Path, project_root: &Path) -> Result<PublishReport> {
        let builder = ProjectBuilder::new(self.config.build.clone());

        let info = builder.read_descriptor(project_root, archive)?;
        let slug = slugify(&info.name)?;
        println!("📋 {} {} ({})", "Exercise".cyan(), info.name, slug.dimmed());

        if builder.inject_relative_base(project_root)? {
            println!("🔧 {}", "Patched build config for relative asset paths".dimmed());
        }

        let spinner = self.spinner(format!("Installing dependencies ({})", self.config.build.install_command));
        let install_ok = builder.install(project_root)?;
        spinner.finish_and_clear();
        if !install_ok {
            println!(
                "⚠️  {}",
                "Warning: dependency install failed, continuing with the build".yellow()
            );
        }

        let spinner = self.spinner(format!("Building ({})", self.config.build.build_command));
        let build_result = builder.build(project_root);
        spinner.finish_and_clear();
        build_result?;

        let output_dir = builder.find_output_dir(project_root)?;
        if rewrite_entry_html(&output_dir)? {
            println!("🔧 {}", "Rewrote entry document asset paths".dimmed());
        }

        let mut record = ExerciseRecord::built(&info.name, info.description.as_deref(), &slug);

        // On republish the original publish date survives, in the folder
        // metadata as well as in the manifest.
        let manifest = ManifestStore::new(self.config.store_root());
        if let Some(existing) = manifest.load().find(&record.id) {
            record.created = existing.created.clone();
        }

        let publisher = Publisher::new(self.config.store_root());
        if publisher.target_dir(&slug).exists() {
            println!("⚠️  {} {}", "Replacing existing exercise".yellow(), slug);
        }
        let target = publisher.publish(&output_dir, &record)?;

        let record = manifest.upsert(record)?;
        println!("📋 {}", "Manifest updated".green());

        Ok(PublishReport {
            record,
            target,
            install_warning: !install_ok,
        })
    }

    fn spinner(&self, message: String) -> ProgressBar {
        if !self.config.ui.progress_bars {
            let pb = ProgressBar::hidden();
            pb.set_message(message);
            return pb;
        }
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {wide_msg}")
                .expect("static template"),
        );
        pb.set_message(message);
        pb
    }
}
