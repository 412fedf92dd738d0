use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::convert::config::ConvertConfig;
use crate::convert::duplicates::{DuplicateReport, detect_duplicates};
use crate::convert::fs_ops::{create_dir, list_log_files};
use crate::convert::grammar::{Grammar, GrammarMode};
use crate::convert::hierarchy::rearrange;
use crate::convert::merge::merge_logs;
use crate::convert::stats::RunStats;
use crate::{normalize_name, print_bold, print_warning};

/// Converts one ZNC 1.4 log directory.
///
/// Creating the converter only reads the source directory.
/// Nothing is written until [`LogConvert::run`] is called.
#[derive(Debug)]
pub struct LogConvert {
    root: PathBuf,
    output: PathBuf,
    config: ConvertConfig,
    names: Vec<String>,
    report: DuplicateReport,
    abort: Arc<AtomicBool>,
}

impl LogConvert {
    /// Scan the source directory for log files and find case-insensitive duplicates.
    ///
    /// # Errors
    /// Returns an error if the source directory can't be read.
    pub fn new(root: PathBuf, config: ConvertConfig) -> Result<Self> {
        let output = crate::resolve_output_path(&config.output, &root);
        let names = list_log_files(&root, &config.extension)?;
        let report = detect_duplicates(&names);
        Ok(Self {
            root,
            output,
            config,
            names,
            report,
            abort: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Use the given flag to stop the run early. Checked before each file.
    #[must_use]
    pub fn with_abort_flag(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = abort;
        self
    }

    #[must_use]
    pub fn log_files(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub const fn duplicates(&self) -> &DuplicateReport {
        &self.report
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    #[must_use]
    pub const fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Run all stages: merge and copy into the output directory, then rearrange it.
    ///
    /// # Errors
    /// Returns an error if the output directory can't be used,
    /// a file can't be read or written, or a destination directory can't be created.
    pub fn run(&self, mode: GrammarMode) -> Result<RunStats> {
        let grammar = mode.grammar(&self.config.extension)?;
        let mut stats = RunStats {
            files_found: self.names.len(),
            duplicate_pairs: self.report.groups.len(),
            excess_groups: self.report.excess.len(),
            ..RunStats::default()
        };

        for group in &self.report.excess {
            print_warning!(
                "Warning: {} has more than two occurrences. Skipping merge, the copies will overwrite each other.",
                group.normalized
            );
        }

        if self.config.dryrun {
            self.print_plan(&grammar, &mut stats);
            return Ok(stats);
        }

        self.prepare_output()?;

        let merge = merge_logs(
            &self.report,
            &self.names,
            &self.root,
            &self.output,
            self.config.verbose,
            &self.abort,
        )?;
        stats.add_merge(&merge);
        if merge.aborted {
            return Ok(stats);
        }

        let rearranged = rearrange(&self.output, &grammar, self.config.verbose, &self.abort)?;
        stats.add_rearrange(&rearranged);
        if !rearranged.aborted {
            print_bold!("Done!");
        }

        Ok(stats)
    }

    /// Create the output directory.
    /// An existing non-empty directory is only reused when overwrite is enabled.
    fn prepare_output(&self) -> Result<()> {
        let same_dir = match (dunce::canonicalize(&self.output), dunce::canonicalize(&self.root)) {
            (Ok(output), Ok(root)) => output == root,
            _ => false,
        };
        if same_dir {
            anyhow::bail!("Output directory can't be the source directory: {}", self.output.display());
        }

        if self.output.exists() {
            if !self.output.is_dir() {
                anyhow::bail!("Output path is not a directory: {}", self.output.display());
            }
            let is_empty = fs::read_dir(&self.output)
                .with_context(|| format!("Failed to read output directory {}", self.output.display()))?
                .next()
                .is_none();
            if !is_empty && !self.config.overwrite {
                anyhow::bail!(
                    "Output directory {} already exists and is not empty. Use --force to reuse it.",
                    self.output.display()
                );
            }
            return Ok(());
        }

        create_dir(&self.output)
    }

    /// Print what would be merged, copied and moved without touching any files.
    fn print_plan(&self, grammar: &Grammar, stats: &mut RunStats) {
        let heading = "Dryrun:".cyan().bold();
        let mut staged: Vec<String> = Vec::new();

        for group in &self.report.groups {
            println!("{heading} merge {} + {} -> {}", group.first, group.second, group.output_name());
            staged.push(group.output_name());
            stats.merged += 1;
        }

        for name in &self.names {
            if self.report.is_duplicate(name) {
                continue;
            }
            let target = normalize_name(name);
            if self.report.is_excess(name) {
                stats.unmerged += 1;
            }
            if self.config.verbose {
                println!("{heading} copy {name} -> {target}");
            }
            staged.push(target);
            stats.copied += 1;
        }

        staged.sort_unstable();
        staged.dedup();
        for name in staged {
            match grammar.destination(&name) {
                Ok(destination) => {
                    println!("{heading} move {name} -> {}", destination.display());
                    stats.moved += 1;
                }
                Err(reason) => {
                    print_warning!("Warning: {name} {reason}. It will be skipped.");
                    stats.skipped += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).expect("Failed to write file");
    }

    fn config() -> ConvertConfig {
        ConvertConfig {
            auto: true,
            ..ConvertConfig::default()
        }
    }

    #[test]
    fn new_only_reads_source() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "#Chan_20160101.log", "[00:00:00] a\n");
        write_file(dir.path(), "#chan_20160101.log", "[00:00:01] b\n");

        let convert = LogConvert::new(dir.path().to_path_buf(), config()).unwrap();

        assert_eq!(convert.log_files().len(), 2);
        assert_eq!(convert.duplicates().groups.len(), 1);
        assert_eq!(convert.output_dir(), dir.path().join("output"));
        assert!(!convert.output_dir().exists());
    }

    #[test]
    fn run_converts_network_logs() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "#Chan_20160101.log", "[00:00:02] a\n");
        write_file(dir.path(), "#chan_20160101.log", "[00:00:01] b\n");
        write_file(dir.path(), "#rust_20160102.log", "[00:00:00] c\n");

        let convert = LogConvert::new(dir.path().to_path_buf(), config()).unwrap();
        let stats = convert.run(GrammarMode::Network).unwrap();

        assert_eq!(stats.files_found, 3);
        assert_eq!(stats.merged, 1);
        assert_eq!(stats.copied, 1);
        assert_eq!(stats.moved, 2);
        assert_eq!(stats.skipped, 0);
        let output = dir.path().join("output");
        assert_eq!(
            fs::read_to_string(output.join("#chan/2016-01-01.log")).unwrap(),
            "[00:00:01] b\n[00:00:02] a\n"
        );
        assert!(output.join("#rust/2016-01-02.log").is_file());
    }

    #[test]
    fn dryrun_writes_nothing() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "alice_freenode_#chan_20160101.log", "[00:00:00] a\n");
        write_file(dir.path(), "alice_freenode_#chan_2016010.log", "[00:00:00] b\n");

        let config = ConvertConfig {
            dryrun: true,
            ..config()
        };
        let convert = LogConvert::new(dir.path().to_path_buf(), config).unwrap();
        let stats = convert.run(GrammarMode::Global).unwrap();

        assert_eq!(stats.copied, 2);
        assert_eq!(stats.moved, 1);
        assert_eq!(stats.skipped, 1);
        assert!(!dir.path().join("output").exists());
    }

    #[test]
    fn dryrun_plans_excess_copies_once() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "#CHAN_20160101.log", "[00:00:00] a\n");
        write_file(dir.path(), "#Chan_20160101.log", "[00:00:00] b\n");
        write_file(dir.path(), "#chan_20160101.log", "[00:00:00] c\n");

        let config = ConvertConfig {
            dryrun: true,
            ..config()
        };
        let convert = LogConvert::new(dir.path().to_path_buf(), config).unwrap();
        let stats = convert.run(GrammarMode::Network).unwrap();

        assert_eq!(stats.copied, 3);
        assert_eq!(stats.unmerged, 3);
        assert_eq!(stats.moved, 1);
        assert!(!dir.path().join("output").exists());
    }

    #[test]
    fn non_empty_output_is_not_reused() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "#chan_20160101.log", "[00:00:00] a\n");
        fs::create_dir(dir.path().join("output")).unwrap();
        write_file(&dir.path().join("output"), "leftover.txt", "");

        let convert = LogConvert::new(dir.path().to_path_buf(), config()).unwrap();
        assert!(convert.run(GrammarMode::Network).is_err());
        assert!(!dir.path().join("output/#chan_20160101.log").exists());
    }

    #[test]
    fn non_empty_output_is_reused_with_overwrite() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "#chan_20160101.log", "[00:00:00] a\n");
        fs::create_dir(dir.path().join("output")).unwrap();
        write_file(&dir.path().join("output"), "leftover.txt", "");

        let config = ConvertConfig {
            overwrite: true,
            ..config()
        };
        let convert = LogConvert::new(dir.path().to_path_buf(), config).unwrap();
        let stats = convert.run(GrammarMode::Network).unwrap();

        assert_eq!(stats.moved, 1);
        assert_eq!(stats.skipped, 1);
        assert!(dir.path().join("output/#chan/2016-01-01.log").is_file());
    }

    #[test]
    fn output_in_source_directory_is_rejected() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "#chan_20160101.log", "[00:00:00] a\n");

        let config = ConvertConfig {
            output: ".".to_string(),
            overwrite: true,
            ..config()
        };
        let convert = LogConvert::new(dir.path().to_path_buf(), config).unwrap();
        assert!(convert.run(GrammarMode::Network).is_err());
        assert_eq!(
            fs::read_to_string(dir.path().join("#chan_20160101.log")).unwrap(),
            "[00:00:00] a\n"
        );
    }

    #[test]
    fn abort_flag_stops_run() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "#chan_20160101.log", "[00:00:00] a\n");

        let convert = LogConvert::new(dir.path().to_path_buf(), config())
            .unwrap()
            .with_abort_flag(Arc::new(AtomicBool::new(true)));
        let stats = convert.run(GrammarMode::Network).unwrap();

        assert!(stats.aborted);
        assert_eq!(stats.copied, 0);
        assert_eq!(stats.moved, 0);
    }
}
