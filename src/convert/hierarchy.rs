use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use colored::Colorize;
use walkdir::WalkDir;

use crate::convert::fs_ops::{create_dir, move_file};
use crate::convert::grammar::{Grammar, SkipReason};
use crate::print_warning;

/// Counts from the rearrange stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RearrangeSummary {
    pub moved: usize,
    pub skipped: usize,
    pub aborted: bool,
}

/// Move the log files in the output directory into the ZNC 1.6 directory hierarchy.
///
/// Every top-level entry is matched against the grammar of the selected mode only.
/// Entries that don't match, or are missing a window or a valid date,
/// are left in place with a warning.
/// Matching files are moved to `<fields...>/<YYYY-MM-DD>.<extension>` under the output directory.
///
/// # Errors
/// Returns an error if the output directory can't be read,
/// a destination directory can't be created, or a file can't be moved.
/// These abort the whole run.
pub fn rearrange(output: &Path, grammar: &Grammar, verbose: bool, abort: &AtomicBool) -> Result<RearrangeSummary> {
    println!("Rearranging logs into the ZNC 1.6 hierarchy...");

    let entries = WalkDir::new(output)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read output directory {}", output.display()))?;

    let mut summary = RearrangeSummary::default();
    for entry in entries {
        if abort.load(Ordering::SeqCst) {
            summary.aborted = true;
            return Ok(summary);
        }

        let name = crate::os_str_to_string(entry.file_name());
        let destination = if entry.file_type().is_file() {
            grammar.destination(&name)
        } else {
            Err(SkipReason::NotAFile)
        };

        match destination {
            Ok(relative) => {
                let target = output.join(&relative);
                if let Some(parent) = target.parent() {
                    create_dir(parent)?;
                }
                if verbose {
                    println!("{} {name} -> {}", "Move:".magenta().bold(), relative.display());
                }
                move_file(entry.path(), &target)?;
                summary.moved += 1;
            }
            Err(reason) => {
                print_warning!("Warning: {name} {reason}. It will be skipped.");
                summary.skipped += 1;
            }
        }
    }

    println!("{} logs moved, {} skipped.", summary.moved, summary.skipped);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::tempdir;

    use crate::convert::grammar::GrammarMode;

    fn write_file(dir: &Path, name: &str) {
        fs::write(dir.join(name), format!("[00:00:00] {name}\n")).expect("Failed to write file");
    }

    fn run(output: &Path, mode: GrammarMode) -> RearrangeSummary {
        let grammar = mode.grammar("log").unwrap();
        rearrange(output, &grammar, false, &AtomicBool::new(false)).unwrap()
    }

    #[test]
    fn global_files_are_moved_into_hierarchy() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "alice_freenode_#chan_20160115.log");
        write_file(dir.path(), "alice_freenode_#chan_20160116.log");
        write_file(dir.path(), "bob_oftc_nickserv_20160115.log");

        let summary = run(dir.path(), GrammarMode::Global);

        assert_eq!(summary.moved, 3);
        assert_eq!(summary.skipped, 0);
        assert!(dir.path().join("alice/freenode/#chan/2016-01-15.log").is_file());
        assert!(dir.path().join("alice/freenode/#chan/2016-01-16.log").is_file());
        assert!(dir.path().join("bob/oftc/nickserv/2016-01-15.log").is_file());
        assert!(!dir.path().join("alice_freenode_#chan_20160115.log").exists());
    }

    #[test]
    fn moved_file_keeps_content() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "#rust_20150302.log");

        run(dir.path(), GrammarMode::Network);

        let content = fs::read_to_string(dir.path().join("#rust/2015-03-02.log")).unwrap();
        assert_eq!(content, "[00:00:00] #rust_20150302.log\n");
    }

    #[test]
    fn user_files_are_moved_into_hierarchy() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "efnet_#linux_20141231.log");

        let summary = run(dir.path(), GrammarMode::User);

        assert_eq!(summary.moved, 1);
        assert!(dir.path().join("efnet/#linux/2014-12-31.log").is_file());
    }

    #[test]
    fn non_matching_files_are_left_in_place() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "alice_freenode_#chan_2016011.log");
        write_file(dir.path(), "alice_freenode_#chan_2016011a.log");
        write_file(dir.path(), "readme.txt");

        let summary = run(dir.path(), GrammarMode::Global);

        assert_eq!(summary.moved, 0);
        assert_eq!(summary.skipped, 3);
        assert!(dir.path().join("alice_freenode_#chan_2016011.log").is_file());
        assert!(dir.path().join("alice_freenode_#chan_2016011a.log").is_file());
        assert!(dir.path().join("readme.txt").is_file());
    }

    #[test]
    fn second_run_moves_nothing() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "alice_freenode_#chan_20160115.log");
        write_file(dir.path(), "bob_oftc_#chan_20160115.log");

        let first = run(dir.path(), GrammarMode::Global);
        let second = run(dir.path(), GrammarMode::Global);

        assert_eq!(first.moved, 2);
        assert_eq!(second.moved, 0);
        // One warning for each top-level user directory
        assert_eq!(second.skipped, 2);
        assert!(dir.path().join("alice/freenode/#chan/2016-01-15.log").is_file());
        assert!(dir.path().join("bob/oftc/#chan/2016-01-15.log").is_file());
    }

    #[test]
    fn matching_directory_is_not_moved() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("#chan_20160115.log")).unwrap();

        let summary = run(dir.path(), GrammarMode::Network);

        assert_eq!(summary.skipped, 1);
        assert!(dir.path().join("#chan_20160115.log").is_dir());
    }

    #[test]
    fn existing_destination_file_is_replaced() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("#chan")).unwrap();
        fs::write(dir.path().join("#chan/2016-01-15.log"), "old").unwrap();
        write_file(dir.path(), "#chan_20160115.log");

        run(dir.path(), GrammarMode::Network);

        let content = fs::read_to_string(dir.path().join("#chan/2016-01-15.log")).unwrap();
        assert_eq!(content, "[00:00:00] #chan_20160115.log\n");
    }

    #[test]
    fn directory_creation_failure_aborts() {
        let dir = tempdir().unwrap();
        // A file where the user directory should go
        fs::write(dir.path().join("alice"), "").unwrap();
        write_file(dir.path(), "alice_freenode_#chan_20160115.log");

        let grammar = GrammarMode::Global.grammar("log").unwrap();
        let result = rearrange(dir.path(), &grammar, false, &AtomicBool::new(false));

        assert!(result.is_err());
        assert!(dir.path().join("alice_freenode_#chan_20160115.log").is_file());
    }

    #[test]
    fn abort_leaves_files_in_place() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "#chan_20160115.log");

        let grammar = GrammarMode::Network.grammar("log").unwrap();
        let summary = rearrange(dir.path(), &grammar, false, &AtomicBool::new(true)).unwrap();

        assert!(summary.aborted);
        assert_eq!(summary.moved, 0);
        assert!(dir.path().join("#chan_20160115.log").is_file());
    }
}
