use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use colored::Colorize;
use regex::bytes::Regex;

use crate::convert::duplicates::{DuplicateGroup, DuplicateReport};
use crate::convert::fs_ops::{copy_metadata, copy_with_metadata};
use crate::{normalize_name, print_warning};

/// Matches the bracketed timestamp at the start of a log line, for example `[12:34:56]`.
/// Byte based so that logs with broken encodings still sort.
static RE_LOG_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)^\[([^\]\n]*)\]").expect("Failed to create regex pattern for log line"));

/// Log lines in timestamp order, plus the lines that had no timestamp.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SortedLines<'a> {
    pub lines: Vec<&'a [u8]>,
    pub dropped: Vec<&'a [u8]>,
}

/// Counts from the merge and copy stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub merged: usize,
    pub copied: usize,
    pub dropped_lines: usize,
    /// Files from groups of three or more copies, copied without merging
    pub unmerged: usize,
    pub aborted: bool,
}

/// Sort log lines by their bracketed timestamp.
///
/// The sort key is the timestamp with colons removed, compared byte by byte.
/// The sort is stable, so lines with equal timestamps keep their input order.
/// Lines that don't start with a bracketed timestamp are returned in `dropped`.
///
/// ```rust
/// use znc_logs::convert::sort_lines;
///
/// let lines: [&[u8]; 3] = [b"[00:01:00] a\n", b"no timestamp\n", b"[00:00:30] b\n"];
/// let sorted = sort_lines(lines);
/// assert_eq!(sorted.lines, vec![&b"[00:00:30] b\n"[..], &b"[00:01:00] a\n"[..]]);
/// assert_eq!(sorted.dropped, vec![&b"no timestamp\n"[..]]);
/// ```
pub fn sort_lines<'a>(lines: impl IntoIterator<Item = &'a [u8]>) -> SortedLines<'a> {
    let mut keyed: Vec<(Vec<u8>, &[u8])> = Vec::new();
    let mut dropped = Vec::new();

    for line in lines {
        match RE_LOG_LINE.captures(line).and_then(|captures| captures.get(1)) {
            Some(timestamp) => keyed.push((sort_key(timestamp.as_bytes()), line)),
            None => dropped.push(line),
        }
    }

    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    SortedLines {
        lines: keyed.into_iter().map(|(_, line)| line).collect(),
        dropped,
    }
}

/// Merge all duplicate pairs and copy the remaining log files to the output directory.
///
/// Merged files are named after the lowercase form of the first name,
/// and get the timestamps and permissions of the second file.
/// Members of groups with three or more copies are copied one by one without merging,
/// so the last one in listing order ends up in the output directory.
/// The source directory is not modified.
///
/// # Errors
/// Returns an error if a source file can't be read or an output file can't be written.
pub fn merge_logs(
    report: &DuplicateReport,
    names: &[String],
    source: &Path,
    output: &Path,
    verbose: bool,
    abort: &AtomicBool,
) -> Result<MergeSummary> {
    let mut summary = MergeSummary::default();

    println!("Merging logs...");
    for group in &report.groups {
        if abort.load(Ordering::SeqCst) {
            summary.aborted = true;
            return Ok(summary);
        }
        if verbose {
            println!(
                "{} {} + {} -> {}",
                "Merge:".cyan().bold(),
                group.first,
                group.second,
                group.output_name()
            );
        }
        summary.dropped_lines += merge_pair(group, source, output)?;
        summary.merged += 1;
    }
    println!("{} logs merged.", summary.merged);

    println!("Copying remaining logs...");
    for name in names {
        if abort.load(Ordering::SeqCst) {
            summary.aborted = true;
            return Ok(summary);
        }
        if report.is_duplicate(name) {
            continue;
        }
        let target_name = normalize_name(name);
        let target = output.join(&target_name);
        if report.is_excess(name) {
            if target.exists() {
                print_warning!("Warning: {name} overwrites {target_name} copied from another case variant");
            }
            summary.unmerged += 1;
        }
        if verbose {
            println!("{} {name} -> {target_name}", "Copy:".green().bold());
        }
        copy_with_metadata(&source.join(name), &target)?;
        summary.copied += 1;
    }
    println!("{} files copied.", summary.copied);

    Ok(summary)
}

/// Merge one duplicate pair into the output directory.
/// Returns the number of dropped lines.
fn merge_pair(group: &DuplicateGroup, source: &Path, output: &Path) -> Result<usize> {
    let first_path = source.join(&group.first);
    let second_path = source.join(&group.second);
    let first = fs::read(&first_path).with_context(|| format!("Failed to read {}", first_path.display()))?;
    let second = fs::read(&second_path).with_context(|| format!("Failed to read {}", second_path.display()))?;

    let sorted = sort_lines(
        first
            .split_inclusive(|&byte| byte == b'\n')
            .chain(second.split_inclusive(|&byte| byte == b'\n')),
    );
    for line in &sorted.dropped {
        print_warning!(
            "Warning: Line {} doesn't look like a log line and will be removed!",
            String::from_utf8_lossy(line).trim_end()
        );
    }

    let target = output.join(group.output_name());
    {
        let file = File::create(&target).with_context(|| format!("Failed to create {}", target.display()))?;
        let mut writer = BufWriter::new(file);
        let last = sorted.lines.len().saturating_sub(1);
        for (index, line) in sorted.lines.iter().enumerate() {
            writer
                .write_all(line)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            // Last line of a file without a newline, unless it is written last
            if index < last && !line.ends_with(b"\n") {
                writer
                    .write_all(b"\n")
                    .with_context(|| format!("Failed to write {}", target.display()))?;
            }
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", target.display()))?;
    }

    copy_metadata(&second_path, &target)?;

    Ok(sorted.dropped.len())
}

fn sort_key(timestamp: &[u8]) -> Vec<u8> {
    timestamp.iter().copied().filter(|&byte| byte != b':').collect()
}
