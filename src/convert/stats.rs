use colored::Colorize;

use crate::convert::hierarchy::RearrangeSummary;
use crate::convert::merge::MergeSummary;

/// Statistics for one conversion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub files_found: usize,
    pub duplicate_pairs: usize,
    pub excess_groups: usize,
    pub merged: usize,
    pub copied: usize,
    pub dropped_lines: usize,
    pub unmerged: usize,
    pub moved: usize,
    pub skipped: usize,
    pub aborted: bool,
}

impl RunStats {
    pub(crate) const fn add_merge(&mut self, summary: &MergeSummary) {
        self.merged += summary.merged;
        self.copied += summary.copied;
        self.dropped_lines += summary.dropped_lines;
        self.unmerged += summary.unmerged;
        self.aborted |= summary.aborted;
    }

    pub(crate) const fn add_rearrange(&mut self, summary: &RearrangeSummary) {
        self.moved += summary.moved;
        self.skipped += summary.skipped;
        self.aborted |= summary.aborted;
    }

    /// Print the final summary.
    pub fn print_summary(&self) {
        println!("\n{}", "Summary".bold());
        println!("  Logs found:       {}", self.files_found);
        println!("  Duplicate pairs:  {}", self.duplicate_pairs);
        if self.excess_groups > 0 {
            println!(
                "  Unmerged groups:  {} ({} files)",
                self.excess_groups.to_string().yellow(),
                self.unmerged
            );
        }
        println!("  Merged:           {}", self.merged);
        println!("  Copied:           {}", self.copied);
        if self.dropped_lines > 0 {
            println!("  Dropped lines:    {}", self.dropped_lines.to_string().yellow());
        }
        println!("  Moved:            {}", self.moved.to_string().green());
        if self.skipped > 0 {
            println!("  Left in place:    {}", self.skipped.to_string().yellow());
        }
        if self.aborted {
            println!("{}", "Aborted by user".bold().red());
        }
    }
}
