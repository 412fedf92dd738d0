use std::collections::HashMap;

use crate::normalize_name;

/// Two file names that only differ in letter case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Name that appeared first in the listing.
    pub first: String,
    /// Name that appeared second. The merged file gets its metadata.
    pub second: String,
}

/// Three or more file names sharing the same normalized form.
/// These are reported and skipped since there is no defined merge order for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcessGroup {
    pub normalized: String,
    pub names: Vec<String>,
}

/// Result of duplicate detection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateGroup>,
    pub excess: Vec<ExcessGroup>,
}

impl DuplicateGroup {
    #[must_use]
    pub const fn new(first: String, second: String) -> Self {
        Self { first, second }
    }

    /// Lowercase name used for the merged output file.
    #[must_use]
    pub fn output_name(&self) -> String {
        normalize_name(&self.first)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.first == name || self.second == name
    }
}

impl DuplicateReport {
    /// Check if the given name is part of a duplicate pair.
    /// Members of excess groups are not.
    #[must_use]
    pub fn is_duplicate(&self, name: &str) -> bool {
        self.groups.iter().any(|group| group.contains(name))
    }

    /// Check if the given name belongs to a group of three or more that is not merged.
    #[must_use]
    pub fn is_excess(&self, name: &str) -> bool {
        self.excess.iter().any(|group| group.names.iter().any(|n| n == name))
    }
}

/// Find file names that have mixed-case duplicates.
///
/// Names are grouped by their normalized lowercase form.
/// Forms that occur exactly twice produce a [`DuplicateGroup`] with the names in input order.
/// Forms that occur three or more times are returned as [`ExcessGroup`]s instead.
/// Output is ordered by the first appearance of each form.
///
/// ```rust
/// use znc_logs::convert::detect_duplicates;
///
/// let names = ["#Chan_20160101.log", "#chan_20160101.log", "#other_20160101.log"].map(String::from);
/// let report = detect_duplicates(&names);
/// assert_eq!(report.groups.len(), 1);
/// assert_eq!(report.groups[0].first, "#Chan_20160101.log");
/// assert_eq!(report.groups[0].second, "#chan_20160101.log");
/// assert!(report.excess.is_empty());
/// ```
#[must_use]
pub fn detect_duplicates(names: &[String]) -> DuplicateReport {
    let mut order: Vec<String> = Vec::new();
    let mut by_form: HashMap<String, Vec<&String>> = HashMap::new();

    for name in names {
        let form = normalize_name(name);
        by_form
            .entry(form)
            .or_insert_with_key(|key| {
                order.push(key.clone());
                Vec::new()
            })
            .push(name);
    }

    let mut report = DuplicateReport::default();
    for form in order {
        let Some(members) = by_form.remove(&form) else {
            continue;
        };
        match members.len() {
            0 | 1 => {}
            2 => report
                .groups
                .push(DuplicateGroup::new(members[0].clone(), members[1].clone())),
            _ => report.excess.push(ExcessGroup {
                normalized: form,
                names: members.into_iter().cloned().collect(),
            }),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn no_duplicates_returns_empty_report() {
        let report = detect_duplicates(&names(&["a_20160101.log", "b_20160101.log"]));
        assert!(report.groups.is_empty());
        assert!(report.excess.is_empty());
    }

    #[test]
    fn empty_input_returns_empty_report() {
        let report = detect_duplicates(&[]);
        assert_eq!(report, DuplicateReport::default());
    }

    #[test]
    fn pair_keeps_input_order() {
        let report = detect_duplicates(&names(&["x.log", "#chan_20160101.log", "#CHAN_20160101.log"]));
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].first, "#chan_20160101.log");
        assert_eq!(report.groups[0].second, "#CHAN_20160101.log");
        assert_eq!(report.groups[0].output_name(), "#chan_20160101.log");
    }

    #[test]
    fn three_copies_are_reported_as_excess() {
        let report = detect_duplicates(&names(&["A.log", "a.log", "b.log", "B.log", "A.LOG"]));
        assert_eq!(report.groups, vec![DuplicateGroup::new("b.log".into(), "B.log".into())]);
        assert_eq!(report.excess.len(), 1);
        assert_eq!(report.excess[0].normalized, "a.log");
        assert_eq!(report.excess[0].names, names(&["A.log", "a.log", "A.LOG"]));
    }

    #[test]
    fn groups_are_ordered_by_first_appearance() {
        let report = detect_duplicates(&names(&["Z.log", "M.log", "z.log", "m.log"]));
        let firsts: Vec<&str> = report.groups.iter().map(|g| g.first.as_str()).collect();
        assert_eq!(firsts, vec!["Z.log", "M.log"]);
    }

    #[test]
    fn only_multiplicity_two_is_grouped() {
        let input = names(&["one.log", "Two.log", "two.log", "Three.log", "THREE.log", "three.log"]);
        let report = detect_duplicates(&input);
        for group in &report.groups {
            let count = input
                .iter()
                .filter(|name| normalize_name(name) == group.output_name())
                .count();
            assert_eq!(count, 2);
        }
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.excess.len(), 1);
    }

    #[test]
    fn decomposed_unicode_matches_composed() {
        let report = detect_duplicates(&names(&["#ka\u{308}rpa\u{308}_20160101.log", "#K\u{e4}rp\u{e4}_20160101.log"]));
        assert_eq!(report.groups.len(), 1);
    }

    #[test]
    fn is_duplicate_only_covers_pairs() {
        let report = detect_duplicates(&names(&["A.log", "a.log", "b.log", "B.log", "b.LOG", "c.log"]));
        assert!(report.is_duplicate("A.log"));
        assert!(report.is_duplicate("a.log"));
        assert!(!report.is_duplicate("B.log"));
        assert!(report.is_excess("B.log"));
        assert!(report.is_excess("b.LOG"));
        assert!(!report.is_excess("a.log"));
        assert!(!report.is_duplicate("c.log"));
    }
}
