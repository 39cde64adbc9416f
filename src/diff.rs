//! Line diff based on the longest common subsequence
//!
//! Shared by change previews (unified diff text) and the risk assessor
//! (changed-line counts). Common prefix and suffix lines are stripped
//! before the quadratic table is built.

use serde::{Deserialize, Serialize};

/// Lines of context around each hunk
const CONTEXT: usize = 3;

/// Largest LCS table built; bigger inputs degrade to delete-all/insert-all
const MAX_TABLE_CELLS: usize = 16_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Equal,
    Delete,
    Insert,
}

/// One line of an edit script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine<'a> {
    pub kind: DiffKind,
    pub text: &'a str,
    /// 0-based index of the next line in the original
    pub old_pos: usize,
    /// 0-based index of the next line in the modified text
    pub new_pos: usize,
}

/// Line counts for a diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub lines_added: usize,
    pub lines_removed: usize,
    pub lines_unchanged: usize,
    pub original_lines: usize,
    pub modified_lines: usize,
}

impl DiffStats {
    pub fn changed_lines(&self) -> usize {
        self.lines_added + self.lines_removed
    }
}

/// Edit script turning `original` into `modified`
pub fn line_diff<'a>(original: &'a str, modified: &'a str) -> Vec<DiffLine<'a>> {
    let a: Vec<&str> = original.lines().collect();
    let b: Vec<&str> = modified.lines().collect();

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mid_a = &a[prefix..a.len() - suffix];
    let mid_b = &b[prefix..b.len() - suffix];

    let mut out = Vec::with_capacity(a.len().max(b.len()));
    let (mut old_pos, mut new_pos) = (0usize, 0usize);
    let mut push = |kind: DiffKind, text: &'a str, out: &mut Vec<DiffLine<'a>>| {
        out.push(DiffLine {
            kind,
            text,
            old_pos,
            new_pos,
        });
        match kind {
            DiffKind::Equal => {
                old_pos += 1;
                new_pos += 1;
            }
            DiffKind::Delete => old_pos += 1,
            DiffKind::Insert => new_pos += 1,
        }
    };

    for line in &a[..prefix] {
        push(DiffKind::Equal, *line, &mut out);
    }
    for (kind, text) in middle_script(mid_a, mid_b) {
        push(kind, text, &mut out);
    }
    for line in &a[a.len() - suffix..] {
        push(DiffKind::Equal, *line, &mut out);
    }
    out
}

fn middle_script<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<(DiffKind, &'a str)> {
    let m = a.len();
    let n = b.len();
    if (m + 1).saturating_mul(n + 1) > MAX_TABLE_CELLS {
        return a
            .iter()
            .map(|l| (DiffKind::Delete, *l))
            .chain(b.iter().map(|l| (DiffKind::Insert, *l)))
            .collect();
    }

    // table[i][j] = LCS length of a[i..] and b[j..]
    let width = n + 1;
    let mut table = vec![0u32; (m + 1) * width];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut script = Vec::with_capacity(m + n);
    let (mut i, mut j) = (0, 0);
    while i < m && j < n {
        if a[i] == b[j] {
            script.push((DiffKind::Equal, a[i]));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            script.push((DiffKind::Delete, a[i]));
            i += 1;
        } else {
            script.push((DiffKind::Insert, b[j]));
            j += 1;
        }
    }
    script.extend(a[i..].iter().map(|l| (DiffKind::Delete, *l)));
    script.extend(b[j..].iter().map(|l| (DiffKind::Insert, *l)));
    script
}

pub fn diff_stats(original: &str, modified: &str) -> DiffStats {
    let mut stats = DiffStats {
        original_lines: original.lines().count(),
        modified_lines: modified.lines().count(),
        ..DiffStats::default()
    };
    for line in line_diff(original, modified) {
        match line.kind {
            DiffKind::Equal => stats.lines_unchanged += 1,
            DiffKind::Delete => stats.lines_removed += 1,
            DiffKind::Insert => stats.lines_added += 1,
        }
    }
    stats
}

/// Render a unified diff with `--- a/{label}` / `+++ b/{label}` headers.
/// Identical inputs produce an empty string.
pub fn unified_diff(label: &str, original: &str, modified: &str) -> String {
    let script = line_diff(original, modified);
    let changes: Vec<usize> = script
        .iter()
        .enumerate()
        .filter(|(_, l)| l.kind != DiffKind::Equal)
        .map(|(i, _)| i)
        .collect();
    if changes.is_empty() {
        return String::new();
    }

    // Merge change indices into hunk ranges over the script
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for idx in changes {
        let start = idx.saturating_sub(CONTEXT);
        let end = (idx + CONTEXT + 1).min(script.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => ranges.push((start, end)),
        }
    }

    let mut out = format!("--- a/{}\n+++ b/{}\n", label, label);
    for (start, end) in ranges {
        let hunk = &script[start..end];
        let old_len = hunk.iter().filter(|l| l.kind != DiffKind::Insert).count();
        let new_len = hunk.iter().filter(|l| l.kind != DiffKind::Delete).count();
        let old_start = if old_len == 0 { hunk[0].old_pos } else { hunk[0].old_pos + 1 };
        let new_start = if new_len == 0 { hunk[0].new_pos } else { hunk[0].new_pos + 1 };

        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start, old_len, new_start, new_len
        ));
        for line in hunk {
            let marker = match line.kind {
                DiffKind::Equal => ' ',
                DiffKind::Delete => '-',
                DiffKind::Insert => '+',
            };
            out.push(marker);
            out.push_str(line.text);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_inputs() {
        let text = "a\nb\nc\n";
        assert_eq!(unified_diff("f.py", text, text), "");
        let stats = diff_stats(text, text);
        assert_eq!(stats.lines_unchanged, 3);
        assert_eq!(stats.changed_lines(), 0);
    }

    #[test]
    fn test_single_line_change() {
        let stats = diff_stats("a\nb\nc\n", "a\nB\nc\n");
        assert_eq!(stats.lines_added, 1);
        assert_eq!(stats.lines_removed, 1);
        assert_eq!(stats.lines_unchanged, 2);
        assert_eq!(stats.original_lines, 3);
        assert_eq!(stats.modified_lines, 3);

        let diff = unified_diff("f.py", "a\nb\nc\n", "a\nB\nc\n");
        assert_eq!(
            diff,
            "--- a/f.py\n+++ b/f.py\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n"
        );
    }

    #[test]
    fn test_insert_into_empty() {
        let diff = unified_diff("new.py", "", "x = 1\n");
        assert_eq!(diff, "--- a/new.py\n+++ b/new.py\n@@ -0,0 +1,1 @@\n+x = 1\n");
    }

    #[test]
    fn test_distant_changes_make_two_hunks() {
        let original: String = (0..20).map(|i| format!("line {}\n", i)).collect();
        let modified = original
            .replace("line 1\n", "line one\n")
            .replace("line 18\n", "line eighteen\n");
        let diff = unified_diff("f.txt", &original, &modified);
        assert_eq!(diff.matches("@@ -").count(), 2);
    }

    #[test]
    fn test_lcs_keeps_moved_block_minimal() {
        let stats = diff_stats("a\nb\nc\nd\n", "b\nc\nd\na\n");
        assert_eq!(stats.lines_unchanged, 3);
        assert_eq!(stats.changed_lines(), 2);
    }
}
