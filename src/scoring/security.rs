//! Security dimension
//!
//! A fixed catalogue of dangerous calls and hardcoded credentials, each with
//! a severity weight. The weighted tally is optionally summed with the count
//! reported by a [`SecurityScanner`] and then banded.

use regex::Regex;
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// One entry of the dangerous-pattern catalogue
pub struct DangerousPattern {
    pub name: &'static str,
    pub weight: u32,
    regex: &'static str,
}

const CATALOGUE: &[DangerousPattern] = &[
    DangerousPattern {
        name: "dynamic eval/exec",
        weight: 5,
        regex: r"\b(?:eval|exec)\s*\(",
    },
    DangerousPattern {
        name: "__import__",
        weight: 3,
        regex: r"\b__import__\s*\(",
    },
    DangerousPattern {
        name: "pickle/marshal loads",
        weight: 4,
        regex: r"\b(?:pickle|cPickle|marshal)\.loads?\s*\(",
    },
    DangerousPattern {
        name: "yaml.load",
        weight: 3,
        regex: r"\byaml\.load\s*\(",
    },
    DangerousPattern {
        name: "os.system",
        weight: 4,
        regex: r"\bos\.system\s*\(",
    },
    DangerousPattern {
        name: "subprocess shell=True",
        weight: 4,
        regex: r"\bsubprocess\.\w+\([^)]*shell\s*=\s*True",
    },
    DangerousPattern {
        name: "os.popen",
        weight: 3,
        regex: r"\bos\.popen\s*\(",
    },
    DangerousPattern {
        name: "hardcoded credential",
        weight: 2,
        regex: r#"(?i)\b(?:password|passwd|secret|token|api_key|apikey)\s*[:=]\s*["'][^"'\n]+["']"#,
    },
];

static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();

fn compiled() -> &'static [Regex] {
    COMPILED.get_or_init(|| {
        CATALOGUE
            .iter()
            .map(|p| Regex::new(p.regex).expect("valid regex: security catalogue"))
            .collect()
    })
}

/// Occurrences of one catalogue pattern in a piece of content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternHit {
    pub name: &'static str,
    pub weight: u32,
    pub count: usize,
}

/// Catalogue patterns that occur at least once
pub fn pattern_hits(content: &str) -> Vec<PatternHit> {
    CATALOGUE
        .iter()
        .zip(compiled())
        .filter_map(|(pattern, regex)| {
            let count = regex.find_iter(content).count();
            (count > 0).then_some(PatternHit {
                name: pattern.name,
                weight: pattern.weight,
                count,
            })
        })
        .collect()
}

/// Severity-weighted catalogue tally
pub fn vulnerability_tally(content: &str) -> u32 {
    weighted_total(&pattern_hits(content))
}

/// Saturates at `u32::MAX`, which bands as the worst score
fn weighted_total(hits: &[PatternHit]) -> u32 {
    hits.iter().fold(0u32, |total, hit| {
        let count = u32::try_from(hit.count).unwrap_or(u32::MAX);
        total.saturating_add(hit.weight.saturating_mul(count))
    })
}

pub fn band(tally: u32) -> f64 {
    match tally {
        0 => 100.0,
        1..=3 => 90.0,
        4..=7 => 80.0,
        8..=15 => 70.0,
        16..=19 => 50.0,
        _ => 30.0,
    }
}

pub fn score(path: &Path, content: &str, scanner: &dyn SecurityScanner) -> f64 {
    let mut tally = vulnerability_tally(content);
    if let Some(extra) = scanner.scan(path, content) {
        debug!("{} reported weight {} for {}", scanner.name(), extra, path.display());
        tally = tally.saturating_add(extra);
    }
    band(tally)
}

/// External static security scanner
pub trait SecurityScanner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Severity-weighted issue count, or `None` when the scanner has nothing to say
    fn scan(&self, path: &Path, content: &str) -> Option<u32>;
}

/// Scanner that never reports anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScanner;

impl SecurityScanner for NoopScanner {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn scan(&self, _path: &Path, _content: &str) -> Option<u32> {
        None
    }
}

/// Runs a locally installed `bandit` over Python sources, fed through stdin
pub struct BanditScanner {
    program: String,
    available: OnceLock<bool>,
}

impl Default for BanditScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl BanditScanner {
    pub fn new() -> Self {
        Self::with_program("bandit")
    }

    /// Use a specific bandit executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            available: OnceLock::new(),
        }
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            let ok = Command::new(&self.program)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
            if !ok {
                debug!("bandit not found, security scanning uses the built-in catalogue only");
            }
            ok
        })
    }

    /// Map a bandit severity onto a weight
    fn severity_weight(severity: &str) -> u32 {
        match severity.to_uppercase().as_str() {
            "HIGH" => 5,
            "MEDIUM" => 3,
            _ => 1,
        }
    }

    fn run(&self, content: &str) -> Option<String> {
        let mut child = Command::new(&self.program)
            .args(["-f", "json", "-q", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| warn!("Failed to start bandit: {}", e))
            .ok()?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(content.as_bytes()) {
                warn!("Failed to feed bandit: {}", e);
            }
        }

        // Bandit exits non-zero when it finds issues, so only stdout matters
        let output = child
            .wait_with_output()
            .map_err(|e| warn!("bandit did not finish: {}", e))
            .ok()?;
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Sum severity weights from bandit's JSON report
    pub fn weigh_report(stdout: &str) -> Option<u32> {
        let json: JsonValue = serde_json::from_str(stdout).ok()?;
        let results = json.get("results")?.as_array()?;
        Some(
            results
                .iter()
                .map(|r| {
                    let severity = r
                        .get("issue_severity")
                        .and_then(|s| s.as_str())
                        .unwrap_or("LOW");
                    Self::severity_weight(severity)
                })
                .fold(0u32, u32::saturating_add),
        )
    }
}

impl SecurityScanner for BanditScanner {
    fn name(&self) -> &'static str {
        "bandit"
    }

    fn scan(&self, path: &Path, content: &str) -> Option<u32> {
        let is_python = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("py") | Some("pyi")
        );
        if !is_python || !self.is_available() {
            return None;
        }
        let stdout = self.run(content)?;
        let weight = Self::weigh_report(&stdout);
        if weight.is_none() && !stdout.is_empty() {
            debug!("Failed to parse bandit output for {}", path.display());
        }
        weight
    }
}
