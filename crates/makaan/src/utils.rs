use std::fmt::Display;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::LocalityRecord;

static RE_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("invalid regex: digits"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Match(usize),
    Missing(usize),
    Extra(usize),
}

impl Display for Reconciliation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reconciliation::Match(n) => write!(f, "All {} records found", n),
            Reconciliation::Missing(n) => write!(f, "{} records missing", n),
            Reconciliation::Extra(n) => write!(f, "{} more records found", n),
        }
    }
}

/// Compares the advertised record count with what was scraped and logs the
/// outcome. Never fails.
pub fn reconcile(expected: usize, actual: usize) -> Reconciliation {
    let outcome = if expected > actual {
        Reconciliation::Missing(expected - actual)
    } else if actual > expected {
        Reconciliation::Extra(actual - expected)
    } else {
        Reconciliation::Match(actual)
    };

    match outcome {
        Reconciliation::Match(_) => log::info!("{}", outcome),
        _ => log::warn!("{} (expected {}, got {})", outcome, expected, actual),
    }

    outcome
}

/// `<id>_<location>.json`, where `<id>` is the last number in the locality's
/// listing link, or its location code when the link has none.
pub fn listing_file_name(locality: &LocalityRecord) -> String {
    let id = RE_DIGITS
        .find_iter(&locality.view_ppt_link)
        .last()
        .map(|m| m.as_str())
        .unwrap_or(locality.location_code.as_str());

    let location: String = locality
        .location
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();

    format!("{}_{}.json", id, location.trim())
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: Vec<(PathBuf, usize)>,
    /// Outcome of each count check, keyed by location.
    pub reconciliations: Vec<(String, Reconciliation)>,
}

impl RunSummary {
    pub fn record(&mut self, path: PathBuf, count: usize) {
        self.files.push((path, count));
    }

    pub fn reconciled(&mut self, location: &str, outcome: Reconciliation) {
        self.reconciliations.push((location.to_string(), outcome));
    }

    pub fn mismatches(&self) -> usize {
        self.reconciliations
            .iter()
            .filter(|(_, outcome)| !matches!(outcome, Reconciliation::Match(_)))
            .count()
    }

    pub fn total(&self) -> usize {
        self.files.iter().map(|(_, count)| count).sum()
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nSummary:")?;
        for (path, count) in &self.files {
            writeln!(f, "  {:>6}  {}", count, path.display())?;
        }
        writeln!(f, "  {:>6}  total in {} file(s)", self.total(), self.files.len())?;
        if !self.reconciliations.is_empty() {
            writeln!(
                f,
                "  {} of {} count check(s) did not match",
                self.mismatches(),
                self.reconciliations.len()
            )?;
        }
        Ok(())
    }
}
