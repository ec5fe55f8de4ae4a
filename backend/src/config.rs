//! Service configuration derived from environment variables.

use crate::logging::LogFormat;
use claim_proofs::constants::{DEFAULT_MERKLE_DEPTH, MAX_MERKLE_DEPTH};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_ARTIFACT_DIR: &str = "data/circuits";
const DEFAULT_PROVING_CONCURRENCY: usize = 2;
const DEFAULT_PROOF_TIMEOUT_MS: u64 = 30_000;

#[derive(Clone, Debug)]
pub struct Settings {
    pub addr: String,
    pub artifact_dir: PathBuf,
    pub proving_concurrency: usize,
    pub proof_timeout: Duration,
    pub merkle_depth: usize,
    pub log_format: LogFormat,

    /// Variables that were set but rejected, replaced by their defaults.
    /// Logged by `main` once the subscriber is installed.
    pub rejected: Vec<String>,
}

/// Parse a set variable, recording it in `rejected` when unparsable or out of range.
fn parse_checked<T: FromStr>(
    name: &str,
    raw: Option<String>,
    valid: impl Fn(&T) -> bool,
    rejected: &mut Vec<String>,
) -> Option<T> {
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(v) if valid(&v) => Some(v),
        _ => {
            rejected.push(format!("{name}={raw}"));
            None
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any key lookup. Unset or blank values take their
    /// defaults; unparsable or out-of-range ones do too, and are listed in
    /// `rejected`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let addr = var("BACKEND_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let artifact_dir = var("ATTEST_ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_DIR));
        let mut rejected = Vec::new();
        let proving_concurrency = parse_checked(
            "ATTEST_PROVING_CONCURRENCY",
            var("ATTEST_PROVING_CONCURRENCY"),
            |v: &usize| *v > 0,
            &mut rejected,
        )
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|v| v.get())
                .unwrap_or(DEFAULT_PROVING_CONCURRENCY)
        });
        let proof_timeout_ms = parse_checked(
            "ATTEST_PROOF_TIMEOUT_MS",
            var("ATTEST_PROOF_TIMEOUT_MS"),
            |v: &u64| *v > 0,
            &mut rejected,
        )
        .unwrap_or(DEFAULT_PROOF_TIMEOUT_MS);
        let merkle_depth = parse_checked(
            "ATTEST_MERKLE_DEPTH",
            var("ATTEST_MERKLE_DEPTH"),
            |v: &usize| (1..=MAX_MERKLE_DEPTH).contains(v),
            &mut rejected,
        )
        .unwrap_or(DEFAULT_MERKLE_DEPTH);
        let log_format = var("ATTEST_LOG_FORMAT")
            .map(|v| LogFormat::from_str_lossy(&v))
            .unwrap_or(LogFormat::Pretty);

        Self {
            addr,
            artifact_dir,
            proving_concurrency,
            proof_timeout: Duration::from_millis(proof_timeout_ms),
            merkle_depth,
            log_format,
            rejected,
        }
    }
}
