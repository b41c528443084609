use thiserror::Error;

/// Failures surfaced by the lattice search and the histogram-based re-search.
///
/// Infeasibility is reported, not fatal: the caller may relax the class cap
/// or lower k and run again. An unparsable bucket key, by contrast, means the
/// intermediate histogram is malformed and the run cannot be trusted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OlaError {
    #[error("no generalization vector satisfies the equivalence class cap {cap}")]
    InfeasibleCap { cap: u64 },
    #[error("coarsening exhausted the lattice without reaching {k}-anonymity")]
    InfeasibleKAnonymity { k: u64 },
    #[error("cannot recover a numeric lower bound from bucket key '{key}'")]
    UnparsableBucketKey { key: String },
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}
