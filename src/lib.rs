pub mod anonymity;
pub mod error;
pub mod histogram;
pub mod io;
pub mod lattice;

use error::OlaError;

/// Knobs recognized by an anonymization run. `chunk_size` is purely a
/// memory/performance knob and never changes the result.
#[derive(Debug, Clone)]
pub struct OlaConfig {
    /// Minimum number of records in every released equivalence class.
    pub k: u64,
    /// Cap on the number of distinct equivalence classes.
    pub max_equivalence_classes: u64,
    /// Bucket width multiplier between lattice levels.
    pub growth_factor: i64,
    /// Records per aggregation chunk.
    pub chunk_size: usize,
}

impl OlaConfig {
    /// Reject unusable settings before any search begins.
    pub fn validate(&self) -> Result<(), OlaError> {
        if self.k == 0 {
            return Err(invalid("k must be positive"));
        }
        if self.max_equivalence_classes == 0 {
            return Err(invalid("max_equivalence_classes must be positive"));
        }
        if self.growth_factor < 2 {
            return Err(invalid("growth_factor must be at least 2"));
        }
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size must be positive"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> OlaError {
    OlaError::InvalidConfiguration {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> OlaConfig {
        OlaConfig {
            k: 5,
            max_equivalence_classes: 1000,
            growth_factor: 2,
            chunk_size: 100,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert_eq!(valid_config().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_zero_k() {
        let mut config = valid_config();
        config.k = 0;
        assert!(matches!(
            config.validate(),
            Err(OlaError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let mut config = valid_config();
        config.max_equivalence_classes = 0;
        assert!(matches!(
            config.validate(),
            Err(OlaError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_small_growth_factor() {
        let mut config = valid_config();
        config.growth_factor = 1;
        assert!(matches!(
            config.validate(),
            Err(OlaError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = valid_config();
        config.chunk_size = 0;
        assert!(matches!(
            config.validate(),
            Err(OlaError::InvalidConfiguration { .. })
        ));
    }
}
