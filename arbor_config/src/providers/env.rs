//! Process-environment substitution source.

use std::collections::BTreeMap;

/// Reads substitution values from the process environment.
///
/// An override map can be injected for hermetic resolution — overrides are
/// consulted before the live environment, so embedded callers and tests can
/// pin variables without mutating process state.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    overrides: BTreeMap<String, String>,
}

impl EnvSource {
    /// Creates a source reading the live process environment.
    #[must_use]
    pub fn process() -> Self {
        Self::default()
    }

    /// Creates a source consulting `overrides` before the process environment.
    #[must_use]
    pub const fn with_overrides(overrides: BTreeMap<String, String>) -> Self {
        Self { overrides }
    }

    /// Looks up a variable, preferring overrides over process state.
    #[must_use]
    pub fn lookup(&self, var: &str) -> Option<String> {
        self.overrides
            .get(var)
            .cloned()
            .or_else(|| std::env::var(var).ok())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::EnvSource;

    #[test]
    fn overrides_win_over_process_state() {
        let _guard = test_helpers::env::set_var("ARBOR_ENV_TEST", "from-process");
        let source = EnvSource::with_overrides(BTreeMap::from([(
            "ARBOR_ENV_TEST".to_owned(),
            "from-overrides".to_owned(),
        )]));
        assert_eq!(
            source.lookup("ARBOR_ENV_TEST").as_deref(),
            Some("from-overrides")
        );
    }

    #[test]
    fn unset_variables_resolve_to_none() {
        let _guard = test_helpers::env::remove_var("ARBOR_ENV_UNSET");
        assert!(EnvSource::process().lookup("ARBOR_ENV_UNSET").is_none());
    }
}
