//! Graph-construction settings.
//!
//! Priority (highest first):
//! 1. explicit `GraphConfig` passed to `Stream::with_config`
//! 2. `SYMMAT_CSE` / `SYMMAT_EQ_DEPTH` environment variables
//! 3. built-in defaults

/// Default recursion depth for structural equality beyond node identity.
pub const DEFAULT_EQ_DEPTH: usize = 2;

pub const ENV_CSE: &str = "SYMMAT_CSE";
pub const ENV_EQ_DEPTH: &str = "SYMMAT_EQ_DEPTH";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphConfig {
    /// Hash-cons pure operations so identical subexpressions share a node.
    pub cse: bool,
    /// How many levels of inputs `is_equal` may compare when two node IDs
    /// differ.
    pub eq_depth: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cse: true,
            eq_depth: DEFAULT_EQ_DEPTH,
        }
    }
}

impl GraphConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unrecognized values are
    /// ignored and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup(ENV_CSE) {
            match val.trim().to_lowercase().as_str() {
                "0" | "false" | "off" | "no" => config.cse = false,
                "1" | "true" | "on" | "yes" => config.cse = true,
                _ => {}
            }
        }

        if let Some(val) = lookup(ENV_EQ_DEPTH)
            && let Ok(depth) = val.trim().parse::<usize>()
        {
            config.eq_depth = depth;
        }

        config
    }
}
