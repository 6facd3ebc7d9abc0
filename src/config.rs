//! Analysis switches.
//!
//! Every transfer function can be switched off individually, which makes the
//! analysis fall back to the full set (or the type range) for that operation.
//! Switches are passed explicitly to evaluation; there is no global state.

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown range analysis option: {0}")]
    UnknownOption(String),
    #[error("Unknown meet strategy: {0}")]
    UnknownMeet(String),
}

macro_rules! range_switches {
    ($($field:ident),* $(,)?) => {
        /// Per-operation enable switches.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct RangeConfig {
            $(pub $field: bool,)*
            /// Evaluation of conditional selects (otherwise the type range).
            pub ternary: bool,
        }

        impl Default for RangeConfig {
            fn default() -> Self {
                Self {
                    $($field: true,)*
                    ternary: false,
                }
            }
        }

        impl RangeConfig {
            fn switch_mut(&mut self, name: &str) -> Option<&mut bool> {
                match name {
                    $(stringify!($field) => Some(&mut self.$field),)*
                    _ => None,
                }
            }
        }
    };
}

range_switches!(
    add,
    sub,
    mul,
    sdiv,
    udiv,
    srem,
    urem,
    shl,
    shr,
    abs,
    negate,
    not,
    and,
    or,
    xor,
    sext,
    zext,
    trunc,
    min,
    max,
    load,
    float_pack,
    view_convert,
    float_unpack,
    bit_phi,
);

impl RangeConfig {
    /// Everything enabled except the heuristic [`ternary`][Self::ternary].
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses option strings: `no_<op>` disables a switch, `ternary` enables
    /// the select heuristic.
    pub fn from_options<'a>(
        options: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for option in options {
            let option = option.trim();
            if option.is_empty() {
                continue;
            }
            if option == "ternary" {
                config.ternary = true;
                continue;
            }
            let slot = option
                .strip_prefix("no_")
                .and_then(|name| config.switch_mut(name))
                .ok_or_else(|| ConfigError::UnknownOption(option.to_string()))?;
            *slot = false;
        }
        Ok(config)
    }
}

/// How widening and narrowing are performed inside a strongly connected component.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum MeetStrategy {
    /// Jump-set widening followed by narrowing.
    #[default]
    Cousot,
    /// Growth to infinity followed by crop along the def-use DFS.
    CropDfs,
}

impl FromStr for MeetStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cousot" => Ok(MeetStrategy::Cousot),
            "cropdfs" | "crop-dfs" | "crop_dfs" => Ok(MeetStrategy::CropDfs),
            _ => Err(ConfigError::UnknownMeet(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    pub meet: MeetStrategy,
    /// Evaluations allowed per component node during the initial fixed pass.
    pub iteration_factor: usize,
    /// Widen to program constants before jumping to infinity.
    pub use_jump_set: bool,
    pub ranges: RangeConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            meet: MeetStrategy::default(),
            iteration_factor: 16,
            use_jump_set: true,
            ranges: RangeConfig::default(),
        }
    }
}
