//! # Options module
//!
//! This module contains the typed key-value store read by the coordinator and the backends.
//!
//! Every option is registered once with a kind, a default value and a description. Values are
//! validated against the kind when they are set, so the readers only have to check that the
//! option exists and has the expected type.
//!
//! ## Example
//! ```rust
//! use optdriver::options::{keys, Options};
//!
//! let mut options = Options::new();
//! options
//!     .add_enum_option(keys::ALGORITHM, "tr", &["ip", "tr", "mma"], "The type of optimization algorithm")?
//!     .add_int_option(keys::QN_SUBSPACE_SIZE, 10, 0, 1000, "Subspace size for the quasi-Newton method")?;
//!
//! options.set_str(keys::ALGORITHM, Some("mma"))?;
//! assert_eq!(options.get_enum(keys::ALGORITHM)?, "mma");
//! assert!(options.set_int(keys::QN_SUBSPACE_SIZE, 5000).is_err());
//! # Ok::<(), optdriver::options::OptionError>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Names of the options read by the coordinator
pub mod keys {
    /// Strategy selector, one of `ip`, `tr` or `mma`
    pub const ALGORITHM: &str = "algorithm";
    /// Checkpoint file handed to the interior-point backend in `ip` mode
    pub const IP_CHECKPOINT_FILE: &str = "ip_checkpoint_file";
    /// Quasi-Newton approximation type for the trust-region subproblem, `bfgs` or `sr1`
    pub const QN_TYPE: &str = "qn_type";
    /// Limited-memory subspace size of the quasi-Newton approximation
    pub const QN_SUBSPACE_SIZE: &str = "qn_subspace_size";
}

#[derive(Error, Debug, Clone, PartialEq)]
/// Option store error enum
pub enum OptionError {
    #[error("Option Error: Unknown option '{0}'.")]
    UnknownOption(String),

    #[error("Option Error: Option '{0}' is already registered.")]
    AlreadyRegistered(String),

    #[error("Option Error: Option '{name}' expects a {expected} value.")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("Option Error: Value {value} for option '{name}' is outside [{lower}, {upper}].")]
    OutOfRange {
        name: String,
        value: String,
        lower: String,
        upper: String,
    },

    #[error("Option Error: '{value}' is not a valid value for option '{name}'. Valid values: {valid}.")]
    InvalidEnumValue {
        name: String,
        value: String,
        valid: String,
    },

    #[error("Option Error: Option '{0}' has no value.")]
    Unset(String),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Value held by an option
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Free string, possibly absent
    Str(Option<String>),
    /// One of the values listed by the option's kind
    Enum(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            Self::Bool(value) => value.to_string(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => format!("{:e}", value),
            Self::Str(None) => "(none)".to_string(),
            Self::Str(Some(value)) | Self::Enum(value) => value.clone(),
        };
        f.pad(&text)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Kind of an option, with the constraints its values must satisfy
pub enum OptionKind {
    Bool,
    Int { lower: i64, upper: i64 },
    Float { lower: f64, upper: f64 },
    Str,
    Enum { values: Vec<String> },
}

impl OptionKind {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Int { .. } => "integer",
            Self::Float { .. } => "float",
            Self::Str => "string",
            Self::Enum { .. } => "enumerated string",
        }
    }

    /// Checks `value` against the kind and returns it in canonical form
    ///
    /// Integers are accepted for float options and strings for enumerated options.
    fn validate(&self, name: &str, value: OptionValue) -> Result<OptionValue, OptionError> {
        let mismatch = || OptionError::TypeMismatch {
            name: name.to_string(),
            expected: self.type_name(),
        };

        match (self, value) {
            (Self::Bool, OptionValue::Bool(value)) => Ok(OptionValue::Bool(value)),
            (Self::Int { lower, upper }, OptionValue::Int(value)) => {
                if (*lower..=*upper).contains(&value) {
                    Ok(OptionValue::Int(value))
                } else {
                    Err(OptionError::OutOfRange {
                        name: name.to_string(),
                        value: value.to_string(),
                        lower: lower.to_string(),
                        upper: upper.to_string(),
                    })
                }
            }
            (Self::Float { lower, upper }, OptionValue::Float(value)) => {
                if (*lower..=*upper).contains(&value) {
                    Ok(OptionValue::Float(value))
                } else {
                    Err(OptionError::OutOfRange {
                        name: name.to_string(),
                        value: value.to_string(),
                        lower: lower.to_string(),
                        upper: upper.to_string(),
                    })
                }
            }
            (Self::Float { .. }, OptionValue::Int(value)) => {
                self.validate(name, OptionValue::Float(value as f64))
            }
            (Self::Str, OptionValue::Str(value)) => Ok(OptionValue::Str(value)),
            (Self::Enum { values }, OptionValue::Enum(value))
            | (Self::Enum { values }, OptionValue::Str(Some(value))) => {
                if values.iter().any(|v| *v == value) {
                    Ok(OptionValue::Enum(value))
                } else {
                    Err(OptionError::InvalidEnumValue {
                        name: name.to_string(),
                        value,
                        valid: values.join(", "),
                    })
                }
            }
            _ => Err(mismatch()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// A registered option: its kind, default, current value and description
pub struct OptionEntry {
    kind: OptionKind,
    default: OptionValue,
    value: OptionValue,
    description: String,
}

impl OptionEntry {
    pub fn kind(&self) -> &OptionKind {
        &self.kind
    }

    pub fn default_value(&self) -> &OptionValue {
        &self.default
    }

    pub fn value(&self) -> &OptionValue {
        &self.value
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns true if the current value is the registered default
    pub fn is_default(&self) -> bool {
        self.value == self.default
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Typed option store
///
/// Options are kept in name order, which is also the order used by `iter` and `Display`.
pub struct Options {
    entries: BTreeMap<String, OptionEntry>,
}

impl Options {
    /// Create an empty option store
    pub fn new() -> Self {
        Self::default()
    }

    fn register(
        &mut self,
        name: &str,
        kind: OptionKind,
        default: OptionValue,
        description: &str,
    ) -> Result<&mut Self, OptionError> {
        if self.entries.contains_key(name) {
            return Err(OptionError::AlreadyRegistered(name.to_string()));
        }

        let default = kind.validate(name, default)?;
        self.entries.insert(
            name.to_string(),
            OptionEntry {
                kind,
                value: default.clone(),
                default,
                description: description.to_string(),
            },
        );
        Ok(self)
    }

    /// Register a boolean option
    pub fn add_bool_option(
        &mut self,
        name: &str,
        default: bool,
        description: &str,
    ) -> Result<&mut Self, OptionError> {
        self.register(name, OptionKind::Bool, OptionValue::Bool(default), description)
    }

    /// Register an integer option restricted to `[lower, upper]`
    pub fn add_int_option(
        &mut self,
        name: &str,
        default: i64,
        lower: i64,
        upper: i64,
        description: &str,
    ) -> Result<&mut Self, OptionError> {
        self.register(
            name,
            OptionKind::Int { lower, upper },
            OptionValue::Int(default),
            description,
        )
    }

    /// Register a float option restricted to `[lower, upper]`
    pub fn add_float_option(
        &mut self,
        name: &str,
        default: f64,
        lower: f64,
        upper: f64,
        description: &str,
    ) -> Result<&mut Self, OptionError> {
        self.register(
            name,
            OptionKind::Float { lower, upper },
            OptionValue::Float(default),
            description,
        )
    }

    /// Register a free string option; `None` means the option is unset by default
    pub fn add_string_option(
        &mut self,
        name: &str,
        default: Option<&str>,
        description: &str,
    ) -> Result<&mut Self, OptionError> {
        self.register(
            name,
            OptionKind::Str,
            OptionValue::Str(default.map(str::to_string)),
            description,
        )
    }

    /// Register an enumerated string option; `default` must be one of `values`
    pub fn add_enum_option(
        &mut self,
        name: &str,
        default: &str,
        values: &[&str],
        description: &str,
    ) -> Result<&mut Self, OptionError> {
        self.register(
            name,
            OptionKind::Enum {
                values: values.iter().map(|v| v.to_string()).collect(),
            },
            OptionValue::Enum(default.to_string()),
            description,
        )
    }

    /// Returns true if `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the registered entry for `name`
    pub fn entry(&self, name: &str) -> Option<&OptionEntry> {
        self.entries.get(name)
    }

    /// Returns an iterator over the registered options in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Returns the number of registered options
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no option is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<&OptionEntry, OptionError> {
        self.entries
            .get(name)
            .ok_or_else(|| OptionError::UnknownOption(name.to_string()))
    }

    /// Set the value of a registered option
    ///
    /// The value is validated against the option kind; on error the stored value is unchanged.
    pub fn set_option(&mut self, name: &str, value: OptionValue) -> Result<(), OptionError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| OptionError::UnknownOption(name.to_string()))?;
        entry.value = entry.kind.validate(name, value)?;
        Ok(())
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<(), OptionError> {
        self.set_option(name, OptionValue::Bool(value))
    }

    pub fn set_int(&mut self, name: &str, value: i64) -> Result<(), OptionError> {
        self.set_option(name, OptionValue::Int(value))
    }

    pub fn set_float(&mut self, name: &str, value: f64) -> Result<(), OptionError> {
        self.set_option(name, OptionValue::Float(value))
    }

    /// Set a string or enumerated option
    pub fn set_str(&mut self, name: &str, value: Option<&str>) -> Result<(), OptionError> {
        self.set_option(name, OptionValue::Str(value.map(str::to_string)))
    }

    /// Restore the default value of an option
    pub fn reset(&mut self, name: &str) -> Result<(), OptionError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| OptionError::UnknownOption(name.to_string()))?;
        entry.value = entry.default.clone();
        Ok(())
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, OptionError> {
        match self.lookup(name)?.value {
            OptionValue::Bool(value) => Ok(value),
            _ => Err(OptionError::TypeMismatch {
                name: name.to_string(),
                expected: "boolean",
            }),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64, OptionError> {
        match self.lookup(name)?.value {
            OptionValue::Int(value) => Ok(value),
            _ => Err(OptionError::TypeMismatch {
                name: name.to_string(),
                expected: "integer",
            }),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<f64, OptionError> {
        match self.lookup(name)?.value {
            OptionValue::Float(value) => Ok(value),
            _ => Err(OptionError::TypeMismatch {
                name: name.to_string(),
                expected: "float",
            }),
        }
    }

    /// Get a string or enumerated option; unset strings are returned as `None`
    pub fn get_str(&self, name: &str) -> Result<Option<&str>, OptionError> {
        match &self.lookup(name)?.value {
            OptionValue::Str(value) => Ok(value.as_deref()),
            OptionValue::Enum(value) => Ok(Some(value.as_str())),
            _ => Err(OptionError::TypeMismatch {
                name: name.to_string(),
                expected: "string",
            }),
        }
    }

    /// Get a string or enumerated option that must have a value
    pub fn get_enum(&self, name: &str) -> Result<&str, OptionError> {
        self.get_str(name)?
            .ok_or_else(|| OptionError::Unset(name.to_string()))
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━ Options ━━━━━━━━━━━━━━━━━")?;
        for (name, entry) in self.iter() {
            let marker = if entry.is_default() { " " } else { "*" };
            writeln!(
                f,
                "{}{:<24} {:<12} {}",
                marker, name, entry.value, entry.description
            )?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}

#[cfg(test)]
mod tests_options {
    use super::*;

    fn sample_options() -> Options {
        let mut options = Options::new();
        options
            .add_enum_option(keys::ALGORITHM, "tr", &["ip", "tr", "mma"], "Algorithm")
            .unwrap()
            .add_string_option(keys::IP_CHECKPOINT_FILE, None, "Checkpoint file")
            .unwrap()
            .add_int_option(keys::QN_SUBSPACE_SIZE, 10, 0, 1000, "Subspace size")
            .unwrap()
            .add_float_option("abs_res_tol", 1e-6, 0.0, 1.0, "Residual tolerance")
            .unwrap()
            .add_bool_option("use_line_search", true, "Line search")
            .unwrap();
        options
    }

    #[test]
    /// Test the values of freshly registered options
    fn test_defaults() {
        let options = sample_options();

        assert_eq!(options.len(), 5);
        assert_eq!(options.get_enum(keys::ALGORITHM).unwrap(), "tr");
        assert_eq!(options.get_str(keys::IP_CHECKPOINT_FILE).unwrap(), None);
        assert_eq!(options.get_int(keys::QN_SUBSPACE_SIZE).unwrap(), 10);
        assert_eq!(options.get_float("abs_res_tol").unwrap(), 1e-6);
        assert!(options.get_bool("use_line_search").unwrap());
        assert!(options.iter().all(|(_, entry)| entry.is_default()));
    }

    #[test]
    /// Test that registering the same name twice is rejected
    fn test_duplicate_registration() {
        let mut options = sample_options();
        let error = options
            .add_bool_option(keys::ALGORITHM, false, "Duplicate")
            .unwrap_err();
        assert_eq!(
            error,
            OptionError::AlreadyRegistered(keys::ALGORITHM.to_string())
        );
        assert_eq!(options.get_enum(keys::ALGORITHM).unwrap(), "tr");
    }

    #[test]
    /// Test that an enumerated default outside its values is rejected
    fn test_invalid_enum_default() {
        let mut options = Options::new();
        let error = options
            .add_enum_option(keys::QN_TYPE, "dfp", &["bfgs", "sr1"], "Quasi-Newton type")
            .unwrap_err();
        assert_eq!(
            error,
            OptionError::InvalidEnumValue {
                name: keys::QN_TYPE.to_string(),
                value: "dfp".to_string(),
                valid: "bfgs, sr1".to_string(),
            }
        );
        assert!(!options.contains(keys::QN_TYPE));
    }

    #[test]
    /// Test setting values of every kind
    fn test_set_values() {
        let mut options = sample_options();

        options.set_str(keys::ALGORITHM, Some("ip")).unwrap();
        options
            .set_str(keys::IP_CHECKPOINT_FILE, Some("run.bin"))
            .unwrap();
        options.set_int(keys::QN_SUBSPACE_SIZE, 25).unwrap();
        options.set_float("abs_res_tol", 1e-8).unwrap();
        options.set_bool("use_line_search", false).unwrap();

        assert_eq!(options.get_enum(keys::ALGORITHM).unwrap(), "ip");
        assert_eq!(
            options.get_str(keys::IP_CHECKPOINT_FILE).unwrap(),
            Some("run.bin")
        );
        assert_eq!(options.get_int(keys::QN_SUBSPACE_SIZE).unwrap(), 25);
        assert_eq!(options.get_float("abs_res_tol").unwrap(), 1e-8);
        assert!(!options.get_bool("use_line_search").unwrap());
        assert!(!options.entry(keys::ALGORITHM).unwrap().is_default());
    }

    #[test]
    /// Test that integers are accepted by float options
    fn test_int_into_float() {
        let mut options = sample_options();
        options.set_int("abs_res_tol", 1).unwrap();
        assert_eq!(options.get_float("abs_res_tol").unwrap(), 1.0);
    }

    #[test]
    /// Test the validation errors of the setters
    fn test_invalid_values() {
        let mut options = sample_options();

        assert_eq!(
            options.set_str(keys::ALGORITHM, Some("sqp")).unwrap_err(),
            OptionError::InvalidEnumValue {
                name: keys::ALGORITHM.to_string(),
                value: "sqp".to_string(),
                valid: "ip, tr, mma".to_string(),
            }
        );
        assert!(matches!(
            options.set_int(keys::QN_SUBSPACE_SIZE, -1).unwrap_err(),
            OptionError::OutOfRange { .. }
        ));
        assert!(matches!(
            options.set_float("abs_res_tol", f64::NAN).unwrap_err(),
            OptionError::OutOfRange { .. }
        ));
        assert_eq!(
            options.set_bool(keys::QN_SUBSPACE_SIZE, true).unwrap_err(),
            OptionError::TypeMismatch {
                name: keys::QN_SUBSPACE_SIZE.to_string(),
                expected: "integer",
            }
        );
        assert_eq!(
            options.set_str(keys::ALGORITHM, None).unwrap_err(),
            OptionError::TypeMismatch {
                name: keys::ALGORITHM.to_string(),
                expected: "enumerated string",
            }
        );
        assert_eq!(
            options.set_int("missing", 1).unwrap_err(),
            OptionError::UnknownOption("missing".to_string())
        );

        // Failed sets keep the previous values
        assert_eq!(options.get_enum(keys::ALGORITHM).unwrap(), "tr");
        assert_eq!(options.get_int(keys::QN_SUBSPACE_SIZE).unwrap(), 10);
    }

    #[test]
    /// Test the type checks of the getters
    fn test_getter_type_mismatch() {
        let options = sample_options();

        assert!(matches!(
            options.get_int(keys::ALGORITHM),
            Err(OptionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            options.get_str(keys::QN_SUBSPACE_SIZE),
            Err(OptionError::TypeMismatch { .. })
        ));
        assert_eq!(
            options.get_enum(keys::IP_CHECKPOINT_FILE).unwrap_err(),
            OptionError::Unset(keys::IP_CHECKPOINT_FILE.to_string())
        );
        assert_eq!(
            options.get_bool("missing").unwrap_err(),
            OptionError::UnknownOption("missing".to_string())
        );
    }

    #[test]
    /// Test restoring a default value
    fn test_reset() {
        let mut options = sample_options();
        options.set_int(keys::QN_SUBSPACE_SIZE, 3).unwrap();
        options.reset(keys::QN_SUBSPACE_SIZE).unwrap();

        assert_eq!(options.get_int(keys::QN_SUBSPACE_SIZE).unwrap(), 10);
        assert!(options.reset("missing").is_err());
    }

    #[test]
    /// Test that the table lists every option and marks changed values
    fn test_options_display() {
        let mut options = sample_options();
        options.set_str(keys::ALGORITHM, Some("mma")).unwrap();

        let display = format!("{}", options);
        assert!(display.contains("Options"));
        assert!(display.contains("*algorithm"));
        assert!(display.contains(" qn_subspace_size"));
        assert!(display.contains("(none)"));
    }

    #[cfg(feature = "serde")]
    #[test]
    /// Test that options survive a round trip through bincode
    fn test_options_bincode() {
        let mut options = sample_options();
        options.set_str(keys::ALGORITHM, Some("ip")).unwrap();

        let encoded = bincode::serialize(&options).unwrap();
        let decoded: Options = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, options);
    }
}
