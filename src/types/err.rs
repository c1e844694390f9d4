/*!
Error types used in the library.

- Some of these are external --- e.g. a malformed literals file surfaces as a
  [ConfigError] before the solve loop starts.
- Others are internally expected --- e.g. oracle timeouts are downgraded to unknown
  verdicts and the solve loop proceeds.
- Term errors are programmer errors: a width mismatch which cannot be normalized or an
  unregistered variable aborts the run.

Names of the error enums --- for the most part --- overlap with corresponding structs.
*/

/// A union of varied error kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// An error in the configuration or an input file.
    Config(ConfigError),

    /// An error when interacting with the external engine.
    Oracle(OracleError),

    /// An error from the SMT backend.
    Smt(SmtError),

    /// An error when building or rendering terms.
    Term(TermError),
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {e:?}"),
            Self::Oracle(e) => write!(f, "oracle error: {e:?}"),
            Self::Smt(e) => write!(f, "smt error: {e:?}"),
            Self::Term(e) => write!(f, "term error: {e:?}"),
        }
    }
}

/// Errors in the configuration or an input file, prior to the solve loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required input file could not be read.
    Io(String),

    /// A malformed line in the literals file.
    Literals(String),

    /// A malformed line in the directives file.
    Directives(String),

    /// A malformed constant spelling.
    Constant(String),

    /// A malformed variable identifier.
    Identifier(String),

    /// Robust mode was requested without a robust configuration file.
    MissingRobustConfig,
}

impl From<ConfigError> for ErrorKind {
    fn from(e: ConfigError) -> Self {
        ErrorKind::Config(e)
    }
}

/// Errors when interacting with the external engine.
///
/// Timeouts and crashes are not in this enum.
/// Both are expected from time to time, are recorded in the oracle statistics, and
/// downgrade the verdict of the relevant query to unknown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OracleError {
    /// The engine process could not be spawned.
    Spawn(String),

    /// A transient script file could not be written.
    Script(String),
}

impl From<OracleError> for ErrorKind {
    fn from(e: OracleError) -> Self {
        ErrorKind::Oracle(e)
    }
}

/// Errors from the SMT backend.
///
/// An unexpected unknown is treated by every pruning caller as a failure to prune, so
/// the candidate conservatively survives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SmtError {
    /// The solver returned unknown.
    Unknown,
}

impl From<SmtError> for ErrorKind {
    fn from(e: SmtError) -> Self {
        ErrorKind::Smt(e)
    }
}

/// Errors when building or rendering terms.
///
/// These indicate an internal invariant was broken and abort the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TermError {
    /// Operand widths differ and neither operand is a constant which may be re-interned.
    WidthMismatch(u32, u32),

    /// A variable was referenced without having been declared in the arena.
    UnregisteredVariable(String),

    /// A slice index outside the width of the base variable.
    SliceOutOfRange,

    /// A boolean connective over an empty set of terms.
    EmptyConnective,

    /// A constant too wide for the internal representation.
    ConstantTooWide(String),
}

impl From<TermError> for ErrorKind {
    fn from(e: TermError) -> Self {
        ErrorKind::Term(e)
    }
}
