/*!
Miscelanous items related to [logging](log).

Calls to the log macro are made throughout the library.
These are intended to provide useful information for extending the library and/or fixing issues.

Note, no log implementation is provided.
For more details, see [log].
*/

/// Targets to be used within a [log]! macro.
pub mod targets {
    /// Logs related to the [generator](crate::generator)
    pub const GENERATOR: &str = "generator";

    /// Logs related to the [oracle adapter](crate::oracle)
    pub const ORACLE: &str = "oracle";

    /// Logs related to [storage](crate::db)
    pub const STORAGE: &str = "storage";

    /// Logs related to [SMT queries](crate::smt)
    pub const SMT: &str = "smt";

    /// Logs related to the [solve procedure](crate::procedures)
    pub const SOLVE: &str = "solve";

    /// Logs related to [finalization](crate::procedures::finalize)
    pub const POLICY: &str = "policy";

    /// Result-grade transitions, one line per significant event
    pub const RESULT: &str = "result";
}
