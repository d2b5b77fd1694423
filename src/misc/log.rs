/*!
Miscellaneous items related to [logging](log).

Calls to the log macro are made throughout the library.
These are intended to provide useful information for extending the library and/or fixing issues.

Note, no log implementation is provided.
For more details, see [log].
*/

/// Targets to be used within a [log]! macro.
pub mod targets {
    /// Logs related to the [consequence finder](crate::saturation).
    pub const SATURATION: &str = "saturation";

    /// Logs related to [abstract states](crate::state).
    pub const STATE: &str = "state";

    /// Logs related to state joins.
    pub const MERGE: &str = "merge";

    /// Logs related to the [forward analysis](crate::analysis).
    pub const ANALYSIS: &str = "analysis";

    /// Logs related to [control-flow graph construction](crate::cfg).
    pub const CFG: &str = "cfg";

    /// Logs related to the [solver bridge](crate::smt).
    pub const SMT: &str = "smt";
}
