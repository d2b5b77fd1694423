/*!
Error types used in the library.

- Some of these are internally expected --- the empty-clause signal steers the driver around infeasible states the way a conflict steers a solve.
- Others are external and fatal --- a call to an address with no registered transformer cannot be analysed soundly, so the analysis stops.
*/

use crate::program::Addr;

/// A union of varied error kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// An error during the forward analysis.
    Analysis(AnalysisError),

    /// An error in the instruction source.
    Program(ProgramError),

    /// A signal from the consequence finder.
    Saturation(SaturationError),

    /// A failed proof obligation.
    Proof(ProofError),
}

/// An error during the forward analysis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisError {
    /// A call whose target is not a constant address, or has no registered transformer.
    ///
    /// Fatal: the caller must register a transformer for the target.
    UndeterminedCall(Addr),

    /// A name was not found in the symbol table.
    UnknownSymbol(String),

    /// The analysis has not been initialised from an entry point.
    Uninitialised,
}

impl From<AnalysisError> for ErrorKind {
    fn from(e: AnalysisError) -> Self {
        ErrorKind::Analysis(e)
    }
}

/// An error in the instruction source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgramError {
    /// No instruction is recorded at the address.
    MissingInstruction(Addr),
}

impl From<ProgramError> for ErrorKind {
    fn from(e: ProgramError) -> Self {
        ErrorKind::Program(e)
    }
}

/// A signal from the consequence finder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaturationError {
    /// The empty clause was derived: the state is contradictory.
    ///
    /// This is expected from time to time, and locally recoverable --- the holder of the state marks it infeasible and drops the edge.
    EmptyClause,
}

impl From<SaturationError> for ErrorKind {
    fn from(e: SaturationError) -> Self {
        ErrorKind::Saturation(e)
    }
}

/// A failed proof obligation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProofError {
    /// The final query was satisfiable together with the state.
    Unproved(String),
}

impl From<ProofError> for ErrorKind {
    fn from(e: ProofError) -> Self {
        ErrorKind::Proof(e)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Analysis(AnalysisError::UndeterminedCall(addr)) => {
                write!(f, "cannot perform call at {addr:#x}: no transformer registered")
            }
            ErrorKind::Analysis(AnalysisError::UnknownSymbol(name)) => {
                write!(f, "unknown symbol: {name}")
            }
            ErrorKind::Analysis(AnalysisError::Uninitialised) => {
                write!(f, "analysis not initialised from an entry point")
            }
            ErrorKind::Program(ProgramError::MissingInstruction(addr)) => {
                write!(f, "no instruction at {addr:#x}")
            }
            ErrorKind::Saturation(SaturationError::EmptyClause) => {
                write!(f, "derived the empty clause")
            }
            ErrorKind::Proof(ProofError::Unproved(query)) => {
                write!(f, "proof failed: {query}")
            }
        }
    }
}
