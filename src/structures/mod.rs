/*!
The logical structures of the domain: terms, atoms, literals, and clauses.

Each structural kind has a process-wide interning table, populated on first use.
Factories return canonical values, and every operation over the structures is purely functional: transformed values are fresh interned values, with intact sub-structure shared.

The tables grow for the lifetime of the process and are never invalidated by the analysis itself.
[reset_interners] releases them between runs.
*/

pub mod atom;
pub mod clause;
pub mod literal;
pub mod term;

/// Clears every interning table.
///
/// The analysis itself never resets: the tables are left to grow for the life of the process.
/// The function exists for library consumers embedding repeated runs, as the one way to release the tables' memory in between.
///
/// Outstanding [term](term::Term), [atom](atom::Atom), [literal](literal::Literal), and [clause](clause::Clause) identifiers are invalidated by a reset: call this only between runs, with no structure values held.
pub fn reset_interners() {
    clause::clear_table();
    literal::clear_table();
    atom::clear_table();
    term::clear_table();
}
