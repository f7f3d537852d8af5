//! Built-in adapters that ship with `miesc-core` and require no external
//! binary or runtime. They exist so a full audit run (and in particular the
//! end-to-end scenarios this crate tests) is exercisable with zero external
//! tools installed, per the "system must run with zero external tools"
//! optionality constraint. They are deliberately simple regex-based
//! heuristics, not a claim of completeness against any real static analyzer.

pub mod pattern_static;
pub mod pragma;

pub use pattern_static::PatternStaticAdapter;
pub use pragma::PragmaAdapter;
