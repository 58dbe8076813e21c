//! Checkstyle-driven fixes for a Java source tree.

pub mod checkstyle;
pub mod fixers;
pub mod runner;
pub mod scan;

pub use checkstyle::{CheckstyleReport, Warning, WarningKind};
pub use fixers::{Fix, FixContext, Fixer, FixerKind};
pub use runner::{collect_java_files, FixReport, FixRunner, FixTargets};
