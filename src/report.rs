//! # Progress and Conflict Reporting
//!
//! The resolver does not print or log directly; it emits events through a
//! [`Reporter`] capability handed in by the caller. The default
//! [`LogReporter`] forwards to the `log` crate, the CLI layers styled
//! output on top, and tests inject a capturing sink.

use log::{info, warn};

use crate::error::Error;
use crate::source::SourceDescriptor;

/// Sink for resolution progress and non-fatal conflict events.
pub trait Reporter {
    /// A remote set is about to be fetched or updated.
    fn fetching(&self, source: &SourceDescriptor) {
        let _ = source;
    }

    /// A fetch or description load failed under keep-going.
    fn import_failed(&self, source: &SourceDescriptor, error: &Error);

    /// An already-resolved identity reappeared with a different raw
    /// descriptor. First-seen wins; this is informational.
    fn identity_conflict(&self, identity: &str, kept: &SourceDescriptor, ignored: &SourceDescriptor);

    /// Two different identities declared the same logical name.
    /// First-seen wins.
    fn name_conflict(&self, name: &str, kept: &SourceDescriptor, ignored: &SourceDescriptor);
}

/// Default reporter, forwarding to the `log` crate.
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn fetching(&self, source: &SourceDescriptor) {
        info!("Fetching package set from {}", source);
    }

    fn import_failed(&self, source: &SourceDescriptor, error: &Error) {
        warn!("Import of {} failed: {}", source, error);
    }

    fn identity_conflict(
        &self,
        identity: &str,
        kept: &SourceDescriptor,
        ignored: &SourceDescriptor,
    ) {
        warn!(
            "Conflicting sources for {}: keeping {}, ignoring {}",
            identity, kept, ignored
        );
    }

    fn name_conflict(&self, name: &str, kept: &SourceDescriptor, ignored: &SourceDescriptor) {
        warn!(
            "Package set name '{}' defined by both {} and {}: keeping the first",
            name, kept, ignored
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_reporter_emits_warnings() {
        testing_logger::setup();
        let reporter = LogReporter;
        let kept = SourceDescriptor::local("/srv/ws/a");
        let ignored = SourceDescriptor::local("/srv/ws/b");
        reporter.name_conflict("common", &kept, &ignored);
        testing_logger::validate(|captured| {
            assert_eq!(captured.len(), 1);
            assert_eq!(captured[0].level, log::Level::Warn);
            assert!(captured[0].body.contains("'common'"));
        });
    }
}
