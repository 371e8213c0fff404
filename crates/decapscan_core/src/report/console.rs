use super::{ReportResult, Reporter};
use crate::analysis::decapsulation::DecapsulationSet;
use std::io::Write;

/// Plain-text reporter: one `- field (tx)` line per field followed by
/// indented `  - accessor (tx)` lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, sets: &[&DecapsulationSet], out: &mut dyn Write) -> ReportResult<()> {
        for set in sets {
            writeln!(out, "- {}", set.field())?;
            for accessor in set.accessors() {
                writeln!(out, "  - {accessor}")?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ConsoleReporter;
    use crate::analysis::decapsulation::{DecapsulationSet, TrackedNode};
    use crate::report::Reporter;

    #[test]
    fn console_report_lists_fields_then_accessors() {
        let mut set = DecapsulationSet::new(TrackedNode::new("Main.java:version", "0"));
        set.add_accessor(TrackedNode::new("Main.java:getVersion()", "1"));

        let mut out = Vec::new();
        ConsoleReporter.report(&[&set], &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "- Main.java:version (0)\n  - Main.java:getVersion() (1)\n"
        );
    }
}
