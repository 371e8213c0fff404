use super::{ReportResult, Reporter};
use crate::analysis::decapsulation::DecapsulationSet;
use std::io::Write;

/// Reporter emitting a JSON array of decapsulation sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReporter {
    pub pretty: bool,
}

impl Reporter for JsonReporter {
    fn report(&self, sets: &[&DecapsulationSet], out: &mut dyn Write) -> ReportResult<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *out, sets)?;
        } else {
            serde_json::to_writer(&mut *out, sets)?;
        }
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::JsonReporter;
    use crate::analysis::decapsulation::{DecapsulationSet, TrackedNode};
    use crate::report::Reporter;

    #[test]
    fn json_report_serializes_field_and_accessors() {
        let mut set = DecapsulationSet::new(TrackedNode::new("A.java:x", "0"));
        set.add_accessor(TrackedNode::new("A.java:isX()", "4"));

        let mut out = Vec::new();
        JsonReporter::default().report(&[&set], &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["field"]["id"], "A.java:x");
        assert_eq!(value[0]["accessors"][0]["transaction_id"], "4");
    }
}
