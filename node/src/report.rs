use std::io::{self, Write};

use lc_scan::{Extremes, ScanReport};

pub const NO_TRANSFERS: &str = "no transfers found";

/// Writes the extreme address(es), one per line and the smaller balance first on a tie, followed by the
/// elapsed time.
pub fn write_report(report: &ScanReport, out: &mut impl Write) -> io::Result<()> {
    match &report.extremes {
        Extremes::Empty => writeln!(out, "{NO_TRANSFERS}")?,
        Extremes::Single(extreme) => writeln!(out, "{}", extreme.address)?,
        Extremes::Tied { min, max } => {
            writeln!(out, "{}", min.address)?;
            writeln!(out, "{}", max.address)?;
        }
    }
    writeln!(out, "{:?}", report.elapsed)?;
    out.flush()
}
