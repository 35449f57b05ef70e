//! outcomes.csv — `year,target,outcome[,mar_anom,...]`.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use super::{parse_year, read_file, DataError};
use crate::domain::{Outcome, OutcomeTable, TargetId, TARGET_FEBMAR, TARGET_MARCH};

pub fn load_outcomes(path: &Path) -> Result<OutcomeTable, DataError> {
    let text = read_file(path)?;
    parse_outcomes(text.as_bytes())
}

/// Parse the outcomes CSV.
///
/// Lines starting with `#` are comments. Rows with an unparseable year, an
/// empty target or an unknown outcome are dropped. The March-only target is
/// derived from `mar_anom` on rows of the Feb–Mar target (positive ⇒ early
/// spring) and overrides any explicit March row for the same year.
pub fn parse_outcomes<R: Read>(reader: R) -> Result<OutcomeTable, DataError> {
    let mut rdr = ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let col = |name: &'static str| headers.iter().position(|h| h == name);
    let year_col = col("year").ok_or(DataError::MissingColumn("year"))?;
    let target_col = col("target").ok_or(DataError::MissingColumn("target"))?;
    let outcome_col = col("outcome").ok_or(DataError::MissingColumn("outcome"))?;
    let mar_col = col("mar_anom");

    let mut table = OutcomeTable::new();
    let mut derived = Vec::new();
    let mut dropped = 0usize;

    for record in rdr.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("");
        let Some(year) = parse_year(field(year_col)) else {
            dropped += 1;
            warn!(year = field(year_col), "dropping outcome row with bad year");
            continue;
        };
        let target = field(target_col);

        if target == TARGET_FEBMAR {
            if let Some(outcome) = march_outcome(&record, mar_col) {
                derived.push((year, outcome));
            }
        }

        match (target.is_empty(), Outcome::parse(field(outcome_col))) {
            (false, Some(outcome)) => table.insert(TargetId::new(target), year, outcome),
            _ => {
                dropped += 1;
                warn!(year, target_id = target, outcome = field(outcome_col), "dropping outcome row");
            }
        }
    }

    let march = TargetId::new(TARGET_MARCH);
    for (year, outcome) in derived {
        table.insert(march.clone(), year, outcome);
    }

    debug!(rows = table.len(), dropped, "parsed outcomes");
    Ok(table)
}

fn march_outcome(record: &StringRecord, mar_col: Option<usize>) -> Option<Outcome> {
    let anomaly: f64 = record.get(mar_col?)?.parse().ok()?;
    anomaly.is_finite().then(|| {
        if anomaly > 0.0 {
            Outcome::EarlySpring
        } else {
            Outcome::LongWinter
        }
    })
}
