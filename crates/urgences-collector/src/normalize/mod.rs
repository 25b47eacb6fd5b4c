//! Source payload normalization
//!
//! Turns the decoded CSV text into a sequence of [`FacilityRecord`]s.
//! Columns are located by header name so the source can reorder them
//! between publications. Malformed rows are skipped and counted, never
//! fatal; only an unreadable payload aborts the run.

pub mod accents;
pub mod decode;

pub use accents::strip_accents;
pub use decode::{decode_payload, DecodedPayload};

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;
use urgences_common::{CollectorError, Result};

// ============================================================================
// Source Column Names
// ============================================================================
// Compared after trim + accent-strip, located by position from the header
// row, so column order in the source is irrelevant.

pub const COL_FACILITY: &str = "Nom_installation";
pub const COL_REGION: &str = "Region";
pub const COL_FUNCTIONAL: &str = "Civieres_fonctionnelles";
pub const COL_OCCUPIED: &str = "Civieres_occupees";
pub const COL_ON_STRETCHER: &str = "Patients_sur_civiere";
pub const COL_OCCUPANCY_RATE: &str = "Taux_occupation";
pub const COL_WAITING: &str = "Patients_en_attente";
pub const COL_MEAN_WAIT: &str = "Attente_moyenne";
pub const COL_MEDIAN_WAIT: &str = "Attente_mediane";
pub const COL_EXTRACTED_AT: &str = "Heure_extraction";

/// Accepted layouts for the observation timestamp
const TIMESTAMP_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];

/// One normalized emergency-room observation
///
/// Optional fields that are unset are omitted from the serialized event;
/// unset and zero are distinct states downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    /// Facility name, diacritics stripped
    pub facility_name: String,

    /// Administrative health-region code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub functional_stretchers: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupied_stretchers: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub patients_on_stretcher: Option<u32>,

    /// Occupancy percentage; derived from occupied/functional when the
    /// source does not supply it directly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy_rate: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_patients: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_wait_minutes: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_wait_minutes: Option<f64>,

    /// Source-reported observation time
    pub extracted_at: DateTime<Utc>,
}

/// Why a row was dropped instead of normalized
///
/// Never propagated as an error; rendered into the skip log and counted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("column count mismatch: expected {expected}, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("missing mandatory field '{0}'")]
    MissingField(&'static str),

    #[error("invalid numeric value '{value}' in column '{column}'")]
    InvalidNumeric {
        column: &'static str,
        value: String,
    },

    #[error("unparseable timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Name-to-position index built once per run from the header row
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
    width: usize,
}

impl HeaderIndex {
    /// Build the index from the header record
    ///
    /// Header names are trimmed and accent-stripped before indexing, so
    /// `Civières_fonctionnelles` in the source matches [`COL_FUNCTIONAL`].
    pub fn from_record(header: &StringRecord) -> Self {
        let positions = header
            .iter()
            .enumerate()
            .map(|(i, name)| (strip_accents(name.trim()), i))
            .collect();
        Self {
            positions,
            width: header.len(),
        }
    }

    /// Number of columns in the header row
    pub fn width(&self) -> usize {
        self.width
    }

    /// Extract a trimmed, non-empty field from a row by column name
    pub fn field<'r>(&self, row: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.positions
            .get(column)
            .and_then(|&i| row.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// Lazy iterator over normalized records
///
/// Restartable by constructing a new reader over the same decoded text.
/// Rows that fail normalization are counted (see [`RecordReader::skipped`])
/// and logged, never surfaced as errors.
pub struct RecordReader<'a> {
    records: StringRecordsIntoIter<&'a [u8]>,
    header: HeaderIndex,
    row: usize,
    skipped: usize,
}

impl std::fmt::Debug for RecordReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReader")
            .field("header", &self.header)
            .field("row", &self.row)
            .field("skipped", &self.skipped)
            .finish_non_exhaustive()
    }
}

impl<'a> RecordReader<'a> {
    /// Create a reader over decoded CSV text, consuming the header row
    pub fn new(text: &'a str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let header_record = reader
            .headers()
            .map_err(|e| CollectorError::decode(format!("unreadable header row: {e}")))?
            .clone();
        if header_record.iter().all(|name| name.trim().is_empty()) {
            return Err(CollectorError::decode("source payload has no header row"));
        }

        Ok(Self {
            records: reader.into_records(),
            header: HeaderIndex::from_record(&header_record),
            row: 1,
            skipped: 0,
        })
    }

    /// Number of rows skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The header index for this payload
    pub fn header(&self) -> &HeaderIndex {
        &self.header
    }
}

impl Iterator for RecordReader<'_> {
    type Item = FacilityRecord;

    fn next(&mut self) -> Option<FacilityRecord> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => {
                    self.row += 1;
                    self.skipped += 1;
                    warn!(row = self.row, error = %e, "Skipping unreadable row");
                    continue;
                },
            };
            self.row += 1;

            match parse_row(&self.header, &record) {
                Ok(normalized) => return Some(normalized),
                Err(reason) => {
                    self.skipped += 1;
                    warn!(row = self.row, reason = %reason, "Skipping row");
                },
            }
        }
    }
}

/// Normalize one data row against the header index
fn parse_row(
    header: &HeaderIndex,
    row: &StringRecord,
) -> std::result::Result<FacilityRecord, SkipReason> {
    if row.len() != header.width() {
        return Err(SkipReason::ColumnCountMismatch {
            expected: header.width(),
            actual: row.len(),
        });
    }

    let facility_name = header
        .field(row, COL_FACILITY)
        .map(strip_accents)
        .ok_or(SkipReason::MissingField(COL_FACILITY))?;

    let raw_timestamp = header
        .field(row, COL_EXTRACTED_AT)
        .ok_or(SkipReason::MissingField(COL_EXTRACTED_AT))?;
    let extracted_at = parse_timestamp(raw_timestamp)
        .ok_or_else(|| SkipReason::InvalidTimestamp(raw_timestamp.to_string()))?;

    let region = header.field(row, COL_REGION).map(strip_accents);

    let functional_stretchers = opt_u32(header, row, COL_FUNCTIONAL)?;
    let occupied_stretchers = opt_u32(header, row, COL_OCCUPIED)?;
    let patients_on_stretcher = opt_u32(header, row, COL_ON_STRETCHER)?;
    let waiting_patients = opt_u32(header, row, COL_WAITING)?;
    let mean_wait_minutes = opt_f64(header, row, COL_MEAN_WAIT)?;
    let median_wait_minutes = opt_f64(header, row, COL_MEDIAN_WAIT)?;

    let mut occupancy_rate = opt_f64(header, row, COL_OCCUPANCY_RATE)?;
    if occupancy_rate.is_none() {
        if let (Some(occupied), Some(functional)) = (occupied_stretchers, functional_stretchers) {
            if functional > 0 {
                occupancy_rate = Some(f64::from(occupied) / f64::from(functional) * 100.0);
            }
        }
    }

    Ok(FacilityRecord {
        facility_name,
        region,
        functional_stretchers,
        occupied_stretchers,
        patients_on_stretcher,
        occupancy_rate,
        waiting_patients,
        mean_wait_minutes,
        median_wait_minutes,
        extracted_at,
    })
}

/// Parse the observation timestamp, trying each accepted layout
///
/// The source reports naive local times; they are anchored to UTC for
/// epoch derivation.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    TIMESTAMP_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .map(|naive| naive.and_utc())
}

fn opt_u32(
    header: &HeaderIndex,
    row: &StringRecord,
    column: &'static str,
) -> std::result::Result<Option<u32>, SkipReason> {
    match header.field(row, column) {
        None => Ok(None),
        Some(raw) => parse_count(raw)
            .map(Some)
            .ok_or_else(|| SkipReason::InvalidNumeric {
                column,
                value: raw.to_string(),
            }),
    }
}

fn opt_f64(
    header: &HeaderIndex,
    row: &StringRecord,
    column: &'static str,
) -> std::result::Result<Option<f64>, SkipReason> {
    match header.field(row, column) {
        None => Ok(None),
        Some(raw) => parse_decimal(raw)
            .map(Some)
            .ok_or_else(|| SkipReason::InvalidNumeric {
                column,
                value: raw.to_string(),
            }),
    }
}

/// Parse a non-negative integer, tolerating space/NBSP thousands separators
fn parse_count(raw: &str) -> Option<u32> {
    strip_group_separators(raw).parse().ok()
}

/// Parse a decimal, tolerating comma decimal separators and space/NBSP
/// thousands separators
fn parse_decimal(raw: &str) -> Option<f64> {
    strip_group_separators(raw)
        .replace(',', ".")
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
}

fn strip_group_separators(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const HEADER: &str = "Nom_installation,Region,Civieres_fonctionnelles,Civieres_occupees,\
Patients_sur_civiere,Taux_occupation,Patients_en_attente,Attente_moyenne,Attente_mediane,\
Heure_extraction";

    fn one_row(row: &str) -> (Vec<FacilityRecord>, usize) {
        let text = format!("{HEADER}\n{row}\n");
        let mut reader = RecordReader::new(&text).unwrap();
        let records: Vec<FacilityRecord> = reader.by_ref().collect();
        (records, reader.skipped())
    }

    #[test]
    fn test_well_formed_row() {
        let (records, skipped) = one_row(
            "Hopital de Verdun,06,45,40,38,88.9,12,3.2,2.5,2026-08-26 09:00:00",
        );
        assert_eq!(skipped, 0);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.facility_name, "Hopital de Verdun");
        assert_eq!(record.region.as_deref(), Some("06"));
        assert_eq!(record.functional_stretchers, Some(45));
        assert_eq!(record.occupied_stretchers, Some(40));
        assert_eq!(record.patients_on_stretcher, Some(38));
        assert_eq!(record.occupancy_rate, Some(88.9));
        assert_eq!(record.waiting_patients, Some(12));
        assert_eq!(record.mean_wait_minutes, Some(3.2));
        assert_eq!(record.median_wait_minutes, Some(2.5));
        assert_eq!(
            record.extracted_at.to_rfc3339(),
            "2026-08-26T09:00:00+00:00"
        );
    }

    #[test]
    fn test_accented_name_is_stripped() {
        let (records, _) = one_row("Hôpital Général,06,,,,,,,,2026-08-26 09:00:00");
        assert_eq!(records[0].facility_name, "Hopital General");
    }

    #[test]
    fn test_accented_header_names_match() {
        let text = "Nom_installation,Civières_fonctionnelles,Heure_extraction\n\
Hopital A,45,2026-08-26 09:00:00\n";
        let mut reader = RecordReader::new(text).unwrap();
        let records: Vec<FacilityRecord> = reader.by_ref().collect();
        assert_eq!(records[0].functional_stretchers, Some(45));
    }

    #[test]
    fn test_column_order_is_irrelevant() {
        let text = "Heure_extraction,Nom_installation,Region\n\
2026-08-26 09:00:00,Hopital A,06\n";
        let mut reader = RecordReader::new(text).unwrap();
        let records: Vec<FacilityRecord> = reader.by_ref().collect();
        assert_eq!(records[0].facility_name, "Hopital A");
        assert_eq!(records[0].region.as_deref(), Some("06"));
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let row = "Hôpital Fleurimont,05,30,25,24,,8,2.1,1.9,2026-08-26 09:00:00";
        let (first, _) = one_row(row);
        let text = format!("{HEADER}\nFiller,06,,,,,,,,2026-08-26 08:00:00\n{row}\n");
        let mut reader = RecordReader::new(&text).unwrap();
        let later: Vec<FacilityRecord> = reader.by_ref().collect();
        assert_eq!(first[0], later[1]);
    }

    #[test]
    fn test_non_numeric_value_skips_exactly_one_row() {
        let text = format!(
            "{HEADER}\n\
Hopital A,06,quarante,40,38,,12,3.2,2.5,2026-08-26 09:00:00\n\
Hopital B,06,45,40,38,,12,3.2,2.5,2026-08-26 09:00:00\n"
        );
        let mut reader = RecordReader::new(&text).unwrap();
        let records: Vec<FacilityRecord> = reader.by_ref().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].facility_name, "Hopital B");
        assert_eq!(reader.skipped(), 1);
    }

    #[test]
    fn test_missing_mandatory_fields_skip() {
        let (records, skipped) = one_row(",06,45,40,38,,12,3.2,2.5,2026-08-26 09:00:00");
        assert!(records.is_empty());
        assert_eq!(skipped, 1);

        let (records, skipped) = one_row("Hopital A,06,45,40,38,,12,3.2,2.5,");
        assert!(records.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_unparseable_timestamp_skips() {
        let (records, skipped) = one_row("Hopital A,06,45,40,38,,12,3.2,2.5,yesterday");
        assert!(records.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_column_count_mismatch_skips() {
        let (records, skipped) = one_row("Hopital A,06,45");
        assert!(records.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_occupancy_rate_derived_when_absent() {
        let (records, _) = one_row("Hopital A,06,50,40,38,,12,3.2,2.5,2026-08-26 09:00:00");
        let rate = records[0].occupancy_rate.unwrap();
        assert!((rate - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_occupancy_rate_unset_when_functional_is_zero() {
        let (records, _) = one_row("Hopital A,06,0,0,0,,12,3.2,2.5,2026-08-26 09:00:00");
        assert_eq!(records[0].occupancy_rate, None);
    }

    #[test]
    fn test_occupancy_rate_unset_when_inputs_absent() {
        let (records, _) = one_row("Hopital A,06,,,,,,,,2026-08-26 09:00:00");
        assert_eq!(records[0].occupancy_rate, None);
    }

    #[test]
    fn test_direct_rate_preferred_over_derivation() {
        let (records, _) = one_row("Hopital A,06,50,40,38,85.0,12,3.2,2.5,2026-08-26 09:00:00");
        assert_eq!(records[0].occupancy_rate, Some(85.0));
    }

    #[test]
    fn test_unset_fields_omitted_from_serialized_event() {
        let (records, _) = one_row("Hopital A,06,,,,,,,,2026-08-26 09:00:00");
        let json = serde_json::to_value(&records[0]).unwrap();
        assert!(json.get("occupancy_rate").is_none());
        assert!(json.get("functional_stretchers").is_none());
        assert_eq!(json["facility_name"], "Hopital A");
    }

    #[test]
    fn test_locale_numeric_coercion() {
        let (records, skipped) =
            one_row("Hopital A,06,1 234,1\u{a0}100,38,\"85,5\",12,\"3,2\",2.5,2026-08-26 09:00:00");
        assert_eq!(skipped, 0);
        assert_eq!(records[0].functional_stretchers, Some(1234));
        assert_eq!(records[0].occupied_stretchers, Some(1100));
        assert_eq!(records[0].occupancy_rate, Some(85.5));
        assert_eq!(records[0].mean_wait_minutes, Some(3.2));
    }

    #[test]
    fn test_alternate_timestamp_layouts() {
        let (records, _) = one_row("Hopital A,06,,,,,,,,2026-08-26T09:00:00");
        assert_eq!(records.len(), 1);
        let (records, _) = one_row("Hopital A,06,,,,,,,,26/08/2026 09:00");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_reader_is_restartable() {
        let text = format!("{HEADER}\nHopital A,06,,,,,,,,2026-08-26 09:00:00\n");
        let first: Vec<FacilityRecord> = RecordReader::new(&text).unwrap().collect();
        let second: Vec<FacilityRecord> = RecordReader::new(&text).unwrap().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_payload_is_decode_error() {
        let err = RecordReader::new("").unwrap_err();
        assert!(matches!(err, CollectorError::Decode(_)));
    }
}
