//! Tabular sample layout
//!
//! Every sample file (per-class stores, the consolidated dataset and the
//! normalized splits) shares one layout:
//!
//! ```text
//! x_0,y_0,z_0,x_1,y_1,z_1,...,x_20,y_20,z_20,label
//! 0.512,0.731,-0.000041,0.498,0.652,-0.0132,...,0.601,0.402,-0.0290,A
//! ```
//!
//! Rows are checked strictly on read. A row with the wrong number of columns,
//! an unparsable or non-finite number, or an unknown label is a schema error
//! for the whole file; rows are never padded, truncated or skipped.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use handsign_core::features::feature_column_names;
use handsign_core::{persist, FeatureVector, GestureLabel, FEATURE_DIM};

use crate::error::{DatasetError, DatasetResult};

/// Name of the label column
pub const LABEL_COLUMN: &str = "label";

/// Columns per row: features then label
pub const COLUMN_COUNT: usize = FEATURE_DIM + 1;

/// Header row of every sample file
pub fn header() -> Vec<String> {
    let mut columns = feature_column_names();
    columns.push(LABEL_COLUMN.to_string());
    columns
}

/// One feature vector with its class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label: GestureLabel,
}

impl LabeledSample {
    pub fn new(features: FeatureVector, label: GestureLabel) -> Self {
        Self { features, label }
    }

    /// Bit pattern of the features, for exact duplicate detection
    pub fn feature_bits(&self) -> [u32; FEATURE_DIM] {
        let mut bits = [0u32; FEATURE_DIM];
        for (b, v) in bits.iter_mut().zip(self.features.iter()) {
            *b = v.to_bits();
        }
        bits
    }
}

/// Ordered collection of labeled samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    samples: Vec<LabeledSample>,
}

impl Dataset {
    pub fn new(samples: Vec<LabeledSample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    pub fn extend(&mut self, samples: impl IntoIterator<Item = LabeledSample>) {
        self.samples.extend(samples);
    }

    pub fn labels(&self) -> Vec<GestureLabel> {
        self.samples.iter().map(|s| s.label).collect()
    }

    pub fn features(&self) -> Vec<FeatureVector> {
        self.samples.iter().map(|s| s.features).collect()
    }

    /// Samples per class, letters in alphabet order
    pub fn class_counts(&self) -> BTreeMap<GestureLabel, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.samples {
            *counts.entry(s.label).or_insert(0) += 1;
        }
        counts
    }

    /// Samples at `indices`, in the given order
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset::new(indices.iter().map(|&i| self.samples[i]).collect())
    }

    /// Read a sample file, validating every row
    ///
    /// With `expected_label` set, every row must carry that label.
    pub fn read_csv(path: &Path, expected_label: Option<GestureLabel>) -> DatasetResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| DatasetError::csv(path, e))?;

        let headers = reader.headers().map_err(|e| DatasetError::csv(path, e))?.clone();
        check_header(path, &headers)?;

        let mut samples = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| DatasetError::csv(path, e))?;
            samples.push(parse_row(path, &record, expected_label)?);
        }
        Ok(Self::new(samples))
    }

    /// Atomically write all samples with a header
    pub fn write_csv(&self, path: &Path) -> DatasetResult<()> {
        persist::write_atomic(path, |out| write_rows(out, self.samples.iter(), true))?;
        Ok(())
    }
}

/// Require the exact header, column for column
pub fn check_header(path: &Path, headers: &StringRecord) -> DatasetResult<()> {
    if headers.len() != COLUMN_COUNT {
        return Err(DatasetError::schema(
            path,
            1,
            format!("header has {} columns, expected {COLUMN_COUNT}", headers.len()),
        ));
    }
    for (i, (found, expected)) in headers.iter().zip(header()).enumerate() {
        if found.trim() != expected {
            return Err(DatasetError::schema(
                path,
                1,
                format!("column {i} is '{found}', expected '{expected}'"),
            ));
        }
    }
    Ok(())
}

/// Parse one data row
pub fn parse_row(
    path: &Path,
    record: &StringRecord,
    expected_label: Option<GestureLabel>,
) -> DatasetResult<LabeledSample> {
    let line = record.position().map(|p| p.line()).unwrap_or(0);

    if record.len() != COLUMN_COUNT {
        return Err(DatasetError::schema(
            path,
            line,
            format!(
                "row has {} feature columns, expected {FEATURE_DIM}",
                record.len().saturating_sub(1)
            ),
        ));
    }

    let mut values = [0.0f32; FEATURE_DIM];
    for (i, (slot, field)) in values.iter_mut().zip(record.iter()).enumerate() {
        let value: f32 = field.trim().parse().map_err(|_| {
            DatasetError::schema(path, line, format!("column {i}: '{field}' is not a number"))
        })?;
        if !value.is_finite() {
            return Err(DatasetError::schema(
                path,
                line,
                format!("column {i}: non-finite value"),
            ));
        }
        *slot = value;
    }

    let raw_label = record.get(FEATURE_DIM).unwrap_or_default();
    let label: GestureLabel = raw_label
        .trim()
        .parse()
        .map_err(|e| DatasetError::schema(path, line, format!("{e}")))?;
    if let Some(expected) = expected_label {
        if label != expected {
            return Err(DatasetError::schema(
                path,
                line,
                format!("label {label} found in the store for {expected}"),
            ));
        }
    }

    Ok(LabeledSample::new(FeatureVector::new(values), label))
}

/// Write samples as CSV rows, optionally preceded by the header
pub fn write_rows<'a>(
    out: &mut dyn Write,
    samples: impl Iterator<Item = &'a LabeledSample>,
    with_header: bool,
) -> std::io::Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    if with_header {
        writer.write_record(header())?;
    }
    for sample in samples {
        let mut row: Vec<String> = sample.features.iter().map(|v| v.to_string()).collect();
        row.push(sample.label.to_string());
        writer.write_record(&row)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(c: char, seed: f32) -> LabeledSample {
        let mut values = [0.0f32; FEATURE_DIM];
        for (i, v) in values.iter_mut().enumerate() {
            *v = seed + i as f32 * 0.001;
        }
        LabeledSample::new(FeatureVector::new(values), GestureLabel::from_char(c).unwrap())
    }

    #[test]
    fn header_layout() {
        let h = header();
        assert_eq!(h.len(), 64);
        assert_eq!(&h[..3], &["x_0", "y_0", "z_0"]);
        assert_eq!(h[62], "z_20");
        assert_eq!(h[63], "label");
    }

    #[test]
    fn write_then_read_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.csv");
        let dataset = Dataset::new(vec![sample('A', 0.1), sample('B', -0.123_456_79), sample('A', 7.0)]);

        dataset.write_csv(&path).unwrap();
        let back = Dataset::read_csv(&path, None).unwrap();
        assert_eq!(back, dataset);
        assert_eq!(back.class_counts().values().copied().collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn short_row_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A_coordinates.csv");
        let mut text = header().join(",");
        text.push('\n');
        text.push_str(&vec!["0.5"; FEATURE_DIM].join(","));
        text.push_str(",A\n");
        text.push_str(&vec!["0.5"; FEATURE_DIM - 1].join(","));
        text.push_str(",A\n");
        std::fs::write(&path, text).unwrap();

        match Dataset::read_csv(&path, None) {
            Err(DatasetError::Schema { line, reason, .. }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("62"), "{reason}");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn foreign_label_and_bad_numbers_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("B_coordinates.csv");
        Dataset::new(vec![sample('A', 0.0)]).write_csv(&path).unwrap();

        let b = GestureLabel::from_char('B');
        assert!(matches!(
            Dataset::read_csv(&path, b),
            Err(DatasetError::Schema { .. })
        ));

        let mut text = header().join(",");
        text.push('\n');
        text.push_str(&vec!["abc"; FEATURE_DIM].join(","));
        text.push_str(",B\n");
        std::fs::write(&path, text).unwrap();
        assert!(matches!(
            Dataset::read_csv(&path, b),
            Err(DatasetError::Schema { .. })
        ));
    }

    #[test]
    fn wrong_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b,c\n1,2,3\n").unwrap();
        assert!(matches!(
            Dataset::read_csv(&path, None),
            Err(DatasetError::Schema { line: 1, .. })
        ));
    }
}
