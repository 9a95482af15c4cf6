//! Dense abundance matrix with explicit missing values.

use crate::error::{ImputeError, Result};
use csv::{ReaderBuilder, WriterBuilder};
use nalgebra::DMatrix;
use std::collections::HashSet;
use std::path::Path;

/// Tokens read as a missing measurement.
pub const MISSING_TOKENS: &[&str] = &["", "NA", "NaN", "nan", "N/A", "NULL", "null", "#N/A"];

/// Token written for missing cells.
const MISSING_OUTPUT: &str = "NA";

/// A protein abundance matrix with missing values stored as `NaN`.
///
/// Rows represent proteins, columns represent samples. Observed entries are
/// finite and non-negative. Identifiers are fixed at construction.
#[derive(Debug, Clone)]
pub struct AbundanceMatrix {
    /// Dense values (proteins × samples), `NaN` marks a missing cell
    data: DMatrix<f64>,
    /// Protein identifiers (row names)
    protein_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

impl AbundanceMatrix {
    /// Create a new AbundanceMatrix, validating shape, identifiers and values.
    pub fn new(data: DMatrix<f64>, protein_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != protein_ids.len() {
            return Err(ImputeError::DimensionMismatch {
                expected: nrows,
                actual: protein_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(ImputeError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        ensure_unique(&protein_ids, "protein")?;
        ensure_unique(&sample_ids, "sample")?;

        for row in 0..nrows {
            for col in 0..ncols {
                let val = data[(row, col)];
                if val.is_nan() {
                    continue;
                }
                if !val.is_finite() || val < 0.0 {
                    return Err(ImputeError::InvalidInput(format!(
                        "abundance must be finite and non-negative; found {} at ({}, {})",
                        val, row, col
                    )));
                }
            }
        }

        Ok(Self {
            data,
            protein_ids,
            sample_ids,
        })
    }

    /// Build from row-major values, `NaN` marking missing cells.
    pub fn from_row_slice(
        n_proteins: usize,
        n_samples: usize,
        values: &[f64],
        protein_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        if values.len() != n_proteins * n_samples {
            return Err(ImputeError::DimensionMismatch {
                expected: n_proteins * n_samples,
                actual: values.len(),
            });
        }
        let data = DMatrix::from_row_slice(n_proteins, n_samples, values);
        Self::new(data, protein_ids, sample_ids)
    }

    /// Load an abundance matrix from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is the protein ID header)
    /// - Subsequent rows: protein ID followed by abundances
    ///
    /// Any of [`MISSING_TOKENS`] is read as a missing value.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_delimited(path, b'\t')
    }

    /// Load an abundance matrix from a delimited text file.
    pub fn from_delimited<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_path(path)?;

        let header = reader.headers()?.clone();
        if header.len() < 2 {
            return Err(ImputeError::InvalidInput(
                "table must have at least one sample column".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header.iter().skip(1).map(|s| s.trim().to_string()).collect();
        let n_samples = sample_ids.len();

        let mut protein_ids = Vec::new();
        let mut values: Vec<f64> = Vec::new();

        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let mut fields = record.iter();
            let protein_id = match fields.next() {
                Some(id) => id.trim().to_string(),
                None => continue,
            };
            protein_ids.push(protein_id);

            for (col_idx, field) in fields.enumerate() {
                values.push(parse_abundance(field, row_idx, col_idx)?);
            }
        }

        if protein_ids.is_empty() {
            return Err(ImputeError::InvalidInput("no proteins in table".to_string()));
        }

        log::debug!(
            "Loaded {} proteins x {} samples",
            protein_ids.len(),
            n_samples
        );

        Self::from_row_slice(protein_ids.len(), n_samples, &values, protein_ids, sample_ids)
    }

    /// Write the matrix to a TSV file, missing cells as `NA`.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_table(path, &self.data, &self.protein_ids, &self.sample_ids)
    }

    /// Get the value at (row, col), `None` when missing.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let val = self.data[(row, col)];
        if val.is_nan() {
            None
        } else {
            Some(val)
        }
    }

    /// Whether the cell at (row, col) is missing.
    #[inline]
    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        self.data[(row, col)].is_nan()
    }

    /// Number of proteins (rows).
    #[inline]
    pub fn n_proteins(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Protein identifiers.
    #[inline]
    pub fn protein_ids(&self) -> &[String] {
        &self.protein_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get the underlying dense matrix.
    #[inline]
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Whether the matrix has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.n_proteins() == 0 || self.n_samples() == 0
    }

    /// Total number of missing cells.
    pub fn n_missing(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Whether any cell is missing.
    pub fn has_missing(&self) -> bool {
        self.data.iter().any(|v| v.is_nan())
    }

    /// Number of missing cells in a row.
    pub fn row_missing_count(&self, row: usize) -> usize {
        self.data.row(row).iter().filter(|v| v.is_nan()).count()
    }

    /// Number of missing cells in a column.
    pub fn col_missing_count(&self, col: usize) -> usize {
        self.data.column(col).iter().filter(|v| v.is_nan()).count()
    }

    /// Observed values of a column, in row order.
    pub fn col_observed(&self, col: usize) -> Vec<f64> {
        self.data
            .column(col)
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect()
    }

    /// Missingness indicator matrix (true = missing), the data behind a heatmap.
    pub fn missing_mask(&self) -> DMatrix<bool> {
        self.data.map(|v| v.is_nan())
    }

    /// Subset the matrix to the specified proteins (by index), keeping their order.
    pub fn subset_proteins(&self, indices: &[usize]) -> Result<Self> {
        let n_samples = self.n_samples();
        let mut new_ids = Vec::with_capacity(indices.len());
        let mut values = Vec::with_capacity(indices.len() * n_samples);

        for &old_row in indices {
            if old_row >= self.n_proteins() {
                return Err(ImputeError::InvalidInput(format!(
                    "protein index {} out of bounds",
                    old_row
                )));
            }
            new_ids.push(self.protein_ids[old_row].clone());
            values.extend(self.data.row(old_row).iter().copied());
        }

        let data = DMatrix::from_row_slice(indices.len(), n_samples, &values);
        Self::new(data, new_ids, self.sample_ids.clone())
    }
}

/// Write a dense table with row and column identifiers as TSV.
pub(crate) fn write_table<P: AsRef<Path>>(
    path: P,
    data: &DMatrix<f64>,
    row_ids: &[String],
    col_ids: &[String],
) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;

    let mut header = Vec::with_capacity(col_ids.len() + 1);
    header.push("protein_id".to_string());
    header.extend(col_ids.iter().cloned());
    writer.write_record(&header)?;

    for (row_idx, row_id) in row_ids.iter().enumerate() {
        let mut record = Vec::with_capacity(col_ids.len() + 1);
        record.push(row_id.clone());
        for col_idx in 0..data.ncols() {
            let val = data[(row_idx, col_idx)];
            if val.is_nan() {
                record.push(MISSING_OUTPUT.to_string());
            } else {
                record.push(val.to_string());
            }
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn parse_abundance(field: &str, row: usize, col: usize) -> Result<f64> {
    let token = field.trim();
    if MISSING_TOKENS.contains(&token) {
        return Ok(f64::NAN);
    }
    token.parse::<f64>().map_err(|_| {
        ImputeError::InvalidInput(format!(
            "non-numeric value '{}' at row {}, column {}",
            token, row, col
        ))
    })
}

fn ensure_unique(ids: &[String], kind: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(ImputeError::InvalidInput(format!(
                "duplicate {} identifier '{}'",
                kind, id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const NA: f64 = f64::NAN;

    fn create_test_matrix() -> AbundanceMatrix {
        // 3 proteins × 4 samples
        let values = [
            10.0, 20.0, NA, 5.0, //
            100.0, 200.0, 150.0, 175.0, //
            1.0, NA, NA, NA,
        ];
        let protein_ids = vec!["P1".to_string(), "P2".to_string(), "P3".to_string()];
        let sample_ids: Vec<String> = (1..=4).map(|i| format!("S{}", i)).collect();
        AbundanceMatrix::from_row_slice(3, 4, &values, protein_ids, sample_ids).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let mat = create_test_matrix();
        assert_eq!(mat.n_proteins(), 3);
        assert_eq!(mat.n_samples(), 4);
        assert_eq!(mat.n_missing(), 4);
        assert!(mat.has_missing());
    }

    #[test]
    fn test_get_values() {
        let mat = create_test_matrix();
        assert_eq!(mat.get(0, 0), Some(10.0));
        assert_eq!(mat.get(0, 2), None);
        assert!(mat.is_missing(2, 3));
        assert_eq!(mat.row_missing_count(2), 3);
        assert_eq!(mat.col_missing_count(2), 2);
        assert_eq!(mat.col_observed(1), vec![20.0, 200.0]);
    }

    #[test]
    fn test_rejects_negative_and_infinite() {
        let ids = vec!["A".to_string()];
        let samples = vec!["S1".to_string(), "S2".to_string()];
        assert!(matches!(
            AbundanceMatrix::from_row_slice(1, 2, &[1.0, -1.0], ids.clone(), samples.clone()),
            Err(ImputeError::InvalidInput(_))
        ));
        assert!(matches!(
            AbundanceMatrix::from_row_slice(1, 2, &[1.0, f64::INFINITY], ids, samples),
            Err(ImputeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let ids = vec!["A".to_string(), "A".to_string()];
        let samples = vec!["S1".to_string()];
        let result = AbundanceMatrix::from_row_slice(2, 1, &[1.0, 2.0], ids, samples);
        assert!(matches!(result, Err(ImputeError::InvalidInput(_))));
    }

    #[test]
    fn test_missing_mask() {
        let mat = create_test_matrix();
        let mask = mat.missing_mask();
        assert!(mask[(0, 2)]);
        assert!(!mask[(1, 0)]);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 4);
    }

    #[test]
    fn test_from_tsv_missing_tokens() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "protein\tS1\tS2\tS3").unwrap();
        writeln!(file, "P1\t1.5\tNA\t2.0").unwrap();
        writeln!(file, "P2\t\t3.0\tNaN").unwrap();
        file.flush().unwrap();

        let mat = AbundanceMatrix::from_tsv(file.path()).unwrap();
        assert_eq!(mat.protein_ids(), &["P1", "P2"]);
        assert_eq!(mat.sample_ids(), &["S1", "S2", "S3"]);
        assert_eq!(mat.get(0, 0), Some(1.5));
        assert!(mat.is_missing(0, 1));
        assert!(mat.is_missing(1, 0));
        assert!(mat.is_missing(1, 2));
    }

    #[test]
    fn test_from_tsv_rejects_text() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "protein\tS1\tS2").unwrap();
        writeln!(file, "P1\t1.5\thigh").unwrap();
        file.flush().unwrap();

        let result = AbundanceMatrix::from_tsv(file.path());
        assert!(matches!(result, Err(ImputeError::InvalidInput(_))));
    }

    #[test]
    fn test_tsv_roundtrip() {
        let mat = create_test_matrix();
        let temp_file = NamedTempFile::new().unwrap();
        mat.to_tsv(temp_file.path()).unwrap();

        let loaded = AbundanceMatrix::from_tsv(temp_file.path()).unwrap();
        assert_eq!(loaded.protein_ids(), mat.protein_ids());
        assert_eq!(loaded.sample_ids(), mat.sample_ids());
        for row in 0..mat.n_proteins() {
            for col in 0..mat.n_samples() {
                assert_eq!(loaded.get(row, col), mat.get(row, col));
            }
        }
    }

    #[test]
    fn test_subset_proteins() {
        let mat = create_test_matrix();
        let subset = mat.subset_proteins(&[0, 2]).unwrap();

        assert_eq!(subset.n_proteins(), 2);
        assert_eq!(subset.n_samples(), 4);
        assert_eq!(subset.protein_ids(), &["P1", "P3"]);
        assert_eq!(subset.get(1, 0), Some(1.0));
        assert!(subset.is_missing(1, 1));

        let empty = mat.subset_proteins(&[]).unwrap();
        assert_eq!(empty.n_proteins(), 0);
        assert_eq!(empty.n_samples(), 4);
        assert!(mat.subset_proteins(&[7]).is_err());
    }
}
