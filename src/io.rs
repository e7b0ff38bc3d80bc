//! File interface with the external simulator.
//!
//! Designs are written as comma separated values, one sample per row, without
//! header. Responses are read back as scalars separated by whitespace, commas
//! or new lines, in design row order. `.npy` variants are provided as well.

use crate::errors::{Result, StudyError};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2};
use ndarray_npy::{read_npy, write_npy};
use polychaos_pce::PceError;
use std::fs;
use std::path::Path;

fn parse_value(value: &str, line: usize) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| StudyError::ParseError {
        line,
        value: value.to_string(),
    })
}

/// Write design points as csv, one row per sample
pub fn write_design_csv<P: AsRef<Path>>(
    path: P,
    points: &ArrayBase<impl Data<Elem = f64>, Ix2>,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path.as_ref())?;
    for row in points.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    log::debug!(
        "{} design points written in {}",
        points.nrows(),
        path.as_ref().display()
    );
    Ok(())
}

/// Read design points written by [`write_design_csv`]
pub fn read_design_csv<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;
    let mut data = Vec::new();
    let mut nrows = 0;
    let mut ncols = None;
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|v| v.is_empty()) {
            continue;
        }
        for value in record.iter() {
            data.push(parse_value(value, i + 1)?);
        }
        ncols.get_or_insert(record.len());
        nrows += 1;
    }
    Ok(Array2::from_shape_vec((nrows, ncols.unwrap_or(0)), data)?)
}

/// Read simulator responses: scalars separated by whitespace, commas or new lines.
/// Blank lines are ignored.
pub fn read_responses<P: AsRef<Path>>(path: P) -> Result<Array1<f64>> {
    let content = fs::read_to_string(path.as_ref())?;
    let mut values = Vec::new();
    for (i, line) in content.lines().enumerate() {
        for value in line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|v| !v.is_empty())
        {
            values.push(parse_value(value, i + 1)?);
        }
    }
    log::debug!(
        "{} responses read from {}",
        values.len(),
        path.as_ref().display()
    );
    Ok(Array1::from_vec(values))
}

/// Write design points as npy
pub fn write_design_npy<P: AsRef<Path>>(path: P, points: &Array2<f64>) -> Result<()> {
    write_npy(path, points)?;
    Ok(())
}

/// Read design points from npy
pub fn read_design_npy<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    Ok(read_npy(path)?)
}

/// Read simulator responses from npy
pub fn read_responses_npy<P: AsRef<Path>>(path: P) -> Result<Array1<f64>> {
    Ok(read_npy(path)?)
}

/// Check design rows and responses are aligned
pub fn check_alignment(
    points: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    responses: &ArrayBase<impl Data<Elem = f64>, Ix1>,
) -> Result<()> {
    if points.nrows() != responses.len() {
        return Err(PceError::SizeMismatch {
            rows: points.nrows(),
            responses: responses.len(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::io::Write;

    #[test]
    fn test_design_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design.csv");
        let points = array![[0.1, 1. / 3.], [-2.5e-7, 12345.678901234]];
        write_design_csv(&path, &points).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(read_design_csv(&path).unwrap(), points);
    }

    #[test]
    fn test_read_responses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deflections.txt");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "1.5 2.5").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  3e-2\t-4").unwrap();
        writeln!(file, "5,6").unwrap();
        let y = read_responses(&path).unwrap();
        assert_abs_diff_eq!(y, array![1.5, 2.5, 0.03, -4., 5., 6.]);
    }

    #[test]
    fn test_read_responses_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deflections.txt");
        fs::write(&path, "1.0\n2.0\nnan?\n").unwrap();
        match read_responses(&path) {
            Err(StudyError::ParseError { line, value }) => {
                assert_eq!(line, 3);
                assert_eq!(value, "nan?");
            }
            _ => panic!("parse error expected"),
        }
    }

    #[test]
    fn test_npy_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design.npy");
        let points = array![[0.1, 0.2], [0.3, 0.4]];
        write_design_npy(&path, &points).unwrap();
        assert_eq!(read_design_npy(&path).unwrap(), points);
    }

    #[test]
    fn test_check_alignment() {
        let points = Array2::<f64>::zeros((100, 15));
        let responses = Array1::<f64>::zeros(99);
        match check_alignment(&points, &responses) {
            Err(StudyError::PceError(err @ PceError::SizeMismatch { .. })) => {
                assert_eq!(err.to_string(), "rows(design)=100 != len(responses)=99")
            }
            _ => panic!("size mismatch expected"),
        }
        assert!(check_alignment(&points, &Array1::zeros(100)).is_ok());
    }
}
