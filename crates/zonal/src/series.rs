//! Per-catchment series output
//!
//! Writes one file per catchment, columns `time` + the requested variables
//! in declared order. File names embed the region (VPU) identifier and the
//! catchment's numeric suffix: `cat03W_113060.csv`.

use crate::aggregate::AggregateOutcome;
use chrono::{DateTime, Utc};
use hydroforce_core::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Output serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            other => Err(Error::Config(format!(
                "unsupported output file type '{}' (use csv or parquet)",
                other
            ))),
        }
    }
}

/// `cat<vpu>_<numeric suffix>.<ext>`
fn catchment_file_name(vpu: &str, catchment_id: &str, format: OutputFormat) -> String {
    let suffix = match catchment_id.rsplit_once('-') {
        Some((_, n)) => n,
        None => catchment_id,
    };
    format!("cat{}_{}.{}", vpu, suffix, format.extension())
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Write every catchment series under `out_dir`. Returns the paths written.
pub fn write_series(
    outcome: &AggregateOutcome,
    out_dir: &Path,
    vpu: &str,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(outcome.series.len());
    for (id, series) in &outcome.series {
        let path = out_dir.join(catchment_file_name(vpu, id, format));
        match format {
            OutputFormat::Csv => write_csv(&path, &outcome.variables, series)?,
            OutputFormat::Parquet => write_parquet(&path, &outcome.variables, series)?,
        }
        written.push(path);
    }
    Ok(written)
}

fn write_csv(
    path: &Path,
    variables: &[String],
    series: &crate::aggregate::CatchmentSeries,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| Error::Other(format!("csv open: {}", e)))?;

    let mut header = Vec::with_capacity(1 + variables.len());
    header.push("time".to_string());
    header.extend(variables.iter().cloned());
    writer
        .write_record(&header)
        .map_err(|e| Error::Other(format!("csv write: {}", e)))?;

    for (time, row) in series.times.iter().zip(&series.values) {
        let mut record = Vec::with_capacity(1 + row.len());
        record.push(format_time(time));
        record.extend(row.iter().map(|v| v.to_string()));
        writer
            .write_record(&record)
            .map_err(|e| Error::Other(format!("csv write: {}", e)))?;
    }
    writer
        .flush()
        .map_err(|e| Error::Other(format!("csv flush: {}", e)))?;
    Ok(())
}

fn write_parquet(
    path: &Path,
    variables: &[String],
    series: &crate::aggregate::CatchmentSeries,
) -> Result<()> {
    use arrow::array::{ArrayRef, Float64Array, TimestampSecondArray};
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use parquet::file::properties::WriterProperties;

    let mut fields = vec![Field::new(
        "time",
        DataType::Timestamp(TimeUnit::Second, None),
        false,
    )];
    for name in variables {
        fields.push(Field::new(name.as_str(), DataType::Float64, true));
    }
    let schema = Arc::new(Schema::new(fields));

    let times = TimestampSecondArray::from_iter_values(
        series.times.iter().map(|t| t.timestamp()),
    );
    let mut columns: Vec<ArrayRef> = vec![Arc::new(times)];
    for (var_idx, _) in variables.iter().enumerate() {
        let column = Float64Array::from_iter_values(
            series.values.iter().map(|row| row[var_idx]),
        );
        columns.push(Arc::new(column));
    }

    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| Error::Other(format!("parquet batch: {}", e)))?;

    let file = fs::File::create(path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))
        .map_err(|e| Error::Other(format!("parquet writer: {}", e)))?;
    writer
        .write(&batch)
        .map_err(|e| Error::Other(format!("parquet write: {}", e)))?;
    writer
        .close()
        .map_err(|e| Error::Other(format!("parquet close: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::CatchmentSeries;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn outcome() -> AggregateOutcome {
        let times = vec![
            Utc.with_ymd_and_hms(2022, 10, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 10, 1, 1, 0, 0).unwrap(),
        ];
        let mut series = BTreeMap::new();
        series.insert(
            "cat-113060".to_string(),
            CatchmentSeries {
                times: times.clone(),
                values: vec![vec![1.5, 280.0], vec![0.0, 281.25]],
            },
        );
        AggregateOutcome {
            series,
            variables: vec!["RAINRATE".to_string(), "T2D".to_string()],
            processed: 2,
            failures: vec![],
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from_str("csv").unwrap(), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_str("Parquet").unwrap(),
            OutputFormat::Parquet
        );
        assert!(matches!(
            OutputFormat::from_str("netcdf"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_file_name_embeds_vpu_and_suffix() {
        assert_eq!(
            catchment_file_name("03W", "cat-113060", OutputFormat::Csv),
            "cat03W_113060.csv"
        );
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_series(&outcome(), dir.path(), "03W", OutputFormat::Csv).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("cat03W_113060.csv"));

        let body = fs::read_to_string(&written[0]).unwrap();
        let mut lines = body.lines();
        assert_eq!(lines.next().unwrap(), "time,RAINRATE,T2D");
        assert_eq!(lines.next().unwrap(), "2022-10-01 00:00:00,1.5,280");
        assert_eq!(lines.next().unwrap(), "2022-10-01 01:00:00,0,281.25");
    }

    #[test]
    fn test_write_parquet_roundtrip() {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let dir = tempfile::tempdir().unwrap();
        let written =
            write_series(&outcome(), dir.path(), "03W", OutputFormat::Parquet).unwrap();
        assert!(written[0].ends_with("cat03W_113060.parquet"));

        let file = fs::File::open(&written[0]).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<_> = reader.map(|b| b.unwrap()).collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].num_rows(), 2);
        assert_eq!(batches[0].num_columns(), 3);
        assert_eq!(
            batches[0].schema().field(1).name(),
            "RAINRATE"
        );
    }
}
