//! JSON run configuration
//!
//! One JSON document drives every subcommand. Validation happens before
//! any I/O: unknown keys, unknown integer codes, and unsupported output
//! formats are all configuration errors up front, not mid-batch surprises.

use chrono::{NaiveDate, NaiveDateTime};
use hydroforce_core::{Error, Result};
use hydroforce_nwm::filenames::{FileRequest, Geography, Member, RunType, VarType};
use hydroforce_zonal::series::OutputFormat;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The eight NWM forcing variables, in output column order.
pub const DEFAULT_FORCING_VARS: [&str; 8] = [
    "U2D", "V2D", "LWDOWN", "RAINRATE", "T2D", "Q2D", "PSFC", "SWDOWN",
];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub forcing: ForcingConfig,
    pub hydrofab: HydrofabConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Where forcing files come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcingSource {
    /// Operational archive naming (`nwm.<date>/...`)
    Operational,
    /// NWM 2.1 retrospective naming
    Retrospective,
    /// Explicit list of local files
    Local,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForcingConfig {
    pub source: ForcingSource,
    /// `YYYYMMDD`, operational/retrospective sources
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub runinput: Option<u8>,
    pub varinput: Option<u8>,
    pub geoinput: Option<u8>,
    pub meminput: Option<u8>,
    pub fcst_cycles: Option<Vec<u8>>,
    pub lead_times: Option<Vec<u32>>,
    /// Directory holding already-downloaded forcing files
    pub local_dir: Option<PathBuf>,
    /// Explicit file list, `source = "local"`
    pub file_list: Option<Vec<PathBuf>>,
    /// Grid template file; defaults to the first resolved forcing file
    pub template_file: Option<PathBuf>,
    /// Variables to extract; defaults to the eight NWM forcing variables
    pub variables: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HydrofabConfig {
    pub geopkg: PathBuf,
    pub vpu: String,
    /// Catchment to trace upstream from (subset subcommand)
    pub catchment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    pub output_dir: PathBuf,
    /// `csv` or `parquet`
    pub output_format: String,
    pub weights_file: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RunConfig {
    pub verbose: bool,
    pub threads: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            threads: 4,
        }
    }
}

/// Validated product selection for operational sources.
pub struct ProductSelection {
    pub run: RunType,
    pub var: VarType,
    pub geography: Geography,
    pub member: Option<Member>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let body = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config '{}': {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&body)
            .map_err(|e| Error::Config(format!("invalid config '{}': {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on anything a batch run would otherwise trip over later.
    pub fn validate(&self) -> Result<()> {
        self.output_format()?;
        match self.forcing.source {
            ForcingSource::Operational => {
                self.product_selection()?;
                if self.forcing.local_dir.is_none() {
                    return Err(Error::Config(
                        "operational source requires forcing.local_dir".to_string(),
                    ));
                }
            }
            ForcingSource::Retrospective => {
                self.date_range()?;
                if self.forcing.local_dir.is_none() {
                    return Err(Error::Config(
                        "retrospective source requires forcing.local_dir".to_string(),
                    ));
                }
            }
            ForcingSource::Local => {
                match &self.forcing.file_list {
                    Some(list) if !list.is_empty() => {}
                    _ => {
                        return Err(Error::Config(
                            "local source requires a non-empty forcing.file_list".to_string(),
                        ))
                    }
                }
            }
        }
        if self.variables().is_empty() {
            return Err(Error::Config(
                "forcing.variables must not be empty".to_string(),
            ));
        }
        if self.run.threads == 0 {
            return Err(Error::Config("run.threads must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        OutputFormat::from_str(&self.storage.output_format)
    }

    pub fn variables(&self) -> Vec<String> {
        match &self.forcing.variables {
            Some(vars) => vars.clone(),
            None => DEFAULT_FORCING_VARS.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn date_range(&self) -> Result<(NaiveDate, NaiveDate)> {
        let parse = |label: &str, value: &Option<String>| -> Result<NaiveDate> {
            let text = value.as_deref().ok_or_else(|| {
                Error::Config(format!("forcing.{} is required for this source", label))
            })?;
            NaiveDate::parse_from_str(text, "%Y%m%d").map_err(|_| {
                Error::Config(format!("forcing.{} '{}' is not YYYYMMDD", label, text))
            })
        };
        let start = parse("start_date", &self.forcing.start_date)?;
        let end = parse("end_date", &self.forcing.end_date)?;
        Ok((start, end))
    }

    /// Hourly retrospective range: whole days, inclusive.
    pub fn retro_range(&self) -> Result<(NaiveDateTime, NaiveDateTime)> {
        let (start, end) = self.date_range()?;
        Ok((
            start.and_hms_opt(0, 0, 0).unwrap(),
            end.and_hms_opt(23, 0, 0).unwrap(),
        ))
    }

    /// Decode the operational product codes into typed selections.
    pub fn product_selection(&self) -> Result<ProductSelection> {
        let code = |label: &str, value: Option<u8>| -> Result<u8> {
            value.ok_or_else(|| {
                Error::Config(format!(
                    "forcing.{} is required for the operational source",
                    label
                ))
            })
        };
        let (start_date, end_date) = self.date_range()?;
        Ok(ProductSelection {
            run: RunType::from_code(code("runinput", self.forcing.runinput)?)?,
            var: VarType::from_code(code("varinput", self.forcing.varinput)?)?,
            geography: Geography::from_code(code("geoinput", self.forcing.geoinput)?)?,
            member: self.forcing.meminput.map(Member::new).transpose()?,
            start_date,
            end_date,
        })
    }

    /// Operational file-name request from the validated selection.
    pub fn file_request(&self) -> Result<FileRequest> {
        let sel = self.product_selection()?;
        Ok(FileRequest {
            run: sel.run,
            var: sel.var,
            geography: sel.geography,
            member: sel.member,
            start_date: sel.start_date,
            end_date: sel.end_date,
            fcst_cycles: self.forcing.fcst_cycles.clone(),
            lead_times: self.forcing.lead_times.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(forcing: &str) -> String {
        format!(
            r#"{{
                "forcing": {forcing},
                "hydrofab": {{
                    "geopkg": "nextgen_03W.gpkg",
                    "vpu": "03W",
                    "catchment_id": "cat-113060"
                }},
                "storage": {{
                    "output_dir": "out",
                    "output_format": "csv",
                    "weights_file": "weights.json"
                }},
                "run": {{ "verbose": false, "threads": 2 }}
            }}"#
        )
    }

    fn parse(body: &str) -> Result<Config> {
        let config: Config =
            serde_json::from_str(body).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_operational_config_parses() {
        let body = base_config(
            r#"{
                "source": "operational",
                "start_date": "20221001",
                "end_date": "20221002",
                "runinput": 2,
                "varinput": 5,
                "geoinput": 1,
                "fcst_cycles": [0, 6, 12, 18],
                "lead_times": [1, 2, 3, 4, 5, 6],
                "local_dir": "raw_forcing_data"
            }"#,
        );
        let config = parse(&body).unwrap();
        let request = config.file_request().unwrap();
        assert_eq!(request.run, RunType::MediumRange);
        assert_eq!(request.var, VarType::Forcing);
        assert_eq!(config.variables().len(), 8);
        assert_eq!(config.output_format().unwrap(), OutputFormat::Csv);
    }

    #[test]
    fn test_unknown_run_code_fails_fast() {
        let body = base_config(
            r#"{
                "source": "operational",
                "start_date": "20221001",
                "end_date": "20221002",
                "runinput": 42,
                "varinput": 5,
                "geoinput": 1,
                "local_dir": "raw"
            }"#,
        );
        let err = parse(&body).unwrap_err();
        assert!(err.to_string().contains("run type"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let body = base_config(
            r#"{
                "source": "local",
                "file_list": ["a.nc"],
                "surprise": true
            }"#,
        );
        assert!(matches!(parse(&body), Err(Error::Config(_))));
    }

    #[test]
    fn test_local_source_requires_files() {
        let body = base_config(r#"{ "source": "local" }"#);
        let err = parse(&body).unwrap_err();
        assert!(err.to_string().contains("file_list"));
    }

    #[test]
    fn test_bad_output_format_rejected() {
        let body = base_config(r#"{ "source": "local", "file_list": ["a.nc"] }"#)
            .replace("\"csv\"", "\"netcdf\"");
        let err = parse(&body).unwrap_err();
        assert!(err.to_string().contains("unsupported output file type"));
    }

    #[test]
    fn test_bad_date_rejected() {
        let body = base_config(
            r#"{
                "source": "operational",
                "start_date": "October 1st",
                "end_date": "20221002",
                "runinput": 1,
                "varinput": 5,
                "geoinput": 1,
                "local_dir": "raw"
            }"#,
        );
        let err = parse(&body).unwrap_err();
        assert!(err.to_string().contains("YYYYMMDD"));
    }

    #[test]
    fn test_default_run_group() {
        let body = r#"{
            "forcing": { "source": "local", "file_list": ["a.nc"] },
            "hydrofab": { "geopkg": "f.gpkg", "vpu": "16" },
            "storage": {
                "output_dir": "out",
                "output_format": "parquet",
                "weights_file": "w.json"
            }
        }"#;
        let config = parse(body).unwrap();
        assert_eq!(config.run.threads, 4);
        assert!(!config.run.verbose);
    }
}
