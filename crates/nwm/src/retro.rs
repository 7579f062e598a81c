//! Retrospective NWM object naming
//!
//! The 2.1 retrospective archive is laid out by year with hourly files:
//!
//! ```text
//! <base>/forcing/<yyyy>/<yyyymmddhh>.LDASIN_DOMAIN1
//! <base>/model_output/<yyyy>/<yyyymmddhh>00.CHRTOUT_DOMAIN1.comp
//! ```
//!
//! Forcing names before 2007 carry a trailing `00` the later years dropped;
//! the generator reproduces that quirk.

use chrono::{Duration, NaiveDateTime};
use hydroforce_core::{Error, Result};

/// HTTPS base of the NWM 2.1 retrospective bucket, configuration code 6.
pub const RETRO_BASE_HTTPS: &str = "https://noaa-nwm-retrospective-2-1-pds.s3.amazonaws.com/";
/// S3 base of the NWM 2.1 retrospective bucket, configuration code 7.
pub const RETRO_BASE_S3: &str = "s3://noaa-nwm-retrospective-2-1-pds/";

/// Archive section, configuration codes 1-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetroObjectType {
    Forcing,
    ModelOutput,
}

impl RetroObjectType {
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(RetroObjectType::Forcing),
            2 => Ok(RetroObjectType::ModelOutput),
            other => Err(Error::Config(format!(
                "unknown retrospective object type {} (valid: 1-2)",
                other
            ))),
        }
    }

    fn dir(self) -> &'static str {
        match self {
            RetroObjectType::Forcing => "forcing",
            RetroObjectType::ModelOutput => "model_output",
        }
    }
}

/// Model-output variable group, configuration codes 1-6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetroVarType {
    ChrtOut,
    GwOut,
    LakeOut,
    LdasOut,
    RtOut,
    LdasIn,
}

impl RetroVarType {
    pub fn from_code(code: u8) -> Result<Self> {
        use RetroVarType::*;
        Ok(match code {
            1 => ChrtOut,
            2 => GwOut,
            3 => LakeOut,
            4 => LdasOut,
            5 => RtOut,
            6 => LdasIn,
            other => {
                return Err(Error::Config(format!(
                    "unknown retrospective variable type {} (valid: 1-6)",
                    other
                )))
            }
        })
    }

    fn suffix(self) -> &'static str {
        use RetroVarType::*;
        match self {
            ChrtOut => ".CHRTOUT_DOMAIN1.comp",
            GwOut => ".GWOUT_DOMAIN1.comp",
            LakeOut => ".LAKEOUT_DOMAIN1.comp",
            LdasOut => ".LDASOUT_DOMAIN1.comp",
            RtOut => ".RTOUT_DOMAIN1.comp",
            LdasIn => ".LDASIN_DOMAIN1.comp",
        }
    }
}

/// Base URL for a configuration code.
pub fn retro_base_url(code: u8) -> Result<&'static str> {
    match code {
        6 => Ok(RETRO_BASE_HTTPS),
        7 => Ok(RETRO_BASE_S3),
        other => Err(Error::Config(format!(
            "unknown retrospective url base {} (valid: 6-7)",
            other
        ))),
    }
}

/// Build the retrospective object-name list for an hourly date range
/// (inclusive on both ends).
pub fn create_retro_file_list(
    start: NaiveDateTime,
    end: NaiveDateTime,
    base_url: &str,
    object_types: &[RetroObjectType],
    var_types: &[RetroVarType],
) -> Result<Vec<String>> {
    if end < start {
        return Err(Error::Config(format!(
            "end time {} precedes start time {}",
            end, start
        )));
    }

    let mut names = Vec::new();
    let mut stamp = start;
    while stamp <= end {
        let year_txt = stamp.format("%Y");
        let date_txt = stamp.format("%Y%m%d%H");
        for object in object_types {
            match object {
                RetroObjectType::Forcing => {
                    use chrono::Datelike;
                    // Pre-2007 forcing names carry a vestigial minutes field
                    let tail = if stamp.year() < 2007 { "00" } else { "" };
                    names.push(format!(
                        "{}{}/{}/{}{}.LDASIN_DOMAIN1",
                        base_url,
                        object.dir(),
                        year_txt,
                        date_txt,
                        tail
                    ));
                }
                RetroObjectType::ModelOutput => {
                    for var in var_types {
                        names.push(format!(
                            "{}{}/{}/{}00{}",
                            base_url,
                            object.dir(),
                            year_txt,
                            date_txt,
                            var.suffix()
                        ));
                    }
                }
            }
        }
        stamp += Duration::hours(1);
    }
    Ok(names)
}
