//! Operational NWM object naming
//!
//! Builds the list of object names for a date range and product selection,
//! mirroring the operational bucket layout:
//!
//! ```text
//! nwm.<yyyymmdd>/<run_dir>/nwm.t<cc>z.<run>.<var>[_<m>].<f|tm><hh(h)>.<geo>.nc
//! ```
//!
//! Product selections arrive as small integer codes in the JSON
//! configuration; each code space is a closed enum and unknown codes are
//! configuration errors, never placeholder strings in the output list.

use chrono::{Duration, NaiveDate};
use hydroforce_core::{Error, Result};

/// Model run type, configuration codes 1-11.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    ShortRange,
    MediumRange,
    MediumRangeNoDa,
    LongRange,
    AnalysisAssim,
    AnalysisAssimExtend,
    AnalysisAssimExtendNoDa,
    AnalysisAssimLong,
    AnalysisAssimLongNoDa,
    AnalysisAssimNoDa,
    ShortRangeNoDa,
}

impl RunType {
    pub fn from_code(code: u8) -> Result<Self> {
        use RunType::*;
        Ok(match code {
            1 => ShortRange,
            2 => MediumRange,
            3 => MediumRangeNoDa,
            4 => LongRange,
            5 => AnalysisAssim,
            6 => AnalysisAssimExtend,
            7 => AnalysisAssimExtendNoDa,
            8 => AnalysisAssimLong,
            9 => AnalysisAssimLongNoDa,
            10 => AnalysisAssimNoDa,
            11 => ShortRangeNoDa,
            other => {
                return Err(Error::Config(format!(
                    "unknown run type code {} (valid: 1-11)",
                    other
                )))
            }
        })
    }

    pub fn name(self) -> &'static str {
        use RunType::*;
        match self {
            ShortRange => "short_range",
            MediumRange => "medium_range",
            MediumRangeNoDa => "medium_range_no_da",
            LongRange => "long_range",
            AnalysisAssim => "analysis_assim",
            AnalysisAssimExtend => "analysis_assim_extend",
            AnalysisAssimExtendNoDa => "analysis_assim_extend_no_da",
            AnalysisAssimLong => "analysis_assim_long",
            AnalysisAssimLongNoDa => "analysis_assim_long_no_da",
            AnalysisAssimNoDa => "analysis_assim_no_da",
            ShortRangeNoDa => "short_range_no_da",
        }
    }

    /// Analysis-and-assimilation family: lookback hours with a `tm` prefix
    fn is_analysis_assim(self) -> bool {
        use RunType::*;
        matches!(
            self,
            AnalysisAssim
                | AnalysisAssimExtend
                | AnalysisAssimExtendNoDa
                | AnalysisAssimLong
                | AnalysisAssimLongNoDa
                | AnalysisAssimNoDa
        )
    }

    /// Runs without data assimilation only publish channel output
    fn is_no_da(self) -> bool {
        use RunType::*;
        matches!(
            self,
            MediumRangeNoDa
                | AnalysisAssimExtendNoDa
                | AnalysisAssimLongNoDa
                | AnalysisAssimNoDa
                | ShortRangeNoDa
        )
    }
}

/// Output variable group, configuration codes 1-5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    ChannelRt,
    Land,
    Reservoir,
    TerrainRt,
    Forcing,
}

impl VarType {
    pub fn from_code(code: u8) -> Result<Self> {
        use VarType::*;
        Ok(match code {
            1 => ChannelRt,
            2 => Land,
            3 => Reservoir,
            4 => TerrainRt,
            5 => Forcing,
            other => {
                return Err(Error::Config(format!(
                    "unknown variable type code {} (valid: 1-5)",
                    other
                )))
            }
        })
    }

    pub fn name(self) -> &'static str {
        use VarType::*;
        match self {
            ChannelRt => "channel_rt",
            Land => "land",
            Reservoir => "reservoir",
            TerrainRt => "terrain_rt",
            Forcing => "forcing",
        }
    }
}

/// Model domain, configuration codes 1-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geography {
    Conus,
    Hawaii,
    PuertoRico,
}

impl Geography {
    pub fn from_code(code: u8) -> Result<Self> {
        use Geography::*;
        Ok(match code {
            1 => Conus,
            2 => Hawaii,
            3 => PuertoRico,
            other => {
                return Err(Error::Config(format!(
                    "unknown geography code {} (valid: 1-3)",
                    other
                )))
            }
        })
    }

    pub fn name(self) -> &'static str {
        use Geography::*;
        match self {
            Conus => "conus",
            Hawaii => "hawaii",
            PuertoRico => "puertorico",
        }
    }
}

/// Ensemble member (medium and long range), configuration codes 1-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member(u8);

impl Member {
    pub fn new(code: u8) -> Result<Self> {
        if (1..=7).contains(&code) {
            Ok(Member(code))
        } else {
            Err(Error::Config(format!(
                "unknown ensemble member {} (valid: 1-7)",
                code
            )))
        }
    }

    pub fn code(self) -> u8 {
        self.0
    }

    /// `_memN` folder suffix
    fn dir_suffix(self) -> String {
        format!("_mem{}", self.0)
    }

    /// `_N` variable-name suffix
    fn var_suffix(self) -> String {
        format!("_{}", self.0)
    }
}

/// One operational file-list request.
#[derive(Debug, Clone)]
pub struct FileRequest {
    pub run: RunType,
    pub var: VarType,
    pub geography: Geography,
    pub member: Option<Member>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Override the run type's default forecast cycles (UTC hours)
    pub fcst_cycles: Option<Vec<u8>>,
    /// Override the run type's default forecast/lookback hours
    pub lead_times: Option<Vec<u32>>,
}

impl FileRequest {
    pub fn new(
        run: RunType,
        var: VarType,
        geography: Geography,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            run,
            var,
            geography,
            member: None,
            start_date,
            end_date,
            fcst_cycles: None,
            lead_times: None,
        }
    }
}

fn range_vec(range: impl Iterator<Item = u32>) -> Vec<u32> {
    range.collect()
}

/// Bucket folder for a (run, var, geography) combination.
///
/// Forcing products live under `forcing_*` folders, and Hawaii/Puerto Rico
/// get their own folder variants for some run types.
fn run_dir(req: &FileRequest) -> Result<String> {
    use Geography::*;
    use RunType::*;

    if req.var == VarType::Forcing {
        let dir = match (req.run, req.geography) {
            (AnalysisAssim, Conus) => "forcing_analysis_assim",
            (AnalysisAssim, Hawaii) => "forcing_analysis_assim_hawaii",
            (AnalysisAssim, PuertoRico) => "forcing_analysis_assim_puertorico",
            (AnalysisAssimExtend, Conus) => "forcing_analysis_assim_extend",
            (MediumRange, Conus) => "forcing_medium_range",
            (ShortRange, Conus) => "forcing_short_range",
            (ShortRange, Hawaii) => "forcing_short_range_hawaii",
            (ShortRange, PuertoRico) => "forcing_short_range_puertorico",
            (run, geo) => {
                return Err(Error::Config(format!(
                    "no forcing product for run '{}' on domain '{}'",
                    run.name(),
                    geo.name()
                )))
            }
        };
        return Ok(dir.to_string());
    }

    let dir = match (req.run, req.geography) {
        (AnalysisAssim, PuertoRico) => "analysis_assim_puertorico".to_string(),
        (AnalysisAssimNoDa, PuertoRico) => "analysis_assim_puertorico_no_da".to_string(),
        (ShortRange, PuertoRico) => "short_range_puertorico".to_string(),
        (ShortRangeNoDa, PuertoRico) => "short_range_puertorico_no_da".to_string(),
        (run, _) => {
            let mut dir = run.name().to_string();
            if let Some(member) = req.member {
                dir.push_str(&member.dir_suffix());
            }
            dir
        }
    };
    Ok(dir)
}

/// Default forecast cycles (UTC hours) per run/var/geography.
fn default_cycles(req: &FileRequest) -> Vec<u8> {
    use Geography::*;
    use RunType::*;
    match (req.run, req.var, req.geography) {
        (ShortRange, VarType::Forcing, Hawaii) => vec![0, 12],
        (ShortRange, VarType::Forcing, PuertoRico) => vec![6],
        (ShortRange | ShortRangeNoDa, _, PuertoRico) => vec![6, 18],
        (ShortRange | ShortRangeNoDa, _, _) => (0..24).collect(),
        (MediumRange, VarType::Forcing, _) => vec![0, 6, 12],
        (MediumRange, _, _) => vec![0, 6, 12, 18],
        (MediumRangeNoDa, _, _) => vec![0, 6, 12],
        (LongRange, _, _) => vec![0, 6, 12, 18],
        (AnalysisAssim, VarType::Forcing, Hawaii) => (0..19).collect(),
        (AnalysisAssim, VarType::Forcing, _) => (0..20).collect(),
        (AnalysisAssim | AnalysisAssimNoDa, _, _) => (0..24).collect(),
        (AnalysisAssimExtend | AnalysisAssimExtendNoDa, _, _) => vec![16],
        (AnalysisAssimLong | AnalysisAssimLongNoDa, _, _) => vec![0, 6, 12, 18],
    }
}

/// Default forecast (or lookback) hours per run/var/geography/member.
fn default_hours(req: &FileRequest) -> Vec<u32> {
    use Geography::*;
    use RunType::*;
    match (req.run, req.var, req.geography) {
        (ShortRange, VarType::Forcing, Hawaii) => range_vec(1..49),
        (ShortRange, VarType::Forcing, PuertoRico) => range_vec(1..48),
        (ShortRange | ShortRangeNoDa, _, PuertoRico) => range_vec(1..48),
        (ShortRange | ShortRangeNoDa, _, _) => range_vec(1..19),
        (MediumRange, VarType::Forcing, _) => range_vec(0..240),
        (MediumRange, VarType::Land | VarType::TerrainRt, _) => {
            match req.member.map(Member::code) {
                Some(1) => range_vec((3..241).step_by(3)),
                _ => range_vec((3..205).step_by(3)),
            }
        }
        (MediumRange, _, _) => match req.member.map(Member::code) {
            Some(1) => range_vec(1..241),
            _ => range_vec(1..205),
        },
        (MediumRangeNoDa, _, _) => range_vec((3..240).step_by(3)),
        (LongRange, VarType::Land, _) => range_vec((24..721).step_by(24)),
        (LongRange, _, _) => range_vec((6..721).step_by(6)),
        (AnalysisAssim | AnalysisAssimNoDa, _, _) => range_vec(0..3),
        (AnalysisAssimExtend | AnalysisAssimExtendNoDa, _, _) => range_vec(0..28),
        (AnalysisAssimLong | AnalysisAssimLongNoDa, _, _) => range_vec(0..12),
    }
}

fn validate(req: &FileRequest) -> Result<()> {
    if req.run.is_no_da() && req.var != VarType::ChannelRt {
        return Err(Error::Config(format!(
            "only channel_rt is published for '{}' runs, got '{}'",
            req.run.name(),
            req.var.name()
        )));
    }
    if req.run == RunType::LongRange && matches!(req.var, VarType::Forcing | VarType::TerrainRt) {
        return Err(Error::Config(format!(
            "long_range has no '{}' product",
            req.var.name()
        )));
    }
    if req.run == RunType::MediumRange && req.var != VarType::Forcing && req.member.is_none() {
        return Err(Error::Config(
            "medium_range model output requires an ensemble member".to_string(),
        ));
    }
    if req.end_date < req.start_date {
        return Err(Error::Config(format!(
            "end date {} precedes start date {}",
            req.end_date, req.start_date
        )));
    }
    Ok(())
}

/// Build the operational object-name list for a request.
///
/// Names are ordered by date, then cycle, then hour — the bucket's natural
/// chronological layout.
pub fn create_file_list(req: &FileRequest) -> Result<Vec<String>> {
    validate(req)?;

    let dir = run_dir(req)?;
    let cycles = match &req.fcst_cycles {
        Some(c) => c.clone(),
        None => default_cycles(req),
    };
    let hours = match &req.lead_times {
        Some(h) => h.clone(),
        None => default_hours(req),
    };

    let hour_prefix = if req.run.is_analysis_assim() { "tm" } else { "f" };
    let var_suffix = req.member.map(Member::var_suffix).unwrap_or_default();

    let mut names = Vec::new();
    let mut date = req.start_date;
    while date <= req.end_date {
        let date_txt = date.format("%Y%m%d");
        for &cycle in &cycles {
            for &hour in &hours {
                // Lookback hours are 2-digit, forecast hours 3-digit
                let hour_txt = if req.run.is_analysis_assim() {
                    format!("{:02}", hour)
                } else {
                    format!("{:03}", hour)
                };
                names.push(format!(
                    "nwm.{}/{}/nwm.t{:02}z.{}.{}{}.{}{}.{}.nc",
                    date_txt,
                    dir,
                    cycle,
                    req.run.name(),
                    req.var.name(),
                    var_suffix,
                    hour_prefix,
                    hour_txt,
                    req.geography.name(),
                ));
            }
        }
        date += Duration::days(1);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y%m%d").unwrap()
    }

    #[test]
    fn test_medium_range_forcing_template_name() {
        let req = FileRequest {
            fcst_cycles: Some(vec![0]),
            lead_times: Some(vec![1]),
            ..FileRequest::new(
                RunType::MediumRange,
                VarType::Forcing,
                Geography::Conus,
                date("20221001"),
                date("20221001"),
            )
        };
        let names = create_file_list(&req).unwrap();
        assert_eq!(
            names,
            vec!["nwm.20221001/forcing_medium_range/nwm.t00z.medium_range.forcing.f001.conus.nc"]
        );
    }

    #[test]
    fn test_short_range_forcing_defaults() {
        let req = FileRequest::new(
            RunType::ShortRange,
            VarType::Forcing,
            Geography::Conus,
            date("20220101"),
            date("20220102"),
        );
        let names = create_file_list(&req).unwrap();
        // 2 days x 24 cycles x 18 lead hours
        assert_eq!(names.len(), 2 * 24 * 18);
        assert_eq!(
            names[0],
            "nwm.20220101/forcing_short_range/nwm.t00z.short_range.forcing.f001.conus.nc"
        );
    }

    #[test]
    fn test_analysis_assim_uses_tm_hours() {
        let req = FileRequest::new(
            RunType::AnalysisAssim,
            VarType::Forcing,
            Geography::Conus,
            date("20220601"),
            date("20220601"),
        );
        let names = create_file_list(&req).unwrap();
        assert_eq!(names.len(), 20 * 3);
        assert_eq!(
            names[0],
            "nwm.20220601/forcing_analysis_assim/nwm.t00z.analysis_assim.forcing.tm00.conus.nc"
        );
    }

    #[test]
    fn test_medium_range_member_suffixes() {
        let req = FileRequest {
            member: Some(Member::new(1).unwrap()),
            fcst_cycles: Some(vec![6]),
            lead_times: Some(vec![12]),
            ..FileRequest::new(
                RunType::MediumRange,
                VarType::ChannelRt,
                Geography::Conus,
                date("20220601"),
                date("20220601"),
            )
        };
        let names = create_file_list(&req).unwrap();
        assert_eq!(
            names,
            vec!["nwm.20220601/medium_range_mem1/nwm.t06z.medium_range.channel_rt_1.f012.conus.nc"]
        );
    }

    #[test]
    fn test_hawaii_forcing_folder_variant() {
        let req = FileRequest::new(
            RunType::ShortRange,
            VarType::Forcing,
            Geography::Hawaii,
            date("20220601"),
            date("20220601"),
        );
        let names = create_file_list(&req).unwrap();
        assert_eq!(names.len(), 2 * 48);
        assert!(names[0].contains("/forcing_short_range_hawaii/"));
        assert!(names[0].ends_with(".hawaii.nc"));
    }

    #[test]
    fn test_no_da_requires_channel_rt() {
        let req = FileRequest::new(
            RunType::ShortRangeNoDa,
            VarType::Land,
            Geography::Conus,
            date("20220601"),
            date("20220601"),
        );
        assert!(matches!(create_file_list(&req), Err(Error::Config(_))));
    }

    #[test]
    fn test_long_range_has_no_forcing() {
        let req = FileRequest::new(
            RunType::LongRange,
            VarType::Forcing,
            Geography::Conus,
            date("20220601"),
            date("20220601"),
        );
        assert!(matches!(create_file_list(&req), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_codes_are_config_errors() {
        assert!(matches!(RunType::from_code(0), Err(Error::Config(_))));
        assert!(matches!(RunType::from_code(12), Err(Error::Config(_))));
        assert!(matches!(VarType::from_code(6), Err(Error::Config(_))));
        assert!(matches!(Geography::from_code(4), Err(Error::Config(_))));
        assert!(matches!(Member::new(0), Err(Error::Config(_))));
        assert!(matches!(Member::new(8), Err(Error::Config(_))));
    }

    #[test]
    fn test_reversed_date_range_rejected() {
        let req = FileRequest::new(
            RunType::ShortRange,
            VarType::Forcing,
            Geography::Conus,
            date("20220602"),
            date("20220601"),
        );
        assert!(matches!(create_file_list(&req), Err(Error::Config(_))));
    }
}
