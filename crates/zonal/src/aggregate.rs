//! Zonal forcing aggregation
//!
//! Applies a weight map to many time-stepped forcing files, producing one
//! time-ordered series of catchment-mean variable values per catchment.
//!
//! Files are independent work items: a fixed-size pool processes them in
//! any order, each worker returning an immutable per-file result, and a
//! single-threaded reducer stitches the results together and sorts rows by
//! each file's valid time. The batch is best-effort: a file that cannot be
//! read, lacks a variable, or arrives on the wrong grid is skipped and
//! reported while the rest of the batch completes.

use crate::weights::WeightMap;
use chrono::{DateTime, Utc};
use hydroforce_core::{Error, Result, VariableStack};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One forcing file, decoded: the variable stack plus its valid time.
#[derive(Debug, Clone)]
pub struct ForcingSlice {
    pub valid_time: DateTime<Utc>,
    pub stack: VariableStack,
}

/// A file the batch skipped, and why.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub file: PathBuf,
    pub reason: String,
}

/// Time-ordered per-catchment records; `values[i]` holds one value per
/// requested variable, in declared order, for `times[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatchmentSeries {
    pub times: Vec<DateTime<Utc>>,
    pub values: Vec<Vec<f64>>,
}

impl CatchmentSeries {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Result of one aggregation batch.
#[derive(Debug)]
pub struct AggregateOutcome {
    /// catchment id → time-sorted series
    pub series: BTreeMap<String, CatchmentSeries>,
    /// Variable names, in the order series rows store them
    pub variables: Vec<String>,
    /// Files successfully folded into the series
    pub processed: usize,
    /// Files skipped, in input-list order
    pub failures: Vec<FileFailure>,
}

/// Catchment means for one decoded stack: catchment id → one mean per
/// stack variable, NaN-skipping, NaN when a catchment has no valid pixels.
pub fn zonal_means(stack: &VariableStack, weights: &WeightMap) -> Result<Vec<Vec<f64>>> {
    let (rows, cols) = stack.shape();
    weights.grid().check_shape(rows, cols)?;

    let mut all = Vec::with_capacity(weights.len());
    for (_, entry) in weights.iter() {
        let mut means = Vec::with_capacity(stack.num_vars());
        for band_idx in 0..stack.num_vars() {
            let band = stack.band(band_idx);
            let mut sum = 0.0_f64;
            let mut count = 0_usize;
            for (row, col) in entry.indices() {
                let v = band[(row, col)];
                if !v.is_nan() {
                    sum += v as f64;
                    count += 1;
                }
            }
            means.push(if count > 0 { sum / count as f64 } else { f64::NAN });
        }
        all.push(means);
    }
    Ok(all)
}

/// Per-file worker result: valid time plus per-catchment means.
struct FileResult {
    valid_time: DateTime<Utc>,
    /// Indexed like `weights.iter()`: [catchment][variable]
    means: Vec<Vec<f64>>,
}

fn process_file<F>(
    path: &Path,
    weights: &WeightMap,
    variables: &[String],
    read: &F,
) -> std::result::Result<FileResult, FileFailure>
where
    F: Fn(&Path) -> Result<ForcingSlice> + Sync,
{
    let fail = |reason: String| FileFailure {
        file: path.to_path_buf(),
        reason,
    };

    let slice = read(path).map_err(|e| fail(e.to_string()))?;

    if slice.stack.names() != variables {
        return Err(fail(format!(
            "variables {:?} do not match requested {:?}",
            slice.stack.names(),
            variables
        )));
    }

    let means = zonal_means(&slice.stack, weights).map_err(|e| fail(e.to_string()))?;
    Ok(FileResult {
        valid_time: slice.valid_time,
        means,
    })
}

/// Run the aggregation batch over `files` on a pool of `threads` workers.
///
/// `read` decodes one file into a [`ForcingSlice`]; it must load exactly
/// the requested variables. Rows of every returned series are sorted by
/// valid time regardless of completion order.
pub fn aggregate<F>(
    weights: &WeightMap,
    variables: &[String],
    files: &[PathBuf],
    threads: usize,
    read: F,
) -> Result<AggregateOutcome>
where
    F: Fn(&Path) -> Result<ForcingSlice> + Sync,
{
    if variables.is_empty() {
        return Err(Error::Config("no variables requested".to_string()));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .map_err(|e| Error::Other(format!("thread pool: {}", e)))?;

    let results: Vec<std::result::Result<FileResult, FileFailure>> = pool.install(|| {
        files
            .par_iter()
            .map(|path| process_file(path, weights, variables, &read))
            .collect()
    });

    // Single-threaded reduction: split failures out, then time-sort
    let mut ok: Vec<FileResult> = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(r) => ok.push(r),
            Err(f) => {
                warn!(file = %f.file.display(), reason = %f.reason, "skipping forcing file");
                failures.push(f);
            }
        }
    }
    ok.sort_by_key(|r| r.valid_time);

    let processed = ok.len();
    let mut series: BTreeMap<String, CatchmentSeries> = BTreeMap::new();
    for (cat_idx, id) in weights.ids().enumerate() {
        let mut s = CatchmentSeries::default();
        for result in &ok {
            s.times.push(result.valid_time);
            s.values.push(result.means[cat_idx].clone());
        }
        series.insert(id.to_string(), s);
    }

    Ok(AggregateOutcome {
        series,
        variables: variables.to_vec(),
        processed,
        failures,
    })
}
