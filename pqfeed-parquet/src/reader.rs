//! Full materialization of a file into records.

use pqfeed_result::Result;

use crate::assemble::{Projection, assemble_records};
use crate::config::ReaderConfig;
use crate::handle::FileHandle;
use crate::page::{RowGroupDecoder, RowGroupSlice, check_row_group};
use crate::types::{ReadOptions, RowGroupInfo};
use crate::value::Record;

/// Select the row-group ranges covering `skip_rows..skip_rows + row_limit`.
///
/// Row groups lying entirely inside the skipped prefix are left out, so they are
/// never decoded. Empty row groups are left out as well.
pub fn plan_row_groups(
    row_groups: &[RowGroupInfo],
    skip_rows: usize,
    row_limit: Option<usize>,
) -> Vec<RowGroupSlice> {
    let mut to_skip = skip_rows;
    let mut remaining = row_limit.unwrap_or(usize::MAX);
    let mut plan = Vec::new();

    for rg in row_groups {
        if remaining == 0 {
            break;
        }
        let rows = rg.num_rows as usize;
        if to_skip >= rows {
            to_skip -= rows;
            continue;
        }
        let offset = std::mem::take(&mut to_skip);
        let len = (rows - offset).min(remaining);
        remaining -= len;
        plan.push(RowGroupSlice {
            index: rg.index,
            offset,
            len,
        });
    }
    plan
}

/// Decode every selected row of `handle` into records.
pub fn read_records(
    handle: &FileHandle,
    options: &ReadOptions,
    config: &ReaderConfig,
) -> Result<Vec<Record>> {
    config.validate()?;
    let footer = handle.footer();
    let projection = Projection::resolve(footer.schema(), options.columns.as_deref())?;
    let plan = plan_row_groups(footer.row_groups(), options.skip_rows, options.row_limit);

    let expected: usize = plan.iter().map(|slice| slice.len).sum();
    let mut records = Vec::with_capacity(expected);

    for slice in plan {
        check_row_group(footer, slice.index, &projection)?;
        let decoder = RowGroupDecoder::open(handle.path(), footer, slice, &projection, config)?;
        for batch in decoder {
            records.extend(assemble_records(&batch?, &projection)?);
        }
    }

    tracing::debug!(
        path = %handle.path().display(),
        rows = records.len(),
        columns = projection.len(),
        "read records"
    );
    Ok(records)
}
