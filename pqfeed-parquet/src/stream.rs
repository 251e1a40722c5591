//! Chunked streaming with caller-controlled early termination.
//!
//! Row groups are decoded one at a time in file order. Decoded records are
//! buffered until exactly `chunk_size` are available, then handed to the
//! handler; only the final chunk may be shorter. Resident memory is bounded by
//! one chunk plus one decoded batch.

use pqfeed_result::{BoxError, Error, Result};
use serde::Serialize;

use crate::assemble::{Projection, assemble_records};
use crate::config::ReaderConfig;
use crate::handle::FileHandle;
use crate::page::{RowGroupDecoder, check_row_group};
use crate::reader::plan_row_groups;
use crate::types::ReadOptions;
use crate::value::Record;

/// What the streaming loop does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkControl {
    #[default]
    Continue,
    /// End the read successfully; no further row groups are decoded.
    Stop,
}

/// Outcome of a completed chunked read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSummary {
    /// Chunks delivered to the handler.
    pub chunks: usize,
    /// Rows delivered to the handler.
    pub rows: usize,
    /// Row groups whose pages were decoded.
    pub row_groups_decoded: usize,
    /// The handler returned [`ChunkControl::Stop`].
    pub stopped_early: bool,
}

/// Stream the rows selected by `options` to `handler` in chunks of `chunk_size`.
///
/// `handler` owns each chunk it receives. Returning `Ok(ChunkControl::Stop)`
/// ends the read with `Ok`; returning `Err` aborts it with
/// [`Error::HandlerFailure`].
pub fn stream_chunks<F, E>(
    handle: &FileHandle,
    chunk_size: usize,
    options: &ReadOptions,
    config: &ReaderConfig,
    mut handler: F,
) -> Result<StreamSummary>
where
    F: FnMut(Vec<Record>) -> std::result::Result<ChunkControl, E>,
    E: Into<BoxError>,
{
    if chunk_size == 0 {
        return Err(Error::InvalidChunkSize(chunk_size));
    }
    config.validate()?;
    let config = &ReaderConfig {
        batch_size: config.batch_size.min(chunk_size),
        ..config.clone()
    };

    let footer = handle.footer();
    let projection = Projection::resolve(footer.schema(), options.columns.as_deref())?;
    let plan = plan_row_groups(footer.row_groups(), options.skip_rows, options.row_limit);

    let capacity = config.batch_size;
    let mut summary = StreamSummary::default();
    let mut buffer: Vec<Record> = Vec::with_capacity(capacity);

    let mut emit = |chunk: Vec<Record>, summary: &mut StreamSummary| -> Result<ChunkControl> {
        summary.chunks += 1;
        summary.rows += chunk.len();
        tracing::trace!(chunk = summary.chunks, rows = chunk.len(), "delivering chunk");
        let control = handler(chunk).map_err(Error::handler_failure)?;
        if control == ChunkControl::Stop {
            summary.stopped_early = true;
        }
        Ok(control)
    };

    for slice in plan {
        check_row_group(footer, slice.index, &projection)?;
        let decoder = RowGroupDecoder::open(handle.path(), footer, slice, &projection, config)?;
        summary.row_groups_decoded += 1;

        for batch in decoder {
            let mut records = assemble_records(&batch?, &projection)?.into_iter();
            loop {
                let room = chunk_size - buffer.len();
                buffer.extend(records.by_ref().take(room));
                if buffer.len() < chunk_size {
                    break;
                }
                let chunk = std::mem::replace(&mut buffer, Vec::with_capacity(capacity));
                if emit(chunk, &mut summary)? == ChunkControl::Stop {
                    log_summary(handle, &summary);
                    return Ok(summary);
                }
            }
        }
    }

    if !buffer.is_empty() {
        emit(buffer, &mut summary)?;
    }
    log_summary(handle, &summary);
    Ok(summary)
}

fn log_summary(handle: &FileHandle, summary: &StreamSummary) {
    tracing::debug!(
        path = %handle.path().display(),
        chunks = summary.chunks,
        rows = summary.rows,
        row_groups = summary.row_groups_decoded,
        stopped_early = summary.stopped_early,
        "chunked read finished"
    );
}
