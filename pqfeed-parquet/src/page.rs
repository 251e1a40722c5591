//! Column chunk decoding.
//!
//! Pages are decompressed and decoded by `parquet`'s Arrow reader. This module
//! decides what may be decoded at all and how: every projected column chunk is
//! checked against the supported codecs and encodings before any of its pages
//! are read, and a row group is decoded either by one reader over all projected
//! columns or by one reader per column running on the rayon pool.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::datatypes::{Field as ArrowField, Schema as ArrowSchema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::basic::{Compression, Encoding, Type as ParquetType};
use pqfeed_result::{Error, Result};
use rayon::prelude::*;

use crate::assemble::Projection;
use crate::config::ReaderConfig;
use crate::footer::{Footer, codec_name};

/// Rows of one row group selected for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowGroupSlice {
    pub index: usize,
    /// Rows to skip from the start of the group.
    pub offset: usize,
    pub len: usize,
}

pub fn is_supported_codec(codec: Compression) -> bool {
    matches!(
        codec,
        Compression::UNCOMPRESSED | Compression::SNAPPY | Compression::ZSTD(_)
    )
}

/// Whether the Arrow reader decodes `encoding` in a column of `physical_type`.
///
/// `RLE` and `BIT_PACKED` also encode repetition and definition levels, so
/// they are accepted for every type.
#[allow(deprecated)]
pub fn is_supported_encoding(physical_type: ParquetType, encoding: Encoding) -> bool {
    match encoding {
        Encoding::PLAIN
        | Encoding::PLAIN_DICTIONARY
        | Encoding::RLE_DICTIONARY
        | Encoding::RLE
        | Encoding::BIT_PACKED => true,
        Encoding::DELTA_BINARY_PACKED => {
            matches!(physical_type, ParquetType::INT32 | ParquetType::INT64)
        }
        Encoding::DELTA_LENGTH_BYTE_ARRAY => physical_type == ParquetType::BYTE_ARRAY,
        Encoding::DELTA_BYTE_ARRAY => matches!(
            physical_type,
            ParquetType::BYTE_ARRAY | ParquetType::FIXED_LEN_BYTE_ARRAY
        ),
        Encoding::BYTE_STREAM_SPLIT => matches!(
            physical_type,
            ParquetType::FLOAT
                | ParquetType::DOUBLE
                | ParquetType::INT32
                | ParquetType::INT64
                | ParquetType::FIXED_LEN_BYTE_ARRAY
        ),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

/// Check every projected column chunk of `row_group` before decoding it.
///
/// Chunks of columns outside the projection are never decoded, so they are not checked.
pub fn check_row_group(footer: &Footer, row_group: usize, projection: &Projection) -> Result<()> {
    let meta = footer.row_group(row_group).ok_or_else(|| {
        Error::Internal(format!("row group {row_group} is not in the footer"))
    })?;
    let descr = meta.schema_descr();

    for (leaf, column) in meta.columns().iter().enumerate() {
        if !projection.contains_root(descr.get_column_root_idx(leaf)) {
            continue;
        }
        let codec = column.compression();
        if !is_supported_codec(codec) {
            return Err(Error::UnsupportedCompression {
                column: column.column_path().string(),
                codec: codec_name(codec).to_string(),
            });
        }
        let physical_type = column.column_type();
        if let Some(encoding) = column
            .encodings()
            .iter()
            .find(|encoding| !is_supported_encoding(physical_type, **encoding))
        {
            return Err(Error::UnsupportedEncoding {
                column: column.column_path().string(),
                encoding: format!("{encoding:?}"),
            });
        }
    }
    Ok(())
}

/// Iterator of decoded batches covering one [`RowGroupSlice`].
///
/// Each decoder opens its own file descriptor, so decoders for the same handle
/// may run on different threads.
pub struct RowGroupDecoder {
    inner: DecoderInner,
}

enum DecoderInner {
    Single(ParquetRecordBatchReader),
    /// One reader per projected root, advanced in lock-step.
    PerColumn {
        readers: Vec<ParquetRecordBatchReader>,
        schema: SchemaRef,
    },
    Done,
}

impl RowGroupDecoder {
    pub fn open(
        path: &Path,
        footer: &Footer,
        slice: RowGroupSlice,
        projection: &Projection,
        config: &ReaderConfig,
    ) -> Result<Self> {
        let descr = footer.parquet_metadata().file_metadata().schema_descr();
        let inner = if config.parallel_columns && projection.roots().len() > 1 {
            let readers = projection
                .roots()
                .par_iter()
                .map(|root| {
                    let mask = ProjectionMask::roots(descr, [*root]);
                    build_reader(path, footer, slice, mask, config)
                })
                .collect::<Result<Vec<_>>>()?;
            let fields: Vec<ArrowField> = readers
                .iter()
                .map(|reader| reader.schema().field(0).clone())
                .collect();
            DecoderInner::PerColumn {
                readers,
                schema: Arc::new(ArrowSchema::new(fields)),
            }
        } else {
            DecoderInner::Single(build_reader(
                path,
                footer,
                slice,
                projection.mask(descr),
                config,
            )?)
        };

        tracing::trace!(
            path = %path.display(),
            row_group = slice.index,
            offset = slice.offset,
            len = slice.len,
            parallel = matches!(inner, DecoderInner::PerColumn { .. }),
            "opened row group decoder"
        );
        Ok(Self { inner })
    }

    fn next_per_column(
        readers: &mut [ParquetRecordBatchReader],
        schema: &SchemaRef,
    ) -> Option<Result<RecordBatch>> {
        let results: Vec<_> = readers.par_iter_mut().map(Iterator::next).collect();
        if results.iter().all(Option::is_none) {
            return None;
        }

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Some(Ok(batch)) => columns.push(Arc::clone(batch.column(0))),
                Some(Err(e)) => return Some(Err(e.into())),
                None => {
                    return Some(Err(Error::Internal(
                        "column readers fell out of step".into(),
                    )));
                }
            }
        }
        Some(RecordBatch::try_new(Arc::clone(schema), columns).map_err(Error::from))
    }
}

impl Iterator for RowGroupDecoder {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match &mut self.inner {
            DecoderInner::Single(reader) => reader.next().map(|r| r.map_err(Error::from)),
            DecoderInner::PerColumn { readers, schema } => Self::next_per_column(readers, schema),
            DecoderInner::Done => None,
        };
        // Stop after the first error rather than resuming a broken reader.
        if matches!(item, None | Some(Err(_))) {
            self.inner = DecoderInner::Done;
        }
        item
    }
}

fn build_reader(
    path: &Path,
    footer: &Footer,
    slice: RowGroupSlice,
    mask: ProjectionMask,
    config: &ReaderConfig,
) -> Result<ParquetRecordBatchReader> {
    let file = File::open(path)?;
    let mut builder =
        ParquetRecordBatchReaderBuilder::new_with_metadata(file, footer.arrow_metadata().clone())
            .with_projection(mask)
            .with_row_groups(vec![slice.index])
            .with_batch_size(config.batch_size.min(slice.len.max(1)))
            .with_limit(slice.len);
    if slice.offset > 0 {
        builder = builder.with_offset(slice.offset);
    }
    Ok(builder.build()?)
}
