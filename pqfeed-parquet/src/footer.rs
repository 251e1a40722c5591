//! Footer validation and decoding.
//!
//! A Parquet file ends with `<metadata><u32 LE metadata length>PAR1`. The footer
//! is the only part of the file parsed on open; everything in [`Schema`] and
//! [`Metadata`] is derived from it without touching data pages.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use parquet::arrow::arrow_reader::{ArrowReaderMetadata, ArrowReaderOptions};
use parquet::basic::Compression;
use parquet::file::metadata::{ColumnChunkMetaData, ParquetMetaData, ParquetMetaDataReader, RowGroupMetaData};
use pqfeed_result::{Error, Result};

use crate::config::ReaderConfig;
use crate::types::{ColumnChunkInfo, Metadata, RowGroupInfo, Schema};

pub const PARQUET_MAGIC: &[u8; 4] = b"PAR1";

/// Metadata length field plus trailing magic.
pub const FOOTER_SIZE: u64 = 8;

/// Leading magic plus [`FOOTER_SIZE`].
const MIN_FILE_SIZE: u64 = 4 + FOOTER_SIZE;

/// Decoded, validated footer of one file.
///
/// Immutable once built; shared between every reader of the same handle.
#[derive(Debug, Clone)]
pub struct Footer {
    parquet: Arc<ParquetMetaData>,
    arrow: ArrowReaderMetadata,
    schema: Arc<Schema>,
    metadata: Arc<Metadata>,
    /// Modification time of the file when the footer was read.
    modified: Option<SystemTime>,
}

impl Footer {
    /// Validate the trailer of `file` and decode its metadata block.
    pub fn decode(path: &Path, file: &File, config: &ReaderConfig) -> Result<Self> {
        let stat = file.metadata()?;
        let file_size = stat.len();
        let modified = stat.modified().ok();
        if file_size < MIN_FILE_SIZE {
            return Err(Error::corrupt_footer(
                path,
                format!("file is {file_size} bytes, smaller than the minimum of {MIN_FILE_SIZE}"),
            ));
        }

        let mut handle = file;
        let mut head = [0u8; 4];
        handle.seek(SeekFrom::Start(0))?;
        handle.read_exact(&mut head)?;
        if &head != PARQUET_MAGIC {
            return Err(Error::corrupt_footer(path, "missing leading PAR1 magic"));
        }

        let mut tail = [0u8; FOOTER_SIZE as usize];
        handle.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        handle.read_exact(&mut tail)?;
        if &tail[4..] != PARQUET_MAGIC {
            return Err(Error::corrupt_footer(path, "missing trailing PAR1 magic"));
        }

        let metadata_len = u64::from(u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]));
        if metadata_len + MIN_FILE_SIZE > file_size {
            return Err(Error::corrupt_footer(
                path,
                format!("metadata length {metadata_len} exceeds file size {file_size}"),
            ));
        }

        let parquet = ParquetMetaDataReader::new()
            .parse_and_finish(file)
            .map_err(|e| Error::corrupt_footer(path, e))?;

        let version = parquet.file_metadata().version();
        if version > config.max_format_version {
            return Err(Error::UnsupportedFormatVersion {
                path: path.to_path_buf(),
                version,
                max: config.max_format_version,
            });
        }

        let schema = Schema::from_parquet(parquet.file_metadata().schema());
        if let Some(name) = schema.find_duplicate_name() {
            return Err(Error::corrupt_footer(
                path,
                format!("duplicate field name '{name}'"),
            ));
        }

        let metadata = summarize(&parquet, &schema, file_size);
        let parquet = Arc::new(parquet);
        let arrow = ArrowReaderMetadata::try_new(Arc::clone(&parquet), ArrowReaderOptions::new())
            .map_err(|e| Error::corrupt_footer(path, e))?;

        tracing::debug!(
            path = %path.display(),
            version,
            rows = metadata.num_rows,
            row_groups = metadata.num_row_groups,
            "decoded footer"
        );

        Ok(Self {
            parquet,
            arrow,
            schema: Arc::new(schema),
            metadata: Arc::new(metadata),
            modified,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn metadata(&self) -> &Arc<Metadata> {
        &self.metadata
    }

    pub fn parquet_metadata(&self) -> &Arc<ParquetMetaData> {
        &self.parquet
    }

    /// Reader metadata used to build Arrow record batch readers without reparsing.
    pub fn arrow_metadata(&self) -> &ArrowReaderMetadata {
        &self.arrow
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn num_rows(&self) -> u64 {
        self.metadata.num_rows
    }

    pub fn file_size(&self) -> u64 {
        self.metadata.file_size
    }

    pub fn row_group(&self, index: usize) -> Option<&RowGroupMetaData> {
        self.parquet.row_groups().get(index)
    }

    pub fn row_groups(&self) -> &[RowGroupInfo] {
        &self.metadata.row_groups
    }
}

fn summarize(parquet: &ParquetMetaData, schema: &Schema, file_size: u64) -> Metadata {
    let file_metadata = parquet.file_metadata();
    let mut first_row = 0u64;
    let row_groups = parquet
        .row_groups()
        .iter()
        .enumerate()
        .map(|(index, rg)| {
            let num_rows = rg.num_rows().max(0) as u64;
            let info = RowGroupInfo {
                index,
                num_rows,
                first_row,
                num_columns: rg.num_columns(),
                total_byte_size: rg.total_byte_size().max(0) as u64,
                columns: rg.columns().iter().map(column_chunk_info).collect(),
            };
            first_row += num_rows;
            info
        })
        .collect::<Vec<_>>();

    Metadata {
        num_rows: file_metadata.num_rows().max(0) as u64,
        num_columns: schema.len(),
        num_row_groups: row_groups.len(),
        file_size,
        format_version: file_metadata.version(),
        created_by: file_metadata.created_by().map(str::to_string),
        schema: schema.clone(),
        row_groups,
    }
}

fn column_chunk_info(column: &ColumnChunkMetaData) -> ColumnChunkInfo {
    let (data_offset, _) = column.byte_range();
    ColumnChunkInfo {
        path: column.column_path().string(),
        physical_type: column.column_type().into(),
        compression: codec_name(column.compression()).to_string(),
        encodings: column
            .encodings()
            .iter()
            .map(|encoding| format!("{encoding:?}"))
            .collect(),
        data_offset,
        compressed_size: column.compressed_size().max(0) as u64,
        num_values: column.num_values().max(0) as u64,
        null_count: column.statistics().and_then(|stats| stats.null_count_opt()),
    }
}

/// Codec name without level parameters.
pub(crate) fn codec_name(codec: Compression) -> &'static str {
    match codec {
        Compression::UNCOMPRESSED => "UNCOMPRESSED",
        Compression::SNAPPY => "SNAPPY",
        Compression::GZIP(_) => "GZIP",
        Compression::LZO => "LZO",
        Compression::BROTLI(_) => "BROTLI",
        Compression::LZ4 => "LZ4",
        Compression::ZSTD(_) => "ZSTD",
        Compression::LZ4_RAW => "LZ4_RAW",
        #[allow(unreachable_patterns)]
        _ => "UNKNOWN",
    }
}
