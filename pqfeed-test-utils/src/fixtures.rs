//! Deterministic Parquet fixtures.
//!
//! Every generated value is a pure function of the row id, so tests can assert
//! on decoded records without keeping the source batches around.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryArray, BooleanArray, Float64Array, Int32Array, Int64Array, ListBuilder,
    StringArray, StringBuilder, StructArray,
};
use arrow::datatypes::{DataType, Field, Fields, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use pqfeed_result::{Error, Result};

/// Schema of the `users` fixture: six columns, two of them nullable.
pub fn users_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("active", DataType::Boolean, false),
        Field::new("score", DataType::Float64, false),
        Field::new("age", DataType::Int32, true),
        Field::new("metadata", DataType::Binary, true),
    ]))
}

pub fn user_name(id: i64) -> String {
    format!("user-{id}")
}

/// Null for every fifth id.
pub fn user_age(id: i64) -> Option<i32> {
    if id % 5 == 0 {
        None
    } else {
        Some(20 + (id % 30) as i32)
    }
}

/// Null for every seventh id.
pub fn user_metadata(id: i64) -> Option<Vec<u8>> {
    if id % 7 == 0 {
        None
    } else {
        Some(format!("meta-{id}").into_bytes())
    }
}

/// Build `len` users with consecutive ids starting at `first_id`.
pub fn users_batch(first_id: i64, len: usize) -> Result<RecordBatch> {
    let ids: Vec<i64> = (first_id..first_id + len as i64).collect();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(ids.clone())),
        Arc::new(StringArray::from_iter_values(
            ids.iter().map(|id| user_name(*id)),
        )),
        Arc::new(BooleanArray::from_iter(
            ids.iter().map(|id| Some(id % 2 == 0)),
        )),
        Arc::new(Float64Array::from_iter_values(
            ids.iter().map(|id| *id as f64 * 1.5),
        )),
        Arc::new(Int32Array::from_iter(ids.iter().map(|id| user_age(*id)))),
        Arc::new(BinaryArray::from_iter(
            ids.iter().map(|id| user_metadata(*id)),
        )),
    ];
    Ok(RecordBatch::try_new(users_schema(), columns)?)
}

/// `id`, `name`, `active` for ids `1..=rows`.
pub fn three_column_batch(rows: usize) -> Result<RecordBatch> {
    let users = users_batch(1, rows)?;
    Ok(users.project(&[0, 1, 2])?)
}

/// Rows with a struct column and a list column.
///
/// - `address` is `{city, zip}`; `zip` is null on odd ids.
/// - `tags` holds `id % 3` strings; it is null when `id % 4 == 0`.
pub fn nested_batch(rows: usize) -> Result<RecordBatch> {
    let ids: Vec<i64> = (1..=rows as i64).collect();

    let city_field = Arc::new(Field::new("city", DataType::Utf8, true));
    let zip_field = Arc::new(Field::new("zip", DataType::Int32, true));
    let cities: ArrayRef = Arc::new(StringArray::from_iter_values(
        ids.iter().map(|id| format!("city-{id}")),
    ));
    let zips: ArrayRef = Arc::new(Int32Array::from_iter(
        ids.iter()
            .map(|id| (id % 2 == 0).then_some(10_000 + *id as i32)),
    ));
    let address = StructArray::from(vec![
        (Arc::clone(&city_field), cities),
        (Arc::clone(&zip_field), zips),
    ]);

    let mut tags = ListBuilder::new(StringBuilder::new());
    for id in &ids {
        if id % 4 == 0 {
            tags.append(false);
            continue;
        }
        for n in 0..(id % 3) {
            tags.values().append_value(format!("tag-{id}-{n}"));
        }
        tags.append(true);
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new(
            "address",
            DataType::Struct(Fields::from(vec![city_field, zip_field])),
            true,
        ),
        Field::new(
            "tags",
            DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
            true,
        ),
    ]));

    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(address),
            Arc::new(tags.finish()),
        ],
    )?)
}

/// Snappy-compressed writer properties with the given row-group size.
pub fn writer_props(max_row_group_size: usize) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_max_row_group_size(max_row_group_size)
        .build()
}

/// Write `batches` to a new Parquet file at `path`.
///
/// Batches larger than the configured row-group size are split across row groups.
pub fn write_batches(path: &Path, batches: &[RecordBatch], props: WriterProperties) -> Result<PathBuf> {
    let schema = batches
        .first()
        .map(|batch| batch.schema())
        .ok_or_else(|| Error::InvalidArgumentError("no batches to write".into()))?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;

    Ok(path.to_path_buf())
}

/// Write `rows` users (ids `1..=rows`) to `dir/name`.
pub fn write_users_file(dir: &Path, name: &str, rows: usize, row_group_size: usize) -> Result<PathBuf> {
    let batch = users_batch(1, rows)?;
    write_batches(&dir.join(name), &[batch], writer_props(row_group_size))
}
