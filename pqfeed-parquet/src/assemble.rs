//! Column projection and record assembly.
//!
//! Decoded batches are converted column by column into [`Value`]s and then
//! transposed into [`Record`]s. Nested fields keep their shape:
//!
//! | Parquet / Arrow shape  | Value                                  |
//! |------------------------|----------------------------------------|
//! | group / struct         | `Map` with children in declaration order |
//! | `LIST` / repeated      | `List`                                 |
//! | `MAP`                  | `Map` keyed by the key's display form  |
//! | null at any level      | `Null`                                 |
//!
//! No dotted-path flattening is performed, so a projected top-level field
//! always produces exactly one output key.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, UInt8Type,
    UInt16Type, UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::ProjectionMask;
use parquet::schema::types::SchemaDescriptor;
use pqfeed_result::{Error, Result};
use rustc_hash::FxHashSet;

use crate::types::Schema;
use crate::value::{Record, Value};

/// Top-level fields selected for one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// Selected root indices in file order; this is the column order of decoded batches.
    roots: Vec<usize>,
    /// For each output key, its position within `roots`.
    batch_positions: Vec<usize>,
    names: Arc<[String]>,
}

impl Projection {
    /// Resolve a column selection against `schema`.
    ///
    /// `None` and an empty list both select every top-level field in declaration
    /// order. Otherwise output keys follow the requested order; repeated names
    /// collapse onto their first occurrence.
    pub fn resolve(schema: &Schema, columns: Option<&[String]>) -> Result<Self> {
        let requested: Vec<usize> = match columns {
            None | Some([]) => (0..schema.len()).collect(),
            Some(names) => {
                let mut seen = FxHashSet::default();
                let mut indices = Vec::with_capacity(names.len());
                for name in names {
                    let idx = schema
                        .index_of(name)
                        .ok_or_else(|| Error::InvalidColumnSelection {
                            column: name.clone(),
                            available: schema.field_names(),
                        })?;
                    if seen.insert(idx) {
                        indices.push(idx);
                    }
                }
                indices
            }
        };

        let mut roots = requested.clone();
        roots.sort_unstable();
        let batch_positions = requested
            .iter()
            .map(|idx| roots.binary_search(idx).unwrap_or_default())
            .collect();
        let names: Arc<[String]> = requested
            .iter()
            .map(|idx| schema.fields[*idx].name.clone())
            .collect();

        Ok(Self {
            roots,
            batch_positions,
            names,
        })
    }

    /// Root field indices in file order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn contains_root(&self, root: usize) -> bool {
        self.roots.binary_search(&root).is_ok()
    }

    /// Output keys in output order.
    pub fn names(&self) -> &Arc<[String]> {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub(crate) fn mask(&self, descr: &SchemaDescriptor) -> ProjectionMask {
        ProjectionMask::roots(descr, self.roots.iter().copied())
    }
}

/// Convert one decoded batch into records.
///
/// `batch` must hold the projection's roots in file order, as produced by a
/// decoder built from [`Projection::mask`].
pub fn assemble_records(batch: &RecordBatch, projection: &Projection) -> Result<Vec<Record>> {
    if batch.num_columns() != projection.roots.len() {
        return Err(Error::Internal(format!(
            "decoded batch has {} columns, projection expects {}",
            batch.num_columns(),
            projection.roots.len()
        )));
    }

    let mut columns = projection
        .batch_positions
        .iter()
        .map(|pos| column_values(batch.column(*pos)).map(Vec::into_iter))
        .collect::<Result<Vec<_>>>()?;

    let num_rows = batch.num_rows();
    let mut records = Vec::with_capacity(num_rows);
    for _ in 0..num_rows {
        let values = columns
            .iter_mut()
            .map(|column| column.next().unwrap_or(Value::Null))
            .collect();
        records.push(Record::new(Arc::clone(&projection.names), values));
    }
    Ok(records)
}

macro_rules! primitive_values {
    ($array:expr, $arrow_ty:ty, $variant:ident, $cast:ty) => {
        $array
            .as_primitive::<$arrow_ty>()
            .iter()
            .map(|v| v.map_or(Value::Null, |v| Value::$variant(v as $cast)))
            .collect()
    };
}

/// Convert every slot of `array` into a [`Value`].
pub(crate) fn column_values(array: &ArrayRef) -> Result<Vec<Value>> {
    let values = match array.data_type() {
        DataType::Null => vec![Value::Null; array.len()],
        DataType::Boolean => array
            .as_boolean()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect(),
        DataType::Int8 => primitive_values!(array, Int8Type, Int, i64),
        DataType::Int16 => primitive_values!(array, Int16Type, Int, i64),
        DataType::Int32 => primitive_values!(array, Int32Type, Int, i64),
        DataType::Int64 => primitive_values!(array, Int64Type, Int, i64),
        DataType::UInt8 => primitive_values!(array, UInt8Type, Int, i64),
        DataType::UInt16 => primitive_values!(array, UInt16Type, Int, i64),
        DataType::UInt32 => primitive_values!(array, UInt32Type, Int, i64),
        DataType::UInt64 => primitive_values!(array, UInt64Type, UInt, u64),
        DataType::Float32 => primitive_values!(array, Float32Type, Float, f64),
        DataType::Float64 => primitive_values!(array, Float64Type, Float, f64),
        DataType::Utf8 => strings(array.as_string::<i32>().iter()),
        DataType::LargeUtf8 => strings(array.as_string::<i64>().iter()),
        DataType::Utf8View => strings(array.as_string_view().iter()),
        DataType::Binary => binaries(array.as_binary::<i32>().iter()),
        DataType::LargeBinary => binaries(array.as_binary::<i64>().iter()),
        DataType::BinaryView => binaries(array.as_binary_view().iter()),
        DataType::FixedSizeBinary(_) => binaries(array.as_fixed_size_binary().iter()),
        DataType::List(_) => {
            let list = array.as_list::<i32>();
            let offsets = list.value_offsets().iter().map(|o| *o as usize);
            sliced_lists(list, column_values(list.values())?, offsets)
        }
        DataType::LargeList(_) => {
            let list = array.as_list::<i64>();
            let offsets = list.value_offsets().iter().map(|o| *o as usize);
            sliced_lists(list, column_values(list.values())?, offsets)
        }
        DataType::FixedSizeList(_, _) => {
            let list = array.as_fixed_size_list();
            let mut values = Vec::with_capacity(list.len());
            for row in 0..list.len() {
                values.push(if list.is_null(row) {
                    Value::Null
                } else {
                    Value::List(column_values(&list.value(row))?)
                });
            }
            values
        }
        DataType::Struct(_) => {
            let strukt = array.as_struct();
            let names = strukt.column_names();
            let children = strukt
                .columns()
                .iter()
                .map(column_values)
                .collect::<Result<Vec<_>>>()?;
            (0..strukt.len())
                .map(|row| {
                    if strukt.is_null(row) {
                        return Value::Null;
                    }
                    Value::Map(
                        names
                            .iter()
                            .zip(&children)
                            .map(|(name, child)| (name.to_string(), child[row].clone()))
                            .collect(),
                    )
                })
                .collect()
        }
        DataType::Map(_, _) => {
            let map = array.as_map();
            let keys = column_values(map.keys())?;
            let entries = column_values(map.values())?;
            let offsets = map.value_offsets();
            (0..map.len())
                .map(|row| {
                    if map.is_null(row) {
                        return Value::Null;
                    }
                    let (start, end) = (offsets[row] as usize, offsets[row + 1] as usize);
                    Value::Map(
                        (start..end)
                            .map(|i| (keys[i].to_string(), entries[i].clone()))
                            .collect(),
                    )
                })
                .collect()
        }
        DataType::Dictionary(_, value_type) => {
            let decoded = arrow::compute::cast(array, value_type)?;
            column_values(&decoded)?
        }
        _ => formatted(array)?,
    };
    Ok(values)
}

fn strings<'a>(iter: impl Iterator<Item = Option<&'a str>>) -> Vec<Value> {
    iter.map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string())))
        .collect()
}

fn binaries<'a>(iter: impl Iterator<Item = Option<&'a [u8]>>) -> Vec<Value> {
    iter.map(|v| v.map_or(Value::Null, Value::from_binary))
        .collect()
}

fn sliced_lists(
    list: &dyn Array,
    items: Vec<Value>,
    offsets: impl Iterator<Item = usize>,
) -> Vec<Value> {
    let offsets: Vec<usize> = offsets.collect();
    (0..list.len())
        .map(|row| {
            if list.is_null(row) {
                Value::Null
            } else {
                Value::List(items[offsets[row]..offsets[row + 1]].to_vec())
            }
        })
        .collect()
}

/// Temporal, decimal and interval columns surface as their display strings.
fn formatted(array: &ArrayRef) -> Result<Vec<Value>> {
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(array.as_ref(), &options)?;
    Ok((0..array.len())
        .map(|row| {
            if array.is_null(row) {
                Value::Null
            } else {
                Value::String(formatter.value(row).to_string())
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, Repetition};
    use arrow::array::{
        Date32Array, DictionaryArray, Int64Array, MapBuilder, StringArray, StringBuilder,
        Int32Builder,
    };
    use arrow::datatypes::{Field as ArrowField, Schema as ArrowSchema};
    use pqfeed_test_utils::{nested_batch, users_batch};

    fn leaf(name: &str) -> Field {
        Field {
            name: name.to_string(),
            physical_type: Some(crate::types::PhysicalType::Int64),
            type_length: None,
            logical_type: None,
            repetition: Repetition::Required,
            depth: 0,
            children: Vec::new(),
        }
    }

    fn schema(names: &[&str]) -> Schema {
        Schema {
            fields: names.iter().map(|n| leaf(n)).collect(),
        }
    }

    #[test]
    fn empty_selection_means_all() {
        let schema = schema(&["id", "name", "active"]);
        let all = Projection::resolve(&schema, None).unwrap();
        let empty = Projection::resolve(&schema, Some(&[])).unwrap();
        assert_eq!(all, empty);
        assert_eq!(all.roots(), [0, 1, 2]);
        assert_eq!(all.names().as_ref(), ["id", "name", "active"]);
    }

    #[test]
    fn selection_keeps_requested_order_and_collapses_duplicates() {
        let schema = schema(&["id", "name", "active"]);
        let columns = vec!["active".to_string(), "id".to_string(), "active".to_string()];
        let projection = Projection::resolve(&schema, Some(&columns)).unwrap();
        assert_eq!(projection.roots(), [0, 2]);
        assert_eq!(projection.names().as_ref(), ["active", "id"]);
        assert!(projection.contains_root(2));
        assert!(!projection.contains_root(1));
    }

    #[test]
    fn unknown_column_is_rejected() {
        let schema = schema(&["id"]);
        let columns = vec!["id".to_string(), "nope".to_string()];
        let err = Projection::resolve(&schema, Some(&columns)).unwrap_err();
        match err {
            Error::InvalidColumnSelection { column, available } => {
                assert_eq!(column, "nope");
                assert_eq!(available, vec!["id".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn assembles_flat_batch_in_requested_order() {
        let batch = users_batch(1, 3).unwrap();
        let names = ["id", "name", "active", "score", "age", "metadata"];
        let schema = schema(&names);
        let columns = vec!["name".to_string(), "id".to_string()];
        let projection = Projection::resolve(&schema, Some(&columns)).unwrap();
        let projected = batch.project(projection.roots()).unwrap();

        let records = assemble_records(&projected, &projection).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].columns(), ["name", "id"]);
        assert_eq!(records[2].get("name").and_then(Value::as_str), Some("user-3"));
        assert_eq!(records[2].get("id").and_then(Value::as_i64), Some(3));
    }

    #[test]
    fn nulls_and_binary_values() {
        let batch = users_batch(5, 3).unwrap();
        let all = schema(&["id", "name", "active", "score", "age", "metadata"]);
        let projection = Projection::resolve(&all, None).unwrap();
        let records = assemble_records(&batch, &projection).unwrap();

        // id 5: age null; id 7: metadata null.
        assert!(records[0].get("age").unwrap().is_null());
        assert_eq!(records[1].get("age").and_then(Value::as_i64), Some(26));
        assert_eq!(
            records[0].get("metadata").and_then(Value::as_str),
            Some("meta-5")
        );
        assert!(records[2].get("metadata").unwrap().is_null());
        assert_eq!(records[1].get("active").and_then(Value::as_bool), Some(true));
        assert_eq!(records[1].get("score").and_then(Value::as_f64), Some(9.0));
    }

    #[test]
    fn nested_struct_and_list() {
        let batch = nested_batch(4).unwrap();
        let projection = Projection::resolve(&schema(&["id", "address", "tags"]), None).unwrap();
        let records = assemble_records(&batch, &projection).unwrap();

        let address = records[1].get("address").unwrap();
        assert_eq!(address.get("city").and_then(Value::as_str), Some("city-2"));
        assert_eq!(address.get("zip").and_then(Value::as_i64), Some(10_002));
        assert!(records[0].get("address").unwrap().get("zip").unwrap().is_null());

        let tags = records[1].get("tags").and_then(Value::as_list).unwrap();
        assert_eq!(
            tags,
            [Value::from("tag-2-0"), Value::from("tag-2-1")].as_slice()
        );
        assert_eq!(
            records[2].get("tags").and_then(Value::as_list).map(<[Value]>::len),
            Some(0)
        );
        assert!(records[3].get("tags").unwrap().is_null());
    }

    #[test]
    fn map_dictionary_and_temporal_columns() {
        let mut builder = MapBuilder::new(None, StringBuilder::new(), Int32Builder::new());
        builder.keys().append_value("a");
        builder.values().append_value(1);
        builder.append(true).unwrap();
        builder.append(false).unwrap();
        let map: ArrayRef = Arc::new(builder.finish());

        let dict: ArrayRef = Arc::new(
            vec![Some("x"), None, Some("x")]
                .into_iter()
                .collect::<DictionaryArray<Int32Type>>(),
        );
        let dates: ArrayRef = Arc::new(Date32Array::from(vec![Some(0), None]));

        assert_eq!(
            column_values(&map).unwrap(),
            vec![Value::Map(vec![("a".into(), Value::Int(1))]), Value::Null]
        );
        assert_eq!(
            column_values(&dict).unwrap(),
            vec![Value::from("x"), Value::Null, Value::from("x")]
        );
        assert_eq!(
            column_values(&dates).unwrap(),
            vec![Value::from("1970-01-01"), Value::Null]
        );
    }

    #[test]
    fn mismatched_batch_is_internal_error() {
        let schema_arrow = Arc::new(ArrowSchema::new(vec![
            ArrowField::new("id", DataType::Int64, false),
            ArrowField::new("name", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema_arrow,
            vec![
                Arc::new(Int64Array::from(vec![1])),
                Arc::new(StringArray::from(vec!["a"])),
            ],
        )
        .unwrap();
        let projection = Projection::resolve(&schema(&["id"]), None).unwrap();
        assert!(matches!(
            assemble_records(&batch, &projection),
            Err(Error::Internal(_))
        ));
    }
}
