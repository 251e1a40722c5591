//! Core type definitions for the Parquet access layer.

use parquet::basic::{LogicalType, Repetition as ParquetRepetition, TimeUnit, Type as ParquetType};
use parquet::schema::types::Type;
use serde::Serialize;

/// Identifier of an opened file handle.
///
/// Assigned by the registry on open; distinct handles for the same path (across a
/// `close()` and reopen) receive distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandleId(pub u64);

impl From<u64> for HandleId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<HandleId> for u64 {
    fn from(id: HandleId) -> Self {
        id.0
    }
}

/// How often a field may occur within its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Repetition {
    Required,
    Optional,
    Repeated,
}

impl From<ParquetRepetition> for Repetition {
    fn from(repetition: ParquetRepetition) -> Self {
        match repetition {
            ParquetRepetition::REQUIRED => Repetition::Required,
            ParquetRepetition::OPTIONAL => Repetition::Optional,
            ParquetRepetition::REPEATED => Repetition::Repeated,
        }
    }
}

/// Physical storage type of a leaf column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    ByteArray,
    FixedLenByteArray,
}

impl From<ParquetType> for PhysicalType {
    fn from(physical: ParquetType) -> Self {
        match physical {
            ParquetType::BOOLEAN => PhysicalType::Boolean,
            ParquetType::INT32 => PhysicalType::Int32,
            ParquetType::INT64 => PhysicalType::Int64,
            ParquetType::INT96 => PhysicalType::Int96,
            ParquetType::FLOAT => PhysicalType::Float,
            ParquetType::DOUBLE => PhysicalType::Double,
            ParquetType::BYTE_ARRAY => PhysicalType::ByteArray,
            ParquetType::FIXED_LEN_BYTE_ARRAY => PhysicalType::FixedLenByteArray,
        }
    }
}

/// One node of the schema tree.
///
/// Leaves carry a [`PhysicalType`]; groups carry `children`. Names are unique
/// among siblings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    /// `None` for groups.
    pub physical_type: Option<PhysicalType>,
    /// Byte width of `FIXED_LEN_BYTE_ARRAY` leaves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_length: Option<i32>,
    pub logical_type: Option<String>,
    pub repetition: Repetition,
    /// Zero for top-level fields.
    pub depth: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Field>,
}

impl Field {
    pub(crate) fn from_parquet(node: &Type, depth: usize) -> Self {
        let info = node.get_basic_info();
        let repetition = if info.has_repetition() {
            info.repetition().into()
        } else {
            Repetition::Required
        };
        let logical_type = info
            .logical_type()
            .map(|logical| describe_logical_type(&logical))
            .or_else(|| match info.converted_type() {
                parquet::basic::ConvertedType::NONE => None,
                converted => Some(format!("{converted:?}")),
            });

        match node {
            Type::PrimitiveType {
                physical_type,
                type_length,
                ..
            } => Field {
                name: node.name().to_string(),
                physical_type: Some((*physical_type).into()),
                type_length: (*physical_type == ParquetType::FIXED_LEN_BYTE_ARRAY)
                    .then_some(*type_length),
                logical_type,
                repetition,
                depth,
                children: Vec::new(),
            },
            Type::GroupType { fields, .. } => Field {
                name: node.name().to_string(),
                physical_type: None,
                type_length: None,
                logical_type,
                repetition,
                depth,
                children: fields
                    .iter()
                    .map(|child| Field::from_parquet(child, depth + 1))
                    .collect(),
            },
        }
    }

    pub fn is_group(&self) -> bool {
        self.physical_type.is_none()
    }

    pub fn optional(&self) -> bool {
        self.repetition == Repetition::Optional
    }

    pub fn repeated(&self) -> bool {
        self.repetition == Repetition::Repeated
    }

    /// Find a direct child by name.
    pub fn child(&self, name: &str) -> Option<&Field> {
        self.children.iter().find(|child| child.name == name)
    }
}

/// Ordered tree of top-level fields, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub(crate) fn from_parquet(root: &Type) -> Self {
        Schema {
            fields: root
                .get_fields()
                .iter()
                .map(|field| Field::from_parquet(field, 0))
                .collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Return the first name that occurs twice among siblings, with its parent path.
    pub(crate) fn find_duplicate_name(&self) -> Option<String> {
        fn scan(fields: &[Field], parent: &str) -> Option<String> {
            let mut seen = rustc_hash::FxHashSet::default();
            for field in fields {
                if !seen.insert(field.name.as_str()) {
                    return Some(if parent.is_empty() {
                        field.name.clone()
                    } else {
                        format!("{parent}.{}", field.name)
                    });
                }
            }
            fields.iter().find_map(|field| {
                let path = if parent.is_empty() {
                    field.name.clone()
                } else {
                    format!("{parent}.{}", field.name)
                };
                scan(&field.children, &path)
            })
        }
        scan(&self.fields, "")
    }
}

/// Location and encoding of one column chunk inside a row group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnChunkInfo {
    /// Dotted path from the root, e.g. `address.city`.
    pub path: String,
    pub physical_type: PhysicalType,
    pub compression: String,
    pub encodings: Vec<String>,
    /// Byte offset of the first page (dictionary page when present).
    pub data_offset: u64,
    pub compressed_size: u64,
    pub num_values: u64,
    pub null_count: Option<u64>,
}

/// Row counts and column-chunk index of one row group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowGroupInfo {
    pub index: usize,
    pub num_rows: u64,
    /// Global index of the first row of this group.
    pub first_row: u64,
    pub num_columns: usize,
    pub total_byte_size: u64,
    pub columns: Vec<ColumnChunkInfo>,
}

/// File-level summary derived entirely from the footer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub num_rows: u64,
    /// Number of top-level fields.
    pub num_columns: usize,
    pub num_row_groups: usize,
    pub file_size: u64,
    pub format_version: i32,
    pub created_by: Option<String>,
    pub schema: Schema,
    pub row_groups: Vec<RowGroupInfo>,
}

/// Per-call read configuration.
///
/// The defaults read every column of every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Top-level fields to project. `None` or an empty list selects all of them.
    pub columns: Option<Vec<String>>,
    /// Maximum number of rows to materialize.
    pub row_limit: Option<usize>,
    /// Rows to skip from the start of the file before `row_limit` applies.
    pub skip_rows: usize,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_row_limit(mut self, limit: usize) -> Self {
        self.row_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_skip_rows(mut self, skip: usize) -> Self {
        self.skip_rows = skip;
        self
    }
}

/// Render a logical type annotation the way schema listings show it.
pub(crate) fn describe_logical_type(logical: &LogicalType) -> String {
    fn unit(unit: &TimeUnit) -> &'static str {
        match unit {
            TimeUnit::MILLIS(_) => "MILLIS",
            TimeUnit::MICROS(_) => "MICROS",
            TimeUnit::NANOS(_) => "NANOS",
        }
    }

    match logical {
        LogicalType::String => "STRING".to_string(),
        LogicalType::Map => "MAP".to_string(),
        LogicalType::List => "LIST".to_string(),
        LogicalType::Enum => "ENUM".to_string(),
        LogicalType::Date => "DATE".to_string(),
        LogicalType::Json => "JSON".to_string(),
        LogicalType::Bson => "BSON".to_string(),
        LogicalType::Uuid => "UUID".to_string(),
        LogicalType::Float16 => "FLOAT16".to_string(),
        LogicalType::Unknown => "UNKNOWN".to_string(),
        LogicalType::Decimal { scale, precision } => format!("DECIMAL({precision},{scale})"),
        LogicalType::Integer {
            bit_width,
            is_signed,
        } => format!("INT({bit_width},{is_signed})"),
        LogicalType::Time {
            is_adjusted_to_u_t_c,
            unit: time_unit,
        } => format!(
            "TIME({},{})",
            unit(time_unit),
            if *is_adjusted_to_u_t_c { "utc" } else { "local" }
        ),
        LogicalType::Timestamp {
            is_adjusted_to_u_t_c,
            unit: time_unit,
        } => format!(
            "TIMESTAMP({},{})",
            unit(time_unit),
            if *is_adjusted_to_u_t_c { "utc" } else { "local" }
        ),
        #[allow(unreachable_patterns)]
        other => format!("{other:?}").to_uppercase(),
    }
}
