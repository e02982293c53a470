//! SQL type classification driving literal encode/decode dispatch.
//!
//! Reference: https://github.com/postgres/postgres/blob/master/src/include/catalog/pg_type.dat

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map, map_res, opt},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::{CodecError, CodecResult};

/// PostgreSQL type OIDs, as reported in row descriptions.
pub mod oid {
    // Boolean
    pub const BOOL: u32 = 16;

    // Bytes
    pub const BYTEA: u32 = 17;

    // Characters
    pub const NAME: u32 = 19;

    // Integers
    pub const INT8: u32 = 20; // bigint
    pub const INT2: u32 = 21; // smallint
    pub const INT4: u32 = 23; // integer

    // Text
    pub const TEXT: u32 = 25;
    pub const VARCHAR: u32 = 1043;
    pub const BPCHAR: u32 = 1042; // blank-padded char

    // JSON / XML
    pub const JSON: u32 = 114;
    pub const XML: u32 = 142;
    pub const JSONB: u32 = 3802;

    // Geometric
    pub const POINT: u32 = 600;
    pub const LSEG: u32 = 601;
    pub const PATH: u32 = 602;
    pub const BOX: u32 = 603;
    pub const POLYGON: u32 = 604;
    pub const LINE: u32 = 628;
    pub const CIRCLE: u32 = 718;

    // Network
    pub const CIDR: u32 = 650;
    pub const MACADDR: u32 = 829;
    pub const INET: u32 = 869;

    // Float
    pub const FLOAT4: u32 = 700;
    pub const FLOAT8: u32 = 701;

    // Pseudo
    pub const UNKNOWN: u32 = 705;
    pub const RECORD: u32 = 2249;

    // Numeric
    pub const NUMERIC: u32 = 1700;

    // Date/Time
    pub const DATE: u32 = 1082;
    pub const TIME: u32 = 1083;
    pub const TIMESTAMP: u32 = 1114;
    pub const TIMESTAMPTZ: u32 = 1184;
    pub const INTERVAL: u32 = 1186;
    pub const TIMETZ: u32 = 1266;

    // Bit strings
    pub const BIT: u32 = 1560;
    pub const VARBIT: u32 = 1562;

    // UUID
    pub const UUID: u32 = 2950;

    // Ranges
    pub const INT4RANGE: u32 = 3904;
    pub const NUMRANGE: u32 = 3906;
    pub const TSRANGE: u32 = 3908;
    pub const TSTZRANGE: u32 = 3910;
    pub const DATERANGE: u32 = 3912;
    pub const INT8RANGE: u32 = 3926;

    // Arrays
    pub const BOOL_ARRAY: u32 = 1000;
    pub const BYTEA_ARRAY: u32 = 1001;
    pub const INT2_ARRAY: u32 = 1005;
    pub const INT4_ARRAY: u32 = 1007;
    pub const TEXT_ARRAY: u32 = 1009;
    pub const BPCHAR_ARRAY: u32 = 1014;
    pub const VARCHAR_ARRAY: u32 = 1015;
    pub const INT8_ARRAY: u32 = 1016;
    pub const FLOAT4_ARRAY: u32 = 1021;
    pub const FLOAT8_ARRAY: u32 = 1022;
    pub const TIMESTAMP_ARRAY: u32 = 1115;
    pub const DATE_ARRAY: u32 = 1182;
    pub const TIME_ARRAY: u32 = 1183;
    pub const TIMESTAMPTZ_ARRAY: u32 = 1185;
    pub const NUMERIC_ARRAY: u32 = 1231;
    pub const UUID_ARRAY: u32 = 2951;
    pub const JSONB_ARRAY: u32 = 3807;
}

/// Closed classification of target SQL types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlTypeKind {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    Real,
    Double,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Interval,
    Char,
    Varchar,
    Text,
    Name,
    Xml,
    Json,
    Jsonb,
    Uuid,
    Inet,
    Cidr,
    MacAddr,
    Point,
    Line,
    LineSegment,
    Box,
    Path,
    Polygon,
    Circle,
    Int4Range,
    Int8Range,
    NumRange,
    TsRange,
    TstzRange,
    DateRange,
    Bytea,
    Bit,
    VarBit,
    Record,
    Unknown,
}

/// Broad grouping of kinds that share an encoding rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Boolean,
    Integer,
    Numeric,
    Float,
    Temporal,
    /// Quoted through the string escaper.
    Quoted,
    Binary,
    BitString,
    Record,
    Unknown,
}

impl SqlTypeKind {
    pub const ALL: [SqlTypeKind; 42] = [
        Self::Boolean,
        Self::SmallInt,
        Self::Integer,
        Self::BigInt,
        Self::Numeric,
        Self::Real,
        Self::Double,
        Self::Date,
        Self::Time,
        Self::TimeTz,
        Self::Timestamp,
        Self::TimestampTz,
        Self::Interval,
        Self::Char,
        Self::Varchar,
        Self::Text,
        Self::Name,
        Self::Xml,
        Self::Json,
        Self::Jsonb,
        Self::Uuid,
        Self::Inet,
        Self::Cidr,
        Self::MacAddr,
        Self::Point,
        Self::Line,
        Self::LineSegment,
        Self::Box,
        Self::Path,
        Self::Polygon,
        Self::Circle,
        Self::Int4Range,
        Self::Int8Range,
        Self::NumRange,
        Self::TsRange,
        Self::TstzRange,
        Self::DateRange,
        Self::Bytea,
        Self::Bit,
        Self::VarBit,
        Self::Record,
        Self::Unknown,
    ];

    /// Canonical PostgreSQL type name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "bool",
            Self::SmallInt => "int2",
            Self::Integer => "int4",
            Self::BigInt => "int8",
            Self::Numeric => "numeric",
            Self::Real => "float4",
            Self::Double => "float8",
            Self::Date => "date",
            Self::Time => "time",
            Self::TimeTz => "timetz",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
            Self::Interval => "interval",
            Self::Char => "bpchar",
            Self::Varchar => "varchar",
            Self::Text => "text",
            Self::Name => "name",
            Self::Xml => "xml",
            Self::Json => "json",
            Self::Jsonb => "jsonb",
            Self::Uuid => "uuid",
            Self::Inet => "inet",
            Self::Cidr => "cidr",
            Self::MacAddr => "macaddr",
            Self::Point => "point",
            Self::Line => "line",
            Self::LineSegment => "lseg",
            Self::Box => "box",
            Self::Path => "path",
            Self::Polygon => "polygon",
            Self::Circle => "circle",
            Self::Int4Range => "int4range",
            Self::Int8Range => "int8range",
            Self::NumRange => "numrange",
            Self::TsRange => "tsrange",
            Self::TstzRange => "tstzrange",
            Self::DateRange => "daterange",
            Self::Bytea => "bytea",
            Self::Bit => "bit",
            Self::VarBit => "varbit",
            Self::Record => "record",
            Self::Unknown => "unknown",
        }
    }

    pub fn oid(self) -> u32 {
        match self {
            Self::Boolean => oid::BOOL,
            Self::SmallInt => oid::INT2,
            Self::Integer => oid::INT4,
            Self::BigInt => oid::INT8,
            Self::Numeric => oid::NUMERIC,
            Self::Real => oid::FLOAT4,
            Self::Double => oid::FLOAT8,
            Self::Date => oid::DATE,
            Self::Time => oid::TIME,
            Self::TimeTz => oid::TIMETZ,
            Self::Timestamp => oid::TIMESTAMP,
            Self::TimestampTz => oid::TIMESTAMPTZ,
            Self::Interval => oid::INTERVAL,
            Self::Char => oid::BPCHAR,
            Self::Varchar => oid::VARCHAR,
            Self::Text => oid::TEXT,
            Self::Name => oid::NAME,
            Self::Xml => oid::XML,
            Self::Json => oid::JSON,
            Self::Jsonb => oid::JSONB,
            Self::Uuid => oid::UUID,
            Self::Inet => oid::INET,
            Self::Cidr => oid::CIDR,
            Self::MacAddr => oid::MACADDR,
            Self::Point => oid::POINT,
            Self::Line => oid::LINE,
            Self::LineSegment => oid::LSEG,
            Self::Box => oid::BOX,
            Self::Path => oid::PATH,
            Self::Polygon => oid::POLYGON,
            Self::Circle => oid::CIRCLE,
            Self::Int4Range => oid::INT4RANGE,
            Self::Int8Range => oid::INT8RANGE,
            Self::NumRange => oid::NUMRANGE,
            Self::TsRange => oid::TSRANGE,
            Self::TstzRange => oid::TSTZRANGE,
            Self::DateRange => oid::DATERANGE,
            Self::Bytea => oid::BYTEA,
            Self::Bit => oid::BIT,
            Self::VarBit => oid::VARBIT,
            Self::Record => oid::RECORD,
            Self::Unknown => oid::UNKNOWN,
        }
    }

    /// Map a scalar type OID back to its kind.
    pub fn from_oid(oid: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.oid() == oid)
    }

    /// Element kind of a known array type OID.
    pub fn from_array_oid(array_oid: u32) -> Option<Self> {
        let kind = match array_oid {
            oid::BOOL_ARRAY => Self::Boolean,
            oid::BYTEA_ARRAY => Self::Bytea,
            oid::INT2_ARRAY => Self::SmallInt,
            oid::INT4_ARRAY => Self::Integer,
            oid::INT8_ARRAY => Self::BigInt,
            oid::TEXT_ARRAY => Self::Text,
            oid::BPCHAR_ARRAY => Self::Char,
            oid::VARCHAR_ARRAY => Self::Varchar,
            oid::FLOAT4_ARRAY => Self::Real,
            oid::FLOAT8_ARRAY => Self::Double,
            oid::TIMESTAMP_ARRAY => Self::Timestamp,
            oid::DATE_ARRAY => Self::Date,
            oid::TIME_ARRAY => Self::Time,
            oid::TIMESTAMPTZ_ARRAY => Self::TimestampTz,
            oid::NUMERIC_ARRAY => Self::Numeric,
            oid::UUID_ARRAY => Self::Uuid,
            oid::JSONB_ARRAY => Self::Jsonb,
            _ => return None,
        };
        Some(kind)
    }

    pub fn category(self) -> TypeCategory {
        match self {
            Self::Boolean => TypeCategory::Boolean,
            Self::SmallInt | Self::Integer | Self::BigInt => TypeCategory::Integer,
            Self::Numeric => TypeCategory::Numeric,
            Self::Real | Self::Double => TypeCategory::Float,
            Self::Date | Self::Time | Self::TimeTz | Self::Timestamp | Self::TimestampTz => {
                TypeCategory::Temporal
            }
            Self::Interval
            | Self::Char
            | Self::Varchar
            | Self::Text
            | Self::Name
            | Self::Xml
            | Self::Json
            | Self::Jsonb
            | Self::Uuid
            | Self::Inet
            | Self::Cidr
            | Self::MacAddr
            | Self::Point
            | Self::Line
            | Self::LineSegment
            | Self::Box
            | Self::Path
            | Self::Polygon
            | Self::Circle
            | Self::Int4Range
            | Self::Int8Range
            | Self::NumRange
            | Self::TsRange
            | Self::TstzRange
            | Self::DateRange => TypeCategory::Quoted,
            Self::Bytea => TypeCategory::Binary,
            Self::Bit | Self::VarBit => TypeCategory::BitString,
            Self::Record => TypeCategory::Record,
            Self::Unknown => TypeCategory::Unknown,
        }
    }

    /// Bare keyword placed before a quoted temporal literal.
    pub fn temporal_keyword(self) -> Option<&'static str> {
        match self {
            Self::Date => Some("DATE"),
            Self::Time => Some("TIME"),
            Self::TimeTz => Some("TIMETZ"),
            Self::Timestamp => Some("TIMESTAMP"),
            Self::TimestampTz => Some("TIMESTAMPTZ"),
            _ => None,
        }
    }

    /// Whether the kind accepts a `(length)` modifier.
    pub fn has_length(self) -> bool {
        matches!(self, Self::Char | Self::Varchar | Self::Bit | Self::VarBit)
    }
}

impl std::fmt::Display for SqlTypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SqlTypeKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase();
        let kind = match normalized.as_str() {
            "bool" | "boolean" => Self::Boolean,
            "int2" | "smallint" => Self::SmallInt,
            "int4" | "int" | "integer" => Self::Integer,
            "int8" | "bigint" => Self::BigInt,
            "numeric" | "decimal" => Self::Numeric,
            "float4" | "real" => Self::Real,
            "float8" | "double" | "double precision" => Self::Double,
            "date" => Self::Date,
            "time" | "time without time zone" => Self::Time,
            "timetz" | "time with time zone" => Self::TimeTz,
            "timestamp" | "timestamp without time zone" => Self::Timestamp,
            "timestamptz" | "timestamp with time zone" => Self::TimestampTz,
            "interval" => Self::Interval,
            "char" | "bpchar" | "character" => Self::Char,
            "varchar" | "character varying" => Self::Varchar,
            "text" => Self::Text,
            "name" => Self::Name,
            "xml" => Self::Xml,
            "json" => Self::Json,
            "jsonb" => Self::Jsonb,
            "uuid" => Self::Uuid,
            "inet" => Self::Inet,
            "cidr" => Self::Cidr,
            "macaddr" => Self::MacAddr,
            "point" => Self::Point,
            "line" => Self::Line,
            "lseg" => Self::LineSegment,
            "box" => Self::Box,
            "path" => Self::Path,
            "polygon" => Self::Polygon,
            "circle" => Self::Circle,
            "int4range" => Self::Int4Range,
            "int8range" => Self::Int8Range,
            "numrange" => Self::NumRange,
            "tsrange" => Self::TsRange,
            "tstzrange" => Self::TstzRange,
            "daterange" => Self::DateRange,
            "bytea" => Self::Bytea,
            "bit" => Self::Bit,
            "varbit" | "bit varying" => Self::VarBit,
            "record" => Self::Record,
            "unknown" => Self::Unknown,
            _ => return Err(CodecError::invalid(format!("unknown type name '{}'", s.trim()))),
        };
        Ok(kind)
    }
}

// ==================== Declared Types ====================

/// Upper bound on NUMERIC precision and scale.
pub const NUMERIC_MAX_PRECISION: u32 = 1000;

/// Upper bound on a character or bit length modifier.
pub const MAX_LENGTH: u32 = 10_485_760;

/// A kind plus the modifiers declared for it in DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SqlType {
    kind: SqlTypeKind,
    precision: Option<u32>,
    scale: Option<u32>,
    length: Option<u32>,
}

impl SqlType {
    /// A type without modifiers.
    pub fn new(kind: SqlTypeKind) -> Self {
        Self {
            kind,
            precision: None,
            scale: None,
            length: None,
        }
    }

    /// `numeric(precision, scale)`.
    pub fn numeric(precision: u32, scale: u32) -> CodecResult<Self> {
        if !(1..=NUMERIC_MAX_PRECISION).contains(&precision) {
            return Err(CodecError::range(format!(
                "NUMERIC precision {} must be between 1 and {}",
                precision, NUMERIC_MAX_PRECISION
            )));
        }
        if scale > NUMERIC_MAX_PRECISION {
            return Err(CodecError::range(format!(
                "NUMERIC scale {} must be between 0 and {}",
                scale, NUMERIC_MAX_PRECISION
            )));
        }
        Ok(Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::new(SqlTypeKind::Numeric)
        })
    }

    /// A length-modified type such as `varchar(32)` or `bit(8)`.
    pub fn with_length(kind: SqlTypeKind, length: u32) -> CodecResult<Self> {
        if !kind.has_length() {
            return Err(CodecError::invalid(format!(
                "type {} does not take a length",
                kind
            )));
        }
        if !(1..=MAX_LENGTH).contains(&length) {
            return Err(CodecError::range(format!(
                "length for type {} must be between 1 and {}",
                kind, MAX_LENGTH
            )));
        }
        Ok(Self {
            length: Some(length),
            ..Self::new(kind)
        })
    }

    pub fn kind(&self) -> SqlTypeKind {
        self.kind
    }

    pub fn precision(&self) -> Option<u32> {
        self.precision
    }

    pub fn scale(&self) -> Option<u32> {
        self.scale
    }

    pub fn length(&self) -> Option<u32> {
        self.length
    }

    /// DDL spelling, e.g. `numeric(10,2)` or `char(3)`.
    pub fn ddl(&self) -> String {
        let base = match self.kind {
            SqlTypeKind::Char => "char",
            other => other.name(),
        };
        match (self.precision, self.scale, self.length) {
            (Some(p), Some(0), _) => format!("{}({})", base, p),
            (Some(p), Some(s), _) => format!("{}({},{})", base, p, s),
            (_, _, Some(n)) => format!("{}({})", base, n),
            _ => base.to_string(),
        }
    }
}

impl From<SqlTypeKind> for SqlType {
    fn from(kind: SqlTypeKind) -> Self {
        Self::new(kind)
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.ddl())
    }
}

impl std::str::FromStr for SqlType {
    type Err = CodecError;

    /// Parse `name`, `name(n)` or `name(p,s)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, (name, modifiers)) = all_consuming(type_spec)(s.trim())
            .map_err(|_| CodecError::invalid(format!("malformed type '{}'", s.trim())))?;
        let kind: SqlTypeKind = name.parse()?;
        match (kind, modifiers.as_deref()) {
            (_, None) => Ok(Self::new(kind)),
            (SqlTypeKind::Numeric, Some([p])) => Self::numeric(*p, 0),
            (SqlTypeKind::Numeric, Some([p, s])) => Self::numeric(*p, *s),
            (k, Some([n])) if k.has_length() => Self::with_length(k, *n),
            _ => Err(CodecError::invalid(format!(
                "invalid type modifiers for {}",
                kind
            ))),
        }
    }
}

/// Type name (possibly several words) followed by optional `(a[,b])`.
fn type_spec(input: &str) -> IResult<&str, (String, Option<Vec<u32>>)> {
    tuple((
        map(
            separated_list1(
                char(' '),
                take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            ),
            |words: Vec<&str>| words.join(" "),
        ),
        opt(preceded(
            multispace0,
            delimited(
                pair(char('('), multispace0),
                separated_list1(
                    delimited(multispace0, char(','), multispace0),
                    map_res(digit1, |d: &str| d.parse::<u32>()),
                ),
                pair(multispace0, char(')')),
            ),
        )),
    ))(input)
}
