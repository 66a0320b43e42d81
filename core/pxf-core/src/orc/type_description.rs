//! ORC type descriptions: categories, nested children and the ORC type string.
//!
//! ```text
//! struct<id:int,amt:decimal(38,10),tags:array<varchar(20)>>
//! ```

use crate::decimal::{SYSTEM_DEFAULT_PRECISION, SYSTEM_DEFAULT_SCALE};
use crate::error::{PxfError, PxfResult};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_LENGTH: u32 = 256;
pub const DEFAULT_PRECISION: u8 = SYSTEM_DEFAULT_PRECISION;
pub const DEFAULT_SCALE: u8 = SYSTEM_DEFAULT_SCALE;
pub const MAX_PRECISION: u8 = 38;

/// ORC type category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Date,
    Timestamp,
    Binary,
    Decimal,
    Varchar,
    Char,
    List,
    Map,
    Struct,
    Union,
    TimestampInstant,
}

impl Category {
    const ALL: [Category; 19] = [
        Category::Boolean,
        Category::Byte,
        Category::Short,
        Category::Int,
        Category::Long,
        Category::Float,
        Category::Double,
        Category::String,
        Category::Date,
        Category::Timestamp,
        Category::Binary,
        Category::Decimal,
        Category::Varchar,
        Category::Char,
        Category::List,
        Category::Map,
        Category::Struct,
        Category::Union,
        Category::TimestampInstant,
    ];

    /// Name used in ORC type strings.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Boolean => "boolean",
            Category::Byte => "tinyint",
            Category::Short => "smallint",
            Category::Int => "int",
            Category::Long => "bigint",
            Category::Float => "float",
            Category::Double => "double",
            Category::String => "string",
            Category::Date => "date",
            Category::Timestamp => "timestamp",
            Category::Binary => "binary",
            Category::Decimal => "decimal",
            Category::Varchar => "varchar",
            Category::Char => "char",
            Category::List => "array",
            Category::Map => "map",
            Category::Struct => "struct",
            Category::Union => "uniontype",
            Category::TimestampInstant => "timestamp with local time zone",
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            Category::List | Category::Map | Category::Struct | Category::Union
        )
    }

    fn from_name(name: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// Upper-case tag, as used in error messages (`INT`, `LIST`, `TIMESTAMP_INSTANT`).
impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Category::Boolean => "BOOLEAN",
            Category::Byte => "BYTE",
            Category::Short => "SHORT",
            Category::Int => "INT",
            Category::Long => "LONG",
            Category::Float => "FLOAT",
            Category::Double => "DOUBLE",
            Category::String => "STRING",
            Category::Date => "DATE",
            Category::Timestamp => "TIMESTAMP",
            Category::Binary => "BINARY",
            Category::Decimal => "DECIMAL",
            Category::Varchar => "VARCHAR",
            Category::Char => "CHAR",
            Category::List => "LIST",
            Category::Map => "MAP",
            Category::Struct => "STRUCT",
            Category::Union => "UNION",
            Category::TimestampInstant => "TIMESTAMP_INSTANT",
        };
        f.write_str(tag)
    }
}

/// A (possibly nested) ORC type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescription {
    category: Category,
    children: Vec<TypeDescription>,
    field_names: Vec<String>,
    max_length: u32,
    precision: u8,
    scale: u8,
}

impl TypeDescription {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            children: Vec::new(),
            field_names: Vec::new(),
            max_length: DEFAULT_LENGTH,
            precision: DEFAULT_PRECISION,
            scale: DEFAULT_SCALE,
        }
    }

    pub fn create_struct() -> Self {
        Self::new(Category::Struct)
    }

    pub fn create_list(child: TypeDescription) -> Self {
        let mut list = Self::new(Category::List);
        list.children.push(child);
        list
    }

    pub fn create_map(key: TypeDescription, value: TypeDescription) -> Self {
        let mut map = Self::new(Category::Map);
        map.children.push(key);
        map.children.push(value);
        map
    }

    pub fn create_union(options: Vec<TypeDescription>) -> Self {
        let mut union = Self::new(Category::Union);
        union.children = options;
        union
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_precision(mut self, precision: u8) -> PxfResult<Self> {
        if precision < 1 || precision > MAX_PRECISION || self.scale > precision {
            return Err(PxfError::InvalidArguments(format!(
                "precision {} is out of range 1 .. {} (scale {})",
                precision, MAX_PRECISION, self.scale
            )));
        }
        self.precision = precision;
        Ok(self)
    }

    pub fn with_scale(mut self, scale: u8) -> PxfResult<Self> {
        if scale > self.precision {
            return Err(PxfError::InvalidArguments(format!(
                "scale is out of range at {}",
                scale
            )));
        }
        self.scale = scale;
        Ok(self)
    }

    /// Append a field to a struct.
    pub fn add_field(&mut self, name: impl Into<String>, field_type: TypeDescription) -> &mut Self {
        self.field_names.push(name.into());
        self.children.push(field_type);
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn children(&self) -> &[TypeDescription] {
        &self.children
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn max_length(&self) -> u32 {
        self.max_length
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Struct field by exact name.
    pub fn find_field(&self, name: &str) -> Option<(usize, &TypeDescription)> {
        self.field_names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.children.get(i).map(|t| (i, t)))
    }

    /// Element type of a list.
    pub fn element(&self) -> Option<&TypeDescription> {
        match self.category {
            Category::List => self.children.first(),
            _ => None,
        }
    }
}

fn needs_quoting(name: &str) -> bool {
    name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for TypeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category {
            Category::Decimal => write!(f, "decimal({},{})", self.precision, self.scale),
            Category::Char | Category::Varchar => {
                write!(f, "{}({})", self.category.name(), self.max_length)
            }
            Category::List | Category::Map | Category::Union => {
                write!(f, "{}<", self.category.name())?;
                for (i, child) in self.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(">")
            }
            Category::Struct => {
                f.write_str("struct<")?;
                for (i, (name, child)) in self.field_names.iter().zip(&self.children).enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if needs_quoting(name) {
                        write!(f, "`{}`:{}", name.replace('`', "``"), child)?;
                    } else {
                        write!(f, "{}:{}", name, child)?;
                    }
                }
                f.write_str(">")
            }
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for TypeDescription {
    type Err = PxfError;

    fn from_str(text: &str) -> PxfResult<Self> {
        let mut parser = TypeParser { text, pos: 0 };
        let parsed = parser.parse_type()?;
        if parser.pos != text.len() {
            return Err(parser.error("extra characters"));
        }
        Ok(parsed)
    }
}

struct TypeParser<'a> {
    text: &'a str,
    pos: usize,
}

impl TypeParser<'_> {
    fn error(&self, what: &str) -> PxfError {
        PxfError::InvalidArguments(format!(
            "Error parsing ORC type '{}' at {}: {}",
            self.text, self.pos, what
        ))
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn expect(&mut self, c: char) -> PxfResult<()> {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", c)))
        }
    }

    fn word(&mut self) -> &str {
        let start = self.pos;
        let rest = &self.text[start..];
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == ' '))
            .unwrap_or(rest.len());
        // "timestamp with local time zone" is the only type name with spaces
        let candidate = &rest[..len];
        let taken = if candidate.starts_with(Category::TimestampInstant.name()) {
            Category::TimestampInstant.name().len()
        } else {
            candidate.find(' ').unwrap_or(len)
        };
        self.pos += taken;
        &self.text[start..start + taken]
    }

    fn number(&mut self) -> PxfResult<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        self.text[start..self.pos]
            .parse()
            .map_err(|_| self.error("expected a number"))
    }

    fn field_name(&mut self) -> PxfResult<String> {
        if self.peek() == Some('`') {
            self.pos += 1;
            let mut name = String::new();
            loop {
                match self.peek() {
                    Some('`') => {
                        self.pos += 1;
                        if self.peek() == Some('`') {
                            name.push('`');
                            self.pos += 1;
                        } else {
                            return Ok(name);
                        }
                    }
                    Some(c) => {
                        name.push(c);
                        self.pos += c.len_utf8();
                    }
                    None => return Err(self.error("unterminated quoted name")),
                }
            }
        }
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ':') {
            self.pos += self.peek().map_or(1, char::len_utf8);
        }
        if start == self.pos {
            return Err(self.error("empty field name"));
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn parse_type(&mut self) -> PxfResult<TypeDescription> {
        let name = self.word().to_ascii_lowercase();
        let category = Category::from_name(&name)
            .ok_or_else(|| self.error(&format!("unknown type '{}'", name)))?;
        let mut result = TypeDescription::new(category);
        match category {
            Category::Char | Category::Varchar => {
                self.expect('(')?;
                result.max_length = self.number()?;
                self.expect(')')?;
            }
            Category::Decimal => {
                if self.peek() == Some('(') {
                    self.pos += 1;
                    let precision = self.number()?;
                    let scale = if self.peek() == Some(',') {
                        self.pos += 1;
                        self.number()?
                    } else {
                        0
                    };
                    self.expect(')')?;
                    let precision =
                        u8::try_from(precision).map_err(|_| self.error("precision out of range"))?;
                    let scale = u8::try_from(scale).map_err(|_| self.error("scale out of range"))?;
                    result = result.with_scale(0)?.with_precision(precision)?.with_scale(scale)?;
                }
            }
            Category::List | Category::Map | Category::Union => {
                self.expect('<')?;
                loop {
                    result.children.push(self.parse_type()?);
                    if self.peek() == Some(',') {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                self.expect('>')?;
                let expected = match category {
                    Category::List => Some(1),
                    Category::Map => Some(2),
                    _ => None,
                };
                if expected.is_some_and(|n| n != result.children.len()) {
                    return Err(self.error("wrong number of type arguments"));
                }
            }
            Category::Struct => {
                self.expect('<')?;
                if self.peek() != Some('>') {
                    loop {
                        let field = self.field_name()?;
                        self.expect(':')?;
                        let child = self.parse_type()?;
                        result.add_field(field, child);
                        if self.peek() == Some(',') {
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                }
                self.expect('>')?;
            }
            _ => {}
        }
        Ok(result)
    }
}
