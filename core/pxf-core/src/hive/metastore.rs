//! Hive metastore client interface and an in-memory metastore.
//!
//! 메모리 구현은 테스트와 임베디드 사용을 위한 것으로, 파티션 필터 문자열
//! (`(fmt = "rc1" AND prt = "a")`)을 직접 해석해 파티션을 고릅니다.

use crate::error::{PxfError, PxfResult};
use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Database used when a table name carries no database part.
pub const DEFAULT_DATABASE_NAME: &str = "default";

const WILDCARD: char = '*';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    /// Hive type name, e.g. `string`, `int`, `decimal(10,2)`
    pub type_name: String,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableType {
    Managed,
    External,
    VirtualView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub db_name: String,
    pub table_name: String,
    pub table_type: TableType,
    pub columns: Vec<FieldSchema>,
    pub partition_keys: Vec<FieldSchema>,
    /// Directory holding the data of an unpartitioned table
    pub location: String,
}

impl Table {
    pub fn new(db_name: impl Into<String>, table_name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            table_name: table_name.into(),
            table_type: TableType::Managed,
            columns: Vec::new(),
            partition_keys: Vec::new(),
            location: location.into(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<FieldSchema>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_partition_keys(mut self, keys: Vec<FieldSchema>) -> Self {
        self.partition_keys = keys;
        self
    }

    pub fn with_table_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// One value per partition key, in key order
    pub values: Vec<String>,
    pub location: String,
}

impl Partition {
    pub fn new<I, S>(values: I, location: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            location: location.into(),
        }
    }
}

/// Operations the fragmenter needs from a metastore.
///
/// `max` limits the number of partitions returned; `None` returns all.
pub trait MetastoreClient: Send + Sync {
    fn get_table(&self, db_name: &str, table_name: &str) -> PxfResult<Table>;

    fn list_partitions(
        &self,
        db_name: &str,
        table_name: &str,
        max: Option<usize>,
    ) -> PxfResult<Vec<Partition>>;

    /// Partitions matching a filter such as `(fmt = "rc1" AND prt = "a")`.
    fn list_partitions_by_filter(
        &self,
        db_name: &str,
        table_name: &str,
        filter: &str,
        max: Option<usize>,
    ) -> PxfResult<Vec<Partition>>;

    /// Database names matching a pattern (`*` wildcard, `|` alternatives).
    fn get_databases(&self, pattern: &str) -> PxfResult<Vec<String>>;

    fn get_tables(&self, db_name: &str, pattern: &str) -> PxfResult<Vec<String>>;
}

/// `db.table` pair naming one Hive table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    pub db_name: String,
    pub table_name: String,
}

impl TableName {
    pub fn new(db_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            table_name: table_name.into(),
        }
    }
}

/// Table named by `table` or `db.table`.
pub fn extract_table_from_name(qualified_name: &str) -> PxfResult<TableName> {
    extract_tables_from_pattern(None, qualified_name)?
        .into_iter()
        .next()
        .ok_or_else(|| PxfError::InvalidArguments("No tables found".to_string()))
}

/// Tables matching `table_pattern` or `db_pattern.table_pattern`.
///
/// Without a client, or without wildcards, the pattern itself names the table.
pub fn extract_tables_from_pattern(
    client: Option<&dyn MetastoreClient>,
    pattern: &str,
) -> PxfResult<Vec<TableName>> {
    let invalid = |what: String| {
        PxfError::InvalidArguments(format!(
            "{} is not a valid Hive table name. Should be either <table_name> or <db_name.table_name>",
            what
        ))
    };
    if pattern.trim().is_empty() {
        return Err(invalid("empty string".to_string()));
    }

    let tokens: Vec<&str> = pattern
        .split('.')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();
    let (db_pattern, table_pattern) = match tokens.as_slice() {
        [table] => (DEFAULT_DATABASE_NAME, *table),
        [db, table] => (*db, *table),
        _ => return Err(invalid(format!("\"{}\"", pattern))),
    };

    let client = match client {
        Some(client) if db_pattern.contains(WILDCARD) || table_pattern.contains(WILDCARD) => client,
        _ => return Ok(vec![TableName::new(db_pattern, table_pattern)]),
    };

    let databases = client.get_databases(db_pattern)?;
    if databases.is_empty() {
        warn!("No database found for the given pattern: {}", db_pattern);
        return Ok(Vec::new());
    }
    let mut tables = Vec::new();
    for db_name in databases {
        for table_name in client.get_tables(&db_name, table_pattern)? {
            tables.push(TableName::new(db_name.clone(), table_name));
        }
    }
    Ok(tables)
}

/// Case-insensitive match of a metastore pattern: `*` is any run of
/// characters and `|` separates alternatives.
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    let name: Vec<char> = name.to_lowercase().chars().collect();
    pattern.split('|').any(|alternative| {
        let alternative: Vec<char> = alternative.trim().to_lowercase().chars().collect();
        glob(&alternative, &name)
    })
}

fn glob(pattern: &[char], name: &[char]) -> bool {
    // greedy star with backtracking to the last star
    let (mut p, mut n) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && pattern[p] == WILDCARD {
            star = Some((p, n));
            p += 1;
        } else if p < pattern.len() && pattern[p] == name[n] {
            p += 1;
            n += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == WILDCARD)
}

// ── In-memory metastore ──

struct TableEntry {
    table: Table,
    partitions: Vec<Partition>,
}

/// Metastore kept in process memory.
#[derive(Default)]
pub struct InMemoryMetastore {
    databases: RwLock<AHashMap<String, AHashMap<String, TableEntry>>>,
}

impl InMemoryMetastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_database(&self, db_name: &str) {
        self.databases
            .write()
            .entry(db_name.to_lowercase())
            .or_default();
    }

    /// Register a table, creating its database when needed. Replaces an
    /// existing table of the same name together with its partitions.
    pub fn create_table(&self, table: Table) {
        let mut databases = self.databases.write();
        let tables = databases.entry(table.db_name.to_lowercase()).or_default();
        debug!(db = %table.db_name, table = %table.table_name, "registered table");
        tables.insert(
            table.table_name.to_lowercase(),
            TableEntry {
                table,
                partitions: Vec::new(),
            },
        );
    }

    pub fn add_partition(&self, db_name: &str, table_name: &str, partition: Partition) -> PxfResult<()> {
        let mut databases = self.databases.write();
        let entry = databases
            .get_mut(&db_name.to_lowercase())
            .and_then(|tables| tables.get_mut(&table_name.to_lowercase()))
            .ok_or_else(|| table_not_found(db_name, table_name))?;
        let keys = entry.table.partition_keys.len();
        if partition.values.len() != keys {
            return Err(PxfError::InvalidArguments(format!(
                "partition has {} values but table {}.{} has {} partition keys",
                partition.values.len(),
                db_name,
                table_name,
                keys
            )));
        }
        entry.partitions.push(partition);
        Ok(())
    }

    fn with_table<T>(
        &self,
        db_name: &str,
        table_name: &str,
        f: impl FnOnce(&TableEntry) -> PxfResult<T>,
    ) -> PxfResult<T> {
        let databases = self.databases.read();
        let entry = databases
            .get(&db_name.to_lowercase())
            .and_then(|tables| tables.get(&table_name.to_lowercase()))
            .ok_or_else(|| table_not_found(db_name, table_name))?;
        f(entry)
    }
}

fn table_not_found(db_name: &str, table_name: &str) -> PxfError {
    PxfError::NoSuchObject(format!("{}.{} table not found", db_name, table_name))
}

fn limited(partitions: impl Iterator<Item = Partition>, max: Option<usize>) -> Vec<Partition> {
    match max {
        Some(max) => partitions.take(max).collect(),
        None => partitions.collect(),
    }
}

impl MetastoreClient for InMemoryMetastore {
    fn get_table(&self, db_name: &str, table_name: &str) -> PxfResult<Table> {
        self.with_table(db_name, table_name, |entry| Ok(entry.table.clone()))
    }

    fn list_partitions(
        &self,
        db_name: &str,
        table_name: &str,
        max: Option<usize>,
    ) -> PxfResult<Vec<Partition>> {
        self.with_table(db_name, table_name, |entry| {
            Ok(limited(entry.partitions.iter().cloned(), max))
        })
    }

    fn list_partitions_by_filter(
        &self,
        db_name: &str,
        table_name: &str,
        filter: &str,
        max: Option<usize>,
    ) -> PxfResult<Vec<Partition>> {
        let expression = PartitionExpr::parse(filter)?;
        self.with_table(db_name, table_name, |entry| {
            let keys = &entry.table.partition_keys;
            let mut matched = Vec::new();
            for partition in &entry.partitions {
                if expression.matches(keys, &partition.values)? {
                    matched.push(partition.clone());
                }
            }
            debug!(filter, matched = matched.len(), "listed partitions by filter");
            Ok(limited(matched.into_iter(), max))
        })
    }

    fn get_databases(&self, pattern: &str) -> PxfResult<Vec<String>> {
        let mut names: Vec<String> = self
            .databases
            .read()
            .keys()
            .filter(|name| matches_pattern(pattern, name))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    fn get_tables(&self, db_name: &str, pattern: &str) -> PxfResult<Vec<String>> {
        let databases = self.databases.read();
        let Some(tables) = databases.get(&db_name.to_lowercase()) else {
            return Ok(Vec::new());
        };
        let mut names: Vec<String> = tables
            .values()
            .map(|entry| entry.table.table_name.clone())
            .filter(|name| matches_pattern(pattern, name))
            .collect();
        names.sort();
        Ok(names)
    }
}

// ── Partition filter expressions ──

#[derive(Debug, Clone, PartialEq)]
enum PartitionExpr {
    And(Box<PartitionExpr>, Box<PartitionExpr>),
    Or(Box<PartitionExpr>, Box<PartitionExpr>),
    Compare {
        key: String,
        op: CompareOp,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Op(CompareOp),
    Word(String),
    Quoted(String),
}

fn filter_error(filter: &str, message: impl std::fmt::Display) -> PxfError {
    PxfError::InvalidArguments(format!(
        "Error parsing partition filter \"{}\": {}",
        filter, message
    ))
}

fn tokenize(filter: &str) -> PxfResult<Vec<Token>> {
    let chars: Vec<char> = filter.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '"' | '\'' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|q| *q == c)
                    .ok_or_else(|| filter_error(filter, format!("unterminated string at {}", i)))?;
                tokens.push(Token::Quoted(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '=' | '<' | '>' | '!' => {
                let next = chars.get(i + 1).copied();
                let (op, len) = match (c, next) {
                    ('<', Some('>')) | ('!', Some('=')) => (CompareOp::Ne, 2),
                    ('<', Some('=')) => (CompareOp::Le, 2),
                    ('>', Some('=')) => (CompareOp::Ge, 2),
                    ('<', _) => (CompareOp::Lt, 1),
                    ('>', _) => (CompareOp::Gt, 1),
                    ('=', _) => (CompareOp::Eq, 1),
                    _ => return Err(filter_error(filter, format!("unexpected '{}' at {}", c, i))),
                };
                tokens.push(Token::Op(op));
                i += len;
            }
            _ => {
                let start = i;
                while i < chars.len()
                    && !chars[i].is_whitespace()
                    && !matches!(chars[i], '(' | ')' | '=' | '<' | '>' | '!' | '"' | '\'')
                {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
        }
    }
    Ok(tokens)
}

/// Recursive descent over `or := and (OR and)*`, `and := primary (AND primary)*`.
struct ExprParser<'a> {
    filter: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser<'_> {
    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn or(&mut self) -> PxfResult<PartitionExpr> {
        let mut left = self.and()?;
        while self.peek_keyword("OR") {
            self.pos += 1;
            let right = self.and()?;
            left = PartitionExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> PxfResult<PartitionExpr> {
        let mut left = self.primary()?;
        while self.peek_keyword("AND") {
            self.pos += 1;
            let right = self.primary()?;
            left = PartitionExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn primary(&mut self) -> PxfResult<PartitionExpr> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        match token {
            Some(Token::Open) => {
                let inner = self.or()?;
                match self.tokens.get(self.pos) {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(filter_error(self.filter, "missing ')'")),
                }
            }
            Some(Token::Word(key)) => {
                let op = match self.tokens.get(self.pos) {
                    Some(Token::Op(op)) => *op,
                    _ => return Err(filter_error(self.filter, format!("operator expected after {}", key))),
                };
                let value = match self.tokens.get(self.pos + 1) {
                    Some(Token::Quoted(v)) | Some(Token::Word(v)) => v.clone(),
                    _ => return Err(filter_error(self.filter, format!("value expected after {}", key))),
                };
                self.pos += 2;
                Ok(PartitionExpr::Compare { key, op, value })
            }
            other => Err(filter_error(self.filter, format!("unexpected token {:?}", other))),
        }
    }
}

impl PartitionExpr {
    fn parse(filter: &str) -> PxfResult<PartitionExpr> {
        let mut parser = ExprParser {
            filter,
            tokens: tokenize(filter)?,
            pos: 0,
        };
        let expr = parser.or()?;
        if parser.pos != parser.tokens.len() {
            return Err(filter_error(filter, "trailing input"));
        }
        Ok(expr)
    }

    fn matches(&self, keys: &[FieldSchema], values: &[String]) -> PxfResult<bool> {
        match self {
            PartitionExpr::And(left, right) => {
                Ok(left.matches(keys, values)? && right.matches(keys, values)?)
            }
            PartitionExpr::Or(left, right) => {
                Ok(left.matches(keys, values)? || right.matches(keys, values)?)
            }
            PartitionExpr::Compare { key, op, value } => {
                let index = keys
                    .iter()
                    .position(|k| k.name.eq_ignore_ascii_case(key))
                    .ok_or_else(|| {
                        PxfError::InvalidArguments(format!("{} is not a partition key", key))
                    })?;
                let actual = values.get(index).map(String::as_str).unwrap_or_default();
                Ok(op.accepts(compare_values(&keys[index].type_name, actual, value)))
            }
        }
    }
}

/// Integral keys compare numerically when both sides parse; everything else
/// compares as text.
fn compare_values(type_name: &str, actual: &str, expected: &str) -> Ordering {
    let integral = matches!(
        type_name.to_lowercase().as_str(),
        "tinyint" | "smallint" | "int" | "bigint"
    );
    if integral {
        if let (Ok(a), Ok(b)) = (actual.trim().parse::<i64>(), expected.trim().parse::<i64>()) {
            return a.cmp(&b);
        }
    }
    actual.cmp(expected)
}
