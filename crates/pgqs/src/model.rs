//! Table metadata consumed by query sets.
//!
//! A [`TableDef`] names the target table and declares its fields. Query sets use it
//! to qualify columns, resolve `select_related` foreign keys, and pick the column
//! list for `bulk_create`.

use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::queryset::QuerySet;
use crate::value::Value;
use std::sync::Arc;

/// Referential action target of a foreign key field.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub to_table: String,
    pub related_field: String,
    pub on_delete: String,
    pub on_update: String,
}

impl ForeignKey {
    /// Reference `to_table(id)` with `CASCADE` actions.
    pub fn to(to_table: impl Into<String>) -> Self {
        Self {
            to_table: to_table.into(),
            related_field: "id".to_string(),
            on_delete: "CASCADE".to_string(),
            on_update: "CASCADE".to_string(),
        }
    }

    pub fn related_field(mut self, field: impl Into<String>) -> Self {
        self.related_field = field.into();
        self
    }

    pub fn on_delete(mut self, action: impl Into<String>) -> Self {
        self.on_delete = action.into();
        self
    }

    pub fn on_update(mut self, action: impl Into<String>) -> Self {
        self.on_update = action.into();
        self
    }
}

/// Column declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub sql_type: String,
    pub primary_key: bool,
    pub auto_increment: bool,
    /// Nullable columns default to `true`.
    pub null: bool,
    pub unique: bool,
    pub default: Option<Value>,
    pub index: bool,
    pub foreign_key: Option<ForeignKey>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            primary_key: false,
            auto_increment: false,
            null: true,
            unique: false,
            default: None,
            index: false,
            foreign_key: None,
        }
    }

    /// An auto-incrementing `SERIAL` primary key.
    pub fn serial(name: impl Into<String>) -> Self {
        Self::new(name, "SERIAL").primary_key().auto_increment()
    }

    /// A primary key column; implies `NOT NULL`.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.null = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.null = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn references(mut self, fk: ForeignKey) -> Self {
        self.foreign_key = Some(fk);
        self
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }

    fn column_sql(&self) -> String {
        let mut def = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if !self.null {
            def.push_str(" NOT NULL");
        }
        if self.unique {
            def.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            def.push_str(" DEFAULT ");
            def.push_str(&literal(default));
        }
        def
    }
}

/// A SQL literal for DDL, where bind parameters are not allowed.
fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

/// A table and its declared fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl TableDef {
    /// Declare a table; every table, field and referenced name must be a valid identifier.
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = FieldDef>) -> OrmResult<Self> {
        let name = name.into();
        Ident::parse(&name)?;
        let fields: Vec<FieldDef> = fields.into_iter().collect();
        for field in &fields {
            let ident = Ident::parse(&field.name)?;
            if !ident.is_bare() {
                return Err(OrmError::configuration(format!(
                    "field name '{}' must not be qualified",
                    field.name
                )));
            }
            if let Some(fk) = &field.foreign_key {
                Ident::parse(&fk.to_table)?;
                Ident::parse(&fk.related_field)?;
            }
        }
        Ok(Self { name, fields })
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Fields written by `INSERT` (everything but auto-increment columns).
    pub fn insertable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.auto_increment)
    }

    /// `CREATE TABLE` followed by one `CREATE INDEX` per indexed field.
    pub fn create_table_sql(&self) -> String {
        let mut lines: Vec<String> = self.fields.iter().map(FieldDef::column_sql).collect();
        lines.extend(self.fields.iter().filter_map(|f| {
            f.foreign_key.as_ref().map(|fk| {
                format!(
                    "FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
                    f.name, fk.to_table, fk.related_field, fk.on_delete, fk.on_update
                )
            })
        }));

        let mut out = format!("CREATE TABLE {} (\n  {}\n);", self.name, lines.join(",\n  "));
        for field in self.fields.iter().filter(|f| f.index) {
            out.push_str(&format!(
                "\nCREATE INDEX idx_{table}_{col} ON {table} ({col});",
                table = self.name,
                col = field.name
            ));
        }
        out
    }
}

/// A type bound to a table definition.
///
/// ```ignore
/// struct Book;
///
/// impl Model for Book {
///     fn table_def() -> Arc<TableDef> {
///         static DEF: OnceLock<Arc<TableDef>> = OnceLock::new();
///         DEF.get_or_init(|| Arc::new(book_table())).clone()
///     }
/// }
///
/// let recent = Book::objects().order_by(["-published_at"]).limit(10);
/// ```
pub trait Model {
    fn table_def() -> Arc<TableDef>;

    fn objects() -> QuerySet {
        QuerySet::new(Self::table_def())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books() -> TableDef {
        TableDef::new(
            "books",
            [
                FieldDef::serial("id"),
                FieldDef::new("title", "VARCHAR(255)").not_null().index(),
                FieldDef::new("status", "VARCHAR(20)").default_value("draft"),
                FieldDef::new("author_id", "INTEGER")
                    .not_null()
                    .references(ForeignKey::to("authors").on_delete("SET NULL")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn create_table_closes_definition() {
        assert_eq!(
            books().create_table_sql(),
            "CREATE TABLE books (\n  \
             id SERIAL PRIMARY KEY NOT NULL,\n  \
             title VARCHAR(255) NOT NULL,\n  \
             status VARCHAR(20) DEFAULT 'draft',\n  \
             author_id INTEGER NOT NULL,\n  \
             FOREIGN KEY (author_id) REFERENCES authors(id) ON DELETE SET NULL ON UPDATE CASCADE\n\
             );\n\
             CREATE INDEX idx_books_title ON books (title);"
        );
    }

    #[test]
    fn insertable_fields_skip_auto_increment() {
        let def = books();
        let names: Vec<_> = def.insertable_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["title", "status", "author_id"]);
    }

    #[test]
    fn rejects_invalid_identifiers() {
        let err = TableDef::new("books; DROP", [FieldDef::serial("id")]).unwrap_err();
        assert!(err.is_configuration());
        let err = TableDef::new("books", [FieldDef::new("a.b", "INT")]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn default_literal_escapes_quotes() {
        assert_eq!(literal(&Value::from("it's")), "'it''s'");
        assert_eq!(literal(&Value::from(false)), "FALSE");
    }
}
