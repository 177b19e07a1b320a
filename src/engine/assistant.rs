//! Natural language to SQL, through an external text generator we don't trust.
//!
//! Whatever comes back goes through the [safety](crate::engine::safety) scanner before anybody
//! gets to see it as SQL.
use crate::engine::catalog::SchemaCatalog;
use crate::engine::safety;
use async_trait::async_trait;
use std::fmt::Write;
use thiserror::Error;

/// The external service that turns a request into SQL text.
#[async_trait]
pub trait TextGenerator {
    async fn generate(
        &self,
        request: &str,
        schema_description: &str,
    ) -> Result<String, GenerationServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationServiceError {
    #[error("Nothing to generate: the request is empty")]
    EmptyRequest,
    #[error("Nothing to generate from: the schema has no tables")]
    EmptySchema,
    #[error("Text generation failed: {0}")]
    Failed(String),
    #[error("Text generation timed out after {0} seconds")]
    TimedOut(u64),
    #[error("The text generator returned nothing")]
    EmptyResponse,
}

pub struct Assistant<G> {
    generator: G,
}

impl<G: TextGenerator> Assistant<G> {
    pub fn new(generator: G) -> Self {
        Assistant { generator }
    }

    /// Returns SQL that passed the safety scanner. Failures are never retried.
    pub async fn ask(&self, request: &str, catalog: &SchemaCatalog) -> Result<String, crate::Error> {
        let request = request.trim();
        if request.is_empty() {
            return Err(GenerationServiceError::EmptyRequest.into());
        }
        if catalog.is_empty() {
            return Err(GenerationServiceError::EmptySchema.into());
        }

        let schema = describe_schema(catalog);
        log::debug!(
            "asking for SQL, request is {} bytes, schema is {} bytes",
            request.len(),
            schema.len()
        );

        let response = self.generator.generate(request, &schema).await?;
        let sql = clean_response(&response);
        if sql.is_empty() {
            return Err(GenerationServiceError::EmptyResponse.into());
        }

        safety::ensure_safe(sql)?;

        Ok(sql.to_string())
    }
}

/// The schema as the text generator sees it.
///
/// ```text
/// TABLES AND COLUMNS:
/// -- Table: orders
///   -- id
///   -- total
///
/// -- Table: audit
///   -- (No columns listed for this table)
/// ```
pub fn describe_schema(catalog: &SchemaCatalog) -> String {
    let tables: Vec<_> = catalog
        .tables()
        .iter()
        .filter(|table| !table.name.as_str().trim().is_empty())
        .collect();

    if tables.is_empty() {
        return "No database schema provided.".to_string();
    }

    let mut description = String::from("TABLES AND COLUMNS:\n");
    for table in tables {
        // Writing to a String can't fail.
        let _ = writeln!(description, "-- Table: {}", table.name.as_str().trim());

        let columns: Vec<_> = table
            .columns
            .iter()
            .map(|column| column.as_str().trim())
            .filter(|column| !column.is_empty())
            .collect();

        if columns.is_empty() {
            description.push_str("  -- (No columns listed for this table)\n");
        }
        for column in columns {
            let _ = writeln!(description, "  -- {column}");
        }

        description.push('\n');
    }

    description
}

/// The instructions text generators get along with the request.
pub fn build_prompt(request: &str, schema_description: &str) -> String {
    format!(
        "You are an expert SQL query generator.\n\
         Given the following database schema and a user request, generate a valid SQL query.\n\
         Only output the SQL query, nothing else. Do not include any explanations, comments, \
         or markdown formatting.\n\
         Make sure the query is syntactically correct standard SQL.\n\
         \n\
         These requirements must be followed:\n\
         1. ONLY generate SELECT queries\n\
         2. Use proper JOIN syntax with ON conditions when joining tables\n\
         3. Use table aliases for all tables\n\
         4. Prefix column names with their table alias\n\
         5. When the user requests a column from a specific table, take it from that table\n\
         6. Choose JOIN conditions that don't duplicate rows\n\
         7. Never leave out requested columns\n\
         \n\
         DATABASE SCHEMA:\n\
         {schema_description}\n\
         \n\
         USER REQUEST: {request}\n\
         \n\
         Return ONLY the SQL query."
    )
}

/// Removes the markdown fences generators like to add, even when asked not to.
pub fn clean_response(response: &str) -> &str {
    let trimmed = response.trim().trim_matches('`').trim();

    match trimmed.get(..3) {
        Some(tag) if tag.eq_ignore_ascii_case("sql") => {
            let rest = &trimmed[3..];
            // "sqlfoo" is not a language tag
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest.trim()
            } else {
                trimmed
            }
        }
        _ => trimmed,
    }
}
