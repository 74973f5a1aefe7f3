use serde::Deserialize;

/// Longitud maxima de una query.
const MAX_QUERY_LEN: usize = 256;

/// Extractor para rutas /entities/{query} y /cache/{query}
#[derive(Debug, Deserialize)]
pub struct QueryPath {
    pub query: String,
}

impl QueryPath {
    /// Valida que la query no este vacia ni contenga caracteres de control.
    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("Query cannot be empty".to_string());
        }
        if self.query.len() > MAX_QUERY_LEN {
            return Err(format!("Query exceeds {} bytes", MAX_QUERY_LEN));
        }
        if self.query.chars().any(char::is_control) {
            return Err("Query contains control characters".to_string());
        }
        Ok(())
    }
}
