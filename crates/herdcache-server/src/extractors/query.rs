use serde::Deserialize;

use crate::cache::Strategy;

/// Query parameters opcionales para /entities.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct EntitiesQuery {
    /// Estrategia a usar en lugar de la configurada.
    pub strategy: Option<Strategy>,
}
