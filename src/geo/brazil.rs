//! Brazilian federative units and macro-regions.

use super::{fold_key, GeoError, GeoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct State {
    pub abbrev: &'static str,
    pub name: &'static str,
    pub region: &'static str,
}

/// The five macro-regions, north to south.
pub const REGIONS: [&str; 5] = ["Norte", "Nordeste", "Centro-Oeste", "Sudeste", "Sul"];

pub const STATES: [State; 27] = [
    State { abbrev: "AC", name: "Acre", region: "Norte" },
    State { abbrev: "AL", name: "Alagoas", region: "Nordeste" },
    State { abbrev: "AP", name: "Amapá", region: "Norte" },
    State { abbrev: "AM", name: "Amazonas", region: "Norte" },
    State { abbrev: "BA", name: "Bahia", region: "Nordeste" },
    State { abbrev: "CE", name: "Ceará", region: "Nordeste" },
    State { abbrev: "DF", name: "Distrito Federal", region: "Centro-Oeste" },
    State { abbrev: "ES", name: "Espírito Santo", region: "Sudeste" },
    State { abbrev: "GO", name: "Goiás", region: "Centro-Oeste" },
    State { abbrev: "MA", name: "Maranhão", region: "Nordeste" },
    State { abbrev: "MT", name: "Mato Grosso", region: "Centro-Oeste" },
    State { abbrev: "MS", name: "Mato Grosso do Sul", region: "Centro-Oeste" },
    State { abbrev: "MG", name: "Minas Gerais", region: "Sudeste" },
    State { abbrev: "PA", name: "Pará", region: "Norte" },
    State { abbrev: "PB", name: "Paraíba", region: "Nordeste" },
    State { abbrev: "PR", name: "Paraná", region: "Sul" },
    State { abbrev: "PE", name: "Pernambuco", region: "Nordeste" },
    State { abbrev: "PI", name: "Piauí", region: "Nordeste" },
    State { abbrev: "RJ", name: "Rio de Janeiro", region: "Sudeste" },
    State { abbrev: "RN", name: "Rio Grande do Norte", region: "Nordeste" },
    State { abbrev: "RS", name: "Rio Grande do Sul", region: "Sul" },
    State { abbrev: "RO", name: "Rondônia", region: "Norte" },
    State { abbrev: "RR", name: "Roraima", region: "Norte" },
    State { abbrev: "SC", name: "Santa Catarina", region: "Sul" },
    State { abbrev: "SP", name: "São Paulo", region: "Sudeste" },
    State { abbrev: "SE", name: "Sergipe", region: "Nordeste" },
    State { abbrev: "TO", name: "Tocantins", region: "Norte" },
];

pub fn state_by_abbrev(abbrev: &str) -> Option<&'static State> {
    let abbrev = abbrev.trim();
    STATES.iter().find(|s| s.abbrev.eq_ignore_ascii_case(abbrev))
}

/// Resolve an abbreviation or a full state name to its state.
pub fn normalize_uf(key: &str) -> GeoResult<&'static State> {
    if let Some(state) = state_by_abbrev(key) {
        return Ok(state);
    }
    let folded = fold_key(key);
    STATES
        .iter()
        .find(|s| fold_key(s.name) == folded)
        .ok_or_else(|| GeoError::UnknownState(key.to_string()))
}

pub fn region_of(abbrev: &str) -> GeoResult<&'static str> {
    normalize_uf(abbrev).map(|s| s.region)
}

/// Canonical spelling of a region name (`"centro oeste"` -> `"Centro-Oeste"`).
pub fn normalize_region(name: &str) -> GeoResult<&'static str> {
    let folded = fold_key(name).replace('-', " ");
    REGIONS
        .iter()
        .copied()
        .find(|r| fold_key(r).replace('-', " ") == folded)
        .ok_or_else(|| GeoError::UnknownRegion(name.to_string()))
}
