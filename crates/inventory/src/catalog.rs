use serde::{Deserialize, Serialize};

use durian_core::{DomainError, DomainResult, Entity, SpeciesId, VariationId};

const MAX_SPECIES_NAME: usize = 80;
const MAX_VARIATION_NAME: usize = 50;

/// Top-level commodity category (a durian cultivar, e.g. "Musang King").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub id: SpeciesId,
    pub name: String,
}

impl Species {
    /// Validate and build a new species. Uniqueness of the name is enforced by
    /// the store.
    pub fn register(id: SpeciesId, name: &str) -> DomainResult<Self> {
        let name = clean_name(name, "species", MAX_SPECIES_NAME)?;
        Ok(Self { id, name })
    }
}

impl Entity for Species {
    type Id = SpeciesId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Named sub-classification of a species (e.g. grade "A").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    pub id: VariationId,
    pub species_id: SpeciesId,
    pub name: String,
}

impl Variation {
    pub fn register(id: VariationId, species_id: SpeciesId, name: &str) -> DomainResult<Self> {
        let name = clean_name(name, "variation", MAX_VARIATION_NAME)?;
        Ok(Self {
            id,
            species_id,
            name,
        })
    }
}

impl Entity for Variation {
    type Id = VariationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn clean_name(raw: &str, what: &str, max_chars: usize) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation(format!("{what} name cannot be empty")));
    }
    if name.chars().count() > max_chars {
        return Err(DomainError::validation(format!(
            "{what} name cannot exceed {max_chars} characters"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_name_is_trimmed() {
        let s = Species::register(SpeciesId::new(), "  Musang King ").unwrap();
        assert_eq!(s.name, "Musang King");
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(Species::register(SpeciesId::new(), "   ").is_err());
        assert!(Variation::register(VariationId::new(), SpeciesId::new(), "").is_err());
    }

    #[test]
    fn variation_name_length_is_bounded() {
        let long = "x".repeat(MAX_VARIATION_NAME + 1);
        let err = Variation::register(VariationId::new(), SpeciesId::new(), &long).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
