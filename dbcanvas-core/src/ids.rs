use uuid::Uuid;

/// Kind of entity an identifier is minted for; decides the id prefix.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdKind {
    Canvas,
    Database,
    Property,
    Relation,
}

impl IdKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            IdKind::Canvas => "canvas",
            IdKind::Database => "db",
            IdKind::Property => "prop",
            IdKind::Relation => "rel",
        }
    }
}

/// Source of fresh identifiers for cloned and newly linked entities.
pub trait IdGenerator: Send + Sync {
    fn generate(&self, kind: IdKind) -> String;
}

/// Random v4 UUIDs at full width (122 random bits), so collisions with any
/// existing or previously minted id are negligible.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self, kind: IdKind) -> String {
        format!("{}_{}", kind.prefix(), Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_prefixed_and_unique() {
        let ids = UuidIdGenerator;
        let generated: HashSet<String> = (0..1_000).map(|_| ids.generate(IdKind::Property)).collect();
        assert_eq!(generated.len(), 1_000);
        assert!(generated.iter().all(|id| id.starts_with("prop_") && id.len() == 37));
    }
}
