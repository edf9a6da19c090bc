//! Entity kind declarations.

use std::fmt;
use std::sync::Arc;

type IdentityFn<O> = Arc<dyn Fn(&O) -> String + Send + Sync>;
type IdsQueryFn<Q> = Arc<dyn Fn(&[String]) -> Q + Send + Sync>;

/// Declares how the engine treats one entity type.
///
/// `identity` must be pure, total and stable: an entity's id is derived from
/// its content alone and never reassigned. `ids_query` builds the query used
/// by the missing-ids loader.
pub struct EntityKind<O, Q> {
    name: String,
    identity: IdentityFn<O>,
    ids_query: IdsQueryFn<Q>,
}

impl<O, Q> EntityKind<O, Q> {
    /// Creates a kind from its identity and ids-to-query functions.
    pub fn new(
        name: impl Into<String>,
        identity: impl Fn(&O) -> String + Send + Sync + 'static,
        ids_query: impl Fn(&[String]) -> Q + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            identity: Arc::new(identity),
            ids_query: Arc::new(ids_query),
        }
    }

    /// Name of the kind, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extracts the id of an entity.
    pub fn id_of(&self, entity: &O) -> String {
        (self.identity)(entity)
    }

    /// Builds a query selecting the given ids.
    pub fn ids_query(&self, ids: &[String]) -> Q {
        (self.ids_query)(ids)
    }
}

impl<O, Q> Clone for EntityKind<O, Q> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            identity: Arc::clone(&self.identity),
            ids_query: Arc::clone(&self.ids_query),
        }
    }
}

impl<O, Q> fmt::Debug for EntityKind<O, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityKind")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Note {
        id: u32,
    }

    #[test]
    fn kind_functions() {
        let kind: EntityKind<Note, Vec<String>> =
            EntityKind::new("note", |n: &Note| n.id.to_string(), |ids| ids.to_vec());

        assert_eq!(kind.name(), "note");
        assert_eq!(kind.id_of(&Note { id: 7 }), "7");
        assert_eq!(
            kind.ids_query(&["1".to_string(), "2".to_string()]),
            vec!["1".to_string(), "2".to_string()]
        );
        assert!(format!("{:?}", kind.clone()).contains("note"));
    }
}
