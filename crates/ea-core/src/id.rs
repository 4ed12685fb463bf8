use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for entity ids handed out by the object store.
/// Ids are compared on every hit test and cache lookup, so they are kept as
/// 4-byte `Spur` handles rather than owned strings.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

static COUNTER: AtomicU64 = AtomicU64::new(0);

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident, $sigil:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an id, or return the existing handle.
            pub fn intern(s: &str) -> Self {
                Self(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }

            /// Mint a fresh id with a type prefix (e.g. `obj_12`).
            pub fn with_prefix(prefix: &str) -> Self {
                let n = COUNTER.fetch_add(1, Ordering::Relaxed);
                Self::intern(&format!("{prefix}_{n}"))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($sigil, "{}"), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Identifier of an `ArchitecturalObject` (a node on the canvas).
    ObjectId,
    "obj:"
);

interned_id!(
    /// Identifier of an `ArchitecturalModel` (the container a canvas shows).
    ModelId,
    "model:"
);

interned_id!(
    /// Identifier of a quality-center defect whose steps are migrated.
    DefectId,
    "defect:"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = ObjectId::intern("billing_api");
        let b = ObjectId::intern("billing_api");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "billing_api");
    }

    #[test]
    fn minted_ids_are_unique() {
        let a = ObjectId::with_prefix("obj");
        let b = ObjectId::with_prefix("obj");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("obj_"));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = ModelId::intern("m-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"m-1\"");
        let back: ModelId = serde_json::from_str("\"m-1\"").unwrap();
        assert_eq!(back, id);
        assert_eq!(format!("{id:?}"), "model:m-1");
    }
}
