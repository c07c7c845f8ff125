//! Mapping from Rust field types to [`DeclaredType`].
//!
//! This is what lets `ModelBuilder::field::<T>` infer a scalar kind from the
//! field's static type. Compound types map to `Array` / `Object`, which never
//! infer and therefore require an explicit kind.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::DeclaredType;

pub trait Declared {
    const DECLARED: DeclaredType;
}

/// Raw bytes stored as BSON binary data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binary(pub Vec<u8>);

/// The store's native 12-byte identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub [u8; 12]);

macro_rules! declared {
    ($kind:ident => $($ty:ty),+ $(,)?) => {
        $(
            impl Declared for $ty {
                const DECLARED: DeclaredType = DeclaredType::$kind;
            }
        )+
    };
}

declared!(Boolean => bool);
declared!(Number => i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64);
declared!(String => String, &str, char);
declared!(Date => NaiveDate, NaiveDateTime);
declared!(Binary => Binary, Uuid);
declared!(ObjectId => ObjectId);
declared!(Object => serde_json::Value);

impl<Tz: TimeZone> Declared for DateTime<Tz> {
    const DECLARED: DeclaredType = DeclaredType::Date;
}

impl<T: Declared> Declared for Option<T> {
    const DECLARED: DeclaredType = T::DECLARED;
}

impl<T> Declared for Vec<T> {
    const DECLARED: DeclaredType = DeclaredType::Array;
}

impl<K, V> Declared for HashMap<K, V> {
    const DECLARED: DeclaredType = DeclaredType::Object;
}

impl<K, V> Declared for BTreeMap<K, V> {
    const DECLARED: DeclaredType = DeclaredType::Object;
}
