//! Hash collections keyed with the fast, non-cryptographic `FxHasher`.

pub type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type FastHashSet<K> = rustc_hash::FxHashSet<K>;
