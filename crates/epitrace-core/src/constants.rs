/// Epitrace system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix for allocator-generated meta station ids.
pub const META_ID_PREFIX: &str = "meta:";

/// Initial arena capacity for stations on an empty load.
pub const STATION_ARENA_CAPACITY: usize = 256;

/// Initial arena capacity for deliveries on an empty load.
pub const DELIVERY_ARENA_CAPACITY: usize = 1024;
