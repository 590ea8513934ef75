use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = sheet_common::id::prefixed_ulid("sht");
/// assert!(id.starts_with("sht_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new().to_string())
}

/// Marker trait for types that represent a prefixed ID.
pub trait PrefixedId {
    const PREFIX: &'static str;

    fn generate() -> String {
        prefixed_ulid(Self::PREFIX)
    }
}

/// Well-known ID prefixes.
pub mod prefix {
    pub const USER: &str = "usr";
    pub const SHEET: &str = "sht";
    pub const FIELD: &str = "fld";
    pub const ROW: &str = "row";
    pub const FIELD_VALUE: &str = "fv";
    pub const CONNECTION: &str = "conn";
}
