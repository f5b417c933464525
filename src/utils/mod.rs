//! Small helpers shared by the application modules.

/// Interpret a `0|1` query flag: `"1"` is true, anything else is false.
pub fn query_flag(value: &str) -> bool {
    value == "1"
}
