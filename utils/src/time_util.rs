use chrono::{DateTime, Utc};

/// Format used in spool file names: the ISO-8601 date, a dash in place of the
/// `T` separator, and whole seconds only. Sorts lexically in time order.
const INSTRUCTION_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

pub fn instruction_timestamp(at: DateTime<Utc>) -> String {
    at.format(INSTRUCTION_TIMESTAMP_FORMAT).to_string()
}

pub fn current_instruction_timestamp() -> String {
    instruction_timestamp(Utc::now())
}
