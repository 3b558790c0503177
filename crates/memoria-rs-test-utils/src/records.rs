use chrono::{DateTime, Duration, TimeZone, Utc};
use memoria_rs_memory::MemoryRecord;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Record whose timestamp is `offset_secs` after a fixed epoch.
pub fn record_at(user_id: &str, content: &str, offset_secs: i64) -> MemoryRecord {
    let mut record = MemoryRecord::new(user_id, "user", content, Vec::new());
    record.timestamp = epoch() + Duration::seconds(offset_secs);
    record
}

/// One record per content string, one second apart.
pub fn records_for(user_id: &str, contents: &[&str]) -> Vec<MemoryRecord> {
    contents
        .iter()
        .enumerate()
        .map(|(idx, content)| record_at(user_id, content, idx as i64))
        .collect()
}
