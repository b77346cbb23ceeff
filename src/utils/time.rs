/// Formats a second count as `m:ss`, the way countdowns are shown to employees.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
