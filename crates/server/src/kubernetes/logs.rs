/// Keywords that mark a log line as worth an agent's attention. Matching is
/// case-insensitive.
pub const IMPORTANT_KEYWORDS: &[&str] = &[
    "ERROR", "WARN", "CRITICAL", "FATAL", "PANIC",
    "EXCEPTION", "FAILURE", "FAILED", "TIMEOUT",
    "REFUSED", "DENIED", "UNREACHABLE", "RESTART",
    "CRASH", "KILLED", "OOM", "5XX", "500", "503", "502",
    "4XX", "401", "403", "404", "CONNECTION", "DISK",
];

fn is_important(line: &str) -> bool {
    let upper = line.to_uppercase();
    IMPORTANT_KEYWORDS.iter().any(|kw| upper.contains(kw))
}

/// Reduce raw logs to the important lines, or hand back everything with a
/// note when nothing matched.
pub fn filter_important_lines(logs: &str) -> String {
    let lines: Vec<&str> = logs.split('\n').collect();
    let important: Vec<&str> = lines.iter().copied().filter(|l| is_important(l)).collect();

    if important.is_empty() {
        format!(
            "No important log entries found, full log entries are appended\n{}",
            lines.join("\n")
        )
    } else {
        format!(
            "Found {} important log entries:\n\n{}",
            important.len(),
            important.join("\n")
        )
    }
}
