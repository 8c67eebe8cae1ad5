#[cfg(not(target_os = "linux"))]
pub fn mem_used_peak() -> Option<usize> {
    None
}

// Peak resident size in KiB, scraped from the process status file.
#[cfg(target_os = "linux")]
pub fn mem_used_peak() -> Option<usize> {
    use std::fs;
    use std::process;

    let status = fs::read_to_string(format!("/proc/{}/status", process::id())).ok()?;
    let line = status.lines().find(|line| line.starts_with("VmPeak:"))?;
    line.split_whitespace().nth(1)?.parse().ok()
}
