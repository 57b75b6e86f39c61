#[cfg(not(target_os = "linux"))]
pub fn mem_used_peak() -> Option<usize> {
    None
}

/// Peak resident size in kB, read from the process status file.
#[cfg(target_os = "linux")]
pub fn mem_used_peak() -> Option<usize> {
    use std::fs;

    let buf = fs::read_to_string("/proc/self/status").ok()?;
    let line = buf.lines().find(|line| line.starts_with("VmPeak:"))?;
    let mem_kb: String = line.chars().filter(|c| c.is_digit(10)).collect();
    mem_kb.parse().ok()
}
