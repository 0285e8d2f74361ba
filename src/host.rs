//! Host facts for the report header.

use std::num::NonZeroUsize;

/// CPU model and usable core count of the machine running the benchmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// `None` when the platform does not expose a model string.
    pub cpu_model: Option<String>,
    pub available_cores: usize,
}

impl HostInfo {
    pub fn detect() -> Self {
        let available_cores = std::thread::available_parallelism()
            .unwrap_or(NonZeroUsize::MIN)
            .get();
        Self {
            cpu_model: cpu_model(),
            available_cores,
        }
    }
}

#[cfg(target_os = "linux")]
fn cpu_model() -> Option<String> {
    let cpuinfo = std::fs::read_to_string("/proc/cpuinfo").ok()?;
    model_from_cpuinfo(&cpuinfo)
}

#[cfg(target_os = "macos")]
fn cpu_model() -> Option<String> {
    let output = std::process::Command::new("sysctl")
        .args(["-n", "machdep.cpu.brand_string"])
        .output()
        .ok()?;
    let model = String::from_utf8(output.stdout).ok()?;
    let model = model.trim();
    (!model.is_empty()).then(|| model.to_string())
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn cpu_model() -> Option<String> {
    None
}

/// First `model name` entry; aarch64 kernels name it `Processor` or omit it.
#[cfg_attr(not(any(target_os = "linux", test)), allow(dead_code))]
fn model_from_cpuinfo(cpuinfo: &str) -> Option<String> {
    cpuinfo.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        let key = key.trim();
        let value = value.trim();
        ((key == "model name" || key == "Processor") && !value.is_empty())
            .then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_from_cpuinfo() {
        let cpuinfo = "processor\t: 0\nvendor_id\t: GenuineIntel\nmodel name\t: Intel(R) Xeon(R) CPU @ 2.20GHz\nflags\t\t: fpu avx2 fma\n\nprocessor\t: 1\nmodel name\t: Intel(R) Xeon(R) CPU @ 2.20GHz\n";
        assert_eq!(
            model_from_cpuinfo(cpuinfo).as_deref(),
            Some("Intel(R) Xeon(R) CPU @ 2.20GHz")
        );
        assert_eq!(model_from_cpuinfo("processor\t: 0\nBogoMIPS\t: 48.00\n"), None);
        assert_eq!(model_from_cpuinfo("model name\t:\n"), None);
    }

    #[test]
    fn test_detect_counts_at_least_one_core() {
        let host = HostInfo::detect();
        assert!(host.available_cores >= 1);
    }
}
