use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
    #[serde(default = "default_cpu")]
    pub cpu: SampledConfig,
    #[serde(default = "default_percent")]
    pub memory: ThresholdConfig,
    #[serde(default = "default_percent")]
    pub swap: ThresholdConfig,
    #[serde(default)]
    pub disk: DiskConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default = "default_network")]
    pub network: SampledConfig,
    #[serde(default)]
    pub netstat: NetstatConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ThresholdConfig {
    pub warning: f64,
    pub critical: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct SampledConfig {
    pub warning: f64,
    pub critical: f64,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiskConfig {
    #[serde(default = "default_disk_warning")]
    pub warning: f64,
    #[serde(default = "default_disk_critical")]
    pub critical: f64,
    #[serde(default = "default_exclude_fstypes")]
    pub exclude_fstypes: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct LoadConfig {
    #[serde(default = "default_load_warning")]
    pub warning: f64,
    #[serde(default = "default_load_critical")]
    pub critical: f64,
    #[serde(default)]
    pub per_cpu: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct NetstatConfig {
    #[serde(default = "default_netstat_min")]
    pub min: u64,
    #[serde(default = "default_netstat_max")]
    pub max: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_root: default_proc_root(),
            cpu: default_cpu(),
            memory: default_percent(),
            swap: default_percent(),
            disk: DiskConfig::default(),
            load: LoadConfig::default(),
            network: default_network(),
            netstat: NetstatConfig::default(),
        }
    }
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            warning: default_disk_warning(),
            critical: default_disk_critical(),
            exclude_fstypes: default_exclude_fstypes(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            warning: default_load_warning(),
            critical: default_load_critical(),
            per_cpu: false,
        }
    }
}

impl Default for NetstatConfig {
    fn default() -> Self {
        Self {
            min: default_netstat_min(),
            max: default_netstat_max(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.proc_root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "proc_root must not be empty".to_string(),
            ));
        }

        validate_thresholds("cpu", self.cpu.warning, self.cpu.critical)?;
        validate_thresholds("memory", self.memory.warning, self.memory.critical)?;
        validate_thresholds("swap", self.swap.warning, self.swap.critical)?;
        validate_thresholds("disk", self.disk.warning, self.disk.critical)?;
        validate_thresholds("load", self.load.warning, self.load.critical)?;
        validate_thresholds("network", self.network.warning, self.network.critical)?;

        if self.cpu.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "cpu.interval_secs must be >= 1".to_string(),
            ));
        }
        if self.network.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "network.interval_secs must be >= 1".to_string(),
            ));
        }
        if self.netstat.min > self.netstat.max {
            return Err(ConfigError::Validation(
                "netstat.min must not be greater than netstat.max".to_string(),
            ));
        }

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_thresholds(section: &str, warning: f64, critical: f64) -> Result<(), ConfigError> {
    if warning < 0.0 || critical < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{section} thresholds must not be negative"
        )));
    }
    if warning >= critical {
        return Err(ConfigError::Validation(format!(
            "{section}.warning must be lower than {section}.critical"
        )));
    }
    Ok(())
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

const fn default_percent() -> ThresholdConfig {
    ThresholdConfig {
        warning: 80.0,
        critical: 90.0,
    }
}

const fn default_cpu() -> SampledConfig {
    SampledConfig {
        warning: 80.0,
        critical: 90.0,
        interval_secs: 5,
    }
}

const fn default_network() -> SampledConfig {
    SampledConfig {
        warning: 256.0,
        critical: 512.0,
        interval_secs: 1,
    }
}

const fn default_disk_warning() -> f64 {
    80.0
}

const fn default_disk_critical() -> f64 {
    90.0
}

fn default_exclude_fstypes() -> Vec<String> {
    [
        "sysfs",
        "proc",
        "devtmpfs",
        "devpts",
        "tmpfs",
        "securityfs",
        "cgroup",
        "efivarfs",
        "autofs",
        "debugfs",
        "mqueue",
        "hugetlbfs",
        "fusectl",
        "rpc_pipefs",
        "nfsd",
        "binfmt_misc",
        "fuse.gvfsd-fuse",
        "pstore",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

const fn default_load_warning() -> f64 {
    1.0
}

const fn default_load_critical() -> f64 {
    2.0
}

const fn default_netstat_min() -> u64 {
    1
}

const fn default_netstat_max() -> u64 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().expect("built-in defaults must validate");
        assert_eq!(cfg.proc_root, PathBuf::from("/proc"));
        assert_eq!(cfg.cpu.interval_secs, 5);
        assert_eq!(cfg.netstat.max, 2);
        assert!(cfg.disk.exclude_fstypes.iter().any(|t| t == "tmpfs"));
    }

    #[test]
    fn example_yaml_parses_and_validates() {
        let cfg: Config = serde_yaml::from_str(Config::example_yaml()).expect("example must parse");
        cfg.validate().expect("example must validate");
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: Config = serde_yaml::from_str("netstat:\n  max: 10\nload:\n  per_cpu: true\n").unwrap();
        assert_eq!(cfg.netstat.min, 1);
        assert_eq!(cfg.netstat.max, 10);
        assert!(cfg.load.per_cpu);
        assert_eq!(cfg.load.critical, 2.0);
        assert_eq!(cfg.memory.critical, 90.0);
    }

    #[test]
    fn inverted_thresholds_fail_validation() {
        let mut cfg = Config::default();
        cfg.swap.warning = 95.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        let mut cfg = Config::default();
        cfg.netstat.min = 5;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.network.interval_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::load_from_file("/nonexistent/hostcheck.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
