use log::{debug, info, warn};
use sinklog::config::CONFIG_TEMPLATE_TOML;
use sinklog::error::{ConfigError, Error, Result};
use std::fs;
use std::path::Path;

/// 生成默认配置文件
pub fn handle_init(output_path: &str, force: bool) -> Result<()> {
    let path = Path::new(output_path);

    info!("Generating configuration file: {output_path}");

    if path.exists() && !force {
        return Err(Error::Config(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        }));
    }

    if path.exists() && force {
        warn!("Overwriting existing configuration file: {output_path}");
    }

    // 创建目录（如果需要）
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty() && !p.exists()) {
        debug!("Creating directory: {}", parent.display());
        fs::create_dir_all(parent)?;
    }

    fs::write(path, CONFIG_TEMPLATE_TOML)?;

    info!("Configuration file written: {output_path}");
    eprintln!("Next: edit {output_path}, then run 'sinklog validate -c {output_path}'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/sinklog.toml");
        let path_str = path.to_string_lossy().to_string();

        handle_init(&path_str, false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), CONFIG_TEMPLATE_TOML);

        let err = handle_init(&path_str, false).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::AlreadyExists { .. })));

        fs::write(&path, "# edited").unwrap();
        handle_init(&path_str, true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), CONFIG_TEMPLATE_TOML);
    }
}
