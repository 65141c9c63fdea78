//! Compiler options for the CLI: `pixql.toml` (or `--config`), then an
//! inline JSON patch from `--set`.

use std::path::{Path, PathBuf};

use pixql_core::{CompilerOptions, OptionsPatch};

/// Looked up in the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG: &str = "pixql.toml";

pub(crate) fn load(config: Option<&Path>, set: Option<&str>) -> Result<CompilerOptions, String> {
    let path = match config {
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.is_file()),
    };
    let mut options = match path {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| format!("error reading config '{}': {}", path.display(), e))?;
            let options: CompilerOptions = toml::from_str(&text)
                .map_err(|e| format!("error parsing config '{}': {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "config loaded");
            options
        }
        None => CompilerOptions::default(),
    };
    if let Some(set) = set {
        let patch: OptionsPatch =
            serde_json::from_str(set).map_err(|e| format!("error parsing --set: {}", e))?;
        options.apply(patch);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_applies_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixql.toml");
        std::fs::write(
            &path,
            "forecast_limit = 3\n\n[lexical]\ntranslate_underscore_to_space = true\n",
        )
        .unwrap();
        let options = load(Some(&path), Some(r#"{"warning_limit_of_union_items": null}"#)).unwrap();
        assert_eq!(options.forecast_limit, Some(3));
        assert!(options.lexical.translate_underscore_to_space);
        assert_eq!(options.warning_limit_of_union_items, None);
        assert_eq!(options.warning_limit_of_intersect_items, Some(16));
    }

    #[test]
    fn bad_patch_is_reported() {
        let err = load(None, Some("{nope")).unwrap_err();
        assert!(err.starts_with("error parsing --set"));
    }
}
