use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Build settings read from an `mgc.toml` file.
///
/// Paths are relative to the directory holding the project file.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Project {
    pub script: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub map: Option<PathBuf>,
    pub init: Option<PathBuf>,
    pub noclean: bool,
    pub silent: bool,
    pub debug: bool,
}

impl Project {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read project file {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_toml_str(&text, base)
            .with_context(|| format!("failed to parse project file {}", path.display()))
    }

    pub fn from_toml_str(text: &str, base: &Path) -> Result<Self> {
        let mut project: Project = toml::from_str(text)?;
        for path in [
            &mut project.script,
            &mut project.input,
            &mut project.output,
            &mut project.map,
            &mut project.init,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn relative_paths_follow_the_project_file() {
        let project = Project::from_toml_str(
            "script = \"main.mgc\"\noutput = \"/tmp/out.gci\"\nsilent = true\n",
            Path::new("/work/mod"),
        )
        .unwrap();
        assert_eq!(
            project,
            Project {
                script: Some(PathBuf::from("/work/mod/main.mgc")),
                output: Some(PathBuf::from("/tmp/out.gci")),
                silent: true,
                ..Project::default()
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Project::from_toml_str("scripts = \"a.mgc\"\n", Path::new("")).is_err());
    }
}
