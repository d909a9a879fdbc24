//! Building local directories into container images.

use std::path::Path;

use cellc_common::error::{CellError, Result};

use crate::shell::ShellCommand;

/// Builds a container image from a local build context.
pub trait ImageBuilder {
    /// Builds `context` and tags the result as `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is unavailable or the build fails.
    fn build(&self, tag: &str, context: &Path) -> Result<()>;
}

/// Builds images with the `docker` command line tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerCli;

impl ImageBuilder for DockerCli {
    fn build(&self, tag: &str, context: &Path) -> Result<()> {
        let docker = which::which("docker").map_err(|_| CellError::NotFound {
            kind: "docker binary",
            id: "docker (install Docker to build images from a directory)".into(),
        })?;
        tracing::info!(tag, context = %context.display(), "building docker image");
        let _ = ShellCommand::new(docker)
            .args(["build", "-t", tag])
            .arg(context.display().to_string())
            .run()?;
        Ok(())
    }
}

/// Skips every build, for commands that only inspect an image.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipBuild;

impl ImageBuilder for SkipBuild {
    fn build(&self, tag: &str, context: &Path) -> Result<()> {
        tracing::info!(tag, context = %context.display(), "skipping image build");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;

    use super::*;

    /// Records builds instead of running them.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingBuilder {
        pub(crate) builds: RefCell<Vec<(String, PathBuf)>>,
        pub(crate) fail: bool,
    }

    impl ImageBuilder for RecordingBuilder {
        fn build(&self, tag: &str, context: &Path) -> Result<()> {
            if self.fail {
                return Err(CellError::ExternalTool {
                    command: format!("docker build -t {tag}"),
                    code: 1,
                    message: "build failed".into(),
                });
            }
            self.builds
                .borrow_mut()
                .push((tag.to_string(), context.to_path_buf()));
            Ok(())
        }
    }

    #[test]
    fn recording_builder_keeps_order() {
        let builder = RecordingBuilder::default();
        builder.build("org/a:1", Path::new("a")).expect("build");
        builder.build("org/b:1", Path::new("b")).expect("build");
        let builds = builder.builds.borrow();
        assert_eq!(builds[0].0, "org/a:1");
        assert_eq!(builds[1].1, PathBuf::from("b"));
    }
}
