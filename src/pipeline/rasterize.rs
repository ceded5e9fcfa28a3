//! Stage 1: rasterise the uploaded PDF into one PNG per page.
//!
//! Ghostscript writes `1.png`, `2.png`, … into the workspace. The names are
//! numeric, so [`super::pages`] sorts them with a natural comparison.

use super::command::{run_stage, CommandRunner, CommandSpec};
use super::workspace::SOURCE_FILE_NAME;
use crate::config::ServiceConfig;
use crate::error::StageError;
use crate::queue::JobStage;
use std::path::Path;

/// Build the rasteriser invocation for `workspace`.
pub fn rasterize_command(config: &ServiceConfig, workspace: &Path) -> CommandSpec {
    CommandSpec::new(&config.rasterizer_program, config.rasterize_timeout())
        .arg("-q")
        .arg("-dSAFER")
        .arg("-sDEVICE=png16m")
        .arg("-o")
        .arg(workspace.join("%d.png").to_string_lossy())
        .arg(format!("-r{}", config.dpi))
        .arg(workspace.join(SOURCE_FILE_NAME).to_string_lossy())
}

pub async fn rasterize(
    runner: &dyn CommandRunner,
    config: &ServiceConfig,
    workspace: &Path,
) -> Result<(), StageError> {
    let spec = rasterize_command(config, workspace);
    run_stage(runner, JobStage::Rasterizing, &spec).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ghostscript_arguments() {
        let config = ServiceConfig::builder().dpi(300).build().unwrap();
        let spec = rasterize_command(&config, Path::new("/w"));
        assert_eq!(spec.program, "gs");
        assert_eq!(
            spec.args,
            vec!["-q", "-dSAFER", "-sDEVICE=png16m", "-o", "/w/%d.png", "-r300", "/w/file.pdf"]
        );
        assert_eq!(spec.timeout, config.rasterize_timeout());
        assert!(spec.cwd.is_none());
    }

    #[test]
    fn resolution_follows_config() {
        let config = ServiceConfig::builder().dpi(150).build().unwrap();
        let spec = rasterize_command(&config, Path::new("/w"));
        assert!(spec.args.contains(&"-r150".to_string()));
    }
}
