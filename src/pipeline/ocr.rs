//! Stage 3: run the OCR engine over the page manifest.

use super::command::{run_stage, CommandRunner, CommandSpec};
use super::workspace::MANIFEST_FILE_NAME;
use crate::config::ServiceConfig;
use crate::error::StageError;
use crate::queue::JobStage;
use std::path::Path;

/// Build the OCR invocation. Runs inside `workspace` so the manifest's
/// relative image names resolve.
pub fn ocr_command(config: &ServiceConfig, workspace: &Path) -> CommandSpec {
    CommandSpec::new(&config.ocr_program, config.ocr_timeout())
        .arg(MANIFEST_FILE_NAME)
        .arg("-")
        .arg("-l")
        .arg(&config.ocr_language)
        .arg("quiet")
        .arg("stdout")
        .current_dir(workspace)
}

/// Recognise every page listed in the manifest; returns the concatenated text.
pub async fn recognize(
    runner: &dyn CommandRunner,
    config: &ServiceConfig,
    workspace: &Path,
) -> Result<String, StageError> {
    let spec = ocr_command(config, workspace);
    let output = run_stage(runner, JobStage::Ocr, &spec).await?;
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tesseract_arguments() {
        let config = ServiceConfig::default();
        let spec = ocr_command(&config, Path::new("/w"));
        assert_eq!(spec.program, "tesseract");
        assert_eq!(
            spec.args,
            vec!["imageFiles.txt", "-", "-l", "vie", "quiet", "stdout"]
        );
        assert_eq!(spec.cwd.as_deref(), Some(Path::new("/w")));
    }

    #[test]
    fn language_follows_config() {
        let config = ServiceConfig::builder().ocr_language("vie+eng").build().unwrap();
        let spec = ocr_command(&config, Path::new("/w"));
        assert_eq!(spec.args[3], "vie+eng");
    }
}
