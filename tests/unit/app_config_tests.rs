/*!
 * Tests for configuration loading, validation and snapshots
 */

use anyhow::Result;
use universalsub::app_config::{Config, LogLevel, SharedConfig};

use crate::common;

#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.target_language, "Chinese");
    assert_eq!(config.translation.batch_size, 10);
    assert_eq!(config.translation.timeout_secs, 60);
    assert!(config.translation.system_prompt.contains("{target_language}"));
    assert_eq!(config.transcription.binary, "whisper-cli");
    assert!(config.transcription.language.is_none());
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join("config.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.translation.batch_size, Config::default().translation.batch_size);

    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.translation.model_name, config.translation.model_name);
    Ok(())
}

#[test]
fn test_load_or_create_withPartialFile_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "config.json",
        r#"{ "target_language": "Spanish", "translation": { "batch_size": 3, "fallback_prompt": "" } }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.target_language, "Spanish");
    assert_eq!(config.translation.batch_size, 3);
    assert!(config.translation.fallback_prompt.is_empty());
    assert_eq!(config.transcription.beam_size, 5);
    Ok(())
}

#[test]
fn test_load_or_create_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "config.json", "{ broken")?;

    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.translation.temperature = 3.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.target_language = "   ".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.transcription.binary = String::new();
    assert!(config.validate().is_err());
}

#[test]
fn test_task_settings_withZeroBatchSize_shouldClampToOne() {
    let mut config = Config::default();
    config.translation.batch_size = 0;

    assert_eq!(config.task_settings().batch_size, 1);
}

#[test]
fn test_shared_config_snapshot_shouldBeIndependentOfLaterUpdates() {
    let shared = SharedConfig::new(Config::default());
    let snapshot = shared.snapshot();

    shared.update(|cfg| cfg.target_language = "French".to_string());

    assert_eq!(snapshot.target_language, "Chinese");
    assert_eq!(shared.snapshot().target_language, "French");
}
