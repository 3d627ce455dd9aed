#[cfg(test)]
mod tests {
    use adpilot_config::schema::*;
    use adpilot_config::ConfigLoader;
    use adpilot_core::PlatformId;
    use std::io::Write;

    // ── Default tests ──────────────────────────────────────────

    #[test]
    fn test_engine_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_interval_secs, 900);
        assert_eq!(config.tick_deadline_fraction, 0.8);
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.per_platform_concurrency, 4);
        assert_eq!(config.trailing_window_days, 7);
    }

    #[test]
    fn test_guardrails_defaults() {
        let config = GuardrailsConfig::default();
        assert_eq!(config.confidence_threshold, 0.85);
        assert_eq!(config.major_change_fraction, 0.20);
        assert_eq!(config.approval_ttl_secs, 14_400);
        assert_eq!(config.min_campaign_runtime_hours_before_pause, 72);
        assert_eq!(config.automation_level, "semi");
    }

    #[test]
    fn test_default_platforms_cover_closed_set() {
        let config = PilotConfig::default();
        let enabled = config.enabled_platforms();
        assert_eq!(enabled.len(), 4);
        assert!(enabled.iter().any(|(p, _)| *p == PlatformId::GoogleAds));
        assert!(enabled.iter().any(|(p, _)| *p == PlatformId::LinkedinAds));
    }

    // ── TOML roundtrip ─────────────────────────────────────────

    #[test]
    fn test_config_toml_roundtrip() {
        let config = PilotConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let restored: PilotConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            restored.engine.tick_interval_secs,
            config.engine.tick_interval_secs
        );
        assert_eq!(
            restored.guardrails.confidence_threshold,
            config.guardrails.confidence_threshold
        );
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let raw = r#"
            [guardrails]
            confidence_threshold = 0.9
            automation_level = "full"
        "#;
        let config: PilotConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.guardrails.confidence_threshold, 0.9);
        assert_eq!(config.guardrails.automation_level, "full");
        // Untouched sections keep their defaults
        assert_eq!(config.engine.tick_interval_secs, 900);
    }

    // ── Validation ─────────────────────────────────────────────

    #[test]
    fn test_validate_default_passes() {
        let config = PilotConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_confidence() {
        let mut config = PilotConfig::default();
        config.guardrails.confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_timezone() {
        let mut config = PilotConfig::default();
        config.engine.timezone = "Mars/Olympus_Mons".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_automation_level() {
        let mut config = PilotConfig::default();
        config.guardrails.automation_level = "yolo".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_platform_key() {
        let mut config = PilotConfig::default();
        config
            .platforms
            .insert("bing_ads".into(), PlatformConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_ceiling() {
        let mut config = PilotConfig::default();
        config
            .guardrails
            .platform_ceilings
            .insert("google_ads".into(), -100.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_full_automation_warns() {
        let mut config = PilotConfig::default();
        config.guardrails.automation_level = "full".into();
        let warnings = config.validate().unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.field == "guardrails.automation_level"
                && w.severity == WarningSeverity::Warning));
    }

    // ── Loader ─────────────────────────────────────────────────

    #[test]
    fn test_loader_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adpilot.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[engine]\ntick_interval_secs = 300\n\n[guardrails]\nmajor_change_fraction = 0.1"
        )
        .unwrap();

        let loader = ConfigLoader::load(Some(&path)).unwrap();
        let config = loader.get();
        assert_eq!(config.engine.tick_interval_secs, 300);
        assert_eq!(config.guardrails.major_change_fraction, 0.1);
    }

    #[test]
    fn test_loader_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let loader = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(loader.get().engine.tick_interval_secs, 900);
    }

    #[test]
    fn test_loader_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adpilot.toml");
        std::fs::write(&path, "[guardrails]\nconfidence_threshold = 9.0\n").unwrap();
        assert!(ConfigLoader::load(Some(&path)).is_err());
    }

    #[test]
    fn test_loader_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adpilot.toml");
        std::fs::write(&path, "[engine]\ntick_interval_secs = 300\n").unwrap();
        let loader = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(loader.get().engine.tick_interval_secs, 300);

        std::fs::write(&path, "[engine]\ntick_interval_secs = 600\n").unwrap();
        loader.reload().unwrap();
        assert_eq!(loader.get().engine.tick_interval_secs, 600);
    }
}
