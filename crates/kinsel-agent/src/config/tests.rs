#[cfg(test)]
mod tests {
    use super::super::*;
    use kinsel_common::{Aggregation, ConfidencePolicy};

    const EXAMPLE: &str = include_str!("../../../../kinsel.example.toml");

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml_str(EXAMPLE).unwrap();
        assert_eq!(config.datasets.len(), 4);
        assert_eq!(config.fusion.tables.len(), 3);
        assert_eq!(config.fusion.mode, BooleanMode::RelativeDifference);
        assert_eq!(config.entrez.concurrency, Some(50));

        let klaeger = config.dataset("Klaeger").unwrap();
        assert_eq!(klaeger.composite_delimiter.as_deref(), Some(";"));
        assert_eq!(klaeger.confidence, ConfidencePolicy::HighConfidenceOnly);
        assert!(klaeger.is_infinity_token("n.i."));

        let huang = config.dataset("Huang").unwrap();
        assert_eq!(huang.overrides["p38 alpha"], "MAPK14");
        assert_eq!(huang.overrides["IR"], "");

        let annes = config.dataset("Annes500").unwrap();
        assert_eq!(annes.aggregation, Aggregation::Mean);
        assert_eq!(annes.overrides["MGC42105"], "NIM1K");

        let dose = config.dose_escalation.unwrap();
        assert_eq!((dose.low.as_str(), dose.high.as_str()), ("Annes100", "Annes500"));
        assert_eq!(dose.threshold, 50.0);
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_toml_str("[entrez]\nemail = \"lab@example.org\"\n").unwrap();
        assert_eq!(config.paths.aux_dir, PathBuf::from("data_aux"));
        assert_eq!(config.entrez.tool, "kinsel");
        assert!(config.entrez.single_candidate_fallback);
        // omitted means one worker per CPU
        assert_eq!(config.entrez.concurrency, None);
        assert_eq!(config.fusion.thresholds.diff_percent_threshold, 20.0);
        assert!(config.datasets.is_empty());
        assert!(config.dose_escalation.is_none());
    }

    #[test]
    fn test_aux_table_path() {
        let paths = PathsConfig::default();
        assert_eq!(paths.aux_table("Huang"), PathBuf::from("data_aux/Huang.csv"));
    }

    #[test]
    fn test_fusion_table_must_name_known_dataset() {
        let toml = r#"
            [entrez]
            email = "lab@example.org"

            [[fusion.tables]]
            dataset = "Davis"
            scheme = "apparent_kd"
            probe_column = "STF1081"
            reference_column = "CC401"
        "#;
        let err = Config::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("Davis"));
    }

    #[test]
    fn test_fusion_column_must_exist() {
        let toml = r#"
            [entrez]
            email = "lab@example.org"

            [[fusion.tables]]
            dataset = "Huang"
            scheme = "percent_activity_remaining"
            probe_column = "STF1081"
            reference_column = "CC401"

            [[datasets]]
            name = "Huang"
            file = "Huang.csv"
            value_columns = ["STF1081", "HTH01091"]
        "#;
        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_duplicate_dataset_rejected() {
        let toml = r#"
            [entrez]
            email = "lab@example.org"

            [[datasets]]
            name = "Huang"
            file = "Huang.csv"
            value_columns = ["STF1081"]

            [[datasets]]
            name = "Huang"
            file = "Huang2.csv"
            value_columns = ["STF1081"]
        "#;
        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let toml = r#"
            [entrez]
            email = "lab@example.org"

            [fusion.thresholds]
            min_percent_threshold = 90
            max_percent_threshold = 10
        "#;
        assert!(Config::from_toml_str(toml).is_err());
    }
}
