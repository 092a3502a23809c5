use fax_broadcast::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../fax-broadcast.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(cfg.product.require_test_fax);
    assert_eq!(cfg.intake.progress_step, 10);
    assert_eq!(cfg.time_zones.len(), 8);
    assert_eq!(cfg.time_zones[0].name, "Honolulu");
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let cfg: Config = toml::from_str("[product]\nrequire_test_fax = false\n").expect("parse TOML");
    assert!(!cfg.product.require_test_fax);
    assert_eq!(cfg.intake.max_file_bytes, 10 * 1024 * 1024);
    assert_eq!(cfg.time_zones.len(), 8);
    assert_eq!(cfg.logging.level, "info");
}
