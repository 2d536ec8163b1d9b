use repo_audit::config::{CleanupPolicy, Config};

#[test]
fn parse_example_config() {
    let raw = include_str!("../repo-audit.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(!cfg.paths.out_dir.is_empty());
    assert!(!cfg.paths.work_dir.is_empty());
    assert_eq!(cfg.cleanup.policy, CleanupPolicy::RemoveUnknown);
    assert!(cfg.limits.stage_timeout_seconds > 0);
    assert_eq!(cfg.entry.python_candidates[0], "main.py");
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let cfg: Config = toml::from_str("[tools]\npython = \"python3.12\"\n").expect("parse TOML");
    assert_eq!(cfg.tools.python, "python3.12");
    assert_eq!(cfg.tools.git, "git");
    assert!(cfg.validation.enabled);
    assert!(!cfg.preview.open_in_browser);
}

#[test]
fn cleanup_policy_is_snake_case() {
    let cfg: Config = toml::from_str("[cleanup]\npolicy = \"remove_all\"\n").expect("parse TOML");
    assert_eq!(cfg.cleanup.policy, CleanupPolicy::RemoveAll);
    assert!(toml::from_str::<Config>("[cleanup]\npolicy = \"RemoveAll\"\n").is_err());
}
