use super::*;

#[test]
fn config_defaults_are_sane() {
    let cfg = Config::default();
    assert_eq!(cfg.buffer_pool_pages, 256);
    assert_eq!(cfg.replacement_strategy, ReplacementStrategy::Lru);
}

#[test]
fn config_builder_overrides_defaults() {
    let cfg = Config::builder()
        .data_dir(PathBuf::from("/tmp/pages"))
        .buffer_pool_pages(8)
        .replacement_strategy(ReplacementStrategy::Fifo)
        .build();
    assert_eq!(cfg.data_dir, PathBuf::from("/tmp/pages"));
    assert_eq!(cfg.buffer_pool_pages, 8);
    assert_eq!(cfg.replacement_strategy, ReplacementStrategy::Fifo);
}

#[test]
fn db_error_formats_cleanly() {
    let err = DbError::ReadNonExistingPage("page 9 out of range".into());
    assert!(format!("{err}").contains("page 9 out of range"));
}

#[test]
fn lru_k_normalizes_to_lru() {
    assert_eq!(ReplacementStrategy::LruK.normalized(), ReplacementStrategy::Lru);
    assert_eq!(ReplacementStrategy::Fifo.normalized(), ReplacementStrategy::Fifo);
}
