//! Integration tests for preparing environments against a configured catalog.
//!
//! These tests prove that:
//! 1. A TOML config drives catalog, pool and placement end to end
//! 2. Concurrent batches keep input order and bind every environment
//! 3. Failures carry the per-dimension reasons and set the right status

use std::sync::{Arc, Once};

use envgrid_config::GridConfig;
use envgrid_placement::{CapabilitySource, CatalogEntry, InventorySource, StaticCatalog};
use envgrid_pool::{Environment, EnvironmentPool, EnvironmentStatus, PlacementDriver, PoolError};
use envgrid_space::{
    AzureHints, CountValue, EnvironmentSpace, NodeSpace, Platform, PlatformHints, Topology,
};

// ── Tracing setup ────────────────────────────────────────────────

static TRACING_INIT: Once = Once::new();

/// Controlled by `RUST_LOG` (e.g. `RUST_LOG=debug`).
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

// ── Fixtures ─────────────────────────────────────────────────────

const CONFIG: &str = r#"
[planner]
platform = "azure"
pool_keys = ["west", "east"]
concurrency = 2

[[catalog.pools]]
key = "west"

[[catalog.pools.entries]]
name = "SkuB"
core_count = 8
memory_mb = 16384

[[catalog.pools.entries]]
name = "SkuA"
core_count = 2
memory_mb = 4096

[[catalog.pools.entries]]
name = "SkuGpu"
core_count = 8
memory_mb = 16384
gpu_count = 1
features = ["gpu"]

[[catalog.pools]]
key = "east"

[[environments]]
name = "pair"

[[environments.nodes]]
node_count = 2
core_count = { min = 2 }
memory_mb = { min = 2048 }
"#;

fn driver(config: &GridConfig) -> PlacementDriver<StaticCatalog> {
    let catalog = config.catalog.as_ref().unwrap();
    let source = StaticCatalog::from_config(&config.planner, catalog).unwrap();
    PlacementDriver::new(Arc::new(source))
}

fn space(nodes: Vec<NodeSpace>) -> EnvironmentSpace {
    EnvironmentSpace::new(Topology::Subnet, nodes).unwrap()
}

fn node(cores: u64) -> NodeSpace {
    NodeSpace {
        core_count: CountValue::at_least(cores),
        ..NodeSpace::default()
    }
}

/// A discovery backend with a bug: listing candidates panics.
struct BrokenSource;

impl CapabilitySource for BrokenSource {
    fn platform(&self) -> Platform {
        Platform::Azure
    }

    fn pool_keys(&self) -> Vec<String> {
        vec!["west".to_string()]
    }

    fn list_candidates(&self, _pool_key: &str) -> Vec<CatalogEntry> {
        panic!("sku listing failed")
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_config_end_to_end() {
    init_tracing();
    let config = GridConfig::from_toml_str(CONFIG).unwrap();
    let driver = driver(&config);
    let mut pool = EnvironmentPool::from_config(&config).unwrap();

    let failures = driver
        .prepare_pool(&mut pool, config.planner.concurrency)
        .await
        .unwrap();
    assert!(failures.is_empty());

    let env = pool.get("pair").unwrap();
    assert_eq!(env.status(), EnvironmentStatus::Prepared);
    assert_eq!(env.cost(), 4);
    let plan = env.plan().unwrap();
    assert_eq!(plan.bindings(), vec![("west", "SkuA"), ("west", "SkuA")]);
    assert!(env.requirement().nodes().iter().all(NodeSpace::is_concrete));
}

#[tokio::test]
async fn test_prepare_all_keeps_order() {
    init_tracing();
    let config = GridConfig::from_toml_str(CONFIG).unwrap();
    let driver = driver(&config);

    let environments: Vec<Environment> = (0..8)
        .map(|i| {
            let cores = if i % 2 == 0 { 1 } else { 4 };
            Environment::new(Some(format!("env-{i}")), space(vec![node(cores)]), false)
        })
        .collect();

    let outcomes = driver.prepare_all(environments, 3).await.unwrap();
    assert_eq!(outcomes.len(), 8);
    for (i, (env, result)) in outcomes.iter().enumerate() {
        assert!(result.is_ok(), "{}: {:?}", env.name, result);
        assert_eq!(env.name, format!("env-{i}"));
        let expected = if i % 2 == 0 { "SkuA" } else { "SkuB" };
        assert_eq!(env.plan().unwrap().entries, vec![expected]);
    }
}

#[tokio::test]
async fn test_no_capacity_reports_reasons_and_stays_new() {
    init_tracing();
    let config = GridConfig::from_toml_str(CONFIG).unwrap();
    let driver = driver(&config);

    let mut req = node(1);
    req.gpu_count = CountValue::at_least(1);
    req.excluded_features.insert("gpu");
    let mut env = Environment::new(None, space(vec![req]), false);

    let err = driver.prepare(&mut env).unwrap_err();
    assert!(err.is_retryable());
    let message = err.to_string();
    assert!(message.contains("no satisfying environment found"), "{message}");
    assert!(message.contains("excluded_features"), "{message}");
    assert_eq!(env.status(), EnvironmentStatus::New);
}

#[tokio::test]
async fn test_conflicting_pins_mark_environment_bad() {
    init_tracing();
    let config = GridConfig::from_toml_str(CONFIG).unwrap();
    let driver = driver(&config);

    let pinned = |location: &str| NodeSpace {
        hints: Some(PlatformHints::Azure(AzureHints {
            location: Some(location.to_string()),
            ..AzureHints::default()
        })),
        ..node(1)
    };
    let mut pool = EnvironmentPool::new();
    pool.insert_predefined("split", space(vec![pinned("west"), pinned("east")]))
        .unwrap();
    pool.insert_predefined("single", space(vec![node(1)])).unwrap();

    let failures = driver.prepare_pool(&mut pool, 2).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "split");
    assert!(!failures[0].1.is_retryable());

    let names: Vec<_> = pool.iter().map(|env| env.name.as_str()).collect();
    assert_eq!(names, vec!["split", "single"]);
    assert_eq!(pool.get("split").unwrap().status(), EnvironmentStatus::Bad);
    assert_eq!(pool.get("single").unwrap().status(), EnvironmentStatus::Prepared);
}

#[tokio::test]
async fn test_prepare_requires_new_status() {
    init_tracing();
    let config = GridConfig::from_toml_str(CONFIG).unwrap();
    let driver = driver(&config);

    let mut env = Environment::new(None, space(vec![node(1)]), false);
    driver.prepare(&mut env).unwrap();

    let err = driver.prepare(&mut env).unwrap_err();
    assert!(matches!(err, PoolError::InvalidStatus { .. }));
}

#[tokio::test]
async fn test_prepared_environment_is_not_reused() {
    init_tracing();
    let config = GridConfig::from_toml_str(CONFIG).unwrap();
    let driver = driver(&config);
    let mut pool = EnvironmentPool::new();

    let requirement = space(vec![node(2)]);
    let first = pool.get_or_create(requirement.clone()).unwrap();
    let first_name = first.name.clone();
    driver.prepare(first).unwrap();

    let second = pool.get_or_create(requirement).unwrap();
    assert_ne!(second.name, first_name);
    assert_eq!(pool.len(), 2);
}

#[tokio::test]
async fn test_finite_inventory_through_driver() {
    init_tracing();
    let config = GridConfig::from_toml_str(CONFIG).unwrap();
    let catalog = config.catalog.as_ref().unwrap();
    let source = InventorySource::new(StaticCatalog::from_config(&config.planner, catalog).unwrap())
        .with_units("west", "SkuA", 1);
    let driver = PlacementDriver::new(Arc::new(source));

    let mut first = Environment::new(None, space(vec![node(1)]), false);
    driver.prepare(&mut first).unwrap();
    driver.source().reserve(first.plan().unwrap()).unwrap();

    let mut second = Environment::new(None, space(vec![node(1)]), false);
    driver.prepare(&mut second).unwrap();
    assert_eq!(second.plan().unwrap().entries, vec!["SkuB"]);
}

#[tokio::test]
async fn test_panicking_source_keeps_every_environment() {
    init_tracing();
    let driver = PlacementDriver::new(Arc::new(BrokenSource));
    let mut pool = EnvironmentPool::new();
    pool.insert_predefined("first", space(vec![node(1)])).unwrap();
    pool.insert_predefined("second", space(vec![node(2)])).unwrap();

    let failures = driver.prepare_pool(&mut pool, 2).await.unwrap();
    assert_eq!(failures.len(), 2);
    for (_, err) in &failures {
        assert!(matches!(err, PoolError::Worker(message) if message.contains("sku listing failed")));
        assert!(!err.is_retryable());
    }

    let names: Vec<_> = pool.iter().map(|env| env.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert!(pool.iter().all(|env| env.status() == EnvironmentStatus::Bad));
}
