//! Tests for interpose-plugins: registry, config loading, chain assembly, builtin observers

use interpose_core::*;
use interpose_plugins::*;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Executor returning `rows` rows for every query and recording what it saw.
struct Table {
    rows: usize,
    updates: AtomicUsize,
    last_bounds: Mutex<Option<RowBounds>>,
}

impl Table {
    fn new(rows: usize) -> Arc<Self> {
        Arc::new(Self {
            rows,
            updates: AtomicUsize::new(0),
            last_bounds: Mutex::new(None),
        })
    }

    fn all(&self) -> Vec<Value> {
        (0..self.rows).map(|i| json!({"n": i})).collect()
    }
}

impl Executor for Table {
    fn update(&self, statement: &Statement, _parameter: &Value) -> Result<u64> {
        if statement.id == "broken" {
            return Err(Error::execution("broken"));
        }
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }

    fn query(&self, _statement: &Statement, _parameter: &Value) -> Result<Vec<Value>> {
        Ok(self.all())
    }

    fn query_with_bounds(
        &self,
        _statement: &Statement,
        _parameter: &Value,
        bounds: RowBounds,
    ) -> Result<Vec<Value>> {
        *self.last_bounds.lock().unwrap() = Some(bounds);
        Ok(bounds.apply(self.all()))
    }

    fn commit(&self, _required: bool) -> Result<()> {
        Ok(())
    }

    fn rollback(&self, _required: bool) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> Result<bool> {
        Ok(false)
    }
}

impl CoreObject for Table {
    fn as_executor(&self) -> Option<&dyn Executor> {
        Some(self)
    }
}

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn select(id: &str) -> Statement {
    Statement::select(id, "users")
}

// ===========================================================================
// ObserverRegistry
// ===========================================================================

#[test]
fn default_registry_has_all_builtins() {
    let reg = create_default_registry();
    assert_eq!(
        reg.list(),
        vec!["read-only", "row-limit", "statement-filter", "timing"]
    );
}

#[test]
fn registry_unknown_name_is_configuration_error() {
    let reg = create_default_registry();
    let err = reg.create("pagination", &Properties::new()).err().unwrap();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("unknown plugin: pagination"));
}

#[test]
fn registry_register_replaces_existing() {
    let mut reg = create_default_registry();
    reg.register("timing", |_props: &Properties| {
        Ok(Arc::new(ReadOnlyObserver::new("replaced")) as Arc<dyn Observer>)
    });
    let observer = reg.create("timing", &Properties::new()).unwrap();
    assert_eq!(observer.name(), "read-only");
    assert_eq!(reg.list().len(), 4);
}

#[test]
fn statement_filter_requires_deny_pattern() {
    let reg = create_default_registry();
    let err = reg.create("statement-filter", &Properties::new()).err().unwrap();
    assert!(err.to_string().contains("missing required property: deny"));

    let err = reg
        .create("statement-filter", &props(&[("deny", "(unclosed")]))
        .err()
        .unwrap();
    assert!(err.is_configuration());
}

#[test]
fn row_limit_defaults_to_one_thousand_rows() {
    let observer = RowLimitObserver::from_properties(&Properties::new()).unwrap();
    assert_eq!(observer.max_rows(), RowLimitObserver::DEFAULT_MAX_ROWS);
    assert_eq!(observer.max_rows(), 1000);
}

#[test]
fn row_limit_rejects_zero() {
    let reg = create_default_registry();
    let err = reg
        .create("row-limit", &props(&[("max_rows", "0")]))
        .err()
        .unwrap();
    assert!(err.is_configuration());
}

// ===========================================================================
// PluginsConfig
// ===========================================================================

const TOML_CONFIG: &str = r#"
[[plugins]]
name = "timing"
properties = { slow_threshold_ms = "250" }

[[plugins]]
name = "read-only"
enabled = false

[[plugins]]
name = "row-limit"
properties = { max_rows = "3" }
signatures = [
    { role = "Executor", method = "query", args = ["Statement", "Object", "RowBounds"] },
]
"#;

#[test]
fn config_parses_toml() {
    let config = PluginsConfig::from_toml_str(TOML_CONFIG).unwrap();
    assert_eq!(config.plugins.len(), 3);
    assert_eq!(config.plugins[0].properties["slow_threshold_ms"], "250");
    assert!(!config.plugins[1].enabled);
    assert_eq!(config.enabled().count(), 2);
    let sigs = config.plugins[2].signatures.as_ref().unwrap();
    assert_eq!(sigs[0].args, vec!["Statement", "Object", "RowBounds"]);
}

#[test]
fn config_loads_json_by_extension() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"plugins": [{{"name": "read-only", "properties": {{"reason": "maintenance"}}}}]}}"#
    )
    .unwrap();
    let config = PluginsConfig::load(file.path()).unwrap();
    assert_eq!(config.plugins.len(), 1);
    assert_eq!(config.plugins[0].properties["reason"], "maintenance");
    assert!(config.plugins[0].enabled);
}

#[test]
fn config_loads_toml_from_disk() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(TOML_CONFIG.as_bytes()).unwrap();
    let chain = load_chain(file.path()).unwrap();
    let names: Vec<&str> = chain.list().iter().map(|b| b.name()).collect();
    assert_eq!(names, vec!["timing", "row-limit"]);
}

#[test]
fn config_missing_file_is_configuration_error() {
    let err = PluginsConfig::load(std::path::Path::new("/nonexistent/plugins.toml")).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn config_invalid_toml_is_configuration_error() {
    let err = PluginsConfig::from_toml_str("[[plugins]]\nenabled = true\n").unwrap_err();
    assert!(err.is_configuration());
}

// ===========================================================================
// build_chain
// ===========================================================================

#[test]
fn build_chain_honours_order_and_skips_disabled() {
    let config = PluginsConfig {
        plugins: vec![
            PluginEntry::new("timing"),
            PluginEntry {
                enabled: false,
                ..PluginEntry::new("read-only")
            },
            PluginEntry::new("statement-filter").property("deny", "^admin\\."),
        ],
    };
    let chain = build_chain(&config, &create_default_registry()).unwrap();
    let names: Vec<&str> = chain.list().iter().map(|b| b.name()).collect();
    assert_eq!(names, vec!["timing", "statement-filter"]);
}

#[test]
fn build_chain_fails_on_unknown_plugin() {
    let config = PluginsConfig {
        plugins: vec![PluginEntry::new("timing"), PluginEntry::new("nope")],
    };
    let err = build_chain(&config, &create_default_registry()).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn build_chain_fails_on_unresolvable_signature_override() {
    let mut entry = PluginEntry::new("timing");
    entry.signatures = Some(vec![Signature::new(Role::Executor, "flushStatements", Vec::<String>::new())]);
    let config = PluginsConfig {
        plugins: vec![entry],
    };
    let err = build_chain(&config, &create_default_registry()).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("flushStatements"));
}

#[test]
fn signature_override_narrows_interception() {
    let mut entry = PluginEntry::new("statement-filter").property("deny", "^admin\\.");
    entry.signatures = Some(vec![Signature::of(Method::ExecutorUpdate)]);
    let config = PluginsConfig {
        plugins: vec![entry],
    };
    let chain = build_chain(&config, &create_default_registry()).unwrap();
    let wrapped = chain.apply_all(Table::new(2));
    let executor = wrapped.as_executor().unwrap();

    // queries are no longer declared, so denied ids pass through
    assert_eq!(executor.query(&select("admin.dump"), &Value::Null).unwrap().len(), 2);
    let err = executor
        .update(&Statement::insert("admin.add", "users"), &json!({}))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Rejected {
            method: Method::ExecutorUpdate,
            ..
        }
    ));
}

#[test]
fn build_chain_rejects_override_outside_observer_declaration() {
    let mut entry = PluginEntry::new("timing");
    entry.signatures = Some(vec![Signature::of(Method::ExecutorCommit)]);
    let config = PluginsConfig {
        plugins: vec![entry],
    };
    let err = build_chain(&config, &create_default_registry()).unwrap_err();
    assert!(err.is_configuration());
    assert!(
        err.to_string().contains("Executor.commit(boolean)"),
        "got {err}"
    );
}

// ===========================================================================
// Builtin observers
// ===========================================================================

#[test]
fn timing_records_calls_and_failures() {
    let timing = Arc::new(TimingObserver::new(Duration::from_secs(60)));
    let binding = Binding::from_arc(timing.clone()).unwrap();
    let wrapped = binding.wrap(Table::new(3));
    let executor = wrapped.as_executor().unwrap();

    executor.query(&select("findAll"), &Value::Null).unwrap();
    executor.query(&select("findAll"), &Value::Null).unwrap();
    executor
        .update(&Statement::update("broken", "users"), &Value::Null)
        .unwrap_err();
    executor.close().unwrap();

    let find_all = timing.stats("findAll").unwrap();
    assert_eq!(find_all.calls, 2);
    assert_eq!(find_all.failures, 0);
    let broken = timing.stats("broken").unwrap();
    assert_eq!(broken.calls, 1);
    assert_eq!(broken.failures, 1);
    assert_eq!(timing.snapshot().len(), 2);
}

#[test]
fn timing_default_threshold_from_properties() {
    let timing = TimingObserver::from_properties(&Properties::new()).unwrap();
    assert!(timing.snapshot().is_empty());
    assert!(TimingObserver::from_properties(&props(&[("slow_threshold_ms", "fast")])).is_err());
}

#[test]
fn read_only_short_circuits_updates() {
    let table = Table::new(2);
    let wrapped = Binding::new(ReadOnlyObserver::new("maintenance"))
        .unwrap()
        .wrap(table.clone());
    let executor = wrapped.as_executor().unwrap();

    let err = executor
        .update(&Statement::delete("purge", "users"), &Value::Null)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "read-only rejected Executor.update(Statement, Object): maintenance"
    );
    assert_eq!(table.updates.load(Ordering::SeqCst), 0);
    assert_eq!(executor.query(&select("findAll"), &Value::Null).unwrap().len(), 2);
}

#[test]
fn statement_filter_denies_matching_ids_only() {
    let observer =
        StatementFilterObserver::from_properties(&props(&[("deny", "^admin\\.")])).unwrap();
    let wrapped = Binding::new(observer).unwrap().wrap(Table::new(1));
    let executor = wrapped.as_executor().unwrap();

    assert!(executor.query(&select("users.findAll"), &Value::Null).is_ok());
    let err = executor
        .query_with_bounds(&select("admin.dump"), &Value::Null, RowBounds::default())
        .unwrap_err();
    assert!(err.to_string().contains("statement admin.dump is denied"));
}

#[test]
fn row_limit_clamps_bounded_queries() {
    let table = Table::new(10);
    let wrapped = Binding::new(RowLimitObserver::new(4)).unwrap().wrap(table.clone());
    let executor = wrapped.as_executor().unwrap();

    let rows = executor
        .query_with_bounds(&select("page"), &Value::Null, RowBounds::new(2, 100))
        .unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], json!({"n": 2}));
    assert_eq!(*table.last_bounds.lock().unwrap(), Some(RowBounds::new(2, 4)));

    let rows = executor
        .query_with_bounds(&select("page"), &Value::Null, RowBounds::new(0, 2))
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(*table.last_bounds.lock().unwrap(), Some(RowBounds::new(0, 2)));
}

#[test]
fn row_limit_redirects_unbounded_queries() {
    let table = Table::new(10);
    let wrapped = Binding::new(RowLimitObserver::new(3)).unwrap().wrap(table.clone());
    let rows = wrapped
        .as_executor()
        .unwrap()
        .query(&select("all"), &Value::Null)
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(*table.last_bounds.lock().unwrap(), Some(RowBounds::new(0, 3)));
}

#[test]
fn filter_outside_timing_skips_timing_for_denied_statements() {
    let timing = Arc::new(TimingObserver::default());
    let mut chain = ObserverChain::new();
    chain.append(Binding::from_arc(timing.clone()).unwrap());
    chain
        .register(StatementFilterObserver::from_properties(&props(&[("deny", "secret")])).unwrap())
        .unwrap();

    let wrapped = chain.apply_all(Table::new(1));
    let executor = wrapped.as_executor().unwrap();
    executor.query(&select("secret.keys"), &Value::Null).unwrap_err();
    executor.query(&select("public"), &Value::Null).unwrap();

    assert!(timing.stats("secret.keys").is_none());
    assert_eq!(timing.stats("public").unwrap().calls, 1);
}
