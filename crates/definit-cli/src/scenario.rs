//! Scenario files: two state snapshots written as JSON.
//!
//! Plain JSON becomes plain values. A few tagged objects describe what JSON
//! cannot express on its own:
//!
//! - `{"$resource": "label"}` -- a resource; every occurrence of a label, in
//!   either snapshot, is the same resource
//! - `{"$opaque": "label"}` -- an opaque value, shared per label the same way
//! - `{"$anchor": "name", "value": [...] | {...}}` -- a composite registered
//!   before its children are built, so it can contain itself
//! - `{"$ref": "name"}` -- the anchored composite
//! - `{"$nan": true}` -- a NaN number

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::warn;

use definit_engine::{CleanupFailure, Map, ResourceFn, Seq, Value};

/// Labels of resources in the order their cleanup ran.
pub type ReleaseLog = Rc<RefCell<Vec<String>>>;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    prev: Json,
    #[serde(default)]
    next: Option<Json>,
    #[serde(default)]
    failing: Vec<String>,
}

/// A parsed scenario, ready to hand to the engine.
pub struct Scenario {
    pub prev: Value,
    pub next: Value,
    /// Resource labels in order of first appearance.
    pub resources: Vec<String>,
    /// Labels whose cleanup returns an error.
    pub failing: HashSet<String>,
    pub log: ReleaseLog,
}

impl Scenario {
    /// Labels released so far, in order.
    pub fn released(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

/// Read and parse a scenario file.
pub fn load(path: &Path) -> anyhow::Result<Scenario> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    parse(&text).with_context(|| format!("parsing scenario {}", path.display()))
}

/// Parse a scenario from JSON text.
pub fn parse(text: &str) -> anyhow::Result<Scenario> {
    let file: ScenarioFile = serde_json::from_str(text)?;
    let mut builder = Builder::new(file.failing.iter().cloned().collect());

    let prev = builder.build(&file.prev).context("in `prev`")?;
    let next = match &file.next {
        Some(node) => builder.build(node).context("in `next`")?,
        None => Value::Undefined,
    };

    for label in &file.failing {
        if !builder.resources.contains_key(label) {
            warn!(resource = %label, "failing label does not name a resource in this scenario");
        }
    }

    Ok(Scenario {
        prev,
        next,
        resources: builder.order,
        failing: builder.failing,
        log: builder.log,
    })
}

struct Builder {
    failing: HashSet<String>,
    log: ReleaseLog,
    resources: HashMap<String, Value>,
    order: Vec<String>,
    opaques: HashMap<String, Value>,
    anchors: HashMap<String, Value>,
}

impl Builder {
    fn new(failing: HashSet<String>) -> Self {
        Self {
            failing,
            log: ReleaseLog::default(),
            resources: HashMap::new(),
            order: Vec::new(),
            opaques: HashMap::new(),
            anchors: HashMap::new(),
        }
    }

    fn build(&mut self, node: &Json) -> anyhow::Result<Value> {
        match node {
            Json::Array(items) => {
                let seq = Seq::new();
                self.fill_seq(&seq, items)?;
                Ok(Value::Seq(seq))
            }
            Json::Object(entries) => {
                if let Some(label) = entries.get("$resource") {
                    return Ok(self.resource(tag_name("$resource", label)?));
                }
                if let Some(label) = entries.get("$opaque") {
                    let label = tag_name("$opaque", label)?;
                    let value = self
                        .opaques
                        .entry(label.to_string())
                        .or_insert_with(|| Value::opaque(label.to_string()));
                    return Ok(value.clone());
                }
                if let Some(name) = entries.get("$ref") {
                    let name = tag_name("$ref", name)?;
                    return self
                        .anchors
                        .get(name)
                        .cloned()
                        .ok_or_else(|| anyhow!("reference to undefined anchor `{name}`"));
                }
                if entries.contains_key("$nan") {
                    return Ok(Value::nan());
                }
                if let Some(name) = entries.get("$anchor") {
                    let name = tag_name("$anchor", name)?.to_string();
                    let body = entries
                        .get("value")
                        .ok_or_else(|| anyhow!("anchor `{name}` has no `value`"))?;
                    return self.anchor(name, body);
                }

                let map = Map::new();
                self.fill_map(&map, entries)?;
                Ok(Value::Map(map))
            }
            primitive => Ok(Value::from_json(primitive)),
        }
    }

    fn anchor(&mut self, name: String, body: &Json) -> anyhow::Result<Value> {
        if self.anchors.contains_key(&name) {
            bail!("anchor `{name}` is defined twice");
        }
        match body {
            Json::Array(items) => {
                let seq = Seq::new();
                self.anchors.insert(name, Value::Seq(seq.clone()));
                self.fill_seq(&seq, items)?;
                Ok(Value::Seq(seq))
            }
            Json::Object(entries) => {
                let map = Map::new();
                self.anchors.insert(name, Value::Map(map.clone()));
                self.fill_map(&map, entries)?;
                Ok(Value::Map(map))
            }
            _ => bail!("anchor `{name}` must wrap an array or an object"),
        }
    }

    fn fill_seq(&mut self, seq: &Seq, items: &[Json]) -> anyhow::Result<()> {
        for (index, item) in items.iter().enumerate() {
            let value = self.build(item).with_context(|| format!("at index {index}"))?;
            seq.push(value);
        }
        Ok(())
    }

    fn fill_map(&mut self, map: &Map, entries: &serde_json::Map<String, Json>) -> anyhow::Result<()> {
        for (key, item) in entries {
            let value = self.build(item).with_context(|| format!("at key `{key}`"))?;
            map.insert(key.clone(), value);
        }
        Ok(())
    }

    fn resource(&mut self, label: &str) -> Value {
        if let Some(existing) = self.resources.get(label) {
            return existing.clone();
        }

        let log = Rc::clone(&self.log);
        let fails = self.failing.contains(label);
        let name = label.to_string();
        let value = Value::resource(ResourceFn::new(label, move || {
            log.borrow_mut().push(name.clone());
            if fails {
                return Err(CleanupFailure::new(format!("{name} is configured to fail")).into());
            }
            Ok(())
        }));

        self.order.push(label.to_string());
        self.resources.insert(label.to_string(), value.clone());
        value
    }
}

fn tag_name<'a>(tag: &str, value: &'a Json) -> anyhow::Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| anyhow!("`{tag}` expects a string, got {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use definit_engine::{classify, same_value, Category};

    #[test]
    fn same_label_is_same_resource_across_snapshots() {
        let scenario = parse(
            r#"{
                "prev": {"a": {"$resource": "db"}},
                "next": [{"$resource": "db"}]
            }"#,
        )
        .unwrap();

        let in_prev = scenario.prev.as_map().unwrap().get("a").unwrap();
        let in_next = scenario.next.as_seq().unwrap().get(0).unwrap();
        assert!(same_value(&in_prev, &in_next));
        assert_eq!(scenario.resources, vec!["db"]);
    }

    #[test]
    fn missing_next_is_undefined() {
        let scenario = parse(r#"{"prev": [1, "two", null]}"#).unwrap();
        assert!(scenario.next.is_undefined());
        assert_eq!(classify(&scenario.prev), Category::Sequence);
    }

    #[test]
    fn anchors_allow_self_reference() {
        let scenario = parse(
            r#"{
                "prev": {"$anchor": "root", "value": {"self": {"$ref": "root"}, "r": {"$resource": "r"}}},
                "next": {"$ref": "root"}
            }"#,
        )
        .unwrap();

        let root = scenario.prev.as_map().unwrap();
        assert!(same_value(&root.get("self").unwrap(), &scenario.prev));
        assert!(same_value(&scenario.prev, &scenario.next));
        root.remove("self");
    }

    #[test]
    fn opaque_and_nan_tags() {
        let scenario = parse(
            r#"{"prev": [{"$opaque": "handle"}, {"$opaque": "handle"}, {"$nan": true}]}"#,
        )
        .unwrap();
        let seq = scenario.prev.as_seq().unwrap();
        assert_eq!(classify(&seq.get(0).unwrap()), Category::Opaque);
        assert!(same_value(&seq.get(0).unwrap(), &seq.get(1).unwrap()));
        assert!(same_value(&seq.get(2).unwrap(), &Value::nan()));
    }

    #[test]
    fn undefined_anchor_is_an_error() {
        let err = parse(r#"{"prev": {"x": {"$ref": "nowhere"}}}"#).err().unwrap();
        let chain = format!("{err:#}");
        assert!(chain.contains("undefined anchor `nowhere`"), "{chain}");
        assert!(chain.contains("at key `x`"), "{chain}");
    }

    #[test]
    fn duplicate_anchor_is_an_error() {
        let err = parse(
            r#"{"prev": [{"$anchor": "a", "value": []}, {"$anchor": "a", "value": []}]}"#,
        )
        .err()
        .unwrap();
        assert!(format!("{err:#}").contains("defined twice"));
    }

    #[test]
    fn non_string_tag_is_an_error() {
        assert!(parse(r#"{"prev": {"$resource": 7}}"#).is_err());
    }

    #[test]
    fn unknown_top_level_field_is_rejected() {
        assert!(parse(r#"{"prev": [], "extra": 1}"#).is_err());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"prev": [{{"$resource": "r"}}], "failing": ["r"]}}"#).unwrap();

        let scenario = load(file.path()).unwrap();
        assert_eq!(scenario.resources, vec!["r"]);
        assert!(scenario.failing.contains("r"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load(Path::new("/definitely/not/here.json")).err().unwrap();
        assert!(err.to_string().starts_with("reading scenario"));
    }
}
