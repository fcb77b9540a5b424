//! YAML alias expansion for rendered CI workflows.
//!
//! Workflow templates share step definitions through anchors declared under
//! a top-level `_anchors` key. CI runners do not all accept merge keys, so the
//! rendered file is rewritten with every alias and merge expanded and the
//! `_anchors` section dropped.

use serde_yaml::Value;

const ANCHORS_KEY: &str = "_anchors";

/// Expand aliases and merge keys in `source` and drop the `_anchors` section.
pub fn interpolate(source: &str) -> Result<String, serde_yaml::Error> {
    let mut value: Value = serde_yaml::from_str(source)?;
    value.apply_merge()?;
    if let Value::Mapping(map) = &mut value {
        map.remove(ANCHORS_KEY);
    }
    serde_yaml::to_string(&value)
}
