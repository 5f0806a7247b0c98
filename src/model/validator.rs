//! Structural validation of the supplied data model
//!
//! Operates on raw JSON so every diagnostic can reference the offending
//! entity, attribute or index by name, then produces the typed, defaulted
//! model. Missing `indexes` / `relationships` / `options` default rather
//! than fail; wrong shapes and unknown keys are rejected.

use indexmap::IndexMap;
use serde_json::Value;

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::model::{
    AttributeDefinition, DataModel, DefaultValue, EntityDefinition, EntityOptions, IndexAlgorithm,
    IndexChoice, IndexDefinition, LengthOrValues,
};

const ENTITY_KEYS: &[&str] = &["module", "attributes", "indexes", "relationships", "options"];
const ATTRIBUTE_KEYS: &[&str] = &["type", "lengthOrValues", "default", "allowNull"];
const INDEX_KEYS: &[&str] = &["attribute", "indexName", "indexChoice", "type"];
const OPTION_KEYS: &[&str] = &["enforceLockingConstraints", "isAuditEnabled"];

/// Validate a raw data model against the connection configuration and
/// produce the typed model
pub fn validate_model(raw: &Value, config: &ConnectionConfig) -> Result<DataModel> {
    let entities = raw
        .as_object()
        .ok_or_else(|| Error::Config("Data model must be a JSON object of entities".to_string()))?;

    let entity_names: Vec<&String> = entities.keys().collect();
    let mut model = IndexMap::new();

    for (entity_name, entity_raw) in entities {
        let entity = validate_entity(entity_name, entity_raw, &entity_names, config)?;
        model.insert(entity_name.clone(), entity);
    }

    Ok(model)
}

fn validate_entity(
    entity_name: &str,
    raw: &Value,
    entity_names: &[&String],
    config: &ConnectionConfig,
) -> Result<EntityDefinition> {
    let obj = raw.as_object().ok_or_else(|| {
        Error::Config(format!("Entity '{entity_name}' must be a JSON object"))
    })?;

    for key in obj.keys() {
        if !ENTITY_KEYS.contains(&key.as_str()) {
            return Err(Error::Config(format!(
                "Entity '{entity_name}' has unknown key '{key}'"
            )));
        }
    }

    let module = obj
        .get("module")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::Config(format!("Entity '{entity_name}' must declare a 'module' string"))
        })?
        .to_string();

    if config.schema_for_module(&module).is_none() {
        return Err(Error::Integrity(format!(
            "Entity '{entity_name}' references module '{module}' which is not in the module schema mapping"
        )));
    }

    let attributes = validate_attributes(entity_name, obj.get("attributes"))?;
    let indexes = validate_indexes(entity_name, obj.get("indexes"), &attributes)?;
    let relationships = validate_relationships(entity_name, obj.get("relationships"), entity_names)?;
    let options = validate_options(entity_name, obj.get("options"))?;

    Ok(EntityDefinition {
        module,
        attributes,
        indexes,
        relationships,
        options,
    })
}

fn validate_attributes(
    entity_name: &str,
    raw: Option<&Value>,
) -> Result<IndexMap<String, AttributeDefinition>> {
    let attrs = raw
        .and_then(Value::as_object)
        .ok_or_else(|| {
            Error::Config(format!(
                "Entity '{entity_name}' must declare an 'attributes' object"
            ))
        })?;

    if attrs.is_empty() {
        return Err(Error::Config(format!(
            "Entity '{entity_name}' must declare at least one attribute"
        )));
    }

    let mut result = IndexMap::new();
    for (attr_name, attr_raw) in attrs {
        result.insert(
            attr_name.clone(),
            validate_attribute(entity_name, attr_name, attr_raw)?,
        );
    }
    Ok(result)
}

fn validate_attribute(
    entity_name: &str,
    attr_name: &str,
    raw: &Value,
) -> Result<AttributeDefinition> {
    let obj = raw.as_object().ok_or_else(|| {
        Error::Config(format!(
            "Attribute '{attr_name}' of entity '{entity_name}' must be a JSON object"
        ))
    })?;

    let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    keys.sort_unstable();
    let mut expected: Vec<&str> = ATTRIBUTE_KEYS.to_vec();
    expected.sort_unstable();
    if keys != expected {
        return Err(Error::Config(format!(
            "Attribute '{attr_name}' of entity '{entity_name}' must have exactly the keys {}",
            ATTRIBUTE_KEYS.join(", ")
        )));
    }

    let sql_type = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::Config(format!(
                "Attribute '{attr_name}' of entity '{entity_name}' must have a string 'type'"
            ))
        })?
        .to_string();

    let length_or_values = match &obj["lengthOrValues"] {
        Value::Null => None,
        Value::Number(n) => Some(LengthOrValues::Length(n.as_i64().ok_or_else(|| {
            Error::Config(format!(
                "Attribute '{attr_name}' of entity '{entity_name}' has a non-integer lengthOrValues"
            ))
        })?)),
        Value::String(s) => Some(LengthOrValues::Values(s.clone())),
        _ => {
            return Err(Error::Config(format!(
                "Attribute '{attr_name}' of entity '{entity_name}' has an invalid lengthOrValues; expected null, an integer or a value list"
            )))
        }
    };

    let default = parse_default(entity_name, attr_name, &obj["default"])?;

    let allow_null = obj["allowNull"].as_bool().ok_or_else(|| {
        Error::Config(format!(
            "Attribute '{attr_name}' of entity '{entity_name}' must have a boolean 'allowNull'"
        ))
    })?;

    Ok(AttributeDefinition {
        sql_type,
        length_or_values,
        default,
        allow_null,
    })
}

fn parse_default(entity_name: &str, attr_name: &str, raw: &Value) -> Result<Option<DefaultValue>> {
    match raw {
        Value::Null => Ok(None),
        Value::String(s) if s == "CURRENT_TIMESTAMP" => Ok(Some(DefaultValue::CurrentTimestamp)),
        Value::String(s) => Ok(Some(DefaultValue::Literal(s.clone()))),
        Value::Number(n) => Ok(Some(DefaultValue::Literal(n.to_string()))),
        Value::Bool(b) => Ok(Some(DefaultValue::Literal(
            if *b { "1" } else { "0" }.to_string(),
        ))),
        _ => Err(Error::Config(format!(
            "Attribute '{attr_name}' of entity '{entity_name}' has an invalid default"
        ))),
    }
}

fn validate_indexes(
    entity_name: &str,
    raw: Option<&Value>,
    attributes: &IndexMap<String, AttributeDefinition>,
) -> Result<Vec<IndexDefinition>> {
    let raw = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(value) => value,
    };

    let list = raw.as_array().ok_or_else(|| {
        Error::Config(format!("Entity '{entity_name}' indexes must be a JSON array"))
    })?;

    let mut seen_names: Vec<String> = Vec::new();
    let mut result = Vec::new();
    for entry in list {
        let index = validate_index(entity_name, entry, attributes)?;
        if seen_names.contains(&index.index_name) {
            return Err(Error::Config(format!(
                "Entity '{entity_name}' declares index name '{}' more than once",
                index.index_name
            )));
        }
        seen_names.push(index.index_name.clone());
        result.push(index);
    }
    Ok(result)
}

fn validate_index(
    entity_name: &str,
    raw: &Value,
    attributes: &IndexMap<String, AttributeDefinition>,
) -> Result<IndexDefinition> {
    let obj = raw.as_object().ok_or_else(|| {
        Error::Config(format!("Entity '{entity_name}' has an index that is not a JSON object"))
    })?;

    let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    keys.sort_unstable();
    let mut expected: Vec<&str> = INDEX_KEYS.to_vec();
    expected.sort_unstable();
    if keys != expected {
        return Err(Error::Config(format!(
            "An index of entity '{entity_name}' must have exactly the keys {}",
            INDEX_KEYS.join(", ")
        )));
    }

    let attribute = obj["attribute"]
        .as_str()
        .ok_or_else(|| {
            Error::Config(format!(
                "An index of entity '{entity_name}' must have a string 'attribute'"
            ))
        })?
        .to_string();

    if !attributes.contains_key(&attribute) {
        return Err(Error::Config(format!(
            "Index attribute '{attribute}' is not an attribute of entity '{entity_name}'"
        )));
    }

    let index_name = obj["indexName"]
        .as_str()
        .ok_or_else(|| {
            Error::Config(format!(
                "An index of entity '{entity_name}' must have a string 'indexName'"
            ))
        })?
        .to_string();

    let choice_raw = obj["indexChoice"].as_str().unwrap_or_default();
    let index_choice = IndexChoice::parse(choice_raw).ok_or_else(|| {
        Error::Config(format!(
            "Index '{index_name}' of entity '{entity_name}' has invalid indexChoice '{choice_raw}'; expected index, unique, spatial or fulltext"
        ))
    })?;

    let type_raw = obj["type"].as_str().unwrap_or_default();
    let index_type = IndexAlgorithm::parse(type_raw).ok_or_else(|| {
        Error::Config(format!(
            "Index '{index_name}' of entity '{entity_name}' has invalid type '{type_raw}'; expected BTREE or HASH"
        ))
    })?;

    Ok(IndexDefinition {
        attribute,
        index_name,
        index_choice,
        index_type,
    })
}

fn validate_relationships(
    entity_name: &str,
    raw: Option<&Value>,
    entity_names: &[&String],
) -> Result<IndexMap<String, Vec<String>>> {
    let raw = match raw {
        None | Some(Value::Null) => return Ok(IndexMap::new()),
        Some(value) => value,
    };

    let obj = raw.as_object().ok_or_else(|| {
        Error::Config(format!(
            "Entity '{entity_name}' relationships must be a JSON object"
        ))
    })?;

    let mut result = IndexMap::new();
    for (related, roles_raw) in obj {
        if !entity_names.iter().any(|n| *n == related) {
            return Err(Error::Config(format!(
                "Entity '{entity_name}' declares a relationship to unknown entity '{related}'"
            )));
        }

        let roles_list = roles_raw.as_array().ok_or_else(|| {
            Error::Config(format!(
                "Relationship '{related}' of entity '{entity_name}' must be an array of role names"
            ))
        })?;

        let mut roles = Vec::new();
        for role in roles_list {
            let role = role.as_str().ok_or_else(|| {
                Error::Config(format!(
                    "Relationship '{related}' of entity '{entity_name}' has a non-string role"
                ))
            })?;
            roles.push(role.to_string());
        }
        result.insert(related.clone(), roles);
    }
    Ok(result)
}

fn validate_options(entity_name: &str, raw: Option<&Value>) -> Result<EntityOptions> {
    let raw = match raw {
        None | Some(Value::Null) => return Ok(EntityOptions::default()),
        Some(value) => value,
    };

    let obj = raw.as_object().ok_or_else(|| {
        Error::Config(format!("Entity '{entity_name}' options must be a JSON object"))
    })?;

    for key in obj.keys() {
        if !OPTION_KEYS.contains(&key.as_str()) {
            return Err(Error::Config(format!(
                "Entity '{entity_name}' options has unknown key '{key}'"
            )));
        }
    }

    let mut options = EntityOptions::default();
    if let Some(value) = obj.get("enforceLockingConstraints") {
        options.enforce_locking_constraints = value.as_bool().ok_or_else(|| {
            Error::Config(format!(
                "Entity '{entity_name}' option enforceLockingConstraints must be a boolean"
            ))
        })?;
    }
    if let Some(value) = obj.get("isAuditEnabled") {
        options.is_audit_enabled = value.as_bool().ok_or_else(|| {
            Error::Config(format!(
                "Entity '{entity_name}' option isAuditEnabled must be a boolean"
            ))
        })?;
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn test_config() -> ConnectionConfig {
        serde_json::from_value(json!({
            "host": "localhost",
            "user": "root",
            "password": "secret",
            "database": "app_db",
            "port": 3306,
            "ssl": null,
            "moduleSchemaMapping": [
                {"moduleName": "main", "schemaName": "app_db"}
            ]
        }))
        .unwrap()
    }

    fn sample_model() -> Value {
        json!({
            "exampleEntityOne": {
                "module": "main",
                "attributes": {
                    "exampleOneBigInt": {
                        "type": "bigint",
                        "lengthOrValues": 20,
                        "default": null,
                        "allowNull": true
                    }
                },
                "indexes": [
                    {
                        "attribute": "exampleOneBigInt",
                        "indexName": "exampleEntityOne_exampleOneBigInt",
                        "indexChoice": "index",
                        "type": "BTREE"
                    }
                ],
                "relationships": {},
                "options": {"enforceLockingConstraints": true}
            },
            "exampleEntityTwo": {
                "module": "main",
                "attributes": {
                    "exampleTwoText": {
                        "type": "text",
                        "lengthOrValues": null,
                        "default": null,
                        "allowNull": true
                    }
                },
                "relationships": {
                    "exampleEntityOne": ["relationshipOne", "relationshipTwo"]
                }
            }
        })
    }

    #[test]
    fn test_valid_model() {
        let model = validate_model(&sample_model(), &test_config()).unwrap();
        assert_eq!(model.len(), 2);

        let one = &model["exampleEntityOne"];
        assert_eq!(one.module, "main");
        assert_eq!(one.attributes.len(), 1);
        assert_eq!(one.indexes.len(), 1);
        assert_eq!(one.indexes[0].index_choice, IndexChoice::Index);
        assert_eq!(one.indexes[0].index_type, IndexAlgorithm::BTree);
        assert!(one.options.enforce_locking_constraints);
        assert!(one.options.is_audit_enabled);

        let two = &model["exampleEntityTwo"];
        assert_eq!(
            two.relationships["exampleEntityOne"],
            vec!["relationshipOne", "relationshipTwo"]
        );
        // omitted sections default
        assert!(two.indexes.is_empty());
        assert!(two.options.enforce_locking_constraints);
    }

    #[test]
    fn test_empty_model_is_valid() {
        let model = validate_model(&json!({}), &test_config()).unwrap();
        assert!(model.is_empty());
    }

    #[test]
    fn test_entity_order_is_preserved() {
        let model = validate_model(&sample_model(), &test_config()).unwrap();
        let names: Vec<&String> = model.keys().collect();
        assert_eq!(names, vec!["exampleEntityOne", "exampleEntityTwo"]);
    }

    #[test]
    fn test_model_must_be_object() {
        let err = validate_model(&json!([1, 2]), &test_config()).unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn test_missing_module() {
        let model = json!({"thing": {"attributes": {"a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}}}});
        let err = validate_model(&model, &test_config()).unwrap_err();
        assert!(err.to_string().contains("'thing'"));
        assert!(err.to_string().contains("module"));
    }

    #[test]
    fn test_unknown_module_is_integrity_error() {
        let model = json!({"thing": {"module": "billing", "attributes": {"a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}}}});
        let err = validate_model(&model, &test_config()).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
        assert!(err.to_string().contains("billing"));
    }

    #[test]
    fn test_missing_attributes() {
        let model = json!({"thing": {"module": "main"}});
        let err = validate_model(&model, &test_config()).unwrap_err();
        assert!(err.to_string().contains("attributes"));
    }

    #[test]
    fn test_empty_attributes() {
        let model = json!({"thing": {"module": "main", "attributes": {}}});
        let err = validate_model(&model, &test_config()).unwrap_err();
        assert!(err.to_string().contains("at least one attribute"));
    }

    #[test]
    fn test_attribute_key_set_must_match_exactly() {
        let extra = json!({"thing": {"module": "main", "attributes": {
            "a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true, "comment": "x"}
        }}});
        let err = validate_model(&extra, &test_config()).unwrap_err();
        assert!(err.to_string().contains("exactly the keys"));

        let missing = json!({"thing": {"module": "main", "attributes": {
            "a": {"type": "text", "lengthOrValues": null, "allowNull": true}
        }}});
        let err = validate_model(&missing, &test_config()).unwrap_err();
        assert!(err.to_string().contains("exactly the keys"));
    }

    #[test]
    fn test_current_timestamp_sentinel() {
        let model = json!({"thing": {"module": "main", "attributes": {
            "updated": {"type": "datetime", "lengthOrValues": null, "default": "CURRENT_TIMESTAMP", "allowNull": false}
        }}});
        let model = validate_model(&model, &test_config()).unwrap();
        assert_eq!(
            model["thing"].attributes["updated"].default,
            Some(DefaultValue::CurrentTimestamp)
        );
    }

    #[test]
    fn test_numeric_default_becomes_literal() {
        let model = json!({"thing": {"module": "main", "attributes": {
            "count": {"type": "int", "lengthOrValues": 11, "default": 0, "allowNull": false}
        }}});
        let model = validate_model(&model, &test_config()).unwrap();
        assert_eq!(
            model["thing"].attributes["count"].default,
            Some(DefaultValue::Literal("0".to_string()))
        );
        assert_eq!(
            model["thing"].attributes["count"].length_or_values,
            Some(LengthOrValues::Length(11))
        );
    }

    #[test]
    fn test_enum_values_parse() {
        let model = json!({"thing": {"module": "main", "attributes": {
            "status": {"type": "enum", "lengthOrValues": "'new','done'", "default": "new", "allowNull": false}
        }}});
        let model = validate_model(&model, &test_config()).unwrap();
        assert_eq!(
            model["thing"].attributes["status"].length_or_values,
            Some(LengthOrValues::Values("'new','done'".to_string()))
        );
    }

    #[test]
    fn test_index_key_set_must_match_exactly() {
        let model = json!({"thing": {"module": "main",
            "attributes": {"a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}},
            "indexes": [{"attribute": "a", "indexName": "thing_a", "indexChoice": "index"}]
        }});
        let err = validate_model(&model, &test_config()).unwrap_err();
        assert!(err.to_string().contains("exactly the keys"));
    }

    #[test]
    fn test_index_unknown_attribute() {
        let model = json!({"thing": {"module": "main",
            "attributes": {"a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}},
            "indexes": [{"attribute": "b", "indexName": "thing_b", "indexChoice": "index", "type": "BTREE"}]
        }});
        let err = validate_model(&model, &test_config()).unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_index_invalid_choice_and_type() {
        let bad_choice = json!({"thing": {"module": "main",
            "attributes": {"a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}},
            "indexes": [{"attribute": "a", "indexName": "thing_a", "indexChoice": "clustered", "type": "BTREE"}]
        }});
        let err = validate_model(&bad_choice, &test_config()).unwrap_err();
        assert!(err.to_string().contains("clustered"));

        let bad_type = json!({"thing": {"module": "main",
            "attributes": {"a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}},
            "indexes": [{"attribute": "a", "indexName": "thing_a", "indexChoice": "index", "type": "RTREE"}]
        }});
        let err = validate_model(&bad_type, &test_config()).unwrap_err();
        assert!(err.to_string().contains("RTREE"));
    }

    #[test]
    fn test_index_choice_is_case_insensitive() {
        let model = json!({"thing": {"module": "main",
            "attributes": {"a": {"type": "varchar", "lengthOrValues": 50, "default": null, "allowNull": true}},
            "indexes": [{"attribute": "a", "indexName": "thing_a", "indexChoice": "UNIQUE", "type": "hash"}]
        }});
        let model = validate_model(&model, &test_config()).unwrap();
        assert_eq!(model["thing"].indexes[0].index_choice, IndexChoice::Unique);
        assert_eq!(model["thing"].indexes[0].index_type, IndexAlgorithm::Hash);
    }

    #[test]
    fn test_duplicate_index_name() {
        let model = json!({"thing": {"module": "main",
            "attributes": {"a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}},
            "indexes": [
                {"attribute": "a", "indexName": "thing_a", "indexChoice": "index", "type": "BTREE"},
                {"attribute": "a", "indexName": "thing_a", "indexChoice": "unique", "type": "BTREE"}
            ]
        }});
        let err = validate_model(&model, &test_config()).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_relationship_must_be_sequence() {
        let model = json!({
            "one": {"module": "main", "attributes": {"a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}}},
            "two": {"module": "main",
                "attributes": {"b": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}},
                "relationships": {"one": "notAList"}
            }
        });
        let err = validate_model(&model, &test_config()).unwrap_err();
        assert!(err.to_string().contains("array of role names"));
    }

    #[test]
    fn test_relationship_to_unknown_entity() {
        let model = json!({"thing": {"module": "main",
            "attributes": {"a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}},
            "relationships": {"ghost": ["role"]}
        }});
        let err = validate_model(&model, &test_config()).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_unknown_entity_key() {
        let model = json!({"thing": {"module": "main", "tableName": "custom",
            "attributes": {"a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}}
        }});
        let err = validate_model(&model, &test_config()).unwrap_err();
        assert!(err.to_string().contains("tableName"));
    }

    #[test]
    fn test_partial_options_keep_defaults() {
        let model = json!({"thing": {"module": "main",
            "attributes": {"a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}},
            "options": {"enforceLockingConstraints": false}
        }});
        let model = validate_model(&model, &test_config()).unwrap();
        assert!(!model["thing"].options.enforce_locking_constraints);
        assert!(model["thing"].options.is_audit_enabled);
    }

    #[test]
    fn test_unknown_option_key() {
        let model = json!({"thing": {"module": "main",
            "attributes": {"a": {"type": "text", "lengthOrValues": null, "default": null, "allowNull": true}},
            "options": {"readOnly": true}
        }});
        let err = validate_model(&model, &test_config()).unwrap_err();
        assert!(err.to_string().contains("readOnly"));
    }
}
