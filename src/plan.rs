//! Schema-driven planning.
//!
//! [`plan_resource`] compares prior state with the proposed configuration and
//! works out the planned state, the attribute changes and whether the resource
//! has to be replaced. Every resource in this provider plans the same way, so
//! the rules live here rather than in each adapter.

use crate::schema::{Attribute, AttributeType, Schema};
use crate::types::{AttributeChange, PlanResult};
use crate::validation::values_equal;
use serde_json::{Map, Value};

/// Plan a resource change.
///
/// - `proposed` is `null`: the resource is destroyed.
/// - `prior` is absent or `null`: the resource is created. Unset attributes take
///   their default; computed-only attributes are unknown (`null`).
/// - Otherwise the resource is updated. Configured values win, unset attributes
///   fall back to their default or, when computed, to the prior value.
///   A changed force-new attribute forces replacement, and values the provider
///   computes become unknown again.
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.filter(|v| !v.is_null());

    if proposed.is_null() {
        return plan_destroy(schema, prior);
    }

    match prior {
        None => plan_create(schema, proposed),
        Some(prior) => plan_update(schema, prior, proposed),
    }
}

fn plan_destroy(schema: &Schema, prior: Option<&Value>) -> PlanResult {
    let changes = schema
        .attributes
        .keys()
        .filter_map(|name| {
            let before = field(prior, name);
            (!before.is_null()).then(|| AttributeChange::removed(name.as_str(), before.clone()))
        })
        .collect();
    PlanResult::destroy(changes)
}

fn plan_create(schema: &Schema, proposed: &Value) -> PlanResult {
    let mut planned = Map::new();
    let mut changes = Vec::new();

    for (name, attr) in &schema.attributes {
        let value = if attr.is_computed_only() {
            Value::Null
        } else {
            configured_or_default(attr, field(Some(proposed), name))
        };
        if !value.is_null() {
            changes.push(AttributeChange::added(name.as_str(), value.clone()));
        }
        planned.insert(name.clone(), value);
    }

    PlanResult::with_changes(Value::Object(planned), changes, false)
}

fn plan_update(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let mut planned = Map::new();
    let mut changes = Vec::new();
    let mut requires_replace = false;
    // Attributes whose planned value was carried over from prior state
    // because the provider computes them.
    let mut carried = Vec::new();

    for (name, attr) in &schema.attributes {
        let before = field(Some(prior), name);
        let configured = field(Some(proposed), name);

        let after = if attr.is_computed_only() {
            carried.push(name.clone());
            before.clone()
        } else if !configured.is_null() {
            configured.clone()
        } else if let Some(default) = &attr.default {
            default.clone()
        } else if attr.flags.computed {
            carried.push(name.clone());
            before.clone()
        } else {
            Value::Null
        };

        if !equivalent(&attr.attr_type, before, &after) {
            if attr.force_new {
                requires_replace = true;
            }
            changes.push(match (before.is_null(), after.is_null()) {
                (true, _) => AttributeChange::added(name.as_str(), after.clone()),
                (false, true) => AttributeChange::removed(name.as_str(), before.clone()),
                (false, false) => AttributeChange::modified(name.as_str(), before.clone(), after.clone()),
            });
        }

        planned.insert(name.clone(), after);
    }

    if requires_replace {
        for name in carried {
            planned.insert(name, Value::Null);
        }
    }

    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn configured_or_default(attr: &Attribute, configured: &Value) -> Value {
    if configured.is_null() {
        attr.default.clone().unwrap_or(Value::Null)
    } else {
        configured.clone()
    }
}

fn field<'a>(object: Option<&'a Value>, name: &str) -> &'a Value {
    object.and_then(|v| v.get(name)).unwrap_or(&Value::Null)
}

/// Compare two values of the given type.
///
/// Sets compare without regard to order; numbers compare by numeric value.
pub(crate) fn equivalent(attr_type: &AttributeType, a: &Value, b: &Value) -> bool {
    match (attr_type, a, b) {
        (AttributeType::Set(element_type), Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|x| ys.iter().any(|y| equivalent(element_type, x, y)))
                && ys
                    .iter()
                    .all(|y| xs.iter().any(|x| equivalent(element_type, x, y)))
        }
        (AttributeType::List(element_type), Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| equivalent(element_type, x, y))
        }
        (AttributeType::Object(fields), Value::Object(xs), Value::Object(ys)) => {
            fields.iter().all(|(name, field_type)| {
                equivalent(
                    field_type,
                    xs.get(name).unwrap_or(&Value::Null),
                    ys.get(name).unwrap_or(&Value::Null),
                )
            })
        }
        _ => values_equal(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeFlags;
    use serde_json::json;

    fn alert_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("type", Attribute::required_string().with_force_new())
            .with_attribute("email_to", Attribute::required_string())
            .with_attribute("frequency", Attribute::optional_string())
            .with_attribute("percentage", Attribute::optional_int64())
    }

    fn teammate_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("email", Attribute::required_string().with_force_new())
            .with_attribute("is_admin", Attribute::optional_bool().with_default(json!(false)))
            .with_attribute("scopes", Attribute::string_set(AttributeFlags::optional_computed()))
            .with_attribute("pending", Attribute::computed_bool())
    }

    #[test]
    fn test_plan_create() {
        let plan = plan_resource(
            &teammate_schema(),
            None,
            &json!({"email": "dev@example.com", "scopes": ["mail.send"]}),
        );

        assert!(!plan.requires_replace);
        assert_eq!(
            plan.planned_state,
            json!({
                "id": null,
                "email": "dev@example.com",
                "is_admin": false,
                "scopes": ["mail.send"],
                "pending": null,
            })
        );
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["email", "is_admin", "scopes"]);
        assert!(plan.changes.iter().all(|c| c.before.is_none()));
    }

    #[test]
    fn test_plan_create_with_null_prior() {
        let plan = plan_resource(&alert_schema(), Some(&Value::Null), &json!({"type": "usage_limit"}));
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.planned_state["id"], Value::Null);
    }

    #[test]
    fn test_plan_destroy() {
        let prior = json!({"id": "7", "type": "usage_limit", "email_to": "a@b.c", "frequency": null, "percentage": 90});
        let plan = plan_resource(&alert_schema(), Some(&prior), &Value::Null);

        assert!(plan.is_destroy());
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["email_to", "id", "percentage", "type"]);
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
    }

    #[test]
    fn test_plan_no_change_carries_computed() {
        let prior = json!({"id": "7", "type": "usage_limit", "email_to": "a@b.c", "frequency": null, "percentage": 90});
        let plan = plan_resource(
            &alert_schema(),
            Some(&prior),
            &json!({"type": "usage_limit", "email_to": "a@b.c", "percentage": 90.0}),
        );

        assert!(!plan.has_changes(), "{:?}", plan.changes);
        assert_eq!(plan.planned_state["id"], "7");
    }

    #[test]
    fn test_plan_in_place_update() {
        let prior = json!({"id": "7", "type": "usage_limit", "email_to": "a@b.c", "frequency": null, "percentage": 90});
        let plan = plan_resource(
            &alert_schema(),
            Some(&prior),
            &json!({"type": "usage_limit", "email_to": "ops@b.c", "percentage": 90}),
        );

        assert!(!plan.requires_replace);
        assert_eq!(
            plan.changes,
            vec![AttributeChange::modified("email_to", json!("a@b.c"), json!("ops@b.c"))]
        );
        assert_eq!(plan.planned_state["id"], "7");
    }

    #[test]
    fn test_plan_force_new_resets_computed() {
        let prior = json!({"id": "7", "type": "usage_limit", "email_to": "a@b.c", "frequency": null, "percentage": 90});
        let plan = plan_resource(
            &alert_schema(),
            Some(&prior),
            &json!({"type": "stats_notification", "email_to": "a@b.c", "frequency": "daily"}),
        );

        assert!(plan.requires_replace);
        assert_eq!(plan.planned_state["id"], Value::Null);
        assert!(plan
            .changes
            .contains(&AttributeChange::removed("percentage", json!(90))));
        assert!(plan
            .changes
            .contains(&AttributeChange::added("frequency", json!("daily"))));
    }

    #[test]
    fn test_plan_sets_ignore_order() {
        let prior = json!({
            "id": "dev@example.com",
            "email": "dev@example.com",
            "is_admin": false,
            "scopes": ["mail.send", "alerts.read"],
            "pending": true,
        });
        let plan = plan_resource(
            &teammate_schema(),
            Some(&prior),
            &json!({"email": "dev@example.com", "scopes": ["alerts.read", "mail.send"]}),
        );
        assert!(!plan.has_changes());
    }

    #[test]
    fn test_plan_unset_optional_computed_keeps_prior() {
        let prior = json!({
            "id": "dev@example.com",
            "email": "dev@example.com",
            "is_admin": true,
            "scopes": ["mail.send"],
            "pending": false,
        });
        let plan = plan_resource(&teammate_schema(), Some(&prior), &json!({"email": "dev@example.com"}));

        assert_eq!(plan.planned_state["scopes"], json!(["mail.send"]));
        assert_eq!(
            plan.changes,
            vec![AttributeChange::modified("is_admin", json!(true), json!(false))]
        );
    }

    #[test]
    fn test_equivalent() {
        let set = AttributeType::set(AttributeType::String);
        assert!(equivalent(&set, &json!(["a", "b"]), &json!(["b", "a"])));
        assert!(!equivalent(&set, &json!(["a", "b"]), &json!(["a"])));

        let list = AttributeType::list(AttributeType::String);
        assert!(!equivalent(&list, &json!(["a", "b"]), &json!(["b", "a"])));

        assert!(equivalent(&AttributeType::Float64, &json!(1.0), &json!(1)));
        assert!(!equivalent(&AttributeType::String, &json!("1"), &json!(1)));
    }
}
