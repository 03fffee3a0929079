use serde_json::{Value, json};

use crate::editor::{DefinitionRegistry, TypeDefinition, truncate_display};
use crate::schema::{SchemaNode, WorkingSchema, build_working_schemas};
use crate::validate::PermissiveValidator;

fn working(raw: Value) -> WorkingSchema {
    let validator = PermissiveValidator::new();
    let node = SchemaNode::from_value(&raw).expect("valid schema fixture");
    build_working_schemas(&node, &validator).remove(0)
}

#[test]
fn lookup_follows_declared_type_when_data_agrees() {
    let registry = DefinitionRegistry::with_builtins();
    let definition = registry
        .lookup(&json!("text"), &working(json!({"type": "string"})))
        .expect("definition");
    assert_eq!(definition.id(), "string");
}

#[test]
fn lookup_falls_back_to_the_runtime_type_on_mismatch() {
    let registry = DefinitionRegistry::with_builtins();
    let definition = registry
        .lookup(&json!(true), &working(json!({"type": "string"})))
        .expect("definition");
    assert_eq!(definition.id(), "boolean");
}

#[test]
fn integral_numbers_agree_with_integer_schemas() {
    let registry = DefinitionRegistry::with_builtins();
    let whole = registry
        .lookup(&json!(3), &working(json!({"type": "integer"})))
        .expect("definition");
    assert_eq!(whole.id(), "integer");
    let fractional = registry
        .lookup(&json!(3.5), &working(json!({"type": "integer"})))
        .expect("definition");
    assert_eq!(fractional.id(), "number", "a fraction cannot agree with integer");
}

#[test]
fn format_overrides_win_when_registered() {
    #[derive(Debug, Clone)]
    struct PortDefinition;

    impl TypeDefinition for PortDefinition {
        fn id(&self) -> &str {
            "port"
        }

        fn display(&self, data: &Value, _schema: &WorkingSchema) -> String {
            format!(":{data}")
        }
    }

    let mut registry = DefinitionRegistry::with_builtins();
    registry.register(Box::new(PortDefinition));
    let schema = working(json!({"type": "integer", "format": "port"}));
    let definition = registry.lookup(&json!(8080), &schema).expect("definition");
    assert_eq!(definition.id(), "port");
    assert_eq!(definition.display(&json!(8080), &schema), ":8080");
    assert!(!definition.editable(), "the default stays non-editable");
}

#[test]
fn unregistered_formats_fall_through_to_the_type() {
    let registry = DefinitionRegistry::with_builtins();
    let definition = registry
        .lookup(
            &json!("2024-01-01"),
            &working(json!({"type": "string", "format": "date"})),
        )
        .expect("definition");
    assert_eq!(definition.id(), "string");
}

#[test]
fn scalar_definitions_coerce_edit_input() {
    let registry = DefinitionRegistry::with_builtins();

    let number = working(json!({"type": "number"}));
    let definition = registry.lookup(&json!(0), &number).expect("definition");
    assert_eq!(definition.parse_edit("12", &number).expect("integer text"), json!(12));
    assert_eq!(definition.parse_edit(" 2.5 ", &number).expect("float text"), json!(2.5));
    assert!(definition.parse_edit("twelve", &number).is_err());

    let integer = working(json!({"type": "integer"}));
    let definition = registry.lookup(&json!(1), &integer).expect("definition");
    assert_eq!(definition.parse_edit("41", &integer).expect("integer text"), json!(41));
    assert!(definition.parse_edit("4.2", &integer).is_err());

    let boolean = working(json!({"type": "boolean"}));
    let definition = registry.lookup(&json!(false), &boolean).expect("definition");
    assert_eq!(definition.parse_edit("TRUE", &boolean).expect("boolean text"), json!(true));
    assert!(definition.parse_edit("yes", &boolean).is_err());

    let string = working(json!({"type": "string"}));
    let definition = registry.lookup(&json!("x"), &string).expect("definition");
    assert_eq!(
        definition.parse_edit("kept verbatim", &string).expect("string text"),
        json!("kept verbatim")
    );
}

#[test]
fn containers_are_not_editable_inline() {
    let registry = DefinitionRegistry::with_builtins();

    let array = working(json!({"type": "array"}));
    let definition = registry.lookup(&json!([1]), &array).expect("definition");
    assert!(!definition.editable());
    assert!(definition.parse_edit("[]", &array).is_err());
    assert_eq!(definition.display(&json!([]), &array), "empty");
    assert_eq!(definition.display(&json!([1]), &array), "1 item");
    assert_eq!(definition.display(&json!([1, 2, 3]), &array), "3 items");

    let object = working(json!({"type": "object"}));
    let definition = registry.lookup(&json!({"a": 1}), &object).expect("definition");
    assert!(!definition.editable());
    assert_eq!(definition.display(&json!({}), &object), "empty");
    assert_eq!(definition.display(&json!({"a": 1}), &object), "1 property");

    let titled = working(json!({"type": "object", "title": "Server"}));
    let definition = registry.lookup(&json!({"a": 1}), &titled).expect("definition");
    assert_eq!(definition.display(&json!({"a": 1}), &titled), "Server");
}

#[test]
fn shortened_displays_truncate_on_character_boundaries() {
    assert_eq!(truncate_display("short", 10), "short");
    assert_eq!(truncate_display("abcdefghijklmnopqrstuvwxyz", 10), "abcdefghi…");
}

#[test]
fn truncation_measures_wide_characters_by_display_width() {
    assert_eq!(truncate_display("配置文件路径设置", 8), "配置文…");
}
