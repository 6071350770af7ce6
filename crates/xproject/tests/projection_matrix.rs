use std::sync::Arc;

use proptest::prelude::*;
use xproject::{
    is_legal_setter_path, ConfigError, Contract, ElementType, Node, Operation, Projection, ProjectionError,
    Projector, ReturnType, ScalarType, TransformError, Transformer, Value,
};
use xproject_dom::DomError;

fn projector() -> Projector {
    Projector::builder()
        .contract(
            Contract::new("Root")
                .operation(Operation::write("set_child", "/root/child").param("value"))
                .operation(Operation::read("child", "/root/child").returns(ScalarType::String))
                .operation(Operation::write("set_n", "/root/n").param("n"))
                .operation(Operation::read("n", "/root/n").returns(ScalarType::Int))
                .operation(Operation::write("set_id", "/root/@id").param("id"))
                .operation(Operation::read("id", "/root/@id").returns(ScalarType::Long))
                .operation(Operation::write("set_items", "/root/items").param("items"))
                .operation(
                    Operation::read("items", "/root/items/item")
                        .returns(ReturnType::List)
                        .element_type(ElementType::contract("Item")),
                )
                .operation(
                    Operation::read("first_item", "/root/items/item")
                        .returns(ReturnType::contract("Item")),
                )
                .operation(
                    Operation::read("item_at", "/root/items/item[{0}]")
                        .param("position")
                        .returns(ReturnType::contract("Item")),
                )
                .operation(
                    Operation::read("item_names", "/root/items/item/@name")
                        .returns(ReturnType::Array(ElementType::Scalar(ScalarType::String))),
                )
                .operation(
                    Operation::read("item_array", "/root/items/item")
                        .returns(ReturnType::Array(ElementType::contract("Item"))),
                )
                .operation(
                    Operation::read("numbers", "/root/n")
                        .returns(ReturnType::List)
                        .element_type(ScalarType::Int),
                )
                .operation(Operation::write("set_document_root", "/*").param("root"))
                .operation(Operation::delete("remove_items", "/root/items/item"))
                .operation(Operation::delete("remove_id", "/root/@id"))
                .operation(
                    Operation::write("with_id", "/root/@id")
                        .param("id")
                        .returns(ReturnType::contract("Root")),
                )
                .operation(
                    Operation::delete("without_child", "/root/child").returns(ReturnType::contract("Root")),
                ),
        )
        .contract(
            Contract::new("Item")
                .operation(Operation::write("set_name", "/item/@name").param("name"))
                .operation(Operation::read("name", "@name").returns(ScalarType::String)),
        )
        .build()
        .unwrap()
}

fn item(projector: &Projector, name: &str) -> Projection {
    let item = projector.project_empty_element("item", "Item").unwrap();
    item.set("set_name", name).unwrap();
    item
}

fn projections(value: Value) -> Vec<Projection> {
    value
        .as_list()
        .unwrap()
        .iter()
        .map(|v| v.as_projection().unwrap().clone())
        .collect()
}

#[test]
fn scalar_write_creates_path_and_is_idempotent() {
    let root = projector().project_empty_document("Root").unwrap();
    root.set("set_child", "x").unwrap();
    assert_eq!(root.to_xml().unwrap(), "<root><child>x</child></root>");
    root.set("set_child", "x").unwrap();
    assert_eq!(root.to_xml().unwrap(), "<root><child>x</child></root>");
    assert_eq!(root.get("child").unwrap().as_str(), Some("x"));
}

#[test]
fn attribute_write_and_read_back() {
    let root = projector().project_empty_document("Root").unwrap();
    assert_eq!(root.get("id").unwrap().as_i64(), Some(0));
    assert!(root.set("set_id", 42).unwrap().is_void());
    assert_eq!(root.get("id").unwrap().as_i64(), Some(42));
    assert_eq!(root.to_xml().unwrap(), r#"<root id="42"/>"#);
}

#[test]
fn collection_write_replaces_same_named_children() {
    let projector = projector();
    let root = projector.project_empty_document("Root").unwrap();
    let items = vec![item(&projector, "a"), item(&projector, "b")];
    root.set("set_items", items).unwrap();
    assert_eq!(
        root.to_xml().unwrap(),
        r#"<root><items><item name="a"/><item name="b"/></items></root>"#
    );

    root.set("set_items", vec![item(&projector, "c")]).unwrap();
    assert_eq!(
        root.to_xml().unwrap(),
        r#"<root><items><item name="c"/></items></root>"#
    );
}

#[test]
fn collection_write_rejects_non_projection_members() {
    let root = projector().project_empty_document("Root").unwrap();
    let result = root.set("set_items", vec![Value::from("a")]);
    assert!(matches!(result, Err(ProjectionError::ArgumentShape(_))));
}

#[test]
fn single_projection_write_replaces_child() {
    let projector = projector();
    let root = projector
        .project_xml_string(r#"<root><items><item name="old"/><other/></items></root>"#, "Root")
        .unwrap();
    let replacement = item(&projector, "new");
    root.set("set_items", replacement).unwrap();
    assert_eq!(
        root.to_xml().unwrap(),
        r#"<root><items><other/><item name="new"/></items></root>"#
    );
}

#[test]
fn wildcard_write_replaces_document_root() {
    let projector = projector();
    let root = projector
        .project_xml_string("<root><child>x</child></root>", "Root")
        .unwrap();
    root.set("set_document_root", item(&projector, "top")).unwrap();
    assert_eq!(root.to_xml().unwrap(), r#"<item name="top"/>"#);

    let scalar = root.set("set_document_root", "text");
    assert!(matches!(scalar, Err(ProjectionError::ArgumentShape(_))));
}

#[test]
fn writing_null_is_rejected() {
    let root = projector().project_empty_document("Root").unwrap();
    let result = root.set("set_child", Value::Null);
    assert!(matches!(result, Err(ProjectionError::ArgumentShape(_))));
}

#[test]
fn delete_removes_every_match_and_tolerates_none() {
    let root = projector()
        .project_xml_string(
            r#"<root id="1"><items><item/><item/><keep/><item/></items></root>"#,
            "Root",
        )
        .unwrap();
    assert!(root.get("remove_items").unwrap().is_void());
    assert_eq!(root.to_xml().unwrap(), r#"<root id="1"><items><keep/></items></root>"#);

    root.get("remove_items").unwrap();
    assert_eq!(root.to_xml().unwrap(), r#"<root id="1"><items><keep/></items></root>"#);

    root.get("remove_id").unwrap();
    assert_eq!(root.to_xml().unwrap(), "<root><items><keep/></items></root>");
}

#[test]
fn single_read_shares_node_and_list_read_clones() {
    let root = projector()
        .project_xml_string(r#"<root><items><item name="a"/><item name="b"/></items></root>"#, "Root")
        .unwrap();

    let first = root.get("first_item").unwrap().into_projection().unwrap();
    assert_eq!(root.get("first_item").unwrap().as_projection(), Some(&first));
    assert!(first.xml_node().parent().is_some());

    let listed = projections(root.get("items").unwrap());
    assert_eq!(listed.len(), 2);
    assert_ne!(listed[0], first);
    assert_ne!(listed[0].xml_node().document(), first.xml_node().document());
    assert_ne!(listed[0].xml_node().document(), listed[1].xml_node().document());
    assert_eq!(listed[0].get("name").unwrap().as_str(), Some("a"));

    listed[0].xml_node().set_attribute("name", "changed").unwrap();
    assert_eq!(first.get("name").unwrap().as_str(), Some("a"));

    first.xml_node().set_attribute("name", "shared").unwrap();
    assert!(root.to_xml().unwrap().contains(r#"<item name="shared"/>"#));
}

#[test]
fn absent_single_read_is_null() {
    let root = projector().project_xml_string("<root/>", "Root").unwrap();
    assert!(root.get("first_item").unwrap().is_null());
}

#[test]
fn placeholders_are_substituted_positionally() {
    let root = projector()
        .project_xml_string(r#"<root><items><item name="a"/><item name="b"/></items></root>"#, "Root")
        .unwrap();
    let second = root.invoke("item_at", &[Value::from(2)]).unwrap();
    assert_eq!(
        second.as_projection().unwrap().get("name").unwrap().as_str(),
        Some("b")
    );
}

#[test]
fn array_read_is_fixed_size() {
    let root = projector()
        .project_xml_string(r#"<root><items><item name="a"/><item name="b"/></items></root>"#, "Root")
        .unwrap();
    let names = root.get("item_names").unwrap();
    assert!(matches!(names, Value::Array(_)));
    let names: Vec<_> = names.as_list().unwrap().iter().map(|v| v.as_str().unwrap().to_string()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn scalar_list_read_converts_each_match() {
    let root = projector()
        .project_xml_string("<root><n>1</n><n></n><n> 3 </n></root>", "Root")
        .unwrap();
    let numbers = root.get("numbers").unwrap();
    assert!(matches!(numbers, Value::List(_)));
    let numbers: Vec<_> = numbers.as_list().unwrap().iter().map(|v| v.as_i64().unwrap()).collect();
    assert_eq!(numbers, [1, 0, 3]);

    let none = projector().project_xml_string("<root/>", "Root").unwrap();
    assert_eq!(none.get("numbers").unwrap().as_list().map(<[Value]>::len), Some(0));
}

#[test]
fn contract_array_read_projects_copies() {
    let projector = projector();
    let root = projector
        .project_xml_string(r#"<root><items><item name="a"/><item name="b"/></items></root>"#, "Root")
        .unwrap();
    let array = root.get("item_array").unwrap();
    assert!(matches!(array, Value::Array(_)));
    let items = projections(array);
    let names: Vec<_> = items.iter().map(|item| item.get("name").unwrap().text().unwrap()).collect();
    assert_eq!(names, ["a", "b"]);

    items[1].set("set_name", "renamed").unwrap();
    assert_eq!(items[1].get("name").unwrap().as_str(), Some("renamed"));
    assert_eq!(items[1].xml_node().to_xml().unwrap(), r#"<item name="renamed"/>"#);
    assert_eq!(
        root.to_xml().unwrap(),
        r#"<root><items><item name="a"/><item name="b"/></items></root>"#
    );
}

#[test]
fn repeated_reads_and_writes_keep_arena_bounded() {
    let root = projector()
        .project_xml_string(r#"<root><items><item name="a"/><item name="b"/></items></root>"#, "Root")
        .unwrap();
    let arena = || root.xml_node().document().read().len();
    let initial = arena();

    for _ in 0..1000 {
        assert_eq!(projections(root.get("items").unwrap()).len(), 2);
        assert_eq!(root.get("item_array").unwrap().as_list().map(<[Value]>::len), Some(2));
    }
    assert_eq!(arena(), initial);

    for i in 0..1000 {
        root.set("set_child", format!("value {i}")).unwrap();
        root.set("set_n", i).unwrap();
    }
    assert!(arena() < 100, "arena grew to {}", arena());
    assert_eq!(root.get("child").unwrap().as_str(), Some("value 999"));
    assert_eq!(root.get("n").unwrap().as_i64(), Some(999));
}

struct RefusingTransformer;

impl Transformer for RefusingTransformer {
    fn transform(&self, _node: &Node) -> Result<String, TransformError> {
        Err(TransformError::Dom(DomError::Write("refused".to_string())))
    }
}

#[test]
fn display_falls_back_when_transformer_fails() {
    let projector = Projector::builder()
        .transformer(Arc::new(RefusingTransformer))
        .contract(Contract::new("Root").operation(Operation::read("child", "/root/child").returns(ScalarType::String)))
        .build()
        .unwrap();
    let root = projector
        .project_xml_string("<root><child>x</child></root>", "Root")
        .unwrap();

    assert!(matches!(root.to_xml(), Err(ProjectionError::Transform(_))));
    assert!(matches!(root.get("to_string"), Err(ProjectionError::Transform(_))));
    assert_eq!(root.to_string(), "<root><child>x</child></root>");
    assert_eq!(format!("[{root}]"), "[<root><child>x</child></root>]");
    assert_eq!(root.get("child").unwrap().as_str(), Some("x"));
}

#[test]
fn conversion_failure_carries_path() {
    let root = projector().project_xml_string("<root><n>abc</n></root>", "Root").unwrap();
    match root.get("n") {
        Err(ProjectionError::Conversion { path, source }) => {
            assert_eq!(path, "/root/n");
            assert_eq!(source.target, ScalarType::Int);
            assert_eq!(source.input, "abc");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn projection_equality_follows_node_and_contract() {
    let projector = projector();
    let root = projector.project_xml_string("<root/>", "Root").unwrap();
    let node = root.xml_node().clone();
    let same = projector.project(&node, "Root").unwrap();
    let other_contract = projector.project(&node, "Item").unwrap();

    assert_eq!(root, same);
    assert_eq!(root.hash_code(), same.hash_code());
    assert_ne!(root, other_contract);
    assert_eq!(root.invoke("equals", &[Value::from(same)]).unwrap().as_bool(), Some(true));
    assert_eq!(
        root.invoke("equals", &[Value::from(other_contract)]).unwrap().as_bool(),
        Some(false)
    );
    assert_eq!(root.invoke("equals", &[Value::from("root")]).unwrap().as_bool(), Some(false));
}

#[test]
fn built_in_operations() {
    let root = projector().project_xml_string("<root><child>x</child></root>", "Root").unwrap();
    assert_eq!(
        root.get("to_string").unwrap().as_str(),
        Some("<root><child>x</child></root>")
    );
    assert_eq!(root.to_string(), "<root><child>x</child></root>");
    assert_eq!(root.get("hash_code").unwrap().as_i64(), Some(root.hash_code()));
    assert_eq!(root.get("xml_node").unwrap().as_node(), Some(root.xml_node()));
    assert!(matches!(
        root.get("projection_contract").unwrap(),
        Value::Contract(id) if id.as_str() == "Root"
    ));
}

#[test]
fn chained_operations_return_the_caller() {
    let root = projector().project_xml_string("<root><child>x</child></root>", "Root").unwrap();
    let chained = root
        .set("with_id", 7)
        .unwrap()
        .into_projection()
        .unwrap()
        .get("without_child")
        .unwrap()
        .into_projection()
        .unwrap();
    assert_eq!(chained, root);
    assert_eq!(root.to_xml().unwrap(), r#"<root id="7"/>"#);
}

#[test]
fn missing_arguments_are_rejected() {
    let root = projector().project_empty_document("Root").unwrap();
    assert!(matches!(
        root.get("set_child"),
        Err(ProjectionError::ArgumentShape(_))
    ));
}

#[test]
fn unknown_operation_is_config_error() {
    let root = projector().project_empty_document("Root").unwrap();
    assert!(matches!(
        root.get("nope"),
        Err(ProjectionError::Config(ConfigError::UnknownOperation { .. }))
    ));
}

proptest! {
    #[test]
    fn integer_writes_read_back(n in any::<i32>()) {
        let root = projector().project_empty_document("Root").unwrap();
        root.set("set_n", n).unwrap();
        prop_assert_eq!(root.get("n").unwrap().as_i64(), Some(i64::from(n)));
    }

    #[test]
    fn element_paths_are_legal(names in prop::collection::vec("[a-z][a-z0-9_]{0,6}", 1..5), attr in "[a-z]{1,5}") {
        let path: String = names.iter().map(|n| format!("/{n}")).collect();
        prop_assert!(is_legal_setter_path(&path));
        let with_attribute = format!("{path}/@{attr}");
        prop_assert!(is_legal_setter_path(&with_attribute));
        let with_predicate = format!("{path}[1]");
        prop_assert!(!is_legal_setter_path(&with_predicate));
        let descendant = format!("/{path}");
        prop_assert!(!is_legal_setter_path(&descendant));
        prop_assert!(!is_legal_setter_path(path.trim_start_matches('/')));
    }
}
