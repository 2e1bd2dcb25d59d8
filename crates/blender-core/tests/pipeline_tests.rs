use blender_core::merge::{self, MergeMode, SchemaBatch};
use blender_core::naming::NamingChain;
use blender_core::normalize::{self, PIPELINE};
use blender_core::parse;
use blender_core::parse::document::OpenApiDocument;
use blender_core::parse::schema::Schema;
use indexmap::IndexMap;
use serde_json::json;

fn doc(yaml: &str) -> OpenApiDocument {
    parse::from_yaml(yaml).expect("fixture should parse")
}

fn schemas(yaml: &str) -> IndexMap<String, Schema> {
    serde_yaml_ng::from_str(yaml).expect("schemas should parse")
}

#[test]
fn pipeline_pass_order() {
    let names: Vec<&str> = PIPELINE.iter().map(|(name, _)| *name).collect();
    insta::assert_snapshot!(names.join("\n"), @r"
    strip-superfluous-types
    rename-types
    externalize-enums
    hoist-composed-properties
    singleton-enum-to-discriminator-value
    one-of-to-all-of
    update-discriminator-mapping
    constrain-discriminator-values
    remove-default-parameter-values
    remove-transient-extensions
    ");
}

#[test]
fn fix_mode_makes_root_polymorphic() {
    let mut doc = doc(
        r#"
openapi: 3.0.1
info: {title: t, version: "1"}
components:
  schemas:
    Root:
      type: object
      properties:
        id: {type: string}
"#,
    );
    let batch = SchemaBatch::from(schemas(
        r#"
Foo:
  x-discriminator-value: foo
  allOf:
    - $ref: '#/components/schemas/Root'
    - type: object
      properties:
        size: {type: integer}
"#,
    ));

    merge::merge(Some("Root"), MergeMode::Fix, &batch, &mut doc).unwrap();
    normalize::normalize(&mut doc);

    let root = doc.schema("Root").unwrap();
    assert!(root.properties.contains_key("@type"));
    let discriminator = root.discriminator.as_ref().unwrap();
    assert_eq!(discriminator.property_name, "@type");
    assert_eq!(discriminator.mapping["foo"], "#/components/schemas/Foo");
    assert_eq!(root.properties["@type"].enum_values, [json!("foo")]);
}

#[test]
fn per_schema_targets_are_fixed_independently() {
    let mut doc = doc(
        r#"
openapi: 3.0.1
info: {title: t, version: "1"}
components:
  schemas:
    Root: {type: object}
    Child: {type: object}
"#,
    );
    let batch = SchemaBatch::from(schemas(
        r#"
ForChild:
  x-mef-target: Child
  allOf:
    - $ref: '#/components/schemas/Child'
ForRoot:
  x-mef-target: Root
  allOf:
    - $ref: '#/components/schemas/Root'
"#,
    ));

    merge::merge(None, MergeMode::Fix, &batch, &mut doc).unwrap();
    normalize::normalize(&mut doc);

    for (target, child) in [("Root", "ForRoot"), ("Child", "ForChild")] {
        let schema = doc.schema(target).unwrap();
        let discriminator = schema.discriminator.as_ref().unwrap();
        assert_eq!(discriminator.property_name, "@type");
        assert_eq!(
            discriminator.mapping[child],
            format!("#/components/schemas/{child}")
        );
        assert_eq!(discriminator.mapping.len(), 1);
    }
}

#[test]
fn one_of_group_becomes_discriminated_parent() {
    let mut doc = doc(
        r#"
openapi: 3.0.1
info: {title: t, version: "1"}
components:
  schemas:
    Shape:
      oneOf:
        - $ref: '#/components/schemas/A'
        - $ref: '#/components/schemas/B'
    A:
      type: object
      properties:
        kind: {type: string}
        a: {type: string}
    B:
      type: object
      properties:
        kind: {type: string}
        b: {type: integer}
"#,
    );
    normalize::normalize(&mut doc);

    let shape = doc.schema("Shape").unwrap();
    assert!(shape.one_of.is_empty());
    let discriminator = shape.discriminator.as_ref().unwrap();
    assert_eq!(discriminator.property_name, "kind");
    assert_eq!(discriminator.mapping["A"], "#/components/schemas/A");
    assert_eq!(discriminator.mapping["B"], "#/components/schemas/B");
    assert_eq!(shape.properties["kind"].enum_values, [json!("A"), json!("B")]);

    for (name, own) in [("A", "a"), ("B", "b")] {
        let member = doc.schema(name).unwrap();
        assert_eq!(
            member.all_of[0].ref_path.as_deref(),
            Some("#/components/schemas/Shape")
        );
        let body = &member.all_of[1];
        assert!(body.properties.contains_key(own));
        assert!(!body.properties.contains_key("kind"));
    }
}

#[test]
fn pinned_one_of_members_map_by_their_values() {
    let mut doc = doc(
        r#"
openapi: 3.0.1
info: {title: t, version: "1"}
components:
  schemas:
    Shape:
      oneOf:
        - $ref: '#/components/schemas/Circle'
        - $ref: '#/components/schemas/Square'
    Circle:
      type: object
      properties:
        "@type": {type: string, enum: [circle]}
        radius: {type: number}
    Square:
      type: object
      properties:
        "@type": {type: string, enum: [square]}
        side: {type: number}
"#,
    );
    normalize::normalize(&mut doc);

    let shape = doc.schema("Shape").unwrap();
    let mapping = &shape.discriminator.as_ref().unwrap().mapping;
    assert_eq!(mapping["circle"], "#/components/schemas/Circle");
    assert_eq!(mapping["square"], "#/components/schemas/Square");
    assert_eq!(
        shape.properties["@type"].enum_values,
        [json!("circle"), json!("square")]
    );
}

#[test]
fn identical_compositions_share_one_type() {
    let mut doc = doc(
        r#"
openapi: 3.0.1
info: {title: t, version: "1"}
components:
  schemas:
    Street: {type: object}
    City: {type: object}
    Customer:
      type: object
      properties:
        address:
          allOf:
            - $ref: '#/components/schemas/Street'
            - $ref: '#/components/schemas/City'
    Site:
      type: object
      properties:
        address:
          allOf:
            - $ref: '#/components/schemas/City'
            - $ref: '#/components/schemas/Street'
"#,
    );
    normalize::normalize(&mut doc);

    let customer = &doc.schema("Customer").unwrap().properties["address"];
    let site = &doc.schema("Site").unwrap().properties["address"];
    assert!(customer.ref_path.is_some());
    assert_eq!(customer.ref_path, site.ref_path);
    assert_eq!(doc.schemas().unwrap().len(), 5);
}

#[test]
fn rename_reaches_paths_and_mappings() {
    let mut doc = doc(
        r#"
openapi: 3.0.1
info: {title: t, version: "1"}
paths:
  /orders/{id}:
    get:
      parameters:
        - name: id
          in: path
          required: true
          schema: {type: string}
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: {$ref: '#/components/schemas/order.yaml'}
components:
  schemas:
    Root:
      type: object
      discriminator:
        propertyName: "@type"
      properties:
        "@type": {type: string}
    order.yaml:
      x-try-renaming-on: "urn:mef:lso:spec:cantata:product-order:v1:all"
      x-discriminator-value: order
      allOf:
        - $ref: '#/components/schemas/Root'
"#,
    );
    normalize::normalize(&mut doc);

    let yaml = parse::to_yaml(&doc).unwrap();
    assert!(!yaml.contains("order.yaml"));
    assert!(!yaml.contains("x-try-renaming-on"));
    assert!(yaml.contains("#/components/schemas/ProductOrder"));
    let root = doc.schema("Root").unwrap();
    assert_eq!(
        root.discriminator.as_ref().unwrap().mapping["order"],
        "#/components/schemas/ProductOrder"
    );
}

#[test]
fn ambiguous_rename_leaves_names_alone() {
    let mut doc = doc(
        r#"
openapi: 3.0.1
info: {title: t, version: "1"}
paths:
  /a:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: {$ref: '#/components/schemas/A'}
components:
  schemas:
    A:
      x-try-renaming-on: Same
      type: object
    B:
      x-try-renaming-on: Same
      type: object
"#,
    );
    normalize::normalize(&mut doc);

    let names: Vec<&str> = doc.schemas().unwrap().keys().map(String::as_str).collect();
    assert_eq!(names, ["A", "B"]);
    let yaml = parse::to_yaml(&doc).unwrap();
    assert!(yaml.contains("#/components/schemas/A"));
    assert!(!yaml.contains("x-try-renaming-on"));
}

#[test]
fn naming_chain_is_stable() {
    let chain = NamingChain::default();
    let content = json!({ "$id": "urn:mef:lso:spec:cantata:uni:v1:all" });
    let first = chain.resolve("uni.yaml", Some(&content));
    let second = chain.resolve("uni.yaml", Some(&content));
    assert_eq!(first, second);
    assert_eq!(first.unwrap().name, "Uni");
}
