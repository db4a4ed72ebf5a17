use super::*;
use crate::configuration::{EventKind, EventProvider};

fn normalize_sdl(sdl: &str) -> Result<NormalizedSubgraph, NormalizationError> {
    normalize(&Subgraph::new("products", "http://products.example.com/graphql", sdl))
}

fn errors(sdl: &str) -> Vec<String> {
    match normalize_sdl(sdl) {
        Err(NormalizationError::Invalid(diagnostics)) => diagnostics.iter_errors().map(str::to_owned).collect(),
        Err(NormalizationError::Syntax(error)) => vec![error.to_string()],
        Ok(_) => Vec::new(),
    }
}

#[rstest::rstest]
#[case::whitespace("   \n")]
#[case::comments("# Products live elsewhere now.\n\n  # See the inventory subgraph.\n")]
#[case::commas_and_comments(",, # nothing\n\t,\n")]
fn empty_schema(#[case] sdl: &str) {
    assert_eq!(
        errors(sdl),
        ["[products] Normalization failed to return a configuration map: the schema is empty."]
    );
}

#[test]
fn no_object_type_with_fields() {
    assert_eq!(
        errors("scalar DateTime"),
        ["[products] Normalization failed to return a configuration map: the subgraph defines no object type with fields."]
    );
}

#[test]
fn syntax_errors_are_input_errors() {
    let result = normalize_sdl("type Query {");
    assert!(matches!(
        result,
        Err(NormalizationError::Syntax(InputError::Syntax { ref subgraph, .. })) if subgraph == "products"
    ));
}

#[test]
fn entity_configuration() {
    let sdl = r#"
        extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@key", "@external", "@requires"])

        type Query {
          product(id: ID!): Product
        }

        type Product @key(fields: "id") @key(fields: "sku", resolvable: false) {
          id: ID!
          sku: String!
          weight: Float @external
          shippingEstimate: Int @requires(fields: "weight")
        }
    "#;

    let subgraph = normalize_sdl(sdl).unwrap();

    assert!(subgraph.is_version_two);
    assert!(subgraph.is_entity("Product"));
    assert!(subgraph.is_key_field("Product", "sku"));
    assert!(subgraph.is_external("Product", "weight"));

    insta::assert_json_snapshot!(subgraph.configuration, @r#"
    {
      "Product": {
        "typeName": "Product",
        "isRootNode": true,
        "fieldNames": [
          "id",
          "shippingEstimate",
          "sku"
        ],
        "externalFieldNames": [
          "weight"
        ],
        "keys": [
          {
            "fieldName": "",
            "selectionSet": "id"
          },
          {
            "fieldName": "",
            "selectionSet": "sku",
            "disableEntityResolver": true
          }
        ],
        "requires": [
          {
            "fieldName": "shippingEstimate",
            "selectionSet": "weight"
          }
        ]
      },
      "Query": {
        "typeName": "Query",
        "isRootNode": true,
        "fieldNames": [
          "product"
        ]
      }
    }
    "#);
}

#[test]
fn equivalent_keys_are_deduplicated() {
    let sdl = r#"
        type Query {
          product: Product
        }

        type Product @key(fields: "id sku") @key(fields: "sku   id") @key(fields: "sku") {
          id: ID!
          sku: String!
        }
    "#;

    let subgraph = normalize_sdl(sdl).unwrap();

    assert_eq!(subgraph.keys("Product").len(), 2);
    assert_eq!(
        subgraph.configuration["Product"]
            .keys
            .iter()
            .map(|key| key.selection_set.as_str())
            .collect::<Vec<_>>(),
        ["id sku", "sku"]
    );
}

#[test]
fn version_one_fields_are_shareable() {
    let sdl = r#"
        type Query {
          products: [Product!]!
        }

        type Product @key(fields: "id") {
          id: ID!
          name: String
        }
    "#;

    let subgraph = normalize_sdl(sdl).unwrap();

    assert!(!subgraph.is_version_two);
    assert!(subgraph.is_shareable("Product", "name"));
}

#[test]
fn version_two_fields_are_not_shareable_by_default() {
    let sdl = r#"
        type Query {
          products: [Product!]!
        }

        type Product @key(fields: "id") {
          id: ID!
          name: String
          price: Int @shareable
        }
    "#;

    let subgraph = normalize_sdl(sdl).unwrap();

    assert!(subgraph.is_version_two);
    assert!(!subgraph.is_shareable("Product", "name"));
    assert!(subgraph.is_shareable("Product", "price"));
    assert!(subgraph.is_shareable("Product", "id"));
}

#[test]
fn renamed_roots() {
    let sdl = r#"
        schema {
          query: RootQuery
        }

        type RootQuery {
          me: User
          self: RootQuery
        }

        type User {
          id: ID!
        }
    "#;

    let subgraph = normalize_sdl(sdl).unwrap();

    assert!(subgraph.schema.get("RootQuery").is_none());
    assert_eq!(subgraph.schema.field("Query", "self").unwrap().ty.name, "Query");
    assert_eq!(subgraph.root_types().collect::<Vec<_>>(), ["Query"]);
}

#[test]
fn default_root_name_on_a_non_root() {
    let sdl = r#"
        schema {
          query: RootQuery
        }

        type RootQuery {
          me: String
        }

        type Query {
          other: String
        }
    "#;

    assert_eq!(
        errors(sdl),
        ["[products] The Query type has the default name for a root but is itself not a root. This is not valid in a federation context."]
    );
}

#[test]
fn federation_internals_are_ignored() {
    let sdl = r#"
        scalar _Any
        scalar FieldSet
        union _Entity = Product

        type _Service {
          sdl: String
        }

        type Query {
          _entities(representations: [_Any!]!): [_Entity]!
          _service: _Service!
          product: Product
        }

        type Product @key(fields: "id") {
          id: ID!
        }
    "#;

    let subgraph = normalize_sdl(sdl).unwrap();

    assert_eq!(
        subgraph.schema.types.keys().collect::<Vec<_>>(),
        ["Product", "Query"]
    );
    assert_eq!(
        subgraph.schema.get("Query").unwrap().fields.keys().collect::<Vec<_>>(),
        ["product"]
    );
}

#[test]
fn extensions_are_merged() {
    let sdl = r#"
        type Query {
          user: User
        }

        type User {
          id: ID!
        }

        extend type User {
          name: String
        }

        extend type Review {
          body: String
        }
    "#;

    let subgraph = normalize_sdl(sdl).unwrap();

    assert_eq!(
        subgraph.schema.get("User").unwrap().fields.keys().collect::<Vec<_>>(),
        ["id", "name"]
    );
    assert!(subgraph.schema.get("Review").is_some());
}

#[test]
fn extends_directive_is_deprecated() {
    let sdl = r#"
        type Query {
          user: User
        }

        type User @extends @key(fields: "id") {
          id: ID! @external
          reviews: [String]
        }
    "#;

    let subgraph = normalize_sdl(sdl).unwrap();

    assert_eq!(
        subgraph.warnings.iter_warnings().collect::<Vec<_>>(),
        ["[products] The @extends directive on `User` is deprecated. Use `extend type User` instead."]
    );
}

#[test]
fn invalid_key_fields() {
    let sdl = r#"
        type Query {
          product: Product
        }

        type Product @key(fields: "upc") {
          id: ID!
        }
    "#;

    assert_eq!(
        errors(sdl),
        ["[products] Error in @key at Product: the `upc` field does not exist on `Product` (at Product.upc)"]
    );
}

#[test]
fn provides_on_a_leaf_field() {
    let sdl = r#"
        type Query {
          name: String @provides(fields: "length")
        }
    "#;

    assert_eq!(
        errors(sdl),
        ["[products] Error in @provides at Query.name: the field returns `String`, which is not an object, interface or union."]
    );
}

#[test]
fn override_from_self() {
    let sdl = r#"
        type Query {
          product: String @override(from: "products")
        }
    "#;

    assert_eq!(
        errors(sdl),
        [r#"[products] Source and destination subgraphs "products" are the same for overridden field "Query.product""#]
    );
}

#[test]
fn duplicate_definitions() {
    let sdl = r#"
        type Query {
          a: Int
          a: Int
        }

        enum Color {
          RED
          RED
        }
    "#;

    assert_eq!(
        errors(sdl),
        [
            "[products] The field `Query.a` is defined more than once.",
            "[products] The enum value `Color.RED` is defined more than once.",
        ]
    );
}

#[test]
fn undefined_types() {
    let sdl = r#"
        type Query {
          user: User
          search(filter: Filter): String
        }
    "#;

    assert_eq!(
        errors(sdl),
        [
            "[products] The type `User` referenced at `Query.user` is not defined.",
            "[products] The type `Filter` referenced at `Query.search(filter:)` is not defined.",
        ]
    );
}

#[test]
fn events() {
    let sdl = r#"
        type Query {
          employee(id: ID!): Employee
        }

        type Subscription {
          employeeUpdated(id: ID!): Employee @eventsSubscribe(topic: "employees.updated", sourceID: "nats")
        }

        type Mutation {
          updateEmployee(id: ID!): Boolean @eventsPublish(topic: "employees.update")
        }

        type Employee @key(fields: "id") {
          id: ID!
        }
    "#;

    let subgraph = normalize_sdl(sdl).unwrap();
    let subscription = &subgraph.configuration["Subscription"];

    assert_eq!(subscription.events.len(), 1);
    assert_eq!(subscription.events[0].kind, EventKind::Subscribe);
    assert_eq!(subscription.events[0].topic, "employees.updated");
    assert_eq!(subscription.events[0].source_id.as_deref(), Some("nats"));
    assert_eq!(subgraph.configuration["Mutation"].events[0].kind, EventKind::Publish);
}

#[test]
fn event_without_topic() {
    let sdl = r#"
        type Mutation {
          updateEmployee(id: ID!): Boolean @eventsPublish(topic: "")
        }
    "#;

    assert_eq!(
        errors(sdl),
        ["[products] The event directive \"eventsPublish\" declared on \"Mutation.updateEmployee\" is invalid for the following reason(s):\n The \"topic\" argument must be string with a minimum length of one."]
    );
}

#[test]
fn edfs_events() {
    let sdl = r#"
        type Query {
          findEmployee(id: ID!): Employee @edfs__natsRequest(subject: "employees.{{ args.id }}")
        }

        type Mutation {
          updateEmployee(id: ID!): Boolean @edfs__kafkaPublish(topic: "employee-updates", providerId: "kafka")
          deleteEmployee(id: ID!): Boolean @edfs__redisPublish(channel: "deletions")
        }

        type Subscription {
          employeeUpdated(id: ID!): Employee
            @edfs__natsSubscribe(
              subjects: ["employees.{{ args.id }}", "employees.all"]
              streamConfiguration: { consumerName: "router", streamName: "employees" }
            )
          employeeDeleted: Employee @edfs__redisSubscribe(channels: ["deletions"], providerId: "cache")
          employeeCreated: Employee @edfs__kafkaSubscribe(topics: ["employee-creations"])
        }

        type Employee @key(fields: "id") {
          id: ID!
        }
    "#;

    let subgraph = normalize_sdl(sdl).unwrap();

    insta::assert_json_snapshot!(subgraph.configuration["Subscription"].events, @r#"
    [
      {
        "fieldName": "employeeCreated",
        "topic": "employee-creations",
        "type": "subscribe",
        "sourceId": "default",
        "providerType": "kafka",
        "topics": [
          "employee-creations"
        ]
      },
      {
        "fieldName": "employeeDeleted",
        "topic": "deletions",
        "type": "subscribe",
        "sourceId": "cache",
        "providerType": "redis",
        "topics": [
          "deletions"
        ]
      },
      {
        "fieldName": "employeeUpdated",
        "topic": "employees.{{ args.id }}",
        "type": "subscribe",
        "sourceId": "default",
        "providerType": "nats",
        "topics": [
          "employees.{{ args.id }}",
          "employees.all"
        ],
        "streamConfiguration": {
          "consumerInactiveThreshold": 30,
          "consumerName": "router",
          "streamName": "employees"
        }
      }
    ]
    "#);

    let mutation = &subgraph.configuration["Mutation"].events;
    assert_eq!(
        mutation.iter().map(|event| (event.field_name.as_str(), event.provider_type)).collect::<Vec<_>>(),
        [
            ("deleteEmployee", Some(EventProvider::Redis)),
            ("updateEmployee", Some(EventProvider::Kafka))
        ]
    );
    assert_eq!(mutation[1].source_id.as_deref(), Some("kafka"));

    let query = &subgraph.configuration["Query"].events;
    assert_eq!(query[0].kind, EventKind::Request);
    assert_eq!(query[0].topics, ["employees.{{ args.id }}"]);
}

#[test]
fn events_on_the_wrong_root_type() {
    let sdl = r#"
        type Query {
          employee: Int @edfs__kafkaSubscribe(topics: ["employees"])
        }

        type Subscription {
          employeeUpdated: Int @edfs__natsPublish(subject: "employees")
        }
    "#;

    assert_eq!(
        errors(sdl),
        [
            "[products] The event directive \"edfs__kafkaSubscribe\" declared on \"Query.employee\" is invalid for the following reason(s):\n Subscribe event directives can only be defined on Subscription fields.",
            "[products] The event directive \"edfs__natsPublish\" declared on \"Subscription.employeeUpdated\" is invalid for the following reason(s):\n Publish event directives can only be defined on Mutation fields.",
        ]
    );
}

#[test]
fn invalid_event_arguments() {
    let sdl = r#"
        type Subscription {
          employeeUpdated(id: ID!): Int
            @edfs__kafkaSubscribe(topics: ["employees.{{ args.employeeId }}", ""], providerId: "")
        }
    "#;

    insta::assert_snapshot!(errors(sdl).join("\n"), @r#"
    [products] The event directive "edfs__kafkaSubscribe" declared on "Subscription.employeeUpdated" is invalid for the following reason(s):
     An argument template references the undefined argument "employeeId".
     Each item in the "topics" argument list must be a string with a minimum length of one. However, at least one value provided in the list was invalid.
     If explicitly defined, the "providerId" argument must be a string with a minimum length of one.
    "#);
}

#[test]
fn invalid_nats_stream_configuration() {
    let sdl = r#"
        type Subscription {
          employeeUpdated: Int
            @edfs__natsSubscribe(subjects: ["employees"], streamConfiguration: { consumerName: "", retention: 3 })
        }
    "#;

    let errors = errors(sdl);

    assert_eq!(errors.len(), 1);
    assert!(errors[0].ends_with(
        "  }\n The required field \"consumerName\" must be a string with a minimum length of one.\n The field \"retention\" is not defined.\n The required field \"streamName\" is not defined."
    ));
}

#[rstest::rstest]
#[case::negative(-1, 30)]
#[case::too_large(3_000_000_000, 0)]
fn consumer_inactive_threshold_is_clamped(#[case] threshold: i64, #[case] expected: i64) {
    let sdl = format!(
        r#"
        type Query {{
          employee: Int
        }}

        type Subscription {{
          employeeUpdated: Int
            @edfs__natsSubscribe(
              subjects: ["employees"]
              streamConfiguration: {{ consumerName: "router", streamName: "employees", consumerInactiveThreshold: {threshold} }}
            )
        }}
    "#
    );

    let subgraph = normalize_sdl(&sdl).unwrap();
    let event = &subgraph.configuration["Subscription"].events[0];

    assert_eq!(
        event.stream_configuration.as_ref().map(|stream| stream.consumer_inactive_threshold),
        Some(expected)
    );
    assert_eq!(subgraph.warnings.iter_warnings().count(), 1);
}

#[test]
fn subscription_filter_outside_of_subscriptions() {
    let sdl = r#"
        type Query {
          employee: Employee @openfed__subscriptionFilter(condition: { IN: { fieldPath: "id", values: [1] } })
        }

        type Employee {
          id: Int
        }
    "#;

    assert_eq!(
        errors(sdl),
        [r#"[products] The "@openfed__subscriptionFilter" directive must only be defined on a subscription root field, but it was defined on the path "Query.employee"."#]
    );
}

#[test]
fn interface_object() {
    let sdl = r#"
        type Query {
          media: [Media]
        }

        type Media @interfaceObject @key(fields: "id") {
          id: ID!
          reviews: [String!]!
        }
    "#;

    let subgraph = normalize_sdl(sdl).unwrap();

    assert!(subgraph.is_interface_object("Media"));
    assert!(subgraph.configuration["Media"].is_interface_object);
}

#[test]
fn interface_object_needs_a_key() {
    let sdl = r#"
        type Query {
          media: [Media]
        }

        type Media @interfaceObject {
          id: ID!
        }
    "#;

    assert_eq!(
        errors(sdl),
        ["[products] The @interfaceObject `Media` must declare at least one @key."]
    );
}

#[test]
fn persisted_directives() {
    let sdl = r#"
        type Query {
          product: Product @tag(name: "public")
        }

        type Product @inaccessible {
          id: ID! @deprecated(reason: "use sku")
          sku: String @deprecated
        }
    "#;

    let subgraph = normalize_sdl(sdl).unwrap();
    let product = subgraph.schema.get("Product").unwrap();

    assert!(product.directives.inaccessible);
    assert_eq!(
        product.fields["id"].directives.deprecated.as_ref().and_then(|d| d.reason.as_deref()),
        Some("use sku")
    );
    assert!(product.fields["sku"].directives.deprecated.is_some());
    assert!(subgraph.schema.field("Query", "product").unwrap().directives.tags.contains("public"));
}
