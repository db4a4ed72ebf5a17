use super::*;
use crate::{normalize::normalize, Subgraph};

fn federate_sdl(subgraphs: &[(&str, &str)]) -> (Federated, Diagnostics) {
    let mut normalized: Vec<NormalizedSubgraph> = subgraphs
        .iter()
        .map(|(name, sdl)| normalize(&Subgraph::new(*name, format!("http://{name}.example.com"), *sdl)).unwrap())
        .collect();

    normalized.sort_by(|a, b| a.name.cmp(&b.name));

    let mut diagnostics = Diagnostics::default();
    let federated = federate(&normalized, &mut diagnostics);

    (federated, diagnostics)
}

fn errors(diagnostics: &Diagnostics) -> Vec<&str> {
    diagnostics.iter_errors().collect()
}

#[test]
fn entity_fields_are_unioned() {
    let products = r#"
        type Query {
          products: [Product!]!
        }

        type Product @key(fields: "id") {
          id: ID!
          name: String!
        }
    "#;

    let reviews = r#"
        type Product @key(fields: "id") {
          id: ID!
          reviews: [String!]!
        }
    "#;

    let (federated, diagnostics) = federate_sdl(&[("products", products), ("reviews", reviews)]);

    assert!(diagnostics.is_empty(), "{:?}", errors(&diagnostics));
    assert_eq!(
        federated.schema.get("Product").unwrap().fields.keys().collect::<Vec<_>>(),
        ["id", "name", "reviews"]
    );
    assert_eq!(
        federated.origin_set("Product", "id").unwrap().iter().collect::<Vec<_>>(),
        ["products", "reviews"]
    );
    assert_eq!(
        federated.origin_set("Product", "reviews").unwrap().iter().collect::<Vec<_>>(),
        ["reviews"]
    );
}

#[test]
fn every_field_has_an_origin() {
    let a = r#"
        type Query {
          a: Thing
        }

        type Thing @key(fields: "id") {
          id: ID!
          weight: Float @external
          shipping: Int @requires(fields: "weight")
        }
    "#;

    let b = r#"
        type Query {
          b: Int
        }

        type Thing @key(fields: "id") {
          id: ID!
          weight: Float
        }
    "#;

    let (federated, diagnostics) = federate_sdl(&[("a", a), ("b", b)]);

    assert!(!diagnostics.any_fatal(), "{:?}", errors(&diagnostics));

    for ty in federated.schema.types.values() {
        for field_name in ty.fields.keys() {
            assert!(
                federated.origin_set(&ty.name, field_name).is_some_and(|origins| !origins.is_empty()),
                "{}.{field_name} has no origin",
                ty.name
            );
        }
    }

    assert_eq!(
        federated.origin_set("Thing", "weight").unwrap().iter().collect::<Vec<_>>(),
        ["b"]
    );
}

#[test]
fn incompatible_field_types() {
    let a = r#"
        type Query {
          count: Int
          name: String
        }
    "#;

    let b = r#"
        type Query {
          count: String
        }
    "#;

    let (_, diagnostics) = federate_sdl(&[("b", b), ("a", a)]);

    assert_eq!(
        errors(&diagnostics),
        [r#"The field "Query.count" has incompatible types in subgraphs "a" (Int) and "b" (String)."#]
    );
}

#[test]
fn output_nullability_is_relaxed() {
    let a = r#"
        type Query {
          names: [String!]!
        }
    "#;

    let b = r#"
        type Query {
          names: [String!]
        }
    "#;

    let (federated, diagnostics) = federate_sdl(&[("a", a), ("b", b)]);

    assert!(diagnostics.is_empty());
    assert_eq!(federated.schema.field("Query", "names").unwrap().ty.to_string(), "[String!]");
}

#[test]
fn inner_nullability_must_match() {
    let a = r#"
        type Query {
          names: [String!]
          count: Int
        }
    "#;

    let b = r#"
        type Query {
          names: [String]
        }
    "#;

    let (_, diagnostics) = federate_sdl(&[("a", a), ("b", b)]);

    assert_eq!(diagnostics.iter_errors().count(), 1);
}

#[test]
fn shareability_in_version_two() {
    let a = r#"
        type Query {
          product: Product
        }

        type Product @key(fields: "id") {
          id: ID!
          name: String @shareable
          price: Int
        }
    "#;

    let b = r#"
        type Product @key(fields: "id") {
          id: ID!
          name: String @shareable
          price: Int
        }
    "#;

    let (_, diagnostics) = federate_sdl(&[("a", a), ("b", b)]);

    assert_eq!(
        errors(&diagnostics),
        [r#"The field "Product.price" is resolvable in several subgraphs ("a", "b") but is not marked @shareable in "a", "b"."#]
    );
}

#[test]
fn version_one_subgraphs_share_everything() {
    let a = r#"
        type Query {
          product: Product
        }

        type Product @key(fields: "id") {
          id: ID!
          price: Int
        }
    "#;

    let (_, diagnostics) = federate_sdl(&[("a", a), ("b", a)]);

    assert!(diagnostics.is_empty(), "{:?}", errors(&diagnostics));
}

#[test]
fn field_override() {
    let a = r#"
        type Query {
          product: Product
        }

        type Product @key(fields: "id") {
          id: ID!
          price: Int
        }
    "#;

    let b = r#"
        type Product @key(fields: "id") {
          id: ID!
          price: Int @override(from: "a")
        }
    "#;

    let (federated, diagnostics) = federate_sdl(&[("a", a), ("b", b)]);

    assert!(!diagnostics.any_fatal(), "{:?}", errors(&diagnostics));
    assert_eq!(
        federated.origin_set("Product", "price").unwrap().iter().collect::<Vec<_>>(),
        ["b"]
    );
    assert!(!federated.subgraph_configurations[0]["Product"].field_names.contains("price"));
    assert!(federated.subgraph_configurations[1]["Product"].field_names.contains("price"));
}

#[test]
fn override_from_an_unknown_subgraph() {
    let a = r#"
        type Query {
          price: Int @override(from: "legacy")
        }
    "#;

    let (_, diagnostics) = federate_sdl(&[("a", a)]);

    assert!(!diagnostics.any_fatal());
    assert_eq!(
        diagnostics.iter_warnings().collect::<Vec<_>>(),
        [r#"The field "Query.price" in "a" overrides the subgraph "legacy", which is not part of the composition."#]
    );
}

#[test]
fn kind_mismatch() {
    let a = r#"
        type Query {
          media: Media
        }

        type Media {
          id: ID!
        }
    "#;

    let b = r#"
        type Query {
          other: Int
        }

        interface Media {
          id: ID!
        }
    "#;

    let (_, diagnostics) = federate_sdl(&[("a", a), ("b", b)]);

    assert_eq!(
        errors(&diagnostics),
        [r#"The type "Media" is defined with different kinds across subgraphs: object in "a"; interface in "b"."#]
    );
}

#[test]
fn enums_must_match() {
    let a = r#"
        type Query {
          color: Color
        }

        enum Color {
          RED
          GREEN
        }
    "#;

    let b = r#"
        type Query {
          other: Color
        }

        enum Color {
          RED
        }
    "#;

    let (federated, diagnostics) = federate_sdl(&[("a", a), ("b", b)]);

    assert_eq!(
        errors(&diagnostics),
        [r#"The enum "Color" must have the same values in every subgraph, but "a" defines [GREEN, RED] while "b" defines [RED]."#]
    );
    assert!(federated.schema.get("Color").is_none());
}

#[test]
fn input_objects_are_intersected() {
    let a = r#"
        type Query {
          search(filter: Filter): [String]
        }

        input Filter {
          term: String
          limit: Int = 10
        }
    "#;

    let b = r#"
        type Query {
          other(filter: Filter): Int
        }

        input Filter {
          term: String!
          tags: [String!]
        }
    "#;

    let (federated, diagnostics) = federate_sdl(&[("a", a), ("b", b)]);

    assert!(diagnostics.is_empty(), "{:?}", errors(&diagnostics));

    let filter = federated.schema.get("Filter").unwrap();

    assert_eq!(filter.input_fields.keys().collect::<Vec<_>>(), ["term"]);
    assert_eq!(filter.input_fields["term"].ty.to_string(), "String!");
}

#[test]
fn required_input_field_missing_elsewhere() {
    let a = r#"
        type Query {
          search(filter: Filter): [String]
        }

        input Filter {
          term: String!
          limit: Int!
        }
    "#;

    let b = r#"
        type Query {
          other(filter: Filter): Int
        }

        input Filter {
          term: String!
        }
    "#;

    let (_, diagnostics) = federate_sdl(&[("a", a), ("b", b)]);

    assert_eq!(
        errors(&diagnostics),
        [r#"The input field "Filter.limit" is required in "a" but missing in "b"."#]
    );
}

#[test]
fn arguments_are_intersected() {
    let a = r#"
        type Query {
          users(first: Int, after: String): [String] @shareable
        }
    "#;

    let b = r#"
        type Query {
          users(first: Int!): [String] @shareable
        }
    "#;

    let (federated, diagnostics) = federate_sdl(&[("a", a), ("b", b)]);

    assert!(diagnostics.is_empty(), "{:?}", errors(&diagnostics));

    let users = federated.schema.field("Query", "users").unwrap();

    assert_eq!(users.arguments.keys().collect::<Vec<_>>(), ["first"]);
    assert_eq!(users.arguments["first"].ty.to_string(), "Int!");
}

#[test]
fn interface_objects_contribute_fields_to_implementations() {
    let a = r#"
        type Query {
          media: [Media]
        }

        interface Media @key(fields: "id") {
          id: ID!
          title: String
        }

        type Book implements Media @key(fields: "id") {
          id: ID!
          title: String
        }

        type Movie implements Media @key(fields: "id") {
          id: ID!
          title: String
        }
    "#;

    let b = r#"
        type Media @interfaceObject @key(fields: "id") {
          id: ID!
          reviews: [String!]!
        }
    "#;

    let (federated, diagnostics) = federate_sdl(&[("a", a), ("b", b)]);

    assert!(!diagnostics.any_fatal(), "{:?}", errors(&diagnostics));

    let media = federated.schema.get("Media").unwrap();
    assert_eq!(media.kind, TypeKind::Interface);
    assert!(media.fields.contains_key("reviews"));
    assert!(federated.schema.field("Book", "reviews").is_some());
    assert_eq!(
        federated.origin_set("Movie", "reviews").unwrap().iter().collect::<Vec<_>>(),
        ["b"]
    );

    let media_configuration = &federated.configuration["Media"];
    assert!(media_configuration.is_interface_object);
    assert_eq!(
        media_configuration
            .entity_interface_concrete_type_names
            .iter()
            .collect::<Vec<_>>(),
        ["Book", "Movie"]
    );
}

#[test]
fn interface_object_without_interface() {
    let b = r#"
        type Query {
          media: Media
        }

        type Media @interfaceObject @key(fields: "id") {
          id: ID!
        }
    "#;

    let (_, diagnostics) = federate_sdl(&[("b", b)]);

    assert_eq!(
        errors(&diagnostics),
        [r#"The @interfaceObject "Media" in "b" does not correspond to an entity interface in any other subgraph."#]
    );
}

#[test]
fn no_query_root() {
    let a = r#"
        type Mutation {
          ping: Boolean
        }
    "#;

    let (_, diagnostics) = federate_sdl(&[("a", a)]);

    assert_eq!(
        errors(&diagnostics),
        ["The supergraph has no query root type: at least one subgraph must define a field on Query."]
    );
}

#[test]
fn inconsistent_provides() {
    let a = r#"
        type Query {
          review: Review
        }

        type Review {
          author: User @provides(fields: "name")
        }

        type User @key(fields: "id") {
          id: ID!
          name: String @external
          email: String @external
        }
    "#;

    let b = r#"
        type Query {
          reviews: [Review]
        }

        type Review {
          author: User @provides(fields: "email")
        }

        type User @key(fields: "id") {
          id: ID!
          name: String @external
          email: String @external
        }
    "#;

    let c = r#"
        type User @key(fields: "id") {
          id: ID!
          name: String
          email: String
        }
    "#;

    let (_, diagnostics) = federate_sdl(&[("a", a), ("b", b), ("c", c)]);

    assert_eq!(
        errors(&diagnostics),
        [r#"The field "Review.author" has inconsistent @provides selection sets: "name" in "a" and "email" in "b"."#]
    );
}

#[test]
fn conflicts_across_three_subgraphs_are_reported_once() {
    let a = r#"
        extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@shareable"])

        type Query {
          count: Int
          label: String @shareable
        }
    "#;

    let b = r#"
        extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@shareable"])

        type Query {
          count: [Int]
          label: String
        }
    "#;

    let c = r#"
        extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@shareable"])

        type Query {
          count: String
          label: String
        }
    "#;

    let (_, forward) = federate_sdl(&[("a", a), ("b", b), ("c", c)]);
    let (_, backward) = federate_sdl(&[("c", c), ("b", b), ("a", a)]);

    assert_eq!(
        errors(&forward),
        [
            r#"The field "Query.count" has incompatible types in subgraphs "a" (Int) and "b" ([Int])."#,
            r#"The field "Query.label" is resolvable in several subgraphs ("a", "b", "c") but is not marked @shareable in "b", "c"."#,
        ]
    );
    assert_eq!(forward, backward);
}

#[test]
fn keys_in_different_order_are_merged() {
    let a = r#"
        type Query {
          product: Product
        }

        type Product @key(fields: "id sku") {
          id: ID!
          sku: String! @shareable
        }
    "#;

    let b = r#"
        type Product @key(fields: "sku id") {
          id: ID!
          sku: String! @shareable
          price: Int
        }
    "#;

    let (federated, diagnostics) = federate_sdl(&[("a", a), ("b", b)]);

    assert!(diagnostics.is_empty(), "{:?}", errors(&diagnostics));
    assert_eq!(
        federated.configuration["Product"]
            .keys
            .iter()
            .map(|key| key.selection_set.as_str())
            .collect::<Vec<_>>(),
        ["id sku"]
    );
}
