use super::*;

/// Root operation types declared in a `schema { ... }` definition or extension. Roots are renamed
/// to their default names (`Query`, `Mutation`, `Subscription`) during normalization.
#[derive(Debug, Default)]
pub(super) struct RootTypes {
    query: Option<String>,
    mutation: Option<String>,
    subscription: Option<String>,
}

impl RootTypes {
    fn declared(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("Query", self.query.as_deref()),
            ("Mutation", self.mutation.as_deref()),
            ("Subscription", self.subscription.as_deref()),
        ]
    }

    /// The name a type is known by after root renaming.
    pub(super) fn rename<'a>(&self, name: &'a str) -> &'a str {
        self.declared()
            .into_iter()
            .find(|(_, declared)| *declared == Some(name))
            .map(|(default_name, _)| default_name)
            .unwrap_or(name)
    }

    /// A type that has a default root name, while a schema definition makes another type that
    /// root.
    pub(super) fn shadows_root_name(&self, name: &str) -> bool {
        self.declared()
            .into_iter()
            .any(|(default_name, declared)| default_name == name && declared.is_some_and(|declared| declared != name))
    }
}

pub(super) fn ingest_schema_definitions(ctx: &mut Context<'_>, document: &ast::TypeSystemDocument) {
    for definition in document.definitions() {
        let schema_definition = match definition {
            ast::Definition::Schema(schema) | ast::Definition::SchemaExtension(schema) => schema,
            _ => continue,
        };

        for directive in schema_definition.directives() {
            if directive.name() != "link" {
                continue;
            }

            let url = directive.argument("url").and_then(|argument| argument.value().as_str());

            if url.is_some_and(is_federation_v2_url) {
                ctx.links_federation_v2 = true;
            }
        }

        let operations = [
            ("query", schema_definition.query_type().map(|root| root.named_type())),
            ("mutation", schema_definition.mutation_type().map(|root| root.named_type())),
            (
                "subscription",
                schema_definition.subscription_type().map(|root| root.named_type()),
            ),
        ];

        for (operation, named_type) in operations {
            let Some(named_type) = named_type else { continue };

            let conflict = {
                let slot = match operation {
                    "query" => &mut ctx.roots.query,
                    "mutation" => &mut ctx.roots.mutation,
                    _ => &mut ctx.roots.subscription,
                };

                match slot.as_deref() {
                    Some(existing) if existing != named_type => Some(format!(
                        "The {operation} root operation type is declared more than once: `{existing}` and `{named_type}`."
                    )),
                    Some(_) => None,
                    None => {
                        *slot = Some(named_type.to_owned());
                        None
                    }
                }
            };

            if let Some(message) = conflict {
                ctx.push_error(message);
            }
        }
    }
}

fn is_federation_v2_url(url: &str) -> bool {
    let Some((base, version)) = url.trim_end_matches('/').rsplit_once('/') else {
        return false;
    };

    base.ends_with("/federation") && version.starts_with("v2")
}

/// Root types that only held federation fields (`_service`, `_entities`) are not part of the
/// schema.
pub(super) fn drop_empty_root_types(ctx: &mut Context<'_>) {
    for root in ROOT_TYPE_NAMES {
        if ctx.schema.get(root).is_some_and(|ty| ty.fields.is_empty()) {
            ctx.schema.types.remove(root);
            ctx.federation.remove(root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn federation_urls() {
        assert!(is_federation_v2_url("https://specs.apollo.dev/federation/v2.3"));
        assert!(is_federation_v2_url("https://specs.apollo.dev/federation/v2.0/"));
        assert!(!is_federation_v2_url("https://specs.apollo.dev/federation/v1.0"));
        assert!(!is_federation_v2_url("https://specs.apollo.dev/link/v1.0"));
    }

    #[test]
    fn renaming() {
        let roots = RootTypes {
            query: Some("RootQuery".to_owned()),
            ..Default::default()
        };

        assert_eq!(roots.rename("RootQuery"), "Query");
        assert_eq!(roots.rename("Product"), "Product");
        assert!(roots.shadows_root_name("Query"));
        assert!(!roots.shadows_root_name("Mutation"));
    }
}
