use super::{
    events::{self, EventDirective},
    *,
};
use crate::ast::{Deprecation, PersistedDirectives};
use cynic_parser::ConstValue;

type Directives<'a> = ast::iter::Iter<'a, ast::Directive<'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectiveNameMatch {
    Key,
    External,
    Shareable,
    Provides,
    Requires,
    Override,
    InterfaceObject,
    Extends,
    Inaccessible,
    Tag,
    Deprecated,
    Event(EventDirective),
    SubscriptionFilter,
    NoMatch,
}

fn match_directive_name(name: &str) -> DirectiveNameMatch {
    let name = name.strip_prefix("federation__").unwrap_or(name);

    match name {
        "key" => DirectiveNameMatch::Key,
        "external" => DirectiveNameMatch::External,
        "shareable" => DirectiveNameMatch::Shareable,
        "provides" => DirectiveNameMatch::Provides,
        "requires" => DirectiveNameMatch::Requires,
        "override" => DirectiveNameMatch::Override,
        "interfaceObject" => DirectiveNameMatch::InterfaceObject,
        "extends" => DirectiveNameMatch::Extends,
        "inaccessible" => DirectiveNameMatch::Inaccessible,
        "tag" => DirectiveNameMatch::Tag,
        "deprecated" => DirectiveNameMatch::Deprecated,
        events::SUBSCRIPTION_FILTER => DirectiveNameMatch::SubscriptionFilter,
        other => EventDirective::from_name(other)
            .map(DirectiveNameMatch::Event)
            .unwrap_or(DirectiveNameMatch::NoMatch),
    }
}

/// Federation directives found on a type definition or extension.
#[derive(Debug, Default)]
pub(super) struct TypeDirectives {
    pub(super) persisted: PersistedDirectives,
    pub(super) keys: Vec<Key>,
    pub(super) shareable: bool,
    pub(super) interface_object: bool,
    pub(super) extends: bool,
    /// `@external` on a type marks all of its fields external.
    pub(super) external: bool,
}

pub(super) fn ingest_type_directives(ctx: &mut Context<'_>, type_name: &str, directives: Directives<'_>) -> TypeDirectives {
    let mut out = TypeDirectives::default();

    for directive in directives {
        match match_directive_name(directive.name()) {
            DirectiveNameMatch::Key => {
                let Some(fields) = string_argument(directive, "fields") else {
                    ctx.push_error(format!(
                        "The @key directive on `{type_name}` is missing the `fields` argument, or it is not a string."
                    ));
                    continue;
                };

                let resolvable = directive
                    .argument("resolvable")
                    .and_then(|argument| argument.value().as_bool())
                    .unwrap_or(true);

                match FieldSet::parse(fields, "key") {
                    Ok(fields) => {
                        let key = Key { fields, resolvable };

                        if !out.keys.contains(&key) {
                            out.keys.push(key);
                        }
                    }
                    Err(error) => ctx.push_error(format!("Error in @key on `{type_name}`: {error}")),
                }
            }
            DirectiveNameMatch::Shareable => {
                ctx.uses_version_two_directives = true;
                out.shareable = true;
            }
            DirectiveNameMatch::InterfaceObject => {
                ctx.uses_version_two_directives = true;
                out.interface_object = true;
            }
            DirectiveNameMatch::Extends => {
                ctx.push_warning(format!(
                    "The @extends directive on `{type_name}` is deprecated. Use `extend type {type_name}` instead."
                ));
                out.extends = true;
            }
            DirectiveNameMatch::External => out.external = true,
            DirectiveNameMatch::Inaccessible
            | DirectiveNameMatch::Tag
            | DirectiveNameMatch::Deprecated => {
                ingest_persisted_directive(ctx, directive, &mut out.persisted, || type_name.to_owned());
            }
            DirectiveNameMatch::Provides
            | DirectiveNameMatch::Requires
            | DirectiveNameMatch::Override
            | DirectiveNameMatch::Event(_)
            | DirectiveNameMatch::SubscriptionFilter => {
                ctx.push_error(format!(
                    "The @{} directive is not allowed on the type `{type_name}`. It can only be used on fields.",
                    directive.name()
                ));
            }
            DirectiveNameMatch::NoMatch => (),
        }
    }

    out
}

/// Federation directives found on an object or interface field. Event subjects may reference
/// `argument_names`.
pub(super) fn ingest_field_directives(
    ctx: &mut Context<'_>,
    type_name: &str,
    field_name: &str,
    argument_names: &[&str],
    directives: Directives<'_>,
) -> (PersistedDirectives, FieldFederation) {
    let mut persisted = PersistedDirectives::default();
    let mut federation = FieldFederation::default();
    let location = format!("{type_name}.{field_name}");

    for directive in directives {
        match match_directive_name(directive.name()) {
            DirectiveNameMatch::External => federation.external = true,
            DirectiveNameMatch::Shareable => {
                ctx.uses_version_two_directives = true;
                federation.shareable = true;
            }
            DirectiveNameMatch::Provides | DirectiveNameMatch::Requires => {
                let directive_name = directive.name();

                let Some(fields) = string_argument(directive, "fields") else {
                    ctx.push_error(format!(
                        "The @{directive_name} directive on `{location}` is missing the `fields` argument, or it is not a string."
                    ));
                    continue;
                };

                let fields = match FieldSet::parse(fields, directive_name) {
                    Ok(fields) => fields,
                    Err(error) => {
                        ctx.push_error(format!("Error in @{directive_name} on `{location}`: {error}"));
                        continue;
                    }
                };

                if directive_name.ends_with("provides") {
                    federation.provides = Some(fields);
                } else {
                    federation.requires = Some(fields);
                }
            }
            DirectiveNameMatch::Override => {
                ctx.uses_version_two_directives = true;

                match string_argument(directive, "from") {
                    Some(from) if from == ctx.subgraph_name => ctx.push_error(format!(
                        r#"Source and destination subgraphs "{from}" are the same for overridden field "{location}""#
                    )),
                    Some(from) if !from.is_empty() => federation.override_from = Some(from.to_owned()),
                    _ => ctx.push_error(format!(
                        "The @override directive on `{location}` requires a non-empty `from` string argument."
                    )),
                }
            }
            DirectiveNameMatch::Event(event) => {
                let mut warnings = Vec::new();
                let event = events::ingest_event(directive, event, type_name, field_name, argument_names, &mut warnings);

                for warning in warnings {
                    ctx.push_warning(warning);
                }

                match event {
                    Ok(event) => federation.events.push(event),
                    Err(reasons) => ctx.push_error(format!(
                        "The event directive \"{}\" declared on \"{location}\" is invalid for the following reason(s):\n {}",
                        directive.name(),
                        reasons.join("\n ")
                    )),
                }
            }
            DirectiveNameMatch::SubscriptionFilter if type_name != "Subscription" => ctx.push_error(format!(
                r#"The "@{}" directive must only be defined on a subscription root field, but it was defined on the path "{location}"."#,
                events::SUBSCRIPTION_FILTER
            )),
            DirectiveNameMatch::SubscriptionFilter => match events::ingest_subscription_filter(directive) {
                Ok(condition) => federation.subscription_filter = Some(condition),
                Err(reasons) => ctx.push_error(format!(
                    "The \"@{}\" directive defined on path \"{location}\" is invalid for the following reason(s):\n{}",
                    events::SUBSCRIPTION_FILTER,
                    reasons.join("\n")
                )),
            },
            DirectiveNameMatch::Inaccessible
            | DirectiveNameMatch::Tag
            | DirectiveNameMatch::Deprecated => {
                ingest_persisted_directive(ctx, directive, &mut persisted, || location.clone());
            }
            DirectiveNameMatch::Key | DirectiveNameMatch::InterfaceObject | DirectiveNameMatch::Extends => {
                ctx.push_error(format!(
                    "The @{} directive is not allowed on the field `{location}`.",
                    directive.name()
                ));
            }
            DirectiveNameMatch::NoMatch => (),
        }
    }

    (persisted, federation)
}

/// Directives on arguments, input fields and enum values: only the persisted ones matter.
pub(super) fn ingest_value_directives(
    ctx: &mut Context<'_>,
    location: &str,
    directives: Directives<'_>,
) -> PersistedDirectives {
    let mut persisted = PersistedDirectives::default();

    for directive in directives {
        match match_directive_name(directive.name()) {
            DirectiveNameMatch::Inaccessible
            | DirectiveNameMatch::Tag
            | DirectiveNameMatch::Deprecated => {
                ingest_persisted_directive(ctx, directive, &mut persisted, || location.to_owned());
            }
            DirectiveNameMatch::NoMatch => (),
            _ => ctx.push_error(format!(
                "The @{} directive is not allowed on `{location}`.",
                directive.name()
            )),
        }
    }

    persisted
}

fn ingest_persisted_directive(
    ctx: &mut Context<'_>,
    directive: ast::Directive<'_>,
    persisted: &mut PersistedDirectives,
    location: impl Fn() -> String,
) {
    match match_directive_name(directive.name()) {
        DirectiveNameMatch::Inaccessible => {
            ctx.uses_version_two_directives = true;
            persisted.inaccessible = true;
        }
        DirectiveNameMatch::Tag => match string_argument(directive, "name") {
            Some(name) => {
                persisted.tags.insert(name.to_owned());
            }
            None => ctx.push_error(format!(
                "The @tag directive on `{}` requires a `name` string argument.",
                location()
            )),
        },
        DirectiveNameMatch::Deprecated => {
            let reason = directive.argument("reason").map(|argument| argument.value());

            let reason = match reason {
                None | Some(ConstValue::Null(_)) => None,
                Some(ConstValue::String(reason)) => Some(reason.as_str().to_owned()),
                Some(_) => {
                    ctx.push_error(format!(
                        "The `reason` argument of @deprecated on `{}` must be a string.",
                        location()
                    ));
                    None
                }
            };

            persisted.deprecated = Some(Deprecation { reason });
        }
        _ => (),
    }
}

fn string_argument<'a>(directive: ast::Directive<'a>, name: &str) -> Option<&'a str> {
    directive.argument(name).and_then(|argument| argument.value().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_names_match() {
        assert_eq!(match_directive_name("federation__key"), DirectiveNameMatch::Key);
        assert_eq!(match_directive_name("key"), DirectiveNameMatch::Key);
        assert_eq!(
            match_directive_name("eventsSubscribe"),
            DirectiveNameMatch::Event(EventDirective::Generic(crate::configuration::EventKind::Subscribe))
        );
        assert_eq!(
            match_directive_name("edfs__natsSubscribe"),
            DirectiveNameMatch::Event(EventDirective::NatsSubscribe)
        );
        assert_eq!(
            match_directive_name("openfed__subscriptionFilter"),
            DirectiveNameMatch::SubscriptionFilter
        );
        assert_eq!(match_directive_name("custom"), DirectiveNameMatch::NoMatch);
    }
}
