use crate::ast::{
    FieldDefinition, InputValueDefinition, PersistedDirectives, Schema, TypeDefinition, TypeKind, BUILTIN_SCALARS,
};
use itertools::Itertools;
use std::fmt::{self, Display, Write};

const INDENT: &str = "    ";

const DIRECTIVE_LOCATIONS: &str = "FIELD_DEFINITION | OBJECT | INTERFACE | UNION | ARGUMENT_DEFINITION | SCALAR | ENUM | ENUM_VALUE | INPUT_OBJECT | INPUT_FIELD_DEFINITION";

/// Render the composed schema as GraphQL SDL. Types are printed in name order, with `@tag`,
/// `@inaccessible` and `@deprecated` kept. Federation directives are not part of the output.
pub fn render_sdl(schema: &Schema) -> String {
    Renderer { schema }.to_string()
}

struct Renderer<'a> {
    schema: &'a Schema,
}

impl Display for Renderer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Renderer { schema } = self;
        let mut write_leading_whitespace = {
            let mut first_block = true;
            move |f: &mut fmt::Formatter<'_>| {
                if first_block {
                    first_block = false;
                    Ok(())
                } else {
                    f.write_char('\n')
                }
            }
        };

        let used = UsedDirectives::collect(schema);

        if used.inaccessible {
            write_leading_whitespace(f)?;
            writeln!(f, "directive @inaccessible on {DIRECTIVE_LOCATIONS}")?;
        }

        if used.tag {
            write_leading_whitespace(f)?;
            writeln!(f, "directive @tag(name: String!) repeatable on {DIRECTIVE_LOCATIONS}")?;
        }

        for definition in schema.types.values() {
            if definition.kind == TypeKind::Scalar && BUILTIN_SCALARS.contains(&definition.name.as_str()) {
                continue;
            }

            write_leading_whitespace(f)?;
            write_type_definition(f, definition)?;
        }

        Ok(())
    }
}

fn write_type_definition(f: &mut fmt::Formatter<'_>, definition: &TypeDefinition) -> fmt::Result {
    if let Some(description) = &definition.description {
        Description(description, "").fmt(f)?;
    }

    write!(f, "{} {}", definition.kind.keyword(), definition.name)?;

    match definition.kind {
        TypeKind::Object | TypeKind::Interface => {
            if !definition.interfaces.is_empty() {
                write!(f, " implements {}", definition.interfaces.iter().join(" & "))?;
            }

            write_directives(f, &definition.directives)?;
            f.write_char(' ')?;

            write_block(f, |f| {
                for field in definition.fields.values() {
                    write_field(f, field)?;
                }

                Ok(())
            })?;
        }
        TypeKind::Union => {
            write_directives(f, &definition.directives)?;

            if !definition.members.is_empty() {
                write!(f, " = {}", definition.members.iter().join(" | "))?;
            }
        }
        TypeKind::Enum => {
            write_directives(f, &definition.directives)?;
            f.write_char(' ')?;

            write_block(f, |f| {
                for value in definition.values.values() {
                    if let Some(description) = &value.description {
                        Description(description, INDENT).fmt(f)?;
                    }

                    f.write_str(INDENT)?;
                    f.write_str(&value.name)?;
                    write_directives(f, &value.directives)?;
                    f.write_char('\n')?;
                }

                Ok(())
            })?;
        }
        TypeKind::Scalar => write_directives(f, &definition.directives)?,
        TypeKind::InputObject => {
            write_directives(f, &definition.directives)?;
            f.write_char(' ')?;

            write_block(f, |f| {
                for field in definition.input_fields.values() {
                    if let Some(description) = &field.description {
                        Description(description, INDENT).fmt(f)?;
                    }

                    f.write_str(INDENT)?;
                    write_input_value(f, field)?;
                    f.write_char('\n')?;
                }

                Ok(())
            })?;
        }
    }

    f.write_char('\n')
}

fn write_field(f: &mut fmt::Formatter<'_>, field: &FieldDefinition) -> fmt::Result {
    if let Some(description) = &field.description {
        Description(description, INDENT).fmt(f)?;
    }

    f.write_str(INDENT)?;
    f.write_str(&field.name)?;

    if !field.arguments.is_empty() {
        let multiline = field.arguments.values().any(|argument| argument.description.is_some());

        if multiline {
            f.write_str("(\n")?;

            for argument in field.arguments.values() {
                let indentation = format!("{INDENT}{INDENT}");

                if let Some(description) = &argument.description {
                    Description(description, &indentation).fmt(f)?;
                }

                f.write_str(&indentation)?;
                write_input_value(f, argument)?;
                f.write_char('\n')?;
            }

            f.write_str(INDENT)?;
            f.write_char(')')?;
        } else {
            f.write_char('(')?;

            for (idx, argument) in field.arguments.values().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }

                write_input_value(f, argument)?;
            }

            f.write_char(')')?;
        }
    }

    write!(f, ": {}", field.ty)?;
    write_directives(f, &field.directives)?;
    f.write_char('\n')
}

fn write_input_value(f: &mut fmt::Formatter<'_>, value: &InputValueDefinition) -> fmt::Result {
    write!(f, "{}: {}", value.name, value.ty)?;

    if let Some(default_value) = &value.default_value {
        write!(f, " = {default_value}")?;
    }

    write_directives(f, &value.directives)
}

fn write_directives(f: &mut fmt::Formatter<'_>, directives: &PersistedDirectives) -> fmt::Result {
    if let Some(deprecation) = &directives.deprecated {
        f.write_str(" @deprecated")?;

        if let Some(reason) = &deprecation.reason {
            f.write_str("(reason: ")?;
            write_quoted(f, reason)?;
            f.write_char(')')?;
        }
    }

    for tag in &directives.tags {
        f.write_str(" @tag(name: ")?;
        write_quoted(f, tag)?;
        f.write_char(')')?;
    }

    if directives.inaccessible {
        f.write_str(" @inaccessible")?;
    }

    Ok(())
}

fn write_block(
    f: &mut fmt::Formatter<'_>,
    inner: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    f.write_str("{\n")?;
    inner(f)?;
    f.write_char('}')
}

pub(crate) fn write_quoted(sdl: &mut impl Write, s: &str) -> fmt::Result {
    sdl.write_char('"')?;
    for c in s.chars() {
        match c {
            '\r' => sdl.write_str("\\r"),
            '\n' => sdl.write_str("\\n"),
            '\t' => sdl.write_str("\\t"),
            '\\' => sdl.write_str("\\\\"),
            '"' => sdl.write_str("\\\""),
            c if c.is_control() => write!(sdl, "\\u{:04X}", c as u32),
            c => sdl.write_char(c),
        }?
    }
    sdl.write_char('"')
}

/// A block string description, at the given indentation.
struct Description<'a>(&'a str, &'a str);

impl Display for Description<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Description(description, indentation) = self;

        writeln!(f, r#"{indentation}""""#)?;

        let mut lines = description.lines().skip_while(|line| line.trim().is_empty()).peekable();

        while let Some(line) = lines.next() {
            let line = line.trim();

            if line.is_empty() && lines.peek().map(|next| next.trim().is_empty()).unwrap_or(true) {
                continue;
            }

            writeln!(f, "{indentation}{}", line.replace(r#"""""#, r#"\""""#))?;
        }

        writeln!(f, r#"{indentation}""""#)
    }
}

#[derive(Default)]
struct UsedDirectives {
    tag: bool,
    inaccessible: bool,
}

impl UsedDirectives {
    fn collect(schema: &Schema) -> Self {
        let mut used = UsedDirectives::default();
        let mut visit = |directives: &PersistedDirectives| {
            used.tag |= !directives.tags.is_empty();
            used.inaccessible |= directives.inaccessible;
        };

        for definition in schema.types.values() {
            visit(&definition.directives);

            for field in definition.fields.values() {
                visit(&field.directives);
                field.arguments.values().for_each(|argument| visit(&argument.directives));
            }

            definition.input_fields.values().for_each(|field| visit(&field.directives));
            definition.values.values().for_each(|value| visit(&value.directives));
        }

        used
    }
}
