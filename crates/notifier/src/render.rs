//! Payload renderer.
//!
//! Walks a [`Template`] and fills `{name}` placeholders in string scalars from
//! a flat [`Context`]. Substitution is all-or-nothing per scalar: if any
//! placeholder in a string is unknown, or the string is not well-formed
//! (`{}`, a lone `{` or `}`, an unterminated `{name`), the original text is
//! kept byte-for-byte. `{{` and `}}` render as literal braces.
//!
//! Rendering never fails; an incomplete context degrades to unresolved text.

use serde_json::{Map, Value};

use gpuwatch_common::types::Context;

use crate::template::Template;

/// Render a template into a JSON payload.
pub fn render(template: &Template, context: &Context) -> Value {
    match template {
        Template::Text(text) => {
            Value::String(substitute(text, context).unwrap_or_else(|| text.clone()))
        }
        Template::Scalar(value) => value.clone(),
        Template::List(items) => Value::Array(items.iter().map(|t| render(t, context)).collect()),
        Template::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key.clone(), render(value, context));
            }
            Value::Object(map)
        }
    }
}

/// Placeholder names in a string, or none if the string is ill-formed.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let well_formed = scan(text, |name| {
        names.push(name.to_string());
        Some("")
    })
    .is_some();

    if well_formed { names } else { Vec::new() }
}

fn substitute(text: &str, context: &Context) -> Option<String> {
    scan(text, |name| context.get(name))
}

/// Single pass over brace syntax. `resolve` returns the replacement for a
/// placeholder name; `None` from it, or any syntax error, aborts the scan.
fn scan<'a, F>(text: &str, mut resolve: F) -> Option<String>
where
    F: FnMut(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return None,
                        Some(ch) => name.push(ch),
                    }
                }
                if name.is_empty() {
                    return None;
                }
                out.push_str(resolve(&name)?);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return None,
            _ => out.push(c),
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn text(s: &str) -> Template {
        Template::Text(s.to_string())
    }

    fn ctx() -> Context {
        Context::new()
            .with("gpu_model", "RTX4090")
            .with("temperature", 85)
    }

    #[test]
    fn test_substitutes_all_placeholders() {
        assert_eq!(
            render(&text("{gpu_model} at {temperature} °C"), &ctx()),
            json!("RTX4090 at 85 °C")
        );
    }

    #[test]
    fn test_missing_key_keeps_whole_scalar() {
        // gpu_model resolves, host does not: nothing is substituted
        assert_eq!(
            render(&text("{gpu_model} on {host}"), &ctx()),
            json!("{gpu_model} on {host}")
        );
    }

    #[test]
    fn test_malformed_scalars_unchanged() {
        for raw in ["{", "}", "{}", "{gpu_model", "a } b", "{gpu{model}}"] {
            assert_eq!(render(&text(raw), &ctx()), json!(raw), "input {raw:?}");
        }
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(
            render(&text("{{literal}} {gpu_model}"), &ctx()),
            json!("{literal} RTX4090")
        );
    }

    #[test]
    fn test_plain_text_and_extra_keys() {
        assert_eq!(render(&text("no placeholders"), &ctx()), json!("no placeholders"));
    }

    #[test]
    fn test_non_string_scalars_pass_through() {
        let template = Template::from_json(json!({"short": true, "n": 3, "z": null}));
        assert_eq!(
            render(&template, &ctx()),
            json!({"short": true, "n": 3, "z": null})
        );
    }

    #[test]
    fn test_nested_structure_and_key_order() {
        let template = Template::from_json(json!({
            "zeta": [{"value": "{gpu_model}"}, "{missing}"],
            "alpha": "{temperature}",
        }));
        let rendered = render(&template, &ctx());

        assert_eq!(
            rendered,
            json!({
                "zeta": [{"value": "RTX4090"}, "{missing}"],
                "alpha": "85",
            })
        );
        let keys: Vec<&String> = rendered.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders("{a} and {b} {{c}}"), vec!["a", "b"]);
        assert!(placeholders("{a").is_empty());
        assert!(placeholders("plain").is_empty());
    }
}
