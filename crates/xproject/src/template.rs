//! Positional placeholder substitution for path and URI templates.

use crate::error::{ConfigError, ProjectionError};
use crate::value::Value;

/// Replaces every `{n}` in `template` with the text of `args[n]`.
/// Placeholders past the end of `args` are kept literally; a brace that
/// does not form a placeholder is a configuration error.
pub fn substitute(template: &str, args: &[Value]) -> Result<String, ProjectionError> {
    let malformed = || ConfigError::MalformedTemplate {
        template: template.to_string(),
    };
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find(['{', '}']) {
        if rest[open..].starts_with('}') {
            return Err(malformed().into());
        }
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(malformed)?;
        let digits = &after[..close];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed().into());
        }
        match digits.parse::<usize>().ok().and_then(|index| args.get(index)) {
            Some(arg) => out.push_str(&arg.text()?),
            None => {
                out.push('{');
                out.push_str(digits);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
