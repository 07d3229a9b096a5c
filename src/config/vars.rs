//! Environment variable interpolation for config files.
//!
//! Supported forms:
//! - `$VAR` or `${VAR}` - the variable's value, error if unset
//! - `${VAR:-default}` - default when VAR is unset or empty
//! - `${VAR-default}` - default only when VAR is unset
//! - `$$` - a literal `$`

use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$                           # literal dollar
        |
        \$\{
            ([A-Za-z_][A-Za-z0-9_]*)   # 1: name
            (?:(:?-)([^}]*))?          # 2: operator, 3: default
        \}
        |
        \$([A-Za-z_][A-Za-z0-9_]*)     # 4: bare name
        ",
    )
    .expect("Invalid regex pattern")
});

/// Substitute environment variables in `input`.
///
/// Every problem is collected so a config with several missing variables
/// reports all of them in one go, each tagged with its line in the file.
pub fn interpolate(input: &str) -> Result<String, Vec<String>> {
    let mut errors = Vec::new();

    let text = ENV_VAR_PATTERN.replace_all(input, |caps: &Captures| {
        let whole = &caps[0];
        if whole == "$$" {
            return "$".to_string();
        }
        match resolve(caps) {
            Ok(value) => value,
            Err(problem) => {
                let offset = caps.get(0).map_or(0, |m| m.start());
                errors.push(format!("line {}: {}", line_of(input, offset), problem));
                whole.to_string()
            }
        }
    });

    if errors.is_empty() {
        Ok(text.into_owned())
    } else {
        Err(errors)
    }
}

fn line_of(input: &str, offset: usize) -> usize {
    input[..offset].matches('\n').count() + 1
}

fn resolve(caps: &Captures) -> Result<String, String> {
    let Some(name) = caps.get(1).or_else(|| caps.get(4)).map(|m| m.as_str()) else {
        return Ok(caps[0].to_string());
    };
    let operator = caps.get(2).map(|m| m.as_str());
    let default = caps.get(3).map(|m| m.as_str());

    match env::var(name) {
        // A value spanning lines would change the YAML structure around it.
        Ok(value) if value.contains('\n') || value.contains('\r') => {
            Err(format!("${{{name}}} expands to more than one line"))
        }
        Ok(value) if value.is_empty() && operator == Some(":-") => {
            Ok(default.unwrap_or_default().to_string())
        }
        Ok(value) => Ok(value),
        Err(_) => default.map(str::to_string).ok_or_else(|| {
            format!("${{{name}}} is not set; export it or write ${{{name}:-default}}")
        }),
    }
}
