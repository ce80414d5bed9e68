//! `{placeholder}` expansion for tool arguments and artifact paths.

use std::collections::BTreeMap;

/// Placeholders understood in `tool.generate_args` and `tool.artifact_path`.
pub const PLACEHOLDERS: &[&str] = &["manifest", "fixture", "output", "profile", "target"];

/// Values substituted into templates.
pub type Vars = BTreeMap<&'static str, String>;

/// Replace every known `{name}` in `template` with its value.
///
/// Unknown placeholders are left untouched; use [`unknown_placeholders`]
/// to reject them up front.
pub fn expand(template: &str, vars: &Vars) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{}}}", name), value);
    }
    out
}

/// Names inside `{...}` that are not in [`PLACEHOLDERS`].
pub fn unknown_placeholders(template: &str) -> Vec<String> {
    let mut unknown = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = &after[..end];
        if !PLACEHOLDERS.contains(&name) {
            unknown.push(name.to_string());
        }
        rest = &after[end + 1..];
    }
    unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand() {
        let mut vars = Vars::new();
        vars.insert("profile", "release".to_string());
        vars.insert("target", "x".to_string());

        assert_eq!(expand("{profile}/{target}", &vars), "release/x");
        assert_eq!(expand("-g", &vars), "-g");
        assert_eq!(expand("{other}", &vars), "{other}");
    }

    #[test]
    fn test_unknown_placeholders() {
        assert!(unknown_placeholders("--manifest={manifest} {output}").is_empty());
        assert_eq!(unknown_placeholders("{manifset}/{target}"), vec!["manifset"]);
        assert!(unknown_placeholders("unterminated {brace").is_empty());
    }
}
