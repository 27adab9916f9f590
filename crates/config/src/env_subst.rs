/// Replace `${ENV_VAR}` placeholders in raw config text.
///
/// Unset variables are left in place so validation can report them.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute_env`] with an injectable lookup.
pub(crate) fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            },
            // `${}` or an unterminated placeholder: keep the literal text.
            _ => {
                out.push_str("${");
                rest = after;
            },
        }
    }
    out.push_str(rest);
    out
}
