//! `$placeholder` substitution for the installer script.
//!
//! Recognized syntax: `$name` and `${name}` where `name` is an ASCII
//! identifier, and `$$` as an escaped dollar sign. Substitution is "safe":
//! placeholders other than the one being replaced, and any `$` that does not
//! start valid syntax, are copied through unchanged. Shell variables such as
//! `${HOME}` or `$1` in the script therefore survive.

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Length in bytes of the identifier at the start of `s` (0 if none).
fn ident_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if is_ident_start(c) => {}
        _ => return 0,
    }
    chars
        .find(|&(_, c)| !is_ident_continue(c))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Replace every `$name` / `${name}` occurrence of `name` with `value`.
pub fn safe_substitute(template: &str, name: &str, value: &str) -> String {
    let mut out = String::with_capacity(template.len() + value.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        if let Some(braced) = after.strip_prefix('{') {
            let len = ident_len(braced);
            if len > 0 && braced[len..].starts_with('}') {
                let ident = &braced[..len];
                if ident == name {
                    out.push_str(value);
                } else {
                    out.push_str(&rest[pos..pos + len + 3]);
                }
                rest = &braced[len + 1..];
                continue;
            }
        } else {
            let len = ident_len(after);
            if len > 0 {
                let ident = &after[..len];
                if ident == name {
                    out.push_str(value);
                } else {
                    out.push('$');
                    out.push_str(ident);
                }
                rest = &after[len..];
                continue;
            }
        }

        // Not a placeholder: keep the dollar sign literally.
        out.push('$');
        rest = after;
    }

    out.push_str(rest);
    out
}
