//! Identifier case-convention aliaser.
//!
//! Pure helper, no I/O and no state: converts between the camelCase method
//! names a SLIM client sends and the snake_case names idiomatic Rust
//! fixtures expose, in both directions and with both initial letter cases.
//! `context.rs` uses this to build the alias set it falls back to when an
//! exact method-name match fails.

/// `helloWorld` / `HelloWorld` -> `hello_world`.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// `hello_world` -> `helloWorld`.
pub fn to_lower_camel_case(name: &str) -> String {
    let camel = to_upper_camel_case(name);
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `hello_world` -> `HelloWorld`.
pub fn to_upper_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut capitalize = true;
    for ch in name.chars() {
        if ch == '_' {
            capitalize = true;
            continue;
        }
        if capitalize {
            out.extend(ch.to_uppercase());
            capitalize = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// All of the case-convention spellings `target_for` should try for a given
/// snake_case method name, in preference order: the name itself, then
/// lowerCamel, then UpperCamel.
pub fn aliases_for(snake_name: &str) -> [String; 3] {
    [
        snake_name.to_owned(),
        to_lower_camel_case(snake_name),
        to_upper_camel_case(snake_name),
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn snake_from_lower_camel() {
        assert_eq!(to_snake_case("helloWorld"), "hello_world");
    }

    #[test]
    fn snake_from_upper_camel() {
        assert_eq!(to_snake_case("HelloWorld"), "hello_world");
    }

    #[test]
    fn lower_camel_from_snake() {
        assert_eq!(to_lower_camel_case("hello_world"), "helloWorld");
    }

    #[test]
    fn upper_camel_from_snake() {
        assert_eq!(to_upper_camel_case("hello_world"), "HelloWorld");
    }

    #[test]
    fn roundtrip_upper_camel_of_snake_alias() {
        // to_pythonic(to_upper_camel_case(x)) == x for snake inputs
        let x = "compute_total";
        assert_eq!(to_snake_case(&to_upper_camel_case(x)), x);
    }

    #[test]
    fn lower_camel_case_is_idempotent() {
        let x = "computeTotal";
        assert_eq!(to_lower_camel_case(x), x);
    }

    #[test]
    fn single_word_roundtrips() {
        assert_eq!(to_snake_case("echo"), "echo");
        assert_eq!(to_lower_camel_case("echo"), "echo");
        assert_eq!(to_upper_camel_case("echo"), "Echo");
    }
}
