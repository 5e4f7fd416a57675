pub(crate) fn to_json_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut uppercase_next = false;

    for ch in name.chars() {
        if ch == '_' {
            uppercase_next = true
        } else if uppercase_next {
            result.push(ch.to_ascii_uppercase());
            uppercase_next = false;
        } else {
            result.push(ch);
        }
    }

    result
}

pub(crate) fn to_pascal_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut uppercase_next = true;

    for ch in name.chars() {
        if ch == '_' {
            uppercase_next = true
        } else if uppercase_next {
            result.push(ch.to_ascii_uppercase());
            uppercase_next = false;
        } else {
            result.push(ch);
        }
    }

    result
}

/// Removes `prefix` from the start of `name`, ignoring case and underscores.
///
/// Returns `name` unchanged if it does not start with the prefix, or if nothing
/// usable as an identifier would remain.
pub(crate) fn strip_enum_prefix<'a>(prefix: &str, name: &'a str) -> &'a str {
    let mut prefix_chars = prefix
        .chars()
        .filter(|&ch| ch != '_')
        .map(|ch| ch.to_ascii_lowercase())
        .peekable();

    let mut rest = name;
    while prefix_chars.peek().is_some() {
        let mut chars = rest.chars();
        match chars.next() {
            Some('_') => rest = chars.as_str(),
            Some(ch) if Some(ch.to_ascii_lowercase()) == prefix_chars.peek().copied() => {
                prefix_chars.next();
                rest = chars.as_str();
            }
            _ => return name,
        }
    }

    let rest = rest.trim_start_matches('_');
    match rest.chars().next() {
        Some(ch) if !ch.is_ascii_digit() => rest,
        _ => name,
    }
}

/// The name used to detect conflicts between enum values once they are converted
/// to camel case by code generators.
pub(crate) fn enum_value_camel_case(enum_name: &str, value_name: &str) -> String {
    let mut result = String::with_capacity(value_name.len());
    let mut uppercase_next = true;

    for ch in strip_enum_prefix(enum_name, value_name).chars() {
        if ch == '_' {
            uppercase_next = true
        } else if uppercase_next {
            result.push(ch.to_ascii_uppercase());
            uppercase_next = false;
        } else {
            result.push(ch.to_ascii_lowercase());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn json_name() {
        assert_eq!(to_json_name("foo_bar"), "fooBar");
        assert_eq!(to_json_name("foo__bar"), "fooBar");
        assert_eq!(to_json_name("_foo"), "Foo");
        assert_eq!(to_json_name("FooBar"), "FooBar");
    }

    #[test]
    fn pascal_case() {
        assert_eq!(to_pascal_case("foo_bar"), "FooBar");
        assert_eq!(to_pascal_case("my_mapField"), "MyMapField");
        assert_eq!(to_pascal_case("bar"), "Bar");
    }

    #[test]
    fn strip_prefix() {
        assert_eq!(strip_enum_prefix("FooBar", "FOO_BAR_BAZ"), "BAZ");
        assert_eq!(strip_enum_prefix("FooBar", "foobar_baz"), "baz");
        assert_eq!(strip_enum_prefix("FooBar", "FOO_BAZ"), "FOO_BAZ");
        assert_eq!(strip_enum_prefix("Foo", "FOO"), "FOO");
        assert_eq!(strip_enum_prefix("Foo", "FOO_1"), "FOO_1");
    }

    #[test]
    fn enum_value_camel_case_conflict() {
        assert_eq!(enum_value_camel_case("Foo", "FOO_BAR"), "Bar");
        assert_eq!(enum_value_camel_case("Foo", "BAR"), "Bar");
        assert_ne!(enum_value_camel_case("Foo", "BAR_BAZ"), "Barbaz");
    }

    proptest! {
        #[test]
        fn json_name_has_no_underscores(name in "[a-z_][a-z0-9_]{0,16}") {
            prop_assert!(!to_json_name(&name).contains('_'));
        }

        #[test]
        fn strip_enum_prefix_is_suffix(prefix in "[A-Za-z]{1,6}", name in "[A-Z_]{1,12}") {
            prop_assert!(name.ends_with(strip_enum_prefix(&prefix, &name)));
        }
    }
}
