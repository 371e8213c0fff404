//! Accessor name matching.
//!
//! Maps a function signature such as `getVersion()` to the local name of the
//! field it would expose. Matching is purely lexical and never fails: names
//! that do not look like accessors simply have no candidate field.

use crate::model::entity::{child_id, local_name, parent_id};

const GETTER_PREFIX: &str = "get";
const SETTER_PREFIX: &str = "set";
const BOOLEAN_GETTER_PREFIX: &str = "is";

/// Returns the field name exposed by an accessor signature, if any.
///
/// `getVersion()` and `setVersion(int)` map to `version`, `isEnabled()` maps
/// to `enabled`. The parameter list is ignored, so `isA` maps to `a`.
pub fn field_name_for_accessor(signature: &str) -> Option<String> {
    let name = strip_parameters(signature);
    if name.len() > GETTER_PREFIX.len()
        && (name.starts_with(GETTER_PREFIX) || name.starts_with(SETTER_PREFIX))
    {
        Some(decapitalize(&name[GETTER_PREFIX.len()..]))
    } else if name.len() > BOOLEAN_GETTER_PREFIX.len() && name.starts_with(BOOLEAN_GETTER_PREFIX)
    {
        Some(decapitalize(&name[BOOLEAN_GETTER_PREFIX.len()..]))
    } else {
        None
    }
}

/// Returns the qualified id of the field exposed by the function `accessor_id`.
///
/// The field is looked up next to the accessor, under the same parent entity.
pub fn field_id_for_accessor(accessor_id: &str) -> Option<String> {
    let parent = parent_id(accessor_id)?;
    let field_name = field_name_for_accessor(local_name(accessor_id))?;
    Some(child_id(parent, &field_name))
}

fn strip_parameters(signature: &str) -> &str {
    match signature.find('(') {
        Some(index) => &signature[..index],
        None => signature,
    }
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => first.to_lowercase().chain(chars).collect(),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{field_id_for_accessor, field_name_for_accessor};

    #[test]
    fn accessor_names_map_to_field_names() {
        let cases = [
            ("getVersion()", Some("version")),
            ("isEnabled()", Some("enabled")),
            ("setX()", Some("x")),
            ("setVersion(int)", Some("version")),
            ("isA", Some("a")),
            ("get_value()", Some("_value")),
            ("getter()", Some("ter")),
            ("get()", None),
            ("is()", None),
            ("set", None),
            ("", None),
            ("run()", None),
            ("(getVersion)", None),
        ];

        for (signature, expected) in cases {
            assert_eq!(
                field_name_for_accessor(signature).as_deref(),
                expected,
                "signature `{signature}`"
            );
        }
    }

    #[test]
    fn field_id_is_resolved_next_to_the_accessor() {
        assert_eq!(
            field_id_for_accessor("Main.java:getVersion()").as_deref(),
            Some("Main.java:version")
        );
        assert_eq!(
            field_id_for_accessor("Main.java:Main:isVersion()").as_deref(),
            Some("Main.java:Main:version")
        );
        assert_eq!(
            field_id_for_accessor("A.java:f():Local:getX()").as_deref(),
            Some("A.java:f():Local:x")
        );
        assert_eq!(field_id_for_accessor("getVersion()"), None);
        assert_eq!(field_id_for_accessor("Main.java:toString()"), None);
    }
}
