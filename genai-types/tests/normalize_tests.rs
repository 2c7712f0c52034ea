//! Property tests for content normalization.

use genai_types::{Content, ContentListUnion, Part, PartUnion, Role, normalize_contents};
use proptest::prelude::*;

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,40}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any list of text parts normalizes to exactly one user turn holding the
    /// same texts in the same order.
    #[test]
    fn prop_part_list_is_one_user_turn(texts in prop::collection::vec(arb_text(), 1..8)) {
        let input = ContentListUnion::Parts(texts.iter().cloned().map(PartUnion::Text).collect());
        let turns = normalize_contents(input).unwrap();

        prop_assert_eq!(turns.len(), 1);
        prop_assert_eq!(turns[0].role, Some(Role::User));
        let got: Vec<&str> = turns[0].parts.iter().filter_map(Part::as_text).collect();
        let want: Vec<&str> = texts.iter().map(String::as_str).collect();
        prop_assert_eq!(got, want);
    }

    /// Content lists keep their length and order; only missing roles change.
    #[test]
    fn prop_content_list_preserves_order(
        entries in prop::collection::vec((arb_text(), prop::option::of(any::<bool>())), 0..8)
    ) {
        let contents: Vec<Content> = entries
            .iter()
            .map(|(text, role)| {
                let content = Content::text(text.clone());
                match role {
                    Some(true) => content.with_role(Role::Model),
                    Some(false) => content.with_role(Role::User),
                    None => content,
                }
            })
            .collect();

        let turns = normalize_contents(contents.clone().into()).unwrap();
        prop_assert_eq!(turns.len(), contents.len());
        for (turn, original) in turns.iter().zip(&contents) {
            prop_assert_eq!(&turn.parts, &original.parts);
            prop_assert_eq!(turn.role, Some(original.role.unwrap_or(Role::User)));
        }
    }
}
