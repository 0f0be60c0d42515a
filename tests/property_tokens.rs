/// Property-based tests for token identity
use ferrous_ioc::Token;
use proptest::prelude::*;

proptest! {
    #[test]
    fn token_matches_its_own_id(id in ".*") {
        let token = Token::new(id.clone());
        prop_assert!(token.matches(id.as_str()));
        prop_assert_eq!(token.id(), id.as_str());
        prop_assert_eq!(token.to_string(), id);
    }

    #[test]
    fn create_joins_parts(parts in prop::collection::vec("[a-z]{1,8}", 1..6)) {
        let token = Token::create(&parts);
        prop_assert_eq!(token.id(), parts.join(":"));
        prop_assert_eq!(token.id().split(':').count(), parts.len());
    }

    #[test]
    fn variant_extends_base(base in "[a-z]{1,8}", suffix in "[a-z]{1,8}") {
        let base = Token::new(base);
        let variant = base.variant(suffix.as_str());
        prop_assert!(variant.id().starts_with(base.id()));
        prop_assert_eq!(variant, Token::create([base.id(), suffix.as_str()]));
    }

    #[test]
    fn distinct_ids_are_distinct_tokens(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
        prop_assert_eq!(Token::new(a.as_str()) == Token::new(b.as_str()), a == b);
    }
}
