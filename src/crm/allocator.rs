use log::{debug, info};
use passwords::PasswordGenerator;

use crate::crm::entity::{Schema, CODE_FIELD};
use crate::crm::Error;
use crate::store::{DocumentStore, Filter};

pub const CODE_LENGTH: usize = 6;
pub const ID_LENGTH: usize = 17;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

pub trait TokenSource {
    fn token(&self, length: usize) -> Result<String, Error>;
}

/// Alphanumeric tokens without look-alike characters.
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn token(&self, length: usize) -> Result<String, Error> {
        PasswordGenerator::new()
            .length(length)
            .numbers(true)
            .lowercase_letters(true)
            .uppercase_letters(true)
            .symbols(false)
            .spaces(false)
            .exclude_similar_characters(true)
            .strict(false)
            .generate_one()
            .map_err(|error| Error::ValidationFailed(format!("Could not generate a token: {error}")))
    }
}

/// Hands out short codes that no stored record of the same type holds yet.
///
/// A code is only free at the time of the lookup. Stores enforce a unique index on
/// the code field so a concurrent insert of the same code fails instead of duplicating.
pub struct CodeAllocator<'a> {
    store: &'a dyn DocumentStore,
    tokens: Box<dyn TokenSource + 'a>,
    max_attempts: u32,
}

impl<'a> CodeAllocator<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self::with_tokens(store, RandomTokens)
    }

    pub fn with_tokens(store: &'a dyn DocumentStore, tokens: impl TokenSource + 'a) -> Self {
        Self {
            store,
            tokens: Box::new(tokens),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn token(&self, length: usize) -> Result<String, Error> {
        self.tokens.token(length)
    }

    /// Use `candidate` when it is free, random codes otherwise.
    pub fn generate_code<S: Schema>(&self, candidate: Option<&str>) -> Result<String, Error> {
        let mut code = match candidate.filter(|code| !code.is_empty()) {
            Some(code) => code.to_owned(),
            None => self.token(CODE_LENGTH)?,
        };

        for attempt in 1..=self.max_attempts {
            let taken = self
                .store
                .find_one(S::COLLECTION, &Filter::new().eq(CODE_FIELD, code.as_str()))?
                .is_some();

            if !taken {
                debug!("Allocated {} code {code} on attempt {attempt}", S::KIND);
                return Ok(code);
            }

            info!("{} code {code} is taken, trying another one", S::KIND);
            code = self.token(CODE_LENGTH)?;
        }

        Err(Error::CodeGenerationExhausted {
            kind: S::KIND,
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
pub mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::{HashSet, VecDeque};

    use proptest::prelude::*;
    use serde_json::json;

    use crate::crm::allocator::{CodeAllocator, RandomTokens, TokenSource, CODE_LENGTH, ID_LENGTH};
    use crate::crm::brand::Brand;
    use crate::crm::entity::Schema;
    use crate::crm::Error;
    use crate::store::memory::MemoryStore;
    use crate::store::DocumentStore;

    /// Hands out the given tokens in order, then fresh numbered ones.
    pub struct ScriptedTokens {
        queue: RefCell<VecDeque<String>>,
        issued: Cell<usize>,
    }

    impl ScriptedTokens {
        pub fn new<T: Into<String>>(tokens: impl IntoIterator<Item = T>) -> Self {
            Self {
                queue: RefCell::new(tokens.into_iter().map(Into::into).collect()),
                issued: Cell::new(0),
            }
        }
    }

    impl TokenSource for ScriptedTokens {
        fn token(&self, length: usize) -> Result<String, Error> {
            self.issued.set(self.issued.get() + 1);
            Ok(self
                .queue
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| format!("{:0>width$}", self.issued.get(), width = length)))
        }
    }

    fn store_with_codes(codes: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for (index, code) in codes.iter().enumerate() {
            store
                .insert(
                    Brand::COLLECTION,
                    json!({"_id": format!("b{index}"), "name": "Brand", "code": code})
                        .as_object()
                        .expect("Object")
                        .clone(),
                )
                .expect("Insert");
        }
        store
    }

    #[test]
    fn test_random_tokens() {
        let code = RandomTokens.token(CODE_LENGTH).expect("Token");
        assert_eq!(CODE_LENGTH, code.chars().count());
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));

        let ids: HashSet<String> = (0..50).map(|_| RandomTokens.token(ID_LENGTH).expect("Token")).collect();
        assert_eq!(50, ids.len());
    }

    #[test]
    fn test_generates_code_without_candidate() {
        let store = MemoryStore::new();
        let allocator = CodeAllocator::new(&store);

        let code = allocator.generate_code::<Brand>(None).expect("Code");
        assert_eq!(6, code.len());
    }

    #[test]
    fn test_free_candidate_is_used() {
        let store = store_with_codes(&["taken1"]);
        let allocator = CodeAllocator::with_tokens(&store, ScriptedTokens::new(["unused"]));

        assert_eq!("mine01", allocator.generate_code::<Brand>(Some("mine01")).expect("Code"));
    }

    #[test]
    fn test_taken_candidate_is_ignored() {
        let store = store_with_codes(&["taken1"]);
        let allocator = CodeAllocator::with_tokens(&store, ScriptedTokens::new(["fresh1"]));

        assert_eq!("fresh1", allocator.generate_code::<Brand>(Some("taken1")).expect("Code"));
    }

    #[test]
    fn test_empty_candidate_counts_as_none() {
        let store = MemoryStore::new();
        let allocator = CodeAllocator::with_tokens(&store, ScriptedTokens::new(["fresh1"]));

        assert_eq!("fresh1", allocator.generate_code::<Brand>(Some("")).expect("Code"));
    }

    #[test]
    fn test_retries_random_collisions() {
        let store = store_with_codes(&["aaaaaa", "bbbbbb"]);
        let allocator = CodeAllocator::with_tokens(&store, ScriptedTokens::new(["aaaaaa", "bbbbbb", "cccccc"]));

        assert_eq!("cccccc", allocator.generate_code::<Brand>(None).expect("Code"));
    }

    #[test]
    fn test_exhausted() {
        let store = store_with_codes(&["aaaaaa"]);
        let allocator = CodeAllocator::with_tokens(&store, ScriptedTokens::new(["aaaaaa"; 5])).max_attempts(3);

        match allocator.generate_code::<Brand>(None) {
            Err(Error::CodeGenerationExhausted { kind, attempts }) => {
                assert_eq!("Brand", kind);
                assert_eq!(3, attempts);
            }
            _ => panic!("Allocation should have been exhausted"),
        }
    }

    proptest! {
        #[test]
        fn prop_code_is_never_taken(
            existing in prop::collection::hash_set("[a-z0-9]{6}", 0..20),
            picks in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
        ) {
            let existing: Vec<String> = existing.into_iter().collect();
            let codes: Vec<&str> = existing.iter().map(String::as_str).collect();
            let store = store_with_codes(&codes);

            let script: Vec<String> = if existing.is_empty() {
                vec![]
            } else {
                picks.iter().map(|pick| pick.get(&existing).clone()).collect()
            };

            let allocator = CodeAllocator::with_tokens(&store, ScriptedTokens::new(script)).max_attempts(10);
            let candidate = existing.first().map(String::as_str);

            match allocator.generate_code::<Brand>(candidate) {
                Ok(code) => prop_assert!(!existing.contains(&code)),
                Err(Error::CodeGenerationExhausted { .. }) => {}
                Err(error) => prop_assert!(false, "unexpected error {}", error),
            }
        }
    }
}
