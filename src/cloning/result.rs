use std::collections::HashMap;

use crate::metadata::token::Token;

/// Outcome of a successful clone.
///
/// All tokens on the clone side address rows of the target module. Nothing is attached to the
/// target's namespace; use [`CloneResult::cloned_top_level_types`] with
/// [`crate::metadata::module::Module::attach_top_level_type`] to do so.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneResult {
    /// Every cloned type, method, field, property and event, in discovery order
    pub cloned_members: Vec<Token>,
    /// Clones of the seed members, in inclusion order
    pub root_members: Vec<Token>,
    /// Source token to clone token, for every cloned row including parameters
    pub map: HashMap<Token, Token>,
    pub(crate) top_level_types: Vec<Token>,
}

impl CloneResult {
    /// The clone of `source`, if it was cloned.
    #[must_use]
    pub fn get_cloned(&self, source: Token) -> Option<Token> {
        self.map.get(&source).copied()
    }

    /// Returns `true` if `source` was cloned.
    #[must_use]
    pub fn contains(&self, source: Token) -> bool {
        self.map.contains_key(&source)
    }

    /// Cloned types without a cloned enclosing type.
    #[must_use]
    pub fn cloned_top_level_types(&self) -> &[Token] {
        &self.top_level_types
    }
}
