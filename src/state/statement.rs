use crate::error::{GameError, GameResult};
use crate::types::{Statement, StatementId};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;

/// Built-in assertions. Ids are positional, so only ever append to this list.
const BUILTIN_STATEMENTS: &[&str] = &[
    "Testing on animals should be banned",
    "The death penalty is sometimes justified",
    "Women should be paid less than men in some professions",
    "Assisted suicide should be made legal",
    "The voting age should be reduced to 16",
    "Smoking should be made illegal everywhere",
    "Prisoners should be allowed to vote",
    "Drug addicts should get help not punishment",
    "Advertising to children should be banned",
    "Beauty competitions create unrealistic beauty standards",
    "Police should be immune from prosecution",
    "Violent video games should be banned",
    "Obese people should pay more for healthcare",
    "Healthcare should be free for everyone",
    "Rich people should pay more taxes",
    "War is never justified",
    "Some soft drugs should be made legal",
    "Marriage is no longer necessary",
    "Children should not have smart phones",
    "If you have more money you will be happier",
    "Governments shouldn't track their citizens",
    "People should have to take a test to become a parent",
    "Fast food should be banned",
    "Men and women should be allowed to compete against each other in the Olympics",
    "Celebrities should earn less money",
    "All people should receive a basic income",
    "Everyone has the right to own a gun",
    "The age you can buy alcohol should be increased to 25",
    "Eating meat is unethical",
    "Social media has ruined society",
];

/// Fixed pool of debatable statements.
///
/// The pool never changes after construction; which statements a game has
/// already used is derived from that game's rounds and passed in.
#[derive(Debug, Clone)]
pub struct StatementPool {
    statements: Vec<Statement>,
}

impl StatementPool {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// The built-in English statements
    pub fn builtin() -> Self {
        let statements = BUILTIN_STATEMENTS
            .iter()
            .enumerate()
            .map(|(i, text)| Statement {
                id: format!("s{:02}", i + 1),
                assertion: text.to_string(),
                language: "en".to_string(),
            })
            .collect();
        Self::new(statements)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Statement> {
        self.statements.iter().find(|s| s.id == id)
    }

    /// Pick a random statement that is not in `excluded`
    pub fn next_statement(&self, excluded: &HashSet<StatementId>) -> GameResult<Statement> {
        self.next_statement_with(excluded, &mut rand::rng())
    }

    pub fn next_statement_with<R: Rng + ?Sized>(
        &self,
        excluded: &HashSet<StatementId>,
        rng: &mut R,
    ) -> GameResult<Statement> {
        let remaining: Vec<&Statement> = self
            .statements
            .iter()
            .filter(|s| !excluded.contains(&s.id))
            .collect();

        remaining
            .choose(rng)
            .map(|s| (*s).clone())
            .ok_or(GameError::PoolExhausted)
    }
}

impl Default for StatementPool {
    fn default() -> Self {
        Self::builtin()
    }
}
