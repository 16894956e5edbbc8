//! Shared entity fixtures for unit tests.

use crate::scalar::{Timestamp, Ulid};
use arbordb_derive::Entity;

///
/// Person
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
pub(crate) struct Person {
    pub id: Ulid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub birthday: Timestamp,
    #[entity(child)]
    pub geek: Option<Geek>,
    #[entity(child)]
    pub geeks: Vec<Geek>,
}

///
/// Geek
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
pub(crate) struct Geek {
    pub alias: String,
}
